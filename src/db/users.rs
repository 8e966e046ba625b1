use futures::TryStreamExt;
use log::{error, info};
use mongodb::{
    bson::{self, doc, oid::ObjectId, DateTime, Document},
    options::FindOptions,
};

use super::{is_duplicate_key, MongoDB};
use crate::error::{AppError, AppResult};
use crate::models::{AuthProvider, PasswordReset, Role, User};

impl MongoDB {
    pub async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    pub async fn find_user_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    pub async fn get_user(&self, id: &ObjectId) -> AppResult<User> {
        self.find_user_by_id(id).await?.ok_or(AppError::NotFound("User"))
    }

    pub async fn insert_user(&self, user: &User) -> AppResult<ObjectId> {
        let result = self.users().insert_one(user, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict("User already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("inserted user has no ObjectId".to_string()))
    }

    /// Applies `$set`/`$unset` to one user and bumps `updated_at`.
    pub async fn update_user_fields(
        &self,
        id: &ObjectId,
        mut set: Document,
        unset: Document,
    ) -> AppResult<User> {
        set.insert("updated_at", DateTime::now());
        let mut update = doc! { "$set": set };
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }
        let result = self.users().update_one(doc! { "_id": id }, update, None).await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("User"));
        }
        self.get_user(id).await
    }

    pub async fn set_password(&self, id: &ObjectId, password_hash: &str) -> AppResult<()> {
        self.users()
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "password": password_hash, "updated_at": DateTime::now() },
                    "$unset": { "password_reset": "" },
                },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn record_login(&self, id: &ObjectId) -> AppResult<()> {
        self.users()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "last_login": DateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn store_reset_token(&self, id: &ObjectId, reset: &PasswordReset) -> AppResult<()> {
        self.users()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "password_reset": bson::to_bson(reset)? } },
                None,
            )
            .await?;
        Ok(())
    }

    /// The user holding an unexpired reset token with this hash.
    pub async fn find_user_by_reset_token(&self, token_hash: &str) -> AppResult<Option<User>> {
        Ok(self
            .users()
            .find_one(
                doc! {
                    "password_reset.token_hash": token_hash,
                    "password_reset.expires_at": { "$gt": DateTime::now() },
                },
                None,
            )
            .await?)
    }

    pub async fn delete_user(&self, id: &ObjectId) -> AppResult<()> {
        let result = self.users().delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound("User"));
        }
        info!("Deleted user {}", id.to_hex());
        Ok(())
    }

    pub async fn list_users(&self, role: Option<Role>) -> AppResult<Vec<User>> {
        let filter = match role {
            Some(role) => doc! { "role": role.as_str() },
            None => doc! {},
        };
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.users().find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Finds the account for a verified Google identity, creating it on first login.
    pub async fn find_or_create_google_user(
        &self,
        email: &str,
        name: &str,
        picture: Option<&str>,
    ) -> AppResult<User> {
        if let Some(user) = self.find_user_by_email(email).await? {
            return Ok(user);
        }

        let mut user = User::new(name, email, String::new(), Role::Passenger);
        user.auth_provider = AuthProvider::Google;
        user.full_name = Some(name.to_string());
        user.avatar_url = picture.map(str::to_string);

        let id = match self.insert_user(&user).await {
            Ok(id) => id,
            // Two first logins raced; the other one created the account.
            Err(AppError::Conflict(_)) => {
                return self
                    .find_user_by_email(email)
                    .await?
                    .ok_or(AppError::NotFound("User"));
            }
            Err(e) => {
                error!("Failed to create Google user {}: {}", email, e);
                return Err(e);
            }
        };
        user.id = Some(id);
        info!("Created account for Google user {}", user.email);
        Ok(user)
    }
}
