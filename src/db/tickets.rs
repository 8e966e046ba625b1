use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, DateTime, Document},
    options::FindOptions,
};

use super::MongoDB;
use crate::error::{AppError, AppResult};
use crate::models::{SupportTicket, TicketReply, TicketStatus};

impl MongoDB {
    pub async fn insert_ticket(&self, ticket: &SupportTicket) -> AppResult<ObjectId> {
        let result = self.tickets().insert_one(ticket, None).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("inserted ticket has no ObjectId".to_string()))
    }

    pub async fn get_ticket(&self, id: &ObjectId) -> AppResult<SupportTicket> {
        self.tickets()
            .find_one(doc! { "_id": id }, None)
            .await?
            .ok_or(AppError::NotFound("Ticket"))
    }

    async fn find_tickets(&self, filter: Document) -> AppResult<Vec<SupportTicket>> {
        let options = FindOptions::builder().sort(doc! { "updated_at": -1 }).build();
        let cursor = self.tickets().find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn tickets_for_user(&self, user_id: &ObjectId, email: &str) -> AppResult<Vec<SupportTicket>> {
        // Tickets opened before logging in are matched by email.
        self.find_tickets(doc! {
            "$or": [ { "user_id": user_id }, { "user_id": null, "email": email } ]
        })
        .await
    }

    pub async fn list_tickets(&self, status: Option<TicketStatus>) -> AppResult<Vec<SupportTicket>> {
        let filter = match status {
            Some(status) => doc! { "status": status.as_str() },
            None => doc! {},
        };
        self.find_tickets(filter).await
    }

    pub async fn add_ticket_reply(
        &self,
        id: &ObjectId,
        reply: &TicketReply,
        new_status: Option<TicketStatus>,
    ) -> AppResult<SupportTicket> {
        let mut set = doc! { "updated_at": DateTime::now() };
        if let Some(status) = new_status {
            set.insert("status", status.as_str());
        }
        let result = self
            .tickets()
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { "replies": bson::to_bson(reply)? }, "$set": set },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Ticket"));
        }
        self.get_ticket(id).await
    }

    pub async fn set_ticket_status(&self, id: &ObjectId, status: TicketStatus) -> AppResult<SupportTicket> {
        let result = self
            .tickets()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "status": status.as_str(), "updated_at": DateTime::now() } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Ticket"));
        }
        self.get_ticket(id).await
    }
}
