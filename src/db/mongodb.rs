use log::info;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Booking, Bus, Role, Route, SupportTicket, User};

const DUPLICATE_KEY: i32 = 11000;

/// Whether a write failed on a unique index.
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db_name: String,
}

impl MongoDB {
    /// Parses the URI and builds a client; no connection is made until the
    /// first operation.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, mongodb::error::Error> {
        let client_options = mongodb::options::ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        Ok(MongoDB {
            client,
            db_name: db_name.to_string(),
        })
    }

    pub(crate) fn users(&self) -> Collection<User> {
        self.client.database(&self.db_name).collection("users")
    }

    pub(crate) fn buses(&self) -> Collection<Bus> {
        self.client.database(&self.db_name).collection("buses")
    }

    pub(crate) fn seat_availability(&self) -> Collection<Document> {
        self.client.database(&self.db_name).collection("seat_availability")
    }

    pub(crate) fn bookings(&self) -> Collection<Booking> {
        self.client.database(&self.db_name).collection("bookings")
    }

    pub(crate) fn tickets(&self) -> Collection<SupportTicket> {
        self.client.database(&self.db_name).collection("support_tickets")
    }

    /// Ids in request paths that are not valid ObjectIds can never match, so
    /// they are reported as missing resources.
    pub fn string_to_id(id: &str, resource: &'static str) -> AppResult<ObjectId> {
        ObjectId::parse_str(id.trim()).map_err(|_| AppError::NotFound(resource))
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users().create_index(unique_email, None).await?;

        let reset_token = IndexModel::builder()
            .keys(doc! { "password_reset.token_hash": 1 })
            .options(IndexOptions::builder().sparse(true).build())
            .build();
        self.users().create_index(reset_token, None).await?;

        self.bookings()
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build(), None)
            .await?;
        self.seat_availability()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "bus_id": 1, "travel_date": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await?;
        self.tickets()
            .create_index(IndexModel::builder().keys(doc! { "status": 1 }).build(), None)
            .await?;
        Ok(())
    }

    pub async fn seed_data(&self, config: &Config) -> AppResult<()> {
        let collection = self.buses();

        if config.force_seed {
            info!("Force seeding enabled. Clearing buses collection...");
            collection.delete_many(doc! {}, None).await?;
        }

        let count = collection.count_documents(None, None).await?;
        if count == 0 {
            info!("Seeding intercity bus routes...");
            let routes = [
                ("SLTB - NC 4521", "Normal", 54, "Colombo", "Kandy", "06:00 AM", "09:30 AM", 480.0),
                ("Super Line - NB 7781", "Semi-Luxury", 49, "Colombo", "Galle", "07:15 AM", "09:45 AM", 620.0),
                ("Express Liner - NA 1290", "Luxury A/C", 40, "Colombo", "Jaffna", "08:30 PM", "05:30 AM", 2450.0),
                ("Lanka Travels - ND 3344", "Semi-Luxury", 45, "Kandy", "Nuwara Eliya", "07:00 AM", "10:15 AM", 560.0),
                ("Southern Express - NE 8810", "Luxury A/C", 36, "Matara", "Colombo", "05:45 AM", "08:30 AM", 900.0),
                ("Hill Country - NF 2207", "Normal", 52, "Badulla", "Colombo", "09:00 PM", "04:30 AM", 1150.0),
                ("East Coast - NG 5102", "Luxury A/C", 40, "Colombo", "Trincomalee", "10:00 PM", "04:45 AM", 1750.0),
                ("Cultural Triangle - NH 6619", "Semi-Luxury", 45, "Colombo", "Anuradhapura", "06:30 AM", "11:00 AM", 1050.0),
            ];

            let buses: Vec<Bus> = routes
                .iter()
                .map(|&(number, kind, seats, from, to, departure, arrival, price)| Bus {
                    id: None,
                    bus_number: number.to_string(),
                    bus_type: kind.to_string(),
                    total_seats: seats,
                    route: Route {
                        from: from.to_string(),
                        to: to.to_string(),
                        departure_time: departure.to_string(),
                        arrival_time: arrival.to_string(),
                        price,
                    },
                    driver_id: None,
                })
                .collect();

            collection.insert_many(buses, None).await?;
            info!("Seeding complete with {} buses", routes.len());
        }

        self.seed_admin(config).await
    }

    async fn seed_admin(&self, config: &Config) -> AppResult<()> {
        let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
            return Ok(());
        };
        if self.find_user_by_email(email).await?.is_some() {
            return Ok(());
        }
        let hash = bcrypt::hash(password, config.bcrypt_cost)?;
        let admin = User::new("admin", email, hash, Role::Admin);
        self.insert_user(&admin).await?;
        info!("Seeded admin account {}", admin.email);
        Ok(())
    }
}
