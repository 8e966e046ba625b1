use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::bus::Route;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Completed => "Completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" | "canceled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Refunded => "Refunded",
        }
    }

    /// Payment state after the booking is cancelled.
    pub fn after_cancellation(self) -> Self {
        match self {
            PaymentStatus::Paid | PaymentStatus::Refunded => PaymentStatus::Refunded,
            PaymentStatus::Pending => PaymentStatus::Pending,
        }
    }
}

/// Passenger details captured when the booking is made.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Passenger {
    pub name: String,
    pub age: i32,
    pub gender: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub bus_id: ObjectId,
    pub seats: Vec<String>,
    pub travel_date: String,
    pub booking_date: DateTime,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub route: Route,
    pub total_price: f64,
    #[serde(default)]
    pub passenger: Option<Passenger>,
}

#[derive(Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub bus_id: String,
    pub seat_numbers: Vec<String>,
    pub travel_date: String,
    #[serde(default)]
    pub passenger: Option<Passenger>,
}

#[derive(Deserialize)]
pub struct BookingStatusQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelling_a_paid_booking_refunds_it() {
        assert_eq!(PaymentStatus::Paid.after_cancellation(), PaymentStatus::Refunded);
        assert_eq!(PaymentStatus::Pending.after_cancellation(), PaymentStatus::Pending);
    }

    #[test]
    fn parses_status_filters_loosely() {
        assert_eq!(BookingStatus::parse("Canceled"), Some(BookingStatus::Cancelled));
        assert_eq!(BookingStatus::parse(" confirmed "), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("lost"), None);
    }
}
