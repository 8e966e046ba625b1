use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::user::Role;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketCategory {
    #[default]
    General,
    Booking,
    Payment,
    Technical,
    Account,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "open" => Some(TicketStatus::Open),
            "in_progress" => Some(TicketStatus::InProgress),
            "resolved" => Some(TicketStatus::Resolved),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    /// Closed tickets are final; everything else can move forward or be reopened.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (Open, Resolved)
                | (Open, Closed)
                | (InProgress, Resolved)
                | (InProgress, Closed)
                | (InProgress, Open)
                | (Resolved, Closed)
                | (Resolved, Open)
        )
    }

    /// Status a ticket moves to when someone replies to it, if any.
    pub fn after_reply(self, by_staff: bool) -> Option<TicketStatus> {
        match (self, by_staff) {
            (TicketStatus::Open, true) => Some(TicketStatus::InProgress),
            (TicketStatus::Resolved, false) => Some(TicketStatus::Open),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TicketReply {
    pub author_id: ObjectId,
    pub author_role: Role,
    pub message: String,
    pub created_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SupportTicket {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub user_id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub category: TicketCategory,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub replies: Vec<TicketReply>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TicketReplyResponse {
    pub author_id: String,
    pub author_role: Role,
    pub message: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TicketResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub category: TicketCategory,
    pub status: TicketStatus,
    pub replies: Vec<TicketReplyResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SupportTicket> for TicketResponse {
    fn from(ticket: SupportTicket) -> Self {
        Self {
            id: ticket.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            user_id: ticket.user_id.map(|oid| oid.to_hex()),
            name: ticket.name,
            email: ticket.email,
            phone: ticket.phone,
            subject: ticket.subject,
            message: ticket.message,
            category: ticket.category,
            status: ticket.status,
            replies: ticket
                .replies
                .into_iter()
                .map(|r| TicketReplyResponse {
                    author_id: r.author_id.to_hex(),
                    author_role: r.author_role,
                    message: r.message,
                    created_at: r.created_at.try_to_rfc3339_string().unwrap_or_default(),
                })
                .collect(),
            created_at: ticket.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: ticket.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub category: TicketCategory,
}

#[derive(Serialize, Deserialize)]
pub struct TicketReplyRequest {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct TicketStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct TicketStatusQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_tickets_cannot_move() {
        for next in [
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::Resolved,
        ] {
            assert!(!TicketStatus::Closed.can_transition_to(next));
        }
    }

    #[test]
    fn resolved_tickets_can_be_reopened_or_closed() {
        assert!(TicketStatus::Resolved.can_transition_to(TicketStatus::Open));
        assert!(TicketStatus::Resolved.can_transition_to(TicketStatus::Closed));
        assert!(!TicketStatus::Resolved.can_transition_to(TicketStatus::InProgress));
        assert!(!TicketStatus::Open.can_transition_to(TicketStatus::Open));
    }

    #[test]
    fn replies_nudge_the_status() {
        assert_eq!(TicketStatus::Open.after_reply(true), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::Open.after_reply(false), None);
        assert_eq!(TicketStatus::Resolved.after_reply(false), Some(TicketStatus::Open));
        assert_eq!(TicketStatus::InProgress.after_reply(true), None);
    }

    #[test]
    fn parses_status_spellings() {
        assert_eq!(TicketStatus::parse("In Progress"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::parse("in-progress"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::parse("done"), None);
    }
}
