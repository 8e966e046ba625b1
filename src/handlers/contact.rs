use actix_web::{web, HttpResponse};
use log::info;
use mongodb::bson::DateTime;

use crate::db::MongoDB;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateTicketRequest, SupportTicket, TicketReply, TicketReplyRequest, TicketResponse,
    TicketStatus, TicketStatusQuery, TicketStatusRequest,
};
use crate::security::AuthUser;
use crate::validation::{self, normalize_phone};

/// Staff see every ticket; others only their own, including guest tickets
/// sent from their email address.
async fn ensure_can_view(db: &MongoDB, user: &AuthUser, ticket: &SupportTicket) -> AppResult<()> {
    if user.role.is_staff() {
        return Ok(());
    }
    let user_id = user.object_id()?;
    let owns = match ticket.user_id {
        Some(owner) => owner == user_id,
        None => db.get_user(&user_id).await?.email == ticket.email,
    };
    if owns {
        Ok(())
    } else {
        Err(AppError::NotFound("Ticket"))
    }
}

pub async fn create_ticket(
    user: Option<AuthUser>,
    db: web::Data<MongoDB>,
    payload: web::Json<CreateTicketRequest>,
) -> AppResult<HttpResponse> {
    let req = payload.into_inner();
    validation::validate_ticket(&req)?;

    let now = DateTime::now();
    let mut ticket = SupportTicket {
        id: None,
        user_id: user.as_ref().and_then(|u| u.object_id().ok()),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_lowercase(),
        phone: req
            .phone
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(normalize_phone),
        subject: req.subject.trim().to_string(),
        message: req.message.trim().to_string(),
        category: req.category,
        status: TicketStatus::Open,
        replies: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    ticket.id = Some(db.insert_ticket(&ticket).await?);
    info!("Support ticket opened by {} ({:?})", ticket.email, ticket.category);
    Ok(HttpResponse::Created().json(TicketResponse::from(ticket)))
}

pub async fn my_tickets(user: AuthUser, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let id = user.object_id()?;
    let account = db.get_user(&id).await?;
    let tickets: Vec<TicketResponse> = db
        .tickets_for_user(&id, &account.email)
        .await?
        .into_iter()
        .map(TicketResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(tickets))
}

pub async fn list_tickets(
    user: AuthUser,
    db: web::Data<MongoDB>,
    query: web::Query<TicketStatusQuery>,
) -> AppResult<HttpResponse> {
    user.require_staff()?;
    let status = match query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            TicketStatus::parse(raw)
                .ok_or_else(|| AppError::invalid_field("status", "Unknown ticket status"))?,
        ),
        None => None,
    };
    let tickets: Vec<TicketResponse> = db
        .list_tickets(status)
        .await?
        .into_iter()
        .map(TicketResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(tickets))
}

pub async fn get_ticket(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = MongoDB::string_to_id(&path.into_inner(), "Ticket")?;
    let ticket = db.get_ticket(&id).await?;
    ensure_can_view(&db, &user, &ticket).await?;
    Ok(HttpResponse::Ok().json(TicketResponse::from(ticket)))
}

pub async fn reply_to_ticket(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    payload: web::Json<TicketReplyRequest>,
) -> AppResult<HttpResponse> {
    validation::validate_reply(&payload.message)?;
    let id = MongoDB::string_to_id(&path.into_inner(), "Ticket")?;
    let ticket = db.get_ticket(&id).await?;
    ensure_can_view(&db, &user, &ticket).await?;

    if ticket.status == TicketStatus::Closed {
        return Err(AppError::BadRequest("Ticket is closed".to_string()));
    }

    let reply = TicketReply {
        author_id: user.object_id()?,
        author_role: user.role,
        message: payload.message.trim().to_string(),
        created_at: DateTime::now(),
    };
    let next = ticket.status.after_reply(user.role.is_staff());
    let updated = db.add_ticket_reply(&id, &reply, next).await?;
    Ok(HttpResponse::Ok().json(TicketResponse::from(updated)))
}

pub async fn update_ticket_status(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    payload: web::Json<TicketStatusRequest>,
) -> AppResult<HttpResponse> {
    user.require_staff()?;
    let next = TicketStatus::parse(&payload.status)
        .ok_or_else(|| AppError::invalid_field("status", "Unknown ticket status"))?;

    let id = MongoDB::string_to_id(&path.into_inner(), "Ticket")?;
    let ticket = db.get_ticket(&id).await?;
    if !ticket.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move a {} ticket to {}",
            ticket.status.as_str(),
            next.as_str()
        )));
    }

    let updated = db.set_ticket_status(&id, next).await?;
    info!("{} {} moved ticket {} to {}", user.role, user.id, id, next.as_str());
    Ok(HttpResponse::Ok().json(TicketResponse::from(updated)))
}
