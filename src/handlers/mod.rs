pub mod auth;
pub mod bookings;
pub mod buses;
pub mod contact;
pub mod users;

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde_json::json;

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Every route the frontend calls.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::scope("/api/v1/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .route("/google", web::post().to(auth::google_login))
                .route("/refresh", web::post().to(auth::refresh))
                .route("/forgot-password", web::post().to(auth::forgot_password))
                .route("/reset-password", web::post().to(auth::reset_password))
                .route("/logout", web::post().to(auth::logout)),
        )
        .service(
            web::scope("/api/v1/users")
                .route("", web::get().to(users::list_users))
                .route("/profile", web::get().to(users::get_profile))
                .route("/profile", web::put().to(users::update_profile))
                .route("/password", web::put().to(users::change_password))
                .route("/avatar", web::put().to(users::update_avatar))
                .route("/account", web::delete().to(users::delete_account))
                .route("/{id}", web::get().to(users::get_user))
                .route("/{id}", web::put().to(users::admin_update_user))
                .route("/{id}", web::delete().to(users::admin_delete_user)),
        )
        .service(
            web::scope("/api/buses")
                .route("", web::get().to(buses::list_buses))
                .route("/{id}", web::get().to(buses::get_bus))
                .route("/{id}/seats", web::get().to(buses::get_bus_seats))
                .route("/{id}/driver", web::put().to(buses::assign_driver)),
        )
        .service(
            web::scope("/api/bookings")
                .route("", web::post().to(bookings::create_booking))
                .route("/my", web::get().to(bookings::get_user_bookings))
                .route("/all", web::get().to(bookings::all_bookings))
                .route("/driver/trips", web::get().to(bookings::driver_trips))
                .route("/{id}/cancel", web::put().to(bookings::cancel_booking))
                .route("/{id}/pay", web::put().to(bookings::pay_booking)),
        )
        .service(
            web::scope("/api/contact")
                .route("", web::post().to(contact::create_ticket))
                .route("/mine", web::get().to(contact::my_tickets))
                .route("/tickets", web::get().to(contact::list_tickets))
                .route("/tickets/{id}", web::get().to(contact::get_ticket))
                .route("/tickets/{id}/reply", web::post().to(contact::reply_to_ticket))
                .route("/tickets/{id}/status", web::put().to(contact::update_ticket_status)),
        );
}
