//! HTTP contract tests. Every request here is rejected before the database is
//! touched, so the lazily connecting client never needs a running server.

use actix_web::{dev::ServiceResponse, http::StatusCode, test, App};
use bus_book::{
    config::Config,
    db::MongoDB,
    models::Role,
    security::{middleware::security_headers, FailureOutcome},
    AppState,
};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};

async fn state() -> AppState {
    let config = Config {
        max_login_attempts: 3,
        ..Config::default()
    };
    let db = MongoDB::new("mongodb://127.0.0.1:27017", "bus_book_test")
        .await
        .unwrap();
    AppState::new(config, db)
}

macro_rules! app {
    ($state:expr) => {{
        let state = $state.clone();
        test::init_service(
            App::new()
                .wrap(security_headers())
                .configure(|cfg| state.configure(cfg)),
        )
        .await
    }};
}

fn bearer(state: &AppState, role: Role) -> (&'static str, String) {
    let pair = state
        .tokens
        .issue_pair(&ObjectId::new().to_hex(), role)
        .unwrap();
    ("Authorization", format!("Bearer {}", pair.token))
}

async fn json_body(resp: ServiceResponse) -> Value {
    test::read_body_json(resp).await
}

#[actix_web::test]
async fn health_check_carries_security_headers() {
    let state = state().await;
    let app = app!(state);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(resp.headers().get("X-Frame-Options").unwrap(), "DENY");
    assert_eq!(json_body(resp).await["status"], "ok");
}

#[actix_web::test]
async fn profile_requires_a_token() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::get().uri("/api/v1/users/profile").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"], "Unauthorized");
}

#[actix_web::test]
async fn registration_reports_field_errors() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "username": "nimal",
            "email": "nimal-at-example",
            "password": "password",
            "phone": "0123456789"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["fields"]["email"], "Invalid email address");
    assert_eq!(body["fields"]["phone"], "Invalid phone number");
    assert!(body["fields"]["password"].is_string());
    assert!(body["fields"].get("username").is_none());
}

#[actix_web::test]
async fn locked_accounts_get_429_before_credentials_are_checked() {
    let state = state().await;
    let app = app!(state);
    let key = "locked@example.lk";
    for _ in 0..2 {
        state.attempts.record_failure(key);
    }
    assert!(matches!(
        state.attempts.record_failure(key),
        FailureOutcome::Locked { .. }
    ));

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": "Locked@Example.lk", "password": "Whatever1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("Retry-After"));
    let body = json_body(resp).await;
    assert!(body["retry_after_secs"].as_u64().unwrap() > 0);
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[actix_web::test]
async fn refresh_rejects_access_tokens() {
    let state = state().await;
    let app = app!(state);
    let pair = state.tokens.issue_pair(&ObjectId::new().to_hex(), Role::Passenger).unwrap();
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": pair.token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn staff_routes_reject_passengers_and_drivers() {
    let state = state().await;
    let app = app!(state);

    for (method_uri, role) in [
        ("/api/v1/users", Role::Passenger),
        ("/api/bookings/all", Role::Driver),
        ("/api/contact/tickets", Role::Passenger),
    ] {
        let req = test::TestRequest::get()
            .uri(method_uri)
            .insert_header(bearer(&state, role))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{method_uri}");
    }

    let req = test::TestRequest::put()
        .uri(&format!("/api/contact/tickets/{}/status", ObjectId::new().to_hex()))
        .insert_header(bearer(&state, Role::Passenger))
        .set_json(json!({ "status": "closed" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{}", ObjectId::new().to_hex()))
        .insert_header(bearer(&state, Role::Support))
        .set_json(json!({ "role": "admin" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn driver_trips_are_for_drivers_only() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::get()
        .uri("/api/bookings/driver/trips")
        .insert_header(bearer(&state, Role::Passenger))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn bookings_in_the_past_are_rejected() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header(bearer(&state, Role::Passenger))
        .set_json(json!({
            "bus_id": ObjectId::new().to_hex(),
            "seat_numbers": ["1", "1"],
            "travel_date": "2001-01-01"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["fields"]["travel_date"], "Travel date is in the past");
    assert_eq!(body["fields"]["seat_numbers"], "The same seat was selected twice");
}

#[actix_web::test]
async fn seat_map_needs_a_valid_date() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::get()
        .uri(&format!("/api/buses/{}/seats?date=tomorrow", ObjectId::new().to_hex()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["fields"]["date"], "Date must be YYYY-MM-DD");
}

#[actix_web::test]
async fn contact_form_is_validated() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::post()
        .uri("/api/contact")
        .set_json(json!({
            "name": "Nimal",
            "email": "nimal@example.lk",
            "phone": "+94771234567",
            "subject": "Hi",
            "message": "short"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["fields"]["subject"].is_string());
    assert!(body["fields"]["message"].is_string());
    assert!(body["fields"].get("phone").is_none());
}

#[actix_web::test]
async fn password_flows_validate_before_lookup() {
    let state = state().await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/forgot-password")
        .set_json(json!({ "email": "nope" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/reset-password")
        .set_json(json!({ "token": "abc", "new_password": "weak" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["fields"]["new_password"].is_string());

    let req = test::TestRequest::put()
        .uri("/api/v1/users/password")
        .insert_header(bearer(&state, Role::Passenger))
        .set_json(json!({
            "current_password": "Colombo2024",
            "new_password": "Kandy2024x",
            "confirm_password": "Kandy2024y"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["fields"]["confirm_password"], "Passwords do not match");
}

#[actix_web::test]
async fn account_deletion_needs_explicit_confirmation() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::delete()
        .uri("/api/v1/users/account")
        .insert_header(bearer(&state, Role::Passenger))
        .set_json(json!({ "password": "Colombo2024", "confirm": "yes" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["fields"]["confirm"], "Type DELETE to confirm");
}

#[actix_web::test]
async fn profile_payloads_with_wrong_shapes_are_rejected() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::put()
        .uri("/api/v1/users/profile")
        .insert_header(bearer(&state, Role::Driver))
        .set_json(json!({ "driver": "truck" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn logout_clears_the_session_cookie() {
    let state = state().await;
    let app = app!(state);
    let req = test::TestRequest::post().uri("/api/v1/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "access_token")
        .unwrap();
    assert_eq!(cookie.value(), "");
}
