use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use log::info;
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};

use super::today;
use crate::db::MongoDB;
use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, BookingStatusQuery, Bus, BusResponse, CreateBookingRequest, Role,
};
use crate::security::AuthUser;
use crate::validation;

/// The shape the booking screens render: route, seats, payment and passengers.
pub fn booking_view(b: &Booking, bus: Option<&Bus>) -> Value {
    let id = b.id.map(|id| id.to_hex());
    let passengers: Vec<Value> = match &b.passenger {
        Some(p) => b
            .seats
            .iter()
            .map(|seat| json!({ "name": p.name, "seatNumber": seat, "age": p.age, "gender": p.gender }))
            .collect(),
        None => b
            .seats
            .iter()
            .map(|seat| json!({ "name": "User", "seatNumber": seat, "age": "N/A", "gender": "N/A" }))
            .collect(),
    };

    json!({
        "id": id,
        "busId": b.bus_id.to_hex(),
        "busName": bus.map(|b| b.bus_number.clone()).unwrap_or_else(|| "Unknown Bus".to_string()),
        "busType": bus.map(|b| b.bus_type.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "from": b.route.from,
        "to": b.route.to,
        "departure": b.route.departure_time,
        "arrival": b.route.arrival_time,
        "totalPrice": b.total_price,
        "seats": b.seats,
        "status": b.status.as_str().to_lowercase(),
        "paymentStatus": b.payment_status.as_str().to_lowercase(),
        "date": b.travel_date,
        "bookingDate": b.booking_date.try_to_rfc3339_string().unwrap_or_default(),
        "bookingId": id.as_deref().map(str::to_uppercase).unwrap_or_else(|| "N/A".to_string()),
        "passengers": passengers,
    })
}

async fn bus_lookup(db: &MongoDB, bookings: &[Booking]) -> AppResult<HashMap<ObjectId, Bus>> {
    let mut buses = HashMap::new();
    for b in bookings {
        if !buses.contains_key(&b.bus_id) {
            if let Some(bus) = db.get_bus(&b.bus_id).await? {
                buses.insert(b.bus_id, bus);
            }
        }
    }
    Ok(buses)
}

pub async fn create_booking(
    user: AuthUser,
    db: web::Data<MongoDB>,
    booking_req: web::Json<CreateBookingRequest>,
) -> AppResult<HttpResponse> {
    validation::validate_booking(
        &booking_req.seat_numbers,
        &booking_req.travel_date,
        booking_req.passenger.as_ref(),
        today(),
    )?;

    let booking = db.create_booking(&user.object_id()?, &booking_req).await?;
    let bus = db.get_bus(&booking.bus_id).await?;
    Ok(HttpResponse::Created().json(booking_view(&booking, bus.as_ref())))
}

pub async fn get_user_bookings(user: AuthUser, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let bookings = db.get_user_bookings(&user.object_id()?).await?;
    let buses = bus_lookup(&db, &bookings).await?;
    let detailed_bookings: Vec<Value> = bookings
        .iter()
        .map(|b| booking_view(b, buses.get(&b.bus_id)))
        .collect();
    Ok(HttpResponse::Ok().json(detailed_bookings))
}

pub async fn cancel_booking(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let booking_id = MongoDB::string_to_id(&path.into_inner(), "Booking")?;
    let booking = db.cancel_booking(&booking_id, &user.object_id()?).await?;
    info!("User {} cancelled booking {}", user.id, booking_id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
        "paymentStatus": booking.payment_status.as_str().to_lowercase(),
    })))
}

pub async fn pay_booking(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let booking_id = MongoDB::string_to_id(&path.into_inner(), "Booking")?;
    let booking = db.pay_booking(&booking_id, &user.object_id()?).await?;
    info!("User {} paid for booking {}", user.id, booking_id);
    let bus = db.get_bus(&booking.bus_id).await?;
    Ok(HttpResponse::Ok().json(booking_view(&booking, bus.as_ref())))
}

/// Buses assigned to the calling driver, each with its confirmed passenger manifest.
pub async fn driver_trips(user: AuthUser, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    user.require(&[Role::Driver])?;
    let buses = db.buses_for_driver(&user.object_id()?).await?;

    let mut trips = Vec::with_capacity(buses.len());
    for bus in buses {
        let Some(bus_id) = bus.id else { continue };
        let bookings = db.confirmed_bookings_for_bus(&bus_id).await?;
        let booked_seats: usize = bookings.iter().map(|b| b.seats.len()).sum();
        let manifest: Vec<Value> = bookings.iter().map(|b| booking_view(b, Some(&bus))).collect();
        trips.push(json!({
            "bus": BusResponse::from(bus),
            "bookedSeats": booked_seats,
            "bookings": manifest,
        }));
    }
    Ok(HttpResponse::Ok().json(trips))
}

pub async fn all_bookings(
    user: AuthUser,
    db: web::Data<MongoDB>,
    query: web::Query<BookingStatusQuery>,
) -> AppResult<HttpResponse> {
    user.require_staff()?;
    let status = match query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            BookingStatus::parse(raw)
                .ok_or_else(|| AppError::invalid_field("status", "Unknown booking status"))?,
        ),
        None => None,
    };

    let bookings = db.all_bookings(status).await?;
    let buses = bus_lookup(&db, &bookings).await?;
    let views: Vec<Value> = bookings
        .iter()
        .map(|b| {
            let mut view = booking_view(b, buses.get(&b.bus_id));
            view["userId"] = json!(b.user_id.to_hex());
            view
        })
        .collect();
    Ok(HttpResponse::Ok().json(views))
}
