use actix_web::{web, HttpResponse};
use log::info;

use super::today;
use crate::db::MongoDB;
use crate::error::{AppError, AppResult};
use crate::models::{AssignDriverRequest, BusResponse, Role, SeatAvailabilityResponse, SeatDateQuery};
use crate::security::AuthUser;
use crate::validation::parse_date;

pub async fn list_buses(db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let buses: Vec<BusResponse> = db.get_buses().await?.into_iter().map(BusResponse::from).collect();
    Ok(HttpResponse::Ok().json(buses))
}

pub async fn get_bus(db: web::Data<MongoDB>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let id = MongoDB::string_to_id(&path.into_inner(), "Bus")?;
    let bus = db.get_bus(&id).await?.ok_or(AppError::NotFound("Bus"))?;
    Ok(HttpResponse::Ok().json(BusResponse::from(bus)))
}

pub async fn get_bus_seats(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    query: web::Query<SeatDateQuery>,
) -> AppResult<HttpResponse> {
    match parse_date(&query.date) {
        None => return Err(AppError::invalid_field("date", "Date must be YYYY-MM-DD")),
        Some(date) if date < today() => {
            return Err(AppError::invalid_field("date", "Date is in the past"))
        }
        Some(_) => {}
    }

    let id = MongoDB::string_to_id(&path.into_inner(), "Bus")?;
    let bus = db.get_bus(&id).await?.ok_or(AppError::NotFound("Bus"))?;
    let seats = db.get_bus_seats(&bus, query.date.trim()).await?;
    Ok(HttpResponse::Ok().json(SeatAvailabilityResponse {
        travel_date: query.date.trim().to_string(),
        seats,
    }))
}

pub async fn assign_driver(
    user: AuthUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    payload: web::Json<AssignDriverRequest>,
) -> AppResult<HttpResponse> {
    user.require(&[Role::Admin])?;
    let bus_id = MongoDB::string_to_id(&path.into_inner(), "Bus")?;

    let driver_id = match payload.driver_id.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => {
            let driver_id = MongoDB::string_to_id(raw, "Driver")?;
            let driver = db.find_user_by_id(&driver_id).await?.ok_or(AppError::NotFound("Driver"))?;
            if driver.role != Role::Driver {
                return Err(AppError::invalid_field("driver_id", "User is not a driver"));
            }
            if !driver.is_active {
                return Err(AppError::invalid_field("driver_id", "Driver account is deactivated"));
            }
            Some(driver_id)
        }
        None => None,
    };

    let bus = db.assign_driver(&bus_id, driver_id).await?;
    info!(
        "Admin {} set driver of {} to {:?}",
        user.id,
        bus.bus_number,
        driver_id.map(|id| id.to_hex())
    );
    Ok(HttpResponse::Ok().json(BusResponse::from(bus)))
}
