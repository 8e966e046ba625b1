use futures::TryStreamExt;
use log::{error, info, warn};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    options::FindOptions,
};

use super::{is_duplicate_key, MongoDB};
use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, Bus, CreateBookingRequest, PaymentStatus, Seat, SeatMap,
};

impl MongoDB {
    pub async fn get_buses(&self) -> AppResult<Vec<Bus>> {
        let find_options = FindOptions::builder().sort(doc! { "route.from": 1 }).build();
        let cursor = self.buses().find(None, find_options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn get_bus(&self, id: &ObjectId) -> AppResult<Option<Bus>> {
        Ok(self.buses().find_one(doc! { "_id": id }, None).await?)
    }

    pub async fn buses_for_driver(&self, driver_id: &ObjectId) -> AppResult<Vec<Bus>> {
        let cursor = self.buses().find(doc! { "driver_id": driver_id }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn assign_driver(&self, bus_id: &ObjectId, driver_id: Option<ObjectId>) -> AppResult<Bus> {
        let update = match driver_id {
            Some(driver) => doc! { "$set": { "driver_id": driver } },
            None => doc! { "$unset": { "driver_id": "" } },
        };
        let result = self.buses().update_one(doc! { "_id": bus_id }, update, None).await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Bus"));
        }
        self.get_bus(bus_id).await?.ok_or(AppError::NotFound("Bus"))
    }

    async fn availability_doc(&self, bus_id: &ObjectId, date: &str) -> AppResult<Option<Document>> {
        Ok(self
            .seat_availability()
            .find_one(doc! { "bus_id": bus_id, "travel_date": date }, None)
            .await?)
    }

    /// Seat map for a bus on a date. Without a stored map every seat is free.
    pub async fn get_bus_seats(&self, bus: &Bus, date: &str) -> AppResult<Vec<Seat>> {
        let Some(bus_id) = bus.id else {
            return Ok(vec![]);
        };

        match self.availability_doc(&bus_id, date).await? {
            Some(doc) => Ok(SeatMap::seats(&doc).unwrap_or_else(|| bus.open_seats())),
            None => Ok(bus.open_seats()),
        }
    }

    async fn rewrite_seat_map(
        &self,
        mut doc: Document,
        seat_numbers: &[String],
        available: bool,
    ) -> AppResult<()> {
        let id = doc.get_object_id("_id").map_err(|e| AppError::Internal(e.to_string()))?;
        SeatMap::mark(&mut doc, seat_numbers, available)?;
        self.seat_availability()
            .replace_one(doc! { "_id": id }, doc, None)
            .await?;
        Ok(())
    }

    /// Flips the availability of `seat_numbers` on the bus/date seat map,
    /// creating the map when seats are taken for the first time.
    async fn set_seat_availability(
        &self,
        bus: &Bus,
        date: &str,
        seat_numbers: &[String],
        available: bool,
    ) -> AppResult<()> {
        let bus_id = bus.id.ok_or(AppError::NotFound("Bus"))?;

        if let Some(doc) = self.availability_doc(&bus_id, date).await? {
            return self.rewrite_seat_map(doc, seat_numbers, available).await;
        }
        if available {
            return Ok(());
        }

        let fresh = SeatMap::new_document(bus, bus_id, date, seat_numbers);
        match self.seat_availability().insert_one(fresh, None).await {
            Ok(_) => Ok(()),
            // A concurrent booking created the map first; apply ours on top of it.
            Err(e) if is_duplicate_key(&e) => match self.availability_doc(&bus_id, date).await? {
                Some(doc) => self.rewrite_seat_map(doc, seat_numbers, available).await,
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Claims the seats, then records the booking. Seats are released again
    /// when the booking cannot be stored.
    pub async fn create_booking(
        &self,
        user_id: &ObjectId,
        req: &CreateBookingRequest,
    ) -> AppResult<Booking> {
        let bus_id = Self::string_to_id(&req.bus_id, "Bus")?;
        let bus = self.get_bus(&bus_id).await?.ok_or(AppError::NotFound("Bus"))?;

        let seats = self.get_bus_seats(&bus, &req.travel_date).await?;
        for wanted in &req.seat_numbers {
            let seat = seats
                .iter()
                .find(|s| &s.seat_number == wanted)
                .ok_or_else(|| AppError::BadRequest(format!("Seat {wanted} not found")))?;
            if !seat.is_available {
                return Err(AppError::Conflict(format!("Seat {wanted} is already booked")));
            }
        }

        let travel_date = req.travel_date.trim().to_string();
        self.set_seat_availability(&bus, &travel_date, &req.seat_numbers, false)
            .await?;

        let mut booking = Booking {
            id: None,
            user_id: *user_id,
            bus_id,
            seats: req.seat_numbers.clone(),
            travel_date,
            booking_date: DateTime::now(),
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            route: bus.route.clone(),
            total_price: bus.fare(req.seat_numbers.len()),
            passenger: req.passenger.clone(),
        };

        let result = match self.bookings().insert_one(&booking, None).await {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to store booking on {}: {}", bus.bus_number, e);
                if let Err(release) = self
                    .set_seat_availability(&bus, &booking.travel_date, &booking.seats, true)
                    .await
                {
                    error!("Failed to release seats {:?}: {}", booking.seats, release);
                }
                return Err(e.into());
            }
        };
        booking.id = result.inserted_id.as_object_id();

        info!(
            "User {} booked seats {:?} on {} for {}",
            user_id.to_hex(),
            booking.seats,
            bus.bus_number,
            booking.travel_date
        );
        Ok(booking)
    }

    pub async fn get_user_bookings(&self, user_id: &ObjectId) -> AppResult<Vec<Booking>> {
        let options = FindOptions::builder().sort(doc! { "booking_date": -1 }).build();
        let cursor = self.bookings().find(doc! { "user_id": user_id }, options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn all_bookings(&self, status: Option<BookingStatus>) -> AppResult<Vec<Booking>> {
        let filter = match status {
            Some(status) => doc! { "status": status.as_str() },
            None => doc! {},
        };
        let options = FindOptions::builder().sort(doc! { "booking_date": -1 }).build();
        let cursor = self.bookings().find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn confirmed_bookings_for_bus(&self, bus_id: &ObjectId) -> AppResult<Vec<Booking>> {
        let options = FindOptions::builder().sort(doc! { "travel_date": 1 }).build();
        let cursor = self
            .bookings()
            .find(
                doc! { "bus_id": bus_id, "status": BookingStatus::Confirmed.as_str() },
                options,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn owned_booking(&self, booking_id: &ObjectId, user_id: &ObjectId) -> AppResult<Booking> {
        self.bookings()
            .find_one(doc! { "_id": booking_id, "user_id": user_id }, None)
            .await?
            .ok_or(AppError::NotFound("Booking"))
    }

    pub async fn cancel_booking(&self, booking_id: &ObjectId, user_id: &ObjectId) -> AppResult<Booking> {
        let mut booking = self.owned_booking(booking_id, user_id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(AppError::BadRequest(format!(
                "Booking is already {}",
                booking.status.as_str().to_lowercase()
            )));
        }
        self.release_booking(&mut booking).await?;
        Ok(booking)
    }

    async fn release_booking(&self, booking: &mut Booking) -> AppResult<()> {
        let booking_id = booking.id.ok_or(AppError::NotFound("Booking"))?;
        booking.status = BookingStatus::Cancelled;
        booking.payment_status = booking.payment_status.after_cancellation();

        self.bookings()
            .update_one(
                doc! { "_id": booking_id },
                doc! { "$set": {
                    "status": booking.status.as_str(),
                    "payment_status": booking.payment_status.as_str(),
                } },
                None,
            )
            .await?;

        match self.get_bus(&booking.bus_id).await? {
            Some(bus) => {
                self.set_seat_availability(&bus, &booking.travel_date, &booking.seats, true)
                    .await?
            }
            None => warn!(
                "Bus {} for booking {} no longer exists",
                booking.bus_id.to_hex(),
                booking_id.to_hex()
            ),
        }
        Ok(())
    }

    pub async fn pay_booking(&self, booking_id: &ObjectId, user_id: &ObjectId) -> AppResult<Booking> {
        let mut booking = self.owned_booking(booking_id, user_id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(AppError::BadRequest("Only confirmed bookings can be paid".to_string()));
        }
        if booking.payment_status != PaymentStatus::Pending {
            return Err(AppError::Conflict("Booking is already paid".to_string()));
        }
        self.bookings()
            .update_one(
                doc! { "_id": booking_id, "payment_status": PaymentStatus::Pending.as_str() },
                doc! { "$set": { "payment_status": PaymentStatus::Paid.as_str() } },
                None,
            )
            .await?;
        booking.payment_status = PaymentStatus::Paid;
        Ok(booking)
    }

    /// Cancels every confirmed booking of a user, freeing their seats.
    pub async fn cancel_user_bookings(&self, user_id: &ObjectId) -> AppResult<usize> {
        let cursor = self
            .bookings()
            .find(
                doc! { "user_id": user_id, "status": BookingStatus::Confirmed.as_str() },
                None,
            )
            .await?;
        let mut active: Vec<Booking> = cursor.try_collect().await?;
        for booking in active.iter_mut() {
            self.release_booking(booking).await?;
        }
        Ok(active.len())
    }
}
