use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Fixed timetable entry for a bus.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Route {
    pub from: String,
    pub to: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub price: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Bus {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub bus_number: String,
    pub bus_type: String,
    pub total_seats: i32,
    pub route: Route,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<ObjectId>,
}

impl Bus {
    /// Seats are numbered from 1.
    pub fn seat_numbers(&self) -> impl Iterator<Item = String> {
        (1..=self.total_seats).map(|n| n.to_string())
    }

    pub fn fare(&self, seat_count: usize) -> f64 {
        self.route.price * seat_count as f64
    }

    /// Seat map for a date on which nothing is booked yet.
    pub fn open_seats(&self) -> Vec<Seat> {
        self.seat_numbers()
            .map(|seat_number| Seat {
                seat_number,
                is_available: true,
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Seat {
    pub seat_number: String,
    pub is_available: bool,
}

impl Seat {
    fn from_document(doc: &Document) -> Self {
        Self {
            seat_number: doc.get_str("seat_number").unwrap_or("").to_string(),
            is_available: doc.get_bool("is_available").unwrap_or(false),
        }
    }
}

/// Stored per-date seat map (`seat_availability` collection).
pub struct SeatMap;

impl SeatMap {
    pub fn seats(doc: &Document) -> Option<Vec<Seat>> {
        let seats = doc.get_array("seats").ok()?;
        Some(
            seats
                .iter()
                .filter_map(|s| s.as_document())
                .map(Seat::from_document)
                .collect(),
        )
    }

    /// A new map with `booked` already taken.
    pub fn new_document(bus: &Bus, bus_id: ObjectId, date: &str, booked: &[String]) -> Document {
        let seats: Vec<Document> = bus
            .seat_numbers()
            .map(|seat_number| {
                doc! {
                    "is_available": !booked.contains(&seat_number),
                    "seat_number": seat_number,
                }
            })
            .collect();
        doc! { "bus_id": bus_id, "travel_date": date, "seats": seats }
    }

    /// Flips `seat_numbers` in a stored map. Taking a seat that is already
    /// taken is a conflict and leaves the map untouched.
    pub fn mark(doc: &mut Document, seat_numbers: &[String], available: bool) -> AppResult<()> {
        let Ok(seats) = doc.get_array_mut("seats") else {
            return Err(AppError::Internal("seat map has no seats array".to_string()));
        };

        if !available {
            let taken = seats
                .iter()
                .filter_map(|s| s.as_document())
                .map(Seat::from_document)
                .find(|seat| !seat.is_available && seat_numbers.contains(&seat.seat_number));
            if let Some(seat) = taken {
                return Err(AppError::Conflict(format!(
                    "Seat {} is already booked",
                    seat.seat_number
                )));
            }
        }

        for seat in seats.iter_mut().filter_map(|s| s.as_document_mut()) {
            let hit = seat
                .get_str("seat_number")
                .is_ok_and(|n| seat_numbers.iter().any(|wanted| wanted == n));
            if hit {
                seat.insert("is_available", available);
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct BusResponse {
    pub id: String,
    pub bus_number: String,
    pub bus_type: String,
    pub total_seats: i32,
    pub route: Route,
    pub driver_id: Option<String>,
}

impl From<Bus> for BusResponse {
    fn from(bus: Bus) -> Self {
        Self {
            id: bus.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            bus_number: bus.bus_number,
            bus_type: bus.bus_type,
            total_seats: bus.total_seats,
            route: bus.route,
            driver_id: bus.driver_id.map(|oid| oid.to_hex()),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct SeatAvailabilityResponse {
    pub travel_date: String,
    pub seats: Vec<Seat>,
}

#[derive(Deserialize)]
pub struct SeatDateQuery {
    pub date: String,
}

#[derive(Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> Bus {
        Bus {
            id: Some(ObjectId::new()),
            bus_number: "SLTB - NC 4521".into(),
            bus_type: "Normal".into(),
            total_seats: 4,
            route: Route {
                from: "Colombo".into(),
                to: "Kandy".into(),
                departure_time: "06:00 AM".into(),
                arrival_time: "09:30 AM".into(),
                price: 480.0,
            },
            driver_id: None,
        }
    }

    fn seats(numbers: &[&str]) -> Vec<String> {
        numbers.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fare_scales_with_seat_count() {
        assert_eq!(bus().fare(3), 1440.0);
        assert_eq!(bus().open_seats().len(), 4);
        assert!(bus().open_seats().iter().all(|s| s.is_available));
    }

    #[test]
    fn new_map_marks_booked_seats() {
        let b = bus();
        let doc = SeatMap::new_document(&b, b.id.unwrap(), "2026-11-02", &seats(&["2", "4"]));
        let map = SeatMap::seats(&doc).unwrap();
        let free: Vec<&str> = map
            .iter()
            .filter(|s| s.is_available)
            .map(|s| s.seat_number.as_str())
            .collect();
        assert_eq!(free, ["1", "3"]);
        assert_eq!(doc.get_str("travel_date").unwrap(), "2026-11-02");
    }

    #[test]
    fn booking_a_taken_seat_conflicts_and_changes_nothing() {
        let b = bus();
        let mut doc = SeatMap::new_document(&b, b.id.unwrap(), "2026-11-02", &seats(&["2"]));
        let before = doc.clone();

        let err = SeatMap::mark(&mut doc, &seats(&["1", "2"]), false).unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Seat 2 is already booked"));
        assert_eq!(doc, before);
    }

    #[test]
    fn releasing_seats_frees_them() {
        let b = bus();
        let mut doc = SeatMap::new_document(&b, b.id.unwrap(), "2026-11-02", &seats(&["1", "2"]));
        SeatMap::mark(&mut doc, &seats(&["2"]), true).unwrap();
        let map = SeatMap::seats(&doc).unwrap();
        assert!(!map[0].is_available);
        assert!(map[1].is_available);

        SeatMap::mark(&mut doc, &seats(&["3"]), false).unwrap();
        assert!(!SeatMap::seats(&doc).unwrap()[2].is_available);
    }
}
