//! Field validators and the role-conditional form rules behind the
//! registration, profile, booking and contact endpoints.
//!
//! Every form-level function collects all problems before failing, so the
//! client can mark each offending field at once.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime, Timelike, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{
    CreateTicketRequest, DriverDetails, DriverLicense, Passenger, RegisterRequest, Role,
    ScheduleSlot, UpdateProfileRequest, Vehicle,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_SEATS_PER_BOOKING: usize = 6;
pub const MAX_SCHEDULE_SLOTS: usize = 14;
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;
pub const LICENSE_CLASSES: [&str; 13] = [
    "A1", "A", "B1", "B", "C1", "C", "CE", "D1", "D", "DE", "G1", "G", "J",
];

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:0|\+94|94)7[0-9]{8}$").unwrap());
static NIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[0-9]{9}[VvXx]|[0-9]{12})$").unwrap());
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\- ]{3,30}$").unwrap());
static FULL_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z .'\-]{2,80}$").unwrap());
static LICENSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][0-9]{7}$").unwrap());
static PLATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,3}-[0-9]{4}$").unwrap());
static HTTP_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap());
static DATA_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:image/(?:png|jpe?g|gif|webp);base64,([A-Za-z0-9+/]+={0,2})$").unwrap()
});

/// Accumulates field errors for one form.
#[derive(Default)]
struct Form {
    errors: FieldErrors,
}

impl Form {
    fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.reject(field, message);
        }
    }

    fn reject(&mut self, field: &str, message: &str) {
        // First problem per field wins.
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

fn compact(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}

/// Sri Lankan mobile numbers: `07XXXXXXXX`, `+947XXXXXXXX` or `947XXXXXXXX`.
pub fn is_valid_phone(raw: &str) -> bool {
    PHONE_RE.is_match(&compact(raw))
}

/// Canonical `+94` form of a valid phone number.
pub fn normalize_phone(raw: &str) -> String {
    let digits = compact(raw);
    if let Some(rest) = digits.strip_prefix('0') {
        format!("+94{rest}")
    } else if digits.starts_with("94") {
        format!("+{digits}")
    } else {
        digits
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() < 3 || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

/// Returns the first rule the password breaks, if any.
pub fn password_problem(password: &str) -> Option<&'static str> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        Some("Password must be at least 8 characters")
    } else if len > MAX_PASSWORD_LENGTH {
        Some("Password must be at most 128 characters")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain an uppercase letter")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain a lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain a number")
    } else {
        None
    }
}

/// Old (`#########V`) and new (12 digit) national identity card numbers.
pub fn is_valid_nic(raw: &str) -> bool {
    NIC_RE.is_match(raw.trim())
}

pub fn is_valid_username(raw: &str) -> bool {
    USERNAME_RE.is_match(raw.trim())
}

pub fn is_valid_full_name(raw: &str) -> bool {
    FULL_NAME_RE.is_match(raw.trim())
}

pub fn is_valid_license_number(raw: &str) -> bool {
    LICENSE_RE.is_match(raw)
}

pub fn is_valid_plate(raw: &str) -> bool {
    PLATE_RE.is_match(raw)
}

pub fn normalize_plate(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Minutes since midnight for a 24-hour `HH:MM` string.
pub fn parse_time(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .ok()
        .map(|t| t.hour() * 60 + t.minute())
}

pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.trim().to_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Uppercases identifiers and canonicalizes day names before validation and storage.
pub fn normalize_driver_details(details: &mut DriverDetails) {
    if let Some(license) = details.license.as_mut() {
        license.number = license.number.trim().to_uppercase();
        license.class = license.class.trim().to_uppercase();
        license.expiry_date = license.expiry_date.trim().to_string();
    }
    if let Some(vehicle) = details.vehicle.as_mut() {
        vehicle.plate_number = normalize_plate(&vehicle.plate_number);
        vehicle.model = vehicle.model.trim().to_string();
    }
    if let Some(schedule) = details.schedule.as_mut() {
        for slot in schedule.iter_mut() {
            if let Some(day) = parse_weekday(&slot.day) {
                slot.day = weekday_name(day).to_string();
            }
            slot.start_time = slot.start_time.trim().to_string();
            slot.end_time = slot.end_time.trim().to_string();
        }
    }
}

fn check_license(form: &mut Form, license: &DriverLicense, today: NaiveDate) {
    form.check(
        is_valid_license_number(&license.number),
        "driver.license.number",
        "License number must be a letter followed by 7 digits",
    );
    form.check(
        LICENSE_CLASSES.contains(&license.class.as_str()),
        "driver.license.class",
        "Unknown license class",
    );
    match parse_date(&license.expiry_date) {
        None => form.reject("driver.license.expiry_date", "Expiry date must be YYYY-MM-DD"),
        Some(expiry) if expiry < today => {
            form.reject("driver.license.expiry_date", "License has expired")
        }
        Some(_) => {}
    }
}

fn check_vehicle(form: &mut Form, vehicle: &Vehicle) {
    form.check(
        is_valid_plate(&vehicle.plate_number),
        "driver.vehicle.plate_number",
        "Plate number must look like AB-1234 or ABC-1234",
    );
    let model_len = vehicle.model.chars().count();
    form.check(
        (2..=50).contains(&model_len),
        "driver.vehicle.model",
        "Vehicle model must be 2-50 characters",
    );
    form.check(
        (1..=80).contains(&vehicle.capacity),
        "driver.vehicle.capacity",
        "Capacity must be between 1 and 80",
    );
}

fn check_schedule(form: &mut Form, schedule: &[ScheduleSlot]) {
    if schedule.is_empty() {
        form.reject("driver.schedule", "At least one schedule slot is required");
        return;
    }
    if schedule.len() > MAX_SCHEDULE_SLOTS {
        form.reject("driver.schedule", "Too many schedule slots");
        return;
    }

    let mut by_day: HashMap<Weekday, Vec<(u32, u32)>> = HashMap::new();
    for (i, slot) in schedule.iter().enumerate() {
        let day = parse_weekday(&slot.day);
        let start = parse_time(&slot.start_time);
        let end = parse_time(&slot.end_time);

        form.check(day.is_some(), &format!("driver.schedule[{i}].day"), "Unknown day");
        form.check(
            start.is_some(),
            &format!("driver.schedule[{i}].start_time"),
            "Time must be HH:MM",
        );
        form.check(
            end.is_some(),
            &format!("driver.schedule[{i}].end_time"),
            "Time must be HH:MM",
        );

        if let (Some(day), Some(start), Some(end)) = (day, start, end) {
            if start >= end {
                form.reject(
                    &format!("driver.schedule[{i}].end_time"),
                    "End time must be after start time",
                );
            } else {
                by_day.entry(day).or_default().push((start, end));
            }
        }
    }

    for (day, mut slots) in by_day {
        slots.sort_unstable();
        if slots.windows(2).any(|pair| pair[1].0 < pair[0].1) {
            form.reject(
                "driver.schedule",
                &format!("Schedule slots overlap on {}", weekday_name(day)),
            );
        }
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn check_optional_text(
    form: &mut Form,
    value: &Option<String>,
    field: &str,
    valid: impl Fn(&str) -> bool,
    message: &str,
) {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        form.check(valid(value), field, message);
    }
}

pub fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    let mut form = Form::default();
    form.check(
        is_valid_username(&req.username),
        "username",
        "Username must be 3-30 letters, digits, spaces or ._-",
    );
    form.check(is_valid_email(&req.email), "email", "Invalid email address");
    if let Some(problem) = password_problem(&req.password) {
        form.reject("password", problem);
    }
    check_optional_text(&mut form, &req.phone, "phone", is_valid_phone, "Invalid phone number");
    if let Some(role) = req.role.as_deref() {
        form.check(
            matches!(Role::normalize(role), Role::Passenger | Role::Driver),
            "role",
            "Only passenger or driver accounts can be registered",
        );
        if Role::normalize(role) == Role::Driver {
            form.check(
                req.phone.as_deref().is_some_and(|p| !p.trim().is_empty()),
                "phone",
                "Drivers must provide a phone number",
            );
        }
    }
    form.finish()
}

/// Checks a profile edit against the rules for `role`.
///
/// `existing_driver` is the stored driver section; a submitted driver section is
/// merged over it and the result must contain license, vehicle and schedule.
pub fn validate_profile_update(
    role: Role,
    req: &UpdateProfileRequest,
    existing_driver: Option<&DriverDetails>,
    today: NaiveDate,
) -> AppResult<()> {
    let mut form = Form::default();

    check_optional_text(
        &mut form,
        &req.username,
        "username",
        is_valid_username,
        "Username must be 3-30 letters, digits, spaces or ._-",
    );
    if req.username.as_deref().is_some_and(|u| u.trim().is_empty()) {
        form.reject("username", "Username cannot be empty");
    }
    check_optional_text(
        &mut form,
        &req.full_name,
        "full_name",
        is_valid_full_name,
        "Full name may only contain letters, spaces and .'-",
    );
    check_optional_text(&mut form, &req.phone, "phone", is_valid_phone, "Invalid phone number");
    check_optional_text(&mut form, &req.nic, "nic", is_valid_nic, "Invalid NIC number");
    check_optional_text(
        &mut form,
        &req.address,
        "address",
        |a| a.chars().count() <= 200,
        "Address must be at most 200 characters",
    );

    match role {
        Role::Driver => {
            if req.phone.as_deref().is_some_and(|p| p.trim().is_empty()) {
                form.reject("phone", "Drivers must keep a phone number");
            }
            form.check(
                !has_text(&req.department),
                "department",
                "Only support staff have a department",
            );
            if let Some(driver) = &req.driver {
                if let Some(license) = &driver.license {
                    check_license(&mut form, license, today);
                }
                if let Some(vehicle) = &driver.vehicle {
                    check_vehicle(&mut form, vehicle);
                }
                if let Some(schedule) = &driver.schedule {
                    check_schedule(&mut form, schedule);
                }
                let merged = merge_driver_details(existing_driver, driver);
                form.check(
                    merged.is_complete(),
                    "driver",
                    "License, vehicle and schedule details are all required",
                );
            }
        }
        Role::Support => {
            form.check(
                req.driver.is_none(),
                "driver",
                "Driver details can only be edited on driver accounts",
            );
            check_optional_text(
                &mut form,
                &req.department,
                "department",
                |d| (2..=50).contains(&d.chars().count()),
                "Department must be 2-50 characters",
            );
        }
        Role::Passenger | Role::Admin => {
            form.check(
                req.driver.is_none(),
                "driver",
                "Driver details can only be edited on driver accounts",
            );
            form.check(
                !has_text(&req.department),
                "department",
                "Only support staff have a department",
            );
        }
    }

    form.finish()
}

/// Submitted sections replace stored ones; absent sections are kept.
pub fn merge_driver_details(
    existing: Option<&DriverDetails>,
    update: &DriverDetails,
) -> DriverDetails {
    let mut merged = existing.cloned().unwrap_or_default();
    if update.license.is_some() {
        merged.license = update.license.clone();
    }
    if update.vehicle.is_some() {
        merged.vehicle = update.vehicle.clone();
    }
    if update.schedule.is_some() {
        merged.schedule = update.schedule.clone();
    }
    merged
}

pub fn validate_new_password(new_password: &str, confirm_password: &str) -> AppResult<()> {
    let mut form = Form::default();
    if let Some(problem) = password_problem(new_password) {
        form.reject("new_password", problem);
    }
    form.check(
        new_password == confirm_password,
        "confirm_password",
        "Passwords do not match",
    );
    form.finish()
}

pub fn validate_avatar(url: &str) -> AppResult<()> {
    let url = url.trim();
    if HTTP_URL_RE.is_match(url) {
        return if url.len() <= 2048 {
            Ok(())
        } else {
            Err(AppError::invalid_field("avatar_url", "Avatar URL is too long"))
        };
    }
    match DATA_URI_RE.captures(url) {
        Some(caps) => {
            let encoded = caps.get(1).map_or(0, |m| m.len());
            if encoded / 4 * 3 <= MAX_AVATAR_BYTES {
                Ok(())
            } else {
                Err(AppError::invalid_field("avatar_url", "Avatar image must be at most 2 MB"))
            }
        }
        None => Err(AppError::invalid_field(
            "avatar_url",
            "Avatar must be an http(s) URL or a PNG, JPEG, GIF or WebP data URI",
        )),
    }
}

pub fn validate_booking(
    seat_numbers: &[String],
    travel_date: &str,
    passenger: Option<&Passenger>,
    today: NaiveDate,
) -> AppResult<()> {
    let mut form = Form::default();

    if seat_numbers.is_empty() {
        form.reject("seat_numbers", "Select at least one seat");
    } else if seat_numbers.len() > MAX_SEATS_PER_BOOKING {
        form.reject("seat_numbers", "At most 6 seats can be booked at once");
    } else {
        let mut seen = seat_numbers.to_vec();
        seen.sort();
        seen.dedup();
        form.check(
            seen.len() == seat_numbers.len(),
            "seat_numbers",
            "The same seat was selected twice",
        );
    }

    match parse_date(travel_date) {
        None => form.reject("travel_date", "Travel date must be YYYY-MM-DD"),
        Some(date) if date < today => form.reject("travel_date", "Travel date is in the past"),
        Some(_) => {}
    }

    if let Some(p) = passenger {
        form.check(
            (2..=80).contains(&p.name.trim().chars().count()),
            "passenger.name",
            "Passenger name must be 2-80 characters",
        );
        form.check(
            (0..=120).contains(&p.age),
            "passenger.age",
            "Passenger age must be between 0 and 120",
        );
        form.check(
            matches!(p.gender.to_lowercase().as_str(), "male" | "female" | "other"),
            "passenger.gender",
            "Gender must be male, female or other",
        );
        check_optional_text(&mut form, &p.phone, "passenger.phone", is_valid_phone, "Invalid phone number");
        check_optional_text(&mut form, &p.email, "passenger.email", is_valid_email, "Invalid email address");
    }

    form.finish()
}

pub fn validate_ticket(req: &CreateTicketRequest) -> AppResult<()> {
    let mut form = Form::default();
    form.check(
        (2..=80).contains(&req.name.trim().chars().count()),
        "name",
        "Name must be 2-80 characters",
    );
    form.check(is_valid_email(&req.email), "email", "Invalid email address");
    check_optional_text(&mut form, &req.phone, "phone", is_valid_phone, "Invalid phone number");
    form.check(
        (3..=120).contains(&req.subject.trim().chars().count()),
        "subject",
        "Subject must be 3-120 characters",
    );
    form.check(
        (10..=2000).contains(&req.message.trim().chars().count()),
        "message",
        "Message must be 10-2000 characters",
    );
    form.finish()
}

pub fn validate_reply(message: &str) -> AppResult<()> {
    let len = message.trim().chars().count();
    if (1..=2000).contains(&len) {
        Ok(())
    } else {
        Err(AppError::invalid_field("message", "Reply must be 1-2000 characters"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn fields(result: AppResult<()>) -> FieldErrors {
        match result {
            Err(AppError::Validation(fields)) => fields,
            Err(other) => panic!("expected validation error, got {other:?}"),
            Ok(()) => FieldErrors::new(),
        }
    }

    fn slot(day: &str, start: &str, end: &str) -> ScheduleSlot {
        ScheduleSlot {
            day: day.into(),
            start_time: start.into(),
            end_time: end.into(),
            route_from: Some("Colombo".into()),
            route_to: Some("Kandy".into()),
        }
    }

    fn full_driver() -> DriverDetails {
        DriverDetails {
            license: Some(DriverLicense {
                number: "B1234567".into(),
                class: "D".into(),
                expiry_date: "2029-05-01".into(),
            }),
            vehicle: Some(Vehicle {
                plate_number: "NB-4521".into(),
                model: "Lanka Ashok Leyland".into(),
                capacity: 54,
                vehicle_type: Some("Semi-Luxury".into()),
            }),
            schedule: Some(vec![slot("Monday", "06:00", "10:30")]),
        }
    }

    #[test]
    fn phone_numbers() {
        assert!(is_valid_phone("0771234567"));
        assert!(is_valid_phone("+94771234567"));
        assert!(is_valid_phone("077 123 4567"));
        assert!(is_valid_phone("94771234567"));
        assert!(!is_valid_phone("0123456789"));
        assert!(!is_valid_phone("077123456"));
        assert!(!is_valid_phone("+9477123456789"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn phone_numbers_normalize_to_international_form() {
        assert_eq!(normalize_phone("077-123-4567"), "+94771234567");
        assert_eq!(normalize_phone("94771234567"), "+94771234567");
        assert_eq!(normalize_phone("+94771234567"), "+94771234567");
    }

    #[test]
    fn emails() {
        assert!(is_valid_email("nimal@example.lk"));
        assert!(is_valid_email("a.b+c@mail.example.com"));
        assert!(!is_valid_email("nimal"));
        assert!(!is_valid_email("nimal@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn password_rules() {
        assert_eq!(password_problem("Short1"), Some("Password must be at least 8 characters"));
        assert_eq!(
            password_problem("alllowercase1"),
            Some("Password must contain an uppercase letter")
        );
        assert_eq!(password_problem("NoDigitsHere"), Some("Password must contain a number"));
        assert_eq!(password_problem("Galle2024"), None);
    }

    #[test]
    fn nic_numbers() {
        assert!(is_valid_nic("853400937V"));
        assert!(is_valid_nic("853400937x"));
        assert!(is_valid_nic("198534009372"));
        assert!(!is_valid_nic("85340093V"));
        assert!(!is_valid_nic("19853400937"));
    }

    #[test]
    fn plates_are_normalized_before_matching() {
        assert_eq!(normalize_plate(" nb 4521 "), "NB-4521");
        assert_eq!(normalize_plate("wp-abc-1234"), "WP-ABC-1234");
        assert!(is_valid_plate(&normalize_plate("abc 1234")));
        assert!(!is_valid_plate(&normalize_plate("wp-abc-1234")));
    }

    #[test]
    fn times_and_days() {
        assert_eq!(parse_time("06:30"), Some(390));
        assert_eq!(parse_time("23:59"), Some(1439));
        assert_eq!(parse_time("24:00"), None);
        assert_eq!(parse_time("6:30"), None);
        assert_eq!(parse_weekday("FRIDAY"), Some(Weekday::Fri));
        assert_eq!(parse_weekday("Fri"), None);
    }

    #[test]
    fn registration_reports_every_bad_field() {
        let req = RegisterRequest {
            username: "x".into(),
            email: "not-an-email".into(),
            password: "weak".into(),
            phone: Some("0123456789".into()),
            role: Some("admin".into()),
        };
        let errors = fields(validate_registration(&req));
        assert_eq!(errors.len(), 5);
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
        assert!(errors.contains_key("phone"));
        assert!(errors.contains_key("role"));
    }

    #[test]
    fn driver_registration_needs_phone() {
        let req = RegisterRequest {
            username: "kasun".into(),
            email: "kasun@example.lk".into(),
            password: "Kandy2024".into(),
            phone: None,
            role: Some("Driver".into()),
        };
        let errors = fields(validate_registration(&req));
        assert_eq!(errors.get("phone").map(String::as_str), Some("Drivers must provide a phone number"));
    }

    #[test]
    fn complete_driver_profile_passes() {
        let req = UpdateProfileRequest {
            phone: Some("0771234567".into()),
            driver: Some(full_driver()),
            ..Default::default()
        };
        assert!(validate_profile_update(Role::Driver, &req, None, today()).is_ok());
    }

    #[test]
    fn driver_sections_are_checked_field_by_field() {
        let mut driver = full_driver();
        driver.license = Some(DriverLicense {
            number: "1234567".into(),
            class: "Z".into(),
            expiry_date: "2020-01-01".into(),
        });
        driver.vehicle = Some(Vehicle {
            plate_number: "1234".into(),
            model: "X".into(),
            capacity: 0,
            vehicle_type: None,
        });
        let req = UpdateProfileRequest {
            driver: Some(driver),
            ..Default::default()
        };
        let errors = fields(validate_profile_update(Role::Driver, &req, None, today()));
        assert_eq!(errors["driver.license.expiry_date"], "License has expired");
        assert!(errors.contains_key("driver.license.number"));
        assert!(errors.contains_key("driver.license.class"));
        assert!(errors.contains_key("driver.vehicle.plate_number"));
        assert!(errors.contains_key("driver.vehicle.model"));
        assert!(errors.contains_key("driver.vehicle.capacity"));
    }

    #[test]
    fn schedule_rejects_inverted_and_overlapping_slots() {
        let mut driver = full_driver();
        driver.schedule = Some(vec![
            slot("Monday", "06:00", "10:00"),
            slot("monday", "09:30", "12:00"),
            slot("Tuesday", "14:00", "13:00"),
            slot("Funday", "08:00", "9:00"),
        ]);
        let req = UpdateProfileRequest {
            driver: Some(driver),
            ..Default::default()
        };
        let errors = fields(validate_profile_update(Role::Driver, &req, None, today()));
        assert_eq!(errors["driver.schedule"], "Schedule slots overlap on Monday");
        assert_eq!(errors["driver.schedule[2].end_time"], "End time must be after start time");
        assert_eq!(errors["driver.schedule[3].day"], "Unknown day");
        assert_eq!(errors["driver.schedule[3].end_time"], "Time must be HH:MM");
    }

    #[test]
    fn back_to_back_slots_do_not_overlap() {
        let mut driver = full_driver();
        driver.schedule = Some(vec![
            slot("Friday", "06:00", "10:00"),
            slot("Friday", "10:00", "14:00"),
        ]);
        let req = UpdateProfileRequest {
            driver: Some(driver),
            ..Default::default()
        };
        assert!(validate_profile_update(Role::Driver, &req, None, today()).is_ok());
    }

    #[test]
    fn first_driver_profile_needs_all_sections() {
        let mut driver = full_driver();
        driver.vehicle = None;
        let req = UpdateProfileRequest {
            driver: Some(driver.clone()),
            ..Default::default()
        };
        let errors = fields(validate_profile_update(Role::Driver, &req, None, today()));
        assert_eq!(
            errors["driver"],
            "License, vehicle and schedule details are all required"
        );

        // With a stored vehicle the partial update is fine.
        let stored = full_driver();
        assert!(validate_profile_update(Role::Driver, &req, Some(&stored), today()).is_ok());
    }

    #[test]
    fn drivers_cannot_clear_their_phone() {
        let req = UpdateProfileRequest {
            phone: Some("  ".into()),
            ..Default::default()
        };
        let errors = fields(validate_profile_update(Role::Driver, &req, None, today()));
        assert_eq!(errors["phone"], "Drivers must keep a phone number");
        assert!(validate_profile_update(Role::Passenger, &req, None, today()).is_ok());
    }

    #[test]
    fn passengers_cannot_submit_driver_or_department_fields() {
        let req = UpdateProfileRequest {
            department: Some("Operations".into()),
            driver: Some(full_driver()),
            ..Default::default()
        };
        let errors = fields(validate_profile_update(Role::Passenger, &req, None, today()));
        assert!(errors.contains_key("driver"));
        assert!(errors.contains_key("department"));

        let errors = fields(validate_profile_update(Role::Support, &req, None, today()));
        assert!(errors.contains_key("driver"));
        assert!(!errors.contains_key("department"));
    }

    #[test]
    fn blank_department_counts_as_absent() {
        for blank in ["", "   "] {
            let req = UpdateProfileRequest {
                department: Some(blank.into()),
                ..Default::default()
            };
            assert!(validate_profile_update(Role::Passenger, &req, None, today()).is_ok());
            assert!(validate_profile_update(Role::Admin, &req, None, today()).is_ok());
            assert!(validate_profile_update(Role::Driver, &req, None, today()).is_ok());
        }

        let req = UpdateProfileRequest {
            department: Some("Ops".into()),
            ..Default::default()
        };
        let errors = fields(validate_profile_update(Role::Admin, &req, None, today()));
        assert_eq!(errors["department"], "Only support staff have a department");
    }

    #[test]
    fn driver_details_normalize_in_place() {
        let mut driver = full_driver();
        driver.license.as_mut().unwrap().number = " b1234567 ".into();
        driver.vehicle.as_mut().unwrap().plate_number = "nb 4521".into();
        driver.schedule = Some(vec![slot("monday", " 06:00", "10:00 ")]);
        normalize_driver_details(&mut driver);
        assert_eq!(driver.license.as_ref().unwrap().number, "B1234567");
        assert_eq!(driver.vehicle.as_ref().unwrap().plate_number, "NB-4521");
        let slot = &driver.schedule.as_ref().unwrap()[0];
        assert_eq!(slot.day, "Monday");
        assert_eq!(slot.start_time, "06:00");
    }

    #[test]
    fn avatars() {
        assert!(validate_avatar("https://cdn.example.lk/u/1.png").is_ok());
        assert!(validate_avatar("data:image/png;base64,iVBORw0KGgo=").is_ok());
        assert!(validate_avatar("javascript:alert(1)").is_err());
        assert!(validate_avatar("data:text/html;base64,PGgxPg==").is_err());

        let huge = format!("data:image/png;base64,{}", "A".repeat(MAX_AVATAR_BYTES / 3 * 4 + 8));
        assert!(validate_avatar(&huge).is_err());
    }

    #[test]
    fn new_password_must_match_confirmation() {
        let errors = fields(validate_new_password("Matara2024", "Matara2025"));
        assert_eq!(errors["confirm_password"], "Passwords do not match");
        assert!(validate_new_password("Matara2024", "Matara2024").is_ok());
    }

    #[test]
    fn bookings() {
        let seats = vec!["1".to_string(), "2".to_string()];
        assert!(validate_booking(&seats, "2026-10-20", None, today()).is_ok());
        assert!(validate_booking(&seats, "2026-10-18", None, today()).is_ok());

        let errors = fields(validate_booking(&seats, "2026-10-17", None, today()));
        assert_eq!(errors["travel_date"], "Travel date is in the past");

        let dupes = vec!["4".to_string(), "4".to_string()];
        let errors = fields(validate_booking(&dupes, "20/10/2026", None, today()));
        assert!(errors.contains_key("seat_numbers"));
        assert!(errors.contains_key("travel_date"));

        let too_many: Vec<String> = (1..=7).map(|n| n.to_string()).collect();
        assert!(validate_booking(&too_many, "2026-10-20", None, today()).is_err());
    }

    #[test]
    fn booking_passenger_snapshot() {
        let passenger = Passenger {
            name: "A".into(),
            age: 130,
            gender: "unknown".into(),
            phone: Some("0123456789".into()),
            email: None,
        };
        let errors = fields(validate_booking(&["1".into()], "2026-10-20", Some(&passenger), today()));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn tickets() {
        let mut req = CreateTicketRequest {
            name: "Nimal Perera".into(),
            email: "nimal@example.lk".into(),
            phone: Some("+94771234567".into()),
            subject: "Refund".into(),
            message: "My bus was cancelled last night.".into(),
            category: Default::default(),
        };
        assert!(validate_ticket(&req).is_ok());
        req.message = "help".into();
        req.phone = Some("12345".into());
        let errors = fields(validate_ticket(&req));
        assert!(errors.contains_key("message"));
        assert!(errors.contains_key("phone"));
    }
}
