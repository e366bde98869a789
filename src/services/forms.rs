use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::models::{Booking, ServiceType, TimeSlot};

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_INVALID_DATE: &str = "Enter a valid date.";
pub const MSG_PAST_DATE: &str = "Preferred date cannot be in the past.";
pub const MSG_SHORT_PHONE: &str = "Phone number seems too short.";
pub const MSG_INVALID_EMAIL: &str = "Enter a valid email address.";
pub const MSG_INVALID_SLOT: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const MSG_INVALID_TIME: &str = "Enter a valid time.";
pub const MSG_END_BEFORE_START: &str = "End time must be after start time.";
pub const MSG_DUPLICATE_LABEL: &str = "Time slot with this Label already exists.";

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";
const NAME_MAX: usize = 100;
const PHONE_MAX: usize = 20;
const PHONE_MIN_DIGITS: usize = 7;
const EMAIL_MAX: usize = 254;
const LABEL_MAX: usize = 50;

/// Raw booking form exactly as posted. Every field defaults to an empty
/// string so a partial or empty POST still deserializes and gets reported
/// as validation errors rather than a rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingForm {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub car_model: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub preferred_date: String,
    #[serde(default)]
    pub slot: String,
    #[serde(default)]
    pub notes: String,
}

/// Validation errors keyed by field name, in the order they were found
/// per field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// A booking form that passed validation, with everything parsed into its
/// storage types. The phone keeps whatever formatting the customer typed.
#[derive(Debug, Clone)]
pub struct ValidBooking {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub car_model: String,
    pub service_type: ServiceType,
    pub preferred_date: NaiveDate,
    pub slot_id: String,
    pub notes: Option<String>,
}

impl ValidBooking {
    /// Build a fresh booking owned by `owner_id`.
    pub fn into_booking(self, owner_id: &str) -> Booking {
        Booking {
            id: Uuid::new_v4().to_string(),
            user_id: owner_id.to_string(),
            customer_name: self.customer_name,
            email: self.email,
            phone: self.phone,
            car_model: self.car_model,
            service_type: self.service_type,
            preferred_date: self.preferred_date,
            slot_id: self.slot_id,
            notes: self.notes,
            created_at: Utc::now().naive_utc(),
        }
    }

    /// Copy the editable fields onto an existing booking. Identity, owner
    /// and creation timestamp stay as they are.
    pub fn apply_to(&self, booking: &mut Booking) {
        booking.customer_name = self.customer_name.clone();
        booking.email = self.email.clone();
        booking.phone = self.phone.clone();
        booking.car_model = self.car_model.clone();
        booking.service_type = self.service_type;
        booking.preferred_date = self.preferred_date;
        booking.slot_id = self.slot_id.clone();
        booking.notes = self.notes.clone();
    }
}

pub fn validate(form: &BookingForm, slots: &[TimeSlot]) -> Result<ValidBooking, FieldErrors> {
    validate_at(form, slots, Utc::now().date_naive())
}

/// Validate against an explicit `today` so the past-date rule is testable.
///
/// Text fields are trimmed before any rule runs. Choice fields are matched
/// verbatim. A field that fails its built-in checks skips its follow-up
/// rule, so "too short" never piles onto "too long".
pub fn validate_at(
    form: &BookingForm,
    slots: &[TimeSlot],
    today: NaiveDate,
) -> Result<ValidBooking, FieldErrors> {
    let mut errors = FieldErrors::new();

    let customer_name = form.customer_name.trim();
    check_required_text(&mut errors, "customer_name", customer_name, NAME_MAX);

    let car_model = form.car_model.trim();
    check_required_text(&mut errors, "car_model", car_model, NAME_MAX);

    let email = form.email.trim();
    if email.is_empty() {
        add(&mut errors, "email", MSG_REQUIRED.to_string());
    } else {
        if !email.validate_email() {
            add(&mut errors, "email", MSG_INVALID_EMAIL.to_string());
        }
        check_max_len(&mut errors, "email", email, EMAIL_MAX);
    }

    let phone = form.phone.trim();
    if phone.is_empty() {
        add(&mut errors, "phone", MSG_REQUIRED.to_string());
    } else if check_max_len(&mut errors, "phone", phone, PHONE_MAX) {
        let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
        if digits < PHONE_MIN_DIGITS {
            add(&mut errors, "phone", MSG_SHORT_PHONE.to_string());
        }
    }

    let mut service_type = None;
    if form.service_type.is_empty() {
        add(&mut errors, "service_type", MSG_REQUIRED.to_string());
    } else {
        match ServiceType::parse(&form.service_type) {
            Some(parsed) => service_type = Some(parsed),
            None => add(
                &mut errors,
                "service_type",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    form.service_type
                ),
            ),
        }
    }

    let mut preferred_date = None;
    let date_raw = form.preferred_date.trim();
    if date_raw.is_empty() {
        add(&mut errors, "preferred_date", MSG_REQUIRED.to_string());
    } else {
        match NaiveDate::parse_from_str(date_raw, DATE_FMT) {
            Ok(date) if date < today => {
                add(&mut errors, "preferred_date", MSG_PAST_DATE.to_string())
            }
            Ok(date) => preferred_date = Some(date),
            Err(_) => add(&mut errors, "preferred_date", MSG_INVALID_DATE.to_string()),
        }
    }

    if form.slot.is_empty() {
        add(&mut errors, "slot", MSG_REQUIRED.to_string());
    } else if !slots.iter().any(|s| s.id == form.slot) {
        add(&mut errors, "slot", MSG_INVALID_SLOT.to_string());
    }

    let notes = form.notes.trim();
    match (service_type, preferred_date) {
        (Some(service_type), Some(preferred_date)) if errors.is_empty() => Ok(ValidBooking {
            customer_name: customer_name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            car_model: car_model.to_string(),
            service_type,
            preferred_date,
            slot_id: form.slot.clone(),
            notes: if notes.is_empty() {
                None
            } else {
                Some(notes.to_string())
            },
        }),
        _ => Err(errors),
    }
}

/// Staff form for adding a time slot to the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotForm {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

pub fn validate_slot(form: &SlotForm) -> Result<TimeSlot, FieldErrors> {
    let mut errors = FieldErrors::new();

    let label = form.label.trim();
    check_required_text(&mut errors, "label", label, LABEL_MAX);

    let start_time = parse_time_field(&mut errors, "start_time", &form.start_time);
    let end_time = parse_time_field(&mut errors, "end_time", &form.end_time);

    if let (Some(start), Some(end)) = (start_time, end_time) {
        if end <= start {
            add(
                &mut errors,
                "end_time",
                MSG_END_BEFORE_START.to_string(),
            );
        }
    }

    match (start_time, end_time) {
        (Some(start_time), Some(end_time)) if errors.is_empty() => Ok(TimeSlot {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            start_time,
            end_time,
        }),
        _ => Err(errors),
    }
}

fn parse_time_field(
    errors: &mut FieldErrors,
    field: &str,
    raw: &str,
) -> Option<chrono::NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        add(errors, field, MSG_REQUIRED.to_string());
        return None;
    }
    match chrono::NaiveTime::parse_from_str(raw, TIME_FMT) {
        Ok(time) => Some(time),
        Err(_) => {
            add(errors, field, MSG_INVALID_TIME.to_string());
            None
        }
    }
}

fn check_required_text(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.is_empty() {
        add(errors, field, MSG_REQUIRED.to_string());
    } else {
        check_max_len(errors, field, value, max);
    }
}

/// True when the value fits; follow-up rules only run in that case.
fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> bool {
    let len = value.chars().count();
    if len > max {
        add(
            errors,
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
        return false;
    }
    true
}

fn add(errors: &mut FieldErrors, field: &str, message: String) {
    errors.entry(field.to_string()).or_default().push(message);
}
