use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::TimeSlot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub car_model: String,
    pub service_type: ServiceType,
    pub preferred_date: NaiveDate,
    pub slot_id: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

/// A booking joined with its slot and owner, as shown on listing pages.
#[derive(Debug, Clone)]
pub struct BookingDetail {
    pub booking: Booking,
    pub slot: TimeSlot,
    pub owner_username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Exterior,
    Interior,
    Full,
    Ceramic,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Exterior,
        ServiceType::Interior,
        ServiceType::Full,
        ServiceType::Ceramic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Exterior => "exterior",
            ServiceType::Interior => "interior",
            ServiceType::Full => "full",
            ServiceType::Ceramic => "ceramic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Exterior => "Exterior Detailing",
            ServiceType::Interior => "Interior Detailing",
            ServiceType::Full => "Full Detailing",
            ServiceType::Ceramic => "Ceramic Coating",
        }
    }

    /// Strict parse of a stored or submitted value. Unknown values stay
    /// unknown instead of being coerced to a default.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exterior" => Some(ServiceType::Exterior),
            "interior" => Some(ServiceType::Interior),
            "full" => Some(ServiceType::Full),
            "ceramic" => Some(ServiceType::Ceramic),
            _ => None,
        }
    }
}
