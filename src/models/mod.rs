pub mod booking;
pub mod slot;
pub mod user;

pub use booking::{Booking, BookingDetail, ServiceType};
pub use slot::TimeSlot;
pub use user::{Identity, User};
