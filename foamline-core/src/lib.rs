pub mod booking;
pub mod collaborators;
pub mod error;
pub mod repository;

pub use booking::{Booking, BookingStatus, CalendarSubscriber, NewBooking, PaymentRail};
pub use error::EngineError;
