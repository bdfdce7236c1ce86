use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, CalendarSubscriber, NewBooking};
use crate::error::EngineError;

/// Persistence seam for the booking ledger.
///
/// Lifecycle transitions go through the dedicated conditional operations,
/// each a single atomic compare-and-set on the current status; `update`
/// persists the remaining mutable fields and must never change `status` or
/// clear `amount_paid_cents`.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a new pending booking and assign its id.
    async fn create(&self, new: NewBooking) -> Result<Booking, EngineError>;

    async fn get(&self, id: i64) -> Result<Option<Booking>, EngineError>;

    async fn list(&self) -> Result<Vec<Booking>, EngineError>;

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, EngineError>;

    /// Persist non-lifecycle fields of an existing booking.
    async fn update(&self, booking: &Booking) -> Result<(), EngineError>;

    /// Conditional `pending` + unpaid -> `confirmed`. Sets the paid amount
    /// and confirmation number in the same step. Returns false when the
    /// booking is no longer pending or already carries a paid amount.
    async fn confirm_payment(
        &self,
        id: i64,
        amount_cents: i64,
        confirmation_number: &str,
    ) -> Result<bool, EngineError>;

    /// Conditional cancel. With `allow_confirmed` false this only fires on
    /// `pending` rows, which is what scopes the auto-expiry sweep. Returns
    /// false when the current status did not admit the cancel.
    async fn cancel(&self, id: i64, note: &str, allow_confirmed: bool)
        -> Result<bool, EngineError>;

    /// Conditional `confirmed` -> `completed`.
    async fn complete(&self, id: i64) -> Result<bool, EngineError>;
}

/// Calendar-subscriber persistence; lifecycle independent of bookings.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Idempotent on email: re-subscribing an active address returns the
    /// existing row.
    async fn subscribe(&self, email: &str) -> Result<CalendarSubscriber, EngineError>;

    async fn unsubscribe(&self, token: Uuid) -> Result<bool, EngineError>;

    async fn list_active(&self) -> Result<Vec<CalendarSubscriber>, EngineError>;
}
