use std::sync::Arc;

use chrono::Duration;
use foamline_catalog::{PackageCatalog, SlotCatalog, TravelPolicy, TravelQuote};
use foamline_core::booking::{Booking, BookingStatus, NewBooking, PaymentRail};
use foamline_core::collaborators::{Clock, DistanceLookup};
use foamline_core::error::EngineError;
use foamline_core::repository::BookingStore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::eventtime;

/// Business rules the ledger enforces at the edges of the state machine.
#[derive(Debug, Clone)]
pub struct LedgerRules {
    pub min_lead_time_hours: i64,
    pub pending_ttl_hours: i64,
    /// Where the foam truck rolls out from; travel fees are measured from
    /// here.
    pub depot_address: String,
}

impl Default for LedgerRules {
    fn default() -> Self {
        Self {
            min_lead_time_hours: 48,
            pending_ttl_hours: 72,
            depot_address: "100 Warehouse Way, Miami, FL 33101".to_string(),
        }
    }
}

/// Inbound create request, validated before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBooking {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub street_address: String,
    pub postal_code: String,
    pub party_size: i32,
    pub package_id: String,
    pub event_date: String,
    pub event_time: String,
    pub notes: Option<String>,
}

/// Owns the booking lifecycle: create, choose-rail, reschedule, cancel,
/// complete. All state lives in the store; this type holds the rules.
pub struct BookingLedger {
    store: Arc<dyn BookingStore>,
    packages: PackageCatalog,
    slots: SlotCatalog,
    travel: TravelPolicy,
    distance: Arc<dyn DistanceLookup>,
    clock: Arc<dyn Clock>,
    rules: LedgerRules,
}

impl BookingLedger {
    pub fn new(
        store: Arc<dyn BookingStore>,
        packages: PackageCatalog,
        slots: SlotCatalog,
        travel: TravelPolicy,
        distance: Arc<dyn DistanceLookup>,
        clock: Arc<dyn Clock>,
        rules: LedgerRules,
    ) -> Self {
        Self {
            store,
            packages,
            slots,
            travel,
            distance,
            clock,
            rules,
        }
    }

    pub fn slots(&self) -> &SlotCatalog {
        &self.slots
    }

    pub fn packages(&self) -> &PackageCatalog {
        &self.packages
    }

    /// Validate and insert a new pending booking.
    pub async fn create(&self, req: CreateBooking) -> Result<Booking, EngineError> {
        let package = self
            .packages
            .get(&req.package_id)
            .ok_or_else(|| EngineError::validation(format!("unknown package: {}", req.package_id)))?;

        if req.customer_name.trim().is_empty()
            || req.customer_phone.trim().is_empty()
            || req.street_address.trim().is_empty()
        {
            return Err(EngineError::validation("name, phone and address are required"));
        }
        if !req.customer_email.contains('@') {
            return Err(EngineError::validation("a valid email address is required"));
        }
        if req.postal_code.len() != 5 || !req.postal_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::validation("postal code must be 5 digits"));
        }
        if req.party_size < 1 || req.party_size > package.max_party_size {
            return Err(EngineError::validation(format!(
                "party size must be between 1 and {}",
                package.max_party_size
            )));
        }
        if !self.slots.contains(&req.event_time) {
            return Err(EngineError::validation(format!(
                "unknown time slot: {}",
                req.event_time
            )));
        }

        let event_date = eventtime::parse_event_date(&req.event_date)?;
        let event_date = event_date.format("%Y-%m-%d").to_string();

        let now = self.clock.now();
        let start = eventtime::parse_event_start(&event_date, &req.event_time)?;
        if start - now < Duration::hours(self.rules.min_lead_time_hours) {
            return Err(EngineError::validation(format!(
                "bookings need at least {} hours of lead time",
                self.rules.min_lead_time_hours
            )));
        }

        // Best-effort hold check: any non-cancelled booking blocks the exact
        // slot at create time. The race between two concurrent creates is
        // closed later, at confirm time.
        let bookings = self.store.list().await?;
        if self
            .slots
            .slot_taken(&event_date, &req.event_time, &bookings, false, None)
        {
            return Err(EngineError::conflict("slot no longer available"));
        }

        let booking = self
            .store
            .create(NewBooking {
                customer_name: req.customer_name,
                customer_email: req.customer_email,
                customer_phone: req.customer_phone,
                street_address: req.street_address,
                postal_code: req.postal_code,
                party_size: req.party_size,
                package_id: req.package_id,
                event_date,
                event_time: req.event_time,
                notes: req.notes,
                pending_expires_at: Some(now + Duration::hours(self.rules.pending_ttl_hours)),
                created_at: now,
            })
            .await?;

        info!(booking_id = booking.id, date = %booking.event_date, slot = %booking.event_time, "booking created");
        Ok(booking)
    }

    /// Choose the payment rail, exactly once, and fix the expected amount
    /// (package price + travel fee).
    pub async fn choose_rail(&self, id: i64, rail: PaymentRail) -> Result<Booking, EngineError> {
        let mut booking = self.get_required(id).await?;

        if booking.status != BookingStatus::Pending {
            return Err(EngineError::conflict(format!(
                "cannot choose a payment method on a {} booking",
                booking.status.as_str()
            )));
        }
        if booking.payment_rail.is_some() {
            return Err(EngineError::conflict("payment method already chosen"));
        }

        let package = self
            .packages
            .get(&booking.package_id)
            .ok_or_else(|| EngineError::validation(format!("unknown package: {}", booking.package_id)))?;

        let quote = self.travel_quote(&booking.street_address).await?;
        booking.payment_rail = Some(rail);
        booking.travel_distance_miles = Some(quote.distance_miles);
        booking.travel_fee_cents = Some(quote.fee_cents);
        booking.expected_amount_cents = Some(package.base_price_cents + quote.fee_cents);
        self.store.update(&booking).await?;

        info!(
            booking_id = id,
            rail = rail.as_str(),
            expected_cents = booking.expected_amount_cents,
            "payment rail chosen"
        );
        Ok(booking)
    }

    /// Quote the travel fee for an address. Distance lookup failures surface
    /// as ServiceUnavailable, never as a zero-mile quote.
    pub async fn travel_quote(&self, address: &str) -> Result<TravelQuote, EngineError> {
        let miles = self
            .distance
            .distance_miles(&self.rules.depot_address, address)
            .await?;
        Ok(self.travel.quote(miles))
    }

    /// Move a pending or confirmed booking to a new date/slot, keeping an
    /// audit trail in the notes.
    pub async fn reschedule(
        &self,
        id: i64,
        new_date: &str,
        new_time: &str,
    ) -> Result<Booking, EngineError> {
        let mut booking = self.get_required(id).await?;

        if booking.status.is_terminal() {
            return Err(EngineError::conflict(format!(
                "cannot reschedule a {} booking",
                booking.status.as_str()
            )));
        }
        if !self.slots.contains(new_time) {
            return Err(EngineError::validation(format!("unknown time slot: {new_time}")));
        }
        let new_date = eventtime::parse_event_date(new_date)?
            .format("%Y-%m-%d")
            .to_string();

        let bookings = self.store.list().await?;
        if self
            .slots
            .slot_taken(&new_date, new_time, &bookings, false, Some(id))
        {
            return Err(EngineError::conflict("slot no longer available"));
        }

        let audit = format!(
            "Rescheduled from {} {} to {} {}",
            booking.event_date, booking.event_time, new_date, new_time
        );
        booking.event_date = new_date;
        booking.event_time = new_time.to_string();
        booking.append_note(&audit);
        self.store.update(&booking).await?;

        info!(booking_id = id, "booking rescheduled");
        Ok(booking)
    }

    /// Customer/owner cancel. Idempotent: cancelling an already-cancelled
    /// booking is a no-op. Payment history is never erased.
    pub async fn cancel(&self, id: i64, note: Option<String>) -> Result<Booking, EngineError> {
        let booking = self.get_required(id).await?;

        match booking.status {
            BookingStatus::Cancelled => return Ok(booking),
            BookingStatus::Completed => {
                return Err(EngineError::conflict("a completed booking cannot be cancelled"))
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }

        let note = note.unwrap_or_else(|| "Cancelled by request".to_string());
        if !self.store.cancel(id, &note, true).await? {
            // Lost a race with another transition; report the fresh state.
            let fresh = self.get_required(id).await?;
            if fresh.status == BookingStatus::Cancelled {
                return Ok(fresh);
            }
            return Err(EngineError::conflict(format!(
                "cannot cancel a {} booking",
                fresh.status.as_str()
            )));
        }

        info!(booking_id = id, "booking cancelled");
        self.get_required(id).await
    }

    /// Owner-only `confirmed -> completed`, used after the event has run.
    pub async fn complete(&self, id: i64) -> Result<Booking, EngineError> {
        self.get_required(id).await?;
        if !self.store.complete(id).await? {
            return Err(EngineError::conflict(
                "only a confirmed booking can be completed",
            ));
        }
        info!(booking_id = id, "booking completed");
        self.get_required(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Booking>, EngineError> {
        self.store.get(id).await
    }

    pub async fn get_required(&self, id: i64) -> Result<Booking, EngineError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("booking {id}")))
    }

    pub async fn list(&self) -> Result<Vec<Booking>, EngineError> {
        self.store.list().await
    }

    /// Customer-facing availability for one date.
    pub async fn availability(&self, date: &str) -> Result<foamline_catalog::DayAvailability, EngineError> {
        let date = eventtime::parse_event_date(date)?.format("%Y-%m-%d").to_string();
        let bookings = self.store.list().await?;
        Ok(self.slots.availability_for(&date, &bookings))
    }

    /// Fully-booked dates over an inclusive range.
    pub async fn fully_booked_dates(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<String>, EngineError> {
        let from = eventtime::parse_event_date(from)?;
        let to = eventtime::parse_event_date(to)?;
        if to < from {
            return Err(EngineError::validation("date range end precedes start"));
        }
        let bookings = self.store.list().await?;
        Ok(self.slots.fully_booked_dates(from, to, &bookings))
    }
}

/// Fixed-distance lookup, the default wiring when no geocoding provider is
/// configured.
pub struct FixedDistance(pub f64);

#[async_trait::async_trait]
impl DistanceLookup for FixedDistance {
    async fn distance_miles(&self, _origin: &str, _destination: &str) -> Result<f64, EngineError> {
        Ok(self.0)
    }
}
