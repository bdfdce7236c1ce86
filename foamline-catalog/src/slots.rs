use chrono::{Duration, NaiveDate};
use foamline_core::booking::{Booking, BookingStatus};
use serde::{Deserialize, Serialize};

/// Availability for a single date, derived from the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: String,
    pub available: Vec<String>,
    pub fully_booked: bool,
}

/// The fixed ordered list of daily time slots.
///
/// Slots are not stored; availability is the set difference between this
/// catalog and the slots already held by non-cancelled bookings on a date.
#[derive(Debug, Clone)]
pub struct SlotCatalog {
    slots: Vec<String>,
}

impl SlotCatalog {
    pub fn new(slots: Vec<String>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s == slot)
    }

    /// Customer-facing availability: only `confirmed` bookings count toward
    /// exhaustion, so a date holding only pending reservations still shows
    /// its slots.
    pub fn availability_for(&self, date: &str, bookings: &[Booking]) -> DayAvailability {
        let held: Vec<&str> = bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed && b.event_date == date)
            .map(|b| b.event_time.as_str())
            .collect();

        let available: Vec<String> = self
            .slots
            .iter()
            .filter(|slot| !held.contains(&slot.as_str()))
            .cloned()
            .collect();

        DayAvailability {
            date: date.to_string(),
            fully_booked: available.is_empty(),
            available,
        }
    }

    /// Exact-slot collision check.
    ///
    /// At create time every non-cancelled hold blocks the slot
    /// (`confirmed_only = false`); at confirm time only another confirmed
    /// booking does (`confirmed_only = true`), which is what rejects the
    /// second payer of a doubly-held slot.
    pub fn slot_taken(
        &self,
        date: &str,
        slot: &str,
        bookings: &[Booking],
        confirmed_only: bool,
        exclude_id: Option<i64>,
    ) -> bool {
        bookings.iter().any(|b| {
            b.event_date == date
                && b.event_time == slot
                && Some(b.id) != exclude_id
                && if confirmed_only {
                    b.status == BookingStatus::Confirmed
                } else {
                    b.holds_slot()
                }
        })
    }

    /// Dates in `[from, to]` (inclusive) where every slot is held by a
    /// confirmed booking.
    pub fn fully_booked_dates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        bookings: &[Booking],
    ) -> Vec<String> {
        let mut dates = Vec::new();
        let mut day = from;
        while day <= to {
            let key = day.format("%Y-%m-%d").to_string();
            if self.availability_for(&key, bookings).fully_booked {
                dates.push(key);
            }
            day += Duration::days(1);
        }
        dates
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::new(
            ["10:00 AM", "12:00 PM", "2:00 PM", "4:00 PM", "6:00 PM"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use foamline_core::booking::Booking;

    fn booking(id: i64, date: &str, slot: &str, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id,
            customer_name: "Ana Diaz".to_string(),
            customer_email: "ana@example.com".to_string(),
            customer_phone: "5551234567".to_string(),
            street_address: "12 Foam St".to_string(),
            postal_code: "33101".to_string(),
            party_size: 20,
            package_id: "splash".to_string(),
            event_date: date.to_string(),
            event_time: slot.to_string(),
            notes: None,
            status,
            payment_rail: None,
            expected_amount_cents: None,
            received_amount_cents: None,
            amount_paid_cents: None,
            travel_fee_cents: None,
            travel_distance_miles: None,
            checkout_session_id: None,
            evidence_ref: None,
            payment_verified: false,
            verified_at: None,
            verification_notes: None,
            needs_manual_review: false,
            confirmation_number: None,
            pending_expires_at: None,
            payment_reminder_sent_at: None,
            event_reminder_48h_sent_at: None,
            event_reminder_24h_sent_at: None,
            cancellation_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_date_returns_full_catalog() {
        let catalog = SlotCatalog::default();
        let availability = catalog.availability_for("2025-06-01", &[]);
        assert_eq!(availability.available.len(), 5);
        assert!(!availability.fully_booked);
    }

    #[test]
    fn test_pending_holds_do_not_exhaust() {
        let catalog = SlotCatalog::default();
        let bookings: Vec<Booking> = catalog
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| booking(i as i64 + 1, "2025-06-01", slot, BookingStatus::Pending))
            .collect();

        let availability = catalog.availability_for("2025-06-01", &bookings);
        assert_eq!(availability.available.len(), 5);
        assert!(!availability.fully_booked);
    }

    #[test]
    fn test_exhaustion_and_release() {
        let catalog = SlotCatalog::default();
        let mut bookings: Vec<Booking> = catalog
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| booking(i as i64 + 1, "2025-06-01", slot, BookingStatus::Confirmed))
            .collect();

        assert!(catalog.availability_for("2025-06-01", &bookings).fully_booked);

        // Cancelling one confirmed booking frees exactly its slot.
        bookings[2].status = BookingStatus::Cancelled;
        let availability = catalog.availability_for("2025-06-01", &bookings);
        assert_eq!(availability.available, vec!["2:00 PM".to_string()]);
    }

    #[test]
    fn test_pending_blocks_exact_slot_at_create() {
        let catalog = SlotCatalog::default();
        let bookings = vec![booking(1, "2025-06-01", "2:00 PM", BookingStatus::Pending)];

        assert!(catalog.slot_taken("2025-06-01", "2:00 PM", &bookings, false, None));
        // Confirm-time scope ignores the pending hold.
        assert!(!catalog.slot_taken("2025-06-01", "2:00 PM", &bookings, true, None));
        // A booking never conflicts with itself.
        assert!(!catalog.slot_taken("2025-06-01", "2:00 PM", &bookings, false, Some(1)));
    }

    #[test]
    fn test_fully_booked_date_range() {
        let catalog = SlotCatalog::default();
        let bookings: Vec<Booking> = catalog
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| booking(i as i64 + 1, "2025-06-02", slot, BookingStatus::Confirmed))
            .collect();

        let from = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        assert_eq!(
            catalog.fully_booked_dates(from, to, &bookings),
            vec!["2025-06-02".to_string()]
        );
    }
}
