use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use foamline_core::booking::{Booking, BookingStatus, CalendarSubscriber, NewBooking};
use foamline_core::error::EngineError;
use foamline_core::repository::{BookingStore, SubscriberStore};
use uuid::Uuid;

struct Inner {
    bookings: HashMap<i64, Booking>,
    next_booking_id: i64,
    subscribers: HashMap<i64, CalendarSubscriber>,
    next_subscriber_id: i64,
}

/// In-memory ledger store.
///
/// Backs the engine in tests and anywhere a database is not wired up. The
/// conditional lifecycle operations hold the map lock for the whole
/// read-modify-write, giving the same atomicity the SQL store gets from
/// single conditional UPDATEs.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                bookings: HashMap::new(),
                next_booking_id: 1,
                subscribers: HashMap::new(),
                next_subscriber_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, EngineError> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Storage("store mutex poisoned".to_string()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn create(&self, new: NewBooking) -> Result<Booking, EngineError> {
        let mut inner = self.lock()?;
        let id = inner.next_booking_id;
        inner.next_booking_id += 1;

        let booking = Booking {
            id,
            customer_name: new.customer_name,
            customer_email: new.customer_email,
            customer_phone: new.customer_phone,
            street_address: new.street_address,
            postal_code: new.postal_code,
            party_size: new.party_size,
            package_id: new.package_id,
            event_date: new.event_date,
            event_time: new.event_time,
            notes: new.notes,
            status: BookingStatus::Pending,
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
            pending_expires_at: new.pending_expires_at,
            payment_reminder_sent_at: None,
            event_reminder_48h_sent_at: None,
            event_reminder_24h_sent_at: None,
            cancellation_note: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        };

        inner.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: i64) -> Result<Option<Booking>, EngineError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Booking>, EngineError> {
        let mut bookings: Vec<Booking> = self.lock()?.bookings.values().cloned().collect();
        bookings.sort_by_key(|b| b.id);
        Ok(bookings)
    }

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, EngineError> {
        let mut bookings: Vec<Booking> = self
            .lock()?
            .bookings
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.id);
        Ok(bookings)
    }

    async fn update(&self, booking: &Booking) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        let current = inner
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| EngineError::not_found(format!("booking {}", booking.id)))?;

        let mut next = booking.clone();
        // Lifecycle fields only move through the conditional operations,
        // mirroring the columns the SQL store leaves out of its UPDATE.
        next.status = current.status;
        next.amount_paid_cents = current.amount_paid_cents;
        next.confirmation_number = current.confirmation_number.clone();
        next.updated_at = Utc::now();
        *current = next;
        Ok(())
    }

    async fn confirm_payment(
        &self,
        id: i64,
        amount_cents: i64,
        confirmation_number: &str,
    ) -> Result<bool, EngineError> {
        let mut inner = self.lock()?;
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found(format!("booking {id}")))?;

        if booking.status != BookingStatus::Pending || booking.amount_paid_cents.is_some() {
            return Ok(false);
        }

        booking.status = BookingStatus::Confirmed;
        booking.amount_paid_cents = Some(amount_cents);
        booking.confirmation_number = Some(confirmation_number.to_string());
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn cancel(
        &self,
        id: i64,
        note: &str,
        allow_confirmed: bool,
    ) -> Result<bool, EngineError> {
        let mut inner = self.lock()?;
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found(format!("booking {id}")))?;

        let cancellable = booking.status == BookingStatus::Pending
            || (allow_confirmed && booking.status == BookingStatus::Confirmed);
        if !cancellable {
            return Ok(false);
        }

        booking.status = BookingStatus::Cancelled;
        booking.cancellation_note = Some(note.to_string());
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn complete(&self, id: i64) -> Result<bool, EngineError> {
        let mut inner = self.lock()?;
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found(format!("booking {id}")))?;

        if booking.status != BookingStatus::Confirmed {
            return Ok(false);
        }

        booking.status = BookingStatus::Completed;
        booking.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl SubscriberStore for InMemoryStore {
    async fn subscribe(&self, email: &str) -> Result<CalendarSubscriber, EngineError> {
        let mut inner = self.lock()?;

        if let Some(existing) = inner
            .subscribers
            .values()
            .find(|s| s.active && s.email.eq_ignore_ascii_case(email))
        {
            return Ok(existing.clone());
        }

        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        let subscriber = CalendarSubscriber {
            id,
            email: email.to_string(),
            unsubscribe_token: Uuid::new_v4(),
            active: true,
            created_at: Utc::now(),
        };
        inner.subscribers.insert(id, subscriber.clone());
        Ok(subscriber)
    }

    async fn unsubscribe(&self, token: Uuid) -> Result<bool, EngineError> {
        let mut inner = self.lock()?;
        for subscriber in inner.subscribers.values_mut() {
            if subscriber.unsubscribe_token == token && subscriber.active {
                subscriber.active = false;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn list_active(&self) -> Result<Vec<CalendarSubscriber>, EngineError> {
        let mut subscribers: Vec<CalendarSubscriber> = self
            .lock()?
            .subscribers
            .values()
            .filter(|s| s.active)
            .cloned()
            .collect();
        subscribers.sort_by_key(|s| s.id);
        Ok(subscribers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_booking() -> NewBooking {
        NewBooking {
            customer_name: "Ana Diaz".to_string(),
            customer_email: "ana@example.com".to_string(),
            customer_phone: "5551234567".to_string(),
            street_address: "12 Foam St".to_string(),
            postal_code: "33101".to_string(),
            party_size: 20,
            package_id: "splash".to_string(),
            event_date: "2025-06-01".to_string(),
            event_time: "2:00 PM".to_string(),
            notes: None,
            pending_expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_confirm_is_conditional() {
        let store = InMemoryStore::new();
        let booking = store.create(new_booking()).await.unwrap();

        assert!(store
            .confirm_payment(booking.id, 32500, "FMB-000001")
            .await
            .unwrap());
        // Second confirm misses the pending+unpaid guard.
        assert!(!store
            .confirm_payment(booking.id, 32500, "FMB-000001")
            .await
            .unwrap());

        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.amount_paid_cents, Some(32500));
    }

    #[tokio::test]
    async fn test_update_never_touches_lifecycle_fields() {
        let store = InMemoryStore::new();
        let booking = store.create(new_booking()).await.unwrap();
        store
            .confirm_payment(booking.id, 32500, "FMB-000001")
            .await
            .unwrap();

        let mut stale = booking.clone();
        stale.status = BookingStatus::Pending;
        stale.amount_paid_cents = None;
        stale.notes = Some("updated".to_string());
        store.update(&stale).await.unwrap();

        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.amount_paid_cents, Some(32500));
        assert_eq!(stored.notes.as_deref(), Some("updated"));
    }

    #[tokio::test]
    async fn test_update_cannot_set_paid_amount_on_pending_row() {
        let store = InMemoryStore::new();
        let booking = store.create(new_booking()).await.unwrap();

        let mut forged = booking.clone();
        forged.amount_paid_cents = Some(99900);
        forged.confirmation_number = Some("FMB-999999".to_string());
        store.update(&forged).await.unwrap();

        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
        assert!(stored.amount_paid_cents.is_none());
        assert!(stored.confirmation_number.is_none());
    }

    #[tokio::test]
    async fn test_expiry_scoped_cancel_skips_confirmed() {
        let store = InMemoryStore::new();
        let booking = store.create(new_booking()).await.unwrap();
        store
            .confirm_payment(booking.id, 32500, "FMB-000001")
            .await
            .unwrap();

        assert!(!store.cancel(booking.id, "expired", false).await.unwrap());
        assert!(store.cancel(booking.id, "customer cancel", true).await.unwrap());

        // Payment history survives cancellation.
        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid_cents, Some(32500));
    }

    #[tokio::test]
    async fn test_subscribe_idempotent_on_email() {
        let store = InMemoryStore::new();
        let first = store.subscribe("party@example.com").await.unwrap();
        let second = store.subscribe("Party@example.com").await.unwrap();
        assert_eq!(first.id, second.id);

        assert!(store.unsubscribe(first.unsubscribe_token).await.unwrap());
        assert!(!store.unsubscribe(first.unsubscribe_token).await.unwrap());
        assert!(store.list_active().await.unwrap().is_empty());
    }
}
