use std::sync::Arc;

use chrono::Duration;
use foamline_core::booking::{Booking, BookingStatus};
use foamline_core::collaborators::{Clock, Notifier, ReminderTier};
use foamline_core::error::EngineError;
use foamline_core::repository::{BookingStore, SubscriberStore};
use tracing::{debug, error, info};

use crate::eventtime;

/// Timing rules for the recurring sweep.
#[derive(Debug, Clone)]
pub struct SweepRules {
    /// Remind a still-unpaid booking after this many hours.
    pub reminder_after_hours: i64,
    /// Fallback expiry age for rows that never got an explicit deadline.
    pub pending_ttl_hours: i64,
}

impl Default for SweepRules {
    fn default() -> Self {
        Self {
            reminder_after_hours: 24,
            pending_ttl_hours: 72,
        }
    }
}

/// Per-pass counters from one sweep, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub payment_reminders_sent: u32,
    pub expired: u32,
    pub event_reminders_sent: u32,
    pub skipped_unparseable: u32,
    pub send_failures: u32,
}

/// The abandoned-booking sweep: three independent, idempotent passes over
/// the ledger. Safe to re-run; every mark-as-sent is gated on a successful
/// send so a failed notification retries on the next sweep.
pub struct SweepRunner {
    store: Arc<dyn BookingStore>,
    subscribers: Arc<dyn SubscriberStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    rules: SweepRules,
}

impl SweepRunner {
    pub fn new(
        store: Arc<dyn BookingStore>,
        subscribers: Arc<dyn SubscriberStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        rules: SweepRules,
    ) -> Self {
        Self {
            store,
            subscribers,
            notifier,
            clock,
            rules,
        }
    }

    pub async fn run_sweep(&self) -> Result<SweepReport, EngineError> {
        let mut report = SweepReport::default();
        self.reminder_pass(&mut report).await?;
        self.expiry_pass(&mut report).await?;
        self.event_reminder_pass(&mut report).await?;
        info!(
            reminders = report.payment_reminders_sent,
            expired = report.expired,
            event_reminders = report.event_reminders_sent,
            failures = report.send_failures,
            "sweep finished"
        );
        Ok(report)
    }

    /// Pass 1: one payment reminder per stale pending booking, ever.
    async fn reminder_pass(&self, report: &mut SweepReport) -> Result<(), EngineError> {
        let now = self.clock.now();
        let threshold = Duration::hours(self.rules.reminder_after_hours);

        for booking in self.store.list_by_status(BookingStatus::Pending).await? {
            if booking.payment_reminder_sent_at.is_some() || now - booking.created_at < threshold {
                continue;
            }
            match self.notifier.payment_reminder(&booking).await {
                Ok(()) => {
                    let mut booking = booking;
                    booking.payment_reminder_sent_at = Some(now);
                    if let Err(err) = self.store.update(&booking).await {
                        error!(booking_id = booking.id, error = %err, "failed to mark reminder sent");
                    } else {
                        report.payment_reminders_sent += 1;
                    }
                }
                Err(err) => {
                    report.send_failures += 1;
                    error!(booking_id = booking.id, error = %err, "payment reminder failed");
                }
            }
        }
        Ok(())
    }

    /// Pass 2: expire pending bookings past their deadline.
    ///
    /// Selecting on `pending` is also the race mitigation: a booking that
    /// confirmed before this read is never touched.
    async fn expiry_pass(&self, report: &mut SweepReport) -> Result<(), EngineError> {
        let now = self.clock.now();

        for booking in self.store.list_by_status(BookingStatus::Pending).await? {
            let deadline = booking.pending_expires_at.unwrap_or_else(|| {
                booking.created_at + Duration::hours(self.rules.pending_ttl_hours)
            });
            if now < deadline {
                continue;
            }

            let note = "Expired automatically: payment was not received in time";
            match self.store.cancel(booking.id, note, false).await {
                Ok(true) => {
                    report.expired += 1;
                    info!(booking_id = booking.id, "pending booking auto-expired");
                    if let Err(err) = self.notifier.booking_expired(&booking).await {
                        report.send_failures += 1;
                        error!(booking_id = booking.id, error = %err, "expiry notice failed");
                    }
                }
                // Confirmed between the read and the conditional cancel.
                Ok(false) => {
                    debug!(booking_id = booking.id, "booking no longer pending; skipping expiry")
                }
                Err(err) => {
                    error!(booking_id = booking.id, error = %err, "expiry cancel failed");
                }
            }
        }
        Ok(())
    }

    /// Pass 3: 48h/24h event reminders to calendar subscribers, one per
    /// booking per tier. Unparseable event text skips the booking for this
    /// pass only.
    async fn event_reminder_pass(&self, report: &mut SweepReport) -> Result<(), EngineError> {
        let subscribers = self.subscribers.list_active().await?;
        if subscribers.is_empty() {
            return Ok(());
        }
        let now = self.clock.now();

        for booking in self.store.list_by_status(BookingStatus::Confirmed).await? {
            let start = match eventtime::parse_event_start(&booking.event_date, &booking.event_time)
            {
                Ok(start) => start,
                Err(err) => {
                    report.skipped_unparseable += 1;
                    debug!(booking_id = booking.id, error = %err, "unparseable event time; skipped");
                    continue;
                }
            };

            let hours_until = (start - now).num_minutes() as f64 / 60.0;
            let tier = if in_window(hours_until, 48.0) && booking.event_reminder_48h_sent_at.is_none()
            {
                Some(ReminderTier::HoursBefore48)
            } else if in_window(hours_until, 24.0)
                && booking.event_reminder_24h_sent_at.is_none()
            {
                Some(ReminderTier::HoursBefore24)
            } else {
                None
            };
            let Some(tier) = tier else { continue };

            let mut all_sent = true;
            for subscriber in &subscribers {
                match self
                    .notifier
                    .event_reminder(&booking, &subscriber.email, tier)
                    .await
                {
                    Ok(()) => report.event_reminders_sent += 1,
                    Err(err) => {
                        all_sent = false;
                        report.send_failures += 1;
                        error!(
                            booking_id = booking.id,
                            subscriber = %subscriber.email,
                            error = %err,
                            "event reminder failed"
                        );
                    }
                }
            }

            // Mark the tier only when every subscriber was reached, so a
            // partial failure retries next sweep.
            if all_sent {
                let mut booking = booking;
                match tier {
                    ReminderTier::HoursBefore48 => {
                        booking.event_reminder_48h_sent_at = Some(now)
                    }
                    ReminderTier::HoursBefore24 => {
                        booking.event_reminder_24h_sent_at = Some(now)
                    }
                }
                if let Err(err) = self.store.update(&booking).await {
                    error!(booking_id = booking.id, error = %err, "failed to mark event reminder sent");
                }
            }
        }
        Ok(())
    }
}

fn in_window(hours_until: f64, target_hours: f64) -> bool {
    (hours_until - target_hours).abs() <= 1.0
}

/// Log-only notifier: the default wiring when no mail provider is
/// configured. Delivery itself is out of scope for the engine.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), EngineError> {
        info!(
            booking_id = booking.id,
            email = %booking.customer_email,
            "notify: booking confirmed"
        );
        Ok(())
    }

    async fn payment_reminder(&self, booking: &Booking) -> Result<(), EngineError> {
        info!(
            booking_id = booking.id,
            email = %booking.customer_email,
            "notify: payment reminder"
        );
        Ok(())
    }

    async fn booking_expired(&self, booking: &Booking) -> Result<(), EngineError> {
        info!(
            booking_id = booking.id,
            email = %booking.customer_email,
            "notify: booking expired"
        );
        Ok(())
    }

    async fn event_reminder(
        &self,
        booking: &Booking,
        subscriber_email: &str,
        tier: ReminderTier,
    ) -> Result<(), EngineError> {
        info!(
            booking_id = booking.id,
            subscriber = %subscriber_email,
            ?tier,
            "notify: event reminder"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use chrono::{DateTime, TimeZone, Utc};
    use foamline_core::booking::NewBooking;
    use foamline_core::collaborators::FixedClock;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 25, 9, 0, 0).unwrap()
    }

    async fn seed(
        store: &InMemoryStore,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        date: &str,
        time: &str,
    ) -> Booking {
        store
            .create(NewBooking {
                customer_name: "Ana Diaz".to_string(),
                customer_email: "ana@example.com".to_string(),
                customer_phone: "5551234567".to_string(),
                street_address: "12 Foam St".to_string(),
                postal_code: "33101".to_string(),
                party_size: 20,
                package_id: "deluxe".to_string(),
                event_date: date.to_string(),
                event_time: time.to_string(),
                notes: None,
                pending_expires_at: expires_at,
                created_at,
            })
            .await
            .unwrap()
    }

    #[derive(Default)]
    struct RecordingNotifier {
        payment_reminders: AtomicU32,
        expiries: AtomicU32,
        event_reminders: Mutex<Vec<(i64, String)>>,
        fail_event_sends: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn booking_confirmed(&self, _b: &Booking) -> Result<(), EngineError> {
            Ok(())
        }
        async fn payment_reminder(&self, _b: &Booking) -> Result<(), EngineError> {
            self.payment_reminders.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn booking_expired(&self, _b: &Booking) -> Result<(), EngineError> {
            self.expiries.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn event_reminder(
            &self,
            booking: &Booking,
            subscriber_email: &str,
            _tier: ReminderTier,
        ) -> Result<(), EngineError> {
            if self.fail_event_sends.load(Ordering::SeqCst) {
                return Err(EngineError::ServiceUnavailable("smtp down".to_string()));
            }
            self.event_reminders
                .lock()
                .unwrap()
                .push((booking.id, subscriber_email.to_string()));
            Ok(())
        }
    }

    fn runner(
        store: Arc<InMemoryStore>,
        notifier: Arc<RecordingNotifier>,
        now: DateTime<Utc>,
    ) -> SweepRunner {
        SweepRunner::new(
            store.clone(),
            store,
            notifier,
            Arc::new(FixedClock(now)),
            SweepRules::default(),
        )
    }

    #[tokio::test]
    async fn test_reminder_pass_sends_once() {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        seed(&store, t0(), None, "2025-06-01", "2:00 PM").await;

        // Too fresh at +1h.
        let report = runner(store.clone(), notifier.clone(), t0() + Duration::hours(1))
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.payment_reminders_sent, 0);

        // Due at +25h; sent and marked.
        let report = runner(store.clone(), notifier.clone(), t0() + Duration::hours(25))
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.payment_reminders_sent, 1);

        // Re-running does not re-send.
        let report = runner(store.clone(), notifier.clone(), t0() + Duration::hours(26))
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.payment_reminders_sent, 0);
        assert_eq!(notifier.payment_reminders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_pass_scoped_to_pending() {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        // Pending booking with a T+72h deadline, sibling confirmed at T+10h.
        let stale = seed(
            &store,
            t0(),
            Some(t0() + Duration::hours(72)),
            "2025-06-01",
            "2:00 PM",
        )
        .await;
        let paid = seed(
            &store,
            t0(),
            Some(t0() + Duration::hours(72)),
            "2025-06-01",
            "4:00 PM",
        )
        .await;
        store
            .confirm_payment(paid.id, 32500, "FMB-000002")
            .await
            .unwrap();

        let report = runner(store.clone(), notifier.clone(), t0() + Duration::hours(73))
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.expired, 1);

        let stale = store.get(stale.id).await.unwrap().unwrap();
        assert_eq!(stale.status, BookingStatus::Cancelled);
        assert!(stale
            .cancellation_note
            .unwrap()
            .contains("Expired automatically"));

        let paid = store.get(paid.id).await.unwrap().unwrap();
        assert_eq!(paid.status, BookingStatus::Confirmed);
        assert_eq!(notifier.expiries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_fallback_without_explicit_deadline() {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let booking = seed(&store, t0(), None, "2025-06-01", "2:00 PM").await;

        let report = runner(store.clone(), notifier.clone(), t0() + Duration::hours(71))
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.expired, 0);

        let report = runner(store.clone(), notifier, t0() + Duration::hours(73))
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.expired, 1);
        let booking = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_event_reminders_per_subscriber_per_tier() {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        store.subscribe("owner@example.com").await.unwrap();
        store.subscribe("crew@example.com").await.unwrap();

        // Event at 2025-06-01 14:00; confirmed.
        let booking = seed(&store, t0(), None, "2025-06-01", "2:00 PM").await;
        store
            .confirm_payment(booking.id, 32500, "FMB-000001")
            .await
            .unwrap();

        // 48h out (2025-05-30 14:00).
        let at_48h = Utc.with_ymd_and_hms(2025, 5, 30, 14, 0, 0).unwrap();
        let report = runner(store.clone(), notifier.clone(), at_48h)
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.event_reminders_sent, 2);

        // Same window again: tier already marked, nothing re-sent.
        let report = runner(store.clone(), notifier.clone(), at_48h + Duration::minutes(30))
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.event_reminders_sent, 0);

        // 24h out is a separate tier.
        let at_24h = Utc.with_ymd_and_hms(2025, 5, 31, 14, 0, 0).unwrap();
        let report = runner(store.clone(), notifier.clone(), at_24h)
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.event_reminders_sent, 2);
        assert_eq!(notifier.event_reminders.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_event_reminder_failure_retries_next_sweep() {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        store.subscribe("owner@example.com").await.unwrap();

        let booking = seed(&store, t0(), None, "2025-06-01", "2:00 PM").await;
        store
            .confirm_payment(booking.id, 32500, "FMB-000001")
            .await
            .unwrap();

        let at_48h = Utc.with_ymd_and_hms(2025, 5, 30, 14, 0, 0).unwrap();

        notifier.fail_event_sends.store(true, Ordering::SeqCst);
        let report = runner(store.clone(), notifier.clone(), at_48h)
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.send_failures, 1);
        assert_eq!(report.event_reminders_sent, 0);

        // Send succeeds on the next sweep because the tier was never marked.
        notifier.fail_event_sends.store(false, Ordering::SeqCst);
        let report = runner(store.clone(), notifier, at_48h + Duration::minutes(20))
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.event_reminders_sent, 1);
    }

    #[tokio::test]
    async fn test_malformed_event_text_skips_without_aborting() {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        store.subscribe("owner@example.com").await.unwrap();

        let broken = seed(&store, t0(), None, "sometime soon", "2:00 PM").await;
        store
            .confirm_payment(broken.id, 32500, "FMB-000001")
            .await
            .unwrap();
        let fine = seed(&store, t0(), None, "2025-06-01", "4:00 PM").await;
        store
            .confirm_payment(fine.id, 32500, "FMB-000002")
            .await
            .unwrap();

        let at_48h = Utc.with_ymd_and_hms(2025, 5, 30, 16, 0, 0).unwrap();
        let report = runner(store.clone(), notifier, at_48h)
            .run_sweep()
            .await
            .unwrap();
        assert_eq!(report.skipped_unparseable, 1);
        assert_eq!(report.event_reminders_sent, 1);
    }
}
