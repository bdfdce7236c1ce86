use std::sync::Arc;

use chrono::{TimeZone, Utc};
use foamline_booking::{
    BookingLedger, CreateBooking, EvidenceOutcome, FixedDistance, InMemoryStore, LedgerRules,
    LogNotifier, ReconciliationEngine, SweepRules, SweepRunner,
};
use foamline_catalog::{PackageCatalog, SlotCatalog, TravelPolicy};
use foamline_core::booking::{BookingStatus, PaymentRail};
use foamline_core::collaborators::{
    CardCheckoutProvider, CheckoutSession, Confidence, EvidenceScore, EvidenceScorer, FixedClock,
};
use foamline_core::error::EngineError;
use foamline_core::repository::BookingStore;

struct NoCheckout;

#[async_trait::async_trait]
impl CardCheckoutProvider for NoCheckout {
    async fn fetch_session(&self, session_id: &str) -> Result<CheckoutSession, EngineError> {
        Err(EngineError::not_found(format!("session {session_id}")))
    }
}

struct FixedScorer(EvidenceScore);

#[async_trait::async_trait]
impl EvidenceScorer for FixedScorer {
    async fn score(&self, _image: &[u8]) -> Result<EvidenceScore, EngineError> {
        Ok(self.0.clone())
    }
}

fn clock() -> Arc<FixedClock> {
    // Four days before the event on 2025-06-01.
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2025, 5, 28, 9, 0, 0).unwrap(),
    ))
}

fn ledger(store: Arc<InMemoryStore>) -> BookingLedger {
    BookingLedger::new(
        store,
        PackageCatalog::default(),
        SlotCatalog::default(),
        TravelPolicy::default(),
        Arc::new(FixedDistance(10.0)),
        clock(),
        LedgerRules::default(),
    )
}

fn engine(store: Arc<InMemoryStore>, score: EvidenceScore) -> ReconciliationEngine {
    ReconciliationEngine::new(
        store,
        SlotCatalog::default(),
        Arc::new(NoCheckout),
        Arc::new(FixedScorer(score)),
        Arc::new(LogNotifier),
        clock(),
    )
}

fn create_request() -> CreateBooking {
    CreateBooking {
        customer_name: "Ana Diaz".to_string(),
        customer_email: "ana@example.com".to_string(),
        customer_phone: "5551234567".to_string(),
        street_address: "12 Foam St".to_string(),
        postal_code: "33101".to_string(),
        party_size: 30,
        package_id: "deluxe".to_string(),
        event_date: "2025-06-01".to_string(),
        event_time: "2:00 PM".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn peer_to_peer_high_confidence_match_confirms() {
    let store = Arc::new(InMemoryStore::new());
    let ledger = ledger(store.clone());

    let booking = ledger.create(create_request()).await.unwrap();
    let booking = ledger
        .choose_rail(booking.id, PaymentRail::PeerToPeer)
        .await
        .unwrap();
    // 10 miles is inside the free allowance: expected is the package price.
    assert_eq!(booking.expected_amount_cents, Some(32500));

    let engine = engine(
        store.clone(),
        EvidenceScore {
            is_authentic: true,
            recipient_matches: true,
            amount_cents: Some(32500),
            confidence: Some(Confidence::High),
            raw_text: "You sent $325.00".to_string(),
        },
    );

    let outcome = engine
        .submit_evidence(booking.id, "uploads/receipt.png", b"bytes")
        .await
        .unwrap();
    let confirmed = match outcome {
        EvidenceOutcome::Confirmed(b) => b,
        other => panic!("expected confirmation, got {other:?}"),
    };
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.amount_paid_cents, Some(32500));
    assert!(confirmed.payment_verified);
    assert!(confirmed.confirmation_number.is_some());
}

#[tokio::test]
async fn peer_to_peer_amount_mismatch_goes_to_review() {
    let store = Arc::new(InMemoryStore::new());
    let ledger = ledger(store.clone());

    let booking = ledger.create(create_request()).await.unwrap();
    ledger
        .choose_rail(booking.id, PaymentRail::PeerToPeer)
        .await
        .unwrap();

    let engine = engine(
        store.clone(),
        EvidenceScore {
            is_authentic: true,
            recipient_matches: true,
            amount_cents: Some(30000),
            confidence: Some(Confidence::High),
            raw_text: "You sent $300.00".to_string(),
        },
    );

    let outcome = engine
        .submit_evidence(booking.id, "uploads/receipt.png", b"bytes")
        .await
        .unwrap();
    match outcome {
        EvidenceOutcome::NeedsReview {
            booking,
            extracted_cents,
            ..
        } => {
            assert_eq!(extracted_cents, Some(30000));
            assert_eq!(booking.status, BookingStatus::Pending);
            assert!(booking.needs_manual_review);
        }
        other => panic!("expected review, got {other:?}"),
    }
    assert_eq!(engine.pending_review().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sweep_expires_only_the_unpaid_sibling() {
    let store = Arc::new(InMemoryStore::new());
    let ledger = ledger(store.clone());

    let stale = ledger.create(create_request()).await.unwrap();
    let mut other = create_request();
    other.event_time = "4:00 PM".to_string();
    let paid = ledger.create(other).await.unwrap();
    store
        .confirm_payment(paid.id, 32500, "FMB-000002")
        .await
        .unwrap();

    // 73 hours after creation, one hour past the pending deadline.
    let sweep_at = Utc.with_ymd_and_hms(2025, 5, 31, 10, 0, 0).unwrap();
    let runner = SweepRunner::new(
        store.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        Arc::new(FixedClock(sweep_at)),
        SweepRules::default(),
    );
    let report = runner.run_sweep().await.unwrap();
    assert_eq!(report.expired, 1);

    let stale = store.get(stale.id).await.unwrap().unwrap();
    assert_eq!(stale.status, BookingStatus::Cancelled);
    assert!(stale
        .cancellation_note
        .unwrap()
        .contains("Expired automatically"));

    let paid = store.get(paid.id).await.unwrap().unwrap();
    assert_eq!(paid.status, BookingStatus::Confirmed);
    assert_eq!(paid.amount_paid_cents, Some(32500));
}
