use std::sync::Arc;

use foamline_catalog::SlotCatalog;
use foamline_core::booking::{confirmation_number, Booking, BookingStatus, PaymentRail};
use foamline_core::collaborators::{
    CardCheckoutProvider, Clock, Confidence, EvidenceScorer, Notifier,
};
use foamline_core::error::EngineError;
use foamline_core::repository::BookingStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Auto-confirm tolerance between expected and received amounts: one dollar,
/// to absorb rounding in the screenshot amount.
pub const AMOUNT_TOLERANCE_CENTS: i64 = 100;

/// Result of running one evidence upload through the funnel.
#[derive(Debug, Clone)]
pub enum EvidenceOutcome {
    Confirmed(Booking),
    NeedsReview {
        booking: Booking,
        extracted_cents: Option<i64>,
        confidence: Option<Confidence>,
    },
}

/// Operator decision on a booking awaiting review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualVerify {
    pub approve: bool,
    /// Operator-entered amount; required on approve, ignored on reject.
    pub amount_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Arbitrates the two payment rails into the one shared terminal effect:
/// a confirmed, paid booking.
pub struct ReconciliationEngine {
    store: Arc<dyn BookingStore>,
    slots: SlotCatalog,
    checkout: Arc<dyn CardCheckoutProvider>,
    scorer: Arc<dyn EvidenceScorer>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        slots: SlotCatalog,
        checkout: Arc<dyn CardCheckoutProvider>,
        scorer: Arc<dyn EvidenceScorer>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            slots,
            checkout,
            scorer,
            notifier,
            clock,
        }
    }

    /// Card rail: pure pass-through of the provider's verdict.
    ///
    /// The engine never decides "paid" itself; it fetches the session and
    /// confirms only when the provider reports it paid, with the provider's
    /// amount. Duplicate webhook deliveries hit the already-paid guard.
    pub async fn confirm_card(&self, booking_id: i64, session_id: &str) -> Result<Booking, EngineError> {
        let mut booking = self.get_required(booking_id).await?;

        if booking.status.is_terminal() {
            return Err(EngineError::conflict(format!(
                "cannot take payment for a {} booking",
                booking.status.as_str()
            )));
        }
        match booking.payment_rail {
            Some(PaymentRail::Card) => {}
            Some(PaymentRail::PeerToPeer) => {
                return Err(EngineError::conflict("booking is not on the card rail"))
            }
            None => return Err(EngineError::conflict("no payment method chosen")),
        }
        if booking.amount_paid_cents.is_some() {
            return Err(EngineError::conflict("booking already paid"));
        }

        let session = self.checkout.fetch_session(session_id).await?;
        if !session.paid {
            return Err(EngineError::conflict("checkout session not completed"));
        }

        booking.checkout_session_id = Some(session.session_id.clone());
        self.store.update(&booking).await?;

        self.confirm(booking_id, session.amount_cents).await
    }

    /// Peer-to-peer rail, stage 1-3: authenticity gate, amount extraction,
    /// reconciliation decision.
    pub async fn submit_evidence(
        &self,
        booking_id: i64,
        evidence_ref: &str,
        image: &[u8],
    ) -> Result<EvidenceOutcome, EngineError> {
        let mut booking = self.get_required(booking_id).await?;

        if booking.status.is_terminal() {
            return Err(EngineError::conflict(format!(
                "cannot accept payment evidence for a {} booking",
                booking.status.as_str()
            )));
        }
        match booking.payment_rail {
            Some(PaymentRail::PeerToPeer) => {}
            Some(PaymentRail::Card) => {
                return Err(EngineError::conflict("booking is not on the peer-to-peer rail"))
            }
            None => return Err(EngineError::conflict("no payment method chosen")),
        }
        if booking.payment_verified {
            return Err(EngineError::conflict("payment already verified"));
        }
        if booking.amount_paid_cents.is_some() {
            return Err(EngineError::conflict("booking already paid"));
        }
        let expected = booking
            .expected_amount_cents
            .ok_or_else(|| EngineError::conflict("no expected amount on booking"))?;

        let score = self.scorer.score(image).await?;

        // Stage 1: terminal rejections, nothing persisted so the customer
        // can retry with a better screenshot.
        if !score.is_authentic {
            return Err(EngineError::EvidenceRejected(
                "the image does not look like a payment screenshot".to_string(),
            ));
        }
        if !score.recipient_matches {
            return Err(EngineError::EvidenceRejected(
                "the payment is not addressed to our account".to_string(),
            ));
        }

        // Most recent evidence wins; the reference is overwritten, never
        // appended.
        booking.evidence_ref = Some(evidence_ref.to_string());

        // Stage 2: no amount extracted means manual review with the
        // received amount left unset.
        let Some(received) = score.amount_cents else {
            booking.received_amount_cents = None;
            booking.needs_manual_review = true;
            booking.verification_notes =
                Some("no amount could be read from the screenshot".to_string());
            self.store.update(&booking).await?;
            info!(booking_id, "evidence accepted, no amount extracted; flagged for review");
            return Ok(EvidenceOutcome::NeedsReview {
                booking: self.get_required(booking_id).await?,
                extracted_cents: None,
                confidence: score.confidence,
            });
        };

        // Stage 3: auto-confirm only on a close amount at high confidence.
        booking.received_amount_cents = Some(received);
        let delta = (received - expected).abs();
        let auto_confirm =
            delta <= AMOUNT_TOLERANCE_CENTS && score.confidence == Some(Confidence::High);

        if auto_confirm {
            self.store.update(&booking).await?;
            let mut confirmed = self.confirm(booking_id, received).await?;
            confirmed.payment_verified = true;
            confirmed.verified_at = Some(self.clock.now());
            confirmed.verification_notes = Some(format!(
                "auto-verified: screenshot shows {} (high confidence)",
                dollars(received)
            ));
            confirmed.needs_manual_review = false;
            self.store.update(&confirmed).await?;
            return Ok(EvidenceOutcome::Confirmed(
                self.get_required(booking_id).await?,
            ));
        }

        let confidence_str = score
            .confidence
            .map(|c| c.as_str())
            .unwrap_or("unknown")
            .to_string();
        booking.needs_manual_review = true;
        booking.verification_notes = Some(format!(
            "extracted {} at {} confidence; expected {}",
            dollars(received),
            confidence_str,
            dollars(expected)
        ));
        self.store.update(&booking).await?;
        info!(
            booking_id,
            received_cents = received,
            expected_cents = expected,
            confidence = %confidence_str,
            "evidence outside auto-confirm bounds; flagged for review"
        );
        Ok(EvidenceOutcome::NeedsReview {
            booking: self.get_required(booking_id).await?,
            extracted_cents: Some(received),
            confidence: score.confidence,
        })
    }

    /// Owner adjudication. Always outranks the automated result: approve
    /// confirms with the operator-entered amount regardless of confidence,
    /// reject leaves the booking pending for another attempt.
    pub async fn manual_verify(
        &self,
        booking_id: i64,
        decision: ManualVerify,
    ) -> Result<Booking, EngineError> {
        let mut booking = self.get_required(booking_id).await?;

        if booking.status.is_terminal() {
            return Err(EngineError::conflict(format!(
                "cannot verify payment on a {} booking",
                booking.status.as_str()
            )));
        }
        match booking.payment_rail {
            Some(PaymentRail::PeerToPeer) => {}
            _ => {
                return Err(EngineError::conflict(
                    "manual verification applies to peer-to-peer bookings only",
                ))
            }
        }
        if booking.payment_verified {
            return Err(EngineError::conflict("payment already verified"));
        }

        if decision.approve {
            let amount = decision
                .amount_cents
                .ok_or_else(|| EngineError::validation("an amount is required to approve"))?;
            if amount <= 0 {
                return Err(EngineError::validation("approved amount must be positive"));
            }

            booking.received_amount_cents = Some(amount);
            self.store.update(&booking).await?;

            let mut confirmed = self.confirm(booking_id, amount).await?;
            confirmed.payment_verified = true;
            confirmed.verified_at = Some(self.clock.now());
            confirmed.verification_notes = Some(
                decision
                    .notes
                    .unwrap_or_else(|| format!("manually approved for {}", dollars(amount))),
            );
            confirmed.needs_manual_review = false;
            self.store.update(&confirmed).await?;
            return self.get_required(booking_id).await;
        }

        booking.needs_manual_review = false;
        booking.verified_at = Some(self.clock.now());
        booking.verification_notes = Some(
            decision
                .notes
                .unwrap_or_else(|| "rejected by operator".to_string()),
        );
        self.store.update(&booking).await?;
        info!(booking_id, "manual verification rejected; booking stays pending");
        self.get_required(booking_id).await
    }

    /// Peer-to-peer bookings waiting on an owner decision.
    pub async fn pending_review(&self) -> Result<Vec<Booking>, EngineError> {
        let pending = self.store.list_by_status(BookingStatus::Pending).await?;
        Ok(pending
            .into_iter()
            .filter(|b| b.needs_manual_review && b.payment_rail == Some(PaymentRail::PeerToPeer))
            .collect())
    }

    /// Shared terminal effect of both rails.
    ///
    /// Re-validates the slot against other confirmed bookings (the second
    /// payer of a doubly-held slot is rejected here), then performs the one
    /// conditional pending+unpaid -> confirmed update.
    async fn confirm(&self, booking_id: i64, amount_cents: i64) -> Result<Booking, EngineError> {
        let booking = self.get_required(booking_id).await?;

        let bookings = self.store.list().await?;
        if self.slots.slot_taken(
            &booking.event_date,
            &booking.event_time,
            &bookings,
            true,
            Some(booking_id),
        ) {
            return Err(EngineError::conflict(
                "slot was confirmed for another booking",
            ));
        }

        let number = confirmation_number(booking_id);
        if !self
            .store
            .confirm_payment(booking_id, amount_cents, &number)
            .await?
        {
            return Err(EngineError::conflict("booking already paid"));
        }

        let confirmed = self.get_required(booking_id).await?;
        info!(
            booking_id,
            amount_cents,
            confirmation = %number,
            "booking confirmed"
        );

        // Confirmation stands even when the notification cannot be sent.
        if let Err(err) = self.notifier.booking_confirmed(&confirmed).await {
            warn!(booking_id, error = %err, "confirmation notification failed");
        }

        Ok(confirmed)
    }

    async fn get_required(&self, id: i64) -> Result<Booking, EngineError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("booking {id}")))
    }
}

fn dollars(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, (cents % 100).abs())
}

/// Mock checkout provider for environments without a real one.
///
/// Session ids of the form `mock_cs_<amount_cents>` report paid with that
/// amount; anything else is unknown.
pub struct MockCheckoutProvider;

#[async_trait::async_trait]
impl foamline_core::collaborators::CardCheckoutProvider for MockCheckoutProvider {
    async fn fetch_session(
        &self,
        session_id: &str,
    ) -> Result<foamline_core::collaborators::CheckoutSession, EngineError> {
        let amount = session_id
            .strip_prefix("mock_cs_")
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| EngineError::not_found(format!("checkout session {session_id}")))?;
        Ok(foamline_core::collaborators::CheckoutSession {
            session_id: session_id.to_string(),
            paid: true,
            amount_cents: amount,
        })
    }
}

/// Mock scorer that accepts every upload but extracts nothing, so every
/// evidence submission lands in manual review rather than auto-confirming.
pub struct MockEvidenceScorer;

#[async_trait::async_trait]
impl foamline_core::collaborators::EvidenceScorer for MockEvidenceScorer {
    async fn score(
        &self,
        _image: &[u8],
    ) -> Result<foamline_core::collaborators::EvidenceScore, EngineError> {
        Ok(foamline_core::collaborators::EvidenceScore {
            is_authentic: true,
            recipient_matches: true,
            amount_cents: None,
            confidence: None,
            raw_text: String::new(),
        })
    }
}
