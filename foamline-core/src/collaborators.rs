use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::error::EngineError;

/// State of a hosted card-checkout session as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub paid: bool,
    /// Authoritative amount actually charged, in cents.
    pub amount_cents: i64,
}

/// Card rail: the provider is the only authority on whether a session paid.
#[async_trait]
pub trait CardCheckoutProvider: Send + Sync {
    async fn fetch_session(&self, session_id: &str) -> Result<CheckoutSession, EngineError>;
}

/// Extraction confidence reported by the evidence scorer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Scored classification of one uploaded payment screenshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceScore {
    pub is_authentic: bool,
    pub recipient_matches: bool,
    pub amount_cents: Option<i64>,
    pub confidence: Option<Confidence>,
    pub raw_text: String,
}

/// Peer-to-peer rail: image in, scored assessment out. Scorer failures are
/// surfaced as ServiceUnavailable, never treated as "not paid".
#[async_trait]
pub trait EvidenceScorer: Send + Sync {
    async fn score(&self, image: &[u8]) -> Result<EvidenceScore, EngineError>;
}

/// Straight-line/driving distance between two addresses, in miles.
#[async_trait]
pub trait DistanceLookup: Send + Sync {
    async fn distance_miles(&self, origin: &str, destination: &str)
        -> Result<f64, EngineError>;
}

/// Reminder tier for pre-event notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderTier {
    HoursBefore48,
    HoursBefore24,
}

/// Outbound customer/subscriber notifications. Delivery is an external
/// concern; the engine only requires a success/failure signal so sends can
/// be retried on the next sweep.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), EngineError>;
    async fn payment_reminder(&self, booking: &Booking) -> Result<(), EngineError>;
    async fn booking_expired(&self, booking: &Booking) -> Result<(), EngineError>;
    async fn event_reminder(
        &self,
        booking: &Booking,
        subscriber_email: &str,
        tier: ReminderTier,
    ) -> Result<(), EngineError>;
}

/// Injected clock so time-based behaviour is testable without wall-clock
/// waits.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for exercising time-based behaviour deterministically.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
