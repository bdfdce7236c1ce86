use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

/// Payment rail, chosen once per booking and never changed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRail {
    Card,
    PeerToPeer,
}

impl PaymentRail {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentRail::Card => "card",
            PaymentRail::PeerToPeer => "peer_to_peer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(PaymentRail::Card),
            "peer_to_peer" => Some(PaymentRail::PeerToPeer),
            _ => None,
        }
    }
}

/// The single source of truth for a customer's reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub street_address: String,
    pub postal_code: String,
    pub party_size: i32,
    pub package_id: String,
    /// Canonical `YYYY-MM-DD`; legacy rows may hold free text (see eventtime parsing).
    pub event_date: String,
    /// Slot label from the catalog, e.g. `"2:00 PM"`.
    pub event_time: String,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub payment_rail: Option<PaymentRail>,
    pub expected_amount_cents: Option<i64>,
    pub received_amount_cents: Option<i64>,
    pub amount_paid_cents: Option<i64>,
    pub travel_fee_cents: Option<i64>,
    pub travel_distance_miles: Option<f64>,
    pub checkout_session_id: Option<String>,
    pub evidence_ref: Option<String>,
    pub payment_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub needs_manual_review: bool,
    pub confirmation_number: Option<String>,
    pub pending_expires_at: Option<DateTime<Utc>>,
    pub payment_reminder_sent_at: Option<DateTime<Utc>>,
    pub event_reminder_48h_sent_at: Option<DateTime<Utc>>,
    pub event_reminder_24h_sent_at: Option<DateTime<Utc>>,
    pub cancellation_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Append an audit line to the free-text notes.
    pub fn append_note(&mut self, line: &str) {
        match &mut self.notes {
            Some(notes) => {
                notes.push('\n');
                notes.push_str(line);
            }
            None => self.notes = Some(line.to_string()),
        }
        self.updated_at = Utc::now();
    }

    /// A booking occupies its slot while it is not cancelled.
    pub fn holds_slot(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

/// Confirmation number assigned when a booking is confirmed.
pub fn confirmation_number(booking_id: i64) -> String {
    format!("FMB-{:06}", booking_id)
}

/// Fields supplied at creation; everything else starts unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
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
    pub pending_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An email address opted in to event-reminder broadcasts, independent of
/// any booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSubscriber {
    pub id: i64,
    pub email: String,
    pub unsubscribe_token: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
