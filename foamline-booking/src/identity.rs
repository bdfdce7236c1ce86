use std::sync::Arc;

use foamline_core::booking::Booking;
use foamline_core::error::EngineError;
use foamline_core::repository::BookingStore;
use serde::{Deserialize, Serialize};

/// Already-parsed contact hints for a lookup (extraction from free text is
/// the chat assistant's job, not ours).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityQuery {
    pub booking_id: Option<i64>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

/// Outcome of a lookup.
#[derive(Debug, Clone)]
pub enum Resolution {
    NotFound,
    Resolved(Booking),
    /// Multiple bookings share the phone number and no name was supplied;
    /// the caller must ask for a disambiguating name.
    Ambiguous(Vec<Booking>),
}

/// Keep only digits and truncate to the trailing 10, tolerating country-code
/// prefixes and formatting.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() > 10 {
        digits[digits.len() - 10..].to_string()
    } else {
        digits
    }
}

/// Resolve a contact against the given bookings.
///
/// Order: exact booking-id, then phone, then phone + case-insensitive name
/// substring. When the name filter leaves zero or more than one candidate,
/// the most recently created phone match wins. The tie-break is a product
/// decision carried over deliberately; it lives only here.
pub fn resolve(query: &IdentityQuery, bookings: &[Booking]) -> Resolution {
    if let Some(id) = query.booking_id {
        if let Some(booking) = bookings.iter().find(|b| b.id == id) {
            return Resolution::Resolved(booking.clone());
        }
    }

    let Some(phone) = query.phone.as_deref() else {
        return Resolution::NotFound;
    };
    let wanted = normalize_phone(phone);
    if wanted.is_empty() {
        return Resolution::NotFound;
    }

    let matches: Vec<&Booking> = bookings
        .iter()
        .filter(|b| normalize_phone(&b.customer_phone) == wanted)
        .collect();

    match matches.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Resolved(matches[0].clone()),
        _ => {
            let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) else {
                return Resolution::Ambiguous(matches.into_iter().cloned().collect());
            };

            let needle = name.trim().to_lowercase();
            let named: Vec<&&Booking> = matches
                .iter()
                .filter(|b| b.customer_name.to_lowercase().contains(&needle))
                .collect();

            if named.len() == 1 {
                return Resolution::Resolved((*named[0]).clone());
            }

            let pool: Vec<&&Booking> = if named.is_empty() {
                matches.iter().collect()
            } else {
                named
            };
            let most_recent = pool
                .into_iter()
                .max_by_key(|b| (b.created_at, b.id))
                .map(|b| (**b).clone());
            match most_recent {
                Some(booking) => Resolution::Resolved(booking),
                None => Resolution::NotFound,
            }
        }
    }
}

/// Store-backed wrapper for callers that do not already hold the ledger
/// rows.
pub struct IdentityResolver {
    store: Arc<dyn BookingStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, query: &IdentityQuery) -> Result<Resolution, EngineError> {
        let bookings = self.store.list().await?;
        Ok(resolve(query, &bookings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use foamline_core::booking::BookingStatus;

    fn booking(id: i64, name: &str, phone: &str, created_hours_ago: i64) -> Booking {
        let created = Utc::now() - Duration::hours(created_hours_ago);
        Booking {
            id,
            customer_name: name.to_string(),
            customer_email: "x@example.com".to_string(),
            customer_phone: phone.to_string(),
            street_address: "12 Foam St".to_string(),
            postal_code: "33101".to_string(),
            party_size: 20,
            package_id: "splash".to_string(),
            event_date: "2025-06-01".to_string(),
            event_time: "2:00 PM".to_string(),
            notes: None,
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
            pending_expires_at: None,
            payment_reminder_sent_at: None,
            event_reminder_48h_sent_at: None,
            event_reminder_24h_sent_at: None,
            cancellation_note: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_booking_id_wins() {
        let bookings = vec![booking(1, "Ana Diaz", "5551234567", 5)];
        let query = IdentityQuery {
            booking_id: Some(1),
            phone: None,
            name: None,
        };
        assert!(matches!(resolve(&query, &bookings), Resolution::Resolved(b) if b.id == 1));
    }

    #[test]
    fn test_phone_normalization_tolerates_country_code() {
        let bookings = vec![booking(1, "Ana Diaz", "(555) 123-4567", 5)];
        let query = IdentityQuery {
            booking_id: None,
            phone: Some("+1 555 123 4567".to_string()),
            name: None,
        };
        assert!(matches!(resolve(&query, &bookings), Resolution::Resolved(b) if b.id == 1));
    }

    #[test]
    fn test_shared_phone_disambiguation() {
        let bookings = vec![
            booking(1, "Ana Diaz", "5551234567", 30),
            booking(2, "Ben Diaz", "5551234567", 20),
            booking(3, "Cara Smith", "5551234567", 10),
        ];
        let phone = Some("5551234567".to_string());

        // No name: all three come back unresolved.
        let query = IdentityQuery {
            booking_id: None,
            phone: phone.clone(),
            name: None,
        };
        assert!(matches!(resolve(&query, &bookings), Resolution::Ambiguous(v) if v.len() == 3));

        // Name matching exactly one resolves it.
        let query = IdentityQuery {
            booking_id: None,
            phone: phone.clone(),
            name: Some("cara".to_string()),
        };
        assert!(matches!(resolve(&query, &bookings), Resolution::Resolved(b) if b.id == 3));

        // Name matching none falls back to the most recent phone match.
        let query = IdentityQuery {
            booking_id: None,
            phone: phone.clone(),
            name: Some("zoe".to_string()),
        };
        assert!(matches!(resolve(&query, &bookings), Resolution::Resolved(b) if b.id == 3));

        // Name matching several picks the most recent of those.
        let query = IdentityQuery {
            booking_id: None,
            phone,
            name: Some("diaz".to_string()),
        };
        assert!(matches!(resolve(&query, &bookings), Resolution::Resolved(b) if b.id == 2));
    }

    #[test]
    fn test_unknown_phone_is_not_found() {
        let bookings = vec![booking(1, "Ana Diaz", "5551234567", 5)];
        let query = IdentityQuery {
            booking_id: None,
            phone: Some("5550000000".to_string()),
            name: None,
        };
        assert!(matches!(resolve(&query, &bookings), Resolution::NotFound));
    }
}
