use serde::{Deserialize, Serialize};

/// Travel fee policy: a free-mile allowance, then a flat per-mile rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelPolicy {
    pub free_miles: f64,
    pub per_mile_cents: i64,
}

impl Default for TravelPolicy {
    fn default() -> Self {
        Self {
            free_miles: 20.0,
            per_mile_cents: 200,
        }
    }
}

/// A quoted travel fee for a given distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelQuote {
    pub distance_miles: f64,
    pub fee_cents: i64,
}

impl TravelPolicy {
    /// Pure fee function: `max(0, miles - free_miles) * per_mile_cents`,
    /// rounded to the nearest cent.
    pub fn quote(&self, distance_miles: f64) -> TravelQuote {
        let billable = (distance_miles - self.free_miles).max(0.0);
        let fee_cents = (billable * self.per_mile_cents as f64).round() as i64;
        TravelQuote {
            distance_miles,
            fee_cents,
        }
    }
}
