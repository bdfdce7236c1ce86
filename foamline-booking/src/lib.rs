pub mod eventtime;
pub mod identity;
pub mod ledger;
pub mod memory;
pub mod reconcile;
pub mod scheduler;

pub use identity::{IdentityQuery, IdentityResolver, Resolution};
pub use ledger::{BookingLedger, CreateBooking, FixedDistance, LedgerRules};
pub use memory::InMemoryStore;
pub use reconcile::{
    EvidenceOutcome, ManualVerify, MockCheckoutProvider, MockEvidenceScorer, ReconciliationEngine,
    AMOUNT_TOLERANCE_CENTS,
};
pub use scheduler::{LogNotifier, SweepReport, SweepRules, SweepRunner};
