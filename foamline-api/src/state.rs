use std::sync::Arc;

use foamline_booking::{BookingLedger, IdentityResolver, ReconciliationEngine};
use foamline_core::repository::SubscriberStore;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<BookingLedger>,
    pub reconcile: Arc<ReconciliationEngine>,
    pub identity: Arc<IdentityResolver>,
    pub subscribers: Arc<dyn SubscriberStore>,
}
