use std::net::SocketAddr;
use std::sync::Arc;

use foamline_api::{app, state::AppState, worker};
use foamline_booking::{
    BookingLedger, FixedDistance, IdentityResolver, LedgerRules, LogNotifier,
    MockCheckoutProvider, MockEvidenceScorer, ReconciliationEngine, SweepRules, SweepRunner,
};
use foamline_catalog::{PackageCatalog, SlotCatalog, TravelPolicy};
use foamline_core::collaborators::SystemClock;
use foamline_core::repository::{BookingStore, SubscriberStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foamline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = foamline_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Foamline API on port {}", config.server.port);

    let db = foamline_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let store: Arc<dyn BookingStore> =
        Arc::new(foamline_store::PgBookingStore::new(db.pool.clone()));
    let subscribers: Arc<dyn SubscriberStore> =
        Arc::new(foamline_store::PgSubscriberStore::new(db.pool.clone()));

    let rules = &config.business_rules;
    let clock = Arc::new(SystemClock);
    let notifier = Arc::new(LogNotifier);
    let travel = TravelPolicy {
        free_miles: rules.free_miles,
        per_mile_cents: rules.per_mile_cents,
    };

    let ledger = Arc::new(BookingLedger::new(
        store.clone(),
        PackageCatalog::default(),
        SlotCatalog::default(),
        travel,
        Arc::new(FixedDistance(rules.fallback_distance_miles)),
        clock.clone(),
        LedgerRules {
            min_lead_time_hours: rules.min_lead_time_hours,
            pending_ttl_hours: rules.pending_ttl_hours,
            depot_address: rules.depot_address.clone(),
        },
    ));

    let reconcile = Arc::new(ReconciliationEngine::new(
        store.clone(),
        SlotCatalog::default(),
        Arc::new(MockCheckoutProvider),
        Arc::new(MockEvidenceScorer),
        notifier.clone(),
        clock.clone(),
    ));

    let identity = Arc::new(IdentityResolver::new(store.clone()));

    let sweep = Arc::new(SweepRunner::new(
        store,
        subscribers.clone(),
        notifier,
        clock,
        SweepRules {
            reminder_after_hours: rules.reminder_after_hours,
            pending_ttl_hours: rules.pending_ttl_hours,
        },
    ));
    let sweep_worker = worker::SweepWorker::start(sweep, rules.sweep_interval_seconds);

    let app_state = AppState {
        ledger,
        reconcile,
        identity,
        subscribers,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app(app_state))
        .await
        .expect("Server error");

    sweep_worker.stop().await;
}
