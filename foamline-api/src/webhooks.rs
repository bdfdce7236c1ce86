use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use foamline_core::booking::Booking;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments/checkout", post(checkout_completed))
}

#[derive(Debug, Deserialize)]
struct CheckoutWebhook {
    session_id: String,
    booking_id: i64,
}

/// Card-rail confirmation callback.
///
/// The payload is only a pointer; the engine re-fetches the session from
/// the provider and trusts nothing but the provider-reported paid amount.
async fn checkout_completed(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutWebhook>,
) -> Result<Json<Booking>, AppError> {
    tracing::info!(
        booking_id = payload.booking_id,
        session = %payload.session_id,
        "checkout webhook received"
    );
    let booking = state
        .reconcile
        .confirm_card(payload.booking_id, &payload.session_id)
        .await?;
    Ok(Json(booking))
}
