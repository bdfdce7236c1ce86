use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use foamline_booking::{EvidenceOutcome, ManualVerify};
use foamline_core::booking::{Booking, PaymentRail};
use foamline_core::error::EngineError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/rail", post(choose_rail))
        .route("/v1/bookings/{id}/evidence", post(submit_evidence))
        .route("/v1/bookings/{id}/verify", post(manual_verify))
        .route("/v1/payments/pending-review", get(pending_review))
}

#[derive(Debug, Deserialize)]
struct ChooseRailRequest {
    rail: PaymentRail,
}

#[derive(Debug, Serialize)]
struct ChooseRailResponse {
    booking: Booking,
    expected_amount_cents: i64,
    travel_fee_cents: i64,
}

async fn choose_rail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ChooseRailRequest>,
) -> Result<Json<ChooseRailResponse>, AppError> {
    let booking = state.ledger.choose_rail(id, req.rail).await?;
    let expected = booking
        .expected_amount_cents
        .ok_or_else(|| EngineError::Storage("expected amount missing after rail choice".into()))?;
    let travel_fee = booking.travel_fee_cents.unwrap_or(0);
    Ok(Json(ChooseRailResponse {
        expected_amount_cents: expected,
        travel_fee_cents: travel_fee,
        booking,
    }))
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum EvidenceResponse {
    Confirmed {
        booking: Booking,
    },
    NeedsReview {
        booking: Booking,
        extracted_cents: Option<i64>,
        confidence: Option<String>,
    },
}

/// Raw image bytes in, funnel outcome out. The stored evidence reference is
/// generated here; blob storage itself is outside the engine.
async fn submit_evidence(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<EvidenceResponse>, AppError> {
    if body.is_empty() {
        return Err(EngineError::validation("an image is required").into());
    }

    let evidence_ref = format!("evidence/{}/{}", id, Uuid::new_v4());
    let response = match state.reconcile.submit_evidence(id, &evidence_ref, &body).await? {
        EvidenceOutcome::Confirmed(booking) => EvidenceResponse::Confirmed { booking },
        EvidenceOutcome::NeedsReview {
            booking,
            extracted_cents,
            confidence,
        } => EvidenceResponse::NeedsReview {
            booking,
            extracted_cents,
            confidence: confidence.map(|c| c.as_str().to_string()),
        },
    };
    Ok(Json(response))
}

async fn manual_verify(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(decision): Json<ManualVerify>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.reconcile.manual_verify(id, decision).await?))
}

async fn pending_review(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.reconcile.pending_review().await?))
}
