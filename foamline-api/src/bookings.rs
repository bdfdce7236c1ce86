use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use foamline_booking::{CreateBooking, IdentityQuery, Resolution};
use foamline_core::booking::Booking;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/lookup", get(lookup_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/reschedule", post(reschedule_booking))
        .route("/v1/bookings/{id}/complete", post(complete_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBooking>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.ledger.create(req).await?;
    info!(booking_id = booking.id, "booking created via API");
    Ok(Json(booking))
}

async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.ledger.list().await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.ledger.get_required(id).await?))
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    note: Option<String>,
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.ledger.cancel(id, req.note).await?))
}

#[derive(Debug, Deserialize)]
struct RescheduleRequest {
    new_date: String,
    new_time: String,
}

async fn reschedule_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(
        state
            .ledger
            .reschedule(id, &req.new_date, &req.new_time)
            .await?,
    ))
}

async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.ledger.complete(id).await?))
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum LookupResponse {
    NotFound,
    Resolved { booking: Booking },
    Ambiguous { matches: Vec<Booking> },
}

/// Contact lookup for the chat assistant: booking id, phone, or phone+name.
async fn lookup_booking(
    State(state): State<AppState>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<LookupResponse>, AppError> {
    let response = match state.identity.resolve(&query).await? {
        Resolution::NotFound => LookupResponse::NotFound,
        Resolution::Resolved(booking) => LookupResponse::Resolved { booking },
        Resolution::Ambiguous(matches) => LookupResponse::Ambiguous { matches },
    };
    Ok(Json(response))
}
