use axum::{
    extract::{Json, Path, State},
    routing::post,
    Router,
};
use foamline_core::booking::CalendarSubscriber;
use foamline_core::error::EngineError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/subscribers", post(subscribe))
        .route("/v1/subscribers/{token}/unsubscribe", post(unsubscribe))
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    email: String,
}

async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<CalendarSubscriber>, AppError> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(EngineError::validation("a valid email address is required").into());
    }
    Ok(Json(state.subscribers.subscribe(&email).await?))
}

#[derive(Debug, Serialize)]
struct UnsubscribeResponse {
    unsubscribed: bool,
}

async fn unsubscribe(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<UnsubscribeResponse>, AppError> {
    let removed = state.subscribers.unsubscribe(token).await?;
    if !removed {
        return Err(EngineError::not_found("no active subscription for that token").into());
    }
    Ok(Json(UnsubscribeResponse { unsubscribed: true }))
}
