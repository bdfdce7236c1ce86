use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use foamline_catalog::{DayAvailability, FoamPackage, TravelQuote};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/packages", get(list_packages))
        .route("/v1/availability", get(fully_booked))
        .route("/v1/availability/{date}", get(day_availability))
        .route("/v1/travel-quote", get(travel_quote))
}

async fn list_packages(State(state): State<AppState>) -> Json<Vec<FoamPackage>> {
    Json(state.ledger.packages().all().to_vec())
}

async fn day_availability(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DayAvailability>, AppError> {
    Ok(Json(state.ledger.availability(&date).await?))
}

#[derive(Debug, Deserialize)]
struct DateRange {
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
struct FullyBookedResponse {
    fully_booked: Vec<String>,
}

async fn fully_booked(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Json<FullyBookedResponse>, AppError> {
    let dates = state.ledger.fully_booked_dates(&range.from, &range.to).await?;
    Ok(Json(FullyBookedResponse { fully_booked: dates }))
}

#[derive(Debug, Deserialize)]
struct TravelQuoteQuery {
    address: String,
}

async fn travel_quote(
    State(state): State<AppState>,
    Query(query): Query<TravelQuoteQuery>,
) -> Result<Json<TravelQuote>, AppError> {
    Ok(Json(state.ledger.travel_quote(&query.address).await?))
}
