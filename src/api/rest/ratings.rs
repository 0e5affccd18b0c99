use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use uuid::Uuid;

use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::auth::AuthUser;
use crate::engine::rating::{self, RatingInput};
use crate::error::AppError;
use crate::models::rating::{Rating, RatingSummary};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/loads/:id/rating", post(rate_load))
        .route("/ratings/loads/:id", get(get_load_rating))
        .route("/ratings/drivers/:id", get(driver_ratings))
        .route("/ratings/customers/:id", get(customer_ratings))
}

async fn rate_load(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<RatingInput>,
) -> Result<Json<Rating>, AppError> {
    rating::submit_rating(&state, who, id, payload).map(Json)
}

async fn get_load_rating(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Rating>, AppError> {
    rating::load_rating(&state, who, id).map(Json)
}

async fn driver_ratings(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<RatingSummary>, AppError> {
    rating::driver_summary(&state, id).map(Json)
}

async fn customer_ratings(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<RatingSummary>, AppError> {
    rating::customer_summary(&state, id).map(Json)
}
