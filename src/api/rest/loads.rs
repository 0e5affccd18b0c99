use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::auth::AuthUser;
use crate::engine::lifecycle::{self, LoadChanges, NewLoad};
use crate::error::AppError;
use crate::models::load::{ApplicantSnapshot, Load};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/loads", post(create_load))
        .route("/loads/mine", get(list_own_loads))
        .route("/loads/available", get(list_available_loads))
        .route("/loads/assigned", get(list_driver_loads))
        .route("/loads/:id", get(get_load).put(edit_load))
        .route("/loads/:id/apply", post(apply_to_load))
        .route("/loads/:id/applicants", get(list_applicants))
        .route("/loads/:id/assign", put(assign_driver))
        .route("/loads/:id/status", put(update_status))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

async fn create_load(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiJson(payload): ApiJson<NewLoad>,
) -> Result<(StatusCode, Json<Load>), AppError> {
    let load = lifecycle::create_load(&state, who, payload)?;
    Ok((StatusCode::CREATED, Json(load)))
}

async fn list_own_loads(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
) -> Result<Json<Vec<Load>>, AppError> {
    lifecycle::customer_loads(&state, who).map(Json)
}

async fn list_available_loads(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
) -> Result<Json<Vec<Load>>, AppError> {
    lifecycle::available_loads(&state, who).map(Json)
}

async fn list_driver_loads(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
) -> Result<Json<Vec<Load>>, AppError> {
    lifecycle::driver_loads(&state, who).map(Json)
}

async fn get_load(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Load>, AppError> {
    lifecycle::get_load(&state, who, id).map(Json)
}

async fn edit_load(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<LoadChanges>,
) -> Result<Json<Load>, AppError> {
    lifecycle::edit(&state, who, id, payload).map(Json)
}

async fn apply_to_load(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Load>, AppError> {
    lifecycle::apply(&state, who, id).map(Json)
}

async fn list_applicants(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<ApplicantSnapshot>>, AppError> {
    lifecycle::applicants_with_live_details(&state, who, id).map(Json)
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AssignRequest>,
) -> Result<Json<Load>, AppError> {
    lifecycle::assign(&state, who, id, payload.driver_id).map(Json)
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> Result<Json<Load>, AppError> {
    match payload.status.trim() {
        "completed" => lifecycle::complete(&state, who, id).map(Json),
        "cancelled" => lifecycle::cancel(&state, who, id).map(Json),
        other => Err(AppError::Validation(format!(
            "unsupported status target: {other}, expected completed or cancelled"
        ))),
    }
}
