use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, put};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::auth::AuthUser;
use crate::engine::approval::{self, Rejection};
use crate::error::AppError;
use crate::models::driver::{Driver, DriverStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/drivers", get(list_drivers))
        .route("/admin/drivers/:id/approve", put(approve_driver))
        .route("/admin/drivers/:id/reject", put(reject_driver))
}

#[derive(Deserialize)]
pub struct DriverFilter {
    pub status: Option<DriverStatus>,
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiQuery(filter): ApiQuery<DriverFilter>,
) -> Result<Json<Vec<Driver>>, AppError> {
    approval::list_drivers(&state, who, filter.status).map(Json)
}

async fn approve_driver(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Driver>, AppError> {
    approval::approve_driver(&state, who, id).map(Json)
}

async fn reject_driver(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<Rejection>,
) -> Result<Json<Driver>, AppError> {
    approval::reject_driver(&state, who, id, payload).map(Json)
}
