use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};

use crate::api::rest::extract::ApiJson;
use crate::auth::{AuthUser, bearer_token};
use crate::engine::accounts::{
    self, Credentials, CustomerRegistration, DriverProfileUpdate, DriverRegistration, Profile,
    Session,
};
use crate::error::AppError;
use crate::models::customer::Customer;
use crate::models::driver::Driver;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register/customer", post(register_customer))
        .route("/auth/register/driver", post(register_driver))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/me", get(me))
        .route("/drivers/me", put(update_driver_profile))
}

async fn register_customer(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CustomerRegistration>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let customer = accounts::register_customer(&state, payload)?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<DriverRegistration>,
) -> Result<(StatusCode, Json<Driver>), AppError> {
    let driver = accounts::register_driver(&state, payload)?;
    Ok((StatusCode::CREATED, Json(driver)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<Credentials>,
) -> Result<Json<Session>, AppError> {
    accounts::login(&state, payload).map(Json)
}

async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(_who): AuthUser,
    headers: HeaderMap,
) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token);
    }
    StatusCode::NO_CONTENT
}

async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
) -> Result<Json<Profile>, AppError> {
    accounts::profile(&state, who).map(Json)
}

async fn update_driver_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiJson(payload): ApiJson<DriverProfileUpdate>,
) -> Result<Json<Driver>, AppError> {
    accounts::update_driver_profile(&state, who, payload).map(Json)
}
