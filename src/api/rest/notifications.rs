use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use serde::Serialize;
use uuid::Uuid;

use crate::api::rest::extract::ApiPath;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::notification::Notification;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/:id/read", put(mark_read))
        .route("/notifications/:id", axum::routing::delete(delete_notification))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CountResponse {
    count: usize,
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
) -> Json<Vec<Notification>> {
    Json(state.notifications.list_for(who.id))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
) -> Json<CountResponse> {
    Json(CountResponse {
        count: state.notifications.unread_count(who.id),
    })
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
) -> Json<CountResponse> {
    Json(CountResponse {
        count: state.notifications.mark_all_read(who.id),
    })
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Notification>, AppError> {
    state.notifications.mark_read(who.id, id).map(Json)
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    AuthUser(who): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.notifications.delete(who.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
