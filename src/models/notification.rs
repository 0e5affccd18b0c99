use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    LoadApplication,
    LoadAssigned,
    LoadCompleted,
    NewRating,
    DriverApproved,
    DriverRejected,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LoadApplication => "load_application",
            NotificationType::LoadAssigned => "load_assigned",
            NotificationType::LoadCompleted => "load_completed",
            NotificationType::NewRating => "new_rating",
            NotificationType::DriverApproved => "driver_approved",
            NotificationType::DriverRejected => "driver_rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        load_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            load_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}
