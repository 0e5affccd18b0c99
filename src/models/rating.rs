use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingEntry {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub rated_at: DateTime<Utc>,
}

/// Ratings exchanged on one completed load. `customer_rating` is the score the
/// customer gave the driver; `driver_rating` is the score the driver gave the
/// customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub load_id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_rating: Option<RatingEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_rating: Option<RatingEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub load_id: Uuid,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_ratings: u32,
    pub reviews: Vec<Review>,
}
