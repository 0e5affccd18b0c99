use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::engine::notify::dispatch;
use crate::error::AppError;
use crate::models::identity::{Identity, Role};
use crate::models::load::LoadStatus;
use crate::models::notification::NotificationType;
use crate::models::rating::{Rating, RatingEntry, RatingSummary, Review};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingInput {
    pub rating: i64,
    #[serde(default)]
    pub review: Option<String>,
}

/// `round(sum / count, 1)` over every score received; `(0.0, 0)` when empty.
pub fn average(scores: &[u8]) -> (f64, u32) {
    if scores.is_empty() {
        return (0.0, 0);
    }
    let sum: u32 = scores.iter().map(|&s| u32::from(s)).sum();
    let count = scores.len() as u32;
    let mean = f64::from(sum) / f64::from(count);
    ((mean * 10.0).round() / 10.0, count)
}

fn validate_score(raw: i64) -> Result<u8, AppError> {
    match u8::try_from(raw) {
        Ok(score @ 1..=5) => Ok(score),
        _ => Err(AppError::Validation(format!(
            "rating must be an integer between 1 and 5, got {raw}"
        ))),
    }
}

/// Record the caller's rating of their counterpart on a completed load and
/// refresh the counterpart's aggregate.
#[instrument(skip_all, fields(op = "rate", %load_id, rater = %requester.id))]
pub fn submit_rating(
    state: &AppState,
    requester: Identity,
    load_id: Uuid,
    input: RatingInput,
) -> Result<Rating, AppError> {
    let score = validate_score(input.rating)?;

    let load = state
        .loads
        .get(load_id)
        .ok_or_else(|| AppError::NotFound(format!("load {load_id} not found")))?;
    if load.status != LoadStatus::Completed {
        return Err(AppError::InvalidState(format!(
            "load {load_id} is {}; ratings open once it is completed",
            load.status.as_str()
        )));
    }

    let driver_id = load.assigned_driver_id().ok_or_else(|| {
        AppError::Internal(format!("completed load {load_id} has no assigned driver"))
    })?;

    let target = match requester.role {
        Role::Customer if load.customer_id == requester.id => driver_id,
        Role::Driver if driver_id == requester.id => load.customer_id,
        _ => {
            return Err(AppError::Forbidden(format!(
                "only the customer or assigned driver of load {load_id} may rate it"
            )));
        }
    };

    let entry = RatingEntry {
        rating: score,
        review: input
            .review
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
        rated_at: Utc::now(),
    };
    let rating = state
        .ratings
        .upsert(load_id, load.customer_id, driver_id, requester.role, entry);

    state.loads.modify(load_id, |load, _| {
        match requester.role {
            Role::Customer => load.customer_rated = true,
            _ => load.driver_rated = true,
        }
        Ok(())
    })?;

    let (average_rating, total_ratings) = match requester.role {
        Role::Customer => refresh_driver_reputation(state, target)?,
        _ => refresh_customer_reputation(state, target)?,
    };

    state.metrics.ratings_total.inc();
    dispatch(
        state,
        target,
        NotificationType::NewRating,
        "You received a new rating",
        format!("You were rated {score} out of 5 for load {} to {}", load.source, load.destination),
        Some(load_id),
    );

    info!(%target, score, average_rating, total_ratings, "rating recorded");
    Ok(rating)
}

/// Full recompute from every rating document, done under the driver's entry
/// lock so concurrent raters cannot write back a stale aggregate.
fn refresh_driver_reputation(state: &AppState, driver_id: Uuid) -> Result<(f64, u32), AppError> {
    let driver = state.identities.update_driver(driver_id, |driver| {
        let scores: Vec<u8> = state
            .ratings
            .reviews_of_driver(driver_id)
            .iter()
            .map(|r| r.rating)
            .collect();
        (driver.average_rating, driver.total_ratings) = average(&scores);
        Ok(())
    })?;
    Ok((driver.average_rating, driver.total_ratings))
}

fn refresh_customer_reputation(
    state: &AppState,
    customer_id: Uuid,
) -> Result<(f64, u32), AppError> {
    let customer = state.identities.update_customer(customer_id, |customer| {
        let scores: Vec<u8> = state
            .ratings
            .reviews_of_customer(customer_id)
            .iter()
            .map(|r| r.rating)
            .collect();
        (customer.average_rating, customer.total_ratings) = average(&scores);
        Ok(())
    })?;
    Ok((customer.average_rating, customer.total_ratings))
}

/// The rating document of a load, visible to its two parties.
pub fn load_rating(state: &AppState, requester: Identity, load_id: Uuid) -> Result<Rating, AppError> {
    let load = state
        .loads
        .get(load_id)
        .ok_or_else(|| AppError::NotFound(format!("load {load_id} not found")))?;

    let is_party = match requester.role {
        Role::Customer => load.customer_id == requester.id,
        Role::Driver => load.is_assigned_to(requester.id),
        Role::Admin => true,
    };
    if !is_party {
        return Err(AppError::Forbidden(format!(
            "load {load_id} belongs to other parties"
        )));
    }

    state
        .ratings
        .get(load_id)
        .ok_or_else(|| AppError::NotFound(format!("load {load_id} has no ratings yet")))
}

pub fn driver_summary(state: &AppState, driver_id: Uuid) -> Result<RatingSummary, AppError> {
    let driver = state
        .identities
        .driver(driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;
    Ok(summary(
        driver.average_rating,
        driver.total_ratings,
        state.ratings.reviews_of_driver(driver_id),
    ))
}

pub fn customer_summary(state: &AppState, customer_id: Uuid) -> Result<RatingSummary, AppError> {
    let customer = state
        .identities
        .customer(customer_id)
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id} not found")))?;
    Ok(summary(
        customer.average_rating,
        customer.total_ratings,
        state.ratings.reviews_of_customer(customer_id),
    ))
}

fn summary(average_rating: f64, total_ratings: u32, reviews: Vec<Review>) -> RatingSummary {
    RatingSummary {
        average_rating,
        total_ratings,
        reviews,
    }
}
