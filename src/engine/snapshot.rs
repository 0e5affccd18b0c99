use chrono::{DateTime, Utc};

use crate::models::customer::Customer;
use crate::models::driver::Driver;
use crate::models::load::{ApplicantSnapshot, CustomerSnapshot};

/// Freeze the driver's public profile as of `at`.
pub fn applicant_snapshot(driver: &Driver, at: DateTime<Utc>) -> ApplicantSnapshot {
    ApplicantSnapshot {
        driver_id: driver.id,
        name: driver.name.clone(),
        mobile: driver.phone.clone(),
        lorry_type: driver.lorry_type.clone(),
        max_capacity: driver.max_capacity,
        applied_at: at,
        average_rating: driver.average_rating,
        total_ratings: driver.total_ratings,
        documents: driver.documents.clone(),
    }
}

pub fn customer_snapshot(customer: &Customer) -> CustomerSnapshot {
    CustomerSnapshot {
        name: customer.name.clone(),
        phone: customer.phone.clone(),
    }
}

/// Read-time merge: identity and documents stay as submitted, reputation
/// comes from the live driver record when one exists.
pub fn with_live_reputation(
    snapshot: &ApplicantSnapshot,
    live: Option<&Driver>,
) -> ApplicantSnapshot {
    let mut merged = snapshot.clone();
    if let Some(driver) = live {
        merged.average_rating = driver.average_rating;
        merged.total_ratings = driver.total_ratings;
    }
    merged
}
