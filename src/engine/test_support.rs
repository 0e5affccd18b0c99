use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::engine::lifecycle::NewLoad;
use crate::engine::notify::LogTransport;
use crate::models::customer::Customer;
use crate::models::driver::{Driver, DriverDocuments, DriverStatus};
use crate::models::identity::{Identity, Role};
use crate::models::notification::Notification;
use crate::state::AppState;

pub fn test_state() -> (AppState, mpsc::Receiver<Notification>) {
    AppState::new(1024, 1024, Duration::hours(1), Arc::new(LogTransport))
}

pub fn customer(state: &AppState, email: &str) -> Identity {
    let customer = state
        .identities
        .insert_customer(Customer {
            id: Uuid::new_v4(),
            name: format!("Customer {email}"),
            email: email.to_string(),
            password_hash: String::new(),
            phone: "9000000000".into(),
            role: Role::Customer,
            average_rating: 0.0,
            total_ratings: 0,
            created_at: Utc::now(),
        })
        .unwrap();
    Identity::customer(customer.id)
}

fn driver_with_status(state: &AppState, email: &str, status: DriverStatus) -> Identity {
    let driver = state
        .identities
        .insert_driver(Driver {
            id: Uuid::new_v4(),
            name: format!("Driver {email}"),
            email: email.to_string(),
            password_hash: String::new(),
            phone: "9800000000".into(),
            address: "Vijayawada".into(),
            lorry_type: "container".into(),
            max_capacity: 20.0,
            status,
            rejection_reason: None,
            documents: documents(),
            average_rating: 0.0,
            total_ratings: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap();
    Identity::driver(driver.id)
}

pub fn accepted_driver(state: &AppState, email: &str) -> Identity {
    driver_with_status(state, email, DriverStatus::Accepted)
}

pub fn pending_driver(state: &AppState, email: &str) -> Identity {
    driver_with_status(state, email, DriverStatus::Pending)
}

pub fn documents() -> DriverDocuments {
    DriverDocuments {
        license: Some("https://docs.example/license.pdf".into()),
        rc: Some("https://docs.example/rc.pdf".into()),
        fitness: Some("https://docs.example/fitness.pdf".into()),
        insurance: Some("https://docs.example/insurance.pdf".into()),
        medical: Some("https://docs.example/medical.pdf".into()),
        all_india_permit: None,
    }
}

pub fn hyd_to_blr() -> NewLoad {
    NewLoad {
        source: "Hyderabad".into(),
        destination: "Bangalore".into(),
        load_type: "steel coils".into(),
        quantity: Some(10.0),
        estimated_fare: Some(50_000.0),
        description: None,
        estimated_delivery_date: None,
    }
}
