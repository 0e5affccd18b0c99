use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::token::{hash_password, verify_password};
use crate::error::AppError;
use crate::models::customer::{Admin, Customer};
use crate::models::driver::{Driver, DriverDocuments, DriverStatus};
use crate::models::identity::{Identity, Role};
use crate::state::AppState;
use crate::store::identities::normalize_email;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: String,
    pub lorry_type: String,
    pub max_capacity: f64,
    pub documents: DriverDocuments,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub lorry_type: Option<String>,
    pub max_capacity: Option<f64>,
    pub documents: Option<DriverDocuments>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProfileDetails {
    Customer(Customer),
    Driver(Driver),
    Admin(Admin),
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub role: Role,
    pub profile: ProfileDetails,
}

fn required(fields: &[(&'static str, &str)]) -> Result<(), AppError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    let email = email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AppError::Validation(format!("{email} is not a valid email")));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[instrument(skip_all, fields(op = "register_customer"))]
pub fn register_customer(
    state: &AppState,
    input: CustomerRegistration,
) -> Result<Customer, AppError> {
    required(&[
        ("name", input.name.as_str()),
        ("email", input.email.as_str()),
        ("password", input.password.as_str()),
        ("phone", input.phone.as_str()),
    ])?;
    validate_credentials(&input.email, &input.password)?;

    let customer = state.identities.insert_customer(Customer {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        email: normalize_email(&input.email),
        password_hash: hash_password(&input.password),
        phone: input.phone.trim().to_string(),
        role: Role::Customer,
        average_rating: 0.0,
        total_ratings: 0,
        created_at: Utc::now(),
    })?;

    info!(customer_id = %customer.id, "customer registered");
    Ok(customer)
}

#[instrument(skip_all, fields(op = "register_driver"))]
pub fn register_driver(state: &AppState, input: DriverRegistration) -> Result<Driver, AppError> {
    required(&[
        ("name", input.name.as_str()),
        ("email", input.email.as_str()),
        ("password", input.password.as_str()),
        ("phone", input.phone.as_str()),
        ("address", input.address.as_str()),
        ("lorryType", input.lorry_type.as_str()),
    ])?;
    validate_credentials(&input.email, &input.password)?;
    if !(input.max_capacity.is_finite() && input.max_capacity > 0.0) {
        return Err(AppError::Validation("maxCapacity must be > 0".to_string()));
    }
    let missing_docs = input.documents.missing_mandatory();
    if !missing_docs.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required documents: {}",
            missing_docs.join(", ")
        )));
    }

    let now = Utc::now();
    let driver = state.identities.insert_driver(Driver {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        email: normalize_email(&input.email),
        password_hash: hash_password(&input.password),
        phone: input.phone.trim().to_string(),
        address: input.address.trim().to_string(),
        lorry_type: input.lorry_type.trim().to_string(),
        max_capacity: input.max_capacity,
        status: DriverStatus::Pending,
        rejection_reason: None,
        documents: input.documents,
        average_rating: 0.0,
        total_ratings: 0,
        created_at: now,
        updated_at: now,
    })?;

    info!(driver_id = %driver.id, "driver registered; awaiting approval");
    Ok(driver)
}

/// Create the bootstrap admin. Not reachable over HTTP.
pub fn seed_admin(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Admin, AppError> {
    validate_credentials(email, password)?;
    state.identities.insert_admin(Admin {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: normalize_email(email),
        password_hash: hash_password(password),
        created_at: Utc::now(),
    })
}

pub fn login(state: &AppState, credentials: Credentials) -> Result<Session, AppError> {
    let rejected = || AppError::Unauthorized("invalid email or password".to_string());

    let identity = state
        .identities
        .lookup_email(&credentials.email)
        .ok_or_else(rejected)?;
    let stored = state.identities.password_hash(identity).ok_or_else(rejected)?;

    if !verify_password(&credentials.password, &stored) {
        warn!(user_id = %identity.id, "failed login attempt");
        return Err(rejected());
    }

    Ok(Session {
        token: state.sessions.issue(identity),
        role: identity.role,
        user_id: identity.id,
    })
}

pub fn profile(state: &AppState, requester: Identity) -> Result<Profile, AppError> {
    let missing = || AppError::NotFound(format!("profile {} not found", requester.id));
    let details = match requester.role {
        Role::Customer => ProfileDetails::Customer(
            state.identities.customer(requester.id).ok_or_else(missing)?,
        ),
        Role::Driver => {
            ProfileDetails::Driver(state.identities.driver(requester.id).ok_or_else(missing)?)
        }
        Role::Admin => {
            ProfileDetails::Admin(state.identities.admin(requester.id).ok_or_else(missing)?)
        }
    };
    Ok(Profile {
        role: requester.role,
        profile: details,
    })
}

/// Edit the caller's driver profile. Snapshots already taken on loads are
/// left as they were.
pub fn update_driver_profile(
    state: &AppState,
    requester: Identity,
    update: DriverProfileUpdate,
) -> Result<Driver, AppError> {
    if requester.role != Role::Driver {
        return Err(AppError::Forbidden("driver role required".to_string()));
    }

    for (field, value) in [
        ("name", &update.name),
        ("phone", &update.phone),
        ("address", &update.address),
        ("lorryType", &update.lorry_type),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(AppError::Validation(format!("{field} cannot be empty")));
        }
    }
    if update
        .max_capacity
        .is_some_and(|c| !(c.is_finite() && c > 0.0))
    {
        return Err(AppError::Validation("maxCapacity must be > 0".to_string()));
    }

    state.identities.update_driver(requester.id, |driver| {
        if let Some(name) = update.name {
            driver.name = name.trim().to_string();
        }
        if let Some(phone) = update.phone {
            driver.phone = phone.trim().to_string();
        }
        if let Some(address) = update.address {
            driver.address = address.trim().to_string();
        }
        if let Some(lorry_type) = update.lorry_type {
            driver.lorry_type = lorry_type.trim().to_string();
        }
        if let Some(capacity) = update.max_capacity {
            driver.max_capacity = capacity;
        }
        if let Some(documents) = update.documents {
            driver.documents.merge(documents);
            let missing = driver.documents.missing_mandatory();
            if !missing.is_empty() {
                return Err(AppError::Validation(format!(
                    "required documents cannot be removed: {}",
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialVerifier;
    use crate::engine::test_support::{documents, test_state};

    fn driver_form(email: &str) -> DriverRegistration {
        DriverRegistration {
            name: "Suresh".into(),
            email: email.into(),
            password: "secret-pass".into(),
            phone: "9811111111".into(),
            address: "Nellore".into(),
            lorry_type: "tipper".into(),
            max_capacity: 12.0,
            documents: documents(),
        }
    }

    #[test]
    fn driver_registration_starts_pending() {
        let (state, _rx) = test_state();
        let driver = register_driver(&state, driver_form("Suresh@Example.com")).unwrap();

        assert_eq!(driver.status, DriverStatus::Pending);
        assert_eq!(driver.email, "suresh@example.com");
        assert_ne!(driver.password_hash, "secret-pass");
    }

    #[test]
    fn driver_registration_requires_mandatory_documents() {
        let (state, _rx) = test_state();
        let mut form = driver_form("d@example.com");
        form.documents.insurance = None;

        let err = register_driver(&state, form).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("insurance")));
    }

    #[test]
    fn customer_registration_validates_input() {
        let (state, _rx) = test_state();
        let bad_email = CustomerRegistration {
            name: "A".into(),
            email: "not-an-email".into(),
            password: "secret-pass".into(),
            phone: "1".into(),
        };
        assert!(matches!(
            register_customer(&state, bad_email),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register_customer(&state, CustomerRegistration::default()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn login_issues_verifiable_session() {
        let (state, _rx) = test_state();
        let customer = register_customer(
            &state,
            CustomerRegistration {
                name: "Meena".into(),
                email: "meena@example.com".into(),
                password: "secret-pass".into(),
                phone: "9822222222".into(),
            },
        )
        .unwrap();

        let session = login(
            &state,
            Credentials {
                email: "MEENA@example.com".into(),
                password: "secret-pass".into(),
            },
        )
        .unwrap();
        assert_eq!(session.user_id, customer.id);
        assert_eq!(session.role, Role::Customer);
        assert_eq!(state.sessions.verify(&session.token).unwrap().id, customer.id);

        let wrong = login(
            &state,
            Credentials {
                email: "meena@example.com".into(),
                password: "nope-nope".into(),
            },
        );
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn profile_update_does_not_touch_status() {
        let (state, _rx) = test_state();
        let driver = register_driver(&state, driver_form("d@example.com")).unwrap();

        let updated = update_driver_profile(
            &state,
            Identity::driver(driver.id),
            DriverProfileUpdate {
                lorry_type: Some("trailer".into()),
                documents: Some(DriverDocuments {
                    all_india_permit: Some("https://docs.example/permit.pdf".into()),
                    ..DriverDocuments::default()
                }),
                ..DriverProfileUpdate::default()
            },
        )
        .unwrap();

        assert_eq!(updated.lorry_type, "trailer");
        assert_eq!(updated.status, DriverStatus::Pending);
        assert!(updated.documents.all_india_permit.is_some());
        assert!(updated.documents.license.is_some());
    }

    #[test]
    fn profile_update_cannot_blank_mandatory_document() {
        let (state, _rx) = test_state();
        let driver = register_driver(&state, driver_form("d@example.com")).unwrap();

        let err = update_driver_profile(
            &state,
            Identity::driver(driver.id),
            DriverProfileUpdate {
                name: Some("Suresh K".into()),
                documents: Some(DriverDocuments {
                    license: Some("  ".into()),
                    ..DriverDocuments::default()
                }),
                ..DriverProfileUpdate::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("license")));

        let stored = state.identities.driver(driver.id).unwrap();
        assert_eq!(stored.name, "Suresh");
        assert_eq!(stored.documents.license, driver.documents.license);
    }
}
