use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::engine::notify::dispatch;
use crate::error::AppError;
use crate::models::driver::{Driver, DriverStatus};
use crate::models::identity::{Identity, Role};
use crate::models::notification::NotificationType;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Rejection {
    pub reason: String,
}

fn require_admin(requester: Identity) -> Result<(), AppError> {
    if requester.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("admin role required".to_string()))
    }
}

fn ensure_pending(driver: &Driver) -> Result<(), AppError> {
    if driver.status == DriverStatus::Pending {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!(
            "driver {} has already been reviewed",
            driver.id
        )))
    }
}

pub fn list_drivers(
    state: &AppState,
    requester: Identity,
    status: Option<DriverStatus>,
) -> Result<Vec<Driver>, AppError> {
    require_admin(requester)?;
    Ok(state.identities.drivers(status))
}

#[instrument(skip_all, fields(op = "approve", %driver_id))]
pub fn approve_driver(
    state: &AppState,
    requester: Identity,
    driver_id: Uuid,
) -> Result<Driver, AppError> {
    require_admin(requester)?;

    let driver = state.identities.update_driver(driver_id, |driver| {
        ensure_pending(driver)?;
        driver.status = DriverStatus::Accepted;
        driver.rejection_reason = None;
        Ok(())
    })?;

    dispatch(
        state,
        driver.id,
        NotificationType::DriverApproved,
        "Registration approved",
        "Your driver account has been approved. You can now apply for loads.",
        None,
    );

    info!("driver approved");
    Ok(driver)
}

#[instrument(skip_all, fields(op = "reject", %driver_id))]
pub fn reject_driver(
    state: &AppState,
    requester: Identity,
    driver_id: Uuid,
    rejection: Rejection,
) -> Result<Driver, AppError> {
    require_admin(requester)?;

    let reason = rejection.reason.trim().to_string();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "a rejection reason is required".to_string(),
        ));
    }

    let driver = state.identities.update_driver(driver_id, |driver| {
        ensure_pending(driver)?;
        driver.status = DriverStatus::Rejected;
        driver.rejection_reason = Some(reason.clone());
        Ok(())
    })?;

    dispatch(
        state,
        driver.id,
        NotificationType::DriverRejected,
        "Registration rejected",
        format!("Your driver account was rejected: {reason}"),
        None,
    );

    info!(%reason, "driver rejected");
    Ok(driver)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::engine::test_support::{customer, pending_driver, test_state};

    #[test]
    fn approval_is_admin_only_and_one_shot() {
        let (state, mut rx) = test_state();
        let admin = Identity::admin(Uuid::new_v4());
        let someone = customer(&state, "c@example.com");
        let driver = pending_driver(&state, "d@example.com");

        assert!(matches!(
            approve_driver(&state, someone, driver.id),
            Err(AppError::Forbidden(_))
        ));

        let approved = approve_driver(&state, admin, driver.id).unwrap();
        assert_eq!(approved.status, DriverStatus::Accepted);
        assert_eq!(rx.try_recv().unwrap().kind, NotificationType::DriverApproved);

        assert!(matches!(
            reject_driver(
                &state,
                admin,
                driver.id,
                Rejection {
                    reason: "late".into()
                }
            ),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn rejection_requires_reason() {
        let (state, _rx) = test_state();
        let admin = Identity::admin(Uuid::new_v4());
        let driver = pending_driver(&state, "d@example.com");

        assert!(matches!(
            reject_driver(&state, admin, driver.id, Rejection::default()),
            Err(AppError::Validation(_))
        ));

        let rejected = reject_driver(
            &state,
            admin,
            driver.id,
            Rejection {
                reason: " expired insurance ".into(),
            },
        )
        .unwrap();
        assert_eq!(rejected.status, DriverStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("expired insurance"));
    }

    #[test]
    fn listing_filters_by_status() {
        let (state, _rx) = test_state();
        let admin = Identity::admin(Uuid::new_v4());
        let first = pending_driver(&state, "a@example.com");
        pending_driver(&state, "b@example.com");
        approve_driver(&state, admin, first.id).unwrap();

        let pending = list_drivers(&state, admin, Some(DriverStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(list_drivers(&state, admin, None).unwrap().len(), 2);
        assert!(approve_driver(&state, admin, Uuid::new_v4()).is_err());
    }
}
