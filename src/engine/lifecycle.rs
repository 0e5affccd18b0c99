//! Load state machine: `pending -> assigned -> completed`, or
//! `pending -> cancelled`. Every transition is a single guarded
//! read-modify-write through [`LoadStore::modify`].
//!
//! [`LoadStore::modify`]: crate::store::loads::LoadStore::modify

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::engine::notify::dispatch;
use crate::engine::snapshot::{applicant_snapshot, customer_snapshot, with_live_reputation};
use crate::error::AppError;
use crate::models::driver::DriverStatus;
use crate::models::identity::{Identity, Role};
use crate::models::load::{ApplicantSnapshot, AssignedDriver, Load, LoadStatus};
use crate::models::notification::NotificationType;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLoad {
    pub source: String,
    pub destination: String,
    pub load_type: String,
    pub quantity: Option<f64>,
    pub estimated_fare: Option<f64>,
    pub description: Option<String>,
    pub estimated_delivery_date: Option<NaiveDate>,
}

/// Partial edit of a pending load; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadChanges {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub load_type: Option<String>,
    pub quantity: Option<f64>,
    pub estimated_fare: Option<f64>,
    pub description: Option<String>,
    pub estimated_delivery_date: Option<NaiveDate>,
}

impl LoadChanges {
    fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("source", &self.source),
            ("destination", &self.destination),
            ("loadType", &self.load_type),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(AppError::Validation(format!("{field} cannot be empty")));
            }
        }
        for (field, value) in [
            ("quantity", self.quantity),
            ("estimatedFare", self.estimated_fare),
        ] {
            if let Some(number) = value {
                ensure_positive(field, number)?;
            }
        }
        Ok(())
    }

    fn apply_to(self, load: &mut Load) {
        if let Some(source) = self.source {
            load.source = source.trim().to_string();
        }
        if let Some(destination) = self.destination {
            load.destination = destination.trim().to_string();
        }
        if let Some(load_type) = self.load_type {
            load.load_type = load_type.trim().to_string();
        }
        if let Some(quantity) = self.quantity {
            load.quantity = quantity;
        }
        if let Some(fare) = self.estimated_fare {
            load.estimated_fare = fare;
        }
        if let Some(description) = self.description {
            load.description = non_blank(description);
        }
        if let Some(date) = self.estimated_delivery_date {
            load.estimated_delivery_date = Some(date);
        }
    }
}

fn ensure_positive(field: &str, value: f64) -> Result<(), AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{field} must be > 0")))
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn ensure_status(load: &Load, expected: LoadStatus) -> Result<(), AppError> {
    if load.status == expected {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!(
            "load {} is {}, expected {}",
            load.id,
            load.status.as_str(),
            expected.as_str()
        )))
    }
}

fn ensure_owner(load: &Load, requester: Identity) -> Result<(), AppError> {
    if requester.role == Role::Customer && load.customer_id == requester.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "load {} belongs to another customer",
            load.id
        )))
    }
}

fn require_role(requester: Identity, role: Role) -> Result<(), AppError> {
    if requester.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("{} role required", role.as_str())))
    }
}

fn observe<T>(state: &AppState, transition: &str, result: Result<T, AppError>) -> Result<T, AppError> {
    match &result {
        Ok(_) => state.metrics.record_transition(transition, "ok"),
        Err(err @ AppError::Conflict(_)) => {
            state.metrics.record_transition(transition, err.kind());
            warn!(transition, error = %err, "transition refused: driver already engaged");
        }
        Err(err) => {
            state.metrics.record_transition(transition, err.kind());
            debug!(transition, error = %err, "transition rejected");
        }
    }
    result
}

fn route(load: &Load) -> String {
    format!("{} to {}", load.source, load.destination)
}

#[instrument(skip_all, fields(op = "create", customer_id = %requester.id))]
pub fn create_load(state: &AppState, requester: Identity, input: NewLoad) -> Result<Load, AppError> {
    observe(state, "create", try_create(state, requester, input))
}

fn try_create(state: &AppState, requester: Identity, input: NewLoad) -> Result<Load, AppError> {
    require_role(requester, Role::Customer)?;

    let missing: Vec<&str> = [
        ("source", input.source.trim().is_empty()),
        ("destination", input.destination.trim().is_empty()),
        ("loadType", input.load_type.trim().is_empty()),
        ("quantity", input.quantity.is_none()),
        ("estimatedFare", input.estimated_fare.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let quantity = input.quantity.unwrap_or_default();
    let estimated_fare = input.estimated_fare.unwrap_or_default();
    ensure_positive("quantity", quantity)?;
    ensure_positive("estimatedFare", estimated_fare)?;

    let customer = state
        .identities
        .customer(requester.id)
        .ok_or_else(|| AppError::Forbidden("customer profile not found".to_string()))?;

    let now = Utc::now();
    let load = Load {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        posted_by: customer_snapshot(&customer),
        source: input.source.trim().to_string(),
        destination: input.destination.trim().to_string(),
        load_type: input.load_type.trim().to_string(),
        quantity,
        estimated_fare,
        description: input.description.and_then(non_blank),
        estimated_delivery_date: input.estimated_delivery_date,
        status: LoadStatus::Pending,
        applicants: Vec::new(),
        assigned_driver: None,
        created_at: now,
        updated_at: now,
        completed_at: None,
        customer_rated: false,
        driver_rated: false,
    };

    let load = state.loads.insert(load)?;
    info!(load_id = %load.id, route = %route(&load), "load posted");
    Ok(load)
}

#[instrument(skip_all, fields(op = "apply", %load_id, driver_id = %requester.id))]
pub fn apply(state: &AppState, requester: Identity, load_id: Uuid) -> Result<Load, AppError> {
    observe(state, "apply", try_apply(state, requester, load_id))
}

fn try_apply(state: &AppState, requester: Identity, load_id: Uuid) -> Result<Load, AppError> {
    require_role(requester, Role::Driver)?;

    let driver = state
        .identities
        .driver(requester.id)
        .ok_or_else(|| AppError::Forbidden("driver profile not found".to_string()))?;
    if driver.status != DriverStatus::Accepted {
        return Err(AppError::Forbidden(
            "driver account has not been approved".to_string(),
        ));
    }

    let (load, ()) = state.loads.modify(load_id, |load, slots| {
        ensure_status(load, LoadStatus::Pending)?;

        if let Some(active) = slots.holder(driver.id) {
            return Err(AppError::Conflict(format!(
                "driver already has an assigned load ({active})"
            )));
        }
        if load.has_applicant(driver.id) {
            return Err(AppError::DuplicateApplication(format!(
                "driver has already applied to load {}",
                load.id
            )));
        }

        load.applicants.push(applicant_snapshot(&driver, Utc::now()));
        Ok(())
    })?;

    dispatch(
        state,
        load.customer_id,
        NotificationType::LoadApplication,
        "New application received",
        format!("{} applied for your load {}", driver.name, route(&load)),
        Some(load.id),
    );

    info!(
        applicants = load.applicants.len(),
        "driver applied to load"
    );
    Ok(load)
}

#[instrument(skip_all, fields(op = "assign", %load_id, %driver_id))]
pub fn assign(
    state: &AppState,
    requester: Identity,
    load_id: Uuid,
    driver_id: Uuid,
) -> Result<Load, AppError> {
    observe(state, "assign", try_assign(state, requester, load_id, driver_id))
}

fn try_assign(
    state: &AppState,
    requester: Identity,
    load_id: Uuid,
    driver_id: Uuid,
) -> Result<Load, AppError> {
    require_role(requester, Role::Customer)?;

    let (load, ()) = state.loads.modify(load_id, |load, slots| {
        ensure_owner(load, requester)?;
        ensure_status(load, LoadStatus::Pending)?;

        let applicant = load.applicant(driver_id).cloned().ok_or_else(|| {
            AppError::NotFound(format!("driver {driver_id} has not applied to load {}", load.id))
        })?;

        // Claimed while this load is still locked, so no other load can take
        // the same driver in between.
        slots.claim(driver_id, load.id)?;

        load.assigned_driver = Some(AssignedDriver {
            snapshot: applicant,
            assigned_at: Utc::now(),
        });
        load.status = LoadStatus::Assigned;
        Ok(())
    })?;

    state.metrics.active_loads.inc();

    dispatch(
        state,
        driver_id,
        NotificationType::LoadAssigned,
        "Load assigned to you",
        format!("You have been assigned the load {}", route(&load)),
        Some(load.id),
    );

    info!("driver assigned to load");
    Ok(load)
}

#[instrument(skip_all, fields(op = "complete", %load_id))]
pub fn complete(state: &AppState, requester: Identity, load_id: Uuid) -> Result<Load, AppError> {
    observe(state, "complete", try_complete(state, requester, load_id))
}

fn try_complete(state: &AppState, requester: Identity, load_id: Uuid) -> Result<Load, AppError> {
    let (load, driver_id) = state.loads.modify(load_id, |load, slots| {
        ensure_owner(load, requester)?;
        ensure_status(load, LoadStatus::Assigned)?;

        let driver_id = load.assigned_driver_id().ok_or_else(|| {
            AppError::Internal(format!("assigned load {} has no driver", load.id))
        })?;

        load.status = LoadStatus::Completed;
        load.completed_at = Some(Utc::now());
        slots.release(driver_id, load.id);
        Ok(driver_id)
    })?;

    state.metrics.active_loads.dec();

    let message = format!("Load {} has been completed. Rate your experience.", route(&load));
    dispatch(
        state,
        driver_id,
        NotificationType::LoadCompleted,
        "Load completed",
        message.clone(),
        Some(load.id),
    );
    dispatch(
        state,
        load.customer_id,
        NotificationType::LoadCompleted,
        "Load completed",
        message,
        Some(load.id),
    );

    info!(%driver_id, "load completed");
    Ok(load)
}

/// Cancel a pending load. Assigned loads cannot be cancelled.
#[instrument(skip_all, fields(op = "cancel", %load_id))]
pub fn cancel(state: &AppState, requester: Identity, load_id: Uuid) -> Result<Load, AppError> {
    observe(state, "cancel", try_cancel(state, requester, load_id))
}

fn try_cancel(state: &AppState, requester: Identity, load_id: Uuid) -> Result<Load, AppError> {
    let (load, ()) = state.loads.modify(load_id, |load, _| {
        ensure_owner(load, requester)?;
        ensure_status(load, LoadStatus::Pending)?;
        load.status = LoadStatus::Cancelled;
        Ok(())
    })?;

    info!("load cancelled");
    Ok(load)
}

#[instrument(skip_all, fields(op = "edit", %load_id))]
pub fn edit(
    state: &AppState,
    requester: Identity,
    load_id: Uuid,
    changes: LoadChanges,
) -> Result<Load, AppError> {
    observe(state, "edit", try_edit(state, requester, load_id, changes))
}

fn try_edit(
    state: &AppState,
    requester: Identity,
    load_id: Uuid,
    changes: LoadChanges,
) -> Result<Load, AppError> {
    changes.validate()?;

    let (load, ()) = state.loads.modify(load_id, |load, _| {
        ensure_owner(load, requester)?;
        ensure_status(load, LoadStatus::Pending)?;
        changes.apply_to(load);
        Ok(())
    })?;

    info!("load edited");
    Ok(load)
}

/// Pending loads nobody has been assigned to, newest first.
pub fn available_loads(state: &AppState, requester: Identity) -> Result<Vec<Load>, AppError> {
    require_role(requester, Role::Driver)?;
    Ok(state.loads.query(Load::is_available))
}

pub fn customer_loads(state: &AppState, requester: Identity) -> Result<Vec<Load>, AppError> {
    require_role(requester, Role::Customer)?;
    Ok(state.loads.query(|load| load.customer_id == requester.id))
}

/// Loads the driver applied to or is assigned to, newest first.
pub fn driver_loads(state: &AppState, requester: Identity) -> Result<Vec<Load>, AppError> {
    require_role(requester, Role::Driver)?;
    Ok(state
        .loads
        .query(|load| load.is_assigned_to(requester.id) || load.has_applicant(requester.id)))
}

pub fn get_load(state: &AppState, requester: Identity, load_id: Uuid) -> Result<Load, AppError> {
    let load = state
        .loads
        .get(load_id)
        .ok_or_else(|| AppError::NotFound(format!("load {load_id} not found")))?;

    let visible = match requester.role {
        Role::Admin => true,
        Role::Customer => load.customer_id == requester.id,
        Role::Driver => {
            load.is_available()
                || load.has_applicant(requester.id)
                || load.is_assigned_to(requester.id)
        }
    };

    if visible {
        Ok(load)
    } else {
        Err(AppError::Forbidden(format!("load {load_id} is not visible")))
    }
}

/// Applicants of the caller's own load with reputation refreshed from the
/// live driver records.
pub fn applicants_with_live_details(
    state: &AppState,
    requester: Identity,
    load_id: Uuid,
) -> Result<Vec<ApplicantSnapshot>, AppError> {
    let load = state
        .loads
        .get(load_id)
        .ok_or_else(|| AppError::NotFound(format!("load {load_id} not found")))?;
    ensure_owner(&load, requester)?;

    Ok(load
        .applicants
        .iter()
        .map(|snapshot| {
            let live = state.identities.driver(snapshot.driver_id);
            with_live_reputation(snapshot, live.as_ref())
        })
        .collect())
}
