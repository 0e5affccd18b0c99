use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::load::{Load, LoadStatus};

/// Load repository plus the driver-slot index.
///
/// Each driver id maps to the single load it is assigned to. Claiming a slot
/// is an atomic insert-if-absent, so two loads can never be assigned to the
/// same driver. Lock order is always load entry first, then driver slot.
pub struct LoadStore {
    loads: DashMap<Uuid, Load>,
    driver_slots: DashMap<Uuid, Uuid>,
}

/// View of the driver-slot index handed to load mutations while the load
/// entry is locked.
pub struct DriverSlots<'a> {
    slots: &'a DashMap<Uuid, Uuid>,
}

impl DriverSlots<'_> {
    pub fn holder(&self, driver_id: Uuid) -> Option<Uuid> {
        self.slots.get(&driver_id).map(|entry| *entry.value())
    }

    pub fn claim(&self, driver_id: Uuid, load_id: Uuid) -> Result<(), AppError> {
        match self.slots.entry(driver_id) {
            Entry::Vacant(slot) => {
                slot.insert(load_id);
                Ok(())
            }
            Entry::Occupied(slot) if *slot.get() == load_id => Ok(()),
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "driver {driver_id} already has an assigned load"
            ))),
        }
    }

    pub fn release(&self, driver_id: Uuid, load_id: Uuid) {
        self.slots.remove_if(&driver_id, |_, held| *held == load_id);
    }
}

impl LoadStore {
    pub fn new() -> Self {
        Self {
            loads: DashMap::new(),
            driver_slots: DashMap::new(),
        }
    }

    pub fn insert(&self, load: Load) -> Result<Load, AppError> {
        if !load.is_consistent() {
            return Err(AppError::Internal(format!(
                "refusing to store load {} in inconsistent state",
                load.id
            )));
        }
        match self.loads.entry(load.id) {
            Entry::Vacant(slot) => {
                slot.insert(load.clone());
                Ok(load)
            }
            Entry::Occupied(_) => Err(AppError::Internal(format!(
                "load id {} already in use",
                load.id
            ))),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Load> {
        self.loads.get(&id).map(|entry| entry.value().clone())
    }

    /// Atomic read-modify-write of one load.
    ///
    /// `mutate` runs on a draft while the load entry is locked; the draft is
    /// committed only if it returns `Ok`, so a failed precondition leaves the
    /// stored load untouched.
    pub fn modify<T, F>(&self, id: Uuid, mutate: F) -> Result<(Load, T), AppError>
    where
        F: FnOnce(&mut Load, &DriverSlots<'_>) -> Result<T, AppError>,
    {
        let mut entry = self
            .loads
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("load {id} not found")))?;

        let slots = DriverSlots {
            slots: &self.driver_slots,
        };
        let mut draft = entry.value().clone();
        let out = mutate(&mut draft, &slots)?;

        if !draft.is_consistent() {
            return Err(AppError::Internal(format!(
                "mutation left load {id} {} with assigned driver {:?}",
                draft.status.as_str(),
                draft.assigned_driver_id()
            )));
        }

        draft.updated_at = Utc::now();
        *entry.value_mut() = draft.clone();
        Ok((draft, out))
    }

    /// Loads matching `filter`, newest first.
    pub fn query<F>(&self, filter: F) -> Vec<Load>
    where
        F: Fn(&Load) -> bool,
    {
        let mut matched: Vec<Load> = self
            .loads
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }

    pub fn assigned_load_of(&self, driver_id: Uuid) -> Option<Uuid> {
        self.driver_slots.get(&driver_id).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    pub fn count_with_status(&self, status: LoadStatus) -> usize {
        self.loads
            .iter()
            .filter(|entry| entry.value().status == status)
            .count()
    }
}

impl Default for LoadStore {
    fn default() -> Self {
        Self::new()
    }
}
