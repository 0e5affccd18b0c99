use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::customer::{Admin, Customer};
use crate::models::driver::{Driver, DriverStatus};
use crate::models::identity::{Identity, Role};

/// Customers, drivers and admins, with a case-insensitive email index shared
/// across all three.
pub struct IdentityStore {
    customers: DashMap<Uuid, Customer>,
    drivers: DashMap<Uuid, Driver>,
    admins: DashMap<Uuid, Admin>,
    emails: DashMap<String, Identity>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl IdentityStore {
    pub fn new() -> Self {
        Self {
            customers: DashMap::new(),
            drivers: DashMap::new(),
            admins: DashMap::new(),
            emails: DashMap::new(),
        }
    }

    fn claim_email(&self, email: &str, identity: Identity) -> Result<(), AppError> {
        match self.emails.entry(normalize_email(email)) {
            Entry::Vacant(slot) => {
                slot.insert(identity);
                Ok(())
            }
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "email {email} is already registered"
            ))),
        }
    }

    pub fn insert_customer(&self, customer: Customer) -> Result<Customer, AppError> {
        self.claim_email(&customer.email, Identity::customer(customer.id))?;
        self.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    pub fn insert_driver(&self, driver: Driver) -> Result<Driver, AppError> {
        self.claim_email(&driver.email, Identity::driver(driver.id))?;
        self.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    pub fn insert_admin(&self, admin: Admin) -> Result<Admin, AppError> {
        self.claim_email(&admin.email, Identity::admin(admin.id))?;
        self.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    pub fn lookup_email(&self, email: &str) -> Option<Identity> {
        self.emails
            .get(&normalize_email(email))
            .map(|entry| *entry.value())
    }

    pub fn password_hash(&self, identity: Identity) -> Option<String> {
        match identity.role {
            Role::Customer => self
                .customers
                .get(&identity.id)
                .map(|c| c.password_hash.clone()),
            Role::Driver => self
                .drivers
                .get(&identity.id)
                .map(|d| d.password_hash.clone()),
            Role::Admin => self.admins.get(&identity.id).map(|a| a.password_hash.clone()),
        }
    }

    /// Contact address for outbound mail, whatever the user's role.
    pub fn email_of(&self, user_id: Uuid) -> Option<String> {
        if let Some(customer) = self.customers.get(&user_id) {
            return Some(customer.email.clone());
        }
        if let Some(driver) = self.drivers.get(&user_id) {
            return Some(driver.email.clone());
        }
        self.admins.get(&user_id).map(|a| a.email.clone())
    }

    pub fn customer(&self, id: Uuid) -> Option<Customer> {
        self.customers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn driver(&self, id: Uuid) -> Option<Driver> {
        self.drivers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn admin(&self, id: Uuid) -> Option<Admin> {
        self.admins.get(&id).map(|entry| entry.value().clone())
    }

    /// Drivers, optionally filtered by approval status, oldest registration first.
    pub fn drivers(&self, status: Option<DriverStatus>) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .filter(|entry| status.is_none_or(|wanted| entry.value().status == wanted))
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        drivers
    }

    /// Draft-and-commit update of a driver record under its entry lock.
    pub fn update_driver<F>(&self, id: Uuid, mutate: F) -> Result<Driver, AppError>
    where
        F: FnOnce(&mut Driver) -> Result<(), AppError>,
    {
        let mut entry = self
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

        let mut draft = entry.value().clone();
        mutate(&mut draft)?;
        draft.updated_at = Utc::now();
        *entry.value_mut() = draft.clone();
        Ok(draft)
    }

    pub fn update_customer<F>(&self, id: Uuid, mutate: F) -> Result<Customer, AppError>
    where
        F: FnOnce(&mut Customer) -> Result<(), AppError>,
    {
        let mut entry = self
            .customers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("customer {id} not found")))?;

        let mut draft = entry.value().clone();
        mutate(&mut draft)?;
        *entry.value_mut() = draft.clone();
        Ok(draft)
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}
