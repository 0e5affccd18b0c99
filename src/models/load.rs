use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::DriverDocuments;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Pending => "pending",
            LoadStatus::Assigned => "assigned",
            LoadStatus::Completed => "completed",
            LoadStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadStatus::Completed | LoadStatus::Cancelled)
    }
}

/// A driver's public profile frozen at the moment they applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantSnapshot {
    pub driver_id: Uuid,
    pub name: String,
    pub mobile: String,
    pub lorry_type: String,
    pub max_capacity: f64,
    pub applied_at: DateTime<Utc>,
    pub average_rating: f64,
    pub total_ratings: u32,
    pub documents: DriverDocuments,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignedDriver {
    #[serde(flatten)]
    pub snapshot: ApplicantSnapshot,
    pub assigned_at: DateTime<Utc>,
}

impl AssignedDriver {
    pub fn driver_id(&self) -> Uuid {
        self.snapshot.driver_id
    }
}

/// Customer contact details captured when the load is posted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Load {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub posted_by: CustomerSnapshot,
    pub source: String,
    pub destination: String,
    pub load_type: String,
    pub quantity: f64,
    pub estimated_fare: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_date: Option<NaiveDate>,
    pub status: LoadStatus,
    pub applicants: Vec<ApplicantSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_driver: Option<AssignedDriver>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub customer_rated: bool,
    pub driver_rated: bool,
}

impl Load {
    pub fn has_applicant(&self, driver_id: Uuid) -> bool {
        self.applicants.iter().any(|a| a.driver_id == driver_id)
    }

    pub fn applicant(&self, driver_id: Uuid) -> Option<&ApplicantSnapshot> {
        self.applicants.iter().find(|a| a.driver_id == driver_id)
    }

    pub fn assigned_driver_id(&self) -> Option<Uuid> {
        self.assigned_driver.as_ref().map(AssignedDriver::driver_id)
    }

    pub fn is_assigned_to(&self, driver_id: Uuid) -> bool {
        self.assigned_driver_id() == Some(driver_id)
    }

    /// Open to driver applications: pending with nobody assigned.
    pub fn is_available(&self) -> bool {
        self.status == LoadStatus::Pending && self.assigned_driver.is_none()
    }

    /// `(status, assigned driver presence)` pairs a stored load may take.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            LoadStatus::Pending => self.assigned_driver.is_none(),
            LoadStatus::Assigned | LoadStatus::Completed => self.assigned_driver.is_some(),
            LoadStatus::Cancelled => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::{CustomerSnapshot, Load, LoadStatus};

    fn pending_load() -> Load {
        Load {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            posted_by: CustomerSnapshot {
                name: "Shipper".into(),
                phone: "9000000000".into(),
            },
            source: "Hyderabad".into(),
            destination: "Bangalore".into(),
            load_type: "steel".into(),
            quantity: 10.0,
            estimated_fare: 50_000.0,
            description: None,
            estimated_delivery_date: None,
            status: LoadStatus::Pending,
            applicants: Vec::new(),
            assigned_driver: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
            customer_rated: false,
            driver_rated: false,
        }
    }

    #[test]
    fn unassigned_load_omits_assigned_driver_field() {
        let value = serde_json::to_value(pending_load()).unwrap();
        assert!(value.get("assignedDriver").is_none());
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["estimatedFare"], json!(50_000.0));
    }

    #[test]
    fn assigned_without_driver_is_inconsistent() {
        let mut load = pending_load();
        assert!(load.is_consistent());
        assert!(load.is_available());

        load.status = LoadStatus::Assigned;
        assert!(!load.is_consistent());
        assert!(!load.is_available());
    }
}
