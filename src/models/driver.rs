use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Links to the driver's uploaded documents. Storage happens elsewhere; only
/// the resulting URLs are kept here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverDocuments {
    pub license: Option<String>,
    pub rc: Option<String>,
    pub fitness: Option<String>,
    pub insurance: Option<String>,
    pub medical: Option<String>,
    pub all_india_permit: Option<String>,
}

impl DriverDocuments {
    /// Names of mandatory documents that are missing or blank.
    pub fn missing_mandatory(&self) -> Vec<&'static str> {
        [
            ("license", &self.license),
            ("rc", &self.rc),
            ("fitness", &self.fitness),
            ("insurance", &self.insurance),
            ("medical", &self.medical),
        ]
        .into_iter()
        .filter(|(_, link)| link.as_deref().is_none_or(|url| url.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    /// Overlay the links present in `update`, keeping the rest.
    pub fn merge(&mut self, update: DriverDocuments) {
        let DriverDocuments {
            license,
            rc,
            fitness,
            insurance,
            medical,
            all_india_permit,
        } = update;

        for (slot, value) in [
            (&mut self.license, license),
            (&mut self.rc, rc),
            (&mut self.fitness, fitness),
            (&mut self.insurance, insurance),
            (&mut self.medical, medical),
            (&mut self.all_india_permit, all_india_permit),
        ] {
            if let Some(url) = value {
                *slot = Some(url);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub phone: String,
    pub address: String,
    pub lorry_type: String,
    pub max_capacity: f64,
    pub status: DriverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub documents: DriverDocuments,
    pub average_rating: f64,
    pub total_ratings: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::DriverDocuments;

    fn complete() -> DriverDocuments {
        DriverDocuments {
            license: Some("https://docs.example/license.pdf".into()),
            rc: Some("https://docs.example/rc.pdf".into()),
            fitness: Some("https://docs.example/fitness.pdf".into()),
            insurance: Some("https://docs.example/insurance.pdf".into()),
            medical: Some("https://docs.example/medical.pdf".into()),
            all_india_permit: None,
        }
    }

    #[test]
    fn permit_is_optional() {
        assert!(complete().missing_mandatory().is_empty());
    }

    #[test]
    fn blank_links_count_as_missing() {
        let mut docs = complete();
        docs.rc = Some("   ".into());
        docs.medical = None;
        assert_eq!(docs.missing_mandatory(), vec!["rc", "medical"]);
    }

    #[test]
    fn merge_only_overwrites_supplied_links() {
        let mut docs = complete();
        docs.merge(DriverDocuments {
            all_india_permit: Some("https://docs.example/permit.pdf".into()),
            ..DriverDocuments::default()
        });
        assert_eq!(docs.license, complete().license);
        assert!(docs.all_india_permit.is_some());
    }
}
