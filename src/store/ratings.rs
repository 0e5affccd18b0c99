use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::identity::Role;
use crate::models::rating::{Rating, RatingEntry, Review};

/// One rating document per load id.
pub struct RatingStore {
    ratings: DashMap<Uuid, Rating>,
}

impl RatingStore {
    pub fn new() -> Self {
        Self {
            ratings: DashMap::new(),
        }
    }

    /// Create the load's document on first use, then overwrite the slot that
    /// belongs to `rater`. Re-rating never adds a second document.
    pub fn upsert(
        &self,
        load_id: Uuid,
        customer_id: Uuid,
        driver_id: Uuid,
        rater: Role,
        entry: RatingEntry,
    ) -> Rating {
        let now = Utc::now();
        let mut doc = self.ratings.entry(load_id).or_insert_with(|| Rating {
            load_id,
            customer_id,
            driver_id,
            customer_rating: None,
            driver_rating: None,
            created_at: now,
            updated_at: now,
        });

        match rater {
            Role::Customer => doc.customer_rating = Some(entry),
            Role::Driver => doc.driver_rating = Some(entry),
            Role::Admin => {}
        }
        doc.updated_at = now;
        doc.value().clone()
    }

    pub fn get(&self, load_id: Uuid) -> Option<Rating> {
        self.ratings.get(&load_id).map(|entry| entry.value().clone())
    }

    /// Scores customers have given this driver, newest first.
    pub fn reviews_of_driver(&self, driver_id: Uuid) -> Vec<Review> {
        self.collect_reviews(|rating| {
            (rating.driver_id == driver_id)
                .then_some(rating.customer_rating.as_ref())
                .flatten()
        })
    }

    /// Scores drivers have given this customer, newest first.
    pub fn reviews_of_customer(&self, customer_id: Uuid) -> Vec<Review> {
        self.collect_reviews(|rating| {
            (rating.customer_id == customer_id)
                .then_some(rating.driver_rating.as_ref())
                .flatten()
        })
    }

    fn collect_reviews<F>(&self, pick: F) -> Vec<Review>
    where
        F: Fn(&Rating) -> Option<&RatingEntry>,
    {
        let mut reviews: Vec<Review> = self
            .ratings
            .iter()
            .filter_map(|doc| {
                pick(doc.value()).map(|entry| Review {
                    load_id: doc.value().load_id,
                    rating: entry.rating,
                    review: entry.review.clone(),
                    rated_at: entry.rated_at,
                })
            })
            .collect();
        reviews.sort_by(|a, b| b.rated_at.cmp(&a.rated_at));
        reviews
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

impl Default for RatingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::RatingStore;
    use crate::models::identity::Role;
    use crate::models::rating::RatingEntry;

    fn entry(rating: u8) -> RatingEntry {
        RatingEntry {
            rating,
            review: None,
            rated_at: Utc::now(),
        }
    }

    #[test]
    fn re_rating_overwrites_in_place() {
        let store = RatingStore::new();
        let (load, customer, driver) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.upsert(load, customer, driver, Role::Customer, entry(2));
        store.upsert(load, customer, driver, Role::Driver, entry(4));
        let doc = store.upsert(load, customer, driver, Role::Customer, entry(5));

        assert_eq!(store.len(), 1);
        assert_eq!(doc.customer_rating.unwrap().rating, 5);
        assert_eq!(doc.driver_rating.unwrap().rating, 4);
    }

    #[test]
    fn reviews_are_split_by_target() {
        let store = RatingStore::new();
        let (customer, driver) = (Uuid::new_v4(), Uuid::new_v4());

        store.upsert(Uuid::new_v4(), customer, driver, Role::Customer, entry(3));
        store.upsert(Uuid::new_v4(), customer, driver, Role::Driver, entry(1));

        let of_driver = store.reviews_of_driver(driver);
        let of_customer = store.reviews_of_customer(customer);
        assert_eq!(of_driver.len(), 1);
        assert_eq!(of_driver[0].rating, 3);
        assert_eq!(of_customer.len(), 1);
        assert_eq!(of_customer[0].rating, 1);
    }
}
