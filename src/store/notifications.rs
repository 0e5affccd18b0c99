use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::Notification;

pub struct NotificationStore {
    notifications: DashMap<Uuid, Notification>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            notifications: DashMap::new(),
        }
    }

    pub fn insert(&self, notification: Notification) {
        self.notifications.insert(notification.id, notification);
    }

    pub fn list_for(&self, user_id: Uuid) -> Vec<Notification> {
        let mut list: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    pub fn unread_count(&self, user_id: Uuid) -> usize {
        self.notifications
            .iter()
            .filter(|entry| entry.value().user_id == user_id && !entry.value().read)
            .count()
    }

    /// Mark one notification read. Other users' notifications read as missing.
    pub fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification, AppError> {
        let mut entry = self
            .notifications
            .get_mut(&id)
            .filter(|entry| entry.value().user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("notification {id} not found")))?;
        entry.read = true;
        Ok(entry.value().clone())
    }

    pub fn mark_all_read(&self, user_id: Uuid) -> usize {
        let mut updated = 0;
        for mut entry in self.notifications.iter_mut() {
            if entry.user_id == user_id && !entry.read {
                entry.read = true;
                updated += 1;
            }
        }
        updated
    }

    pub fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.notifications
            .remove_if(&id, |_, n| n.user_id == user_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("notification {id} not found")))
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::NotificationStore;
    use crate::models::notification::{Notification, NotificationType};

    #[test]
    fn owner_only_mutations() {
        let store = NotificationStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let n = Notification::new(owner, NotificationType::LoadAssigned, "t", "m", None);
        let id = n.id;
        store.insert(n);

        assert!(store.mark_read(stranger, id).is_err());
        assert!(store.delete(stranger, id).is_err());
        assert_eq!(store.unread_count(owner), 1);

        assert!(store.mark_read(owner, id).unwrap().read);
        assert_eq!(store.unread_count(owner), 0);
        store.delete(owner, id).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn mark_all_read_only_touches_owner() {
        let store = NotificationStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        for _ in 0..3 {
            store.insert(Notification::new(owner, NotificationType::NewRating, "t", "m", None));
        }
        store.insert(Notification::new(other, NotificationType::NewRating, "t", "m", None));

        assert_eq!(store.mark_all_read(owner), 3);
        assert_eq!(store.unread_count(owner), 0);
        assert_eq!(store.unread_count(other), 1);
        assert_eq!(store.list_for(owner).len(), 3);
    }
}
