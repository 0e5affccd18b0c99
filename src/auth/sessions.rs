use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::auth::CredentialVerifier;
use crate::auth::token::{generate_token, hash_token};
use crate::error::AppError;
use crate::models::identity::Identity;

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// Bearer sessions keyed by the SHA-256 of the raw token.
pub struct SessionStore {
    sessions: DashMap<[u8; 32], Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn issue(&self, identity: Identity) -> String {
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            Session {
                identity,
                expires_at: Utc::now() + self.ttl,
            },
        );
        token
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    /// Drop expired sessions; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }
}

impl CredentialVerifier for SessionStore {
    fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let key = hash_token(token);
        let session = self
            .sessions
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::Unauthorized("invalid or revoked token".to_string()))?;

        if session.expires_at <= Utc::now() {
            self.sessions.remove(&key);
            return Err(AppError::Unauthorized("session expired".to_string()));
        }

        Ok(session.identity)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::SessionStore;
    use crate::auth::CredentialVerifier;
    use crate::models::identity::{Identity, Role};

    #[test]
    fn issued_token_verifies_until_revoked() {
        let store = SessionStore::new(Duration::hours(1));
        let identity = Identity::driver(Uuid::new_v4());
        let token = store.issue(identity);

        let verified = store.verify(&token).unwrap();
        assert_eq!(verified.id, identity.id);
        assert_eq!(verified.role, Role::Driver);

        assert!(store.revoke(&token));
        assert!(store.verify(&token).is_err());
    }

    #[test]
    fn expired_sessions_are_rejected_and_purged() {
        let store = SessionStore::new(Duration::seconds(-1));
        let token = store.issue(Identity::customer(Uuid::new_v4()));

        assert!(store.verify(&token).is_err());
        store.issue(Identity::customer(Uuid::new_v4()));
        assert_eq!(store.purge_expired(), 1);
    }
}
