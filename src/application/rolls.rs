//! # Pending Roll Store
//!
//! Holds rolls the model has requested from named players (ROLL_CALL)
//! until they execute them with `/roll`. In-process only; entries have no
//! expiry and live until consumed or replaced.

use crate::domain::types::PendingRoll;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct PendingRollStore {
    inner: Mutex<HashMap<String, PendingRoll>>,
}

impl PendingRollStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the pending roll for a username.
    pub fn upsert(&self, username: &str, notation: &str, reason: &str) {
        let mut map = self.inner.lock().unwrap();
        map.insert(
            username.to_string(),
            PendingRoll {
                notation: notation.to_string(),
                reason: reason.to_string(),
                timestamp: Utc::now(),
            },
        );
    }

    pub fn get(&self, username: &str) -> Option<PendingRoll> {
        self.inner.lock().unwrap().get(username).cloned()
    }

    /// Remove and return the pending roll for a username.
    pub fn take(&self, username: &str) -> Option<PendingRoll> {
        self.inner.lock().unwrap().remove(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_take() {
        let store = PendingRollStore::new();
        store.upsert("alice", "2d6+3", "Defy Danger");

        let pending = store.get("alice").expect("pending roll stored");
        assert_eq!(pending.notation, "2d6+3");
        assert_eq!(pending.reason, "Defy Danger");

        let taken = store.take("alice").expect("pending roll taken");
        assert_eq!(taken.notation, "2d6+3");
        assert!(store.get("alice").is_none());
    }

    #[test]
    fn test_upsert_replaces() {
        let store = PendingRollStore::new();
        store.upsert("bob", "1d20", "attack");
        store.upsert("bob", "2d8", "damage");
        assert_eq!(store.get("bob").unwrap().notation, "2d8");
    }

    #[test]
    fn test_take_missing() {
        let store = PendingRollStore::new();
        assert!(store.take("nobody").is_none());
    }
}
