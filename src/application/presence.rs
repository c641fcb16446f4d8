//! # Presence (Away) State
//!
//! Tracks player absence. A user is away exactly when a record exists for
//! them. The full user→record map is persisted as one JSON file; every
//! mutation writes through before returning.

use crate::domain::types::{AwayMode, AwayRecord};
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub struct AwayManager {
    path: PathBuf,
    data: HashMap<String, AwayRecord>,
}

impl AwayManager {
    /// Load existing state from `path`, or start empty.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Failed to parse away status {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, data }
    }

    fn save(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.data) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.path, content) {
                    tracing::error!("Failed to save away status: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize away status: {}", e),
        }
    }

    /// Mark a user as away. Returns false when the mode is not one of the
    /// known absence modes; state is unchanged in that case.
    pub fn set_away(&mut self, user_id: &str, mode: &str, last_seen_message_id: i64) -> bool {
        let Some(mode) = AwayMode::parse(mode) else {
            tracing::warn!("Invalid away mode: {}", mode);
            return false;
        };

        self.data.insert(
            user_id.to_string(),
            AwayRecord {
                mode,
                last_seen_message_id,
                timestamp: Utc::now(),
            },
        );
        self.save();
        true
    }

    /// Mark a user as back. Returns their previous record (for summary
    /// generation) or None if they were not away.
    pub fn return_user(&mut self, user_id: &str) -> Option<AwayRecord> {
        let record = self.data.remove(user_id)?;
        self.save();
        Some(record)
    }

    pub fn is_away(&self, user_id: &str) -> bool {
        self.data.contains_key(user_id)
    }

    /// Snapshot of all currently away users.
    pub fn all_away(&self) -> HashMap<String, AwayRecord> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_away_lifecycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("away_status.json");
        let mut mgr = AwayManager::new(&path);

        assert!(mgr.set_away("u1", "auto-pilot", 42));
        assert!(mgr.is_away("u1"));

        let record = mgr.return_user("u1").expect("record returned");
        assert_eq!(record.mode, AwayMode::AutoPilot);
        assert_eq!(record.last_seen_message_id, 42);
        assert!(!mgr.is_away("u1"));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let dir = tempdir().unwrap();
        let mut mgr = AwayManager::new(dir.path().join("away.json"));

        assert!(!mgr.set_away("u1", "bogus-mode", 1));
        assert!(!mgr.is_away("u1"));
    }

    #[test]
    fn test_persists_across_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("away.json");

        {
            let mut mgr = AwayManager::new(&path);
            mgr.set_away("u2", "off-screen", 7);
        }

        let mgr = AwayManager::new(&path);
        assert!(mgr.is_away("u2"));
        assert_eq!(mgr.all_away()["u2"].mode, AwayMode::OffScreen);
    }

    #[test]
    fn test_return_when_not_away() {
        let dir = tempdir().unwrap();
        let mut mgr = AwayManager::new(dir.path().join("away.json"));
        assert!(mgr.return_user("ghost").is_none());
    }

    #[test]
    fn test_all_away_snapshot() {
        let dir = tempdir().unwrap();
        let mut mgr = AwayManager::new(dir.path().join("away.json"));
        mgr.set_away("a", "auto-pilot", 1);
        mgr.set_away("b", "narrative-exit", 2);

        let all = mgr.all_away();
        assert_eq!(all.len(), 2);
        assert_eq!(all["b"].mode, AwayMode::NarrativeExit);
    }
}
