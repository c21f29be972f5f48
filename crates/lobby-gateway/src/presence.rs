use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};

/// `true` once `threshold` or more has passed since `last_activity`.
pub fn is_stale(last_activity: DateTime<Utc>, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
    now - last_activity >= threshold
}

/// Tracks who is present: participant name -> last activity.
///
/// Names are case-sensitive. Nothing expires on read; stale entries stay
/// visible until the expiry sweep removes them.
#[derive(Default)]
pub struct PresenceTracker {
    last_seen: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as active now.
    pub fn touch(&self, name: &str) {
        self.touch_at(name, Utc::now());
    }

    pub fn touch_at(&self, name: &str, at: DateTime<Utc>) {
        self.write().insert(name.to_string(), at);
    }

    /// Returns whether the name was present.
    pub fn remove(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn last_activity(&self, name: &str) -> Option<DateTime<Utc>> {
        self.read().get(name).copied()
    }

    /// Names currently tracked, sorted.
    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Unknown names are never expired.
    pub fn is_expired(&self, name: &str, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
        self.last_activity(name)
            .is_some_and(|last| is_stale(last, now, threshold))
    }

    /// Remove every stale entry and return the removed names, sorted.
    ///
    /// Check and removal happen under one write lock, so a participant who
    /// touches concurrently is either kept or removed, never both.
    pub fn remove_expired(&self, now: DateTime<Utc>, threshold: TimeDelta) -> Vec<String> {
        let mut removed = Vec::new();
        self.write().retain(|name, last| {
            if is_stale(*last, now, threshold) {
                removed.push(name.clone());
                false
            } else {
                true
            }
        });
        removed.sort();
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.last_seen.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.last_seen.write().unwrap_or_else(PoisonError::into_inner)
    }
}
