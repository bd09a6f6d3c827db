//! In-memory web-push subscription registry.
//!
//! Keyed by user id. Each user may hold several subscriptions (one per
//! browser or device); re-registering an endpoint replaces the old entry.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Browser-issued encryption keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    /// Client public key.
    pub p256dh: String,
    /// Authentication secret.
    pub auth: String,
}

/// One browser push subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Push service URL, unique per subscription.
    pub endpoint: String,
    /// Encryption keys.
    pub keys: PushKeys,
}

/// Concurrent per-user subscription store.
#[derive(Debug, Default)]
pub struct PushRegistry {
    subscriptions: DashMap<String, Vec<PushSubscription>>,
}

impl PushRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace (by endpoint) a subscription. Returns the user's count.
    pub fn upsert(&self, user_id: &str, subscription: PushSubscription) -> usize {
        let mut entry = self.subscriptions.entry(user_id.to_string()).or_default();
        let subs = entry.value_mut();
        if let Some(existing) = subs.iter_mut().find(|s| s.endpoint == subscription.endpoint) {
            *existing = subscription;
        } else {
            subs.push(subscription);
        }
        debug!(user_id, count = subs.len(), "push subscription stored");
        subs.len()
    }

    /// Snapshot of a user's subscriptions.
    pub fn get(&self, user_id: &str) -> Vec<PushSubscription> {
        self.subscriptions
            .get(user_id)
            .map(|subs| subs.value().clone())
            .unwrap_or_default()
    }

    /// Drop one subscription by endpoint. Returns whether it existed.
    pub fn remove(&self, user_id: &str, endpoint: &str) -> bool {
        let Some(mut entry) = self.subscriptions.get_mut(user_id) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|s| s.endpoint != endpoint);
        let removed = entry.len() != before;
        let now_empty = entry.is_empty();
        drop(entry);
        if now_empty {
            let _ = self.subscriptions.remove_if(user_id, |_, subs| subs.is_empty());
        }
        removed
    }

    /// Users with at least one subscription.
    pub fn user_count(&self) -> usize {
        self.subscriptions.len()
    }
}
