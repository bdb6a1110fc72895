//! Immutable key pair snapshot

use chrono::{DateTime, Utc};
use operator_core::ClientSideKeypair;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// One generation of client-side key pairs
///
/// Holds three views built from the same collection: by subscription id,
/// by site id (load order), and every enabled key pair. A snapshot is
/// never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct KeypairSnapshot {
    generation: u64,
    loaded_at: Option<DateTime<Utc>>,
    all: Vec<Arc<ClientSideKeypair>>,
    by_subscription: HashMap<String, Arc<ClientSideKeypair>>,
    by_site: HashMap<i32, Vec<Arc<ClientSideKeypair>>>,
    enabled: Vec<Arc<ClientSideKeypair>>,
}

impl KeypairSnapshot {
    /// The snapshot a store starts with: generation 0, nothing loaded
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from key pairs in load order
    ///
    /// When a subscription id repeats, the last record wins and earlier
    /// ones are left out of every view.
    pub fn build(
        keypairs: Vec<ClientSideKeypair>,
        generation: u64,
        loaded_at: DateTime<Utc>,
    ) -> Self {
        let mut last_index: HashMap<&str, usize> = HashMap::with_capacity(keypairs.len());
        for (index, keypair) in keypairs.iter().enumerate() {
            if let Some(previous) = last_index.insert(keypair.subscription_id(), index) {
                warn!(
                    subscription_id = %keypair.subscription_id(),
                    replaced_index = previous,
                    "Duplicate subscription id in key pair content, keeping the later record"
                );
            }
        }
        let keep: Vec<bool> = (0..keypairs.len())
            .map(|index| last_index.get(keypairs[index].subscription_id()) == Some(&index))
            .collect();

        let all: Vec<Arc<ClientSideKeypair>> = keypairs
            .into_iter()
            .zip(keep)
            .filter_map(|(keypair, keep)| keep.then(|| Arc::new(keypair)))
            .collect();

        let mut by_subscription = HashMap::with_capacity(all.len());
        let mut by_site: HashMap<i32, Vec<Arc<ClientSideKeypair>>> = HashMap::new();
        let mut enabled = Vec::new();
        for keypair in &all {
            by_subscription.insert(keypair.subscription_id().to_string(), Arc::clone(keypair));
            by_site
                .entry(keypair.site_id())
                .or_default()
                .push(Arc::clone(keypair));
            if !keypair.is_disabled() {
                enabled.push(Arc::clone(keypair));
            }
        }

        Self {
            generation,
            loaded_at: Some(loaded_at),
            all,
            by_subscription,
            by_site,
            enabled,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Every key pair, in load order
    pub fn all(&self) -> &[Arc<ClientSideKeypair>] {
        &self.all
    }

    pub fn keypair(&self, subscription_id: &str) -> Option<&Arc<ClientSideKeypair>> {
        self.by_subscription.get(subscription_id)
    }

    /// Key pairs of one site; empty for an unknown site
    pub fn site_keypairs(&self, site_id: i32) -> &[Arc<ClientSideKeypair>] {
        self.by_site.get(&site_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn enabled_keypairs(&self) -> &[Arc<ClientSideKeypair>] {
        &self.enabled
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn site_count(&self) -> usize {
        self.by_site.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use operator_core::{PrivateKeyMaterial, PublicKeyMaterial};

    fn keypair(id: &str, site_id: i32, disabled: bool) -> ClientSideKeypair {
        ClientSideKeypair::new(
            id,
            PublicKeyMaterial::new(format!("pub-{id}").into_bytes()),
            PrivateKeyMaterial::new(format!("priv-{id}").into_bytes()),
            site_id,
            format!("{id}@example.com"),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            disabled,
        )
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = KeypairSnapshot::empty();
        assert_eq!(snapshot.generation(), 0);
        assert!(snapshot.loaded_at().is_none());
        assert!(snapshot.is_empty());
        assert!(snapshot.keypair("anything").is_none());
        assert!(snapshot.site_keypairs(1).is_empty());
        assert!(snapshot.enabled_keypairs().is_empty());
    }

    #[test]
    fn test_views_are_consistent() {
        let snapshot = KeypairSnapshot::build(
            vec![
                keypair("a", 1, false),
                keypair("b", 1, true),
                keypair("c", 2, false),
            ],
            3,
            Utc::now(),
        );

        assert_eq!(snapshot.generation(), 3);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.site_count(), 2);

        let site_1: Vec<&str> = snapshot
            .site_keypairs(1)
            .iter()
            .map(|kp| kp.subscription_id())
            .collect();
        assert_eq!(site_1, ["a", "b"]);

        let enabled: Vec<&str> = snapshot
            .enabled_keypairs()
            .iter()
            .map(|kp| kp.subscription_id())
            .collect();
        assert_eq!(enabled, ["a", "c"]);

        assert_eq!(snapshot.keypair("b").unwrap().site_id(), 1);
        assert!(snapshot.site_keypairs(99).is_empty());
    }

    #[test]
    fn test_duplicate_subscription_keeps_last() {
        let snapshot = KeypairSnapshot::build(
            vec![
                keypair("dup", 1, false),
                keypair("other", 2, false),
                keypair("dup", 3, true),
            ],
            1,
            Utc::now(),
        );

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.keypair("dup").unwrap().site_id(), 3);
        assert!(snapshot.site_keypairs(1).is_empty());
        assert_eq!(snapshot.site_keypairs(3).len(), 1);

        let enabled: Vec<&str> = snapshot
            .enabled_keypairs()
            .iter()
            .map(|kp| kp.subscription_id())
            .collect();
        assert_eq!(enabled, ["other"]);
    }
}
