//! Rotating key pair store
//!
//! Readers load the current [`KeypairSnapshot`] without locking. A reload
//! parses and decodes the whole content first and only then swaps the new
//! snapshot in; a failed reload leaves the previous one current.

use arc_swap::ArcSwap;
use chrono::Utc;
use operator_core::{ClientSideKeypair, KeyCodec, KeypairRecord};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{ContentSource, KeypairSnapshot, Result, StoreError};

/// Metadata field naming the key pair content
pub const KEYPAIRS_METADATA_FIELD: &str = "client_side_keypairs";

pub struct RotatingKeypairStore {
    current: ArcSwap<KeypairSnapshot>,
    /// Serializes writers and tracks the last published generation
    writer: Mutex<u64>,
    source: Arc<dyn ContentSource>,
    codec: Arc<dyn KeyCodec>,
    metadata_path: String,
}

impl RotatingKeypairStore {
    pub fn new(
        source: Arc<dyn ContentSource>,
        codec: Arc<dyn KeyCodec>,
        metadata_path: impl Into<String>,
    ) -> Self {
        Self {
            current: ArcSwap::from_pointee(KeypairSnapshot::empty()),
            writer: Mutex::new(0),
            source,
            codec,
            metadata_path: metadata_path.into(),
        }
    }

    pub fn metadata_path(&self) -> &str {
        &self.metadata_path
    }

    pub fn codec(&self) -> &Arc<dyn KeyCodec> {
        &self.codec
    }

    /// The current snapshot; stays valid however many reloads follow
    pub fn snapshot(&self) -> Arc<KeypairSnapshot> {
        self.current.load_full()
    }

    pub fn all(&self) -> Vec<Arc<ClientSideKeypair>> {
        self.current.load().all().to_vec()
    }

    pub fn keypair(&self, subscription_id: &str) -> Option<Arc<ClientSideKeypair>> {
        self.current.load().keypair(subscription_id).cloned()
    }

    pub fn site_keypairs(&self, site_id: i32) -> Vec<Arc<ClientSideKeypair>> {
        self.current.load().site_keypairs(site_id).to_vec()
    }

    pub fn enabled_keypairs(&self) -> Vec<Arc<ClientSideKeypair>> {
        self.current.load().enabled_keypairs().to_vec()
    }

    /// Replace the current snapshot with one built from a JSON array of
    /// key pair records
    ///
    /// Returns the number of records loaded.
    pub fn reload(&self, raw: &[u8]) -> Result<usize> {
        let records: Vec<KeypairRecord> = serde_json::from_slice(raw)?;
        let count = records.len();
        let keypairs = records
            .iter()
            .map(|record| record.decode(self.codec.as_ref()))
            .collect::<operator_core::Result<Vec<_>>>()?;

        let mut generation = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *generation += 1;

        let snapshot = KeypairSnapshot::build(keypairs, *generation, Utc::now());
        let site_count = snapshot.site_count();
        let enabled_count = snapshot.enabled_keypairs().len();
        self.current.store(Arc::new(snapshot));

        info!(
            generation = *generation,
            keypairs = count,
            enabled = enabled_count,
            sites = site_count,
            "Published client-side key pair snapshot"
        );

        Ok(count)
    }

    /// Load the key pair content a metadata document points at
    ///
    /// Expects `{"client_side_keypairs": {"location": "<path>"}}`.
    pub async fn load_content(&self, metadata: &Value) -> Result<usize> {
        let location = metadata
            .get(KEYPAIRS_METADATA_FIELD)
            .and_then(|section| section.get("location"))
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::MissingLocation(KEYPAIRS_METADATA_FIELD.to_string()))?;

        debug!(location = %location, "Downloading key pair content");
        let raw = self.source.download(location).await?;
        self.reload(&raw)
    }

    /// Download the metadata document and load the content it names
    pub async fn refresh(&self) -> Result<usize> {
        let raw = self.source.download(&self.metadata_path).await?;
        let metadata: Value = serde_json::from_slice(&raw)?;
        self.load_content(&metadata).await
    }
}

/// Refresh `store` every `interval` until the task is aborted
///
/// The first refresh runs immediately. Failures are logged and the
/// previous snapshot stays current.
pub fn spawn_refresh_task(store: Arc<RotatingKeypairStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match store.refresh().await {
                Ok(count) => debug!(keypairs = count, "Key pair refresh complete"),
                Err(e) => warn!(
                    error = %e,
                    generation = store.snapshot().generation(),
                    "Key pair refresh failed, keeping current snapshot"
                ),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySource;
    use operator_core::PrefixedBase64Codec;
    use serde_json::json;

    fn store_with(source: Arc<InMemorySource>) -> RotatingKeypairStore {
        RotatingKeypairStore::new(
            source,
            Arc::new(PrefixedBase64Codec::default()),
            "metadata.json",
        )
    }

    fn record(id: &str, site_id: i32) -> Value {
        json!({
            "subscription_id": id,
            "public_key": "UID2-X-T-AQID",
            "private_key": "UID2-Y-T-BAUG",
            "site_id": site_id,
            "contact": "ops@example.com",
            "created": 1_700_000_000,
            "disabled": false
        })
    }

    #[test]
    fn test_reload_bumps_generation() {
        let store = store_with(Arc::new(InMemorySource::new()));
        assert_eq!(store.snapshot().generation(), 0);
        assert_eq!(store.metadata_path(), "metadata.json");

        let raw = serde_json::to_vec(&json!([record("a", 1)])).unwrap();
        assert_eq!(store.reload(&raw).unwrap(), 1);
        assert_eq!(store.reload(&raw).unwrap(), 1);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.generation(), 2);
        assert!(snapshot.loaded_at().is_some());
        assert_eq!(store.keypair("a").unwrap().site_id(), 1);
    }

    #[test]
    fn test_bad_key_material_fails_whole_reload() {
        let store = store_with(Arc::new(InMemorySource::new()));
        let good = serde_json::to_vec(&json!([record("a", 1)])).unwrap();
        store.reload(&good).unwrap();

        let mut broken = record("b", 2);
        broken["private_key"] = json!("no-prefix");
        let bad = serde_json::to_vec(&json!([record("c", 3), broken])).unwrap();

        assert!(matches!(store.reload(&bad), Err(StoreError::Decode(_))));
        assert_eq!(store.snapshot().generation(), 1);
        assert!(store.keypair("a").is_some());
        assert!(store.keypair("c").is_none());
    }

    #[tokio::test]
    async fn test_load_content_follows_location() {
        let source = Arc::new(InMemorySource::new());
        source.put(
            "keypairs/current.json",
            serde_json::to_vec(&json!([record("a", 1), record("b", 2)])).unwrap(),
        );
        let store = store_with(source);

        let metadata = json!({ "client_side_keypairs": { "location": "keypairs/current.json" } });
        assert_eq!(store.load_content(&metadata).await.unwrap(), 2);
        assert_eq!(store.all().len(), 2);
    }

    #[tokio::test]
    async fn test_load_content_without_location() {
        let store = store_with(Arc::new(InMemorySource::new()));
        let result = store.load_content(&json!({ "keys": {} })).await;
        assert!(matches!(result, Err(StoreError::MissingLocation(_))));
    }

    #[tokio::test]
    async fn test_refresh_reads_metadata() {
        let source = Arc::new(InMemorySource::new());
        source.put(
            "metadata.json",
            serde_json::to_vec(&json!({ "client_side_keypairs": { "location": "kp.json" } }))
                .unwrap(),
        );
        source.put("kp.json", serde_json::to_vec(&json!([record("a", 7)])).unwrap());
        let store = store_with(source.clone());

        assert_eq!(store.refresh().await.unwrap(), 1);
        assert_eq!(store.site_keypairs(7).len(), 1);

        source.remove("kp.json");
        assert!(matches!(store.refresh().await, Err(StoreError::NotFound(_))));
        assert_eq!(store.site_keypairs(7).len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_task_publishes() {
        let source = Arc::new(InMemorySource::new());
        source.put(
            "metadata.json",
            serde_json::to_vec(&json!({ "client_side_keypairs": { "location": "kp.json" } }))
                .unwrap(),
        );
        source.put("kp.json", serde_json::to_vec(&json!([record("a", 1)])).unwrap());
        let store = Arc::new(store_with(source));

        let handle = spawn_refresh_task(store.clone(), Duration::from_millis(10));
        for _ in 0..100 {
            if store.snapshot().generation() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(store.snapshot().generation() > 0);
        assert!(store.keypair("a").is_some());
    }
}
