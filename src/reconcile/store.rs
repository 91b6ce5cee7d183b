//! Local transfer overlay
//!
//! Holds optimistic/fresh transfers keyed by owning address so that
//! just-submitted transfers are visible before the indexer catches up.
//! Writes are append-or-replace-by-id: multiple flows (submission, retry,
//! claim, attestation poll) write here over a transfer's lifetime and must
//! never clobber each other's entries.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transfer::Transfer;

type Overlay = HashMap<String, HashMap<String, Transfer>>;

/// Per-address overlay of locally-known transfers, persisted across sessions
pub struct LocalStore {
    /// address -> (transfer id -> transfer)
    overlay: Arc<RwLock<Overlay>>,
    persistence_path: Option<String>,
}

impl LocalStore {
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            overlay: Arc::new(RwLock::new(HashMap::new())),
            persistence_path,
        }
    }

    fn normalize(address: &str) -> String {
        address.to_ascii_lowercase()
    }

    /// Load the overlay from disk
    pub async fn load(&self) -> Result<()> {
        if let Some(path) = &self.persistence_path {
            if Path::new(path).exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| Error::StorePersistence(e.to_string()))?;

                let overlay: Overlay = serde_json::from_str(&data)
                    .map_err(|e| Error::StorePersistence(e.to_string()))?;

                let mut guard = self.overlay.write().await;
                *guard = overlay;

                info!(
                    "Loaded overlay for {} addresses from {}",
                    guard.len(),
                    path
                );
            }
        }
        Ok(())
    }

    /// Save the overlay to disk
    pub async fn save(&self) -> Result<()> {
        if let Some(path) = &self.persistence_path {
            let overlay = self.overlay.read().await;
            let data = serde_json::to_string_pretty(&*overlay)
                .map_err(|e| Error::StorePersistence(e.to_string()))?;

            tokio::fs::write(path, data)
                .await
                .map_err(|e| Error::StorePersistence(e.to_string()))?;

            debug!("Saved overlay for {} addresses to {}", overlay.len(), path);
        }
        Ok(())
    }

    /// Insert or replace one transfer for an address
    pub async fn put(&self, address: &str, transfer: Transfer) -> Result<()> {
        let address = Self::normalize(address);
        {
            let mut overlay = self.overlay.write().await;
            let entry = overlay.entry(address.clone()).or_default();
            let replaced = entry.insert(transfer.id.clone(), transfer).is_some();
            debug!(
                "{} transfer in overlay for {}",
                if replaced { "Replaced" } else { "Added" },
                address
            );
        }
        self.save().await
    }

    /// All locally-known transfers for an address
    pub async fn get(&self, address: &str) -> Vec<Transfer> {
        let overlay = self.overlay.read().await;
        overlay
            .get(&Self::normalize(address))
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default()
    }

    /// One transfer by id, if locally known
    pub async fn get_by_id(&self, address: &str, id: &str) -> Option<Transfer> {
        let overlay = self.overlay.read().await;
        overlay
            .get(&Self::normalize(address))
            .and_then(|by_id| by_id.get(id))
            .cloned()
    }

    pub async fn count(&self, address: &str) -> usize {
        let overlay = self.overlay.read().await;
        overlay
            .get(&Self::normalize(address))
            .map(|by_id| by_id.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::model::test_helpers::*;
    use crate::transfer::{DepositStatus, TransferKind};

    #[tokio::test]
    async fn test_put_replaces_by_id() {
        let store = LocalStore::new(None);

        store
            .put("0xAbC", test_deposit("d1", DepositStatus::SrcPending))
            .await
            .unwrap();
        store
            .put("0xabc", test_deposit("d1", DepositStatus::DstPending))
            .await
            .unwrap();

        assert_eq!(store.count("0xABC").await, 1);
        let transfer = store.get_by_id("0xabc", "d1").await.unwrap();
        match transfer.kind {
            TransferKind::Deposit { status, .. } => assert_eq!(status, DepositStatus::DstPending),
            _ => panic!("expected deposit"),
        }
    }

    #[tokio::test]
    async fn test_addresses_are_isolated() {
        let store = LocalStore::new(None);
        store
            .put("0xaaa", test_deposit("d1", DepositStatus::SrcPending))
            .await
            .unwrap();

        assert!(store.get("0xbbb").await.is_empty());
        assert_eq!(store.get("0xaaa").await.len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("overlay.json")
            .to_string_lossy()
            .to_string();

        let store = LocalStore::new(Some(path.clone()));
        store
            .put("0xabc", test_deposit("d1", DepositStatus::DstPending))
            .await
            .unwrap();

        let reloaded = LocalStore::new(Some(path));
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.count("0xabc").await, 1);
        assert!(reloaded.get_by_id("0xabc", "d1").await.is_some());
    }
}
