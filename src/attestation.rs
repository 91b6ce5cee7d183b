//! Attestation confirmation polling
//!
//! Burn/attest transfers confirm by wall clock, not by chain events: once
//! enough source-chain time has elapsed the attestation is considered
//! available. This poller re-derives that status on a fixed interval for
//! every watched transfer, writes changes into the local overlay and emits
//! them to the host. It needs no network access once the chain constants
//! are known.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::chain::ChainRegistry;
use crate::config::AttestationPollConfig;
use crate::error::Result;
use crate::reconcile::LocalStore;
use crate::transfer::status::derive_attested_status;
use crate::transfer::{AttestedStatus, Transfer, TransferKind};

/// Status change event
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub id: String,
    pub previous: AttestedStatus,
    pub current: AttestedStatus,
}

/// Recurring confirmation check bound to the lifetime of the view showing
/// the watched transfers; `stop` cancels the task
pub struct ConfirmationPoller {
    registry: ChainRegistry,
    config: AttestationPollConfig,
    store: Arc<LocalStore>,
    /// Transfers being watched: id -> transfer
    watched: Arc<RwLock<HashMap<String, Transfer>>>,
    /// Shutdown signal
    shutdown: tokio::sync::broadcast::Sender<()>,
}

impl ConfirmationPoller {
    pub fn new(
        registry: ChainRegistry,
        config: AttestationPollConfig,
        store: Arc<LocalStore>,
    ) -> Self {
        let (shutdown, _) = tokio::sync::broadcast::channel(1);

        Self {
            registry,
            config,
            store,
            watched: Arc::new(RwLock::new(HashMap::new())),
            shutdown,
        }
    }

    /// Start the confirmation polling loop
    pub async fn start(&self, update_tx: mpsc::Sender<StatusUpdate>) -> Result<()> {
        if !self.config.enabled {
            info!("Attestation poller disabled");
            return Ok(());
        }

        info!(
            "Starting attestation poller with {}ms interval",
            self.config.poll_interval_ms
        );

        let registry = self.registry.clone();
        let store = self.store.clone();
        let watched = self.watched.clone();
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = interval(poll_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = chrono::Utc::now();
                        let snapshot: Vec<Transfer> = {
                            let guard = watched.read().await;
                            guard.values().cloned().collect()
                        };

                        for transfer in snapshot {
                            match Self::tick(&registry, transfer, now) {
                                Ok(Some((updated, event))) => {
                                    {
                                        let mut guard = watched.write().await;
                                        if event.current.is_claimable() || event.current.is_terminal() {
                                            // nothing further is time-derived;
                                            // claiming takes over from here
                                            guard.remove(&event.id);
                                        } else {
                                            guard.insert(event.id.clone(), updated.clone());
                                        }
                                    }

                                    let sender = updated.sender.clone();
                                    if let Err(e) = store.put(&sender, updated).await {
                                        warn!("Failed to persist attested update: {}", e);
                                    }

                                    if update_tx.send(event).await.is_err() {
                                        debug!("Status update channel closed");
                                        return;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    warn!("Confirmation check failed: {}", e);
                                }
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Attestation poller shutting down");
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop the poller
    pub fn stop(&self) {
        let _ = self.shutdown.send(());
    }

    /// Add a transfer to watch; ignores non-attested variants
    pub async fn watch(&self, transfer: Transfer) {
        if !matches!(transfer.kind, TransferKind::Attested { .. }) {
            return;
        }
        let id = transfer.id.clone();
        let mut watched = self.watched.write().await;
        watched.insert(id.clone(), transfer);
        debug!("Watching attested transfer {}", id);
    }

    /// Remove a transfer from watching
    pub async fn unwatch(&self, id: &str) {
        let mut watched = self.watched.write().await;
        watched.remove(id);
    }

    pub async fn watched_count(&self) -> usize {
        self.watched.read().await.len()
    }

    /// Re-derive one transfer's status from wall-clock time. Returns the
    /// updated transfer and event when the status changed.
    fn tick(
        registry: &ChainRegistry,
        mut transfer: Transfer,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<(Transfer, StatusUpdate)>> {
        let confirmation_secs = registry.attestation_confirmation_secs(transfer.source_chain_id)?;
        let created_at = transfer.created_at;
        let id = transfer.id.clone();

        if let TransferKind::Attested { status, .. } = &mut transfer.kind {
            let previous = *status;
            let current = derive_attested_status(previous, created_at, confirmation_secs, now);
            if current != previous {
                *status = current;
                if current.is_claimable() && transfer.resolved_at.is_none() {
                    transfer.resolved_at = Some(now);
                }
                info!(
                    "Attested transfer {} moved {:?} -> {:?}",
                    id, previous, current
                );
                return Ok(Some((
                    transfer,
                    StatusUpdate {
                        id,
                        previous,
                        current,
                    },
                )));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::model::test_helpers::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn poller() -> ConfirmationPoller {
        ConfirmationPoller::new(
            ChainRegistry::default(),
            AttestationPollConfig {
                enabled: true,
                poll_interval_ms: 100,
            },
            Arc::new(LocalStore::new(None)),
        )
    }

    #[tokio::test]
    async fn test_watch_ignores_other_variants() {
        let poller = poller();
        poller
            .watch(test_deposit("d1", crate::transfer::DepositStatus::SrcPending))
            .await;
        assert_eq!(poller.watched_count().await, 0);

        poller.watch(test_attested("a1", AttestedStatus::Pending)).await;
        assert_eq!(poller.watched_count().await, 1);

        poller.unwatch("a1").await;
        assert_eq!(poller.watched_count().await, 0);
    }

    #[test]
    fn test_tick_confirms_after_window() {
        let registry = ChainRegistry::default();
        let now = Utc::now();

        let mut transfer = test_attested("a1", AttestedStatus::Pending);
        transfer.created_at = Some(now - ChronoDuration::minutes(20));

        let (updated, event) = ConfirmationPoller::tick(&registry, transfer, now)
            .unwrap()
            .unwrap();
        assert_eq!(event.previous, AttestedStatus::Pending);
        assert_eq!(event.current, AttestedStatus::Confirmed);
        match updated.kind {
            TransferKind::Attested { status, .. } => {
                assert_eq!(status, AttestedStatus::Confirmed)
            }
            _ => panic!("expected attested"),
        }
    }

    #[test]
    fn test_tick_no_event_while_pending() {
        let registry = ChainRegistry::default();
        let now = Utc::now();

        let mut transfer = test_attested("a1", AttestedStatus::Pending);
        transfer.created_at = Some(now - ChronoDuration::minutes(2));

        assert!(ConfirmationPoller::tick(&registry, transfer, now)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_poll_loop_emits_and_unwatches() {
        let store = Arc::new(LocalStore::new(None));
        let poller = ConfirmationPoller::new(
            ChainRegistry::default(),
            AttestationPollConfig {
                enabled: true,
                poll_interval_ms: 100,
            },
            store.clone(),
        );

        let mut transfer = test_attested("a1", AttestedStatus::Pending);
        transfer.created_at = Some(Utc::now() - ChronoDuration::minutes(20));
        poller.watch(transfer.clone()).await;

        let (tx, mut rx) = mpsc::channel(8);
        poller.start(tx).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("poller emitted no update")
            .expect("channel closed");
        assert_eq!(event.id, "a1");
        assert_eq!(event.current, AttestedStatus::Confirmed);

        poller.stop();

        // the claimable transfer was removed from the watch set and its
        // richer copy landed in the overlay
        assert_eq!(poller.watched_count().await, 0);
        let stored = store.get_by_id(&transfer.sender, "a1").await.unwrap();
        match stored.kind {
            TransferKind::Attested { status, .. } => {
                assert_eq!(status, AttestedStatus::Confirmed)
            }
            _ => panic!("expected attested"),
        }
    }
}
