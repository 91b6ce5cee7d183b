//! Recovery-action workflow: retry and claim
//!
//! Both actions are idempotent per transfer id and guarded against
//! concurrent re-invocation. A wallet-rejected signature leaves the
//! transfer completely untouched and surfaces no error; any other
//! submission error is returned typed, with the transfer state unchanged so
//! the action stays retryable.

pub mod clients;

pub use clients::{AttestationService, ChainClient};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chain::ChainRegistry;
use crate::config::RecoveryConfig;
use crate::error::{Error, Result};
use crate::reconcile::store::LocalStore;
use crate::transfer::{
    AttestedStatus, DepositStatus, ForwarderStatus, Transfer, TransferKind, WithdrawalStatus,
};

/// Check whether a retry action may be offered for this transfer.
///
/// Past the protocol's outer validity window the enum value may still read
/// as recoverable, but the state is effectively terminal-failed and the
/// action must not be offered.
pub fn can_retry(transfer: &Transfer, now: DateTime<Utc>, retry_window_days: i64) -> bool {
    let created = transfer.effective_created_at(now);
    if now - created > Duration::days(retry_window_days) {
        return false;
    }
    match &transfer.kind {
        TransferKind::Deposit { status, .. } => status.is_recoverable(),
        TransferKind::Teleport {
            leg1,
            forwarder,
            leg2,
            ..
        } => {
            leg1.is_recoverable()
                || *forwarder == ForwarderStatus::Failed
                || leg2.is_recoverable()
        }
        _ => false,
    }
}

/// Check whether a claim action may be offered for this transfer
pub fn can_claim(transfer: &Transfer) -> bool {
    match &transfer.kind {
        TransferKind::Withdrawal { status, .. } => status.is_claimable(),
        TransferKind::Attested { status, .. } => status.is_claimable(),
        _ => false,
    }
}

/// Removes the in-flight marker when an action finishes, on every exit path
struct InFlightGuard<'a> {
    map: &'a DashMap<String, ()>,
    id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.id);
    }
}

/// Drives user-triggered retry and claim transitions
pub struct RecoveryManager {
    chain_client: Arc<dyn ChainClient>,
    attestation_service: Arc<dyn AttestationService>,
    store: Arc<LocalStore>,
    registry: ChainRegistry,
    config: RecoveryConfig,
    /// Transfer ids with an action currently in flight
    in_flight: DashMap<String, ()>,
    /// Transfer ids whose message could not be located on-chain; actions
    /// stay disabled for these
    disabled: DashMap<String, ()>,
}

impl RecoveryManager {
    pub fn new(
        chain_client: Arc<dyn ChainClient>,
        attestation_service: Arc<dyn AttestationService>,
        store: Arc<LocalStore>,
        registry: ChainRegistry,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            chain_client,
            attestation_service,
            store,
            registry,
            config,
            in_flight: DashMap::new(),
            disabled: DashMap::new(),
        }
    }

    /// Whether actions were permanently disabled for a transfer after a
    /// not-found failure
    pub fn is_action_disabled(&self, id: &str) -> bool {
        self.disabled.contains_key(id)
    }

    fn acquire(&self, id: &str) -> Result<InFlightGuard<'_>> {
        if self.disabled.contains_key(id) {
            return Err(Error::ActionNotApplicable {
                id: id.to_string(),
                reason: "message could not be located on-chain".to_string(),
            });
        }
        if self.in_flight.insert(id.to_string(), ()).is_some() {
            return Err(Error::ActionInFlight(id.to_string()));
        }
        Ok(InFlightGuard {
            map: &self.in_flight,
            id: id.to_string(),
        })
    }

    async fn ensure_connected_to(&self, expected: u64) -> Result<()> {
        let connected = self.chain_client.connected_chain_id().await?;
        if connected != expected {
            return Err(Error::WrongChain { expected, connected });
        }
        Ok(())
    }

    /// Re-submit execution of a failed destination-side message.
    ///
    /// Resolves silently when the user rejects the wallet signature.
    pub async fn retry(&self, transfer: &Transfer) -> Result<()> {
        let now = Utc::now();
        if !can_retry(transfer, now, self.config.retry_window_days) {
            let created = transfer.effective_created_at(now);
            if now - created > Duration::days(self.config.retry_window_days) {
                return Err(Error::RetryWindowExpired(transfer.id.clone()));
            }
            return Err(Error::ActionNotApplicable {
                id: transfer.id.clone(),
                reason: "transfer is not in a recoverable state".to_string(),
            });
        }

        let _guard = self.acquire(&transfer.id)?;

        let (target_chain, ticket_id) = self.retry_target(transfer)?;
        self.ensure_connected_to(target_chain).await?;

        debug!(
            "Retrying message {} for transfer {} on chain {}",
            ticket_id, transfer.id, target_chain
        );

        match self
            .chain_client
            .redeem_retryable(target_chain, &ticket_id)
            .await
        {
            Ok(tx_hash) => {
                let updated = apply_retry_success(transfer.clone(), &tx_hash, now);
                self.store.put(&transfer.sender, updated).await?;
                info!("Retry succeeded for transfer {}: {}", transfer.id, tx_hash);
                Ok(())
            }
            Err(e) if e.is_user_cancelled() => {
                debug!("Retry cancelled by user for transfer {}", transfer.id);
                Ok(())
            }
            Err(Error::NotFound(msg)) => {
                self.disabled.insert(transfer.id.clone(), ());
                warn!(
                    "Message for transfer {} not found on-chain, retry disabled",
                    transfer.id
                );
                Err(Error::NotFound(msg))
            }
            Err(e) => {
                warn!("Retry failed for transfer {}: {}", transfer.id, e);
                Err(e)
            }
        }
    }

    /// Submit the destination-side receive/execute transaction for a
    /// claimable transfer.
    ///
    /// Resolves silently when the user rejects the wallet signature.
    pub async fn claim(&self, transfer: &Transfer) -> Result<()> {
        if !can_claim(transfer) {
            return Err(Error::ActionNotApplicable {
                id: transfer.id.clone(),
                reason: "transfer is not claimable".to_string(),
            });
        }

        let _guard = self.acquire(&transfer.id)?;
        self.ensure_connected_to(transfer.destination_chain_id).await?;

        let submission = match &transfer.kind {
            TransferKind::Withdrawal { outbound, .. } => {
                let index = outbound.message_index.ok_or_else(|| {
                    Error::NotFound(format!("no outbox index for transfer {}", transfer.id))
                })?;
                self.chain_client
                    .execute_outbound(transfer.destination_chain_id, index)
                    .await
            }
            TransferKind::Attested { attestation, .. } => {
                self.claim_attested(transfer, attestation.message_hash.as_deref(), attestation)
                    .await
            }
            _ => Err(Error::ActionNotApplicable {
                id: transfer.id.clone(),
                reason: "variant has no claim action".to_string(),
            }),
        };

        match submission {
            Ok(tx_hash) => {
                let updated = apply_claim_success(transfer.clone(), &tx_hash, Utc::now());
                self.store.put(&transfer.sender, updated).await?;
                info!("Claim succeeded for transfer {}: {}", transfer.id, tx_hash);
                Ok(())
            }
            Err(e) if e.is_user_cancelled() => {
                debug!("Claim cancelled by user for transfer {}", transfer.id);
                Ok(())
            }
            Err(Error::NotFound(msg)) => {
                self.disabled.insert(transfer.id.clone(), ());
                warn!(
                    "Message for transfer {} not found on-chain, claim disabled",
                    transfer.id
                );
                Err(Error::NotFound(msg))
            }
            Err(e) => {
                warn!("Claim failed for transfer {}: {}", transfer.id, e);
                Err(e)
            }
        }
    }

    async fn claim_attested(
        &self,
        transfer: &Transfer,
        message_hash: Option<&str>,
        info: &crate::transfer::AttestationInfo,
    ) -> Result<String> {
        let hash = message_hash.ok_or_else(|| {
            Error::NotFound(format!("no burn message hash for transfer {}", transfer.id))
        })?;
        let bytes = info.message_bytes.as_deref().ok_or_else(|| {
            Error::NotFound(format!("no message bytes for transfer {}", transfer.id))
        })?;

        let attestation = match &info.attestation {
            Some(existing) => existing.clone(),
            None => self.attestation_service.wait_for_attestation(hash).await?,
        };

        self.attestation_service
            .submit_receive(transfer.destination_chain_id, bytes, &attestation)
            .await
    }

    /// Chain and message identifier to retry for the transfer's current state
    fn retry_target(&self, transfer: &Transfer) -> Result<(u64, String)> {
        let missing = || Error::NotFound(format!("no creation id for transfer {}", transfer.id));
        match &transfer.kind {
            TransferKind::Deposit { retryable, .. } => Ok((
                transfer.destination_chain_id,
                retryable.ticket_id.clone().ok_or_else(missing)?,
            )),
            TransferKind::Teleport {
                leg1,
                forwarder,
                leg2: _,
                leg1_retryable,
                forwarder_retryable,
                leg2_retryable,
            } => {
                // leg 1 and the forwarder both live on the intermediate chain
                let intermediate = self
                    .registry
                    .get(transfer.destination_chain_id)?
                    .parent_chain_id
                    .ok_or(Error::UnknownChain(transfer.destination_chain_id))?;
                if leg1.is_recoverable() {
                    Ok((
                        intermediate,
                        leg1_retryable.ticket_id.clone().ok_or_else(missing)?,
                    ))
                } else if *forwarder == ForwarderStatus::Failed {
                    Ok((
                        intermediate,
                        forwarder_retryable.ticket_id.clone().ok_or_else(missing)?,
                    ))
                } else {
                    Ok((
                        transfer.destination_chain_id,
                        leg2_retryable.ticket_id.clone().ok_or_else(missing)?,
                    ))
                }
            }
            _ => Err(Error::ActionNotApplicable {
                id: transfer.id.clone(),
                reason: "variant has no retry action".to_string(),
            }),
        }
    }
}

/// Fold a successful retry submission into the transfer
fn apply_retry_success(mut transfer: Transfer, tx_hash: &str, now: DateTime<Utc>) -> Transfer {
    match &mut transfer.kind {
        TransferKind::Deposit { status, retryable } => {
            *status = DepositStatus::DstSuccess;
            retryable.destination_tx = Some(tx_hash.to_string());
            transfer.resolved_at = Some(now);
        }
        TransferKind::Teleport {
            leg1,
            forwarder,
            leg2,
            leg1_retryable,
            forwarder_retryable,
            leg2_retryable,
        } => {
            if leg1.is_recoverable() {
                *leg1 = DepositStatus::DstSuccess;
                leg1_retryable.destination_tx = Some(tx_hash.to_string());
            } else if *forwarder == ForwarderStatus::Failed {
                // unblocks leg 2
                *forwarder = ForwarderStatus::Executed;
                forwarder_retryable.destination_tx = Some(tx_hash.to_string());
            } else if leg2.is_recoverable() {
                *leg2 = DepositStatus::DstSuccess;
                leg2_retryable.destination_tx = Some(tx_hash.to_string());
                transfer.resolved_at = Some(now);
            }
        }
        _ => {}
    }
    transfer
}

/// Fold a successful claim submission into the transfer
fn apply_claim_success(mut transfer: Transfer, tx_hash: &str, now: DateTime<Utc>) -> Transfer {
    match &mut transfer.kind {
        TransferKind::Withdrawal { status, outbound } => {
            *status = WithdrawalStatus::Executed;
            outbound.claim_tx = Some(tx_hash.to_string());
            transfer.resolved_at.get_or_insert(now);
        }
        TransferKind::Attested { status, attestation } => {
            *status = AttestedStatus::Executed;
            attestation.receive_tx = Some(tx_hash.to_string());
            transfer.resolved_at.get_or_insert(now);
        }
        _ => {}
    }
    transfer
}
