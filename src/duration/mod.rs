//! Duration estimation
//!
//! Pure functions of transfer, chain registry and wall clock. Nothing here
//! performs I/O; the registry supplies every protocol constant. Estimates
//! that hit out-of-date or missing chain constants degrade to "unknown
//! remaining time" instead of failing.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::chain::{ChainInfo, ChainRegistry, NetworkClass};
use crate::error::Result;
use crate::transfer::{Transfer, TransferKind};

/// Minutes for a deposit landing on a second-level chain
const DEPOSIT_MINUTES_MAINNET: i64 = 15;
const DEPOSIT_MINUTES_TESTNET: i64 = 10;
/// Deposits landing on a third-level chain confirm faster because the
/// intermediate chain's blocks are faster
const DEPOSIT_MINUTES_ORBIT: i64 = 5;

/// Minutes for an attested (burn/mint) transfer
const ATTESTED_MINUTES_MAINNET: i64 = 15;
const ATTESTED_MINUTES_TESTNET: i64 = 1;

/// Machine-usable estimate; human rendering is a caller concern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationEstimate {
    pub approximate_total_minutes: i64,
    /// None when a required computation could not be performed
    pub estimated_minutes_left: Option<i64>,
}

impl DurationEstimate {
    fn unknown() -> Self {
        Self {
            approximate_total_minutes: 0,
            estimated_minutes_left: None,
        }
    }
}

/// Estimate total and remaining minutes for a transfer
pub fn estimate(transfer: &Transfer, registry: &ChainRegistry, now: DateTime<Utc>) -> DurationEstimate {
    match try_estimate(transfer, registry, now, false) {
        Ok(estimate) => estimate,
        Err(e) => {
            warn!("Duration estimate unavailable for {}: {}", transfer.id, e);
            DurationEstimate::unknown()
        }
    }
}

/// Teleport variant of [`estimate`] covering only the remaining first-leg
/// time; used once the transfer is mid-flight
pub fn estimate_first_leg(
    transfer: &Transfer,
    registry: &ChainRegistry,
    now: DateTime<Utc>,
) -> DurationEstimate {
    match try_estimate(transfer, registry, now, true) {
        Ok(estimate) => estimate,
        Err(e) => {
            warn!("Duration estimate unavailable for {}: {}", transfer.id, e);
            DurationEstimate::unknown()
        }
    }
}

fn try_estimate(
    transfer: &Transfer,
    registry: &ChainRegistry,
    now: DateTime<Utc>,
    first_leg_only: bool,
) -> Result<DurationEstimate> {
    let created = transfer.effective_created_at(now);
    let elapsed_minutes = (now - created).num_seconds() / 60;

    let total_minutes = match &transfer.kind {
        TransferKind::Deposit { .. } => deposit_minutes(registry, transfer.destination_chain_id)?,
        TransferKind::Teleport { .. } => {
            let leg1 = deposit_minutes_for_class(
                registry.network_class(transfer.source_chain_id)?,
                false,
            );
            let leg2 = deposit_minutes(registry, transfer.destination_chain_id)?;
            if first_leg_only {
                leg1
            } else {
                leg1 + leg2
            }
        }
        TransferKind::Attested { .. } => {
            match registry.network_class(transfer.source_chain_id)? {
                NetworkClass::Mainnet => ATTESTED_MINUTES_MAINNET,
                NetworkClass::Testnet => ATTESTED_MINUTES_TESTNET,
            }
        }
        TransferKind::Withdrawal { .. } => {
            let source = registry.get(transfer.source_chain_id)?;
            let period_secs = registry.withdrawal_confirmation_secs(transfer.source_chain_id)?;
            let target = withdrawal_confirmation_target(created, source, period_secs);
            (target - created).num_seconds() / 60
        }
        // aggregator routes carry their own provider-side estimate
        TransferKind::Aggregated { .. } => return Ok(DurationEstimate::unknown()),
    };

    let remaining = match &transfer.kind {
        // remaining attested time tracks the same wall-clock confirmation
        // computation the state machine uses, not the display constant
        TransferKind::Attested { .. } => {
            let confirmation_secs = registry.attestation_confirmation_secs(transfer.source_chain_id)?;
            ((confirmation_secs - (now - created).num_seconds()) / 60).max(0)
        }
        _ => (total_minutes - elapsed_minutes).max(0),
    };

    Ok(DurationEstimate {
        approximate_total_minutes: total_minutes,
        estimated_minutes_left: Some(remaining),
    })
}

fn deposit_minutes(registry: &ChainRegistry, destination_chain_id: u64) -> Result<i64> {
    let class = registry.network_class(destination_chain_id)?;
    let orbit = registry.is_orbit(destination_chain_id)?;
    Ok(deposit_minutes_for_class(class, orbit))
}

fn deposit_minutes_for_class(class: NetworkClass, orbit_destination: bool) -> i64 {
    if orbit_destination {
        return DEPOSIT_MINUTES_ORBIT;
    }
    match class {
        NetworkClass::Mainnet => DEPOSIT_MINUTES_MAINNET,
        NetworkClass::Testnet => DEPOSIT_MINUTES_TESTNET,
    }
}

/// When an outbound message created at `created_at` becomes claimable.
///
/// Accounts for the one-time challenge-period reset upgrade: a transfer not
/// yet confirmed at the upgrade timestamp has its target pushed to
/// `upgrade_time + (upgrade_time - created_at) + new_period`. Pure function;
/// transfers confirmed before the upgrade are unaffected.
pub fn withdrawal_confirmation_target(
    created_at: DateTime<Utc>,
    source: &ChainInfo,
    period_secs: i64,
) -> DateTime<Utc> {
    let normal = created_at + Duration::seconds(period_secs);
    if let Some(reset) = source.challenge_period_reset {
        let unconfirmed_at_upgrade = created_at < reset.upgrade_time && normal > reset.upgrade_time;
        if unconfirmed_at_upgrade {
            return reset.upgrade_time
                + (reset.upgrade_time - created_at)
                + Duration::seconds(reset.new_period_secs);
        }
    }
    normal
}
