//! Per-variant status state machines
//!
//! Transitions are monotonic: nothing here moves a transfer backward. The
//! only backward motion in the system is the explicit retry action, which is
//! a user-initiated side channel handled by the recovery workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a two-message bridge deposit (or one teleport leg)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    /// Source transaction submitted, not yet confirmed
    SrcPending,
    /// Source transaction reverted; terminal
    SrcFailure,
    /// Source confirmed, destination message not yet executed
    DstPending,
    /// Destination message executed; terminal
    DstSuccess,
    /// Destination execution attempt failed; recoverable via retry
    DstFailure,
    /// Destination message was never created; recoverable via retry
    CreationFailed,
    /// Destination message expired unredeemed; terminal for token transfers
    Expired,
}

impl DepositStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DepositStatus::SrcFailure | DepositStatus::DstSuccess | DepositStatus::Expired
        )
    }

    /// Recoverable states accept a retry action
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DepositStatus::DstFailure | DepositStatus::CreationFailed)
    }

    /// Apply the native-asset asymmetry: native value is credited
    /// unconditionally by the first message, so an expired second message
    /// still means the funds arrived. Token expiry stays expired.
    pub fn normalized(self, is_native: bool) -> DepositStatus {
        match self {
            DepositStatus::Expired if is_native => DepositStatus::DstSuccess,
            other => other,
        }
    }

    /// Position on the natural completeness ordering, used for the teleport
    /// composite rule. Failures rank below their pending counterpart.
    pub fn completeness(&self) -> u8 {
        match self {
            DepositStatus::SrcFailure => 0,
            DepositStatus::SrcPending => 1,
            DepositStatus::CreationFailed => 2,
            DepositStatus::Expired => 2,
            DepositStatus::DstFailure => 2,
            DepositStatus::DstPending => 3,
            DepositStatus::DstSuccess => 4,
        }
    }
}

/// Status of an outbound (withdrawal) message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Challenge period still running
    Unconfirmed,
    /// Claimable: challenge period elapsed
    Confirmed,
    /// Claimed on the destination chain; terminal
    Executed,
    /// Terminal failure; only mapped from an explicit call-exception signal
    Failure,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Executed | WithdrawalStatus::Failure)
    }

    pub fn is_claimable(&self) -> bool {
        matches!(self, WithdrawalStatus::Confirmed)
    }

    /// Map an execution probe result onto the state machine. Only a call
    /// exception means failure; any other error leaves the status unknown
    /// and the caller keeps the previous state.
    pub fn from_probe(executed: bool, confirmed: bool, call_exception: bool) -> WithdrawalStatus {
        if call_exception {
            WithdrawalStatus::Failure
        } else if executed {
            WithdrawalStatus::Executed
        } else if confirmed {
            WithdrawalStatus::Confirmed
        } else {
            WithdrawalStatus::Unconfirmed
        }
    }
}

/// Status of a burn/attest/mint transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestedStatus {
    /// Waiting for the source burn to reach attestation depth
    Pending,
    /// Attestation available; claimable
    Confirmed,
    /// Minted on the destination chain; terminal
    Executed,
    /// Terminal failure
    Failure,
}

impl AttestedStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttestedStatus::Executed | AttestedStatus::Failure)
    }

    pub fn is_claimable(&self) -> bool {
        matches!(self, AttestedStatus::Confirmed)
    }
}

/// Derive the attested status from wall-clock time alone.
///
/// `Pending -> Confirmed` is time-derived, not event-derived: once
/// `confirmation_secs` have elapsed since creation the attestation is
/// considered available without any chain query. `Confirmed -> Executed`
/// only ever happens through the claim workflow, so terminal states passed
/// in are preserved as-is.
pub fn derive_attested_status(
    current: AttestedStatus,
    created_at: Option<DateTime<Utc>>,
    confirmation_secs: i64,
    now: DateTime<Utc>,
) -> AttestedStatus {
    if current.is_terminal() || current == AttestedStatus::Confirmed {
        return current;
    }
    let created = created_at.unwrap_or(now);
    if (now - created).num_seconds() >= confirmation_secs {
        AttestedStatus::Confirmed
    } else {
        AttestedStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_deposit_terminal_states() {
        assert!(DepositStatus::SrcFailure.is_terminal());
        assert!(DepositStatus::DstSuccess.is_terminal());
        assert!(DepositStatus::Expired.is_terminal());
        assert!(!DepositStatus::DstFailure.is_terminal());
        assert!(!DepositStatus::CreationFailed.is_terminal());
    }

    #[test]
    fn test_deposit_recoverable_states() {
        assert!(DepositStatus::DstFailure.is_recoverable());
        assert!(DepositStatus::CreationFailed.is_recoverable());
        assert!(!DepositStatus::Expired.is_recoverable());
        assert!(!DepositStatus::DstSuccess.is_recoverable());
    }

    #[test]
    fn test_native_expiry_normalizes_to_success() {
        assert_eq!(
            DepositStatus::Expired.normalized(true),
            DepositStatus::DstSuccess
        );
        assert_eq!(
            DepositStatus::Expired.normalized(false),
            DepositStatus::Expired
        );
        // other states untouched either way
        assert_eq!(
            DepositStatus::DstPending.normalized(true),
            DepositStatus::DstPending
        );
    }

    #[test]
    fn test_completeness_ordering() {
        assert!(DepositStatus::DstSuccess.completeness() > DepositStatus::DstPending.completeness());
        assert!(DepositStatus::DstPending.completeness() > DepositStatus::DstFailure.completeness());
        assert!(DepositStatus::SrcPending.completeness() > DepositStatus::SrcFailure.completeness());
    }

    #[test]
    fn test_withdrawal_probe_mapping() {
        assert_eq!(
            WithdrawalStatus::from_probe(false, false, true),
            WithdrawalStatus::Failure
        );
        assert_eq!(
            WithdrawalStatus::from_probe(true, true, false),
            WithdrawalStatus::Executed
        );
        assert_eq!(
            WithdrawalStatus::from_probe(false, true, false),
            WithdrawalStatus::Confirmed
        );
        assert_eq!(
            WithdrawalStatus::from_probe(false, false, false),
            WithdrawalStatus::Unconfirmed
        );
    }

    #[test]
    fn test_attested_confirmation_is_time_derived() {
        let now = Utc::now();
        // created 20 minutes ago, 15 minute confirmation window
        let created = Some(now - Duration::minutes(20));
        assert_eq!(
            derive_attested_status(AttestedStatus::Pending, created, 15 * 60, now),
            AttestedStatus::Confirmed
        );

        // created 5 minutes ago, still pending
        let created = Some(now - Duration::minutes(5));
        assert_eq!(
            derive_attested_status(AttestedStatus::Pending, created, 15 * 60, now),
            AttestedStatus::Pending
        );

        // missing created_at assumes now
        assert_eq!(
            derive_attested_status(AttestedStatus::Pending, None, 15 * 60, now),
            AttestedStatus::Pending
        );
    }

    #[test]
    fn test_attested_executed_never_regresses() {
        let now = Utc::now();
        assert_eq!(
            derive_attested_status(AttestedStatus::Executed, Some(now), 15 * 60, now),
            AttestedStatus::Executed
        );
        assert_eq!(
            derive_attested_status(AttestedStatus::Failure, Some(now), 15 * 60, now),
            AttestedStatus::Failure
        );
    }
}
