//! Core transfer entity
//!
//! A `Transfer` has an immutable identity (id, chains, parties, asset) and a
//! mutable status overlay carried inside its `kind`. The kind is a tagged
//! variant: each protocol gets its own status enum and payload, so presence
//! checks on overlapping optional fields are impossible by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{AttestedStatus, DepositStatus, WithdrawalStatus};
use super::teleport::{ForwarderStatus, TeleportStatus};

/// Direction relative to the rollup hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Deposit: moving down the hierarchy (parent to child)
    Inbound,
    /// Withdrawal: moving up the hierarchy (child to parent)
    Outbound,
}

/// Protocol discriminant, derivable from `TransferKind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Standard,
    CrossAttested,
    Teleport,
    Aggregated,
}

/// Asset being transferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmounts {
    pub symbol: String,
    /// Token contract address; None for the native asset
    pub token_address: Option<String>,
    /// Primary amount, decimal string
    pub value: String,
    /// Secondary amount for batched native-token legs
    #[serde(default)]
    pub value2: Option<String>,
}

impl AssetAmounts {
    /// Native-asset transfers credit value unconditionally on the first
    /// message, which changes expiry semantics (see `DepositStatus`)
    pub fn is_native(&self) -> bool {
        self.token_address.is_none()
    }
}

/// Retryable-message data for the destination side of a bridge hop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryableInfo {
    /// Creation identifier of the destination-side message; used to locate
    /// the message for a manual re-execution
    pub ticket_id: Option<String>,
    /// Destination transaction that executed the message, once known
    pub destination_tx: Option<String>,
}

/// Outbound-message data for a withdrawal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundInfo {
    /// Position of the message in the outbox
    pub message_index: Option<u64>,
    /// Destination transaction that claimed the message, once known
    pub claim_tx: Option<String>,
}

/// Burn/attest/mint protocol data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationInfo {
    pub message_hash: Option<String>,
    pub message_bytes: Option<String>,
    pub attestation: Option<String>,
    /// Destination transaction that minted, once known
    pub receive_tx: Option<String>,
}

/// Per-side status reported by a third-party aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSideStatus {
    Pending,
    Success,
    Failure,
}

/// Route metadata from a third-party aggregator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Aggregator tool/route identifier
    pub tool: String,
    pub destination_tx: Option<String>,
}

/// Tagged variant combining protocol payload and protocol status.
///
/// `Standard` splits into `Deposit` and `Withdrawal`: the two directions run
/// entirely different state machines, and folding them into one enum would
/// reintroduce the presence checks this model exists to remove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum TransferKind {
    Deposit {
        status: DepositStatus,
        retryable: RetryableInfo,
    },
    Withdrawal {
        status: WithdrawalStatus,
        outbound: OutboundInfo,
    },
    Attested {
        status: AttestedStatus,
        attestation: AttestationInfo,
    },
    Teleport {
        leg1: DepositStatus,
        forwarder: ForwarderStatus,
        leg2: DepositStatus,
        leg1_retryable: RetryableInfo,
        /// The forwarder relay is its own retryable message on the
        /// intermediate chain, distinct from leg 1's
        #[serde(default)]
        forwarder_retryable: RetryableInfo,
        leg2_retryable: RetryableInfo,
    },
    Aggregated {
        source_status: RouteSideStatus,
        destination_status: RouteSideStatus,
        route: RouteInfo,
    },
}

impl TransferKind {
    pub fn variant(&self) -> Variant {
        match self {
            TransferKind::Deposit { .. } | TransferKind::Withdrawal { .. } => Variant::Standard,
            TransferKind::Attested { .. } => Variant::CrossAttested,
            TransferKind::Teleport { .. } => Variant::Teleport,
            TransferKind::Aggregated { .. } => Variant::Aggregated,
        }
    }
}

/// Sub-query classes used by the historical feed; each class has its own
/// server-side cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferClass {
    DepositsSent,
    DepositsReceived,
    WithdrawalsSent,
    WithdrawalsReceived,
    AttestedSent,
    AttestedReceived,
}

impl TransferClass {
    pub fn all() -> [TransferClass; 6] {
        [
            TransferClass::DepositsSent,
            TransferClass::DepositsReceived,
            TransferClass::WithdrawalsSent,
            TransferClass::WithdrawalsReceived,
            TransferClass::AttestedSent,
            TransferClass::AttestedReceived,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferClass::DepositsSent => "deposits_sent",
            TransferClass::DepositsReceived => "deposits_received",
            TransferClass::WithdrawalsSent => "withdrawals_sent",
            TransferClass::WithdrawalsReceived => "withdrawals_received",
            TransferClass::AttestedSent => "attested_sent",
            TransferClass::AttestedReceived => "attested_received",
        }
    }
}

impl std::fmt::Display for TransferClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tracked transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Source-chain transaction identifier; stable across refetches
    pub id: String,
    pub direction: Direction,
    pub source_chain_id: u64,
    pub destination_chain_id: u64,
    /// Hierarchy-relative ids: for withdrawals source/destination and
    /// child/parent diverge
    pub parent_chain_id: u64,
    pub child_chain_id: u64,
    pub sender: String,
    pub destination: String,
    pub asset: AssetAmounts,
    /// None until the source transaction is mined; treated as "now"
    pub created_at: Option<DateTime<Utc>>,
    /// Set when the transfer reached a terminal or claim-requiring state
    pub resolved_at: Option<DateTime<Utc>>,
    pub kind: TransferKind,
}

impl Transfer {
    pub fn variant(&self) -> Variant {
        self.kind.variant()
    }

    /// Creation time, defaulting to `now` for not-yet-mined transfers
    pub fn effective_created_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.created_at.unwrap_or(now)
    }

    /// Custom-recipient transfers change display obligations, not core logic
    pub fn is_custom_destination(&self) -> bool {
        !self.destination.eq_ignore_ascii_case(&self.sender)
    }

    /// Composite status for a teleport; None for other variants
    pub fn teleport_status(&self) -> Option<TeleportStatus> {
        match &self.kind {
            TransferKind::Teleport {
                leg1,
                forwarder,
                leg2,
                ..
            } => Some(TeleportStatus::derive(*leg1, *forwarder, *leg2)),
            _ => None,
        }
    }

    /// Whether the transfer has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        match &self.kind {
            TransferKind::Deposit { status, .. } => status.is_terminal(),
            TransferKind::Withdrawal { status, .. } => status.is_terminal(),
            TransferKind::Attested { status, .. } => status.is_terminal(),
            TransferKind::Teleport {
                leg1,
                forwarder,
                leg2,
                ..
            } => TeleportStatus::derive(*leg1, *forwarder, *leg2).is_terminal(),
            TransferKind::Aggregated {
                source_status,
                destination_status,
                ..
            } => {
                (*source_status == RouteSideStatus::Success
                    && *destination_status == RouteSideStatus::Success)
                    || *source_status == RouteSideStatus::Failure
                    || *destination_status == RouteSideStatus::Failure
            }
        }
    }

    /// Whether an aggregated transfer completed successfully on both sides
    pub fn aggregated_success(&self) -> Option<bool> {
        match &self.kind {
            TransferKind::Aggregated {
                source_status,
                destination_status,
                ..
            } => {
                if *source_status == RouteSideStatus::Failure
                    || *destination_status == RouteSideStatus::Failure
                {
                    Some(false)
                } else if *source_status == RouteSideStatus::Success
                    && *destination_status == RouteSideStatus::Success
                {
                    Some(true)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Apply the native-asset expiry rule in place: a pure native deposit
    /// never surfaces as expired because native value is credited by the
    /// first message regardless of second-message outcome
    pub fn normalize(&mut self) {
        let is_native = self.asset.is_native();
        match &mut self.kind {
            TransferKind::Deposit { status, .. } => {
                *status = status.normalized(is_native);
            }
            TransferKind::Teleport { leg1, leg2, .. } => {
                *leg1 = leg1.normalized(is_native);
                *leg2 = leg2.normalized(is_native);
            }
            _ => {}
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;

    #[test]
    fn test_variant_mapping() {
        let deposit = test_deposit("d1", DepositStatus::SrcPending);
        assert_eq!(deposit.variant(), Variant::Standard);

        let withdrawal = test_withdrawal("w1", WithdrawalStatus::Unconfirmed);
        assert_eq!(withdrawal.variant(), Variant::Standard);

        let attested = test_attested("a1", AttestedStatus::Pending);
        assert_eq!(attested.variant(), Variant::CrossAttested);
    }

    #[test]
    fn test_custom_destination() {
        let mut transfer = test_deposit("d1", DepositStatus::SrcPending);
        assert!(!transfer.is_custom_destination());
        transfer.destination = "0xother".to_string();
        assert!(transfer.is_custom_destination());
    }

    #[test]
    fn test_native_deposit_never_expires() {
        let mut transfer = test_deposit("d1", DepositStatus::Expired);
        transfer.asset.token_address = None;
        transfer.normalize();
        match transfer.kind {
            TransferKind::Deposit { status, .. } => {
                assert_eq!(status, DepositStatus::DstSuccess);
            }
            _ => panic!("expected deposit"),
        }
    }

    #[test]
    fn test_token_deposit_expiry_preserved() {
        let mut transfer = test_deposit("d1", DepositStatus::Expired);
        transfer.normalize();
        match transfer.kind {
            TransferKind::Deposit { status, .. } => {
                assert_eq!(status, DepositStatus::Expired);
            }
            _ => panic!("expected deposit"),
        }
    }

    #[test]
    fn test_aggregated_success_rules() {
        let mut transfer = test_deposit("d1", DepositStatus::SrcPending);
        transfer.kind = TransferKind::Aggregated {
            source_status: RouteSideStatus::Success,
            destination_status: RouteSideStatus::Pending,
            route: RouteInfo::default(),
        };
        assert_eq!(transfer.aggregated_success(), None);
        assert!(!transfer.is_terminal());

        transfer.kind = TransferKind::Aggregated {
            source_status: RouteSideStatus::Success,
            destination_status: RouteSideStatus::Success,
            route: RouteInfo::default(),
        };
        assert_eq!(transfer.aggregated_success(), Some(true));
        assert!(transfer.is_terminal());

        transfer.kind = TransferKind::Aggregated {
            source_status: RouteSideStatus::Success,
            destination_status: RouteSideStatus::Failure,
            route: RouteInfo::default(),
        };
        assert_eq!(transfer.aggregated_success(), Some(false));
        assert!(transfer.is_terminal());
    }

    #[test]
    fn test_serde_round_trip_tagged_variant() {
        let transfer = test_attested("a1", AttestedStatus::Confirmed);
        let json = serde_json::to_string(&transfer).unwrap();
        assert!(json.contains("\"variant\":\"attested\""));
        let back: Transfer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, transfer);
    }
}
