//! Two-hop composite transfers
//!
//! A teleport owns two deposit-style legs (base -> intermediate,
//! intermediate -> destination) plus a forwarder message on the intermediate
//! chain that relays funds onward. The composite status is never more
//! complete than the less-complete leg.

use serde::{Deserialize, Serialize};

use super::status::DepositStatus;

/// Status of the intermediate forwarder message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwarderStatus {
    Pending,
    Executed,
    /// Requires its own recovery action before leg 2 can be considered
    Failed,
}

/// Composite status of a teleport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeleportStatus {
    /// Leg 1 failed; leg 2 never starts
    Failed,
    /// Leg 1 still in flight
    Leg1Pending,
    /// Leg 1 executed but the forwarder message needs retrying
    Leg1Blocked,
    /// Leg 1 and forwarder done, leg 2 in flight (includes leg-2 retryable
    /// failures, which the recovery workflow handles like any deposit)
    Leg2Pending,
    /// Both legs executed
    Completed,
}

impl TeleportStatus {
    pub fn derive(
        leg1: DepositStatus,
        forwarder: ForwarderStatus,
        leg2: DepositStatus,
    ) -> TeleportStatus {
        // a terminal-failed leg fails the composite regardless of how far
        // the other leg got
        if matches!(leg2, DepositStatus::SrcFailure | DepositStatus::Expired) {
            return TeleportStatus::Failed;
        }
        match leg1 {
            DepositStatus::SrcFailure | DepositStatus::Expired => TeleportStatus::Failed,
            DepositStatus::DstSuccess => match forwarder {
                ForwarderStatus::Failed => TeleportStatus::Leg1Blocked,
                ForwarderStatus::Pending => TeleportStatus::Leg1Pending,
                ForwarderStatus::Executed => match leg2 {
                    DepositStatus::DstSuccess => TeleportStatus::Completed,
                    _ => TeleportStatus::Leg2Pending,
                },
            },
            _ => TeleportStatus::Leg1Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TeleportStatus::Failed | TeleportStatus::Completed)
    }

    /// Completeness on the same scale as `DepositStatus::completeness`
    pub fn completeness(&self) -> u8 {
        match self {
            TeleportStatus::Failed => 0,
            TeleportStatus::Leg1Pending => 1,
            TeleportStatus::Leg1Blocked => 2,
            TeleportStatus::Leg2Pending => 3,
            TeleportStatus::Completed => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg1_failure_fails_whole_transfer() {
        let status = TeleportStatus::derive(
            DepositStatus::SrcFailure,
            ForwarderStatus::Pending,
            DepositStatus::SrcPending,
        );
        assert_eq!(status, TeleportStatus::Failed);
    }

    #[test]
    fn test_forwarder_failure_blocks_leg2() {
        let status = TeleportStatus::derive(
            DepositStatus::DstSuccess,
            ForwarderStatus::Failed,
            DepositStatus::SrcPending,
        );
        assert_eq!(status, TeleportStatus::Leg1Blocked);
    }

    #[test]
    fn test_leg1_success_requires_forwarder_execution() {
        let status = TeleportStatus::derive(
            DepositStatus::DstSuccess,
            ForwarderStatus::Pending,
            DepositStatus::SrcPending,
        );
        assert_eq!(status, TeleportStatus::Leg1Pending);
    }

    #[test]
    fn test_leg2_failure_fails_whole_transfer() {
        // leg 2 can read as failed while leg 1 is still in flight (stale or
        // reordered feed data); the composite must not look like progress
        let status = TeleportStatus::derive(
            DepositStatus::SrcPending,
            ForwarderStatus::Pending,
            DepositStatus::SrcFailure,
        );
        assert_eq!(status, TeleportStatus::Failed);

        let status = TeleportStatus::derive(
            DepositStatus::DstSuccess,
            ForwarderStatus::Pending,
            DepositStatus::Expired,
        );
        assert_eq!(status, TeleportStatus::Failed);
    }

    #[test]
    fn test_completed_requires_both_legs() {
        let status = TeleportStatus::derive(
            DepositStatus::DstSuccess,
            ForwarderStatus::Executed,
            DepositStatus::DstSuccess,
        );
        assert_eq!(status, TeleportStatus::Completed);
    }

    #[test]
    fn test_composite_never_more_complete_than_either_leg() {
        // coarse progress level shared by legs and composite:
        // 0 failed, 1 in flight, 2 done
        fn leg_level(status: DepositStatus) -> u8 {
            match status {
                DepositStatus::SrcFailure | DepositStatus::Expired => 0,
                DepositStatus::DstSuccess => 2,
                _ => 1,
            }
        }
        fn composite_level(status: TeleportStatus) -> u8 {
            match status {
                TeleportStatus::Failed => 0,
                TeleportStatus::Completed => 2,
                _ => 1,
            }
        }

        // exhaustive over both legs and forwarder states
        let all_deposit = [
            DepositStatus::SrcPending,
            DepositStatus::SrcFailure,
            DepositStatus::DstPending,
            DepositStatus::DstSuccess,
            DepositStatus::DstFailure,
            DepositStatus::CreationFailed,
            DepositStatus::Expired,
        ];
        let all_forwarder = [
            ForwarderStatus::Pending,
            ForwarderStatus::Executed,
            ForwarderStatus::Failed,
        ];
        for leg1 in all_deposit {
            for forwarder in all_forwarder {
                for leg2 in all_deposit {
                    let composite = TeleportStatus::derive(leg1, forwarder, leg2);
                    let min_leg = leg_level(leg1).min(leg_level(leg2));
                    assert!(
                        composite_level(composite) <= min_leg
                            || composite == TeleportStatus::Failed,
                        "composite {:?} outran legs {:?}/{:?}",
                        composite,
                        leg1,
                        leg2
                    );
                }
            }
        }
    }
}
