//! Transfer model: tagged variants and per-variant state machines

pub mod model;
pub mod status;
pub mod teleport;

pub use model::{
    AssetAmounts, AttestationInfo, Direction, OutboundInfo, RetryableInfo, RouteInfo,
    RouteSideStatus, Transfer, TransferClass, TransferKind, Variant,
};
pub use status::{AttestedStatus, DepositStatus, WithdrawalStatus};
pub use teleport::{ForwarderStatus, TeleportStatus};
