//! Cross-chain Transfer Tracker Library
//!
//! Tracks asset transfers across a rollup hierarchy: status derivation,
//! duration estimates, recovery actions (retry/claim) and reconciliation
//! of local, historical and attested transfer records into one feed.

pub mod attestation;
pub mod chain;
pub mod config;
pub mod duration;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod recovery;
pub mod transfer;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
