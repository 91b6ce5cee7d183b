//! Chain hierarchy registry

pub mod registry;

pub use registry::{ChainInfo, ChainRegistry, ChallengePeriodReset, NetworkClass};
