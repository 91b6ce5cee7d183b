//! Chain registry: hierarchy, block times and confirmation parameters
//!
//! All protocol time constants used by status derivation and duration
//! estimation live here as data, so adding a chain never touches the
//! state machines.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Production vs test network class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkClass {
    Mainnet,
    Testnet,
}

impl NetworkClass {
    /// Blocks of the base chain that must elapse before an attestation is
    /// issued. Protocol minimum plus a ~30% safety margin.
    pub fn attestation_confirmation_blocks(&self) -> u64 {
        match self {
            NetworkClass::Mainnet => 85, // documented minimum 65
            NetworkClass::Testnet => 7,  // documented minimum 5
        }
    }
}

/// One-time protocol upgrade that retroactively extended the challenge period
/// for not-yet-confirmed withdrawals
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChallengePeriodReset {
    /// When the upgrade activated
    pub upgrade_time: DateTime<Utc>,
    /// Challenge period in effect after the upgrade, in seconds
    pub new_period_secs: i64,
}

/// Static description of one chain in the hierarchy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub id: u64,
    pub name: String,
    pub network: NetworkClass,
    /// Parent in the rollup hierarchy; None for a base chain
    pub parent_chain_id: Option<u64>,
    /// Average seconds per block on this chain
    pub block_time_secs: f64,
    /// Challenge period for outbound messages leaving this chain, in blocks
    /// of the base chain; None for base chains
    pub challenge_period_blocks: Option<u64>,
    /// Set when this chain went through a challenge-period reset upgrade
    #[serde(default)]
    pub challenge_period_reset: Option<ChallengePeriodReset>,
}

lazy_static! {
    static ref DEFAULT_CHAINS: Vec<ChainInfo> = vec![
        ChainInfo {
            id: 1,
            name: "mainnet".to_string(),
            network: NetworkClass::Mainnet,
            parent_chain_id: None,
            block_time_secs: 12.0,
            challenge_period_blocks: None,
            challenge_period_reset: None,
        },
        ChainInfo {
            id: 42161,
            name: "rollup-one".to_string(),
            network: NetworkClass::Mainnet,
            parent_chain_id: Some(1),
            block_time_secs: 0.25,
            challenge_period_blocks: Some(45818),
            challenge_period_reset: None,
        },
        ChainInfo {
            id: 660279,
            name: "orbit-one".to_string(),
            network: NetworkClass::Mainnet,
            parent_chain_id: Some(42161),
            block_time_secs: 0.25,
            challenge_period_blocks: Some(45818),
            challenge_period_reset: None,
        },
        ChainInfo {
            id: 11155111,
            name: "testnet".to_string(),
            network: NetworkClass::Testnet,
            parent_chain_id: None,
            block_time_secs: 12.0,
            challenge_period_blocks: None,
            challenge_period_reset: None,
        },
        ChainInfo {
            id: 421614,
            name: "rollup-testnet".to_string(),
            network: NetworkClass::Testnet,
            parent_chain_id: Some(11155111),
            block_time_secs: 0.25,
            challenge_period_blocks: Some(300),
            challenge_period_reset: None,
        },
        ChainInfo {
            id: 37714555429,
            name: "orbit-testnet".to_string(),
            network: NetworkClass::Testnet,
            parent_chain_id: Some(421614),
            block_time_secs: 0.25,
            challenge_period_blocks: Some(300),
            challenge_period_reset: None,
        },
    ];
}

/// Registry of known chains and their hierarchy
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<u64, ChainInfo>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CHAINS.clone())
    }
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainInfo>) -> Self {
        Self {
            chains: chains.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Add or replace a chain description
    pub fn insert(&mut self, chain: ChainInfo) {
        self.chains.insert(chain.id, chain);
    }

    pub fn get(&self, chain_id: u64) -> Result<&ChainInfo> {
        self.chains
            .get(&chain_id)
            .ok_or(Error::UnknownChain(chain_id))
    }

    pub fn network_class(&self, chain_id: u64) -> Result<NetworkClass> {
        Ok(self.get(chain_id)?.network)
    }

    /// Walk up to the root of the hierarchy
    pub fn base_chain_of(&self, chain_id: u64) -> Result<&ChainInfo> {
        let mut current = self.get(chain_id)?;
        while let Some(parent_id) = current.parent_chain_id {
            current = self.get(parent_id)?;
        }
        Ok(current)
    }

    /// A chain is third-level ("orbit") when its parent is itself a rollup
    pub fn is_orbit(&self, chain_id: u64) -> Result<bool> {
        let chain = self.get(chain_id)?;
        match chain.parent_chain_id {
            Some(parent_id) => Ok(self.get(parent_id)?.parent_chain_id.is_some()),
            None => Ok(false),
        }
    }

    /// Seconds of base-chain time before an attestation for a burn on
    /// `source_chain_id` becomes available
    pub fn attestation_confirmation_secs(&self, source_chain_id: u64) -> Result<i64> {
        let base = self.base_chain_of(source_chain_id)?;
        let blocks = base.network.attestation_confirmation_blocks();
        Ok((blocks as f64 * base.block_time_secs) as i64)
    }

    /// Seconds before an outbound message leaving `source_chain_id` becomes
    /// claimable: challenge period in base-chain blocks times base block
    /// time, a 1.8x multiplier for orbit chains (their confirmation delay is
    /// inherited from the base chain, not the immediate parent), plus a
    /// fixed buffer.
    pub fn withdrawal_confirmation_secs(&self, source_chain_id: u64) -> Result<i64> {
        let source = self.get(source_chain_id)?;
        let blocks = source
            .challenge_period_blocks
            .ok_or_else(|| Error::StaleComputation(format!(
                "chain {} has no challenge period",
                source_chain_id
            )))?;
        let base = self.base_chain_of(source_chain_id)?;
        let multiplier = if self.is_orbit(source_chain_id)? {
            ORBIT_CONFIRMATION_BUFFER
        } else {
            1.0
        };
        let period = blocks as f64 * base.block_time_secs * multiplier;
        Ok(period as i64 + FIXED_CONFIRMATION_BUFFER_MINUTES * 60)
    }
}

/// Extra multiplier applied to withdrawals leaving an orbit chain
pub const ORBIT_CONFIRMATION_BUFFER: f64 = 1.8;

/// Fixed buffer added on top of every withdrawal confirmation estimate
pub const FIXED_CONFIRMATION_BUFFER_MINUTES: i64 = 30;
