//! External collaborator interfaces for recovery actions
//!
//! Implementations live with the host: a wallet-backed chain client and the
//! off-chain attestation service. Implementations map a wallet-rejected
//! signature to `Error::UserCancelled` and a revert/broadcast failure to
//! `Error::SubmissionFailed`.

use async_trait::async_trait;

use crate::error::Result;

/// Wallet-backed chain client used to submit recovery transactions
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain the wallet is currently connected to
    async fn connected_chain_id(&self) -> Result<u64>;

    /// Re-execute a retryable message located by its creation identifier.
    /// Returns the executing transaction hash.
    async fn redeem_retryable(&self, chain_id: u64, ticket_id: &str) -> Result<String>;

    /// Execute a confirmed outbound message. Returns the claiming
    /// transaction hash.
    async fn execute_outbound(&self, chain_id: u64, message_index: u64) -> Result<String>;
}

/// Off-chain attestation service for burn/attest/mint transfers
#[async_trait]
pub trait AttestationService: Send + Sync {
    /// Block until the attestation for a burn message is available
    async fn wait_for_attestation(&self, message_hash: &str) -> Result<String>;

    /// Submit the destination-side receive transaction. Returns the mint
    /// transaction hash.
    async fn submit_receive(
        &self,
        chain_id: u64,
        message_bytes: &str,
        attestation: &str,
    ) -> Result<String>;
}
