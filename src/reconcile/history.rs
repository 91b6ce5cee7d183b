//! Historical feed interface
//!
//! The indexer answers one independent sub-query per transfer class, each
//! with its own server-side cursor. The engine only ever asks for "the next
//! `page_size` records after the first `offset`" per class.

use async_trait::async_trait;

use crate::error::Result;
use crate::transfer::{Transfer, TransferClass};

/// Paginated historical transfer feed
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Stable identity of the underlying provider, including the chain pair
    /// it serves. Cursor state survives as long as this is unchanged; a
    /// same-account chain-pair swap on the same provider does not refetch.
    fn provider_id(&self) -> String;

    /// Fetch up to `page_size` records of one class, newest first, skipping
    /// the first `offset` records. A search string restricts the feed
    /// server-side.
    async fn query(
        &self,
        address: &str,
        class: TransferClass,
        offset: usize,
        page_size: usize,
        search: Option<&str>,
    ) -> Result<Vec<Transfer>>;
}
