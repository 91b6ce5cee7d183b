//! Multi-source reconciliation
//!
//! Produces one ordered, deduplicated page from the historical feed (one
//! sub-query per class, fanned out concurrently), the local overlay and the
//! attestation poll's in-place updates. Per-class running offsets are the
//! only engine state; they reset when the address or the provider identity
//! changes and survive everything else.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::PaginationConfig;
use crate::error::Result;
use crate::reconcile::history::HistoryProvider;
use crate::reconcile::store::LocalStore;
use crate::transfer::{Transfer, TransferClass};

/// Post-merge filter on the connected account's relation to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleFilter {
    Sent,
    Received,
}

/// One unified page request from the UI layer
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub address: String,
    /// Zero-based unified page index
    pub page: usize,
    pub page_size: usize,
    pub search: Option<String>,
    pub role_filter: Option<RoleFilter>,
}

/// One merged page
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Transfer>,
    /// Classes whose sub-query failed this page; the rest of the page is
    /// still valid
    pub class_errors: Vec<(TransferClass, String)>,
}

/// Cursor identity: cursors are only meaningful for one address on one
/// provider
#[derive(Debug, Clone, PartialEq, Eq)]
struct CursorKey {
    address: String,
    provider_id: String,
}

#[derive(Debug, Default)]
struct CursorState {
    key: Option<CursorKey>,
    /// Records consumed so far per class, across page turns
    fetched_so_far: HashMap<TransferClass, usize>,
}

/// Merges local, historical and attested records into one feed
pub struct ReconciliationEngine {
    provider: Arc<dyn HistoryProvider>,
    store: Arc<LocalStore>,
    config: PaginationConfig,
    state: RwLock<CursorState>,
}

impl ReconciliationEngine {
    pub fn new(
        provider: Arc<dyn HistoryProvider>,
        store: Arc<LocalStore>,
        config: PaginationConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            state: RwLock::new(CursorState::default()),
        }
    }

    /// Drop all cursor state; the next page starts from the top
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.key = None;
        state.fetched_so_far.clear();
    }

    /// Assemble one unified page
    pub async fn get_page(&self, request: &PageRequest) -> Result<Page> {
        let page_size = if request.page_size == 0 {
            self.config.page_size
        } else {
            request.page_size
        };
        let address = request.address.to_ascii_lowercase();
        let key = CursorKey {
            address: address.clone(),
            provider_id: self.provider.provider_id(),
        };
        let search = request.search.as_deref().filter(|s| !s.is_empty());

        // arm the cursors for this identity, resetting on change
        let offsets: HashMap<TransferClass, usize> = {
            let mut state = self.state.write().await;
            if state.key.as_ref() != Some(&key) {
                debug!("Cursor identity changed, resetting per-class offsets");
                state.key = Some(key.clone());
                state.fetched_so_far.clear();
            }
            TransferClass::all()
                .iter()
                .map(|class| (*class, *state.fetched_so_far.get(class).unwrap_or(&0)))
                .collect()
        };

        // fan out one sub-query per class and join
        let queries = TransferClass::all().map(|class| {
            let provider = self.provider.clone();
            let address = address.clone();
            let offset = offsets[&class];
            async move {
                let result = provider
                    .query(&address, class, offset, page_size, search)
                    .await;
                (class, result)
            }
        });
        let results = join_all(queries).await;

        let now = Utc::now();
        let mut fetched: Vec<(TransferClass, Transfer)> = Vec::new();
        let mut class_errors = Vec::new();
        for (class, result) in results {
            match result {
                Ok(records) => {
                    for mut transfer in records {
                        transfer.normalize();
                        fetched.push((class, transfer));
                    }
                }
                Err(e) => {
                    warn!("Sub-query for class {} failed: {}", class, e);
                    class_errors.push((class, e.to_string()));
                }
            }
        }

        // merge and order newest-first, deterministically: ties on creation
        // time break on id so fan-out order never shows through
        fetched.sort_by(|(_, a), (_, b)| {
            b.effective_created_at(now)
                .cmp(&a.effective_created_at(now))
                .then_with(|| a.id.cmp(&b.id))
        });

        // the historical slice is the top page_size records; per-class
        // consumption is counted before dedup so cursors advance past every
        // record this page covered
        let slice_len = fetched.len().min(page_size);
        let mut consumed: HashMap<TransferClass, usize> = HashMap::new();
        for (class, _) in &fetched[..slice_len] {
            *consumed.entry(*class).or_insert(0) += 1;
        }

        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut items: Vec<Transfer> = Vec::new();
        for (_, transfer) in fetched.into_iter().take(slice_len) {
            if seen_ids.insert(transfer.id.clone()) {
                items.push(transfer);
            }
        }

        // local overlay is a page-1 convenience, never a search target
        if request.page == 0 && search.is_none() {
            let local = self.store.get(&address).await;
            items = prepend_fresh_local(items, local, now);
        }

        // overlay richer local copies so in-flight status changes show up
        // without waiting for the next indexer poll
        for item in items.iter_mut() {
            if let Some(local) = self.store.get_by_id(&address, &item.id).await {
                *item = local;
            }
        }

        // advance cursors under the same lock that re-validates the
        // identity: results assembled under a key that is no longer current
        // are discarded, never returned
        {
            let mut state = self.state.write().await;
            if state.key.as_ref() != Some(&key) {
                debug!("Discarding stale page for {}", key.address);
                return Err(crate::error::Error::StaleRequest);
            }
            for (class, count) in consumed {
                *state.fetched_so_far.entry(class).or_insert(0) += count;
            }
        }

        if let Some(filter) = request.role_filter {
            items.retain(|t| match filter {
                RoleFilter::Sent => t.sender.eq_ignore_ascii_case(&address),
                RoleFilter::Received => !t.sender.eq_ignore_ascii_case(&address),
            });
        }

        Ok(Page { items, class_errors })
    }
}

/// Prepend local-overlay entries strictly newer than the oldest historical
/// item, most-recent-first, without duplicating anything the indexer already
/// surfaced. An empty historical slice arms the scan with a far-past
/// fallback so fresh local transfers are never suppressed.
fn prepend_fresh_local(
    historical: Vec<Transfer>,
    local: Vec<Transfer>,
    now: DateTime<Utc>,
) -> Vec<Transfer> {
    let oldest_historical: DateTime<Utc> = historical
        .last()
        .map(|t| t.effective_created_at(now))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let known_ids: HashSet<&str> = historical.iter().map(|t| t.id.as_str()).collect();
    let known_times: HashSet<i64> = historical
        .iter()
        .filter_map(|t| t.created_at.map(|c| c.timestamp_millis()))
        .collect();

    let mut fresh: Vec<Transfer> = local
        .into_iter()
        .filter(|t| t.effective_created_at(now) > oldest_historical)
        .filter(|t| !known_ids.contains(t.id.as_str()))
        // ids can differ across sources for the same logical event; equal
        // creation time is the dedup fallback
        .filter(|t| {
            t.created_at
                .map(|c| !known_times.contains(&c.timestamp_millis()))
                .unwrap_or(true)
        })
        .collect();
    fresh.sort_by(|a, b| {
        b.effective_created_at(now)
            .cmp(&a.effective_created_at(now))
            .then_with(|| a.id.cmp(&b.id))
    });

    fresh.extend(historical);
    fresh
}
