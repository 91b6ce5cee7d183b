//! Reconciliation of local, historical and attested transfer records

pub mod engine;
pub mod history;
pub mod store;

pub use engine::{Page, PageRequest, ReconciliationEngine, RoleFilter};
pub use history::HistoryProvider;
pub use store::LocalStore;
