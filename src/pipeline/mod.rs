//! Pipeline entry points for list synchronization.
//!
//! - `build_index`: Index catalog seasons for episode lookup
//! - `plan` / `ListReconciler`: Partition matches and submit additions
//! - `run_sync`: Synchronize one show and episode type
//! - `run_sync_all`: Synchronize every configured show
//! - `run_list_lists` / `run_delete`: Inspect and remove synced lists

pub mod index;
pub mod lists;
pub mod reconcile;
pub mod sync;

pub use index::{CatalogIndex, IndexBuilder, build_index};
pub use lists::{ListFilter, UserList, run_delete, run_list_lists};
pub use reconcile::{
    BatchResponse, ListReconciler, ListWriter, ReconcileOptions, ReconcilePlan, plan,
};
pub use sync::{SyncContext, SyncOutcome, SyncRequest, run_sync, run_sync_all};
