//! Shared model and merge logic for the ads dashboard.
//!
//! Nothing in here performs I/O:
//! - `model`: `AdRecord` plus the Graph API rows it is built from
//! - `metric`: lenient numeric parsing (missing / null / garbage -> 0)
//! - `merge`: reconcile the ad listing with insight rows
//! - `upsert`: plan the name-keyed spreadsheet merge
//! - `totals`: dashboard KPIs

pub mod merge;
pub mod metric;
pub mod model;
pub mod totals;
pub mod upsert;

pub use merge::{index_insights, merge_listing, BatchSummary};
pub use model::{AdRecord, AdStatus, Creative, CreativeAsset, Insight, ListedAd};
pub use totals::Totals;
pub use upsert::{plan_upsert, RowUpdate, SheetRow, SyncContext, UpsertPlan};
