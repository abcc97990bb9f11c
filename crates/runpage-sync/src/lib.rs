//! Activity synchronisation for runpage.
//!
//! Ties the store and the geocoder together:
//!
//! - [`upsert_activity`] creates a row the first time a `run_id` is seen
//!   (resolving its location once) and afterwards only refreshes the mutable
//!   fields.
//! - [`import_activities`] runs the upserter over a batch, logging and
//!   counting per-record failures instead of aborting.
//! - [`export_activities`] writes every stored activity, annotated with
//!   running streaks, as the JSON document the web front end loads.

pub mod config;
mod error;
mod import;
mod upsert;

pub use error::SyncError;
pub use import::{export_activities, import_activities, load_export, read_activities, ImportSummary};
pub use upsert::{upsert_activity, SyncOptions, UpsertOutcome};
