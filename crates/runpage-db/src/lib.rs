//! Database layer for runpage.
//!
//! Provides the SQLite connection manager ([`init`]), additive schema
//! migration, and the row operations behind the activity upserter.
//!
//! # Design decisions
//!
//! - **One file, one connection**: imports run sequentially, so a single
//!   `rusqlite::Connection` is handed to the caller instead of a pool.
//! - **Additive migrations only**: the declared [`ACTIVITIES_TABLE`] is the
//!   source of truth. Columns present in the declaration but missing from the
//!   live table are added with `ALTER TABLE ... ADD COLUMN`; nothing is ever
//!   dropped or renamed, and no schema version is tracked.

mod activities;
mod connection;
mod error;
mod schema;

pub use activities::{
    activity_exists, count_activities, find_activity, insert_activity, load_activities, update_activity,
};
pub use connection::{init, init_with_settings, open_connection, DbRuntimeSettings};
pub use error::DbError;
pub use schema::{live_columns, migrate_table, ColumnDef, TableDef, ACTIVITIES_TABLE};
