//! Declared table layout and additive column migration.
//!
//! Tables are declared as static [`TableDef`]s. [`migrate_table`] creates a
//! table if it does not exist and otherwise adds whichever declared columns
//! the live table lacks. Existing columns are never altered.

use rusqlite::Connection;

use crate::error::DbError;

/// A declared column: name plus the SQL type used when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
}

impl ColumnDef {
    const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
        }
    }

    const fn primary_key(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: true,
        }
    }
}

/// A declared table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

/// The `activities` table, one row per tracked exercise session.
pub const ACTIVITIES_TABLE: TableDef = TableDef {
    name: "activities",
    columns: &[
        ColumnDef::primary_key("run_id", "INTEGER"),
        ColumnDef::new("name", "VARCHAR"),
        ColumnDef::new("distance", "FLOAT"),
        ColumnDef::new("moving_time", "VARCHAR"),
        ColumnDef::new("elapsed_time", "VARCHAR"),
        ColumnDef::new("type", "VARCHAR"),
        ColumnDef::new("start_date", "VARCHAR"),
        ColumnDef::new("start_date_local", "VARCHAR"),
        ColumnDef::new("location_country", "VARCHAR"),
        ColumnDef::new("summary_polyline", "VARCHAR"),
        ColumnDef::new("average_heartrate", "FLOAT"),
        ColumnDef::new("average_speed", "FLOAT"),
        ColumnDef::new("elevation_gain", "FLOAT"),
        ColumnDef::new("source", "VARCHAR"),
    ],
};

impl TableDef {
    fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                if col.primary_key {
                    format!("\"{}\" {} NOT NULL PRIMARY KEY", col.name, col.sql_type)
                } else {
                    format!("\"{}\" {}", col.name, col.sql_type)
                }
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
            self.name,
            columns.join(",\n    ")
        )
    }
}

/// Returns the column names of the live table, in table order.
///
/// An absent table yields an empty list.
///
/// # Errors
///
/// Returns `DbError::Query` on SQL failure.
pub fn live_columns(conn: &Connection, table: &str) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;

    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Creates `table` if absent, then adds every declared column missing from
/// the live table. Returns the names of the added columns.
///
/// All statements run in one transaction, so a failure leaves the table as
/// it was.
///
/// # Errors
///
/// Returns `DbError::Schema` if any DDL statement fails.
pub fn migrate_table(conn: &Connection, table: &TableDef) -> Result<Vec<&'static str>, DbError> {
    let schema_err = |source| DbError::Schema {
        table: table.name.to_string(),
        source,
    };

    let tx = conn.unchecked_transaction().map_err(schema_err)?;

    tx.execute_batch(&table.create_sql()).map_err(schema_err)?;

    let existing = live_columns(&tx, table.name).map_err(|e| match e {
        DbError::Query(source) => schema_err(source),
        other => other,
    })?;

    let mut added = Vec::new();
    for column in table.columns {
        if existing.iter().any(|name| name.eq_ignore_ascii_case(column.name)) {
            continue;
        }

        tracing::info!(
            table = table.name,
            column = column.name,
            sql_type = column.sql_type,
            "adding missing column"
        );
        tx.execute_batch(&format!(
            "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
            table.name, column.name, column.sql_type
        ))
        .map_err(schema_err)?;
        added.push(column.name);
    }

    tx.commit().map_err(schema_err)?;

    Ok(added)
}
