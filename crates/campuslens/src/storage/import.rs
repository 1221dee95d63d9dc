//! Bulk import of CSV files into the data tables.
//!
//! An import replaces a table wholesale: the table is dropped, recreated with
//! every column as `TEXT`, filled from the CSV and logged, all inside one
//! transaction. A failure anywhere leaves the previous table untouched.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use rusqlite::{params, params_from_iter, Connection};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::migrations::initialize_schema;
use super::schema::{create_table_sql, drop_table_sql, insert_sql, Dataset};

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Table that was replaced.
    pub table: String,
    /// Number of rows written.
    pub rows: u64,
    /// Columns of the new table, in order.
    pub columns: Vec<String>,
}

/// One entry of the import log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRecord {
    /// Log entry id.
    pub id: i64,
    /// Table that was replaced.
    pub table_name: String,
    /// File the rows came from.
    pub source_path: String,
    /// Number of rows written.
    pub row_count: i64,
    /// When the import committed.
    pub imported_at: Option<DateTime<Utc>>,
}

/// Import the CSV file at `path` into the table for `dataset`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, has no header, or any
/// row fails to parse or insert. The existing table is kept on error.
pub fn import_csv(conn: &mut Connection, dataset: Dataset, path: &Path) -> Result<ImportSummary> {
    let file = File::open(path)?;
    import_reader(conn, dataset, file, &path.to_string_lossy())
}

/// Import CSV rows from `reader` into the table for `dataset`.
///
/// The profile table always gets its fixed columns; a fixed column absent from
/// the header imports as NULL and unknown header columns are ignored. Activity
/// and Wi-Fi tables take their columns from the header. Short rows fill their
/// missing cells with NULL.
///
/// # Errors
///
/// Returns [`Error::MissingHeader`] when the header has no columns, or a CSV
/// or database error. The existing table is kept on error.
pub fn import_reader<R: Read>(
    conn: &mut Connection,
    dataset: Dataset,
    reader: R,
    source: &str,
) -> Result<ImportSummary> {
    initialize_schema(conn)?;

    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(Error::MissingHeader {
            path: PathBuf::from(source),
        });
    }

    let columns = table_columns(dataset, &headers);
    let positions = column_positions(dataset, &columns, &headers);
    let table = dataset.table_name();

    debug!(
        "Importing {} into {} with columns {:?}",
        source, table, columns
    );

    let tx = conn.transaction()?;
    tx.execute(&drop_table_sql(table), [])?;
    tx.execute(&create_table_sql(table, &columns), [])?;

    let mut rows = 0_u64;
    {
        let mut insert = tx.prepare(&insert_sql(table, &columns))?;
        for record in rdr.records() {
            let record = record?;
            let values = positions
                .iter()
                .map(|position| position.and_then(|i| record.get(i)));
            insert.execute(params_from_iter(values))?;
            rows += 1;
        }
    }

    tx.execute(
        r"
        INSERT INTO import_log (table_name, source_path, row_count, imported_at)
        VALUES (?1, ?2, ?3, ?4)
        ",
        params![
            table,
            source,
            i64::try_from(rows).unwrap_or(i64::MAX),
            Utc::now().to_rfc3339()
        ],
    )?;
    tx.commit()?;

    info!("Imported {} rows into {} from {}", rows, table, source);
    Ok(ImportSummary {
        table: table.to_string(),
        rows,
        columns,
    })
}

/// The most recent imports, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn recent_imports(conn: &Connection, limit: usize) -> Result<Vec<ImportRecord>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, table_name, source_path, row_count, imported_at
        FROM import_log ORDER BY id DESC LIMIT ?1
        ",
    )?;

    let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
    let records = stmt
        .query_map([limit_i64], |row| {
            let imported_at: String = row.get(4)?;
            Ok(ImportRecord {
                id: row.get(0)?,
                table_name: row.get(1)?,
                source_path: row.get(2)?,
                row_count: row.get(3)?,
                imported_at: parse_imported_at(&imported_at),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}

fn parse_imported_at(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => {
            warn!("Unreadable import timestamp: {}", raw);
            None
        }
    }
}

/// Columns of the table to create.
///
/// Blank header names become `column_<n>` so every column can be quoted.
fn table_columns(dataset: Dataset, headers: &[String]) -> Vec<String> {
    match dataset.fixed_columns() {
        Some(fixed) => fixed.iter().map(ToString::to_string).collect(),
        None => headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                if header.is_empty() {
                    format!("column_{}", i + 1)
                } else {
                    header.clone()
                }
            })
            .collect(),
    }
}

/// Where each table column sits in a CSV record, if anywhere.
///
/// Header-derived tables map one to one. Fixed columns are looked up by name;
/// a duplicated header name keeps its first position.
fn column_positions(dataset: Dataset, columns: &[String], headers: &[String]) -> Vec<Option<usize>> {
    if dataset.fixed_columns().is_none() {
        return (0..columns.len()).map(Some).collect();
    }

    let mut by_name: HashMap<&str, usize> = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        by_name.entry(header.as_str()).or_insert(i);
    }

    columns
        .iter()
        .map(|column| by_name.get(column.as_str()).copied())
        .collect()
}
