//! `SQLite` schema definitions for campuslens.
//!
//! The three data tables have no fixed DDL: they are dropped and recreated by
//! every import from the CSV header, with every column stored as `TEXT`. This
//! module holds the bookkeeping tables that do have fixed DDL, the dataset
//! definitions, and the helpers that build import DDL/DML safely.

use std::fmt;

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the import log.
pub const CREATE_IMPORT_LOG_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS import_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name TEXT NOT NULL,
    source_path TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    imported_at TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_METADATA_TABLE, CREATE_IMPORT_LOG_TABLE];

/// Name of the profile table.
pub const PROFILE_TABLE: &str = "profile";

/// Name of the activity table.
pub const ACTIVITY_TABLE: &str = "data";

/// Name of the Wi-Fi association table.
pub const WIFI_TABLE: &str = "wifi";

/// Fixed column layout of the profile table.
pub const PROFILE_COLUMNS: &[&str] = &[
    "entity_id",
    "name",
    "role",
    "email",
    "department",
    "card_id",
    "device_hash",
    "face_id",
    "person_id",
];

/// A table that can be bulk-imported from CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// `profile`: fixed columns, see [`PROFILE_COLUMNS`].
    Profile,
    /// `data`: activity events, columns taken from the CSV header.
    Activity,
    /// `wifi`: device-network joins, columns taken from the CSV header.
    Wifi,
}

impl Dataset {
    /// The table this dataset is stored in.
    #[must_use]
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Profile => PROFILE_TABLE,
            Self::Activity => ACTIVITY_TABLE,
            Self::Wifi => WIFI_TABLE,
        }
    }

    /// Explicit columns, or `None` when they come from the CSV header.
    #[must_use]
    pub fn fixed_columns(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Profile => Some(PROFILE_COLUMNS),
            Self::Activity | Self::Wifi => None,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Quote an identifier for use in generated SQL.
#[must_use]
pub fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `DROP TABLE` statement for `table`.
#[must_use]
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// `CREATE TABLE` statement with every column as `TEXT`.
#[must_use]
pub fn create_table_sql(table: &str, columns: &[String]) -> String {
    let columns = columns
        .iter()
        .map(|column| format!("{} TEXT", quote_ident(column)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({columns})", quote_ident(table))
}

/// Parameterized `INSERT` statement for `table`.
#[must_use]
pub fn insert_sql(table: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
        quote_ident(table)
    )
}
