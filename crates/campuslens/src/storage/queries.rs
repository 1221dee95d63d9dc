//! Read-only queries behind the HTTP API.
//!
//! Every function takes a plain connection so it can run on a pooled
//! connection inside a blocking task, or on an in-memory database in tests.
//! Caller input only ever reaches SQL through bound parameters.

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, Row};

use crate::error::Result;
use crate::model::{ActivityEvent, AppearanceRow, LocationVisits, PersonFirstSeen, Profile, Record};
use crate::ranking::{first_appearances, TOP_LOCATIONS_LIMIT, TOP_PERSONS_LIMIT};

use super::schema::{quote_ident, ACTIVITY_TABLE};

const PROFILE_SELECT: &str = r"
SELECT entity_id, name, role, email, department, card_id, device_hash, face_id, person_id
FROM profile
";

const TIMELINE_SELECT: &str = r"
SELECT entity_id, person_id, room_id, timestamp, hour, day, weekday, next_room
FROM data WHERE person_id = ?1
";

/// Trim a request parameter, treating blank values as absent.
#[must_use]
pub fn normalize_param(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Parameters of an activity timeline lookup.
///
/// `start` and `end` are inclusive and compared with `timestamp` as raw
/// strings, so they only filter correctly when the stored timestamps and the
/// bounds share a layout whose string order is chronological.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineQuery {
    /// Person to fetch events for.
    pub person_id: String,
    /// Inclusive lower bound on the raw timestamp.
    pub start: Option<String>,
    /// Inclusive upper bound on the raw timestamp.
    pub end: Option<String>,
}

impl TimelineQuery {
    /// Build a query from raw request parameters.
    ///
    /// Returns `None` when `person_id` is missing or blank.
    #[must_use]
    pub fn new(person_id: Option<&str>, start: Option<&str>, end: Option<&str>) -> Option<Self> {
        Some(Self {
            person_id: normalize_param(person_id)?,
            start: normalize_param(start),
            end: normalize_param(end),
        })
    }
}

/// Fetch every profile.
///
/// # Errors
///
/// Returns an error if the query fails (for example before the first import).
pub fn list_profiles(conn: &Connection) -> Result<Vec<Profile>> {
    let mut stmt = conn.prepare(PROFILE_SELECT)?;
    let profiles = stmt
        .query_map([], row_to_profile)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(profiles)
}

/// Fetch every row of `table` as column-name keyed records.
///
/// `table` must be one of the known table names, never caller input.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_records(conn: &Connection, table: &str) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(ToString::to_string)
        .collect();

    let records = stmt
        .query_map([], |row| {
            let mut record = Record::new();
            for (i, column) in columns.iter().enumerate() {
                record.insert(column.clone(), value_to_json(row.get_ref(i)?));
            }
            Ok(record)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Fetch every activity row.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_activity(conn: &Connection) -> Result<Vec<Record>> {
    list_records(conn, ACTIVITY_TABLE)
}

/// Count distinct non-null `person_id` values in `profile`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_unique_persons(conn: &Connection) -> Result<i64> {
    let count: Option<i64> = conn.query_row(
        "SELECT COUNT(DISTINCT person_id) FROM profile",
        [],
        |row| row.get(0),
    )?;
    Ok(count.unwrap_or(0))
}

/// Count distinct device hashes in `wifi`, ignoring null and empty values.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_unique_device_hashes(conn: &Connection) -> Result<i64> {
    let count: Option<i64> = conn.query_row(
        r"
        SELECT COUNT(DISTINCT device_hash) FROM wifi
        WHERE device_hash IS NOT NULL AND device_hash <> ''
        ",
        [],
        |row| row.get(0),
    )?;
    Ok(count.unwrap_or(0))
}

/// Find profiles matching `term`.
///
/// A profile matches when `person_id` or `device_hash` equals the term, when
/// `name` contains it (case-sensitive), or when `email` equals or contains it.
/// `term` is expected to be trimmed and non-empty; see [`normalize_param`].
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn search_profiles(conn: &Connection, term: &str) -> Result<Vec<Profile>> {
    let sql = format!(
        "{PROFILE_SELECT} WHERE person_id = ?1 OR device_hash = ?1 OR instr(name, ?1) > 0 \
         OR email = ?1 OR instr(email, ?1) > 0"
    );
    let mut stmt = conn.prepare(&sql)?;
    let profiles = stmt
        .query_map([term], row_to_profile)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(profiles)
}

/// The most visited rooms, busiest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn top_locations(conn: &Connection) -> Result<Vec<LocationVisits>> {
    let mut stmt = conn.prepare(
        r"
        SELECT room_id, COUNT(*) AS visits FROM data
        GROUP BY room_id ORDER BY visits DESC LIMIT ?1
        ",
    )?;

    let limit = i64::try_from(TOP_LOCATIONS_LIMIT).unwrap_or(i64::MAX);
    let locations = stmt
        .query_map([limit], |row| {
            Ok(LocationVisits {
                room_id: row.get(0)?,
                visits: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(locations)
}

/// The first persons met in `(entity_id, timestamp)` order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn top_persons(conn: &Connection) -> Result<Vec<PersonFirstSeen>> {
    let mut stmt = conn.prepare("SELECT entity_id, person_id, timestamp FROM data ORDER BY rowid")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AppearanceRow {
                entity_id: row.get(0)?,
                person_id: row.get(1)?,
                timestamp: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(first_appearances(rows, TOP_PERSONS_LIMIT))
}

/// A person's activity, newest raw timestamp first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn activity_timeline(conn: &Connection, query: &TimelineQuery) -> Result<Vec<ActivityEvent>> {
    let mut sql = String::from(TIMELINE_SELECT);
    let mut params: Vec<&str> = vec![query.person_id.as_str()];

    if let Some(start) = &query.start {
        params.push(start.as_str());
        sql.push_str(&format!(" AND timestamp >= ?{}", params.len()));
    }
    if let Some(end) = &query.end {
        params.push(end.as_str());
        sql.push_str(&format!(" AND timestamp <= ?{}", params.len()));
    }
    sql.push_str(" ORDER BY timestamp DESC");

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params_from_iter(params), |row| {
            Ok(ActivityEvent {
                entity_id: row.get(0)?,
                person_id: row.get(1)?,
                room_id: row.get(2)?,
                timestamp: row.get(3)?,
                hour: row.get(4)?,
                day: row.get(5)?,
                weekday: row.get(6)?,
                next_room: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(events)
}

fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        entity_id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        email: row.get(3)?,
        department: row.get(4)?,
        card_id: row.get(5)?,
        device_hash: row.get(6)?,
        face_id: row.get(7)?,
        person_id: row.get(8)?,
    })
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned().into()
        }
    }
}
