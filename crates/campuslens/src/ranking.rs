//! First-appearance ranking of persons over activity rows.
//!
//! Rows are ordered by `entity_id` and then by parsed timestamp, and the first
//! `limit` distinct person ids met while walking that order are reported. The
//! primary key is `entity_id`, so a person's reported row is the first one in
//! that order, not necessarily their globally earliest event. Callers rely on
//! this order; it is not a chronological ranking.

use std::collections::HashSet;

use crate::model::{AppearanceRow, PersonFirstSeen};
use crate::timestamp::SortKey;

/// Number of persons reported by the dashboard.
pub const TOP_PERSONS_LIMIT: usize = 5;

/// Number of locations reported by the dashboard.
pub const TOP_LOCATIONS_LIMIT: usize = 3;

/// Sort rows by `(entity_id, parsed timestamp)`.
///
/// Missing entity ids sort first, matching SQL `ORDER BY ... ASC`. Unparsed
/// timestamps sort after parsed ones within an entity. The sort is stable,
/// so remaining ties keep their input order.
pub fn order_by_entity_then_time(rows: &mut [AppearanceRow]) {
    rows.sort_by_cached_key(|row| {
        (
            row.entity_id.clone(),
            SortKey::from_raw(row.timestamp.as_deref()),
        )
    });
}

/// Report the first `limit` distinct persons in `(entity_id, timestamp)` order.
///
/// Rows without a person id, or with an empty one, are skipped. No person id
/// is reported twice.
#[must_use]
pub fn first_appearances(mut rows: Vec<AppearanceRow>, limit: usize) -> Vec<PersonFirstSeen> {
    order_by_entity_then_time(&mut rows);

    let mut seen = HashSet::new();
    let mut persons = Vec::with_capacity(limit);

    for row in rows {
        if persons.len() >= limit {
            break;
        }

        let Some(person_id) = row.person_id.filter(|id| !id.is_empty()) else {
            continue;
        };

        if seen.insert(person_id.clone()) {
            persons.push(PersonFirstSeen {
                person_id,
                first_seen: row.timestamp,
            });
        }
    }

    persons
}
