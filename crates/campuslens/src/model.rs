//! Record types returned by the query layer.
//!
//! Every imported column is text, so every field is an optional string: a
//! column missing from the source CSV reads back as `None`, an empty cell as
//! `Some("")`.

use serde::{Deserialize, Serialize};

/// A row of arbitrary shape, keyed by column name.
///
/// Used for tables whose columns are inferred from CSV headers.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// One known entity from the `profile` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Source-specific entity identifier.
    pub entity_id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Role such as `student` or `staff`.
    pub role: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Department.
    pub department: Option<String>,
    /// Access card identifier.
    pub card_id: Option<String>,
    /// Hash of the entity's device.
    pub device_hash: Option<String>,
    /// Face image identifier.
    pub face_id: Option<String>,
    /// Canonical cross-source identity key.
    pub person_id: Option<String>,
}

/// One observed movement from the `data` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Source-specific entity identifier.
    pub entity_id: Option<String>,
    /// Canonical identity key.
    pub person_id: Option<String>,
    /// Room the event was observed in.
    pub room_id: Option<String>,
    /// Free-text timestamp, format not normalized.
    pub timestamp: Option<String>,
    /// Hour of day, as imported.
    pub hour: Option<String>,
    /// Day, as imported.
    pub day: Option<String>,
    /// Weekday, as imported.
    pub weekday: Option<String>,
    /// Room observed next, if any.
    pub next_room: Option<String>,
}

/// Visit count for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationVisits {
    /// The room, `None` for events without one.
    pub room_id: Option<String>,
    /// Number of events in the room.
    pub visits: i64,
}

/// A person and the timestamp of the row they were first seen in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFirstSeen {
    /// Canonical identity key, never empty.
    pub person_id: String,
    /// Raw timestamp of the first row, unparsed.
    pub first_seen: Option<String>,
}

/// The columns the first-appearance ranking reads from an activity row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppearanceRow {
    /// Primary ordering key.
    pub entity_id: Option<String>,
    /// Identity to deduplicate on.
    pub person_id: Option<String>,
    /// Secondary ordering key, parsed best-effort.
    pub timestamp: Option<String>,
}

impl AppearanceRow {
    /// Convenience constructor used by tests and callers building rows by hand.
    #[must_use]
    pub fn new(entity_id: &str, person_id: &str, timestamp: &str) -> Self {
        Self {
            entity_id: Some(entity_id.to_string()),
            person_id: Some(person_id.to_string()),
            timestamp: Some(timestamp.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_serializes_missing_fields_as_null() {
        let profile = Profile {
            person_id: Some("p1".to_string()),
            ..Profile::default()
        };

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["person_id"], "p1");
        assert!(json["email"].is_null());
    }

    #[test]
    fn test_location_visits_shape() {
        let visits = LocationVisits {
            room_id: Some("LIB-1".to_string()),
            visits: 9,
        };

        let json = serde_json::to_string(&visits).unwrap();
        assert_eq!(json, r#"{"room_id":"LIB-1","visits":9}"#);
    }

    #[test]
    fn test_person_first_seen_shape() {
        let person = PersonFirstSeen {
            person_id: "p1".to_string(),
            first_seen: Some("2024-01-05 09:00:00".to_string()),
        };

        let json = serde_json::to_value(&person).unwrap();
        assert_eq!(json["person_id"], "p1");
        assert_eq!(json["first_seen"], "2024-01-05 09:00:00");
    }
}
