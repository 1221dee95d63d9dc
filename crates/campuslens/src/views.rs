//! Display shapes for dashboard clients.
//!
//! These types carry no logic beyond renaming and placeholder filling: they
//! map query results into what a dashboard shows. Confidence values here are
//! cosmetic and not derived from the data.

use std::fmt;

use serde::Serialize;

use crate::model::{ActivityEvent, LocationVisits, PersonFirstSeen, Profile};

/// Shown in place of a count the store could not provide.
pub const UNAVAILABLE: &str = "—";

/// Confidence shown for resolved entities and timeline entries.
pub const DEFAULT_CONFIDENCE: u8 = 95;

/// Source label of every timeline entry.
pub const IMPORTED_SOURCE: &str = "Imported";

/// Headline numbers and rankings for the dashboard overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Distinct persons, `None` when the count failed.
    pub active_entities: Option<i64>,
    /// Distinct Wi-Fi devices, `None` when the count failed.
    pub wifi_connections: Option<i64>,
    /// Busiest locations.
    pub top_sources: Vec<ActivitySource>,
    /// First persons seen.
    pub top_persons: Vec<PersonFirstSeen>,
}

impl DashboardSummary {
    /// Build a summary from whatever the store returned.
    #[must_use]
    pub fn new(
        active_entities: Option<i64>,
        wifi_connections: Option<i64>,
        locations: &[LocationVisits],
        top_persons: Vec<PersonFirstSeen>,
    ) -> Self {
        Self {
            active_entities,
            wifi_connections,
            top_sources: locations
                .iter()
                .enumerate()
                .map(|(i, location)| ActivitySource::from_location(i, location))
                .collect(),
            top_persons,
        }
    }

    /// Active entity count as displayed.
    #[must_use]
    pub fn active_entities_label(&self) -> String {
        count_label(self.active_entities)
    }

    /// Wi-Fi device count as displayed.
    #[must_use]
    pub fn wifi_connections_label(&self) -> String {
        count_label(self.wifi_connections)
    }
}

fn count_label(count: Option<i64>) -> String {
    count.map_or_else(|| UNAVAILABLE.to_string(), |n| n.to_string())
}

/// One of the busiest locations, as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySource {
    /// Room name, or a positional placeholder.
    pub name: String,
    /// Number of visits.
    pub visits: i64,
    /// Display confidence, one decimal.
    pub confidence: f64,
}

impl ActivitySource {
    /// Map the location at rank `index` (zero-based).
    #[must_use]
    pub fn from_location(index: usize, location: &LocationVisits) -> Self {
        let name = location
            .room_id
            .clone()
            .filter(|room| !room.is_empty())
            .unwrap_or_else(|| format!("Location {}", index + 1));

        let rank = f64::from(u32::try_from(index).unwrap_or(u32::MAX));
        let confidence = ((98.0 - rank * 1.1) * 10.0).round() / 10.0;

        Self {
            name,
            visits: location.visits,
            confidence,
        }
    }
}

/// How a timeline event was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    /// A card swipe that moved the person to another room.
    Swipe,
    /// Any other observation.
    Wifi,
}

impl fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swipe => f.pad("swipe"),
            Self::Wifi => f.pad("wifi"),
        }
    }
}

/// One row of a person's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// Stable per-response id.
    pub id: String,
    /// Raw timestamp, empty when missing.
    pub timestamp: String,
    /// Observation kind.
    pub kind: TimelineKind,
    /// Room, or `Unknown`.
    pub location: String,
    /// Short human-readable description.
    pub description: String,
    /// Display confidence.
    pub confidence: u8,
    /// Where the row came from.
    pub source: String,
    /// The person or entity the row belongs to.
    pub entity_id: String,
}

impl TimelineEntry {
    /// Map the event at position `index` of a timeline.
    #[must_use]
    pub fn from_event(index: usize, event: &ActivityEvent) -> Self {
        let next_room = non_empty(event.next_room.as_deref());
        let owner = non_empty(event.entity_id.as_deref())
            .or_else(|| non_empty(event.person_id.as_deref()))
            .unwrap_or_default();

        Self {
            id: format!("{owner}_{index}"),
            timestamp: event.timestamp.clone().unwrap_or_default(),
            kind: if next_room.is_some() {
                TimelineKind::Swipe
            } else {
                TimelineKind::Wifi
            },
            location: non_empty(event.room_id.as_deref())
                .unwrap_or("Unknown")
                .to_string(),
            description: next_room.map_or_else(
                || "Activity".to_string(),
                |room| format!("Moved to {room}"),
            ),
            confidence: DEFAULT_CONFIDENCE,
            source: IMPORTED_SOURCE.to_string(),
            entity_id: non_empty(event.person_id.as_deref())
                .or_else(|| non_empty(event.entity_id.as_deref()))
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Map a whole timeline, keeping its order.
    #[must_use]
    pub fn from_events(events: &[ActivityEvent]) -> Vec<Self> {
        events
            .iter()
            .enumerate()
            .map(|(i, event)| Self::from_event(i, event))
            .collect()
    }
}

/// A labelled identifier shown on an entity card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    /// What the value is.
    pub label: &'static str,
    /// The value itself, never empty.
    pub value: String,
}

/// A profile shown as a search result card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntity {
    /// Entity id, empty when missing.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lower-cased role.
    pub kind: String,
    /// Display confidence.
    pub confidence: u8,
    /// Known identifiers, in a fixed order.
    pub identifiers: Vec<Identifier>,
    /// Department, if known.
    pub location: Option<String>,
}

impl From<&Profile> for ResolvedEntity {
    fn from(profile: &Profile) -> Self {
        let name = non_empty(profile.name.as_deref())
            .or_else(|| non_empty(profile.entity_id.as_deref()))
            .unwrap_or("Unknown")
            .to_string();

        let kind = non_empty(profile.role.as_deref())
            .map_or_else(|| "student".to_string(), str::to_lowercase);

        let identifiers = [
            ("email", &profile.email),
            ("card", &profile.card_id),
            ("device", &profile.device_hash),
            ("face", &profile.face_id),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            non_empty(value.as_deref()).map(|value| Identifier {
                label,
                value: value.to_string(),
            })
        })
        .collect();

        Self {
            id: profile.entity_id.clone().unwrap_or_default(),
            name,
            kind,
            confidence: DEFAULT_CONFIDENCE,
            identifiers,
            location: profile.department.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(entity: &str, person: &str, room: &str, next_room: Option<&str>) -> ActivityEvent {
        ActivityEvent {
            entity_id: Some(entity.to_string()),
            person_id: Some(person.to_string()),
            room_id: Some(room.to_string()),
            timestamp: Some("2024-01-05 09:00".to_string()),
            next_room: next_room.map(ToString::to_string),
            ..ActivityEvent::default()
        }
    }

    #[test]
    fn test_summary_labels() {
        let summary = DashboardSummary::new(Some(12), None, &[], Vec::new());
        assert_eq!(summary.active_entities_label(), "12");
        assert_eq!(summary.wifi_connections_label(), "—");
    }

    #[test]
    fn test_activity_sources() {
        let locations = vec![
            LocationVisits {
                room_id: Some("LIB".to_string()),
                visits: 9,
            },
            LocationVisits {
                room_id: None,
                visits: 4,
            },
            LocationVisits {
                room_id: Some("LAB".to_string()),
                visits: 1,
            },
        ];

        let summary = DashboardSummary::new(None, None, &locations, Vec::new());
        let sources = &summary.top_sources;
        assert_eq!(sources[0].name, "LIB");
        assert!((sources[0].confidence - 98.0).abs() < f64::EPSILON);
        assert_eq!(sources[1].name, "Location 2");
        assert!((sources[1].confidence - 96.9).abs() < 1e-9);
        assert!((sources[2].confidence - 95.8).abs() < 1e-9);
        assert_eq!(sources[2].visits, 1);
    }

    #[test]
    fn test_timeline_swipe_entry() {
        let entry = TimelineEntry::from_event(0, &event("E1", "p1", "R1", Some("R2")));

        assert_eq!(entry.id, "E1_0");
        assert_eq!(entry.kind, TimelineKind::Swipe);
        assert_eq!(entry.location, "R1");
        assert_eq!(entry.description, "Moved to R2");
        assert_eq!(entry.confidence, 95);
        assert_eq!(entry.source, "Imported");
        assert_eq!(entry.entity_id, "p1");
    }

    #[test]
    fn test_timeline_wifi_entry_for_empty_next_room() {
        let entry = TimelineEntry::from_event(3, &event("E1", "p1", "", Some("")));

        assert_eq!(entry.kind, TimelineKind::Wifi);
        assert_eq!(entry.location, "Unknown");
        assert_eq!(entry.description, "Activity");
        assert_eq!(entry.id, "E1_3");
    }

    #[test]
    fn test_timeline_entry_falls_back_to_person_id() {
        let mut row = event("", "p7", "R1", None);
        row.timestamp = None;

        let entry = TimelineEntry::from_event(1, &row);
        assert_eq!(entry.id, "p7_1");
        assert_eq!(entry.timestamp, "");
    }

    #[test]
    fn test_timeline_keeps_order() {
        let events = vec![
            event("E1", "p1", "R2", None),
            event("E1", "p1", "R1", Some("R2")),
        ];

        let entries = TimelineEntry::from_events(&events);
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["E1_0", "E1_1"]);
    }

    #[test]
    fn test_timeline_kind_display_pads() {
        assert_eq!(format!("{:<6}|", TimelineKind::Wifi), "wifi  |");
    }

    #[test]
    fn test_timeline_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TimelineKind::Swipe).unwrap();
        assert_eq!(json, "\"swipe\"");
    }

    #[test]
    fn test_resolved_entity_full_profile() {
        let profile = Profile {
            entity_id: Some("E1".to_string()),
            name: Some("Alice".to_string()),
            role: Some("Staff".to_string()),
            email: Some("alice@uni.edu".to_string()),
            department: Some("Physics".to_string()),
            card_id: Some("C1".to_string()),
            device_hash: Some(String::new()),
            face_id: Some("F1".to_string()),
            person_id: Some("p1".to_string()),
        };

        let entity = ResolvedEntity::from(&profile);
        assert_eq!(entity.id, "E1");
        assert_eq!(entity.name, "Alice");
        assert_eq!(entity.kind, "staff");
        assert_eq!(entity.confidence, 95);
        assert_eq!(entity.location.as_deref(), Some("Physics"));

        let labels: Vec<_> = entity.identifiers.iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["email", "card", "face"]);
    }

    #[test]
    fn test_resolved_entity_placeholders() {
        let entity = ResolvedEntity::from(&Profile::default());
        assert_eq!(entity.id, "");
        assert_eq!(entity.name, "Unknown");
        assert_eq!(entity.kind, "student");
        assert!(entity.identifiers.is_empty());
        assert_eq!(entity.location, None);
    }

    #[test]
    fn test_resolved_entity_name_falls_back_to_entity_id() {
        let profile = Profile {
            entity_id: Some("E9".to_string()),
            ..Profile::default()
        };
        assert_eq!(ResolvedEntity::from(&profile).name, "E9");
    }
}
