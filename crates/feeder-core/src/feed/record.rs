// ── Visit payloads and display records ──

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an inbound push payload was not turned into a record.
#[derive(Debug, Error)]
pub enum VisitDecodeError {
    #[error("payload is not a visit object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no visiting_bird")]
    MissingSpecies,

    #[error("visited_at must be a string or number, got {0}")]
    BadTimestamp(serde_json::Value),
}

/// Inbound visit notification, e.g.
/// `{"visiting_bird": "Robin", "visited_at": "2024-05-01 10:02:11", "device_id": "feeder-1"}`.
///
/// Fields other than the two below are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct VisitEvent {
    #[serde(default)]
    pub visiting_bird: Option<String>,
    #[serde(default)]
    pub visited_at: Option<serde_json::Value>,
}

impl VisitEvent {
    /// Decode a raw push payload into a display record.
    pub fn decode(raw: &str) -> Result<VisitRecord, VisitDecodeError> {
        let event: VisitEvent = serde_json::from_str(raw)?;
        event.into_record()
    }

    pub fn into_record(self) -> Result<VisitRecord, VisitDecodeError> {
        let species = self.visiting_bird.ok_or(VisitDecodeError::MissingSpecies)?;

        let visited_at = match self.visited_at {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) => return Err(VisitDecodeError::BadTimestamp(other)),
            None => return Err(VisitDecodeError::BadTimestamp(serde_json::Value::Null)),
        };

        Ok(VisitRecord::new(species, visited_at))
    }
}

/// One rendered line of the visit feed: `"<species> visited at <timestamp>"`.
///
/// The timestamp is kept verbatim as the backend sent it. Two visits can
/// render identically; `seq` tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitRecord {
    #[serde(skip)]
    seq: u64,
    species: String,
    visited_at: String,
    text: String,
}

impl VisitRecord {
    pub fn new(species: impl Into<String>, visited_at: impl Into<String>) -> Self {
        let species = species.into();
        let visited_at = visited_at.into();
        let text = format!("{species} visited at {visited_at}");
        Self {
            seq: 0,
            species,
            visited_at,
            text,
        }
    }

    /// Stamp the record with its arrival position in a feed.
    #[must_use]
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// Arrival position within the feed that accepted the record, starting
    /// at 1. Zero for records that never went through a feed.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    pub fn visited_at(&self) -> &str {
        &self.visited_at
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for VisitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_string_timestamp_and_ignores_extra_fields() {
        let record = VisitEvent::decode(
            r#"{"visiting_bird":"Robin","visited_at":"2024-05-01 10:02:11","device_id":"feeder-1"}"#,
        )
        .expect("valid visit");
        assert_eq!(record.as_str(), "Robin visited at 2024-05-01 10:02:11");
        assert_eq!(record.species(), "Robin");
    }

    #[test]
    fn numeric_timestamp_is_rendered_verbatim() {
        let record = VisitEvent::decode(r#"{"visiting_bird":"Wren","visited_at":1714557731}"#)
            .expect("valid visit");
        assert_eq!(record.to_string(), "Wren visited at 1714557731");
    }

    #[test]
    fn rejects_missing_species() {
        assert!(matches!(
            VisitEvent::decode(r#"{"visited_at":"10:00"}"#),
            Err(VisitDecodeError::MissingSpecies)
        ));
    }

    #[test]
    fn empty_species_is_still_a_visit() {
        let record = VisitEvent::decode(r#"{"visiting_bird":"","visited_at":"10:00"}"#)
            .expect("present field");
        assert_eq!(record.species(), "");
        assert_eq!(record.as_str(), " visited at 10:00");
    }

    #[test]
    fn rejects_missing_or_structured_timestamp() {
        assert!(matches!(
            VisitEvent::decode(r#"{"visiting_bird":"Robin"}"#),
            Err(VisitDecodeError::BadTimestamp(_))
        ));
        assert!(matches!(
            VisitEvent::decode(r#"{"visiting_bird":"Robin","visited_at":{"t":1}}"#),
            Err(VisitDecodeError::BadTimestamp(_))
        ));
    }

    #[test]
    fn rejects_non_json_and_non_objects() {
        assert!(matches!(VisitEvent::decode("hello"), Err(VisitDecodeError::Json(_))));
        assert!(matches!(VisitEvent::decode("[1,2]"), Err(VisitDecodeError::Json(_))));
    }
}
