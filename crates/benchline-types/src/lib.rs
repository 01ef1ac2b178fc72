//! Shared types and event payloads for the Benchline platform.
//!
//! This crate provides the foundational record types used across all
//! Benchline crates: session, note, telemetry, and STT task records, their
//! status enums, and the event payloads broadcast over WebSocket.
//!
//! No crate in the workspace depends on anything *except* `benchline-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod event;
pub use event::EventPayload;

/// Lifecycle status of a test session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The session is open and accepting notes, telemetry, and STT tasks.
    Active,
    /// The session has been closed. `ended_at` is set on the record.
    Ended,
}

impl SessionStatus {
    /// Returns the canonical wire string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a note within a session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    /// A free-form observation by an operator or agent. The default.
    #[default]
    Observation,
    /// A command that was issued to the system under test.
    Command,
    /// A system-generated entry.
    System,
}

impl NoteType {
    /// Returns the canonical wire string for this note type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Command => "command",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state of a speech-to-text task.
///
/// Transitions are monotonic: `Pending` may move to `Done` or `Failed`, and
/// both of those are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttTaskStatus {
    /// The task has been registered but no result has arrived yet.
    Pending,
    /// Transcription completed; `transcript` holds the result.
    Done,
    /// Transcription failed; `error` describes the failure.
    Failed,
}

impl SttTaskStatus {
    /// Returns the canonical wire string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` if no further status transitions are permitted.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for SttTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recording session: the root entity that notes, telemetry samples, and
/// STT tasks attach to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned identifier (`sess_` prefix).
    pub id: String,
    /// Human-readable session name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// When the session was created, server clock.
    pub started_at: DateTime<Utc>,
    /// When the session was first ended. `None` while active.
    pub ended_at: Option<DateTime<Utc>>,
}

/// A timestamped log entry attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Server-assigned identifier (`note_` prefix).
    pub id: String,
    /// The owning session.
    pub session_id: String,
    /// Client-supplied time the note refers to.
    pub timestamp: DateTime<Utc>,
    /// Who authored the note, if known.
    pub speaker: Option<String>,
    /// The note body.
    pub content: String,
    /// Classification of the note.
    #[serde(rename = "type")]
    pub note_type: NoteType,
    /// Ordered, possibly repeating tag list.
    pub tags: Vec<String>,
    /// Telemetry values captured alongside the note, keyed by channel.
    pub telemetry_snapshot: Option<BTreeMap<String, f64>>,
    /// When the record was created, server clock.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified, server clock.
    pub updated_at: DateTime<Utc>,
}

/// A single immutable telemetry reading on a named channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Server-assigned identifier (`tel_` prefix).
    pub id: String,
    /// The owning session.
    pub session_id: String,
    /// Client-supplied time of the reading.
    pub timestamp: DateTime<Utc>,
    /// Channel name, e.g. `"rpm"` or `"coolant_temp"`.
    pub channel: String,
    /// The measured value.
    pub value: f64,
    /// Optional unit label, e.g. `"degC"`.
    pub unit: Option<String>,
}

/// Status record for one speech-to-text job. Audio itself never transits
/// this service; tasks reference chunks by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttTask {
    /// Server-assigned identifier (`stt_` prefix).
    pub id: String,
    /// The owning session.
    pub session_id: String,
    /// Client-side identifier of the audio chunk being transcribed.
    pub audio_chunk_id: String,
    /// Duration of the audio chunk in seconds, if known.
    pub duration_seconds: Option<f64>,
    /// Current processing state.
    pub status: SttTaskStatus,
    /// Transcription result, present once `status` is `done`.
    pub transcript: Option<String>,
    /// Failure description, present once `status` is `failed`.
    pub error: Option<String>,
    /// When the task was registered, server clock.
    pub created_at: DateTime<Utc>,
    /// When the task was last modified, server clock.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn session_status_wire_forms() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Ended).unwrap(),
            "\"ended\""
        );
        let parsed: SessionStatus = serde_json::from_str("\"ended\"").unwrap();
        assert_eq!(parsed, SessionStatus::Ended);
    }

    #[test]
    fn note_type_defaults_to_observation() {
        assert_eq!(NoteType::default(), NoteType::Observation);
        assert_eq!(NoteType::Command.as_str(), "command");
        let parsed: NoteType = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(parsed, NoteType::System);
    }

    #[test]
    fn stt_status_terminality() {
        assert!(!SttTaskStatus::Pending.is_terminal());
        assert!(SttTaskStatus::Done.is_terminal());
        assert!(SttTaskStatus::Failed.is_terminal());
    }

    #[test]
    fn note_serializes_type_field() {
        let note = Note {
            id: "note_abc12345".to_string(),
            session_id: "sess_abc12345".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            speaker: Some("operator".to_string()),
            content: "ignition sequence started".to_string(),
            note_type: NoteType::Observation,
            tags: vec!["startup".to_string()],
            telemetry_snapshot: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 1).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 1).unwrap(),
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["type"], "observation");
        assert_eq!(json["timestamp"], "2025-06-01T12:00:00Z");
    }

    #[test]
    fn timestamps_serialize_rfc3339_utc() {
        let sample = TelemetrySample {
            id: "tel_abc12345".to_string(),
            session_id: "sess_abc12345".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 15).unwrap(),
            channel: "rpm".to_string(),
            value: 4200.0,
            unit: Some("rev/min".to_string()),
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["timestamp"], "2025-06-01T08:30:15Z");
    }
}
