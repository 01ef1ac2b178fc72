//! Event payloads broadcast to WebSocket subscribers.

use crate::{Note, SttTask};
use serde::Serialize;

/// Structured payload for each broadcast event type.
///
/// Payloads are serialised as the `data` field of the WebSocket frame
/// `{"event": ..., "session_id": ..., "data": ...}`. Each variant
/// corresponds to an `event` string; the variant content serialises
/// directly, without an enum tag.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// A note was created. Carries the full committed record.
    NoteCreated(Note),

    /// A note was updated. Carries the full record after the update.
    NoteUpdated(Note),

    /// A note was deleted.
    NoteDeleted {
        /// The id of the deleted note.
        id: String,
    },

    /// An STT task was registered.
    SttTaskCreated(SttTask),

    /// An STT task completed with a transcript.
    SttTaskDone(SttTask),

    /// A recoverable error occurred in a background pipeline.
    ErrorOccurred {
        /// Human-readable failure description.
        message: String,
        /// Which pipeline the error came from, e.g. `"stt"`.
        source: String,
    },
}

impl EventPayload {
    /// Returns the canonical event type string for this payload.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NoteCreated(_) => "note.created",
            Self::NoteUpdated(_) => "note.updated",
            Self::NoteDeleted { .. } => "note.deleted",
            Self::SttTaskCreated(_) => "stt.task.created",
            Self::SttTaskDone(_) => "stt.task.done",
            Self::ErrorOccurred { .. } => "error.occurred",
        }
    }

    /// Serialises this payload to the JSON value carried in the frame's
    /// `data` field.
    pub fn data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoteType, SttTaskStatus};
    use chrono::{TimeZone, Utc};

    fn sample_note() -> Note {
        Note {
            id: "note_1a2b3c4d".to_string(),
            session_id: "sess_1a2b3c4d".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            speaker: None,
            content: "throttle at 40%".to_string(),
            note_type: NoteType::Observation,
            tags: Vec::new(),
            telemetry_snapshot: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 1).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 1).unwrap(),
        }
    }

    #[test]
    fn event_type_strings() {
        assert_eq!(
            EventPayload::NoteCreated(sample_note()).event_type(),
            "note.created"
        );
        assert_eq!(
            EventPayload::NoteDeleted {
                id: "note_1a2b3c4d".to_string()
            }
            .event_type(),
            "note.deleted"
        );
        assert_eq!(
            EventPayload::ErrorOccurred {
                message: "decode failed".to_string(),
                source: "stt".to_string()
            }
            .event_type(),
            "error.occurred"
        );
    }

    #[test]
    fn note_payload_serialises_untagged() {
        let data = EventPayload::NoteCreated(sample_note()).data();
        assert_eq!(data["id"], "note_1a2b3c4d");
        assert_eq!(data["content"], "throttle at 40%");
        assert!(data.get("NoteCreated").is_none());
    }

    #[test]
    fn deleted_payload_carries_only_id() {
        let data = EventPayload::NoteDeleted {
            id: "note_1a2b3c4d".to_string(),
        }
        .data();
        assert_eq!(data, serde_json::json!({ "id": "note_1a2b3c4d" }));
    }

    #[test]
    fn stt_done_payload_carries_transcript() {
        let task = SttTask {
            id: "stt_1a2b3c4d".to_string(),
            session_id: "sess_1a2b3c4d".to_string(),
            audio_chunk_id: "chunk-7".to_string(),
            duration_seconds: Some(2.5),
            status: SttTaskStatus::Done,
            transcript: Some("all stations go".to_string()),
            error: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 3).unwrap(),
        };
        let data = EventPayload::SttTaskDone(task).data();
        assert_eq!(data["status"], "done");
        assert_eq!(data["transcript"], "all stations go");
    }
}
