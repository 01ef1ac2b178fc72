//! In-memory entity store for the Benchline platform.
//!
//! Implements session, note, telemetry, and STT task CRUD with validation,
//! id and timestamp assignment, filtering, and notes export. Records live in
//! process memory for the lifetime of the service; there is no persistence
//! layer.
//!
//! Mutating operations return the committed record together with the event
//! payloads the caller should publish. The store itself never touches the
//! socket layer, which keeps commit and fan-out separable and testable.

use benchline_types::{
    EventPayload, Note, NoteType, Session, SessionStatus, SttTask, SttTaskStatus, TelemetrySample,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

mod export;
pub use export::{ExportFormat, ExportedNotes};

/// Default cap on telemetry query results when the caller gives no limit.
pub const DEFAULT_TELEMETRY_LIMIT: usize = 1000;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The result of a mutating operation: the committed record plus the events
/// the dispatch layer should publish to subscribers of the owning session.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub record: T,
    pub events: Vec<EventPayload>,
}

/// Parameters for creating a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parameters for updating an existing session.
///
/// Only fields that are `Some` are modified; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSessionParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<SessionStatus>,
}

/// Parameters for creating a new note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteParams {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub speaker: Option<String>,
    pub content: String,
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub telemetry_snapshot: Option<BTreeMap<String, f64>>,
}

/// Parameters for updating an existing note. `None` fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNoteParams {
    pub content: Option<String>,
    pub speaker: Option<String>,
    #[serde(rename = "type")]
    pub note_type: Option<NoteType>,
    pub tags: Option<Vec<String>>,
}

/// Query filter for listing notes. All filters are optional; `from` and
/// `to` are inclusive bounds on the note timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteFilter {
    pub speaker: Option<String>,
    #[serde(rename = "type")]
    pub note_type: Option<NoteType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Parameters for ingesting one telemetry sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTelemetryParams {
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Query filter for listing telemetry. `from` and `to` are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryFilter {
    pub channel: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Parameters for registering a new STT task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSttTaskParams {
    pub audio_chunk_id: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Parameters for resolving an STT task. `status` must be a terminal
/// status; pending tasks cannot be updated to pending again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSttTaskParams {
    pub status: SttTaskStatus,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The in-memory store owning all entity collections.
///
/// Collections are guarded by `std::sync::RwLock`. Guards are held for
/// brief map operations only and never across an await point, so blocking
/// the async executor is not a concern here.
#[derive(Default)]
pub struct Store {
    sessions: RwLock<HashMap<String, Session>>,
    notes: RwLock<HashMap<String, Note>>,
    telemetry: RwLock<Vec<TelemetrySample>>,
    stt_tasks: RwLock<HashMap<String, SttTask>>,
}

fn short_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..8])
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation {
            field,
            message: "must not be empty",
        });
    }
    Ok(())
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn require_session(&self, id: &str) -> Result<(), StoreError> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        if sessions.contains_key(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "session",
                id: id.to_string(),
            })
        }
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Creates a new session in the `active` state.
    pub fn create_session(&self, params: CreateSessionParams) -> Result<Session, StoreError> {
        require_non_empty("name", &params.name)?;

        let session = Session {
            id: short_id("sess"),
            name: params.name,
            description: params.description,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, "session created");
        Ok(session)
    }

    /// Lists all sessions, newest first by `started_at`.
    pub fn list_sessions(&self) -> Vec<Session> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<Session> = sessions.values().cloned().collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all
    }

    /// Retrieves a session by id.
    pub fn get_session(&self, id: &str) -> Result<Session, StoreError> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "session",
                id: id.to_string(),
            })
    }

    /// Returns whether a session with this id exists. Used by the WebSocket
    /// endpoint to reject subscriptions before the upgrade completes.
    pub fn session_exists(&self, id: &str) -> bool {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.contains_key(id)
    }

    /// Applies a partial update to a session.
    ///
    /// `ended_at` records the first transition to `ended` only; re-ending an
    /// already ended session leaves the original timestamp in place.
    pub fn update_session(
        &self,
        id: &str,
        updates: UpdateSessionParams,
    ) -> Result<Session, StoreError> {
        if let Some(name) = &updates.name {
            require_non_empty("name", name)?;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let session = sessions.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "session",
            id: id.to_string(),
        })?;

        if let Some(name) = updates.name {
            session.name = name;
        }
        if let Some(description) = updates.description {
            session.description = Some(description);
        }
        if let Some(status) = updates.status {
            if status == SessionStatus::Ended && session.ended_at.is_none() {
                session.ended_at = Some(Utc::now());
            }
            session.status = status;
        }

        Ok(session.clone())
    }

    // ── Notes ────────────────────────────────────────────────────────

    /// Creates a note in a session. Emits `note.created`.
    pub fn create_note(
        &self,
        session_id: &str,
        params: CreateNoteParams,
    ) -> Result<Committed<Note>, StoreError> {
        self.require_session(session_id)?;
        require_non_empty("content", &params.content)?;

        let now = Utc::now();
        let note = Note {
            id: short_id("note"),
            session_id: session_id.to_string(),
            timestamp: params.timestamp,
            speaker: params.speaker,
            content: params.content,
            note_type: params.note_type,
            tags: params.tags,
            telemetry_snapshot: params.telemetry_snapshot,
            created_at: now,
            updated_at: now,
        };

        let mut notes = self.notes.write().unwrap_or_else(|e| e.into_inner());
        notes.insert(note.id.clone(), note.clone());
        tracing::debug!(session_id, note_id = %note.id, "note created");

        Ok(Committed {
            record: note.clone(),
            events: vec![EventPayload::NoteCreated(note)],
        })
    }

    /// Lists notes in a session, ascending by timestamp. Ties sort by
    /// `created_at`.
    pub fn list_notes(
        &self,
        session_id: &str,
        filter: &NoteFilter,
    ) -> Result<Vec<Note>, StoreError> {
        self.require_session(session_id)?;

        let notes = self.notes.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<Note> = notes
            .values()
            .filter(|n| n.session_id == session_id)
            .filter(|n| {
                filter
                    .speaker
                    .as_deref()
                    .map_or(true, |s| n.speaker.as_deref() == Some(s))
            })
            .filter(|n| filter.note_type.map_or(true, |t| n.note_type == t))
            .filter(|n| filter.from.map_or(true, |from| n.timestamp >= from))
            .filter(|n| filter.to.map_or(true, |to| n.timestamp <= to))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(matched)
    }

    /// Retrieves a note by id, scoped to its session.
    pub fn get_note(&self, session_id: &str, note_id: &str) -> Result<Note, StoreError> {
        self.require_session(session_id)?;

        let notes = self.notes.read().unwrap_or_else(|e| e.into_inner());
        notes
            .get(note_id)
            .filter(|n| n.session_id == session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "note",
                id: note_id.to_string(),
            })
    }

    /// Applies a partial update to a note and re-stamps `updated_at`.
    /// Emits `note.updated`.
    pub fn update_note(
        &self,
        session_id: &str,
        note_id: &str,
        updates: UpdateNoteParams,
    ) -> Result<Committed<Note>, StoreError> {
        self.require_session(session_id)?;
        if let Some(content) = &updates.content {
            require_non_empty("content", content)?;
        }

        let mut notes = self.notes.write().unwrap_or_else(|e| e.into_inner());
        let note = notes
            .get_mut(note_id)
            .filter(|n| n.session_id == session_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "note",
                id: note_id.to_string(),
            })?;

        if let Some(content) = updates.content {
            note.content = content;
        }
        if let Some(speaker) = updates.speaker {
            note.speaker = Some(speaker);
        }
        if let Some(note_type) = updates.note_type {
            note.note_type = note_type;
        }
        if let Some(tags) = updates.tags {
            note.tags = tags;
        }
        note.updated_at = Utc::now();

        let record = note.clone();
        Ok(Committed {
            record: record.clone(),
            events: vec![EventPayload::NoteUpdated(record)],
        })
    }

    /// Deletes a note. Emits `note.deleted` with the removed id.
    pub fn delete_note(
        &self,
        session_id: &str,
        note_id: &str,
    ) -> Result<Committed<Note>, StoreError> {
        self.require_session(session_id)?;

        let mut notes = self.notes.write().unwrap_or_else(|e| e.into_inner());
        let removed = match notes.get(note_id) {
            Some(n) if n.session_id == session_id => notes.remove(note_id),
            _ => None,
        }
        .ok_or_else(|| StoreError::NotFound {
            entity: "note",
            id: note_id.to_string(),
        })?;
        tracing::debug!(session_id, note_id, "note deleted");

        Ok(Committed {
            record: removed,
            events: vec![EventPayload::NoteDeleted {
                id: note_id.to_string(),
            }],
        })
    }

    // ── Telemetry ────────────────────────────────────────────────────

    /// Ingests one telemetry sample.
    pub fn create_sample(
        &self,
        session_id: &str,
        params: CreateTelemetryParams,
    ) -> Result<TelemetrySample, StoreError> {
        self.require_session(session_id)?;
        require_non_empty("channel", &params.channel)?;

        let sample = TelemetrySample {
            id: short_id("tel"),
            session_id: session_id.to_string(),
            timestamp: params.timestamp,
            channel: params.channel,
            value: params.value,
            unit: params.unit,
        };

        let mut telemetry = self.telemetry.write().unwrap_or_else(|e| e.into_inner());
        telemetry.push(sample.clone());
        Ok(sample)
    }

    /// Ingests a batch of telemetry samples and returns how many were
    /// stored. The whole batch is validated before anything is stored.
    pub fn create_batch(
        &self,
        session_id: &str,
        batch: Vec<CreateTelemetryParams>,
    ) -> Result<usize, StoreError> {
        self.require_session(session_id)?;
        for params in &batch {
            require_non_empty("channel", &params.channel)?;
        }

        let mut telemetry = self.telemetry.write().unwrap_or_else(|e| e.into_inner());
        let count = batch.len();
        for params in batch {
            telemetry.push(TelemetrySample {
                id: short_id("tel"),
                session_id: session_id.to_string(),
                timestamp: params.timestamp,
                channel: params.channel,
                value: params.value,
                unit: params.unit,
            });
        }
        tracing::debug!(session_id, count, "telemetry batch ingested");
        Ok(count)
    }

    /// Queries telemetry in a session, newest first by timestamp, capped at
    /// `filter.limit` (default [`DEFAULT_TELEMETRY_LIMIT`]).
    pub fn list_telemetry(
        &self,
        session_id: &str,
        filter: &TelemetryFilter,
    ) -> Result<Vec<TelemetrySample>, StoreError> {
        self.require_session(session_id)?;

        let telemetry = self.telemetry.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<TelemetrySample> = telemetry
            .iter()
            .filter(|t| t.session_id == session_id)
            .filter(|t| filter.channel.as_deref().map_or(true, |c| t.channel == c))
            .filter(|t| filter.from.map_or(true, |from| t.timestamp >= from))
            .filter(|t| filter.to.map_or(true, |to| t.timestamp <= to))
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(filter.limit.unwrap_or(DEFAULT_TELEMETRY_LIMIT));
        Ok(matched)
    }

    /// Returns the most recent sample on `channel`. When several samples
    /// share the maximum timestamp, the most recently ingested one wins
    /// (samples are kept in insertion order and `max_by_key` returns the
    /// last maximal element).
    pub fn latest_telemetry(
        &self,
        session_id: &str,
        channel: &str,
    ) -> Result<TelemetrySample, StoreError> {
        self.require_session(session_id)?;

        let telemetry = self.telemetry.read().unwrap_or_else(|e| e.into_inner());
        telemetry
            .iter()
            .filter(|t| t.session_id == session_id && t.channel == channel)
            .max_by_key(|t| t.timestamp)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "telemetry channel",
                id: channel.to_string(),
            })
    }

    /// Lists the unique channel names seen in a session, sorted.
    pub fn list_channels(&self, session_id: &str) -> Result<Vec<String>, StoreError> {
        self.require_session(session_id)?;

        let telemetry = self.telemetry.read().unwrap_or_else(|e| e.into_inner());
        let mut channels: Vec<String> = telemetry
            .iter()
            .filter(|t| t.session_id == session_id)
            .map(|t| t.channel.clone())
            .collect();
        channels.sort();
        channels.dedup();
        Ok(channels)
    }

    // ── STT tasks ────────────────────────────────────────────────────

    /// Registers a new STT task in the `pending` state. Emits
    /// `stt.task.created`.
    pub fn create_task(
        &self,
        session_id: &str,
        params: CreateSttTaskParams,
    ) -> Result<Committed<SttTask>, StoreError> {
        self.require_session(session_id)?;
        require_non_empty("audio_chunk_id", &params.audio_chunk_id)?;

        let now = Utc::now();
        let task = SttTask {
            id: short_id("stt"),
            session_id: session_id.to_string(),
            audio_chunk_id: params.audio_chunk_id,
            duration_seconds: params.duration_seconds,
            status: SttTaskStatus::Pending,
            transcript: None,
            error: None,
            created_at: now,
            updated_at: now,
        };

        let mut tasks = self.stt_tasks.write().unwrap_or_else(|e| e.into_inner());
        tasks.insert(task.id.clone(), task.clone());
        tracing::debug!(session_id, task_id = %task.id, "stt task registered");

        Ok(Committed {
            record: task.clone(),
            events: vec![EventPayload::SttTaskCreated(task)],
        })
    }

    /// Lists STT tasks in a session, newest first by `created_at`.
    pub fn list_tasks(&self, session_id: &str) -> Result<Vec<SttTask>, StoreError> {
        self.require_session(session_id)?;

        let tasks = self.stt_tasks.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<SttTask> = tasks
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    /// Retrieves an STT task by id, scoped to its session.
    pub fn get_task(&self, session_id: &str, task_id: &str) -> Result<SttTask, StoreError> {
        self.require_session(session_id)?;

        let tasks = self.stt_tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks
            .get(task_id)
            .filter(|t| t.session_id == session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "stt task",
                id: task_id.to_string(),
            })
    }

    /// Resolves an STT task to a terminal status.
    ///
    /// The target status must be `done` or `failed`; a task that is already
    /// terminal is rejected with `Conflict`. A `done` task emits
    /// `stt.task.done`; a `failed` task emits `error.occurred` carrying the
    /// failure message.
    pub fn update_task(
        &self,
        session_id: &str,
        task_id: &str,
        updates: UpdateSttTaskParams,
    ) -> Result<Committed<SttTask>, StoreError> {
        self.require_session(session_id)?;
        if !updates.status.is_terminal() {
            return Err(StoreError::Validation {
                field: "status",
                message: "must be done or failed",
            });
        }

        let mut tasks = self.stt_tasks.write().unwrap_or_else(|e| e.into_inner());
        let task = tasks
            .get_mut(task_id)
            .filter(|t| t.session_id == session_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "stt task",
                id: task_id.to_string(),
            })?;

        if task.status.is_terminal() {
            return Err(StoreError::Conflict(format!(
                "stt task {} is already {}",
                task_id, task.status
            )));
        }

        task.status = updates.status;
        task.transcript = updates.transcript;
        task.error = updates.error;
        task.updated_at = Utc::now();

        let record = task.clone();
        let events = if record.status == SttTaskStatus::Done {
            vec![EventPayload::SttTaskDone(record.clone())]
        } else {
            vec![EventPayload::ErrorOccurred {
                message: record
                    .error
                    .clone()
                    .unwrap_or_else(|| "STT transcription failed".to_string()),
                source: "stt".to_string(),
            }]
        };

        Ok(Committed { record, events })
    }
}
