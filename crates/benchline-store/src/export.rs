//! Notes export rendering (Markdown and JSON documents).

use crate::{NoteFilter, Store, StoreError};
use benchline_types::{Note, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported export formats for the notes document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Human-readable Markdown, one block per note.
    #[default]
    Markdown,
    /// A single JSON document carrying the full note records.
    Json,
}

/// A rendered export document plus the content type it should be served
/// with.
#[derive(Debug, Clone)]
pub struct ExportedNotes {
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    session_id: &'a str,
    session_name: &'a str,
    exported_at: DateTime<Utc>,
    notes: &'a [Note],
}

impl Store {
    /// Renders all notes in a session as a copy-pastable document, ascending
    /// by timestamp.
    pub fn export_notes(
        &self,
        session_id: &str,
        format: ExportFormat,
    ) -> Result<ExportedNotes, StoreError> {
        let session = self.get_session(session_id)?;
        let notes = self.list_notes(session_id, &NoteFilter::default())?;

        match format {
            ExportFormat::Markdown => Ok(ExportedNotes {
                content_type: "text/markdown",
                body: render_markdown(&session, &notes),
            }),
            ExportFormat::Json => {
                let document = ExportDocument {
                    session_id: &session.id,
                    session_name: &session.name,
                    exported_at: Utc::now(),
                    notes: &notes,
                };
                Ok(ExportedNotes {
                    content_type: "application/json",
                    body: serde_json::to_string_pretty(&document)?,
                })
            }
        }
    }
}

fn render_markdown(session: &Session, notes: &[Note]) -> String {
    let mut lines = vec![
        format!("# {}", session.name),
        String::new(),
        format!("**Session ID:** {}", session.id),
        format!("**Started:** {}", session.started_at.to_rfc3339()),
        format!("**Status:** {}", session.status),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Notes".to_string(),
        String::new(),
    ];

    for note in notes {
        let speaker = note.speaker.as_deref().unwrap_or("Unknown");
        lines.push(format!(
            "### [{}] {}",
            note.timestamp.format("%H:%M:%S"),
            speaker
        ));
        lines.push(String::new());
        lines.push(note.content.clone());
        lines.push(String::new());

        if let Some(snapshot) = note
            .telemetry_snapshot
            .as_ref()
            .filter(|s| !s.is_empty())
        {
            let pairs: Vec<String> = snapshot
                .iter()
                .map(|(channel, value)| format!("{channel}={value}"))
                .collect();
            lines.push(format!("**Telemetry:** {}", pairs.join(", ")));
            lines.push(String::new());
        }
        if !note.tags.is_empty() {
            lines.push(format!("*Tags: {}*", note.tags.join(", ")));
            lines.push(String::new());
        }

        lines.push("---".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}
