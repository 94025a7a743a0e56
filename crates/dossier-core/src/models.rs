//! Domain models for chat sessions, messages and file attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversation thread owning an ordered collection of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Cumulative count of attachments ever added across this session's
    /// messages. Monotonic tally, not a live count of current attachments.
    pub file_count: i64,
    pub favorite: bool,
}

/// A message within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
    /// Set while the assistant placeholder is awaiting generation; cleared
    /// in place when the final content lands.
    pub streaming: bool,
    pub analysis_mode: Option<AnalysisMode>,
    pub attachment_ids: Vec<Uuid>,
}

/// Message roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<&str> for MessageRole {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "assistant" | "agent" | "ai" | "bot" => MessageRole::Assistant,
            _ => MessageRole::User,
        }
    }
}

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Failed,
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Failed => write!(f, "failed"),
        }
    }
}

impl From<&str> for MessageStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "failed" => MessageStatus::Failed,
            _ => MessageStatus::Sent,
        }
    }
}

/// Named instruction template selecting how attached file content is framed
/// for the completion backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Summarize,
    Trends,
    Kpis,
    Actions,
    Compare,
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Summarize => write!(f, "summarize"),
            AnalysisMode::Trends => write!(f, "trends"),
            AnalysisMode::Kpis => write!(f, "kpis"),
            AnalysisMode::Actions => write!(f, "actions"),
            AnalysisMode::Compare => write!(f, "compare"),
        }
    }
}

impl From<&str> for AnalysisMode {
    /// Unrecognized tags silently alias to `summarize`.
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trends" => AnalysisMode::Trends,
            "kpis" => AnalysisMode::Kpis,
            "actions" => AnalysisMode::Actions,
            "compare" => AnalysisMode::Compare,
            _ => AnalysisMode::Summarize,
        }
    }
}

/// Metadata for an uploaded file. Raw bytes live in the content store,
/// keyed `{id}_{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttachment {
    pub id: Uuid,
    pub name: String,
    pub size: i64,
    pub media_type: String,
    /// 0-100; 100 is the terminal state for a completed upload.
    pub upload_progress: i64,
    pub status: AttachmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Attachment lifecycle status. `uploaded` is the only stable terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStatus {
    #[default]
    Uploaded,
}

impl std::fmt::Display for AttachmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachmentStatus::Uploaded => write!(f, "uploaded"),
        }
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
