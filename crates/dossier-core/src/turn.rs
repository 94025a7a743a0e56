//! Turn orchestration.
//!
//! A user turn is answered in two steps: the user message and an assistant
//! placeholder are persisted synchronously, then a detached task resolves
//! the placeholder by extracting attachments, composing a prompt, and
//! writing the completion back over the placeholder's content. The caller
//! gets the placeholder immediately and polls the session for the update.

use crate::completion::{
    ANALYSIS_MAX_TOKENS, ANALYSIS_TEMPERATURE, CONVERSATION_MAX_TOKENS, CONVERSATION_TEMPERATURE,
    CompletionClient,
};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::extract::extract_file;
use crate::models::{Message, MessageRole, MessageStatus};
use crate::prompt::{self, FileReport};
use crate::store::ContentStore;
use chrono::Utc;
use uuid::Uuid;

/// Placeholder shown while a turn is being resolved.
pub const THINKING_CONTENT: &str = "I'm analyzing your request...";

/// A user turn to submit.
pub struct TurnRequest {
    pub session_id: Uuid,
    pub content: String,
    pub attachment_ids: Vec<Uuid>,
    pub analysis_mode: Option<crate::models::AnalysisMode>,
}

/// Service coordinating persistence, extraction, and completion for chat
/// turns.
#[derive(Clone)]
pub struct ChatService {
    db: Database,
    store: ContentStore,
    completion: CompletionClient,
}

impl ChatService {
    pub fn new(db: Database, store: ContentStore, completion: CompletionClient) -> Self {
        Self {
            db,
            store,
            completion,
        }
    }

    /// Submit a user turn.
    ///
    /// Persists the user message, bumps the session's file counter for any
    /// attachments, inserts a streaming placeholder, and spawns the
    /// resolution task. Returns the placeholder message.
    pub async fn submit_user_turn(&self, request: TurnRequest) -> Result<Message> {
        self.db
            .get_session(request.session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session '{}'", request.session_id)))?;

        let user_message = Message {
            id: Uuid::new_v4(),
            session_id: request.session_id,
            role: MessageRole::User,
            content: request.content,
            created_at: Utc::now(),
            status: MessageStatus::Sent,
            streaming: false,
            analysis_mode: request.analysis_mode,
            attachment_ids: request.attachment_ids,
        };
        self.db.insert_message(&user_message).await?;

        if !user_message.attachment_ids.is_empty() {
            let count = i64::try_from(user_message.attachment_ids.len()).unwrap_or(i64::MAX);
            self.db
                .add_session_files(request.session_id, count)
                .await?;
        }

        let placeholder = Message {
            id: Uuid::new_v4(),
            session_id: request.session_id,
            role: MessageRole::Assistant,
            content: THINKING_CONTENT.to_string(),
            created_at: Utc::now(),
            status: MessageStatus::Sent,
            streaming: true,
            analysis_mode: request.analysis_mode,
            attachment_ids: Vec::new(),
        };
        self.db.insert_message(&placeholder).await?;

        let service = self.clone();
        let pending = user_message.clone();
        let placeholder_id = placeholder.id;
        tokio::spawn(async move {
            service.resolve_turn(&pending, placeholder_id).await;
        });

        Ok(placeholder)
    }

    /// Resolve a placeholder into its final content. Runs detached; every
    /// failure ends up as the placeholder's content or a log line, never a
    /// panic.
    async fn resolve_turn(&self, user_message: &Message, placeholder_id: Uuid) {
        let content = match self.compose_and_generate(user_message, placeholder_id).await {
            Ok(content) => content,
            Err(err) => err,
        };

        if let Err(err) = self
            .db
            .update_message_content(placeholder_id, &content, true)
            .await
        {
            tracing::error!(id = %placeholder_id, error = %err, "failed to finalize turn");
        }
    }

    /// Run the completion for a turn. The error branch carries the
    /// user-facing message to store in place of an answer.
    async fn compose_and_generate(
        &self,
        user_message: &Message,
        placeholder_id: Uuid,
    ) -> std::result::Result<String, String> {
        let reports = self.extract_reports(user_message).await;

        let result = if reports.is_empty() {
            let history = self
                .db
                .list_messages(user_message.session_id)
                .await
                .map_err(|err| err.to_string())?;
            let history: Vec<Message> = history
                .into_iter()
                .filter(|msg| msg.id != placeholder_id && msg.id != user_message.id)
                .collect();
            let messages = prompt::conversation_messages(&history, &user_message.content);
            self.completion
                .generate(&messages, CONVERSATION_TEMPERATURE, CONVERSATION_MAX_TOKENS)
                .await
        } else {
            let mode = user_message.analysis_mode.unwrap_or_default();
            let messages = prompt::analysis_messages(mode, &reports, &user_message.content);
            self.completion
                .generate(&messages, ANALYSIS_TEMPERATURE, ANALYSIS_MAX_TOKENS)
                .await
        };

        result.map_err(|err| err.to_string())
    }

    /// Extract content for every attachment on the message. Attachments with
    /// missing metadata or bytes are skipped rather than failing the turn.
    async fn extract_reports(&self, user_message: &Message) -> Vec<FileReport> {
        let mut reports = Vec::new();

        for &attachment_id in &user_message.attachment_ids {
            let attachment = match self.db.get_attachment(attachment_id).await {
                Ok(Some(attachment)) => attachment,
                Ok(None) => {
                    tracing::warn!(id = %attachment_id, "attachment metadata missing, skipping");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(id = %attachment_id, error = %err, "attachment lookup failed, skipping");
                    continue;
                }
            };

            let bytes = match self.store.read(attachment.id, &attachment.name) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(id = %attachment_id, error = %err, "attachment bytes unreadable, skipping");
                    continue;
                }
            };

            let modified = self.store.modified(attachment.id, &attachment.name);
            reports.push(FileReport {
                file_name: attachment.name.clone(),
                content: extract_file(&attachment.name, &bytes, modified),
            });
        }

        reports
    }
}
