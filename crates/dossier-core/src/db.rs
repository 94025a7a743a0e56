//! Database operations for dossier.

use crate::error::{Error, Result};
use crate::models::*;
use crate::schema::SCHEMA;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Title given to the session created at first boot.
pub const DEFAULT_SESSION_TITLE: &str = "New Conversation";

/// Database handle for dossier.
///
/// Cloning is cheap (the underlying pool is shared); a clone serves as an
/// independent handle for detached background work.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        let parent = path.parent().unwrap_or(Path::new("."));
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// Open an in-memory database. Swappable backing for tests; same schema
    /// and code path as the on-disk store.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // A single connection keeps every query on the same in-memory
        // database instance.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// Initialize schema.
    async fn init(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database.
    pub async fn close(self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Create a new session with the given title.
    pub async fn create_session(&self, title: &str) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: Utc::now(),
            file_count: 0,
            favorite: false,
        };

        sqlx::query(
            "INSERT INTO sessions (id, title, created_at, file_count, favorite) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(&session.title)
        .bind(session.created_at.timestamp())
        .bind(session.file_count)
        .bind(session.favorite)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    /// Ensure at least one session exists, creating a default one otherwise.
    pub async fn ensure_default_session(&self) -> Result<()> {
        if self.count_sessions().await? == 0 {
            let session = self.create_session(DEFAULT_SESSION_TITLE).await?;
            tracing::info!(id = %session.id, "created default session");
        }
        Ok(())
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| session_from_row(&row)))
    }

    /// List all sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let rows = sqlx::query("SELECT * FROM sessions ORDER BY created_at DESC, rowid DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(session_from_row).collect())
    }

    /// Update a session's title.
    pub async fn update_session_title(&self, id: Uuid, title: &str) -> Result<Session> {
        let result = sqlx::query("UPDATE sessions SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("session '{id}'")));
        }

        self.get_session(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session '{id}'")))
    }

    /// Toggle a session's favorite flag.
    pub async fn toggle_favorite(&self, id: Uuid) -> Result<Session> {
        let result = sqlx::query("UPDATE sessions SET favorite = NOT favorite WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("session '{id}'")));
        }

        self.get_session(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session '{id}'")))
    }

    /// Delete a session. Cascades to its messages and their attachment links.
    pub async fn delete_session(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("session '{id}'")));
        }
        Ok(())
    }

    /// Bump the session's cumulative attachment counter.
    ///
    /// The counter only ever grows; attachments removed later do not
    /// decrement it.
    pub async fn add_session_files(&self, id: Uuid, count: i64) -> Result<()> {
        let result = sqlx::query("UPDATE sessions SET file_count = file_count + ? WHERE id = ?")
            .bind(count)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("session '{id}'")));
        }
        Ok(())
    }

    /// Get session count.
    pub async fn count_sessions(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Insert a message, linking its attachments in the same transaction.
    pub async fn insert_message(&self, msg: &Message) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO messages (id, session_id, role, content, created_at, status, streaming, analysis_mode)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(msg.id.to_string())
        .bind(msg.session_id.to_string())
        .bind(msg.role.to_string())
        .bind(&msg.content)
        .bind(msg.created_at.timestamp())
        .bind(msg.status.to_string())
        .bind(msg.streaming)
        .bind(msg.analysis_mode.map(|m| m.to_string()))
        .execute(&mut *tx)
        .await?;

        for attachment_id in &msg.attachment_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO message_attachments (message_id, attachment_id) VALUES (?, ?)",
            )
            .bind(msg.id.to_string())
            .bind(attachment_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get all messages for a session in chronological order.
    pub async fn list_messages(&self, session_id: Uuid) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ? ORDER BY created_at, rowid",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::new();
        for row in rows {
            let mut msg = message_from_row(&row);
            msg.attachment_ids = self.attachment_ids_for(msg.id).await?;
            messages.push(msg);
        }
        Ok(messages)
    }

    /// Get a message by ID.
    pub async fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut msg = message_from_row(&row);
                msg.attachment_ids = self.attachment_ids_for(msg.id).await?;
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }

    /// Replace a message's content in place, optionally clearing the
    /// streaming flag. The message keeps its identity; this is the single
    /// mutation that turns a pending placeholder into the final answer.
    pub async fn update_message_content(
        &self,
        id: Uuid,
        content: &str,
        clear_streaming: bool,
    ) -> Result<()> {
        let result = if clear_streaming {
            sqlx::query("UPDATE messages SET content = ?, streaming = 0 WHERE id = ?")
                .bind(content)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("UPDATE messages SET content = ? WHERE id = ?")
                .bind(content)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?
        };

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("message '{id}'")));
        }
        Ok(())
    }

    /// Get message count.
    pub async fn count_messages(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    async fn attachment_ids_for(&self, message_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT attachment_id FROM message_attachments WHERE message_id = ? ORDER BY rowid",
        )
        .bind(message_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| Uuid::parse_str(row.get::<&str, _>("attachment_id")).ok())
            .collect())
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// Insert attachment metadata.
    pub async fn insert_attachment(&self, attachment: &FileAttachment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO attachments (id, name, size, media_type, upload_progress, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(attachment.id.to_string())
        .bind(&attachment.name)
        .bind(attachment.size)
        .bind(&attachment.media_type)
        .bind(attachment.upload_progress)
        .bind(attachment.status.to_string())
        .bind(attachment.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get attachment metadata by ID.
    pub async fn get_attachment(&self, id: Uuid) -> Result<Option<FileAttachment>> {
        let row = sqlx::query("SELECT * FROM attachments WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| attachment_from_row(&row)))
    }

    /// Delete attachment metadata. Callers are responsible for reaping the
    /// backing bytes from the content store.
    pub async fn delete_attachment(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("attachment '{id}'")));
        }
        Ok(())
    }
}

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> Session {
    Session {
        id: Uuid::parse_str(row.get::<&str, _>("id")).unwrap_or_default(),
        title: row.get("title"),
        created_at: chrono::DateTime::from_timestamp(row.get::<i64, _>("created_at"), 0)
            .unwrap_or_default()
            .with_timezone(&Utc),
        file_count: row.get("file_count"),
        favorite: row.get("favorite"),
    }
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: Uuid::parse_str(row.get::<&str, _>("id")).unwrap_or_default(),
        session_id: Uuid::parse_str(row.get::<&str, _>("session_id")).unwrap_or_default(),
        role: MessageRole::from(row.get::<&str, _>("role")),
        content: row.get("content"),
        created_at: chrono::DateTime::from_timestamp(row.get::<i64, _>("created_at"), 0)
            .unwrap_or_default()
            .with_timezone(&Utc),
        status: MessageStatus::from(row.get::<&str, _>("status")),
        streaming: row.get("streaming"),
        analysis_mode: row
            .get::<Option<&str>, _>("analysis_mode")
            .map(AnalysisMode::from),
        attachment_ids: Vec::new(),
    }
}

fn attachment_from_row(row: &sqlx::sqlite::SqliteRow) -> FileAttachment {
    FileAttachment {
        id: Uuid::parse_str(row.get::<&str, _>("id")).unwrap_or_default(),
        name: row.get("name"),
        size: row.get("size"),
        media_type: row.get("media_type"),
        upload_progress: row.get("upload_progress"),
        status: AttachmentStatus::Uploaded,
        created_at: chrono::DateTime::from_timestamp(row.get::<i64, _>("created_at"), 0)
            .unwrap_or_default()
            .with_timezone(&Utc),
    }
}
