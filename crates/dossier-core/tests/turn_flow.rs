use async_trait::async_trait;
use chrono::Utc;
use dossier_core::completion::{
    ChatMessage, ChatRole, CompletionBackend, CompletionClient, CompletionError,
};
use dossier_core::models::{AnalysisMode, AttachmentStatus, FileAttachment};
use dossier_core::turn::{THINKING_CONTENT, TurnRequest};
use dossier_core::{ChatService, ContentStore, Database, Error};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

struct RecordingBackend {
    answer: String,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingBackend {
    fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> Vec<ChatMessage> {
        self.prompts
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .expect("at least one prompt")
    }
}

#[async_trait]
impl CompletionBackend for RecordingBackend {
    async fn complete(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _temperature: f64,
        _max_tokens: u32,
    ) -> Result<String, CompletionError> {
        self.prompts.lock().expect("lock").push(messages.to_vec());
        Ok(self.answer.clone())
    }
}

fn chain() -> Vec<String> {
    vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()]
}

async fn service_with(
    backend: Arc<RecordingBackend>,
) -> (ChatService, Database, ContentStore, tempfile::TempDir) {
    let db = Database::open_in_memory().await.expect("open database");
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ContentStore::open(&dir.path().join("uploads")).expect("open store");
    let client = CompletionClient::with_backend(backend, "gpt-4o", chain());
    (
        ChatService::new(db.clone(), store.clone(), client),
        db,
        store,
        dir,
    )
}

/// Poll until the placeholder stops streaming.
async fn wait_for_resolution(db: &Database, id: Uuid) -> dossier_core::models::Message {
    for _ in 0..200 {
        let msg = db
            .get_message(id)
            .await
            .expect("get message")
            .expect("message present");
        if !msg.streaming {
            return msg;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("placeholder never resolved");
}

#[tokio::test]
async fn conversation_turn_resolves_placeholder_in_place() {
    let backend = RecordingBackend::new("The outlook is positive.");
    let (service, db, _store, _dir) = service_with(backend.clone()).await;
    let session = db.create_session("chat").await.expect("create");

    let placeholder = service
        .submit_user_turn(TurnRequest {
            session_id: session.id,
            content: "How does Q3 look?".to_string(),
            attachment_ids: Vec::new(),
            analysis_mode: None,
        })
        .await
        .expect("submit");

    assert_eq!(placeholder.content, THINKING_CONTENT);
    assert!(placeholder.streaming);

    let resolved = wait_for_resolution(&db, placeholder.id).await;
    assert_eq!(resolved.id, placeholder.id);
    assert_eq!(resolved.content, "The outlook is positive.");

    let messages = db.list_messages(session.id).await.expect("list");
    assert_eq!(messages.len(), 2);

    // The prompt carries persona plus the current question only.
    let prompt = backend.last_prompt();
    assert_eq!(prompt[0].role, ChatRole::System);
    let last = prompt.last().expect("user message");
    assert_eq!(last.content, "How does Q3 look?");
    assert_eq!(prompt.len(), 2);
}

#[tokio::test]
async fn conversation_history_excludes_pending_turn() {
    let backend = RecordingBackend::new("answer");
    let (service, db, _store, _dir) = service_with(backend.clone()).await;
    let session = db.create_session("chat").await.expect("create");

    let first = service
        .submit_user_turn(TurnRequest {
            session_id: session.id,
            content: "first question".to_string(),
            attachment_ids: Vec::new(),
            analysis_mode: None,
        })
        .await
        .expect("submit");
    wait_for_resolution(&db, first.id).await;

    let second = service
        .submit_user_turn(TurnRequest {
            session_id: session.id,
            content: "second question".to_string(),
            attachment_ids: Vec::new(),
            analysis_mode: None,
        })
        .await
        .expect("submit");
    wait_for_resolution(&db, second.id).await;

    // system + first user + first answer + current question.
    let prompt = backend.last_prompt();
    assert_eq!(prompt.len(), 4);
    assert_eq!(prompt[1].content, "first question");
    assert_eq!(prompt[2].content, "answer");
    assert_eq!(prompt[3].content, "second question");
}

#[tokio::test]
async fn attachment_turn_runs_analysis_prompt() {
    let backend = RecordingBackend::new("KPIs extracted.");
    let (service, db, store, _dir) = service_with(backend.clone()).await;
    let session = db.create_session("analysis").await.expect("create");

    let file = FileAttachment {
        id: Uuid::new_v4(),
        name: "sales.csv".to_string(),
        size: 32,
        media_type: "text/csv".to_string(),
        upload_progress: 100,
        status: AttachmentStatus::Uploaded,
        created_at: Utc::now(),
    };
    db.insert_attachment(&file).await.expect("insert");
    store
        .write(file.id, &file.name, b"region,sales\nnorth,10\nsouth,20\n")
        .expect("write bytes");

    let placeholder = service
        .submit_user_turn(TurnRequest {
            session_id: session.id,
            content: "focus on regions".to_string(),
            attachment_ids: vec![file.id],
            analysis_mode: Some(AnalysisMode::Kpis),
        })
        .await
        .expect("submit");

    let resolved = wait_for_resolution(&db, placeholder.id).await;
    assert_eq!(resolved.content, "KPIs extracted.");

    let prompt = backend.last_prompt();
    let user_prompt = &prompt.last().expect("user prompt").content;
    assert!(user_prompt.contains("key performance indicators"));
    assert!(user_prompt.contains("File: sales.csv"));
    assert!(user_prompt.contains("FILE: sales.csv"));
    assert!(user_prompt.contains("Additional context from user: focus on regions"));

    let session = db
        .get_session(session.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(session.file_count, 1);
}

#[tokio::test]
async fn attachment_without_bytes_falls_back_to_conversation() {
    let backend = RecordingBackend::new("resolved anyway");
    let (service, db, _store, _dir) = service_with(backend.clone()).await;
    let session = db.create_session("analysis").await.expect("create");

    let file = FileAttachment {
        id: Uuid::new_v4(),
        name: "ghost.csv".to_string(),
        size: 0,
        media_type: "text/csv".to_string(),
        upload_progress: 100,
        status: AttachmentStatus::Uploaded,
        created_at: Utc::now(),
    };
    db.insert_attachment(&file).await.expect("insert");
    // No bytes written to the store.

    let placeholder = service
        .submit_user_turn(TurnRequest {
            session_id: session.id,
            content: "what now?".to_string(),
            attachment_ids: vec![file.id],
            analysis_mode: Some(AnalysisMode::Summarize),
        })
        .await
        .expect("submit");

    let resolved = wait_for_resolution(&db, placeholder.id).await;
    assert_eq!(resolved.content, "resolved anyway");

    // With no extractable reports the turn composes a conversation prompt.
    let prompt = backend.last_prompt();
    assert!(!prompt.last().expect("user prompt").content.contains("File:"));
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let backend = RecordingBackend::new("unused");
    let (service, _db, _store, _dir) = service_with(backend).await;

    let err = service
        .submit_user_turn(TurnRequest {
            session_id: Uuid::new_v4(),
            content: "hello".to_string(),
            attachment_ids: Vec::new(),
            analysis_mode: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn unconfigured_client_surfaces_error_as_content() {
    let db = Database::open_in_memory().await.expect("open database");
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ContentStore::open(dir.path()).expect("open store");
    let client = CompletionClient::new(&dossier_core::config::CompletionConfig::default());
    let service = ChatService::new(db.clone(), store, client);

    let session = db.create_session("chat").await.expect("create");
    let placeholder = service
        .submit_user_turn(TurnRequest {
            session_id: session.id,
            content: "hello".to_string(),
            attachment_ids: Vec::new(),
            analysis_mode: None,
        })
        .await
        .expect("submit");

    let resolved = wait_for_resolution(&db, placeholder.id).await;
    assert!(resolved.content.contains("API key is not configured"));
    assert!(!resolved.streaming);
}
