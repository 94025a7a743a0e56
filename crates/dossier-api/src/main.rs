use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clap::{Args, Parser};
use log::info;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use dossier_core::completion::CompletionClient;
use dossier_core::db::DEFAULT_SESSION_TITLE;
use dossier_core::models::{AnalysisMode, AttachmentStatus, FileAttachment, Message, Session};
use dossier_core::turn::TurnRequest;
use dossier_core::{ChatService, Config, ContentStore, Database, Error};

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn try_main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config_path = cli
        .common
        .config
        .unwrap_or_else(Config::default_config_path);
    let config = Config::ensure_at(&config_path)?;

    let db = Database::open(&config.database).await?;
    db.ensure_default_session().await?;
    let store = ContentStore::open(&config.upload_dir)?;
    let completion = CompletionClient::new(&config.completion);
    let chat = ChatService::new(db.clone(), store.clone(), completion);

    let state = AppState { db, store, chat };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/{id}",
            get(get_session).put(rename_session).delete(delete_session),
        )
        .route("/api/sessions/{id}/favorite", put(toggle_favorite))
        .route(
            "/api/messages/{session_id}",
            get(list_messages).post(send_message),
        )
        .route("/api/files/upload", post(upload_file))
        .route("/api/files/{id}", get(get_file).delete(delete_file))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.common.port));
    info!("Starting API server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Parser)]
#[command(author, version, about = "HTTP API server for dossier")]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,
}

#[derive(Clone)]
struct AppState {
    db: Database,
    store: ContentStore,
    chat: ChatService,
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn list_sessions(State(state): State<AppState>) -> Result<Json<Vec<Session>>, StatusCode> {
    let sessions = state
        .db
        .list_sessions()
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Json(sessions))
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    title: Option<String>,
}

async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), StatusCode> {
    let title = body
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());
    let session = state
        .db
        .create_session(&title)
        .await
        .map_err(|e| status_for(&e))?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, StatusCode> {
    let session = state
        .db
        .get_session(id)
        .await
        .map_err(|e| status_for(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
struct RenameSessionRequest {
    title: String,
}

async fn rename_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RenameSessionRequest>,
) -> Result<Json<Session>, StatusCode> {
    let session = state
        .db
        .update_session_title(id, &body.title)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Json(session))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, StatusCode> {
    let session = state
        .db
        .toggle_favorite(id)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Json(session))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    state
        .db
        .delete_session(id)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    state
        .db
        .get_session(session_id)
        .await
        .map_err(|e| status_for(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    let messages = state
        .db
        .list_messages(session_id)
        .await
        .map_err(|e| status_for(&e))?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    content: String,
    #[serde(default)]
    attachment_ids: Vec<Uuid>,
    analysis_mode: Option<String>,
}

/// Accept a user turn. Responds immediately with the streaming placeholder;
/// the final content lands on the same message id once generation finishes.
async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), StatusCode> {
    let analysis_mode = body
        .analysis_mode
        .as_deref()
        .map(AnalysisMode::from)
        .or_else(|| (!body.attachment_ids.is_empty()).then(AnalysisMode::default));

    let placeholder = state
        .chat
        .submit_user_turn(TurnRequest {
            session_id,
            content: body.content,
            attachment_ids: body.attachment_ids,
            analysis_mode,
        })
        .await
        .map_err(|e| status_for(&e))?;

    Ok((StatusCode::CREATED, Json(placeholder)))
}

async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileAttachment>), StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field
            .file_name()
            .unwrap_or("upload")
            .to_string();
        let media_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;

        let attachment = FileAttachment {
            id: Uuid::new_v4(),
            name,
            size: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            media_type,
            upload_progress: 100,
            status: AttachmentStatus::Uploaded,
            created_at: chrono::Utc::now(),
        };

        state
            .store
            .write(attachment.id, &attachment.name, &bytes)
            .map_err(|e| status_for(&e))?;
        state
            .db
            .insert_attachment(&attachment)
            .await
            .map_err(|e| status_for(&e))?;

        return Ok((StatusCode::CREATED, Json(attachment)));
    }

    Err(StatusCode::BAD_REQUEST)
}

async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileAttachment>, StatusCode> {
    let attachment = state
        .db
        .get_attachment(id)
        .await
        .map_err(|e| status_for(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(attachment))
}

/// Delete an attachment: reap the bytes first (idempotent, already-absent
/// bytes are fine), then drop the metadata row.
async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let attachment = state
        .db
        .get_attachment(id)
        .await
        .map_err(|e| status_for(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    state
        .store
        .remove(attachment.id, &attachment.name)
        .map_err(|e| status_for(&e))?;
    state
        .db
        .delete_attachment(id)
        .await
        .map_err(|e| status_for(&e))?;

    Ok(StatusCode::NO_CONTENT)
}
