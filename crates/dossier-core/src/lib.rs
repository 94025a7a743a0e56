//! dossier-core: document-analysis chat backend
//!
//! This crate provides the core functionality for dossier: persistent chat
//! sessions with file attachments, extraction of uploaded business documents
//! (PDF, spreadsheets, CSV, JSON, plain text) into LLM-ready text, prompt
//! composition, and a completion client with a model fallback chain.

pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod prompt;
pub mod schema;
pub mod store;
pub mod turn;

pub use config::Config;
pub use db::Database;
pub use error::Error;
pub use error::Result;
pub use store::ContentStore;
pub use turn::ChatService;

/// Application name used for config directories and paths.
pub const APP_NAME: &str = "dossier";
