use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

/// One request line from the host UI: `{"id", "method", "params"}`.
/// `params` defaults to JSON null when the host omits it.
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything lives per-workspace; both fields stay `None` until the host
/// sends `workspace.select`.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}
