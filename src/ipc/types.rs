use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::attendance::AttendanceSession;
use crate::model::UserProfile;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Acting user as reported by the shell's auth layer.
    pub user: Option<UserProfile>,
    pub attendance: Option<AttendanceSession>,
}
