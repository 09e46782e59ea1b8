use crate::attendance::SessionError;
use crate::db;
use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::model::parse_date;
use crate::store;
use crate::table::DEFAULT_PAGE_SIZE;
use chrono::NaiveDate;
use rusqlite::Connection;

pub const PAGE_SIZE_SETTING: &str = "table.pageSize";

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn no_workspace() -> Self {
        Self::new("no_workspace", "select a workspace first")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    /// Wraps a store failure, keeping the full context chain in the message.
    pub fn db(code: &'static str, e: anyhow::Error) -> Self {
        Self::new(code, format!("{e:#}"))
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<SessionError> for HandlerErr {
    fn from(e: SessionError) -> Self {
        let code = match e {
            SessionError::NotReady => "not_ready",
            SessionError::Stale { .. } => "stale_session",
            SessionError::UnknownStudent(_) => "not_found",
            SessionError::NoSession => "no_session",
        };
        HandlerErr::new(code, e.to_string())
    }
}

pub fn db_conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(HandlerErr::no_workspace)
}

pub fn ensure_class(conn: &Connection, class_id: &str) -> Result<(), HandlerErr> {
    match store::get_class(conn, class_id) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(HandlerErr::not_found("class not found")),
        Err(e) => Err(HandlerErr::db("db_query_failed", e)),
    }
}

pub fn acting_user(state: &AppState) -> Result<String, HandlerErr> {
    state
        .user
        .as_ref()
        .map(|u| u.user_id.clone())
        .ok_or_else(|| SessionError::NoSession.into())
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Required and non-blank after trimming.
pub fn required_text(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = required_str(params, key)?.trim().to_string();
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(v)
}

pub fn optional_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// `None` when absent, `Some(None)` for null or blank, `Some(Some(..))` otherwise.
pub fn nullable_text(params: &serde_json::Value, key: &str) -> Option<Option<String>> {
    let v = params.get(key)?;
    Some(
        v.as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    )
}

pub fn required_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = required_str(params, key)?;
    parse_date(&raw).ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn optional_date(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<NaiveDate>, HandlerErr> {
    match optional_str(params, key) {
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key))),
        None => Ok(None),
    }
}

/// Search term, requested page and page size for a table view. The page size
/// falls back to the workspace setting, then to the table default.
pub struct TableParams {
    pub search: String,
    pub page: usize,
    pub page_size: usize,
}

pub fn table_params(
    conn: Option<&Connection>,
    params: &serde_json::Value,
) -> Result<TableParams, HandlerErr> {
    let page_size = match params.get("pageSize").and_then(|v| v.as_u64()) {
        Some(0) => return Err(HandlerErr::bad_params("pageSize must be at least 1")),
        Some(n) => n as usize,
        None => configured_page_size(conn),
    };
    Ok(TableParams {
        search: optional_str(params, "search").unwrap_or("").to_string(),
        page: params.get("page").and_then(|v| v.as_u64()).unwrap_or(0) as usize,
        page_size,
    })
}

fn configured_page_size(conn: Option<&Connection>) -> usize {
    conn.map(|c| setting_usize(c, PAGE_SIZE_SETTING, DEFAULT_PAGE_SIZE))
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

/// Reads a positive integer setting, falling back to `default`.
pub fn setting_usize(conn: &Connection, key: &str, default: usize) -> usize {
    match db::settings_get_json(conn, key) {
        Ok(Some(v)) => v
            .as_u64()
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(default),
        Ok(None) => default,
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring unreadable setting");
            default
        }
    }
}
