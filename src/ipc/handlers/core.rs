use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_str, required_text, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::UserProfile;
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "userId": state.user.as_ref().map(|u| u.user_id.clone()),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            if let Some(user) = state.user.as_ref() {
                // Keep the profile resolvable in the new workspace too.
                if let Err(e) = store::upsert_profile(&conn, user) {
                    tracing::warn!(error = %e, "failed to carry profile into workspace");
                }
            }
            tracing::info!(workspace = %path.display(), "workspace selected");
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            // A session from another workspace no longer applies.
            state.attendance = None;
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => {
            tracing::error!(workspace = %path.display(), error = %e, "failed to open workspace");
            err(&req.id, "db_open_failed", format!("{e:#}"), None)
        }
    }
}

fn session_set(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let profile = UserProfile {
        user_id: required_text(params, "userId")?,
        full_name: optional_str(params, "fullName").unwrap_or("").trim().to_string(),
        email: optional_str(params, "email").unwrap_or("").trim().to_string(),
    };
    if let Some(conn) = state.db.as_ref() {
        store::upsert_profile(conn, &profile).map_err(|e| HandlerErr::db("db_insert_failed", e))?;
    }
    tracing::info!(user_id = %profile.user_id, "acting user set");
    let out = json!({ "user": profile });
    state.user = Some(profile);
    Ok(out)
}

fn session_get(state: &AppState) -> serde_json::Value {
    json!({ "user": state.user })
}

fn settings_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let key = required_text(params, "key")?;
    let value = db::settings_get_json(conn, &key).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "key": key, "value": value }))
}

fn settings_set(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let key = required_text(params, "key")?;
    let Some(value) = params.get("value") else {
        return Err(HandlerErr::bad_params("missing value"));
    };
    db::settings_set_json(conn, &key, value).map_err(|e| HandlerErr::db("db_update_failed", e))?;
    Ok(json!({ "key": key, "value": value }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => return Some(handle_health(state, req)),
        "workspace.select" => return Some(handle_workspace_select(state, req)),
        "session.set" => session_set(state, &req.params),
        "session.get" => Ok(session_get(state)),
        "settings.get" => settings_get(state, &req.params),
        "settings.set" => settings_set(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
