mod attendance;
mod config;
mod csv_io;
mod db;
mod ipc;
mod model;
mod reports;
mod store;
mod table;

use std::io::{self, BufRead, Write};

fn main() {
    let config = config::Config::from_env();
    if let Err(e) = config::init_tracing(&config) {
        eprintln!("{e}");
    }

    let mut state = ipc::AppState::default();
    if let Some(ws) = config.workspace.as_ref() {
        match db::open_db(ws) {
            Ok(conn) => {
                tracing::info!(workspace = %ws.display(), "workspace opened from environment");
                state.workspace = Some(ws.clone());
                state.db = Some(conn);
            }
            Err(e) => tracing::error!(workspace = %ws.display(), error = %e, "failed to open workspace"),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
