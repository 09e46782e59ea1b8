use crate::attendance::{AttendanceSession, LoadTicket, Phase};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    db_conn, ensure_class, optional_date, optional_str, required_date, required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceChange;
use crate::store::{self, ClassOrder, SaveOutcome};
use rusqlite::Connection;
use serde_json::json;

fn session_state(session: &AttendanceSession) -> &'static str {
    match session.phase() {
        Phase::Ready if session.roster().is_empty() => "noStudents",
        other => other.as_str(),
    }
}

fn view_json(session: &AttendanceSession) -> serde_json::Value {
    let mut v = json!(session.view());
    v["state"] = json!(session_state(session));
    v
}

fn request_generation(params: &serde_json::Value) -> Option<u64> {
    params.get("generation").and_then(|v| v.as_u64())
}

/// Reads roster and records for the session's current selection and applies
/// them if `ticket` is still the latest one.
fn load(
    conn: &Connection,
    session: &mut AttendanceSession,
    ticket: LoadTicket,
) -> Result<(), HandlerErr> {
    let result = store::load_roster_and_records(conn, session.class_id(), session.date());
    session.finish_load(ticket, result);
    match session.phase() {
        Phase::Error { message } => Err(HandlerErr::new("db_query_failed", message.clone())
            .with_details(json!({ "view": view_json(session) }))),
        _ => Ok(()),
    }
}

fn attendance_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let AppState { db, attendance, .. } = state;
    let conn = db.as_ref().ok_or_else(HandlerErr::no_workspace)?;
    let date = optional_date(params, "date")?.unwrap_or_else(|| chrono::Local::now().date_naive());

    let class_id = match optional_str(params, "classId") {
        Some(c) => {
            ensure_class(conn, c)?;
            c.to_string()
        }
        None => {
            let classes = store::list_classes(conn, ClassOrder::Name)
                .map_err(|e| HandlerErr::db("db_query_failed", e))?;
            match classes.first() {
                Some(row) => row.class.id.clone(),
                None => {
                    *attendance = None;
                    return Ok(json!({ "state": "noClasses" }));
                }
            }
        }
    };

    let session = attendance.get_or_insert_with(|| AttendanceSession::new(&class_id, date));
    let ticket = session.select(&class_id, date);
    load(conn, session, ticket)?;
    tracing::debug!(
        class_id = %class_id,
        generation = ticket.generation(),
        students = session.roster().len(),
        "attendance opened"
    );
    Ok(view_json(session))
}

fn session_mut<'a>(
    state: &'a mut AppState,
    params: &serde_json::Value,
) -> Result<&'a mut AttendanceSession, HandlerErr> {
    let session = state
        .attendance
        .as_mut()
        .ok_or_else(|| HandlerErr::new("not_ready", "open attendance for a class first"))?;
    session.check_generation(request_generation(params))?;
    Ok(session)
}

fn attendance_view(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session = session_mut(state, params)?;
    Ok(view_json(session))
}

fn attendance_toggle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let session = session_mut(state, params)?;
    let present = session.toggle(&student_id)?;
    Ok(json!({ "studentId": student_id, "present": present, "view": view_json(session) }))
}

fn attendance_mark_all(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let present = params
        .get("present")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params("missing present"))?;
    let session = session_mut(state, params)?;
    session.mark_all(present)?;
    Ok(view_json(session))
}

fn attendance_save(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let user = state.user.as_ref().map(|u| u.user_id.clone());
    let AppState { db, attendance, .. } = state;
    let conn = db
        .as_ref()
        .ok_or_else(HandlerErr::no_workspace)?;
    let session = attendance
        .as_mut()
        .ok_or_else(|| HandlerErr::new("not_ready", "open attendance for a class first"))?;
    session.check_generation(request_generation(params))?;

    let plan = session.plan_save(user.as_deref())?;
    let outcome = store::save_attendance(
        conn,
        session.class_id(),
        session.date(),
        &plan.changes,
        &plan.marks,
    )
    .map_err(|e| {
        tracing::error!(class_id = %session.class_id(), error = %e, "attendance save failed");
        HandlerErr::db("db_tx_failed", e)
    })?;
    tracing::info!(
        class_id = %session.class_id(),
        date = %session.date(),
        written = outcome.written,
        logged = outcome.logged,
        "attendance saved"
    );

    let ticket = session.begin_load();
    let reload = load(conn, session, ticket);
    Ok(save_response(&outcome, &plan.changes, session, reload))
}

/// The save is committed once we get here, so a failed reload is reported
/// alongside the outcome instead of replacing it.
fn save_response(
    outcome: &SaveOutcome,
    changes: &[AttendanceChange],
    session: &AttendanceSession,
    reload: Result<(), HandlerErr>,
) -> serde_json::Value {
    let mut v = json!({
        "saved": outcome,
        "changes": changes,
        "view": view_json(session),
    });
    if let Err(e) = reload {
        tracing::warn!(class_id = %session.class_id(), error = %e.message, "reload after save failed");
        v["reloadError"] = json!({ "code": e.code, "message": e.message });
    }
    v
}

fn attendance_change_log(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let class_id = required_str(params, "classId")?;
    let date = required_date(params, "date")?;
    let entries = store::change_log_for(conn, &class_id, date)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "entries": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.open" => attendance_open(state, &req.params),
        "attendance.view" => attendance_view(state, &req.params),
        "attendance.toggle" => attendance_toggle(state, &req.params),
        "attendance.markAll" => attendance_mark_all(state, &req.params),
        "attendance.save" => attendance_save(state, &req.params),
        "attendance.changeLog" => attendance_change_log(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
