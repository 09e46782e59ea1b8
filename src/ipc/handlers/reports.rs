use crate::csv_io;
use crate::ipc::error::ok;
use crate::ipc::handlers::table::view_json;
use crate::ipc::helpers::{
    db_conn, optional_date, optional_str, required_date, required_str, setting_usize,
    table_params, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::format_date;
use crate::reports::{self, DateReport, StudentReport};
use crate::store::{self, AttendanceFilter, ClassOrder, StudentFilter};
use crate::table::{Column, DataTable};
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;

pub const RECENT_CLASS_LIMIT_SETTING: &str = "dashboard.recentClassLimit";
pub const RECENT_RECORD_LIMIT_SETTING: &str = "dashboard.recentRecordLimit";

fn query_err(e: anyhow::Error) -> HandlerErr {
    HandlerErr::db("db_query_failed", e)
}

/// `None` and `"all"` both mean no class filter.
fn class_filter(params: &serde_json::Value) -> Option<&str> {
    optional_str(params, "classId").filter(|c| *c != "all")
}

fn load_student_reports(
    conn: &Connection,
    class_id: Option<&str>,
    student_id: Option<&str>,
) -> Result<Vec<StudentReport>, HandlerErr> {
    let students = store::list_students(
        conn,
        &StudentFilter {
            class_id,
            student_id,
        },
    )
    .map_err(query_err)?;
    // Counted by student, whichever class a record was taken under.
    let records = store::list_attendance(
        conn,
        &AttendanceFilter {
            student_id,
            ..Default::default()
        },
    )
    .map_err(query_err)?;
    Ok(reports::student_reports(&students, &records))
}

fn load_class_summaries(conn: &Connection) -> Result<Vec<reports::ClassSummary>, HandlerErr> {
    let classes: Vec<_> = store::list_classes(conn, ClassOrder::Name)
        .map_err(query_err)?
        .into_iter()
        .map(|row| row.class)
        .collect();
    let student_rows = load_student_reports(conn, None, None)?;
    Ok(reports::class_summaries(&classes, &student_rows))
}

fn load_date_reports(
    conn: &Connection,
    class_id: &str,
    date: chrono::NaiveDate,
) -> Result<Vec<DateReport>, HandlerErr> {
    let students = store::list_students(
        conn,
        &StudentFilter {
            class_id: Some(class_id),
            ..Default::default()
        },
    )
    .map_err(query_err)?;
    let records = store::list_attendance(
        conn,
        &AttendanceFilter {
            class_id: Some(class_id),
            date: Some(date),
            ..Default::default()
        },
    )
    .map_err(query_err)?;
    Ok(reports::date_reports(&students, &records))
}

fn reports_students(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let rows = load_student_reports(conn, class_filter(params), optional_str(params, "studentId"))?;

    let tp = table_params(Some(conn), params)?;
    let table = DataTable::new(vec![
        Column::new("roll_no", "Roll No"),
        Column::new("full_name", "Name"),
        Column::new("class_name", "Class"),
        Column::new("total_days", "Total Days"),
        Column::new("present_days", "Present"),
        Column::new("absent_days", "Absent"),
        Column::new("percentage", "Attendance")
            .render_with(|r: &StudentReport| format!("{}%", r.percentage)),
        Column::new("band", "Status")
            .render_with(|r: &StudentReport| r.band().as_str().to_string())
            .class_name("status-badge"),
    ])
    .search_key("full_name")
    .search_placeholder("Search students...")
    .page_size(tp.page_size)
    .empty_message("No attendance data found");

    let report_rows: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "rollNo": r.roll_no,
                "fullName": r.full_name,
                "className": r.class_name,
                "totalDays": r.total_days,
                "presentDays": r.present_days,
                "absentDays": r.absent_days,
                "percentage": r.percentage,
                "band": r.band(),
            })
        })
        .collect();
    Ok(json!({
        "reports": report_rows,
        "table": view_json(&table, &rows, &tp),
    }))
}

fn reports_classes(state: &AppState, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let summaries = load_class_summaries(conn)?;
    Ok(json!({ "classes": summaries }))
}

fn reports_date(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let class_id = required_str(params, "classId")?;
    let date = required_date(params, "date")?;
    let rows = load_date_reports(conn, &class_id, date)?;

    let tp = table_params(Some(conn), params)?;
    let table = DataTable::new(vec![
        Column::new("roll_no", "Roll No"),
        Column::new("full_name", "Name"),
        Column::new("status", "Status").class_name("status-badge"),
    ])
    .search_key("full_name")
    .search_placeholder("Search students...")
    .page_size(tp.page_size)
    .empty_message("No attendance recorded for this date");

    let present = rows.iter().filter(|r| r.is_present).count();
    Ok(json!({
        "classId": class_id,
        "date": format_date(date),
        "present": present,
        "absent": rows.len() - present,
        "rows": rows,
        "table": view_json(&table, &rows, &tp),
    }))
}

fn reports_export_csv(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let report = required_str(params, "report")?;
    let out_dir = PathBuf::from(required_str(params, "outDir")?);

    let io_err = |e: anyhow::Error| HandlerErr::new("io_failed", format!("{e:#}"));
    let summary = match report.as_str() {
        "student" => {
            let rows = load_student_reports(
                conn,
                class_filter(params),
                optional_str(params, "studentId"),
            )?;
            csv_io::export_csv_file(&out_dir, "student-attendance-report", &rows).map_err(io_err)?
        }
        "class" => {
            let rows = load_student_reports(conn, class_filter(params), None)?;
            csv_io::export_csv_file(&out_dir, "class-attendance-report", &rows).map_err(io_err)?
        }
        "date" => {
            let class_id = required_str(params, "classId")?;
            let date = required_date(params, "date")?;
            let rows = load_date_reports(conn, &class_id, date)?;
            let label = format!("attendance-{}", format_date(date));
            csv_io::export_csv_file(&out_dir, &label, &rows).map_err(io_err)?
        }
        other => {
            return Err(HandlerErr::bad_params(format!("unknown report: {}", other)));
        }
    };

    tracing::info!(report = %report, rows = summary.rows, "report exported");
    Ok(json!({
        "path": summary.path.map(|p| p.to_string_lossy().to_string()),
        "rows": summary.rows,
    }))
}

fn dashboard_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let today = optional_date(params, "today")?.unwrap_or_else(|| chrono::Local::now().date_naive());

    let total_classes = store::count_classes(conn).map_err(query_err)?;
    let total_students = store::count_students(conn).map_err(query_err)?;
    let all_records = store::list_attendance(conn, &AttendanceFilter::default()).map_err(query_err)?;

    let class_limit = setting_usize(conn, RECENT_CLASS_LIMIT_SETTING, 5);
    let record_limit = setting_usize(conn, RECENT_RECORD_LIMIT_SETTING, 50);
    let classes = store::list_classes(conn, ClassOrder::Name).map_err(query_err)?;
    let mut recent = Vec::new();
    for row in classes.iter().take(class_limit) {
        let latest = store::list_attendance(
            conn,
            &AttendanceFilter {
                class_id: Some(row.class.id.as_str()),
                latest: Some(record_limit),
                ..Default::default()
            },
        )
        .map_err(query_err)?;
        if let Some(activity) = reports::class_activity(&row.class, &latest) {
            recent.push(activity);
        }
    }

    let stats = reports::dashboard_stats(total_classes, total_students, today, &all_records, recent);
    Ok(json!(stats))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "reports.students" => reports_students(state, &req.params),
        "reports.classes" => reports_classes(state, &req.params),
        "reports.date" => reports_date(state, &req.params),
        "reports.exportCsv" => reports_export_csv(state, &req.params),
        "dashboard.get" => dashboard_get(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
