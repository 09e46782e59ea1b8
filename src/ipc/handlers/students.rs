use crate::csv_io;
use crate::ipc::error::ok;
use crate::ipc::handlers::table::view_json;
use crate::ipc::helpers::{
    acting_user, db_conn, ensure_class, nullable_text, optional_str, required_str, required_text, table_params,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{NewStudent, StudentEntity};
use crate::store::{self, ClassOrder, StudentFilter, StudentPatch};
use crate::table::{Column, DataTable, FieldValue, TableRow};
use serde_json::json;

fn opt_text(v: &Option<String>) -> FieldValue {
    match v {
        Some(s) => FieldValue::Text(s.clone()),
        None => FieldValue::Null,
    }
}

impl TableRow for StudentEntity {
    fn field(&self, key: &str) -> Option<FieldValue> {
        Some(match key {
            "id" => FieldValue::Text(self.id.clone()),
            "rollNo" => FieldValue::Text(self.roll_no.clone()),
            "fullName" => FieldValue::Text(self.full_name.clone()),
            "classId" => FieldValue::Text(self.class_id.clone()),
            "className" => opt_text(&self.class_name),
            "email" => opt_text(&self.email),
            "phone" => opt_text(&self.phone),
            _ => return None,
        })
    }
}

fn students_list(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let class_id = optional_str(params, "classId").filter(|c| *c != "all");
    let students = store::list_students(
        conn,
        &StudentFilter {
            class_id,
            ..Default::default()
        },
    )
    .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let tp = table_params(Some(conn), params)?;
    let table = DataTable::new(vec![
        Column::new("rollNo", "Roll No"),
        Column::new("fullName", "Name"),
        Column::new("className", "Class"),
        Column::new("email", "Email")
            .render_with(|s: &StudentEntity| s.email.clone().unwrap_or_else(|| "—".to_string())),
        Column::new("phone", "Phone")
            .render_with(|s: &StudentEntity| s.phone.clone().unwrap_or_else(|| "—".to_string())),
    ])
    .search_key("fullName")
    .search_placeholder("Search students...")
    .page_size(tp.page_size)
    .empty_message("No students found");

    Ok(json!({
        "students": students,
        "table": view_json(&table, &students, &tp),
    }))
}

fn students_create(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let owner = acting_user(state)?;
    let student = NewStudent {
        roll_no: required_text(params, "rollNo")?,
        full_name: required_text(params, "fullName")?,
        class_id: required_text(params, "classId")?,
        email: nullable_text(params, "email").flatten(),
        phone: nullable_text(params, "phone").flatten(),
    };
    ensure_class(conn, &student.class_id)?;

    let student_id = store::create_student(conn, &student, &owner).map_err(|e| {
        HandlerErr::db("db_insert_failed", e).with_details(json!({ "table": "students" }))
    })?;
    tracing::info!(student_id = %student_id, class_id = %student.class_id, "student created");
    Ok(json!({ "studentId": student_id }))
}

fn students_update(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let student_id = required_str(params, "studentId")?;
    let patch_v = params
        .get("patch")
        .ok_or_else(|| HandlerErr::bad_params("missing patch"))?;

    let text_field = |key: &str| -> Result<Option<String>, HandlerErr> {
        match patch_v.get(key) {
            Some(_) => Ok(Some(required_text(patch_v, key)?)),
            None => Ok(None),
        }
    };
    let patch = StudentPatch {
        roll_no: text_field("rollNo")?,
        full_name: text_field("fullName")?,
        class_id: text_field("classId")?,
        email: nullable_text(patch_v, "email"),
        phone: nullable_text(patch_v, "phone"),
    };
    if let Some(class_id) = patch.class_id.as_deref() {
        ensure_class(conn, class_id)?;
    }

    let found = store::update_student(conn, &student_id, &patch)
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    if !found {
        return Err(HandlerErr::not_found("student not found"));
    }
    let student = store::get_student(conn, &student_id).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "student": student }))
}

fn students_delete(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let student_id = required_str(params, "studentId")?;
    let found = store::delete_student(conn, &student_id)
        .map_err(|e| HandlerErr::db("db_delete_failed", e))?;
    if !found {
        return Err(HandlerErr::not_found("student not found"));
    }
    tracing::info!(student_id = %student_id, "student deleted");
    Ok(json!({ "ok": true }))
}

fn students_import_csv(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let owner = acting_user(state)?;
    let text = required_text(params, "csv")?;

    let classes: Vec<_> = store::list_classes(conn, ClassOrder::Name)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .into_iter()
        .map(|row| row.class)
        .collect();
    let outcome = csv_io::parse_student_import(&text, &classes)
        .map_err(|e| HandlerErr::new("import_failed", format!("{e:#}")))?;

    let imported = store::insert_students(conn, &outcome.students, &owner).map_err(|e| {
        HandlerErr::db("db_insert_failed", e).with_details(json!({ "table": "students" }))
    })?;
    tracing::info!(imported, skipped = outcome.skipped, "students imported");
    Ok(json!({
        "imported": imported,
        "skipped": outcome.skipped,
        "message": format!("{} students imported successfully", imported),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state, &req.params),
        "students.create" => students_create(state, &req.params),
        "students.update" => students_update(state, &req.params),
        "students.delete" => students_delete(state, &req.params),
        "students.importCsv" => students_import_csv(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
