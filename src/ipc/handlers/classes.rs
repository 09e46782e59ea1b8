use crate::ipc::error::ok;
use crate::ipc::handlers::table::view_json;
use crate::ipc::helpers::{
    acting_user, db_conn, nullable_text, optional_str, required_str, required_text, table_params, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, ClassListRow, ClassOrder};
use crate::table::{Column, DataTable, FieldValue, TableRow};
use serde_json::json;

impl TableRow for ClassListRow {
    fn field(&self, key: &str) -> Option<FieldValue> {
        Some(match key {
            "id" => FieldValue::Text(self.class.id.clone()),
            "name" => FieldValue::Text(self.class.name.clone()),
            "description" => match &self.class.description {
                Some(d) => FieldValue::Text(d.clone()),
                None => FieldValue::Null,
            },
            "studentCount" => FieldValue::Int(self.student_count),
            "createdAt" => FieldValue::Text(self.class.created_at.clone()),
            _ => return None,
        })
    }
}

fn classes_list(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let order = match optional_str(params, "orderBy") {
        None | Some("name") => ClassOrder::Name,
        Some("createdAt") => ClassOrder::NewestFirst,
        Some(other) => {
            return Err(HandlerErr::bad_params(format!("unknown orderBy: {}", other)))
        }
    };
    let rows = store::list_classes(conn, order).map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let tp = table_params(Some(conn), params)?;
    let table = DataTable::new(vec![
        Column::new("name", "Class Name"),
        Column::new("description", "Description"),
        Column::new("studentCount", "Students"),
    ])
    .search_key("name")
    .search_placeholder("Search classes...")
    .page_size(tp.page_size)
    .empty_message("No classes yet. Create your first class to get started.");

    Ok(json!({
        "classes": rows,
        "table": view_json(&table, &rows, &tp),
    }))
}

fn classes_create(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let owner = acting_user(state)?;
    let name = required_text(params, "name")?;
    let description = nullable_text(params, "description").flatten();

    let class = store::create_class(conn, &name, description.as_deref(), &owner).map_err(|e| {
        HandlerErr::db("db_insert_failed", e).with_details(json!({ "table": "classes" }))
    })?;
    tracing::info!(class_id = %class.id, "class created");
    Ok(json!({ "classId": class.id, "class": class }))
}

fn classes_update(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let class_id = required_str(params, "classId")?;
    let patch = params
        .get("patch")
        .ok_or_else(|| HandlerErr::bad_params("missing patch"))?;

    let name = match patch.get("name") {
        Some(_) => Some(required_text(patch, "name")?),
        None => None,
    };
    let description = nullable_text(patch, "description");

    let found = store::update_class(
        conn,
        &class_id,
        name.as_deref(),
        description.as_ref().map(|d| d.as_deref()),
    )
    .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    if !found {
        return Err(HandlerErr::not_found("class not found"));
    }
    let class = store::get_class(conn, &class_id).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "class": class }))
}

fn classes_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let conn = db_conn(state)?;
    let found = store::delete_class(conn, &class_id).map_err(|e| HandlerErr::db("db_delete_failed", e))?;
    if !found {
        return Err(HandlerErr::not_found("class not found"));
    }
    if state
        .attendance
        .as_ref()
        .is_some_and(|s| s.class_id() == class_id)
    {
        state.attendance = None;
    }
    tracing::info!(class_id = %class_id, "class deleted");
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "classes.list" => classes_list(state, &req.params),
        "classes.create" => classes_create(state, &req.params),
        "classes.update" => classes_update(state, &req.params),
        "classes.delete" => classes_delete(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
