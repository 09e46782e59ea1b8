use crate::ipc::error::ok;
use crate::ipc::helpers::{optional_str, table_params, HandlerErr, TableParams};
use crate::ipc::types::{AppState, Request};
use crate::reports::Band;
use crate::table::{Column, DataTable, FieldValue, TableRow};
use serde_json::{json, Map, Value};

type JsonRow = Map<String, Value>;

/// Renders `data` through `table` at the requested search term and page.
pub fn view_json<T: TableRow>(table: &DataTable<T>, data: &[T], tp: &TableParams) -> Value {
    json!(table.view_at(data, &tp.search, tp.page))
}

fn numeric(v: Option<FieldValue>) -> Option<i64> {
    match v? {
        FieldValue::Int(i) => Some(i),
        FieldValue::Float(f) => Some(f.round() as i64),
        _ => None,
    }
}

fn parse_column(raw: &Value) -> Result<Column<JsonRow>, HandlerErr> {
    let key = raw
        .get("key")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params("column missing key"))?;
    let header = optional_str(raw, "header").unwrap_or(key);
    let mut col = Column::new(key, header);
    if let Some(c) = optional_str(raw, "className") {
        col = col.class_name(c);
    }
    let k = key.to_string();
    col = match optional_str(raw, "format") {
        None => col,
        Some("percent") => col.render_with(move |r: &JsonRow| {
            numeric(r.field(&k)).map(|n| format!("{}%", n)).unwrap_or_default()
        }),
        Some("band") => col.render_with(move |r: &JsonRow| {
            numeric(r.field(&k))
                .map(|n| Band::from_percentage(n.clamp(0, u32::MAX as i64) as u32).as_str().to_string())
                .unwrap_or_default()
        }),
        Some("presence") => col.render_with(move |r: &JsonRow| match r.field(&k) {
            Some(FieldValue::Bool(true)) => "Present".to_string(),
            Some(FieldValue::Bool(false)) => "Absent".to_string(),
            _ => String::new(),
        }),
        Some(other) => {
            return Err(HandlerErr::bad_params(format!("unknown column format: {}", other)))
        }
    };
    Ok(col)
}

fn table_render(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let data: Vec<JsonRow> = match params.get("data") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_object()
                    .cloned()
                    .ok_or_else(|| HandlerErr::bad_params("data rows must be objects"))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(HandlerErr::bad_params("data must be an array")),
        None => Vec::new(),
    };
    let columns = match params.get("columns") {
        Some(Value::Array(cols)) => cols.iter().map(parse_column).collect::<Result<Vec<_>, _>>()?,
        _ => return Err(HandlerErr::bad_params("missing columns")),
    };

    let tp = table_params(state.db.as_ref(), params)?;
    let mut table = DataTable::new(columns)
        .page_size(tp.page_size)
        .loading(params.get("loading").and_then(|v| v.as_bool()).unwrap_or(false));
    if let Some(k) = optional_str(params, "searchKey") {
        table = table.search_key(k);
    }
    if let Some(p) = optional_str(params, "searchPlaceholder") {
        table = table.search_placeholder(p);
    }
    if let Some(m) = optional_str(params, "emptyMessage") {
        table = table.empty_message(m);
    }
    Ok(view_json(&table, &data, &tp))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "table.render" => Some(match table_render(state, &req.params) {
            Ok(v) => ok(&req.id, v),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
