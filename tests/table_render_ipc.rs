use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_smartattendd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn smartattendd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn send(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = send(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn rows(n: usize) -> serde_json::Value {
    json!((1..=n)
        .map(|i| json!({ "name": format!("Student {:02}", i), "pct": (i * 7) % 101, "here": i % 2 == 0 }))
        .collect::<Vec<_>>())
}

fn columns() -> serde_json::Value {
    json!([
        { "key": "name", "header": "Name" },
        { "key": "pct", "header": "Attendance", "format": "percent" },
        { "key": "pct", "header": "Status", "format": "band", "className": "status-badge" },
        { "key": "here", "header": "Today", "format": "presence" },
    ])
}

#[test]
fn table_render_paginates_and_clamps_pages() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "table.render",
        json!({ "data": rows(23), "columns": columns(), "searchKey": "name" }),
    );
    assert_eq!(first["totalPages"], json!(3));
    assert_eq!(first["pageSize"], json!(10));
    assert_eq!(first["pagination"]["footer"], json!("Showing 1 to 10 of 23 results"));
    assert_eq!(first["pagination"]["pageLabel"], json!("Page 1 of 3"));
    assert_eq!(first["pagination"]["canPrev"], json!(false));
    assert_eq!(first["body"]["kind"], json!("rows"));
    assert_eq!(
        first["body"]["rows"][0],
        json!(["Student 01", "7%", "absent", "Absent"])
    );
    assert_eq!(first["headers"][2]["className"], json!("status-badge"));

    let last = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "table.render",
        json!({ "data": rows(23), "columns": columns(), "page": 2 }),
    );
    assert_eq!(last["body"]["rows"].as_array().map(|r| r.len()), Some(3));
    assert_eq!(last["pagination"]["footer"], json!("Showing 21 to 23 of 23 results"));
    assert_eq!(last["pagination"]["canNext"], json!(false));

    let clamped = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "table.render",
        json!({ "data": rows(23), "columns": columns(), "page": 99 }),
    );
    assert_eq!(clamped["page"], json!(2));

    let single = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "table.render",
        json!({ "data": rows(4), "columns": columns() }),
    );
    assert_eq!(single["totalPages"], json!(1));
    assert!(single.get("pagination").is_none());
    assert!(single.get("searchPlaceholder").is_none());
}

#[test]
fn table_render_search_resets_to_first_page() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let found = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "table.render",
        json!({
            "data": rows(23),
            "columns": columns(),
            "searchKey": "name",
            "searchPlaceholder": "Find...",
            "search": "STUDENT 1",
            "pageSize": 5,
        }),
    );
    assert_eq!(found["filteredCount"], json!(10));
    assert_eq!(found["totalPages"], json!(2));
    assert_eq!(found["searchPlaceholder"], json!("Find..."));
    assert_eq!(found["body"]["rows"][0][0], json!("Student 10"));

    let missing = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "table.render",
        json!({
            "data": rows(3),
            "columns": columns(),
            "searchKey": "name",
            "search": "zzz",
            "emptyMessage": "Nothing here",
        }),
    );
    assert_eq!(missing["body"]["kind"], json!("empty"));
    assert_eq!(missing["body"]["message"], json!("Nothing here"));
    assert_eq!(missing["body"]["colspan"], json!(4));

    let loading = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "table.render",
        json!({ "data": rows(3), "columns": columns(), "loading": true }),
    );
    assert_eq!(loading["body"]["kind"], json!("loading"));

    let bad = send(
        &mut stdin,
        &mut reader,
        "4",
        "table.render",
        json!({ "data": rows(3), "columns": columns(), "pageSize": 0 }),
    );
    assert_eq!(bad["error"]["code"], json!("bad_params"));
}
