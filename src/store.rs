//! Typed reads and writes over the workspace tables.

use crate::model::{
    format_date, now_timestamp, AttendanceChange, AttendanceMark, AttendanceRecord, ChangeLogEntry,
    ClassEntity, NewStudent, StudentEntity, UserProfile,
};
use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

fn row_date(r: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = r.get(idx)?;
    crate::model::parse_date(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("bad date: {raw}").into(),
        )
    })
}

fn class_from_row(r: &Row) -> rusqlite::Result<ClassEntity> {
    Ok(ClassEntity {
        id: r.get(0)?,
        name: r.get(1)?,
        description: r.get(2)?,
        created_by: r.get(3)?,
        created_at: r.get(4)?,
        updated_at: r.get(5)?,
    })
}

fn student_from_row(r: &Row) -> rusqlite::Result<StudentEntity> {
    Ok(StudentEntity {
        id: r.get(0)?,
        roll_no: r.get(1)?,
        full_name: r.get(2)?,
        class_id: r.get(3)?,
        email: r.get(4)?,
        phone: r.get(5)?,
        created_by: r.get(6)?,
        created_at: r.get(7)?,
        updated_at: r.get(8)?,
        class_name: r.get(9)?,
    })
}

fn record_from_row(r: &Row) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: r.get(0)?,
        student_id: r.get(1)?,
        class_id: r.get(2)?,
        date: row_date(r, 3)?,
        present: r.get::<_, i64>(4)? != 0,
        marked_by: r.get(5)?,
        created_at: r.get(6)?,
        updated_at: r.get(7)?,
    })
}

const STUDENT_COLUMNS: &str = "s.id, s.roll_no, s.full_name, s.class_id, s.email, s.phone,
     s.created_by, s.created_at, s.updated_at, c.name";
const RECORD_COLUMNS: &str =
    "a.id, a.student_id, a.class_id, a.date, a.is_present, a.marked_by, a.created_at, a.updated_at";

pub fn upsert_profile(conn: &Connection, profile: &UserProfile) -> anyhow::Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO profiles(user_id, full_name, email, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
           full_name = excluded.full_name,
           email = excluded.email,
           updated_at = excluded.updated_at",
        (&profile.user_id, &profile.full_name, &profile.email, &now, &now),
    )?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOrder {
    Name,
    NewestFirst,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassListRow {
    #[serde(flatten)]
    pub class: ClassEntity,
    pub student_count: i64,
}

pub fn list_classes(conn: &Connection, order: ClassOrder) -> anyhow::Result<Vec<ClassListRow>> {
    let order_sql = match order {
        ClassOrder::Name => "c.name",
        ClassOrder::NewestFirst => "c.created_at DESC, c.rowid DESC",
    };
    let sql = format!(
        "SELECT c.id, c.name, c.description, c.created_by, c.created_at, c.updated_at,
           (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count
         FROM classes c
         ORDER BY {}",
        order_sql
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(ClassListRow {
                class: class_from_row(r)?,
                student_count: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_class(conn: &Connection, class_id: &str) -> anyhow::Result<Option<ClassEntity>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description, created_by, created_at, updated_at
             FROM classes WHERE id = ?",
            [class_id],
            class_from_row,
        )
        .optional()?)
}

pub fn count_classes(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM classes", [], |r| r.get(0))?)
}

pub fn count_students(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?)
}

pub fn create_class(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    owner: &str,
) -> anyhow::Result<ClassEntity> {
    let now = now_timestamp();
    let class = ClassEntity {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: description.map(|s| s.to_string()),
        created_by: owner.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO classes(id, name, description, created_by, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &class.id,
            &class.name,
            &class.description,
            &class.created_by,
            &class.created_at,
            &class.updated_at,
        ),
    )?;
    Ok(class)
}

/// Returns false when no class has this id.
pub fn update_class(
    conn: &Connection,
    class_id: &str,
    name: Option<&str>,
    description: Option<Option<&str>>,
) -> anyhow::Result<bool> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(n) = name {
        sets.push("name = ?");
        values.push(Value::Text(n.to_string()));
    }
    if let Some(d) = description {
        sets.push("description = ?");
        values.push(d.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Null));
    }
    sets.push("updated_at = ?");
    values.push(Value::Text(now_timestamp()));
    values.push(Value::Text(class_id.to_string()));

    let sql = format!("UPDATE classes SET {} WHERE id = ?", sets.join(", "));
    let changed = conn.execute(&sql, params_from_iter(values))?;
    Ok(changed > 0)
}

/// Deletes the class and everything hanging off it. Returns false when not found.
pub fn delete_class(conn: &Connection, class_id: &str) -> anyhow::Result<bool> {
    if get_class(conn, class_id)?.is_none() {
        return Ok(false);
    }
    let tx = conn.unchecked_transaction()?;
    // Dependency order; there is no ON DELETE CASCADE.
    tx.execute(
        "DELETE FROM attendance_log
         WHERE attendance_id IN (SELECT id FROM attendance WHERE class_id = ?)",
        [class_id],
    )
    .context("failed to delete attendance_log")?;
    tx.execute("DELETE FROM attendance WHERE class_id = ?", [class_id])
        .context("failed to delete attendance")?;
    tx.execute("DELETE FROM students WHERE class_id = ?", [class_id])
        .context("failed to delete students")?;
    tx.execute("DELETE FROM classes WHERE id = ?", [class_id])
        .context("failed to delete class")?;
    tx.commit()?;
    Ok(true)
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter<'a> {
    pub class_id: Option<&'a str>,
    pub student_id: Option<&'a str>,
}

pub fn list_students(
    conn: &Connection,
    filter: &StudentFilter,
) -> anyhow::Result<Vec<StudentEntity>> {
    let mut where_sql: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(c) = filter.class_id {
        where_sql.push("s.class_id = ?");
        values.push(Value::Text(c.to_string()));
    }
    if let Some(s) = filter.student_id {
        where_sql.push("s.id = ?");
        values.push(Value::Text(s.to_string()));
    }
    let where_clause = if where_sql.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_sql.join(" AND "))
    };
    let sql = format!(
        "SELECT {}
         FROM students s
         LEFT JOIN classes c ON c.id = s.class_id
         {}
         ORDER BY s.roll_no, s.full_name",
        STUDENT_COLUMNS, where_clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_student(conn: &Connection, student_id: &str) -> anyhow::Result<Option<StudentEntity>> {
    Ok(list_students(
        conn,
        &StudentFilter {
            student_id: Some(student_id),
            ..Default::default()
        },
    )?
    .into_iter()
    .next())
}

fn insert_student(conn: &Connection, s: &NewStudent, owner: &str) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO students(id, roll_no, full_name, class_id, email, phone, created_by, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &s.roll_no,
            &s.full_name,
            &s.class_id,
            &s.email,
            &s.phone,
            owner,
            &now,
            &now,
        ),
    )?;
    Ok(id)
}

pub fn create_student(conn: &Connection, s: &NewStudent, owner: &str) -> anyhow::Result<String> {
    insert_student(conn, s, owner)
}

/// Inserts all rows or none.
pub fn insert_students(
    conn: &Connection,
    students: &[NewStudent],
    owner: &str,
) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    for s in students {
        insert_student(&tx, s, owner)
            .with_context(|| format!("failed to insert student {}", s.roll_no))?;
    }
    tx.commit()?;
    Ok(students.len())
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub roll_no: Option<String>,
    pub full_name: Option<String>,
    pub class_id: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
}

pub fn update_student(
    conn: &Connection,
    student_id: &str,
    patch: &StudentPatch,
) -> anyhow::Result<bool> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let text = |s: &str| Value::Text(s.to_string());
    let opt_text = |v: &Option<String>| v.as_deref().map(text).unwrap_or(Value::Null);

    if let Some(v) = &patch.roll_no {
        sets.push("roll_no = ?");
        values.push(text(v));
    }
    if let Some(v) = &patch.full_name {
        sets.push("full_name = ?");
        values.push(text(v));
    }
    if let Some(v) = &patch.class_id {
        sets.push("class_id = ?");
        values.push(text(v));
    }
    if let Some(v) = &patch.email {
        sets.push("email = ?");
        values.push(opt_text(v));
    }
    if let Some(v) = &patch.phone {
        sets.push("phone = ?");
        values.push(opt_text(v));
    }
    sets.push("updated_at = ?");
    values.push(Value::Text(now_timestamp()));
    values.push(Value::Text(student_id.to_string()));

    let sql = format!("UPDATE students SET {} WHERE id = ?", sets.join(", "));
    Ok(conn.execute(&sql, params_from_iter(values))? > 0)
}

pub fn delete_student(conn: &Connection, student_id: &str) -> anyhow::Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM attendance_log
         WHERE attendance_id IN (SELECT id FROM attendance WHERE student_id = ?)",
        [student_id],
    )?;
    tx.execute("DELETE FROM attendance WHERE student_id = ?", [student_id])?;
    let n = tx.execute("DELETE FROM students WHERE id = ?", [student_id])?;
    tx.commit()?;
    Ok(n > 0)
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter<'a> {
    pub class_id: Option<&'a str>,
    pub student_id: Option<&'a str>,
    pub date: Option<NaiveDate>,
    /// Newest dates first, capped.
    pub latest: Option<usize>,
}

pub fn list_attendance(
    conn: &Connection,
    filter: &AttendanceFilter,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let mut where_sql: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(c) = filter.class_id {
        where_sql.push("a.class_id = ?");
        values.push(Value::Text(c.to_string()));
    }
    if let Some(s) = filter.student_id {
        where_sql.push("a.student_id = ?");
        values.push(Value::Text(s.to_string()));
    }
    if let Some(d) = filter.date {
        where_sql.push("a.date = ?");
        values.push(Value::Text(format_date(d)));
    }
    let where_clause = if where_sql.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_sql.join(" AND "))
    };
    let tail = match filter.latest {
        Some(n) => format!("ORDER BY a.date DESC, a.rowid DESC LIMIT {}", n),
        None => "ORDER BY a.date, a.rowid".to_string(),
    };
    let sql = format!(
        "SELECT {} FROM attendance a {} {}",
        RECORD_COLUMNS, where_clause, tail
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Records on `date` for the current members of a class, whichever class
/// they were taken under. A student who moved keeps their earlier mark.
fn roster_records_on(
    conn: &Connection,
    class_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {} FROM attendance a
         WHERE a.date = ? AND a.student_id IN (SELECT id FROM students WHERE class_id = ?)
         ORDER BY a.rowid",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((format_date(date), class_id), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Roster and existing records for one class and date, read in one snapshot.
pub fn load_roster_and_records(
    conn: &Connection,
    class_id: &str,
    date: NaiveDate,
) -> anyhow::Result<(Vec<StudentEntity>, Vec<AttendanceRecord>)> {
    let tx = conn.unchecked_transaction()?;
    if get_class(&tx, class_id)?.is_none() {
        return Err(anyhow!("class not found"));
    }
    let roster = list_students(
        &tx,
        &StudentFilter {
            class_id: Some(class_id),
            ..Default::default()
        },
    )
    .context("failed to load students")?;
    let records = roster_records_on(&tx, class_id, date).context("failed to load attendance")?;
    tx.commit()?;
    Ok((roster, records))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub written: usize,
    pub removed: usize,
    pub logged: usize,
}

/// Writes the change log, upserts one record per mark keyed on (student, date)
/// and drops records of the class+date that no mark covers. All or nothing.
pub fn save_attendance(
    conn: &Connection,
    class_id: &str,
    date: NaiveDate,
    changes: &[AttendanceChange],
    marks: &[AttendanceMark],
) -> anyhow::Result<SaveOutcome> {
    let date_s = format_date(date);
    let now = now_timestamp();
    let tx = conn.unchecked_transaction()?;

    for c in changes {
        tx.execute(
            "INSERT INTO attendance_log(id, attendance_id, previous_status, new_status, changed_by, changed_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                &c.attendance_id,
                c.previous_status as i64,
                c.new_status as i64,
                &c.changed_by,
                &now,
            ),
        )
        .context("failed to write attendance_log")?;
    }

    for m in marks {
        tx.execute(
            "INSERT INTO attendance(id, student_id, class_id, date, is_present, marked_by, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(student_id, date) DO UPDATE SET
               class_id = excluded.class_id,
               is_present = excluded.is_present,
               marked_by = excluded.marked_by,
               updated_at = excluded.updated_at",
            (
                Uuid::new_v4().to_string(),
                &m.student_id,
                &m.class_id,
                &date_s,
                m.present as i64,
                &m.marked_by,
                &now,
                &now,
            ),
        )
        .with_context(|| format!("failed to write attendance for {}", m.student_id))?;
    }

    let keep: HashSet<&str> = marks.iter().map(|m| m.student_id.as_str()).collect();
    let mut stmt = tx.prepare("SELECT id, student_id FROM attendance WHERE class_id = ? AND date = ?")?;
    let stale: Vec<String> = stmt
        .query_map((class_id, &date_s), |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|(_, sid)| !keep.contains(sid.as_str()))
        .map(|(id, _)| id)
        .collect();
    drop(stmt);
    for id in &stale {
        tx.execute("DELETE FROM attendance_log WHERE attendance_id = ?", [id])?;
        tx.execute("DELETE FROM attendance WHERE id = ?", [id])?;
    }

    tx.commit()?;
    Ok(SaveOutcome {
        written: marks.len(),
        removed: stale.len(),
        logged: changes.len(),
    })
}

pub fn change_log_for(
    conn: &Connection,
    class_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<ChangeLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.attendance_id, a.student_id, s.full_name,
                l.previous_status, l.new_status, l.changed_by, l.changed_at
         FROM attendance_log l
         JOIN attendance a ON a.id = l.attendance_id
         JOIN students s ON s.id = a.student_id
         WHERE a.class_id = ? AND a.date = ?
         ORDER BY l.changed_at, l.rowid",
    )?;
    let rows = stmt
        .query_map((class_id, format_date(date)), |r| {
            Ok(ChangeLogEntry {
                id: r.get(0)?,
                attendance_id: r.get(1)?,
                student_id: r.get(2)?,
                full_name: r.get(3)?,
                previous_status: r.get::<_, i64>(4)? != 0,
                new_status: r.get::<_, i64>(5)? != 0,
                changed_by: r.get(6)?,
                changed_at: r.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn temp_conn(prefix: &str) -> Connection {
        let p = std::env::temp_dir().join(format!("{}-{}", prefix, Uuid::new_v4()));
        db::open_db(&p).expect("open db")
    }

    fn seed(conn: &Connection) -> (String, Vec<String>) {
        let class = create_class(conn, "Physics", None, "u1").expect("class");
        let ids = ["03", "01", "02"]
            .iter()
            .map(|roll| {
                create_student(
                    conn,
                    &NewStudent {
                        roll_no: roll.to_string(),
                        full_name: format!("Student {roll}"),
                        class_id: class.id.clone(),
                        email: None,
                        phone: None,
                    },
                    "u1",
                )
                .expect("student")
            })
            .collect();
        (class.id, ids)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 3).expect("date")
    }

    fn mark(class_id: &str, student_id: &str, present: bool, by: &str) -> AttendanceMark {
        AttendanceMark {
            student_id: student_id.to_string(),
            class_id: class_id.to_string(),
            date: day(),
            present,
            marked_by: by.to_string(),
        }
    }

    #[test]
    fn roster_is_ordered_by_roll_number() {
        let conn = temp_conn("smartattend-store-roster");
        let (class_id, _) = seed(&conn);
        let (roster, records) = load_roster_and_records(&conn, &class_id, day()).expect("load");
        let rolls: Vec<_> = roster.iter().map(|s| s.roll_no.as_str()).collect();
        assert_eq!(rolls, vec!["01", "02", "03"]);
        assert!(records.is_empty());
        assert_eq!(roster[0].class_name.as_deref(), Some("Physics"));
    }

    #[test]
    fn save_upserts_in_place_and_keeps_record_ids() {
        let conn = temp_conn("smartattend-store-upsert");
        let (class_id, ids) = seed(&conn);
        let marks: Vec<_> = ids.iter().map(|s| mark(&class_id, s, true, "u1")).collect();
        save_attendance(&conn, &class_id, day(), &[], &marks).expect("first save");
        let before = list_attendance(&conn, &AttendanceFilter::default()).expect("list");

        let marks: Vec<_> = ids.iter().map(|s| mark(&class_id, s, false, "u2")).collect();
        let out = save_attendance(&conn, &class_id, day(), &[], &marks).expect("second save");
        assert_eq!(out.written, 3);
        let after = list_attendance(&conn, &AttendanceFilter::default()).expect("list");
        assert_eq!(after.len(), 3);
        for rec in &after {
            assert!(!rec.present);
            assert_eq!(rec.marked_by, "u2");
            assert!(before.iter().any(|b| b.id == rec.id));
        }
    }

    #[test]
    fn save_drops_records_of_students_no_longer_marked() {
        let conn = temp_conn("smartattend-store-stale");
        let (class_id, ids) = seed(&conn);
        let marks: Vec<_> = ids.iter().map(|s| mark(&class_id, s, true, "u1")).collect();
        save_attendance(&conn, &class_id, day(), &[], &marks).expect("save");
        let out = save_attendance(&conn, &class_id, day(), &[], &marks[..2]).expect("save");
        assert_eq!(out.removed, 1);
        let left = list_attendance(
            &conn,
            &AttendanceFilter {
                class_id: Some(class_id.as_str()),
                date: Some(day()),
                ..Default::default()
            },
        )
        .expect("list");
        assert_eq!(left.len(), 2);
    }

    #[test]
    fn moved_student_brings_their_record_into_the_new_class() {
        let conn = temp_conn("smartattend-store-moved");
        let (class_a, ids) = seed(&conn);
        let marks: Vec<_> = ids.iter().map(|s| mark(&class_a, s, true, "u1")).collect();
        save_attendance(&conn, &class_a, day(), &[], &marks).expect("save a");

        let class_b = create_class(&conn, "Chemistry", None, "u1").expect("class b").id;
        let patch = StudentPatch {
            class_id: Some(class_b.clone()),
            ..Default::default()
        };
        assert!(update_student(&conn, &ids[0], &patch).expect("move"));

        let (roster, records) = load_roster_and_records(&conn, &class_b, day()).expect("load b");
        assert_eq!(roster.len(), 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].student_id, ids[0]);
        assert!(records[0].present);

        let changes = vec![AttendanceChange {
            attendance_id: records[0].id.clone(),
            previous_status: true,
            new_status: false,
            changed_by: "u2".to_string(),
        }];
        let marks = [mark(&class_b, &ids[0], false, "u2")];
        let out = save_attendance(&conn, &class_b, day(), &changes, &marks).expect("save b");
        assert_eq!(out.logged, 1);

        let moved = list_attendance(
            &conn,
            &AttendanceFilter {
                student_id: Some(ids[0].as_str()),
                ..Default::default()
            },
        )
        .expect("list");
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, records[0].id);
        assert_eq!(moved[0].class_id, class_b);
        assert!(!moved[0].present);
        assert_eq!(change_log_for(&conn, &class_b, day()).expect("log").len(), 1);
    }

    #[test]
    fn failed_save_leaves_nothing_behind() {
        let conn = temp_conn("smartattend-store-rollback");
        let (class_id, ids) = seed(&conn);
        let mut marks: Vec<_> = ids.iter().map(|s| mark(&class_id, s, true, "u1")).collect();
        marks.push(mark(&class_id, "no-such-student", true, "u1"));
        assert!(save_attendance(&conn, &class_id, day(), &[], &marks).is_err());
        assert!(list_attendance(&conn, &AttendanceFilter::default())
            .expect("list")
            .is_empty());
    }

    #[test]
    fn delete_class_cascades() {
        let conn = temp_conn("smartattend-store-cascade");
        let (class_id, ids) = seed(&conn);
        let marks: Vec<_> = ids.iter().map(|s| mark(&class_id, s, true, "u1")).collect();
        save_attendance(&conn, &class_id, day(), &[], &marks).expect("save");
        assert!(delete_class(&conn, &class_id).expect("delete"));
        assert_eq!(count_students(&conn).expect("count"), 0);
        assert!(list_attendance(&conn, &AttendanceFilter::default())
            .expect("list")
            .is_empty());
        assert!(!delete_class(&conn, &class_id).expect("delete again"));
    }

    #[test]
    fn class_names_are_unique_per_owner() {
        let conn = temp_conn("smartattend-store-unique");
        create_class(&conn, "Art", None, "u1").expect("first");
        assert!(create_class(&conn, "Art", None, "u1").is_err());
        create_class(&conn, "Art", None, "u2").expect("other owner");
    }
}
