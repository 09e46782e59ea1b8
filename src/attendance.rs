//! Mark-attendance workflow for one class and one date.

use crate::model::{
    format_date, AttendanceChange, AttendanceMark, AttendanceRecord, StudentEntity,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("attendance is not loaded")]
    NotReady,
    #[error("session generation {got} is stale (current {current})")]
    Stale { got: u64, current: u64 },
    #[error("student {0} is not on this roster")]
    UnknownStudent(String),
    #[error("no acting user; call session.set first")]
    NoSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error { message: String },
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Error { .. } => "error",
        }
    }
}

/// Handed out by `begin_load`; only the latest ticket may complete a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceSession {
    class_id: String,
    date: NaiveDate,
    phase: Phase,
    generation: u64,
    roster: Vec<StudentEntity>,
    existing: Vec<AttendanceRecord>,
    marks: HashMap<String, bool>,
    dirty: bool,
}

/// Everything a save needs to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePlan {
    pub changes: Vec<AttendanceChange>,
    pub marks: Vec<AttendanceMark>,
}

/// Log entries for stored records whose student is still on the roster and
/// whose flag differs from the in-memory state. Missing marks count as absent.
pub fn diff_changes(
    existing: &[AttendanceRecord],
    marks: &HashMap<String, bool>,
    roster: &[StudentEntity],
    acting_user: &str,
) -> Vec<AttendanceChange> {
    existing
        .iter()
        .filter(|rec| roster.iter().any(|s| s.id == rec.student_id))
        .filter_map(|rec| {
            let new_status = marks.get(&rec.student_id).copied().unwrap_or(false);
            (new_status != rec.present).then(|| AttendanceChange {
                attendance_id: rec.id.clone(),
                previous_status: rec.present,
                new_status,
                changed_by: acting_user.to_string(),
            })
        })
        .collect()
}

impl AttendanceSession {
    pub fn new(class_id: &str, date: NaiveDate) -> Self {
        AttendanceSession {
            class_id: class_id.to_string(),
            date,
            phase: Phase::Idle,
            generation: 0,
            roster: Vec::new(),
            existing: Vec::new(),
            marks: HashMap::new(),
            dirty: false,
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn roster(&self) -> &[StudentEntity] {
        &self.roster
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_present(&self, student_id: &str) -> bool {
        self.marks.get(student_id).copied().unwrap_or(false)
    }

    pub fn present_count(&self) -> usize {
        self.roster.iter().filter(|s| self.is_present(&s.id)).count()
    }

    pub fn absent_count(&self) -> usize {
        self.roster.len() - self.present_count()
    }

    /// Moves to a new class/date selection. Outstanding tickets become stale.
    pub fn select(&mut self, class_id: &str, date: NaiveDate) -> LoadTicket {
        self.class_id = class_id.to_string();
        self.date = date;
        self.begin_load()
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.phase = Phase::Loading;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Applies a finished load. Returns false when the ticket was superseded
    /// and the result was discarded.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: anyhow::Result<(Vec<StudentEntity>, Vec<AttendanceRecord>)>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                got = ticket.generation,
                current = self.generation,
                "dropping superseded attendance load"
            );
            return false;
        }
        match result {
            Ok((roster, existing)) => {
                self.marks = roster
                    .iter()
                    .map(|s| {
                        let present = existing
                            .iter()
                            .find(|r| r.student_id == s.id)
                            .map(|r| r.present)
                            .unwrap_or(false);
                        (s.id.clone(), present)
                    })
                    .collect();
                self.roster = roster;
                self.existing = existing;
                self.dirty = false;
                self.phase = Phase::Ready;
            }
            Err(e) => {
                tracing::warn!(class_id = %self.class_id, error = %e, "attendance load failed");
                self.phase = Phase::Error {
                    message: format!("Failed to load attendance data: {e}"),
                };
            }
        }
        true
    }

    pub fn check_generation(&self, generation: Option<u64>) -> Result<(), SessionError> {
        match generation {
            Some(g) if g != self.generation => Err(SessionError::Stale {
                got: g,
                current: self.generation,
            }),
            _ => Ok(()),
        }
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Ready => Ok(()),
            _ => Err(SessionError::NotReady),
        }
    }

    pub fn toggle(&mut self, student_id: &str) -> Result<bool, SessionError> {
        self.ensure_ready()?;
        let Some(v) = self.marks.get_mut(student_id) else {
            return Err(SessionError::UnknownStudent(student_id.to_string()));
        };
        *v = !*v;
        self.dirty = true;
        Ok(*v)
    }

    pub fn mark_all(&mut self, present: bool) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.marks = self
            .roster
            .iter()
            .map(|s| (s.id.clone(), present))
            .collect();
        self.dirty = true;
        Ok(())
    }

    pub fn plan_save(&self, acting_user: Option<&str>) -> Result<SavePlan, SessionError> {
        self.ensure_ready()?;
        let user = acting_user.ok_or(SessionError::NoSession)?;
        let changes = diff_changes(&self.existing, &self.marks, &self.roster, user);
        let marks = self
            .roster
            .iter()
            .map(|s| AttendanceMark {
                student_id: s.id.clone(),
                class_id: self.class_id.clone(),
                date: self.date,
                present: self.is_present(&s.id),
                marked_by: user.to_string(),
            })
            .collect();
        Ok(SavePlan { changes, marks })
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            class_id: self.class_id.clone(),
            date: format_date(self.date),
            generation: self.generation,
            phase: self.phase.as_str(),
            error: match &self.phase {
                Phase::Error { message } => Some(message.clone()),
                _ => None,
            },
            dirty: self.dirty,
            present_count: self.present_count(),
            absent_count: self.absent_count(),
            students: self
                .roster
                .iter()
                .map(|s| RosterRow {
                    student_id: s.id.clone(),
                    roll_no: s.roll_no.clone(),
                    full_name: s.full_name.clone(),
                    present: self.is_present(&s.id),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub student_id: String,
    pub roll_no: String,
    pub full_name: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub class_id: String,
    pub date: String,
    pub generation: u64,
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub dirty: bool,
    pub present_count: usize,
    pub absent_count: usize,
    pub students: Vec<RosterRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).expect("date")
    }

    fn student(id: &str) -> StudentEntity {
        StudentEntity {
            id: id.to_string(),
            roll_no: id.to_string(),
            full_name: format!("Student {id}"),
            class_id: "c1".to_string(),
            email: None,
            phone: None,
            created_by: "u".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
            class_name: None,
        }
    }

    fn record(student_id: &str, present: bool) -> AttendanceRecord {
        AttendanceRecord {
            id: format!("rec-{student_id}"),
            student_id: student_id.to_string(),
            class_id: "c1".to_string(),
            date: day(),
            present,
            marked_by: "u0".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn ready(existing: Vec<AttendanceRecord>) -> AttendanceSession {
        let mut s = AttendanceSession::new("c1", day());
        let t = s.begin_load();
        let roster = vec![student("1"), student("2"), student("3")];
        assert!(s.finish_load(t, Ok((roster, existing))));
        s
    }

    #[test]
    fn initial_state_defaults_to_absent() {
        let s = ready(vec![record("2", true)]);
        assert_eq!(s.phase(), &Phase::Ready);
        assert!(!s.is_present("1"));
        assert!(s.is_present("2"));
        assert_eq!(s.present_count(), 1);
        assert_eq!(s.absent_count(), 2);
        assert!(!s.is_dirty());
    }

    #[test]
    fn mark_all_last_call_wins() {
        let mut s = ready(vec![]);
        s.toggle("1").unwrap();
        s.toggle("3").unwrap();
        s.mark_all(true).unwrap();
        s.mark_all(false).unwrap();
        assert!(s.roster().iter().all(|st| !s.is_present(&st.id)));
        s.mark_all(true).unwrap();
        assert_eq!(s.present_count(), 3);
    }

    #[test]
    fn toggle_flips_and_rejects_unknown() {
        let mut s = ready(vec![]);
        assert_eq!(s.toggle("2"), Ok(true));
        assert_eq!(s.toggle("2"), Ok(false));
        assert!(s.is_dirty());
        assert_eq!(
            s.toggle("9"),
            Err(SessionError::UnknownStudent("9".to_string()))
        );
    }

    #[test]
    fn fresh_save_has_no_changes_and_one_mark_per_student() {
        let mut s = ready(vec![]);
        s.toggle("1").unwrap();
        let plan = s.plan_save(Some("u1")).unwrap();
        assert!(plan.changes.is_empty());
        assert_eq!(plan.marks.len(), 3);
        assert!(plan.marks[0].present);
        assert!(plan.marks.iter().all(|m| m.marked_by == "u1"));
    }

    #[test]
    fn one_changed_student_gives_one_change() {
        let mut s = ready(vec![record("1", true), record("2", false), record("3", true)]);
        s.toggle("2").unwrap();
        let plan = s.plan_save(Some("u1")).unwrap();
        assert_eq!(
            plan.changes,
            vec![AttendanceChange {
                attendance_id: "rec-2".to_string(),
                previous_status: false,
                new_status: true,
                changed_by: "u1".to_string(),
            }]
        );
        assert_eq!(plan.marks.len(), 3);
    }

    #[test]
    fn records_of_departed_students_are_not_logged() {
        let s = ready(vec![record("1", true), record("gone", true)]);
        let plan = s.plan_save(Some("u1")).unwrap();
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn save_requires_user_and_ready() {
        let s = AttendanceSession::new("c1", day());
        assert_eq!(s.plan_save(Some("u1")), Err(SessionError::NotReady));
        let s = ready(vec![]);
        assert_eq!(s.plan_save(None), Err(SessionError::NoSession));
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut s = AttendanceSession::new("c1", day());
        let old = s.begin_load();
        let new = s.select("c2", day());
        assert!(s.finish_load(new, Ok((vec![student("x")], vec![]))));
        assert!(!s.finish_load(old, Ok((vec![student("1"), student("2")], vec![]))));
        assert_eq!(s.roster().len(), 1);
        assert_eq!(s.class_id(), "c2");
    }

    #[test]
    fn failed_load_keeps_prior_data() {
        let mut s = ready(vec![record("1", true)]);
        let t = s.begin_load();
        assert!(s.finish_load(t, Err(anyhow!("boom"))));
        assert!(matches!(s.phase(), Phase::Error { .. }));
        assert_eq!(s.roster().len(), 3);
        assert!(s.is_present("1"));
        assert_eq!(s.toggle("1"), Err(SessionError::NotReady));
    }

    #[test]
    fn stale_generation_is_rejected() {
        let s = ready(vec![]);
        assert!(s.check_generation(None).is_ok());
        assert!(s.check_generation(Some(s.generation())).is_ok());
        assert!(matches!(
            s.check_generation(Some(s.generation() + 1)),
            Err(SessionError::Stale { .. })
        ));
    }
}
