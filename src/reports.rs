use crate::model::{format_date, AttendanceRecord, ClassEntity, StudentEntity};
use crate::table::{FieldValue, TableRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// `round(present / total * 100)`, half rounding up; 0 when there is nothing to count.
pub fn percentage(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((present as u64 * 200 + total as u64) / (total as u64 * 2)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Present,
    Warning,
    Absent,
}

impl Band {
    pub fn from_percentage(pct: u32) -> Band {
        if pct >= 75 {
            Band::Present
        } else if pct >= 50 {
            Band::Warning
        } else {
            Band::Absent
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Band::Present => "present",
            Band::Warning => "warning",
            Band::Absent => "absent",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    present: usize,
    total: usize,
}

impl Tally {
    fn add(&mut self, present: bool) {
        self.total += 1;
        if present {
            self.present += 1;
        }
    }
}

fn tally<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Tally {
    let mut t = Tally::default();
    for r in records {
        t.add(r.present);
    }
    t
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentReport {
    pub id: String,
    #[serde(skip)]
    pub class_id: String,
    pub roll_no: String,
    pub full_name: String,
    pub class_name: String,
    pub total_days: usize,
    pub present_days: usize,
    pub absent_days: usize,
    pub percentage: u32,
}

impl StudentReport {
    pub fn band(&self) -> Band {
        Band::from_percentage(self.percentage)
    }
}

impl TableRow for StudentReport {
    fn field(&self, key: &str) -> Option<FieldValue> {
        Some(match key {
            "id" => FieldValue::Text(self.id.clone()),
            "roll_no" => FieldValue::Text(self.roll_no.clone()),
            "full_name" => FieldValue::Text(self.full_name.clone()),
            "class_name" => FieldValue::Text(self.class_name.clone()),
            "total_days" => FieldValue::Int(self.total_days as i64),
            "present_days" => FieldValue::Int(self.present_days as i64),
            "absent_days" => FieldValue::Int(self.absent_days as i64),
            "percentage" => FieldValue::Int(self.percentage as i64),
            _ => return None,
        })
    }
}

/// One row per student, in the order given.
pub fn student_reports(
    students: &[StudentEntity],
    records: &[AttendanceRecord],
) -> Vec<StudentReport> {
    let mut by_student: HashMap<&str, Tally> = HashMap::new();
    for r in records {
        by_student.entry(r.student_id.as_str()).or_default().add(r.present);
    }
    students
        .iter()
        .map(|s| {
            let t = by_student.get(s.id.as_str()).copied().unwrap_or_default();
            StudentReport {
                id: s.id.clone(),
                class_id: s.class_id.clone(),
                roll_no: s.roll_no.clone(),
                full_name: s.full_name.clone(),
                class_name: s.class_name.clone().unwrap_or_else(|| "—".to_string()),
                total_days: t.total,
                present_days: t.present,
                absent_days: t.total - t.present,
                percentage: percentage(t.present, t.total),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub class_id: String,
    pub class_name: String,
    pub student_count: usize,
    pub average_percentage: u32,
    pub band: Band,
}

fn mean_rounded(values: &[u32]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().map(|v| *v as u64).sum();
    let n = values.len() as u64;
    ((sum * 2 + n) / (n * 2)) as u32
}

/// Mean of member percentages per class, rounded. Members are matched by
/// class id; names are only unique per owner.
pub fn class_summaries(classes: &[ClassEntity], reports: &[StudentReport]) -> Vec<ClassSummary> {
    classes
        .iter()
        .map(|c| {
            let pcts: Vec<u32> = reports
                .iter()
                .filter(|r| r.class_id == c.id)
                .map(|r| r.percentage)
                .collect();
            let avg = mean_rounded(&pcts);
            ClassSummary {
                class_id: c.id.clone(),
                class_name: c.name.clone(),
                student_count: pcts.len(),
                average_percentage: avg,
                band: Band::from_percentage(avg),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateReport {
    pub student_id: String,
    pub roll_no: String,
    pub full_name: String,
    pub is_present: bool,
    pub status: String,
}

impl TableRow for DateReport {
    fn field(&self, key: &str) -> Option<FieldValue> {
        Some(match key {
            "student_id" => FieldValue::Text(self.student_id.clone()),
            "roll_no" => FieldValue::Text(self.roll_no.clone()),
            "full_name" => FieldValue::Text(self.full_name.clone()),
            "is_present" => FieldValue::Bool(self.is_present),
            "status" => FieldValue::Text(self.status.clone()),
            _ => return None,
        })
    }
}

/// Records of one class and date joined to their students, sorted by roll number.
pub fn date_reports(students: &[StudentEntity], records: &[AttendanceRecord]) -> Vec<DateReport> {
    let by_id: HashMap<&str, &StudentEntity> =
        students.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut out: Vec<DateReport> = records
        .iter()
        .map(|r| {
            let s = by_id.get(r.student_id.as_str());
            DateReport {
                student_id: r.student_id.clone(),
                roll_no: s.map(|s| s.roll_no.clone()).unwrap_or_default(),
                full_name: s.map(|s| s.full_name.clone()).unwrap_or_default(),
                is_present: r.present,
                status: if r.present { "Present" } else { "Absent" }.to_string(),
            }
        })
        .collect();
    out.sort_by(|a, b| a.roll_no.cmp(&b.roll_no));
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassActivity {
    pub class_name: String,
    pub date: String,
    pub present: usize,
    pub total: usize,
    pub percentage: u32,
    pub band: Band,
}

/// Summary of a class's latest records; `None` when it has none.
pub fn class_activity(
    class: &ClassEntity,
    latest_first: &[AttendanceRecord],
) -> Option<ClassActivity> {
    let last = latest_first.first()?;
    let t = tally(latest_first);
    let pct = percentage(t.present, t.total);
    Some(ClassActivity {
        class_name: class.name.clone(),
        date: format_date(last.date),
        present: t.present,
        total: t.total,
        percentage: pct,
        band: Band::from_percentage(pct),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_classes: i64,
    pub today: String,
    pub today_attendance: u32,
    pub today_band: Band,
    pub overall_attendance: u32,
    pub overall_band: Band,
    pub recent_attendance: Vec<ClassActivity>,
}

pub fn dashboard_stats(
    total_classes: i64,
    total_students: i64,
    today: NaiveDate,
    all_records: &[AttendanceRecord],
    recent_attendance: Vec<ClassActivity>,
) -> DashboardStats {
    let today_t = tally(all_records.iter().filter(|r| r.date == today));
    let overall_t = tally(all_records);
    let today_pct = percentage(today_t.present, today_t.total);
    let overall_pct = percentage(overall_t.present, overall_t.total);
    DashboardStats {
        total_students,
        total_classes,
        today: format_date(today),
        today_attendance: today_pct,
        today_band: Band::from_percentage(today_pct),
        overall_attendance: overall_pct,
        overall_band: Band::from_percentage(overall_pct),
        recent_attendance,
    }
}
