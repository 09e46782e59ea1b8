use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Trims and maps blank input to `None`.
pub fn blank_to_none(v: Option<&str>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntity {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentEntity {
    pub id: String,
    pub roll_no: String,
    pub full_name: String,
    pub class_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    /// Joined from `classes` on list reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

/// Student fields as entered in a form or an import row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub roll_no: String,
    pub full_name: String,
    pub class_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub date: NaiveDate,
    pub present: bool,
    pub marked_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One row to be written for a roster student on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub student_id: String,
    pub class_id: String,
    pub date: NaiveDate,
    pub present: bool,
    pub marked_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceChange {
    pub attendance_id: String,
    pub previous_status: bool,
    pub new_status: bool,
    pub changed_by: String,
}

/// A stored change-log entry joined with the student it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub id: String,
    pub attendance_id: String,
    pub student_id: String,
    pub full_name: String,
    pub previous_status: bool,
    pub new_status: bool,
    pub changed_by: String,
    pub changed_at: String,
}
