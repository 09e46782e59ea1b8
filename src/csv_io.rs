use crate::model::{blank_to_none, ClassEntity, NewStudent};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const NO_VALID_STUDENTS: &str = "No valid students found. Make sure class names match exactly.";

/// Header row of field names, then one fully quoted row per record.
pub fn export_csv_string<T: Serialize>(rows: &[T]) -> anyhow::Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row).context("failed to serialize csv row")?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow!("failed to flush csv: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: Option<PathBuf>,
    pub rows: usize,
}

/// Writes `<dir>/<label>.csv`. Nothing is written for an empty sequence.
pub fn export_csv_file<T: Serialize>(
    dir: &Path,
    label: &str,
    rows: &[T],
) -> anyhow::Result<ExportSummary> {
    if rows.is_empty() {
        return Ok(ExportSummary {
            path: None,
            rows: 0,
        });
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.to_string_lossy()))?;
    let path = dir.join(format!("{}.csv", label));
    let body = export_csv_string(rows)?;
    std::fs::write(&path, body)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
    Ok(ExportSummary {
        path: Some(path),
        rows: rows.len(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub students: Vec<NewStudent>,
    pub skipped: usize,
}

/// Parses pasted roster text: `roll_no, full_name, class_name, email, phone`
/// by position, first line is a header. Rows without a known class, roll
/// number or name are dropped.
pub fn parse_student_import(text: &str, classes: &[ClassEntity]) -> anyhow::Result<ImportOutcome> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.trim().as_bytes());

    let mut students = Vec::new();
    let mut skipped = 0usize;
    for rec in rdr.records() {
        let rec = rec.context("failed to read csv line")?;
        let col = |i: usize| rec.get(i).unwrap_or("").trim();
        let roll_no = col(0);
        let full_name = col(1);
        let class_name = col(2).to_lowercase();
        let class_match = classes
            .iter()
            .find(|c| c.name.to_lowercase() == class_name);

        match class_match {
            Some(c) if !roll_no.is_empty() && !full_name.is_empty() => {
                students.push(NewStudent {
                    roll_no: roll_no.to_string(),
                    full_name: full_name.to_string(),
                    class_id: c.id.clone(),
                    email: blank_to_none(Some(col(3))),
                    phone: blank_to_none(Some(col(4))),
                });
            }
            _ => skipped += 1,
        }
    }

    if students.is_empty() {
        return Err(anyhow!(NO_VALID_STUDENTS));
    }
    Ok(ImportOutcome { students, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(id: &str, name: &str) -> ClassEntity {
        ClassEntity {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            created_by: "u".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[derive(Serialize)]
    struct Row {
        roll_no: String,
        full_name: String,
        percentage: u32,
    }

    #[test]
    fn export_quotes_every_field() {
        let rows = vec![
            Row {
                roll_no: "1".into(),
                full_name: "Ann, Lee".into(),
                percentage: 80,
            },
            Row {
                roll_no: "2".into(),
                full_name: "Bo".into(),
                percentage: 0,
            },
        ];
        let s = export_csv_string(&rows).expect("export");
        assert_eq!(
            s,
            "\"roll_no\",\"full_name\",\"percentage\"\n\"1\",\"Ann, Lee\",\"80\"\n\"2\",\"Bo\",\"0\"\n"
        );
    }

    #[test]
    fn empty_export_writes_nothing() {
        let dir = std::env::temp_dir().join(format!("smartattend-csv-{}", uuid::Uuid::new_v4()));
        let out = export_csv_file::<Row>(&dir, "empty", &[]).expect("export");
        assert_eq!(out.rows, 0);
        assert!(out.path.is_none());
        assert!(!dir.join("empty.csv").exists());
    }

    #[test]
    fn import_resolves_class_case_insensitively_and_drops_unknown() {
        let classes = vec![class("c1", "Grade 5A"), class("c2", "Grade 6")];
        let text = "roll_no,full_name,class_name,email,phone\n\
                    1, Ann Lee ,grade 5a,ann@example.com,\n\
                    2,Bo Chan,GRADE 6,,555-0101\n\
                    3,Cy Diaz,Grade 9,,\n";
        let out = parse_student_import(text, &classes).expect("import");
        assert_eq!(out.students.len(), 2);
        assert_eq!(out.skipped, 1);
        assert_eq!(out.students[0].full_name, "Ann Lee");
        assert_eq!(out.students[0].class_id, "c1");
        assert_eq!(out.students[0].email.as_deref(), Some("ann@example.com"));
        assert_eq!(out.students[0].phone, None);
        assert_eq!(out.students[1].class_id, "c2");
        assert_eq!(out.students[1].phone.as_deref(), Some("555-0101"));
    }

    #[test]
    fn import_drops_rows_missing_roll_or_name() {
        let classes = vec![class("c1", "A")];
        let text = "h\n,No Roll,A\n7,,A\n8,Ok,A";
        let out = parse_student_import(text, &classes).expect("import");
        assert_eq!(out.students.len(), 1);
        assert_eq!(out.skipped, 2);
    }

    #[test]
    fn import_with_nothing_valid_is_an_error() {
        let err = parse_student_import("h\n1,Ann,Nowhere", &[]).unwrap_err();
        assert_eq!(err.to_string(), NO_VALID_STUDENTS);
    }
}
