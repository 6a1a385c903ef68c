//! CSV Bulk Import
//!
//! Parses the two roster CSV formats into rows ready for a batch commit:
//!
//! - new students: `name,class,classNo,level`
//! - badge/points reconciliation: `name,class,classNo,badge,points`
//!
//! The first line is always a header and is skipped. Quoted fields are
//! supported, so a name may contain a comma if it is quoted. Missing trailing
//! columns are treated as empty. Any parse failure rejects the whole file;
//! nothing is written.

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::db::{BadgeUpdate, NewStudent};
use crate::types::Badge;

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: unknown badge '{value}'")]
    InvalidBadge { line: u64, value: String },

    #[error("line {line}: points must be an integer, got '{value}'")]
    InvalidPoints { line: u64, value: String },
}

/// 신규 학생 CSV 파싱
///
/// 이름이 비어 있는 행은 건너뜀
pub fn parse_new_students(text: &str) -> Result<Vec<NewStudent>, CsvImportError> {
    let mut students = Vec::new();

    for row in records(text) {
        let (line, record) = row?;
        let name = field(&record, 0);
        if name.is_empty() {
            continue;
        }

        students.push(NewStudent::with_defaults(
            name,
            field(&record, 1),
            field(&record, 2),
            field(&record, 3),
        ));
        tracing::trace!(line, name, "parsed new student row");
    }

    Ok(students)
}

/// 배지/점수 CSV 파싱
///
/// 빈 badge/points 칸은 "변경 없음"
pub fn parse_badge_updates(text: &str) -> Result<Vec<BadgeUpdate>, CsvImportError> {
    let mut updates = Vec::new();

    for row in records(text) {
        let (line, record) = row?;
        let name = field(&record, 0);
        if name.is_empty() {
            continue;
        }

        let badge = match field(&record, 3) {
            "" => None,
            value => Some(value.parse::<Badge>().map_err(|_| CsvImportError::InvalidBadge {
                line,
                value: value.to_string(),
            })?),
        };

        let points = match field(&record, 4) {
            "" => None,
            value => Some(value.parse::<i64>().map_err(|_| CsvImportError::InvalidPoints {
                line,
                value: value.to_string(),
            })?),
        };

        updates.push(BadgeUpdate {
            name: name.to_string(),
            class_name: field(&record, 1).to_string(),
            class_no: field(&record, 2).to_string(),
            badge,
            points,
        });
    }

    Ok(updates)
}

/// 헤더 다음 행부터 (줄 번호, 레코드)
fn records(text: &str) -> impl Iterator<Item = Result<(u64, StringRecord), CsvImportError>> + '_ {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes())
        .into_records()
        .map(|row| {
            row.map(|record| {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                (line, record)
            })
            .map_err(|source| CsvImportError::Malformed {
                line: source.position().map(|p| p.line()).unwrap_or(0),
                source,
            })
        })
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}
