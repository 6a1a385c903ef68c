//! Leaderboard CSV export.
//!
//! UTF-8 with a byte-order mark so spreadsheet apps pick the right encoding.

use anyhow::Result;
use chrono::NaiveDate;

use crate::services::ranking::RankedStudent;

pub const EXPORT_HEADER: [&str; 8] = [
    "姓名", "班別", "班號", "等級", "章別", "原始積分", "出勤加分", "總積分",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 예: `ranking_2024-03-01.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("ranking_{}.csv", date.format("%Y-%m-%d"))
}

/// 리더보드 순서대로 CSV 생성
pub fn leaderboard_csv(rows: &[RankedStudent]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(EXPORT_HEADER)?;

    for row in rows {
        writer.write_record([
            row.student.name.clone(),
            row.student.class_name.clone(),
            row.student.class_no.clone(),
            row.student.level.clone(),
            row.student.badge.label().to_string(),
            row.raw_points().to_string(),
            row.attendance_bonus().to_string(),
            row.total_points.to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Student;
    use crate::services::ranking::build_leaderboard;
    use crate::types::Badge;
    use chrono::Utc;

    #[test]
    fn test_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_filename(date), "ranking_2024-03-09.csv");
    }

    #[test]
    fn test_csv_layout() {
        let students = vec![Student {
            id: "a".to_string(),
            name: "Wong, Ka Ho".to_string(),
            class_name: "1A".to_string(),
            class_no: "3".to_string(),
            level: "初級".to_string(),
            badge: Badge::Gold,
            points: None,
            created_at: Utc::now(),
        }];
        let rows = build_leaderboard(&students, &[]);

        let bytes = leaderboard_csv(&rows).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("姓名,班別,班號,等級,章別,原始積分,出勤加分,總積分"));
        assert_eq!(lines.next(), Some("\"Wong, Ka Ho\",1A,3,初級,金章,0,0,200"));
        assert_eq!(lines.next(), None);
    }
}
