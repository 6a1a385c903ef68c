//! Database Models
//!
//! Rows for the four synced collections: students, attendance,
//! competitions and the singleton system config.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::types::{Badge, DEFAULT_CLASS, DEFAULT_CLASS_NO, DEFAULT_LEVEL, DEFAULT_POINTS};

/// 학생
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,

    pub name: String,

    /// 반 (예: "1A")
    #[serde(rename = "class")]
    pub class_name: String,

    /// 반 번호 (문자열 그대로 비교)
    pub class_no: String,

    pub level: String,

    pub badge: Badge,

    /// 원점수. 비어 있으면 랭킹 계산 시 0으로 취급
    pub points: Option<i64>,

    pub created_at: DateTime<Utc>,
}

/// 출석 기록 (학생 1명 × 하루 1건 기준)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    /// 설정된 UTC offset 기준 날짜
    pub day: NaiveDate,
    pub checked_at: DateTime<Utc>,
}

/// 대회 공지
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competition {
    pub id: String,
    pub title: String,
    /// 자유 형식 날짜 문자열 (검증하지 않음)
    pub date: String,
    pub info: String,
    pub created_at: DateTime<Utc>,
}

/// 공지사항 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub title: String,
    pub date: String,
}

/// 시스템 설정 (namespace 당 1건)
#[derive(Debug, Clone, FromRow)]
pub struct SystemConfig {
    pub namespace: String,
    /// SHA-256 hex digest. 어떤 조회 API로도 노출하지 않음
    pub password_hash: String,
    pub announcements: Json<Vec<Announcement>>,
}

/// 신규 학생 입력
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub class_name: String,
    pub class_no: String,
    pub level: String,
    pub badge: Badge,
    pub points: i64,
}

impl NewStudent {
    /// 빈 값은 기본값으로 대체
    pub fn with_defaults(name: &str, class_name: &str, class_no: &str, level: &str) -> Self {
        fn or_default(value: &str, default: &str) -> String {
            let value = value.trim();
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        }

        Self {
            name: name.trim().to_string(),
            class_name: or_default(class_name, DEFAULT_CLASS),
            class_no: or_default(class_no, DEFAULT_CLASS_NO),
            level: or_default(level, DEFAULT_LEVEL),
            badge: Badge::None,
            points: DEFAULT_POINTS,
        }
    }
}

/// 학생 정보 부분 수정
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub class_no: Option<String>,
    pub level: Option<String>,
    pub badge: Option<Badge>,
}

/// 배지/점수 CSV 한 행
///
/// (name, class_name, class_no) 세 값이 정확히 일치하는 학생만 갱신
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeUpdate {
    pub name: String,
    pub class_name: String,
    pub class_no: String,
    pub badge: Option<Badge>,
    pub points: Option<i64>,
}

/// 새 대회
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCompetition {
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub info: String,
}
