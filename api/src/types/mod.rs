//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 출석 1회당 가산점
pub const ATTENDANCE_POINTS: i64 = 10;

/// 신규 학생 기본값
pub const DEFAULT_CLASS: &str = "1A";
pub const DEFAULT_CLASS_NO: &str = "0";
pub const DEFAULT_LEVEL: &str = "初級";
pub const DEFAULT_POINTS: i64 = 100;

/// 학생 배지 등급
///
/// DB에는 소문자 영문 이름으로 저장됨 (`none`, `bronze`, ...)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Badge {
    #[default]
    None,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Badge {
    pub const ALL: [Badge; 5] = [
        Badge::None,
        Badge::Bronze,
        Badge::Silver,
        Badge::Gold,
        Badge::Platinum,
    ];

    /// 배지 보너스 점수표 (코드에 고정, DB에 저장하지 않음)
    pub const fn bonus(self) -> i64 {
        match self {
            Badge::None => 0,
            Badge::Bronze => 50,
            Badge::Silver => 100,
            Badge::Gold => 200,
            Badge::Platinum => 300,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Badge::None => "none",
            Badge::Bronze => "bronze",
            Badge::Silver => "silver",
            Badge::Gold => "gold",
            Badge::Platinum => "platinum",
        }
    }

    /// 내보내기(CSV)용 표시 이름
    pub const fn label(self) -> &'static str {
        match self {
            Badge::None => "無",
            Badge::Bronze => "銅章",
            Badge::Silver => "銀章",
            Badge::Gold => "金章",
            Badge::Platinum => "白金章",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = String;

    /// 영문 이름(대소문자 무시) 또는 표시 이름을 허용
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();
        Badge::ALL
            .into_iter()
            .find(|b| b.as_str() == lower || b.label() == trimmed)
            .ok_or_else(|| format!("unknown badge: {}", trimmed))
    }
}
