//! Configuration Module
//!
//! 환경변수에서 설정을 읽음 (`.env`는 main에서 dotenvy로 로드).
//! 값이 잘못되면 시작 시점에 실패.

use std::env;

use anyhow::{Context, Result};
use chrono::{Duration, FixedOffset};

use crate::services::auth::DEFAULT_SESSION_TTL_MINUTES;

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 포트 (기본값: 3001)
    pub port: u16,

    /// SQLite 연결 문자열
    /// 형식: sqlite://path/to/club.db?mode=rwc 또는 sqlite::memory:
    pub database_url: String,

    /// 설정 문서를 구분하는 네임스페이스
    pub namespace: String,

    /// 설정 문서가 처음 생성될 때의 관리자 비밀번호
    pub default_admin_password: String,

    /// 출석 날짜 계산 기준 UTC offset (기본값: UTC+8)
    pub utc_offset: FixedOffset,

    /// 로그인 세션 유효 시간 (기본값: 12시간)
    pub session_ttl: Duration,

    /// 프로덕션 CORS 허용 origin (쉼표 구분)
    pub allowed_origins: Vec<String>,

    /// 환경 (development, staging, production)
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// # Optional Environment Variables
    ///
    /// - `PORT`: 서버 포트 (기본값: 3001)
    /// - `DATABASE_URL`: SQLite 연결 문자열 (기본값: sqlite://club.db?mode=rwc)
    /// - `APP_NAMESPACE`: 설정 네임스페이스 (기본값: club)
    /// - `DEFAULT_ADMIN_PASSWORD`: 초기 관리자 비밀번호 (기본값: admin)
    /// - `UTC_OFFSET_MINUTES`: 출석 날짜 기준 (기본값: 480)
    /// - `SESSION_TTL_MINUTES`: 세션 유효 시간 (기본값: 720)
    /// - `ALLOWED_ORIGINS`: 프로덕션 CORS origin 목록
    /// - `ENVIRONMENT`: development | staging | production
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        let utc_offset_minutes: i32 = env::var("UTC_OFFSET_MINUTES")
            .unwrap_or_else(|_| "480".to_string())
            .parse()
            .context("UTC_OFFSET_MINUTES must be a valid number")?;
        let utc_offset = offset_from_minutes(utc_offset_minutes)?;

        let session_ttl_minutes: i64 = env::var("SESSION_TTL_MINUTES")
            .unwrap_or_else(|_| DEFAULT_SESSION_TTL_MINUTES.to_string())
            .parse()
            .context("SESSION_TTL_MINUTES must be a valid number")?;
        if session_ttl_minutes <= 0 {
            anyhow::bail!("SESSION_TTL_MINUTES must be positive");
        }

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("PORT must be a valid number")?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://club.db?mode=rwc".to_string()),

            namespace: env::var("APP_NAMESPACE").unwrap_or_else(|_| "club".to_string()),

            default_admin_password: env::var("DEFAULT_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),

            utc_offset,

            session_ttl: Duration::minutes(session_ttl_minutes),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            environment,
        })
    }

    /// 테스트용 in-memory 설정
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Config {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            namespace: "club".to_string(),
            default_admin_password: "admin".to_string(),
            utc_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            allowed_origins: Vec::new(),
            environment: Environment::Development,
        }
    }

    /// 프로덕션 환경인지 확인
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(minutes * 60)
        .with_context(|| format!("UTC offset of {} minutes is out of range", minutes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // 환경변수 없이 기본값으로 설정 생성
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.namespace, "club");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.session_ttl, Duration::hours(12));
    }

    #[test]
    fn test_offset() {
        let config = Config::in_memory();
        assert_eq!(config.utc_offset.local_minus_utc(), 8 * 3600);
        assert!(offset_from_minutes(24 * 60).is_err());
    }
}
