//! Club Manager API Library
//!
//! # Overview
//!
//! 동아리 명단, 출석, 대회, 공지, 리더보드를 관리하는 백엔드 API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐    │
//! │  │ Routes  │  │Services │  │   DB    │  │  Types  │    │
//! │  └────┬────┘  └────┬────┘  └────┬────┘  └────┬────┘    │
//! │       │            │            │            │          │
//! │       └────────────┴────────────┴────────────┘          │
//! │                         │                                │
//! └─────────────────────────┼────────────────────────────────┘
//!                           │
//!                           ▼
//!                  ┌────────────────┐
//!                  │  WebSocket     │
//!                  │  subscribers   │
//!                  └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 비즈니스 로직 (ClubService, SyncHub, ranking)
//! - `db`: 데이터베이스 연동
//! - `types`: 공통 타입 정의
//!
//! ## Usage
//!
//! ```rust,ignore
//! use club_api::{config::Config, routes, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = AppState::build(config).await?;
//!     let app = routes::create_router(state);
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod db;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::ApiError;
pub use db::Database;
pub use services::{ClubService, SessionStore, SyncHub};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub club: Arc<ClubService>,
    pub sessions: Arc<SessionStore>,
    pub hub: Arc<SyncHub>,
    pub config: Arc<Config>,
}

impl AppState {
    /// DB 연결, 마이그레이션, 초기 스냅샷 로드까지 수행
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let db = Arc::new(Database::connect(&config.database_url).await?);
        tracing::info!("🗄️  Database connected");

        db.run_migrations().await?;
        tracing::info!("📦 Migrations completed");

        let hub = Arc::new(SyncHub::new());
        let club = Arc::new(ClubService::new(db.clone(), hub.clone(), &config));
        club.bootstrap().await?;

        Ok(Self {
            db,
            club,
            sessions: Arc::new(SessionStore::new(config.session_ttl)),
            hub,
            config: Arc::new(config),
        })
    }
}
