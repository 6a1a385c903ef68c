//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `ClubService`: 명단/출석/대회/공지 쓰기와 스냅샷 갱신
//! - `SyncHub`: WebSocket 실시간 스냅샷
//! - `ranking`: 리더보드 계산 (순수 함수)
//! - `csv_import` / `export`: CSV 일괄 등록과 내보내기
//! - `auth`: 관리자/학생 세션
//! - `finance`: 수입/지출 계산기

pub mod auth;
pub mod club;
pub mod csv_import;
pub mod export;
pub mod finance;
pub mod ranking;
pub mod sync;
pub mod view;

pub use auth::{AuthState, SessionStore};
pub use club::{ClubService, Standing};
pub use ranking::RankedStudent;
pub use sync::{SyncHub, SyncMessage};
