//! Sync Hub
//!
//! Live collection snapshots over WebSocket.
//!
//! Every committed write publishes the whole affected collection (never a
//! delta). Subscribers replace their local copy with each snapshot.
//!
//! # Collections
//! - students
//! - attendance
//! - competitions
//! - config (announcements only)
//! - leaderboard (derived from students + attendance)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::db::{Announcement, AttendanceRecord, Competition, Student};
use crate::services::ranking::RankedStudent;

/// 브로드캐스트 채널 버퍼 크기
const CHANNEL_CAPACITY: usize = 256;

/// WebSocket 메시지 타입
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SyncMessage {
    Students(Vec<Student>),
    Attendance(Vec<AttendanceRecord>),
    Competitions(Vec<Competition>),
    Config(ConfigSnapshot),
    Leaderboard(Vec<RankedStudent>),
    /// 에러
    Error(SyncError),
    /// 구독 확인
    Subscribed(SubscriptionConfirm),
    /// Heartbeat
    Ping,
    Pong,
}

impl SyncMessage {
    /// 스냅샷 메시지가 속한 컬렉션
    pub fn collection(&self) -> Option<Collection> {
        match self {
            SyncMessage::Students(_) => Some(Collection::Students),
            SyncMessage::Attendance(_) => Some(Collection::Attendance),
            SyncMessage::Competitions(_) => Some(Collection::Competitions),
            SyncMessage::Config(_) => Some(Collection::Config),
            SyncMessage::Leaderboard(_) => Some(Collection::Leaderboard),
            _ => None,
        }
    }
}

/// 설정 문서 중 공개 가능한 부분
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub announcements: Vec<Announcement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfirm {
    pub channel: String,
    pub subscribed: bool,
}

/// 구독 채널
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Collection {
    Students,
    Attendance,
    Competitions,
    Config,
    Leaderboard,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Students,
        Collection::Attendance,
        Collection::Competitions,
        Collection::Config,
        Collection::Leaderboard,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.to_string() == name)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Students => write!(f, "students"),
            Collection::Attendance => write!(f, "attendance"),
            Collection::Competitions => write!(f, "competitions"),
            Collection::Config => write!(f, "config"),
            Collection::Leaderboard => write!(f, "leaderboard"),
        }
    }
}

/// 연결 상태
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: String,
    pub connected_at: DateTime<Utc>,
    pub subscriptions: HashSet<Collection>,
}

impl ConnectionInfo {
    /// 새 연결은 모든 컬렉션을 구독한 상태로 시작
    pub fn new(id: String) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
            subscriptions: Collection::ALL.into_iter().collect(),
        }
    }
}

/// Sync Hub
///
/// 모든 WebSocket 연결과 스냅샷 브로드캐스팅을 관리
///
/// ```text
/// ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
/// │ ClubService │────▶│   SyncHub    │────▶│  Client 1   │
/// │  (writes)   │     │  (broadcast) │────▶│  Client 2   │
/// └─────────────┘     └──────────────┘     └─────────────┘
/// ```
pub struct SyncHub {
    tx: broadcast::Sender<SyncMessage>,
    connections: Arc<RwLock<HashMap<String, ConnectionInfo>>>,
}

impl SyncHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            tx,
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 스냅샷 브로드캐스트. 구독자가 없으면 조용히 버려짐
    pub fn publish(&self, message: SyncMessage) {
        let receivers = self.tx.send(message).unwrap_or(0);
        tracing::trace!(receivers, "snapshot published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncMessage> {
        self.tx.subscribe()
    }

    /// 연결 등록
    pub async fn register_connection(&self, info: ConnectionInfo) {
        let mut conns = self.connections.write().await;
        conns.insert(info.id.clone(), info);
    }

    /// 연결 해제
    pub async fn unregister_connection(&self, id: &str) {
        let mut conns = self.connections.write().await;
        conns.remove(id);
    }

    /// 활성 연결 수
    pub async fn active_connections(&self) -> usize {
        let conns = self.connections.read().await;
        conns.len()
    }

    /// 구독 변경. 등록되지 않은 연결이면 false
    pub async fn set_subscription(&self, id: &str, collection: Collection, on: bool) -> bool {
        let mut conns = self.connections.write().await;
        let Some(info) = conns.get_mut(id) else {
            return false;
        };
        if on {
            info.subscriptions.insert(collection);
        } else {
            info.subscriptions.remove(&collection);
        }
        true
    }

    /// 이 연결에 메시지를 보내야 하는지
    pub async fn wants(&self, id: &str, message: &SyncMessage) -> bool {
        let Some(collection) = message.collection() else {
            return true;
        };
        let conns = self.connections.read().await;
        conns
            .get(id)
            .map(|info| info.subscriptions.contains(&collection))
            .unwrap_or(false)
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket 클라이언트 메시지 (수신)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ClientMessage {
    /// 채널 구독
    Subscribe { channel: String },
    /// 구독 취소
    Unsubscribe { channel: String },
    /// Ping (keepalive)
    Ping,
}

/// 클라이언트 메시지 파싱
pub fn parse_client_message(data: &str) -> Result<ClientMessage> {
    serde_json::from_str(data).map_err(Into::into)
}

/// 서버 메시지 직렬화
pub fn serialize_message(msg: &SyncMessage) -> Result<String> {
    serde_json::to_string(msg).map_err(Into::into)
}
