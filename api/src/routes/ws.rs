//! WebSocket Routes
//!
//! 컬렉션 스냅샷 실시간 스트리밍
//!
//! # Endpoints
//! - `GET /ws` - WebSocket 연결
//!
//! 연결 직후 현재 스냅샷을 모두 보내고, 이후 변경될 때마다 해당
//! 컬렉션 전체를 다시 보냄. 수신이 밀려 메시지를 놓치면 스냅샷 재전송.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::services::sync::{
    parse_client_message, serialize_message, ClientMessage, Collection, ConnectionInfo,
    SubscriptionConfirm, SyncError, SyncHub, SyncMessage,
};
use crate::AppState;

/// WebSocket 업그레이드 핸들러
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// WebSocket 연결 처리
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let hub = state.hub.clone();

    // 스냅샷을 읽기 전에 구독해야 그 사이 변경을 놓치지 않음
    let mut updates = hub.subscribe();

    let conn_id = uuid::Uuid::new_v4().to_string();
    hub.register_connection(ConnectionInfo::new(conn_id.clone())).await;
    tracing::debug!(%conn_id, "WebSocket connected");

    // 수신 태스크가 만든 응답은 송신 태스크가 전송
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<SyncMessage>();

    // 수신 태스크
    let recv_hub = hub.clone();
    let recv_conn_id = conn_id.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let reply = match parse_client_message(&text) {
                        Ok(client_msg) => {
                            handle_client_message(&recv_hub, &recv_conn_id, client_msg).await
                        }
                        Err(e) => SyncMessage::Error(SyncError {
                            code: 400,
                            message: format!("invalid message: {}", e),
                        }),
                    };
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // 송신 태스크
    let send_hub = hub.clone();
    let send_conn_id = conn_id.clone();
    let club = state.club.clone();
    let send_task = tokio::spawn(async move {
        let initial = club.snapshot_messages().await;
        if send_all(&mut sender, &send_hub, &send_conn_id, initial).await.is_err() {
            return;
        }

        loop {
            let batch = tokio::select! {
                received = updates.recv() => match received {
                    Ok(msg) => vec![msg],
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            conn_id = %send_conn_id,
                            skipped,
                            "subscriber lagged, resending snapshots"
                        );
                        club.snapshot_messages().await
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(reply) = reply_rx.recv() => {
                    if send_one(&mut sender, &reply).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            if send_all(&mut sender, &send_hub, &send_conn_id, batch).await.is_err() {
                break;
            }
        }
    });

    // 연결이 종료될 때까지 대기
    tokio::select! {
        _ = recv_task => {}
        _ = send_task => {}
    }

    // 연결 해제
    hub.unregister_connection(&conn_id).await;
    tracing::debug!(%conn_id, "WebSocket disconnected");
}

type WsSender = SplitSink<WebSocket, Message>;

/// 구독 중인 컬렉션만 전송
async fn send_all(
    sender: &mut WsSender,
    hub: &SyncHub,
    conn_id: &str,
    messages: Vec<SyncMessage>,
) -> Result<(), axum::Error> {
    for msg in messages {
        if hub.wants(conn_id, &msg).await {
            send_one(sender, &msg).await?;
        }
    }
    Ok(())
}

async fn send_one(sender: &mut WsSender, msg: &SyncMessage) -> Result<(), axum::Error> {
    match serialize_message(msg) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!("Failed to serialize sync message: {:?}", e);
            Ok(())
        }
    }
}

/// 클라이언트 메시지 처리
async fn handle_client_message(hub: &SyncHub, conn_id: &str, msg: ClientMessage) -> SyncMessage {
    let (channel, subscribed) = match msg {
        ClientMessage::Subscribe { channel } => (channel, true),
        ClientMessage::Unsubscribe { channel } => (channel, false),
        ClientMessage::Ping => return SyncMessage::Pong,
    };

    match Collection::parse(&channel) {
        Some(collection) => {
            hub.set_subscription(conn_id, collection, subscribed).await;
            tracing::info!(%conn_id, %collection, subscribed, "subscription changed");
            SyncMessage::Subscribed(SubscriptionConfirm { channel, subscribed })
        }
        None => SyncMessage::Error(SyncError {
            code: 404,
            message: format!("unknown channel: {}", channel),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_messages() {
        let hub = SyncHub::new();
        hub.register_connection(ConnectionInfo::new("c1".to_string())).await;

        let reply = handle_client_message(
            &hub,
            "c1",
            ClientMessage::Unsubscribe {
                channel: "attendance".to_string(),
            },
        )
        .await;
        match reply {
            SyncMessage::Subscribed(confirm) => {
                assert_eq!(confirm.channel, "attendance");
                assert!(!confirm.subscribed);
            }
            other => panic!("Expected Subscribed, got {:?}", other),
        }
        assert!(!hub.wants("c1", &SyncMessage::Attendance(vec![])).await);
        assert!(hub.wants("c1", &SyncMessage::Students(vec![])).await);
    }

    #[tokio::test]
    async fn test_unknown_channel_and_ping() {
        let hub = SyncHub::new();
        hub.register_connection(ConnectionInfo::new("c1".to_string())).await;

        let reply = handle_client_message(
            &hub,
            "c1",
            ClientMessage::Subscribe {
                channel: "pool_status".to_string(),
            },
        )
        .await;
        assert!(matches!(reply, SyncMessage::Error(SyncError { code: 404, .. })));

        let reply = handle_client_message(&hub, "c1", ClientMessage::Ping).await;
        assert!(matches!(reply, SyncMessage::Pong));
    }
}
