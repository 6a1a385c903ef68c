//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/api/auth/*` - 관리자/학생 로그인
//! - `/api/students/*`, `/api/import/*` - 명단 관리
//! - `/api/leaderboard/*`, `/api/export/*` - 순위와 내보내기
//! - `/api/attendance/*` - 출석
//! - `/api/competitions/*` - 대회
//! - `/api/announcements/*` - 공지
//! - `/api/finance/*` - 수입/지출 계산기
//! - `/ws` - WebSocket 실시간 스냅샷

pub mod announcements;
pub mod attendance;
pub mod auth;
pub mod competitions;
pub mod finance;
pub mod health;
pub mod leaderboard;
pub mod session;
pub mod students;
pub mod ws;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// 개발 환경 허용 origin
const DEV_ORIGINS: [&str; 3] = [
    "http://localhost:5173", // Vite dev server
    "http://localhost:3000",
    "http://127.0.0.1:5173",
];

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET    /health                      - 서버 상태 확인
///
/// POST   /api/auth/admin              - 관리자 로그인
/// POST   /api/auth/student            - 학생 로그인 (반 + 반번호)
/// POST   /api/auth/logout             - 로그아웃
/// GET    /api/auth/session            - 현재 세션
/// PUT    /api/auth/password           - 관리자 비밀번호 변경      [admin]
///
/// GET    /api/students                - 명단
/// POST   /api/students                - 학생 추가                 [admin]
/// PUT    /api/students/:id            - 학생 수정                 [admin]
/// DELETE /api/students/:id            - 학생 삭제                 [admin]
/// POST   /api/students/:id/points     - 원점수 증감               [admin]
/// POST   /api/import/students         - 명단 CSV 일괄 등록        [admin]
/// POST   /api/import/badges           - 배지/점수 CSV 반영        [admin]
///
/// GET    /api/leaderboard             - 전체 순위
/// GET    /api/leaderboard/me          - 본인 순위                 [student]
/// GET    /api/export/leaderboard.csv  - 순위 CSV                  [admin]
///
/// GET    /api/attendance?date=        - 날짜별 출석
/// POST   /api/attendance/toggle       - 출석 체크/해제            [admin]
///
/// GET    /api/competitions            - 대회 목록
/// POST   /api/competitions            - 대회 추가                 [admin]
/// DELETE /api/competitions/:id        - 대회 삭제                 [admin]
///
/// GET    /api/announcements           - 공지 목록
/// POST   /api/announcements           - 공지 추가                 [admin]
/// DELETE /api/announcements/:index    - 공지 삭제                 [admin]
///
/// POST   /api/finance/summary         - 수입/지출 요약            [admin]
///
/// GET    /ws                          - WebSocket
/// ```
pub fn create_router(state: AppState) -> Router {
    // 프로덕션에서는 ALLOWED_ORIGINS만 허용, 개발 환경에서는 localhost
    let cors = if state.config.is_production() {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = DEV_ORIGINS
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Auth
        .route("/api/auth/admin", post(auth::login_admin))
        .route("/api/auth/student", post(auth::login_student))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::current_session))
        .route("/api/auth/password", put(auth::change_password))

        // Roster
        .route(
            "/api/students",
            get(students::list_students).post(students::create_student),
        )
        .route(
            "/api/students/:id",
            put(students::update_student).delete(students::delete_student),
        )
        .route("/api/students/:id/points", post(students::adjust_points))
        .route("/api/import/students", post(students::import_students))
        .route("/api/import/badges", post(students::import_badges))

        // Leaderboard
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        .route("/api/leaderboard/me", get(leaderboard::get_my_standing))
        .route("/api/export/leaderboard.csv", get(leaderboard::export_leaderboard))

        // Attendance
        .route("/api/attendance", get(attendance::get_attendance))
        .route("/api/attendance/toggle", post(attendance::toggle_attendance))

        // Competitions
        .route(
            "/api/competitions",
            get(competitions::list_competitions).post(competitions::create_competition),
        )
        .route("/api/competitions/:id", delete(competitions::delete_competition))

        // Announcements
        .route(
            "/api/announcements",
            get(announcements::list_announcements).post(announcements::add_announcement),
        )
        .route("/api/announcements/:index", delete(announcements::remove_announcement))

        // Finance
        .route("/api/finance/summary", post(finance::summarize))

        // WebSocket
        .route("/ws", get(ws::ws_handler))

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)

        // 상태 주입
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        let state = AppState::build(Config::in_memory()).await.unwrap();
        create_router(state)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Body>,
        content_type: &str,
    ) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .header(header::CONTENT_TYPE, content_type)
            .body(body.unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec(), headers)
    }

    async fn call_json(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = body.map(|v| Body::from(v.to_string()));
        let (status, bytes, _) = call(app, method, uri, token, body, "application/json").await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn admin_token(app: &Router) -> String {
        let (status, body) = call_json(
            app,
            Method::POST,
            "/api/auth/admin",
            None,
            Some(json!({ "password": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["role"], "admin");
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = call_json(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"]["connected"], true);
    }

    #[tokio::test]
    async fn test_admin_login_and_guards() {
        let app = app().await;

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/api/auth/admin",
            None,
            Some(json!({ "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "WRONG_PASSWORD");

        let new_student = json!({ "name": "Amy", "class": "2B", "classNo": "7" });
        let (status, _) = call_json(
            &app,
            Method::POST,
            "/api/students",
            None,
            Some(new_student.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = admin_token(&app).await;
        let (status, body) = call_json(
            &app,
            Method::POST,
            "/api/students",
            Some(&token),
            Some(new_student),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["class"], "2B");
        assert_eq!(body["points"], 100);
        assert_eq!(body["badge"], "none");

        // 학생 세션으로는 관리자 API 불가
        let (status, body) = call_json(
            &app,
            Method::POST,
            "/api/auth/student",
            None,
            Some(json!({ "class": "2B", "classNo": "7" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let student_token = body["token"].as_str().unwrap().to_string();

        let (status, _) = call_json(
            &app,
            Method::POST,
            "/api/competitions",
            Some(&student_token),
            Some(json!({ "title": "Open" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_student_login_and_standing() {
        let app = app().await;
        let token = admin_token(&app).await;

        let (status, body, _) = call(
            &app,
            Method::POST,
            "/api/import/students",
            Some(&token),
            Some(Body::from("name,class,classNo,level\nAmy,1A,1,\nBen,1A,2,\n")),
            "text/csv",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["count"], 2);

        let (_, students) = call_json(&app, Method::GET, "/api/students", None, None).await;
        let ben_id = students[1]["id"].as_str().unwrap().to_string();
        let (status, body) = call_json(
            &app,
            Method::POST,
            &format!("/api/students/{}/points", ben_id),
            Some(&token),
            Some(json!({ "delta": 25 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points"], 125);

        let (status, _) = call_json(
            &app,
            Method::POST,
            "/api/auth/student",
            None,
            Some(json!({ "class": "1A", "classNo": "9" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = call_json(
            &app,
            Method::POST,
            "/api/auth/student",
            None,
            Some(json!({ "class": "1A", "classNo": "2" })),
        )
        .await;
        let student_token = body["token"].as_str().unwrap().to_string();
        assert_eq!(body["session"]["studentId"], ben_id.as_str());

        let (status, body) = call_json(
            &app,
            Method::GET,
            "/api/leaderboard/me",
            Some(&student_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rank"], 1);
        assert_eq!(body["total"], 2);
        assert_eq!(body["row"]["totalPoints"], 125);

        let (_, body) = call_json(
            &app,
            Method::POST,
            "/api/auth/logout",
            Some(&student_token),
            None,
        )
        .await;
        assert_eq!(body["session"]["role"], "loggedout");

        let (status, _) = call_json(
            &app,
            Method::GET,
            "/api/leaderboard/me",
            Some(&student_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_attendance_toggle_updates_leaderboard() {
        let app = app().await;
        let token = admin_token(&app).await;

        let (_, student) = call_json(
            &app,
            Method::POST,
            "/api/students",
            Some(&token),
            Some(json!({ "name": "Amy" })),
        )
        .await;
        let id = student["id"].as_str().unwrap().to_string();

        for expected in [true, false] {
            let (status, body) = call_json(
                &app,
                Method::POST,
                "/api/attendance/toggle",
                Some(&token),
                Some(json!({ "studentId": id, "present": true, "date": "2024-03-01" })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["changed"], expected);
        }

        let (_, body) = call_json(
            &app,
            Method::GET,
            "/api/attendance?date=2024-03-01",
            None,
            None,
        )
        .await;
        assert_eq!(body["records"].as_array().unwrap().len(), 1);

        let (_, board) = call_json(&app, Method::GET, "/api/leaderboard", None, None).await;
        assert_eq!(board[0]["attendanceCount"], 1);
        assert_eq!(board[0]["totalPoints"], 110);

        let (status, _) = call_json(
            &app,
            Method::POST,
            "/api/attendance/toggle",
            Some(&token),
            Some(json!({ "studentId": "missing", "present": true })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let app = app().await;
        let token = admin_token(&app).await;
        call_json(
            &app,
            Method::POST,
            "/api/students",
            Some(&token),
            Some(json!({ "name": "Amy" })),
        )
        .await;

        let (status, bytes, headers) = call(
            &app,
            Method::GET,
            "/api/export/leaderboard.csv",
            Some(&token),
            None,
            "text/plain",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("ranking_"));
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    }

    #[tokio::test]
    async fn test_announcements_and_finance() {
        let app = app().await;
        let token = admin_token(&app).await;

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/api/announcements",
            Some(&token),
            Some(json!({ "title": "Training moved", "date": "2024-03-02" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = call_json(
            &app,
            Method::DELETE,
            "/api/announcements/5",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call_json(
            &app,
            Method::POST,
            "/api/finance/summary",
            Some(&token),
            Some(json!({
                "revenue": [{ "label": "fees", "amount": "200" }],
                "expenses": [{ "label": "hall", "amount": 50 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["net"], "150.00");
        assert_eq!(body["marginPercent"], "75.00");
    }
}
