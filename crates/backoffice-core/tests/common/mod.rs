//! In-process mock of the back office API for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use backoffice_core::auth::{
    ChannelHooks, MemoryStore, Notice, Route, SessionManager, SessionPhase, SessionStore,
    StoreError, UiEvent,
};
use backoffice_core::SessionSettings;
use reqwest::Url;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

pub const TOKEN: &str = "abc123";
pub const PASSWORD: &str = "secret";
pub const EMAIL: &str = "admin@asdenim.id";

#[derive(Default)]
pub struct BackendState {
    pub logout_calls: AtomicUsize,
}

pub struct MockBackend {
    pub base_url: Url,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    pub fn logout_calls(&self) -> usize {
        self.state.logout_calls.load(Ordering::SeqCst)
    }
}

pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(BackendState::default());
    let app = Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/echo", get(echo_headers).post(echo_headers))
        .route("/api/admin/expired", get(expired))
        .route("/api/admin/slow_expired", get(slow_expired))
        .route("/api/admin/missing", get(missing))
        .route("/api/admin/product", get(products).post(echo_request))
        .route(
            "/api/admin/product/:id",
            get(show_product)
                .post(echo_request)
                .put(echo_request)
                .delete(delete_product),
        )
        .route("/api/admin/category", post(echo_request))
        .route("/api/admin/update_siteuser_status/:id", put(echo_request))
        .route("/api/admin/get_admin", get(current_admin))
        .route("/api/admin/admin", put(update_admin))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend {
        base_url: Url::parse(&format!("http://{}", addr)).expect("mock backend url"),
        state,
    }
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        (
            StatusCode::OK,
            Json(json!({
                "message": "Login berhasil",
                "token": TOKEN,
                "user": {"id": 1, "name": "Admin", "email": EMAIL, "role": "superadmin"}
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Email atau password salah"})),
        )
    }
}

async fn logout(State(state): State<Arc<BackendState>>) -> Json<Value> {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({"message": "Logged out"}))
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "authorization": header_value(&headers, header::AUTHORIZATION),
        "content_type": header_value(&headers, header::CONTENT_TYPE),
        "accept": header_value(&headers, header::ACCEPT),
    }))
}

/// Echo method, content type and raw body of a write request
async fn echo_request(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    Json(json!({
        "method": method.as_str(),
        "authorization": header_value(&headers, header::AUTHORIZATION),
        "content_type": header_value(&headers, header::CONTENT_TYPE),
        "body": body,
    }))
}

async fn show_product(Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
    if id == 1 {
        (StatusCode::OK, Json(json!({"id": 1, "name": "Slim Fit Indigo"})))
    } else {
        missing().await
    }
}

async fn delete_product(Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
    if id == 1 {
        (StatusCode::OK, Json(json!({"message": "Produk berhasil dihapus"})))
    } else {
        missing().await
    }
}

async fn current_admin() -> Json<Value> {
    Json(json!({"user": {"id": 1, "name": "Admin", "email": EMAIL, "role": "superadmin"}}))
}

async fn update_admin(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "message": "Profil berhasil diperbarui.",
        "user": {"id": 1, "name": body["name"], "email": body["email"], "role": "superadmin"}
    }))
}

async fn expired() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthenticated."})))
}

async fn slow_expired() -> (StatusCode, Json<Value>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    expired().await
}

async fn missing() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"message": "Produk tidak ditemukan"})))
}

async fn products(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some("Bearer abc123");
    if authorized {
        (StatusCode::OK, Json(json!([{"id": 1, "name": "Slim Fit Indigo"}])))
    } else {
        expired().await
    }
}

/// Memory store whose writes to one key always fail
pub struct FailingWriteStore {
    entries: MemoryStore,
    failing_key: &'static str,
}

impl FailingWriteStore {
    pub fn new(failing_key: &'static str) -> Self {
        Self {
            entries: MemoryStore::new(),
            failing_key,
        }
    }
}

impl SessionStore for FailingWriteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.entries.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if key == self.failing_key {
            let e = std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full");
            return Err(e.into());
        }
        self.entries.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key)
    }
}

pub fn settings(backend: &MockBackend, window: Duration) -> SessionSettings {
    SessionSettings::new(backend.base_url.clone())
        .with_inactivity_window(window)
        .with_logout_timeout(Duration::from_secs(2))
}

pub fn manager(
    backend: &MockBackend,
    store: Arc<dyn SessionStore>,
    window: Duration,
) -> (SessionManager, UnboundedReceiver<UiEvent>) {
    let (hooks, rx) = ChannelHooks::new();
    let hooks = Arc::new(hooks);
    let manager = SessionManager::initialize(settings(backend, window), store, hooks.clone(), hooks)
        .expect("initialize session manager");
    (manager, rx)
}

pub fn drain(rx: &mut UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Notices that end a session
pub fn ending_notices(events: &[UiEvent]) -> Vec<Notice> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Notice(
                n @ (Notice::SignedOut | Notice::SessionExpired | Notice::Inactivity),
            ) => Some(n.clone()),
            _ => None,
        })
        .collect()
}

pub fn login_redirects(events: &[UiEvent]) -> usize {
    events
        .iter()
        .filter(|e| **e == UiEvent::Navigate(Route::Login))
        .count()
}

pub async fn wait_for_anonymous(manager: &SessionManager, within: Duration) -> bool {
    let mut rx = manager.subscribe();
    tokio::time::timeout(within, async {
        loop {
            if rx.borrow_and_update().phase == SessionPhase::Anonymous {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .is_ok()
}
