//! Admin API write surface and record lookups against the mock backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use backoffice_core::api::{AdminApi, ApiError};
use backoffice_core::auth::store::USER_KEY;
use backoffice_core::auth::{MemoryStore, SessionPhase, SessionStore};
use backoffice_core::models::{ProfileUpdate, Resource, UserProfile};
use common::{manager, spawn_backend, MockBackend};
use reqwest::multipart::Form;
use serde_json::{json, Value};

const LONG_WINDOW: Duration = Duration::from_secs(600);

async fn signed_in(backend: &MockBackend, store: Arc<MemoryStore>) -> AdminApi {
    let (session, _rx) = manager(backend, store, LONG_WINDOW);
    session
        .login(common::EMAIL, common::PASSWORD)
        .await
        .expect("login");
    AdminApi::new(session)
}

fn body_json(echo: &Value) -> Value {
    serde_json::from_str(echo["body"].as_str().expect("echoed body")).expect("json body")
}

#[tokio::test]
async fn test_show_and_delete_map_missing_record_to_not_found() {
    let backend = spawn_backend().await;
    let api = signed_in(&backend, Arc::new(MemoryStore::new())).await;

    let product = api.show(Resource::Products, 1).await.expect("show");
    assert_eq!(product["name"], "Slim Fit Indigo");

    let err = api.show(Resource::Products, 99).await.expect_err("missing show");
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::NotFound(body)) => assert!(body.contains("Produk tidak ditemukan")),
        other => panic!("unexpected error: {other:?}"),
    }

    let deleted = api.delete(Resource::Products, 1).await.expect("delete");
    assert_eq!(deleted["message"], "Produk berhasil dihapus");

    let err = api.delete(Resource::Products, 99).await.expect_err("missing delete");
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NotFound(_))));

    // A missing record is not a session problem
    assert_eq!(api.session().phase(), SessionPhase::Authenticated);
}

#[tokio::test]
async fn test_create_and_update_send_json() {
    let backend = spawn_backend().await;
    let api = signed_in(&backend, Arc::new(MemoryStore::new())).await;

    let created = api
        .create(Resource::Products, json!({"name": "Loose Fit Black"}))
        .await
        .expect("create");
    assert_eq!(created["method"], "POST");
    assert_eq!(created["content_type"], "application/json");
    assert_eq!(created["authorization"], "Bearer abc123");
    assert_eq!(body_json(&created)["name"], "Loose Fit Black");

    let updated = api
        .update(Resource::Products, 1, json!({"stock": 12}))
        .await
        .expect("update");
    assert_eq!(updated["method"], "PUT");
    assert_eq!(body_json(&updated)["stock"], 12);
}

#[tokio::test]
async fn test_update_with_files_posts_multipart_with_method_override() {
    let backend = spawn_backend().await;
    let api = signed_in(&backend, Arc::new(MemoryStore::new())).await;

    let form = Form::new().text("name", "Slim Fit Indigo");
    let echo = api
        .update_with_files(Resource::Products, 1, form)
        .await
        .expect("update with files");

    assert_eq!(echo["method"], "POST");
    let content_type = echo["content_type"].as_str().expect("content type");
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = echo["body"].as_str().expect("body");
    assert!(body.contains("name=\"_method\"\r\n\r\nPUT"));
    assert!(body.contains("Slim Fit Indigo"));
}

#[tokio::test]
async fn test_file_uploads_rejected_for_plain_records() {
    let backend = spawn_backend().await;
    let api = signed_in(&backend, Arc::new(MemoryStore::new())).await;

    let err = api
        .create_with_files(Resource::Orders, Form::new())
        .await
        .expect_err("orders take no files");
    assert!(err.to_string().contains("Orders records do not accept file uploads"));
    assert!(err.downcast_ref::<ApiError>().is_none());

    let err = api
        .update_with_files(Resource::SiteUsers, 3, Form::new())
        .await
        .expect_err("users take no files");
    assert!(err.to_string().contains("do not accept file uploads"));

    let created = api
        .create_with_files(Resource::Categories, Form::new().text("name", "Jeans"))
        .await
        .expect("categories take files");
    assert_eq!(created["method"], "POST");
}

#[tokio::test]
async fn test_site_user_status_update() {
    let backend = spawn_backend().await;
    let api = signed_in(&backend, Arc::new(MemoryStore::new())).await;

    let echo = api.set_site_user_status(7, "blocked").await.expect("status");
    assert_eq!(echo["method"], "PUT");
    assert_eq!(body_json(&echo), json!({"status": "blocked"}));
}

#[tokio::test]
async fn test_update_profile_refreshes_cached_user() {
    let backend = spawn_backend().await;
    let store = Arc::new(MemoryStore::new());
    let api = signed_in(&backend, store.clone()).await;

    let profile = api.profile().await.expect("profile");
    assert_eq!(profile["user"]["email"], common::EMAIL);

    let update = ProfileUpdate::new("Admin Baru", common::EMAIL);
    let user = api.update_profile(&update).await.expect("update profile");
    assert_eq!(user.name, "Admin Baru");

    let cached = api.session().user().expect("cached user");
    assert_eq!(cached.name, "Admin Baru");
    let snapshot = api.session().subscribe().borrow().clone();
    assert_eq!(snapshot.user.map(|u| u.name).as_deref(), Some("Admin Baru"));

    let raw = store.get(USER_KEY).expect("read store").expect("stored user");
    let stored: UserProfile = serde_json::from_str(&raw).expect("stored user json");
    assert_eq!(stored.name, "Admin Baru");
    assert_eq!(stored.email, common::EMAIL);
}
