use institute_portal::{
    AppConfig, AppState, create_router,
    models::TokenResponse,
    notify::{MockNotifier, NotifierState},
    repository::{self, RepositoryState, SqliteRepository},
    storage::{MockFileStore, StorageState},
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub pool: sqlx::SqlitePool,
    pub notifier: MockNotifier,
}

/// Boots the router with a handle onto the mock notifier so tests can assert
/// on delivered messages.
async fn spawn_app(notifier: MockNotifier) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite in tests");

    let config = AppConfig::default();
    repository::init_db(&pool, &config.default_admin_password)
        .await
        .expect("Failed to initialize test database");

    let state = AppState {
        repo: Arc::new(SqliteRepository::new(pool.clone())) as RepositoryState,
        storage: Arc::new(MockFileStore::new()) as StorageState,
        notifier: Arc::new(notifier.clone()) as NotifierState,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        pool,
        notifier,
    }
}

async fn admin_token(client: &reqwest::Client, address: &str) -> String {
    let response = client
        .post(format!("{address}/auth/token"))
        .form(&[("username", "admin"), ("password", "admin")])
        .send()
        .await
        .expect("login request failed");
    assert_eq!(response.status(), 200);
    let token: TokenResponse = response.json().await.unwrap();
    token.access_token
}

fn contact_payload() -> Value {
    json!({
        "name": "Aziz Karimov",
        "email": "aziz@example.com",
        "subject": "Norm clarification",
        "message": "Which edition of ShNK 2.01.01 is in force?",
    })
}

#[tokio::test]
async fn anonymous_submission_is_stored_and_forwarded() {
    let app = spawn_app(MockNotifier::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/contact/send", app.address))
        .json(&contact_payload())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    // Default locale is uz.
    assert_eq!(body["message"], "Xabaringiz muvaffaqiyatli yuborildi");

    let sent = app.notifier.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "New contact message from Aziz Karimov");
    assert!(sent[0].1.contains("Norm clarification"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn confirmation_message_follows_the_lang_parameter() {
    let app = spawn_app(MockNotifier::new()).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/contact/send?lang=en", app.address))
        .json(&contact_payload())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Your message has been sent successfully");

    // Unknown codes fall back to uz rather than failing.
    let body: Value = client
        .post(format!("{}/contact/send?lang=fr", app.address))
        .json(&contact_payload())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Xabaringiz muvaffaqiyatli yuborildi");
}

#[tokio::test]
async fn delivery_failure_keeps_the_row_and_reports_bad_gateway() {
    let app = spawn_app(MockNotifier::new_failing()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/contact/send", app.address))
        .json(&contact_payload())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);

    // The message is committed before delivery is attempted, so staff can
    // still find it in the archive.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn incomplete_submission_is_rejected_before_storage() {
    let app = spawn_app(MockNotifier::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/contact/send", app.address))
        .json(&json!({"name": "No message"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert!(app.notifier.sent_messages().is_empty());
}

#[tokio::test]
async fn message_archive_is_admin_only() {
    let app = spawn_app(MockNotifier::new()).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/contact/send", app.address))
        .json(&contact_payload())
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("{}/contact/messages", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let token = admin_token(&client, &app.address).await;
    let messages: Vec<Value> = client
        .get(format!("{}/contact/messages", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["email"], "aziz@example.com");
}
