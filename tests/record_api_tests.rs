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

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub pool: sqlx::SqlitePool,
}

async fn spawn_app() -> TestApp {
    spawn_app_with_store(MockFileStore::new()).await
}

/// Variant taking the attachment store, for exercising storage failures.
async fn spawn_app_with_store(storage: MockFileStore) -> TestApp {
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
        storage: Arc::new(storage) as StorageState,
        notifier: Arc::new(MockNotifier::new()) as NotifierState,
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

    TestApp { address, pool }
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

fn law_payload(name: &str) -> Value {
    json!({
        "name": name,
        "order_number": "ZRU-107",
        "adopted_date": "2024-03-12",
        "effective_date": "2024-06-01",
        "issuing_authority": "Oliy Majlis",
        "link": "/uploads/laws/zru-107.pdf",
    })
}

// --- Generic CRUD protocol ---

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn law_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;
    let base = format!("{}/documents/laws", app.address);

    // Create: 201 plus the stored record including its id.
    let response = client
        .post(&base)
        .bearer_auth(&token)
        .json(&law_payload("On Urban Planning"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let law: Value = response.json().await.unwrap();
    let id = law["id"].as_i64().unwrap();
    assert_eq!(law["name"], "On Urban Planning");
    assert_eq!(law["link"], "/uploads/laws/zru-107.pdf");

    // Anonymous list sees it.
    let listed: Vec<Value> = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"].as_i64(), Some(id));

    // Update a text field; the attachment reference stays.
    let response = client
        .put(format!("{base}/{id}"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "On Urban Planning (amended)",
            "order_number": "ZRU-107",
            "adopted_date": "2024-03-12",
            "effective_date": "2024-06-01",
            "issuing_authority": "Oliy Majlis",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["name"], "On Urban Planning (amended)");
    assert_eq!(updated["link"], "/uploads/laws/zru-107.pdf");

    // Delete: acknowledged once, 404 after.
    let response = client
        .delete(format!("{base}/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Law deleted");

    let listed: Vec<Value> = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert!(listed.is_empty());

    let response = client
        .delete(format!("{base}/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn mutations_require_an_admin_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let base = format!("{}/documents/laws", app.address);

    let response = client
        .post(&base)
        .json(&law_payload("Unauthorized"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client.delete(format!("{base}/1")).send().await.unwrap();
    assert_eq!(response.status(), 401);

    // Nothing was written.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM laws")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn updating_a_missing_record_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    let response = client
        .put(format!("{}/institute/vacancies/42", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Senior Engineer",
            "position": "Engineer",
            "department": "Norms",
            "status": "open",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Vacancy not found");
}

#[tokio::test]
async fn missing_required_field_is_unprocessable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    let response = client
        .post(format!("{}/documents/laws", app.address))
        .bearer_auth(&token)
        .json(&json!({"name": "Half a law"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
}

// --- Multipart attachments ---

#[tokio::test]
async fn multipart_update_without_file_keeps_the_stored_attachment() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;
    let base = format!("{}/news/news", app.address);

    let form = reqwest::multipart::Form::new()
        .text("title", "Opening ceremony")
        .text("content", "The new building opened today.")
        .text("date", "2025-02-10")
        .part(
            "image",
            reqwest::multipart::Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .file_name("opening.png"),
        );
    let response = client
        .post(&base)
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let post: Value = response.json().await.unwrap();
    let id = post["id"].as_i64().unwrap();
    assert_eq!(post["image"], "/uploads/news/mock_opening.png");

    // Update text only: the image column coalesces to the stored reference.
    let form = reqwest::multipart::Form::new()
        .text("title", "Opening ceremony (updated)")
        .text("content", "The new building opened today.")
        .text("date", "2025-02-10");
    let response = client
        .put(format!("{base}/{id}"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["title"], "Opening ceremony (updated)");
    assert_eq!(updated["image"], "/uploads/news/mock_opening.png");
}

#[tokio::test]
async fn disallowed_upload_extension_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    let form = reqwest::multipart::Form::new()
        .text("name", "Not a law")
        .text("order_number", "X")
        .text("adopted_date", "2024-01-01")
        .text("effective_date", "2024-01-01")
        .text("issuing_authority", "Nobody")
        .part(
            "link",
            reqwest::multipart::Part::bytes(b"MZ".to_vec()).file_name("law.exe"),
        );
    let response = client
        .post(format!("{}/documents/laws", app.address))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .contains("extension exe not allowed")
    );
}

#[tokio::test]
async fn storage_failure_during_create_stores_nothing() {
    let app = spawn_app_with_store(MockFileStore::new_failing()).await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    let form = reqwest::multipart::Form::new()
        .text("name", "On Urban Planning")
        .text("order_number", "ZRU-107")
        .text("adopted_date", "2024-03-12")
        .text("effective_date", "2024-06-01")
        .text("issuing_authority", "Oliy Majlis")
        .part(
            "link",
            reqwest::multipart::Part::bytes(b"%PDF".to_vec()).file_name("law.pdf"),
        );
    let response = client
        .post(format!("{}/documents/laws", app.address))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);

    // The failure happens before the insert, so no row appears.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM laws")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// --- Norm hierarchy ---

async fn create_norm(client: &reqwest::Client, address: &str, token: &str, name: &str) -> i64 {
    let response = client
        .post(format!("{address}/documents/urban-norms"))
        .bearer_auth(token)
        .json(&json!({"norm_name": name}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let norm: Value = response.json().await.unwrap();
    norm["id"].as_i64().unwrap()
}

async fn create_group(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    norm_id: i64,
    name: &str,
) -> i64 {
    let response = client
        .post(format!("{address}/documents/urban-norms/{norm_id}/groups"))
        .bearer_auth(token)
        .json(&json!({"group_name": name}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let group: Value = response.json().await.unwrap();
    group["id"].as_i64().unwrap()
}

#[tokio::test]
async fn group_under_a_missing_norm_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    let response = client
        .post(format!("{}/documents/urban-norms/999/groups", app.address))
        .bearer_auth(&token)
        .json(&json!({"group_name": "Orphan"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Norm not found");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM norm_groups")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn document_under_a_foreign_group_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    let norm_a = create_norm(&client, &app.address, &token, "Residential buildings").await;
    let norm_b = create_norm(&client, &app.address, &token, "Road construction").await;
    let group_b = create_group(&client, &app.address, &token, norm_b, "Bridges").await;

    // group_b belongs to norm_b, so the norm_a URL must not accept it.
    let response = client
        .post(format!(
            "{}/documents/urban-norms/{norm_a}/groups/{group_b}/documents",
            app.address
        ))
        .bearer_auth(&token)
        .json(&json!({
            "code": "ShNK 2.01.01",
            "name": "Crossing clearances",
            "link": "/uploads/norm-documents/shnk.pdf",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // The same payload lands under the right norm.
    let response = client
        .post(format!(
            "{}/documents/urban-norms/{norm_b}/groups/{group_b}/documents",
            app.address
        ))
        .bearer_auth(&token)
        .json(&json!({
            "code": "ShNK 2.01.01",
            "name": "Crossing clearances",
            "link": "/uploads/norm-documents/shnk.pdf",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn group_listings_are_scoped_to_their_norm() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    let norm_a = create_norm(&client, &app.address, &token, "Water supply").await;
    let norm_b = create_norm(&client, &app.address, &token, "Heating").await;
    create_group(&client, &app.address, &token, norm_a, "Pipelines").await;
    create_group(&client, &app.address, &token, norm_a, "Pumping stations").await;
    create_group(&client, &app.address, &token, norm_b, "Boilers").await;

    let groups: Vec<Value> = client
        .get(format!(
            "{}/documents/urban-norms/{norm_a}/groups",
            app.address
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g["norm_id"].as_i64() == Some(norm_a)));
}

// --- Pagination and news ---

#[tokio::test]
async fn standards_listing_is_paginated() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    for i in 1..=3 {
        let response = client
            .post(format!("{}/documents/standards", app.address))
            .bearer_auth(&token)
            .json(&json!({
                "code": format!("O'zDSt {i}"),
                "name": format!("Standard {i}"),
                "pdf_link": format!("/uploads/standards/{i}.pdf"),
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    let page: Value = client
        .get(format!(
            "{}/documents/standards?page=1&size=2",
            app.address
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"].as_i64(), Some(3));
    assert_eq!(page["pages"].as_i64(), Some(2));
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let page: Value = client
        .get(format!(
            "{}/documents/standards?page=2&size=2",
            app.address
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    // Defaults: page 1, size 50.
    let page: Value = client
        .get(format!("{}/documents/standards", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["page"].as_i64(), Some(1));
    assert_eq!(page["size"].as_i64(), Some(50));
    assert_eq!(page["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn news_detail_and_related_news() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;
    let base = format!("{}/news/news", app.address);

    let mut first_id = 0;
    for (i, date) in ["2025-01-01", "2025-01-02", "2025-01-03"].iter().enumerate() {
        let response = client
            .post(&base)
            .bearer_auth(&token)
            .json(&json!({
                "title": format!("Post {}", i + 1),
                "content": "body",
                "date": date,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let post: Value = response.json().await.unwrap();
        if i == 0 {
            first_id = post["id"].as_i64().unwrap();
        }
    }

    // Anonymous detail view.
    let response = client
        .get(format!("{base}/{first_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let post: Value = response.json().await.unwrap();
    assert_eq!(post["title"], "Post 1");

    let response = client.get(format!("{base}/999")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    // Related news: newest first.
    let related: Vec<Value> = client
        .get(format!("{}/news/related-news", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(related.len(), 3);
    assert_eq!(related[0]["date"], "2025-01-03");
    assert_eq!(related[2]["date"], "2025-01-01");
}
