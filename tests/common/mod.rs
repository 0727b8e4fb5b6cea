//! Shared harness: runs the real router on an ephemeral port, backed by
//! in-memory storage, and drives it over HTTP.

use serde_json::{json, Value};
use std::sync::Arc;
use storefront_api::transport::http::{create_router, AppState};
use storefront_api::{MemoryStorage, Storage};

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
}

pub async fn spawn_app() -> TestApp {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let router = create_router(AppState::new(storage));

    // Bind to an ephemeral port so tests can run in parallel.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn finish(resp: reqwest::Response) -> (u16, Value) {
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        Self::finish(self.client.get(self.url(path)).send().await.unwrap()).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        Self::finish(self.client.post(self.url(path)).json(&body).send().await.unwrap()).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> (u16, Value) {
        Self::finish(self.client.patch(self.url(path)).json(&body).send().await.unwrap()).await
    }

    pub async fn delete(&self, path: &str) -> (u16, Value) {
        Self::finish(self.client.delete(self.url(path)).send().await.unwrap()).await
    }

    /// Creates a record and returns its id; panics unless the server answers 201.
    pub async fn create(&self, path: &str, body: Value) -> i64 {
        let (status, resp) = self.post(path, body).await;
        assert_eq!(status, 201, "POST {} failed: {}", path, resp);
        resp["data"]["id"].as_i64().unwrap()
    }

    pub async fn category(&self, name: &str) -> i64 {
        self.create("/categories", json!({ "name": name })).await
    }

    pub async fn product(&self, category_id: i64, name: &str, price: f64, available: bool) -> i64 {
        self.create(
            "/products",
            json!({
                "name": name,
                "categoryId": category_id,
                "price": price,
                "isAvailable": available,
            }),
        )
        .await
    }

    pub async fn user(&self, username: &str) -> i64 {
        self.create(
            "/users",
            json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "passwordHash": "hash",
            }),
        )
        .await
    }
}

/// `data` as an array of ids.
pub fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["id"].as_i64()).collect())
        .unwrap_or_default()
}
