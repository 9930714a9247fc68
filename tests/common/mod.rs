#![allow(dead_code)]

use axum::routing::post;
use axum::{Json, Router};
use reqwest::StatusCode;
use restopos::application::auth::AuthSettings;
use restopos::infrastructure::in_memory::in_memory_stores;
use restopos::infrastructure::mailer::LogMailer;
use restopos::infrastructure::midtrans::{MidtransGateway, notification_signature};
use restopos::interfaces::http::router;
use restopos::interfaces::http::state::{AppState, HttpSettings};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const SERVER_KEY: &str = "SB-Mid-server-test";
pub const JWT_SECRET: &str = "integration-secret";
pub const OWNER_EMAIL: &str = "owner@resto.id";
pub const PASSWORD: &str = "secret123";

pub struct TestApp {
    pub base: String,
    pub client: reqwest::Client,
    pub state: AppState,
}

/// Stand-in for the Snap API: hands out a token derived from the reference.
async fn fake_snap(Json(body): Json<Value>) -> (axum::http::StatusCode, Json<Value>) {
    let reference = body["transaction_details"]["order_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    (
        axum::http::StatusCode::CREATED,
        Json(json!({
            "token": format!("snap-{reference}"),
            "redirect_url": format!("https://app.sandbox.midtrans.com/snap/v4/redirection/snap-{reference}"),
        })),
    )
}

async fn spawn_fake_snap() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new().route("/snap", post(fake_snap)))
            .await
            .unwrap();
    });
    format!("http://{addr}/snap")
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(HttpSettings::default()).await
}

pub async fn spawn_app_with(settings: HttpSettings) -> TestApp {
    let gateway = MidtransGateway::new(Some(SERVER_KEY.into()), false)
        .unwrap()
        .with_snap_url(spawn_fake_snap().await);

    let mut auth = AuthSettings::new(JWT_SECRET);
    auth.hash_cost = 4;

    let state = AppState::new(
        in_memory_stores(),
        Arc::new(gateway),
        Arc::new(LogMailer::new("Test POS")),
        auth,
        settings,
    );
    state.menu.ensure_default_categories().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        state,
    }
}

/// A gateway notification signed with the test server key.
pub fn signed_notification(reference: &str, status: &str, gross_amount: &str) -> Value {
    json!({
        "order_id": reference,
        "status_code": "200",
        "gross_amount": gross_amount,
        "transaction_status": status,
        "fraud_status": "accept",
        "signature_key": notification_signature(reference, "200", gross_amount, SERVER_KEY),
    })
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, token: Option<&str>) -> (StatusCode, Value) {
        let request = match token {
            Some(t) => request.bearer_auth(t),
            None => request,
        };
        let response = request.send().await.unwrap();
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(self.client.get(self.url(path)), token).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(self.client.post(self.url(path)).json(&body), token)
            .await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(self.client.put(self.url(path)).json(&body), token)
            .await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(self.client.delete(self.url(path)), token).await
    }

    /// Registers the first account (the owner) and returns its token.
    pub async fn owner_token(&self) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({"name": "Owner", "email": OWNER_EMAIL, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Creates a staff account through the owner and logs it in.
    pub async fn staff_token(&self, owner: &str, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/staff",
                Some(owner),
                json!({"name": "Kasir", "email": email, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({"email": email, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn create_menu_item(&self, owner: &str, name: &str, price: u32) -> u64 {
        let (status, body) = self
            .post(
                "/api/menu",
                Some(owner),
                json!({"name": name, "price": price, "category": "makanan"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_u64().unwrap()
    }

    /// Places a guest order and returns its id.
    pub async fn guest_order(&self, items: Value) -> u64 {
        let (status, body) = self
            .post(
                "/api/orders/guest",
                None,
                json!({"tableNumber": 4, "customerName": "Rina", "items": items}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_u64().unwrap()
    }
}
