use crate::interfaces::http::response::{ApiResponse, ApiResult};
use crate::interfaces::http::state::AppState;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
    midtrans_client_key: Option<String>,
}

pub async fn root() -> ApiResponse<()> {
    ApiResponse::empty().message("POS API is running")
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Health> {
    Ok(ApiResponse::ok(Health {
        status: "ok",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        midtrans_client_key: state.settings.midtrans_client_key.clone(),
    }))
}
