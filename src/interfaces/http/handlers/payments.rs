use super::PageQuery;
use crate::application::PageRequest;
use crate::application::idempotency::CachedResponse;
use crate::application::payments::{
    DEFAULT_PAYMENT_PAGE_SIZE, GuestDigitalPayment, PaymentPage, ProcessPayment,
};
use crate::domain::payment::{GatewayNotification, Payment};
use crate::interfaces::http::error::ApiError;
use crate::interfaces::http::extract::{AuthUser, RequestMeta, StaffOrOwner};
use crate::interfaces::http::response::{ApiJson, ApiResponse, ApiResult};
use crate::interfaces::http::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";
pub const NONCE: &str = "x-nonce";
pub const TIMESTAMP: &str = "x-timestamp";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestPayBody {
    #[serde(alias = "order_id")]
    pub order_id: u64,
    #[serde(default, alias = "customer_details")]
    pub customer_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusBody {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentBody {
    payment: Payment,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Staff-side capture. Honors `Idempotency-Key` (scoped to the caller) and
/// the nonce/timestamp replay headers.
pub async fn process_payment(
    StaffOrOwner(user): StaffOrOwner,
    State(state): State<AppState>,
    meta: RequestMeta,
    headers: HeaderMap,
    ApiJson(request): ApiJson<ProcessPayment>,
) -> Result<Response, ApiError> {
    let key = header(&headers, IDEMPOTENCY_KEY).map(str::to_string);
    if let Some(key) = &key
        && let Some(cached) = state.idempotency.get(user.id, key)
    {
        tracing::debug!(key = %key, "replaying cached payment response");
        let status = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK);
        return Ok((status, Json(cached.body)).into_response());
    }

    state.replay.check(
        &meta.ip.to_string(),
        header(&headers, NONCE),
        header(&headers, TIMESTAMP),
        Utc::now().timestamp_millis(),
    )?;

    let receipt = state
        .payments
        .process_payment(request, &meta.context(Some(&user)))
        .await?;
    let response = ApiResponse::created(receipt);

    if let Some(key) = key {
        match response.body() {
            Ok(body) => state.idempotency.put(
                user.id,
                key,
                CachedResponse {
                    status: response.status().as_u16(),
                    body,
                },
            ),
            Err(e) => tracing::warn!(error = %e, "could not cache payment response"),
        }
    }
    Ok(response.into_response())
}

pub async fn midtrans_webhook(
    State(state): State<AppState>,
    meta: RequestMeta,
    ApiJson(notification): ApiJson<GatewayNotification>,
) -> ApiResult<()> {
    let outcome = state
        .payments
        .handle_notification(&notification, &meta.context(None))
        .await?;
    tracing::info!(
        order_id = outcome.order_id,
        status = ?outcome.status,
        updated = outcome.updated,
        "gateway notification processed"
    );
    Ok(ApiResponse::empty())
}

pub async fn guest_pay(
    State(state): State<AppState>,
    meta: RequestMeta,
    ApiJson(body): ApiJson<GuestPayBody>,
) -> ApiResult<GuestDigitalPayment> {
    let checkout = state
        .payments
        .create_guest_digital_payment(body.order_id, body.customer_details, &meta.context(None))
        .await?;
    Ok(ApiResponse::created(checkout))
}

pub async fn guest_manual(
    State(state): State<AppState>,
    meta: RequestMeta,
    ApiJson(body): ApiJson<GuestPayBody>,
) -> ApiResult<PaymentBody> {
    let payment = state
        .payments
        .create_guest_manual_payment(body.order_id, &meta.context(None))
        .await?;
    Ok(ApiResponse::created(PaymentBody { payment }))
}

pub async fn list_payments(
    _: StaffOrOwner,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaymentPage> {
    let page = PageRequest::new(query.page, query.limit, DEFAULT_PAYMENT_PAGE_SIZE)?;
    Ok(ApiResponse::ok(state.payments.list_payments(page).await?))
}

pub async fn get_payment(
    _: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Payment> {
    Ok(ApiResponse::ok(state.payments.get_payment(id).await?))
}

pub async fn update_status(
    StaffOrOwner(user): StaffOrOwner,
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<u64>,
    ApiJson(body): ApiJson<PaymentStatusBody>,
) -> ApiResult<Payment> {
    let payment = state
        .payments
        .update_status(id, body.status.trim(), &meta.context(Some(&user)))
        .await?;
    Ok(ApiResponse::ok(payment))
}
