use crate::application::PageRequest;
use crate::application::auth::{StaffInput, StaffPatch};
use crate::application::orders::{DEFAULT_ORDER_PAGE_SIZE, OrderPage, Receipt};
use crate::domain::order::OrderStatus;
use crate::domain::payment::Payment;
use crate::domain::user::PublicUser;
use crate::interfaces::http::extract::{Owner, RequestMeta, StaffOrOwner};
use crate::interfaces::http::response::{ApiJson, ApiResponse, ApiResult};
use crate::interfaces::http::state::AppState;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct StaffOrderQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_staff(_: Owner, State(state): State<AppState>) -> ApiResult<Vec<PublicUser>> {
    Ok(ApiResponse::ok(state.auth.list_users().await?))
}

pub async fn create_staff(
    _: Owner,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<StaffInput>,
) -> ApiResult<PublicUser> {
    Ok(ApiResponse::created(state.auth.create_staff(input).await?))
}

pub async fn update_staff(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    ApiJson(patch): ApiJson<StaffPatch>,
) -> ApiResult<PublicUser> {
    Ok(ApiResponse::ok(state.auth.update_staff(id, patch).await?))
}

pub async fn delete_staff(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<()> {
    state.auth.delete_user(id).await?;
    Ok(ApiResponse::empty().message("Staff deleted successfully"))
}

/// Paged order queue, optionally narrowed to one status.
pub async fn list_orders(
    _: StaffOrOwner,
    State(state): State<AppState>,
    Query(query): Query<StaffOrderQuery>,
) -> ApiResult<OrderPage> {
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "all")
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let page = PageRequest::new(query.page, query.limit, DEFAULT_ORDER_PAGE_SIZE)?;
    Ok(ApiResponse::ok(
        state.orders.list_orders_paged(status, page).await?,
    ))
}

pub async fn receipt(
    _: StaffOrOwner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Receipt> {
    Ok(ApiResponse::ok(state.orders.receipt(id).await?))
}

pub async fn confirm_manual_payment(
    StaffOrOwner(user): StaffOrOwner,
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(order_id): Path<u64>,
) -> ApiResult<Payment> {
    let payment = state
        .payments
        .confirm_manual_payment(order_id, &meta.context(Some(&user)))
        .await?;
    Ok(ApiResponse::ok(payment).message("Payment confirmed"))
}
