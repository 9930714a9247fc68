use crate::application::orders::{GuestOrderRequest, ItemUpdate, OrderRequest};
use crate::domain::order::{ItemStatus, Order, OrderStatus};
use crate::interfaces::http::extract::{AuthUser, StaffOrOwner};
use crate::interfaces::http::response::{ApiJson, ApiResponse, ApiResult};
use crate::interfaces::http::state::AppState;
use axum::extract::{Path, State};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OrderStatusBody {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemStatusBody {
    pub status: ItemStatus,
}

pub async fn create_guest_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GuestOrderRequest>,
) -> ApiResult<Order> {
    Ok(ApiResponse::created(
        state.orders.create_guest_order(request).await?,
    ))
}

pub async fn get_guest_order(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Order> {
    Ok(ApiResponse::ok(state.orders.get_order(id).await?))
}

pub async fn create_order(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OrderRequest>,
) -> ApiResult<Order> {
    let order = state.orders.create_order(request).await?;
    tracing::debug!(order_id = order.id, user_id = user.id, "order entered at the till");
    Ok(ApiResponse::created(order))
}

pub async fn get_order(
    _: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Order> {
    Ok(ApiResponse::ok(state.orders.get_order(id).await?))
}

pub async fn list_orders(_: StaffOrOwner, State(state): State<AppState>) -> ApiResult<Vec<Order>> {
    Ok(ApiResponse::ok(state.orders.list_orders().await?))
}

pub async fn update_status(
    _: StaffOrOwner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    ApiJson(body): ApiJson<OrderStatusBody>,
) -> ApiResult<Order> {
    let status: OrderStatus = body.status.trim().parse()?;
    Ok(ApiResponse::ok(state.orders.update_status(id, status).await?))
}

pub async fn update_item_status(
    _: StaffOrOwner,
    State(state): State<AppState>,
    Path(item_id): Path<u64>,
    ApiJson(body): ApiJson<ItemStatusBody>,
) -> ApiResult<ItemUpdate> {
    Ok(ApiResponse::ok(
        state.orders.update_item_status(item_id, body.status).await?,
    ))
}
