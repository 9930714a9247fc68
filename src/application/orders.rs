use super::{PageRequest, Pagination};
use crate::domain::money::Money;
use crate::domain::order::{
    ItemStatus, NewOrder, Order, OrderItem, OrderPaymentMethod, OrderStatus, PricedItem,
    RequestedItem, validate_order_request,
};
use crate::domain::ports::{MenuStoreRef, OrderStoreRef, SalesStatStoreRef};
use crate::domain::sales::{SalesEvent, date_key};
use crate::error::{PosError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_ORDER_PAGE_SIZE: u32 = 20;

/// Order submitted by an authenticated user at the till.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub table_number: u32,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<RequestedItem>,
    #[serde(default, alias = "payment_method")]
    pub payment_method: Option<OrderPaymentMethod>,
}

/// Order placed from the table's QR code.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GuestOrderRequest {
    pub table_number: u32,
    pub customer_name: String,
    pub items: Vec<RequestedItem>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ItemUpdate {
    pub order: Order,
    pub item: OrderItem,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    #[serde(flatten)]
    pub item: OrderItem,
    pub menu_name: String,
    pub menu_price: Money,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: u64,
    pub table_number: u32,
    pub customer_name: String,
    pub items: Vec<ReceiptLine>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: OrderPaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: OrderStoreRef,
    menu: MenuStoreRef,
    sales: SalesStatStoreRef,
}

impl OrderService {
    pub fn new(orders: OrderStoreRef, menu: MenuStoreRef, sales: SalesStatStoreRef) -> Self {
        Self {
            orders,
            menu,
            sales,
        }
    }

    /// Resolves requested lines against the current menu.
    async fn price_items(&self, requested: &[RequestedItem]) -> Result<Vec<PricedItem>> {
        let ids: Vec<u64> = requested.iter().map(|it| it.menu_id).collect();
        let menu: HashMap<u64, _> = self
            .menu
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        requested
            .iter()
            .map(|line| {
                let item = menu.get(&line.menu_id).ok_or_else(|| {
                    PosError::validation(format!("Menu item {} not found", line.menu_id))
                })?;
                if !item.is_available {
                    return Err(PosError::validation(format!(
                        "Menu item {} is not available",
                        item.name
                    )));
                }
                Ok(PricedItem {
                    menu_id: item.id,
                    name: item.name.clone(),
                    quantity: line.quantity,
                    unit_price: item.price,
                })
            })
            .collect()
    }

    async fn place(
        &self,
        table_number: u32,
        customer_name: String,
        requested: &[RequestedItem],
        payment_method: OrderPaymentMethod,
    ) -> Result<Order> {
        validate_order_request(table_number, requested)?;
        let items = self.price_items(requested).await?;
        let order = self
            .orders
            .create(NewOrder {
                table_number,
                customer_name,
                items,
                payment_method,
            })
            .await?;
        self.sales
            .apply(&date_key(order.created_at), SalesEvent::OrderCreated)
            .await?;
        tracing::info!(
            order_id = order.id,
            table = order.table_number,
            total = %order.total_amount,
            "order placed"
        );
        Ok(order)
    }

    pub async fn create_order(&self, request: OrderRequest) -> Result<Order> {
        let method = match request.payment_method {
            None => OrderPaymentMethod::Manual,
            Some(OrderPaymentMethod::Guest) => {
                return Err(PosError::validation(
                    "Payment method must be cash, midtrans or manual",
                ));
            }
            Some(method) => method,
        };
        let customer = request.customer_name.unwrap_or_default().trim().to_string();
        self.place(request.table_number, customer, &request.items, method)
            .await
    }

    pub async fn create_guest_order(&self, request: GuestOrderRequest) -> Result<Order> {
        let customer = request.customer_name.trim().to_string();
        if customer.is_empty() {
            return Err(PosError::validation("Customer name is required"));
        }
        self.place(
            request.table_number,
            customer,
            &request.items,
            OrderPaymentMethod::Guest,
        )
        .await
    }

    pub async fn get_order(&self, id: u64) -> Result<Order> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| PosError::not_found("Order not found"))
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.orders.list().await
    }

    pub async fn list_orders_paged(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<OrderPage> {
        let matching: Vec<Order> = self
            .orders
            .list()
            .await?
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();
        let (orders, pagination) = page.slice(matching);
        Ok(OrderPage { orders, pagination })
    }

    pub async fn update_status(&self, id: u64, status: OrderStatus) -> Result<Order> {
        let mut order = self.get_order(id).await?;
        order.status = status;
        order.updated_at = Utc::now();
        self.orders.update(order.clone()).await?;
        tracing::info!(order_id = id, status = ?status, "order status updated");
        Ok(order)
    }

    pub async fn update_item_status(&self, item_id: u64, status: ItemStatus) -> Result<ItemUpdate> {
        let mut order = self
            .orders
            .find_by_item(item_id)
            .await?
            .ok_or_else(|| PosError::not_found("Order item not found"))?;
        let item = {
            let item = order
                .item_mut(item_id)
                .ok_or_else(|| PosError::not_found("Order item not found"))?;
            item.status = status;
            item.clone()
        };
        order.updated_at = Utc::now();
        self.orders.update(order.clone()).await?;
        Ok(ItemUpdate { order, item })
    }

    /// The order with each line annotated with the current menu name and price.
    pub async fn receipt(&self, id: u64) -> Result<Receipt> {
        let order = self.get_order(id).await?;
        let ids: Vec<u64> = order.items.iter().map(|it| it.menu_id).collect();
        let menu: HashMap<u64, _> = self
            .menu
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let items = order
            .items
            .into_iter()
            .map(|item| {
                let (menu_name, menu_price) = menu
                    .get(&item.menu_id)
                    .map(|m| (m.name.clone(), m.price))
                    .unwrap_or_else(|| ("Unknown".to_string(), Money::ZERO));
                ReceiptLine {
                    item,
                    menu_name,
                    menu_price,
                }
            })
            .collect();

        Ok(Receipt {
            id: order.id,
            table_number: order.table_number,
            customer_name: order.customer_name,
            items,
            total_amount: order.total_amount,
            status: order.status,
            payment_method: order.payment_method,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}
