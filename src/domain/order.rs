use super::money::Money;
use crate::error::{PosError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Highest quantity accepted on one order line.
pub const MAX_ITEM_QUANTITY: u32 = 1000;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Processing,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Orders in these states count towards sales revenue.
    pub fn counts_as_sale(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Preparing | Self::Ready | Self::Completed
        )
    }
}

impl FromStr for OrderStatus {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| PosError::validation(format!("Invalid order status: {s}")))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

/// How the table intends to settle the order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentMethod {
    Cash,
    Midtrans,
    #[default]
    Manual,
    Guest,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: u64,
    pub menu_id: u64,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub status: ItemStatus,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub table_number: u32,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: OrderPaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order ready to be stored. Item ids are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub table_number: u32,
    pub customer_name: String,
    pub items: Vec<PricedItem>,
    pub payment_method: OrderPaymentMethod,
}

/// A requested line resolved against the menu.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedItem {
    pub menu_id: u64,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A line as submitted by the client.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestedItem {
    pub menu_id: u64,
    pub quantity: u32,
}

impl NewOrder {
    pub fn total(&self) -> Money {
        self.items
            .iter()
            .map(|it| it.unit_price * it.quantity)
            .sum()
    }
}

impl Order {
    pub fn compute_total(items: &[OrderItem]) -> Money {
        items.iter().map(OrderItem::subtotal).sum()
    }

    pub fn item_mut(&mut self, item_id: u64) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|it| it.id == item_id)
    }
}

pub fn validate_order_request(table_number: u32, items: &[RequestedItem]) -> Result<()> {
    if table_number < 1 {
        return Err(PosError::validation("Table number is required"));
    }
    if items.is_empty() {
        return Err(PosError::validation("Order items are required"));
    }
    if items.iter().any(|it| it.menu_id == 0) {
        return Err(PosError::validation("Menu item ID is required"));
    }
    if items.iter().any(|it| it.quantity < 1) {
        return Err(PosError::validation("Quantity must be at least 1"));
    }
    if items.iter().any(|it| it.quantity > MAX_ITEM_QUANTITY) {
        return Err(PosError::validation(format!(
            "Quantity must not exceed {MAX_ITEM_QUANTITY}"
        )));
    }
    Ok(())
}
