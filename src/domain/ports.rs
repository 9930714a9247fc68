use super::audit::{AuditEntry, NewAuditEntry};
use super::menu::{Category, MenuItem, NewCategory, NewMenuItem};
use super::order::{NewOrder, Order};
use super::payment::{NewPayment, Payment, PaymentStatus, SignedNotification};
use super::sales::{SalesEvent, SalesStat};
use super::user::{NewUser, Role, User};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Stores assign ids from a per-entity monotonically increasing sequence.
// Lookups with default bodies are derived from `list`; backends may override.

/// Result of a guarded user insert.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInsert {
    Created(User),
    EmailTaken,
    OwnerExists,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts `user` unless another account holds its email. With
    /// `first_owner` it also refuses once any owner exists. Both checks and
    /// the insert happen under one write lock.
    async fn create_unique(&self, user: NewUser, first_owner: bool) -> Result<UserInsert>;
    /// Writes `user` unless another account holds its email.
    async fn update_unique(&self, user: User) -> Result<bool>;
    async fn get(&self, id: u64) -> Result<Option<User>>;
    /// All users, id ascending.
    async fn list(&self) -> Result<Vec<User>>;
    async fn update(&self, user: User) -> Result<()>;
    async fn delete(&self, id: u64) -> Result<bool>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.list().await?.into_iter().find(|u| u.email == email))
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|u| u.reset_token.as_deref() == Some(token)))
    }

    async fn owner_exists(&self) -> Result<bool> {
        Ok(self.list().await?.iter().any(|u| u.role == Role::Owner))
    }
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create(&self, category: NewCategory) -> Result<Category>;
    async fn get(&self, id: u64) -> Result<Option<Category>>;
    /// All categories, name ascending.
    async fn list(&self) -> Result<Vec<Category>>;
    async fn update(&self, category: Category) -> Result<()>;
    async fn delete(&self, id: u64) -> Result<bool>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(self.list().await?.into_iter().find(|c| c.name == name))
    }
}

#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn create(&self, item: NewMenuItem) -> Result<MenuItem>;
    async fn get(&self, id: u64) -> Result<Option<MenuItem>>;
    /// All items, newest first.
    async fn list(&self) -> Result<Vec<MenuItem>>;
    async fn update(&self, item: MenuItem) -> Result<()>;
    async fn delete(&self, id: u64) -> Result<bool>;

    async fn get_many(&self, ids: &[u64]) -> Result<Vec<MenuItem>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|m| ids.contains(&m.id))
            .collect())
    }

    /// Moves every item of `old` to `new`; returns how many were touched.
    async fn rename_category(&self, old: &str, new: &str) -> Result<u64> {
        let mut touched = 0;
        for mut item in self.list().await? {
            if item.category == old {
                item.category = new.to_string();
                self.update(item).await?;
                touched += 1;
            }
        }
        Ok(touched)
    }

    /// Deletes the items of a category, or of one of its subcategories.
    async fn delete_by_category(&self, category: &str, subcategory: Option<&str>) -> Result<u64> {
        let mut deleted = 0;
        for item in self.list().await? {
            let sub_matches = subcategory.is_none_or(|s| item.subcategory == s);
            if item.category == category && sub_matches && self.delete(item.id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrder) -> Result<Order>;
    async fn get(&self, id: u64) -> Result<Option<Order>>;
    /// All orders, newest first.
    async fn list(&self) -> Result<Vec<Order>>;
    async fn update(&self, order: Order) -> Result<()>;

    /// The order that owns line item `item_id`.
    async fn find_by_item(&self, item_id: u64) -> Result<Option<Order>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|o| o.items.iter().any(|it| it.id == item_id)))
    }
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: NewPayment) -> Result<Payment>;
    async fn get(&self, id: u64) -> Result<Option<Payment>>;
    /// All payments, newest first.
    async fn list(&self) -> Result<Vec<Payment>>;
    /// Writes `payment` only while the stored row is still in `expected`.
    /// Returns `false` when another writer moved it first.
    async fn update_if_status(&self, payment: Payment, expected: PaymentStatus) -> Result<bool>;

    async fn find_by_order(&self, order_id: u64) -> Result<Vec<Payment>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.order_id == order_id)
            .collect())
    }

    async fn find_by_provider_ref(&self, provider_ref: &str) -> Result<Option<Payment>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|p| p.provider_ref.as_deref() == Some(provider_ref)))
    }
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: NewAuditEntry) -> Result<AuditEntry>;
    /// All entries in insertion order.
    async fn entries(&self) -> Result<Vec<AuditEntry>>;
}

#[async_trait]
pub trait SalesStatStore: Send + Sync {
    /// Applies `event` to the counters of `date`, creating them if needed.
    async fn apply(&self, date: &str, event: SalesEvent) -> Result<SalesStat>;
    async fn get(&self, date: &str) -> Result<Option<SalesStat>>;
}

pub type UserStoreRef = Arc<dyn UserStore>;
pub type CategoryStoreRef = Arc<dyn CategoryStore>;
pub type MenuStoreRef = Arc<dyn MenuStore>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type AuditLogRef = Arc<dyn AuditLog>;
pub type SalesStatStoreRef = Arc<dyn SalesStatStore>;

/// Every storage port, as wired by one backend.
#[derive(Clone)]
pub struct Stores {
    pub users: UserStoreRef,
    pub categories: CategoryStoreRef,
    pub menu: MenuStoreRef,
    pub orders: OrderStoreRef,
    pub payments: PaymentStoreRef,
    pub audit: AuditLogRef,
    pub sales: SalesStatStoreRef,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SnapItem {
    pub id: String,
    pub price: i64,
    pub quantity: u32,
    pub name: String,
}

/// A hosted-checkout transaction request.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub customer_details: Option<serde_json::Value>,
    pub item_details: Vec<SnapItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SnapSession {
    pub token: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_transaction(&self, request: SnapRequest) -> Result<SnapSession>;
    /// Checks the notification's `signature_key` against our server key.
    fn verify_signature(&self, notification: &SignedNotification<'_>) -> bool;
}

pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, email: &str, reset_url: &str) -> Result<()>;
}

pub type MailerRef = Arc<dyn Mailer>;
