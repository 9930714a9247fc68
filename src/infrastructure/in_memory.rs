use crate::domain::audit::{AuditEntry, NewAuditEntry};
use crate::domain::menu::{Category, MenuItem, NewCategory, NewMenuItem};
use crate::domain::order::{ItemStatus, NewOrder, Order, OrderItem, OrderStatus};
use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::domain::ports::{
    AuditLog, CategoryStore, MenuStore, OrderStore, PaymentStore, SalesStatStore, Stores,
    UserInsert, UserStore,
};
use crate::domain::sales::{SalesEvent, SalesStat};
use crate::domain::user::{NewUser, Role, User};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Rows keyed by id plus the id sequence, guarded together so that id
/// assignment and insertion are atomic.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<u64, T>,
    last_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// A thread-safe in-memory store for user accounts.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    table: Arc<RwLock<Table<User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_user(table: &mut Table<User>, user: NewUser) -> User {
    let now = Utc::now();
    let created = User {
        id: table.next_id(),
        name: user.name,
        email: user.email,
        password_hash: user.password_hash,
        role: user.role,
        status: user.status,
        reset_token: None,
        reset_token_expires: None,
        created_at: now,
        updated_at: now,
    };
    table.rows.insert(created.id, created.clone());
    created
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_unique(&self, user: NewUser, first_owner: bool) -> Result<UserInsert> {
        let mut table = self.table.write().await;
        if table.rows.values().any(|u| u.email == user.email) {
            return Ok(UserInsert::EmailTaken);
        }
        if first_owner && table.rows.values().any(|u| u.role == Role::Owner) {
            return Ok(UserInsert::OwnerExists);
        }
        Ok(UserInsert::Created(insert_user(&mut table, user)))
    }

    async fn update_unique(&self, user: User) -> Result<bool> {
        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Ok(false);
        }
        table.rows.insert(user.id, user);
        Ok(true)
    }

    async fn get(&self, id: u64) -> Result<Option<User>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn update(&self, user: User) -> Result<()> {
        self.table.write().await.rows.insert(user.id, user);
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCategoryStore {
    table: Arc<RwLock<Table<Category>>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn create(&self, category: NewCategory) -> Result<Category> {
        let mut table = self.table.write().await;
        let created = Category {
            id: table.next_id(),
            name: category.name,
            subcategories: category.subcategories,
            icon: category.icon,
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: u64) -> Result<Option<Category>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let mut all: Vec<Category> = self.table.read().await.rows.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn update(&self, category: Category) -> Result<()> {
        self.table.write().await.rows.insert(category.id, category);
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMenuStore {
    table: Arc<RwLock<Table<MenuItem>>>,
}

impl InMemoryMenuStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MenuStore for InMemoryMenuStore {
    async fn create(&self, item: NewMenuItem) -> Result<MenuItem> {
        let mut table = self.table.write().await;
        let now = Utc::now();
        let created = MenuItem {
            id: table.next_id(),
            name: item.name,
            price: item.price,
            category: item.category,
            subcategory: item.subcategory,
            description: item.description,
            image_url: item.image_url,
            is_available: item.is_available,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: u64) -> Result<Option<MenuItem>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<MenuItem>> {
        // Ids grow with creation time, so reverse id order is newest first.
        Ok(self.table.read().await.rows.values().rev().cloned().collect())
    }

    async fn update(&self, item: MenuItem) -> Result<()> {
        self.table.write().await.rows.insert(item.id, item);
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn get_many(&self, ids: &[u64]) -> Result<Vec<MenuItem>> {
        let table = self.table.read().await;
        Ok(ids.iter().filter_map(|id| table.rows.get(id).cloned()).collect())
    }
}

#[derive(Default)]
struct OrderTable {
    orders: Table<Order>,
    last_item_id: u64,
}

#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    table: Arc<RwLock<OrderTable>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let mut table = self.table.write().await;
        let now = Utc::now();
        let total_amount = order.total();
        let mut items = Vec::with_capacity(order.items.len());
        for line in order.items {
            table.last_item_id += 1;
            items.push(OrderItem {
                id: table.last_item_id,
                menu_id: line.menu_id,
                name: line.name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                status: ItemStatus::Pending,
            });
        }
        let created = Order {
            id: table.orders.next_id(),
            table_number: order.table_number,
            customer_name: order.customer_name,
            items,
            total_amount,
            status: OrderStatus::Pending,
            payment_method: order.payment_method,
            created_at: now,
            updated_at: now,
        };
        table.orders.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: u64) -> Result<Option<Order>> {
        Ok(self.table.read().await.orders.rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.table.read().await.orders.rows.values().rev().cloned().collect())
    }

    async fn update(&self, order: Order) -> Result<()> {
        self.table.write().await.orders.rows.insert(order.id, order);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    table: Arc<RwLock<Table<Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, payment: NewPayment) -> Result<Payment> {
        let mut table = self.table.write().await;
        let now = Utc::now();
        let created = Payment {
            id: table.next_id(),
            order_id: payment.order_id,
            amount: payment.amount,
            payment_method: payment.payment_method,
            provider: payment.provider,
            provider_ref: payment.provider_ref,
            status: payment.status,
            gateway_status: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: u64) -> Result<Option<Payment>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Payment>> {
        Ok(self.table.read().await.rows.values().rev().cloned().collect())
    }

    async fn update_if_status(&self, payment: Payment, expected: PaymentStatus) -> Result<bool> {
        let mut table = self.table.write().await;
        match table.rows.get(&payment.id) {
            Some(stored) if stored.status == expected => {
                table.rows.insert(payment.id, payment);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Append-only in-memory audit trail.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        let mut entries = self.entries.write().await;
        let recorded = AuditEntry {
            id: entries.len() as u64 + 1,
            user_id: entry.user_id,
            action: entry.action,
            entity: entry.entity,
            entity_id: entry.entity_id,
            old_value: entry.old_value,
            new_value: entry.new_value,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            timestamp: Utc::now(),
        };
        entries.push(recorded.clone());
        Ok(recorded)
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.entries.read().await.clone())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySalesStatStore {
    stats: Arc<RwLock<HashMap<String, SalesStat>>>,
}

impl InMemorySalesStatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SalesStatStore for InMemorySalesStatStore {
    async fn apply(&self, date: &str, event: SalesEvent) -> Result<SalesStat> {
        let mut stats = self.stats.write().await;
        let stat = stats
            .entry(date.to_string())
            .or_insert_with(|| SalesStat::empty(date));
        stat.apply(event);
        Ok(stat.clone())
    }

    async fn get(&self, date: &str) -> Result<Option<SalesStat>> {
        Ok(self.stats.read().await.get(date).cloned())
    }
}

/// Wires a fresh set of in-memory stores.
pub fn in_memory_stores() -> Stores {
    Stores {
        users: Arc::new(InMemoryUserStore::new()),
        categories: Arc::new(InMemoryCategoryStore::new()),
        menu: Arc::new(InMemoryMenuStore::new()),
        orders: Arc::new(InMemoryOrderStore::new()),
        payments: Arc::new(InMemoryPaymentStore::new()),
        audit: Arc::new(InMemoryAuditLog::new()),
        sales: Arc::new(InMemorySalesStatStore::new()),
    }
}
