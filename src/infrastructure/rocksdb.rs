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
use crate::error::{PosError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const CF_USERS: &str = "users";
pub const CF_CATEGORIES: &str = "categories";
pub const CF_MENU: &str = "menu";
pub const CF_ORDERS: &str = "orders";
pub const CF_PAYMENTS: &str = "payments";
pub const CF_AUDIT: &str = "audit";
pub const CF_SALES: &str = "sales";
/// Last assigned id per sequence name.
pub const CF_SEQUENCES: &str = "sequences";

const ALL_CFS: [&str; 8] = [
    CF_USERS,
    CF_CATEGORIES,
    CF_MENU,
    CF_ORDERS,
    CF_PAYMENTS,
    CF_AUDIT,
    CF_SALES,
    CF_SEQUENCES,
];

const SEQ_ORDER_ITEMS: &str = "order_items";

/// A persistent store backed by RocksDB, one column family per entity.
///
/// Rows are JSON documents keyed by their big-endian id, so forward iteration
/// yields id order and reverse iteration yields newest first. Sales counters
/// are keyed by their `YYYY-MM-DD` date.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    // Serializes sequence bumps and every read-modify-write.
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a database at `path` with every column family present.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Wires every storage port to this database.
    pub fn into_stores(self) -> Stores {
        Stores {
            users: Arc::new(self.clone()),
            categories: Arc::new(self.clone()),
            menu: Arc::new(self.clone()),
            orders: Arc::new(self.clone()),
            payments: Arc::new(self.clone()),
            audit: Arc::new(self.clone()),
            sales: Arc::new(self),
        }
    }

    fn handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PosError::Internal(format!("{name} column family not found")))
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let handle = self.handle(cf)?;
        self.db.put_cf(handle, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.handle(cf)?;
        match self.db.get_cf(handle, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str, mode: IteratorMode) -> Result<Vec<T>> {
        let handle = self.handle(cf)?;
        self.db
            .iterator_cf(handle, mode)
            .map(|item| {
                let (_key, value) = item?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }

    fn remove(&self, cf: &str, key: &[u8]) -> Result<bool> {
        let handle = self.handle(cf)?;
        if self.db.get_pinned_cf(handle, key)?.is_none() {
            return Ok(false);
        }
        self.db.delete_cf(handle, key)?;
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves `count` consecutive ids and returns the first one.
    fn reserve_ids(&self, sequence: &str, count: u64) -> Result<u64> {
        let _guard = self.lock();
        self.reserve_ids_locked(sequence, count)
    }

    /// As `reserve_ids`, for callers already holding `write_lock`.
    fn reserve_ids_locked(&self, sequence: &str, count: u64) -> Result<u64> {
        let handle = self.handle(CF_SEQUENCES)?;
        let last = match self.db.get_cf(handle, sequence)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    PosError::Internal(format!("corrupt sequence {sequence}"))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        self.db
            .put_cf(handle, sequence, (last + count).to_be_bytes())?;
        Ok(last + 1)
    }

    fn next_id(&self, sequence: &str) -> Result<u64> {
        self.reserve_ids(sequence, 1)
    }

    fn insert_user(&self, id: u64, user: NewUser) -> Result<User> {
        let now = Utc::now();
        let created = User {
            id,
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
        self.put_json(CF_USERS, &created.id.to_be_bytes(), &created)?;
        Ok(created)
    }
}

#[async_trait]
impl UserStore for RocksDbStore {
    async fn create_unique(&self, user: NewUser, first_owner: bool) -> Result<UserInsert> {
        let _guard = self.lock();
        let existing: Vec<User> = self.scan(CF_USERS, IteratorMode::Start)?;
        if existing.iter().any(|u| u.email == user.email) {
            return Ok(UserInsert::EmailTaken);
        }
        if first_owner && existing.iter().any(|u| u.role == Role::Owner) {
            return Ok(UserInsert::OwnerExists);
        }
        let id = self.reserve_ids_locked(CF_USERS, 1)?;
        Ok(UserInsert::Created(self.insert_user(id, user)?))
    }

    async fn update_unique(&self, user: User) -> Result<bool> {
        let _guard = self.lock();
        let existing: Vec<User> = self.scan(CF_USERS, IteratorMode::Start)?;
        if existing
            .iter()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Ok(false);
        }
        self.put_json(CF_USERS, &user.id.to_be_bytes(), &user)?;
        Ok(true)
    }

    async fn get(&self, id: u64) -> Result<Option<User>> {
        self.get_json(CF_USERS, &id.to_be_bytes())
    }

    async fn list(&self) -> Result<Vec<User>> {
        self.scan(CF_USERS, IteratorMode::Start)
    }

    async fn update(&self, user: User) -> Result<()> {
        self.put_json(CF_USERS, &user.id.to_be_bytes(), &user)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        self.remove(CF_USERS, &id.to_be_bytes())
    }
}

#[async_trait]
impl CategoryStore for RocksDbStore {
    async fn create(&self, category: NewCategory) -> Result<Category> {
        let created = Category {
            id: self.next_id(CF_CATEGORIES)?,
            name: category.name,
            subcategories: category.subcategories,
            icon: category.icon,
        };
        self.put_json(CF_CATEGORIES, &created.id.to_be_bytes(), &created)?;
        Ok(created)
    }

    async fn get(&self, id: u64) -> Result<Option<Category>> {
        self.get_json(CF_CATEGORIES, &id.to_be_bytes())
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let mut all: Vec<Category> = self.scan(CF_CATEGORIES, IteratorMode::Start)?;
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn update(&self, category: Category) -> Result<()> {
        self.put_json(CF_CATEGORIES, &category.id.to_be_bytes(), &category)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        self.remove(CF_CATEGORIES, &id.to_be_bytes())
    }
}

#[async_trait]
impl MenuStore for RocksDbStore {
    async fn create(&self, item: NewMenuItem) -> Result<MenuItem> {
        let now = Utc::now();
        let created = MenuItem {
            id: self.next_id(CF_MENU)?,
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
        self.put_json(CF_MENU, &created.id.to_be_bytes(), &created)?;
        Ok(created)
    }

    async fn get(&self, id: u64) -> Result<Option<MenuItem>> {
        self.get_json(CF_MENU, &id.to_be_bytes())
    }

    async fn list(&self) -> Result<Vec<MenuItem>> {
        self.scan(CF_MENU, IteratorMode::End)
    }

    async fn update(&self, item: MenuItem) -> Result<()> {
        self.put_json(CF_MENU, &item.id.to_be_bytes(), &item)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        self.remove(CF_MENU, &id.to_be_bytes())
    }

    async fn get_many(&self, ids: &[u64]) -> Result<Vec<MenuItem>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.get_json(CF_MENU, &id.to_be_bytes())? {
                found.push(item);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl OrderStore for RocksDbStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let total_amount = order.total();
        let first_item_id = self.reserve_ids(SEQ_ORDER_ITEMS, order.items.len() as u64)?;
        let items = order
            .items
            .into_iter()
            .zip(first_item_id..)
            .map(|(line, id)| OrderItem {
                id,
                menu_id: line.menu_id,
                name: line.name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                status: ItemStatus::Pending,
            })
            .collect();
        let created = Order {
            id: self.next_id(CF_ORDERS)?,
            table_number: order.table_number,
            customer_name: order.customer_name,
            items,
            total_amount,
            status: OrderStatus::Pending,
            payment_method: order.payment_method,
            created_at: now,
            updated_at: now,
        };
        self.put_json(CF_ORDERS, &created.id.to_be_bytes(), &created)?;
        Ok(created)
    }

    async fn get(&self, id: u64) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, &id.to_be_bytes())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS, IteratorMode::End)
    }

    async fn update(&self, order: Order) -> Result<()> {
        self.put_json(CF_ORDERS, &order.id.to_be_bytes(), &order)
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn create(&self, payment: NewPayment) -> Result<Payment> {
        let now = Utc::now();
        let created = Payment {
            id: self.next_id(CF_PAYMENTS)?,
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
        self.put_json(CF_PAYMENTS, &created.id.to_be_bytes(), &created)?;
        Ok(created)
    }

    async fn get(&self, id: u64) -> Result<Option<Payment>> {
        self.get_json(CF_PAYMENTS, &id.to_be_bytes())
    }

    async fn list(&self) -> Result<Vec<Payment>> {
        self.scan(CF_PAYMENTS, IteratorMode::End)
    }

    async fn update_if_status(&self, payment: Payment, expected: PaymentStatus) -> Result<bool> {
        let _guard = self.lock();
        let key = payment.id.to_be_bytes();
        match self.get_json::<Payment>(CF_PAYMENTS, &key)? {
            Some(stored) if stored.status == expected => {
                self.put_json(CF_PAYMENTS, &key, &payment)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AuditLog for RocksDbStore {
    async fn record(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        let recorded = AuditEntry {
            id: self.next_id(CF_AUDIT)?,
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
        self.put_json(CF_AUDIT, &recorded.id.to_be_bytes(), &recorded)?;
        Ok(recorded)
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>> {
        self.scan(CF_AUDIT, IteratorMode::Start)
    }
}

#[async_trait]
impl SalesStatStore for RocksDbStore {
    async fn apply(&self, date: &str, event: SalesEvent) -> Result<SalesStat> {
        let _guard = self.lock();
        let mut stat = self
            .get_json(CF_SALES, date.as_bytes())?
            .unwrap_or_else(|| SalesStat::empty(date));
        stat.apply(event);
        self.put_json(CF_SALES, date.as_bytes(), &stat)?;
        Ok(stat)
    }

    async fn get(&self, date: &str) -> Result<Option<SalesStat>> {
        self.get_json(CF_SALES, date.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::order::{OrderPaymentMethod, PricedItem};
    use crate::domain::user::UserStatus;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn order_with(lines: u64) -> NewOrder {
        NewOrder {
            table_number: 3,
            customer_name: "Sari".into(),
            items: (1..=lines)
                .map(|menu_id| PricedItem {
                    menu_id,
                    name: format!("Menu {menu_id}"),
                    quantity: 1,
                    unit_price: Money::new(dec!(12000)).unwrap(),
                })
                .collect(),
            payment_method: OrderPaymentMethod::Manual,
        }
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("Failed to open RocksDB");
        for name in ALL_CFS {
            assert!(store.db.cf_handle(name).is_some(), "{name} missing");
        }
    }

    #[tokio::test]
    async fn test_rocksdb_user_store() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let new_user = |email: &str, role: Role| NewUser {
            name: "Owner".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role,
            status: UserStatus::Active,
        };

        let UserInsert::Created(user) = store
            .create_unique(new_user("owner@resto.id", Role::Owner), true)
            .await
            .unwrap()
        else {
            panic!("first owner should be created");
        };
        assert_eq!(user.id, 1);
        assert!(store.owner_exists().await.unwrap());
        assert_eq!(
            store
                .create_unique(new_user("second@resto.id", Role::Owner), true)
                .await
                .unwrap(),
            UserInsert::OwnerExists
        );
        assert_eq!(
            store
                .create_unique(new_user("owner@resto.id", Role::Staff), false)
                .await
                .unwrap(),
            UserInsert::EmailTaken
        );
        assert_eq!(
            store.find_by_email("owner@resto.id").await.unwrap().unwrap().id,
            1
        );
        assert!(UserStore::delete(&store, 1).await.unwrap());
        assert!(!UserStore::delete(&store, 1).await.unwrap());
        assert!(UserStore::get(&store, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_orders_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            let first = OrderStore::create(&store, order_with(2)).await.unwrap();
            let second = OrderStore::create(&store, order_with(3)).await.unwrap();
            let ids: Vec<u64> = first
                .items
                .iter()
                .chain(second.items.iter())
                .map(|it| it.id)
                .collect();
            assert_eq!(ids, vec![1, 2, 3, 4, 5]);
            assert_eq!(second.total_amount, Money::new(dec!(36000)).unwrap());
        }

        let store = RocksDbStore::open(dir.path()).unwrap();
        let orders = OrderStore::list(&store).await.unwrap();
        assert_eq!(orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(store.find_by_item(4).await.unwrap().unwrap().id, 2);

        let third = OrderStore::create(&store, order_with(1)).await.unwrap();
        assert_eq!(third.id, 3);
        assert_eq!(third.items[0].id, 6);
    }

    #[tokio::test]
    async fn test_rocksdb_sales_counters() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        store.apply("2026-10-19", SalesEvent::OrderCreated).await.unwrap();
        let stat = store
            .apply(
                "2026-10-19",
                SalesEvent::PaymentPaid(Money::new(dec!(50000)).unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(stat.total_orders, 1);
        assert_eq!(
            SalesStatStore::get(&store, "2026-10-19").await.unwrap(),
            Some(stat)
        );
        assert!(SalesStatStore::get(&store, "2026-10-18").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_payment_write_is_conditional() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        let payment = PaymentStore::create(
            &store,
            NewPayment::for_method(
                1,
                Money::new(dec!(10000)).unwrap(),
                crate::domain::payment::PaymentMethod::Manual,
            ),
        )
        .await
        .unwrap();

        let mut paid = payment.clone();
        paid.status = PaymentStatus::Paid;
        assert!(store.update_if_status(paid.clone(), PaymentStatus::Pending).await.unwrap());
        assert!(!store.update_if_status(paid, PaymentStatus::Pending).await.unwrap());
        let stored = PaymentStore::get(&store, payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Paid);
    }
}
