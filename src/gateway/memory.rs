//! In-process gateway with the same observable behavior as the PostgreSQL
//! one: joined customer names, natural ordering, foreign-key checks and
//! atomic order saves.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{AccountStore, Gateway, GatewayError, GatewayResult, OrderStore, Table};
use crate::models::account::{Account, Profile};
use crate::models::call::Call;
use crate::models::customer::Customer;
use crate::models::order::{Order, OrderPlan};
use crate::models::payment::Payment;
use crate::models::product::Product;
use crate::models::purchase::Purchase;
use crate::resource::Resource;

#[derive(Debug, Clone, Default)]
struct MemoryData {
    last_id: i64,
    customers: BTreeMap<i64, Customer>,
    calls: BTreeMap<i64, Call>,
    purchases: BTreeMap<i64, Purchase>,
    payments: BTreeMap<i64, Payment>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    accounts: BTreeMap<i64, Account>,
    profiles: BTreeMap<i64, Profile>,
}

impl MemoryData {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn customer_name(&self, id: i64) -> Option<String> {
        self.customers.get(&id).map(|c| c.name.clone())
    }

    fn customer_referenced(&self, id: i64) -> bool {
        self.calls.values().any(|r| r.customer_id == id)
            || self.purchases.values().any(|r| r.customer_id == id)
            || self.payments.values().any(|r| r.customer_id == id)
            || self.orders.values().any(|r| r.customer_id == id)
    }

    fn joined_order(&self, order: &Order) -> Order {
        let mut order = order.clone();
        order.customer_name = self.customer_name(order.customer_id);
        for line in &mut order.lines {
            if let Some(product) = self.products.get(&line.product_id) {
                line.product_name = product.name.clone();
            }
        }
        order
    }
}

fn missing(column: &str) -> GatewayError {
    GatewayError::Rejected(format!("null value in column \"{column}\" violates not-null constraint"))
}

fn missing_customer(table: &str) -> GatewayError {
    GatewayError::Conflict(format!(
        "insert or update on table \"{table}\" violates foreign key constraint \"{table}_customer_id_fkey\""
    ))
}

/// How one entity is kept in [`MemoryData`].
trait MemoryRecord: Resource {
    const TABLE: &'static str;

    fn rows(data: &MemoryData) -> &BTreeMap<i64, Self>;
    fn rows_mut(data: &mut MemoryData) -> &mut BTreeMap<i64, Self>;

    fn create(id: i64, draft: &Self::Draft, now: DateTime<Utc>) -> GatewayResult<Self>;
    fn apply(&mut self, draft: &Self::Draft) -> GatewayResult<()>;

    fn customer_id(&self) -> Option<i64> {
        None
    }

    fn set_customer_name(&mut self, _name: Option<String>) {}

    /// Whether another table still points at this row.
    fn referenced(_id: i64, _data: &MemoryData) -> bool {
        false
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering;
}

impl MemoryRecord for Customer {
    const TABLE: &'static str = "customers";

    fn rows(data: &MemoryData) -> &BTreeMap<i64, Self> {
        &data.customers
    }

    fn rows_mut(data: &mut MemoryData) -> &mut BTreeMap<i64, Self> {
        &mut data.customers
    }

    fn create(id: i64, draft: &Self::Draft, now: DateTime<Utc>) -> GatewayResult<Self> {
        let mut row = Customer {
            id,
            name: String::new(),
            phone: None,
            email: None,
            address: None,
            city: None,
            created_at: now,
        };
        row.apply(draft)?;
        Ok(row)
    }

    fn apply(&mut self, draft: &Self::Draft) -> GatewayResult<()> {
        self.name = draft.name.trim().to_string();
        self.phone = draft.phone.clone();
        self.email = draft.email.clone();
        self.address = draft.address.clone();
        self.city = draft.city.clone();
        Ok(())
    }

    fn referenced(id: i64, data: &MemoryData) -> bool {
        data.customer_referenced(id)
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
    }
}

impl MemoryRecord for Call {
    const TABLE: &'static str = "calls";

    fn rows(data: &MemoryData) -> &BTreeMap<i64, Self> {
        &data.calls
    }

    fn rows_mut(data: &mut MemoryData) -> &mut BTreeMap<i64, Self> {
        &mut data.calls
    }

    fn create(id: i64, draft: &Self::Draft, _now: DateTime<Utc>) -> GatewayResult<Self> {
        Ok(Call {
            id,
            customer_id: draft.customer_id.ok_or_else(|| missing("customer_id"))?,
            customer_name: None,
            scheduled_at: draft.scheduled_at.ok_or_else(|| missing("scheduled_at"))?,
            reason: draft.reason.clone(),
            completed: draft.completed,
        })
    }

    fn apply(&mut self, draft: &Self::Draft) -> GatewayResult<()> {
        self.customer_id = draft.customer_id.ok_or_else(|| missing("customer_id"))?;
        self.scheduled_at = draft.scheduled_at.ok_or_else(|| missing("scheduled_at"))?;
        self.reason = draft.reason.clone();
        self.completed = draft.completed;
        Ok(())
    }

    fn customer_id(&self) -> Option<i64> {
        Some(self.customer_id)
    }

    fn set_customer_name(&mut self, name: Option<String>) {
        self.customer_name = name;
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.scheduled_at.cmp(&a.scheduled_at).then(b.id.cmp(&a.id))
    }
}

impl MemoryRecord for Purchase {
    const TABLE: &'static str = "purchases";

    fn rows(data: &MemoryData) -> &BTreeMap<i64, Self> {
        &data.purchases
    }

    fn rows_mut(data: &mut MemoryData) -> &mut BTreeMap<i64, Self> {
        &mut data.purchases
    }

    fn create(id: i64, draft: &Self::Draft, now: DateTime<Utc>) -> GatewayResult<Self> {
        Ok(Purchase {
            id,
            customer_id: draft.customer_id.ok_or_else(|| missing("customer_id"))?,
            customer_name: None,
            product: draft.product.trim().to_string(),
            quantity: draft.quantity,
            unit_price: draft.unit_price.ok_or_else(|| missing("unit_price"))?,
            purchased_at: now,
        })
    }

    fn apply(&mut self, draft: &Self::Draft) -> GatewayResult<()> {
        self.customer_id = draft.customer_id.ok_or_else(|| missing("customer_id"))?;
        self.product = draft.product.trim().to_string();
        self.quantity = draft.quantity;
        self.unit_price = draft.unit_price.ok_or_else(|| missing("unit_price"))?;
        Ok(())
    }

    fn customer_id(&self) -> Option<i64> {
        Some(self.customer_id)
    }

    fn set_customer_name(&mut self, name: Option<String>) {
        self.customer_name = name;
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.purchased_at.cmp(&a.purchased_at).then(b.id.cmp(&a.id))
    }
}

impl MemoryRecord for Payment {
    const TABLE: &'static str = "payments";

    fn rows(data: &MemoryData) -> &BTreeMap<i64, Self> {
        &data.payments
    }

    fn rows_mut(data: &mut MemoryData) -> &mut BTreeMap<i64, Self> {
        &mut data.payments
    }

    fn create(id: i64, draft: &Self::Draft, now: DateTime<Utc>) -> GatewayResult<Self> {
        Ok(Payment {
            id,
            customer_id: draft.customer_id.ok_or_else(|| missing("customer_id"))?,
            customer_name: None,
            amount: draft.amount.ok_or_else(|| missing("amount"))?,
            method: draft.method,
            paid_at: now,
        })
    }

    fn apply(&mut self, draft: &Self::Draft) -> GatewayResult<()> {
        self.customer_id = draft.customer_id.ok_or_else(|| missing("customer_id"))?;
        self.amount = draft.amount.ok_or_else(|| missing("amount"))?;
        self.method = draft.method;
        Ok(())
    }

    fn customer_id(&self) -> Option<i64> {
        Some(self.customer_id)
    }

    fn set_customer_name(&mut self, name: Option<String>) {
        self.customer_name = name;
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.paid_at.cmp(&a.paid_at).then(b.id.cmp(&a.id))
    }
}

impl MemoryRecord for Product {
    const TABLE: &'static str = "products";

    fn rows(data: &MemoryData) -> &BTreeMap<i64, Self> {
        &data.products
    }

    fn rows_mut(data: &mut MemoryData) -> &mut BTreeMap<i64, Self> {
        &mut data.products
    }

    fn create(id: i64, draft: &Self::Draft, now: DateTime<Utc>) -> GatewayResult<Self> {
        let mut row = Product {
            id,
            name: String::new(),
            description: None,
            price: 0.0,
            stock: 0,
            min_stock: 0,
            category: String::new(),
            created_at: now,
        };
        row.apply(draft)?;
        Ok(row)
    }

    fn apply(&mut self, draft: &Self::Draft) -> GatewayResult<()> {
        if draft.stock < 0 {
            return Err(GatewayError::Rejected(
                "new row for relation \"products\" violates check constraint \"products_stock_check\"".to_string(),
            ));
        }
        self.name = draft.name.trim().to_string();
        self.description = draft.description.clone();
        self.price = draft.price.ok_or_else(|| missing("price"))?;
        self.stock = draft.stock;
        self.min_stock = draft.min_stock;
        self.category = draft.category.trim().to_string();
        Ok(())
    }

    fn referenced(id: i64, data: &MemoryData) -> bool {
        data.orders.values().any(|o| o.lines.iter().any(|l| l.product_id == id))
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        a.name.cmp(&b.name).then(a.id.cmp(&b.id))
    }
}

/// Shared, cloneable in-memory store.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    data: Arc<Mutex<MemoryData>>,
    offline: Arc<AtomicBool>,
    operations: Arc<AtomicUsize>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with [`GatewayError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Number of operations attempted so far, failed ones included.
    pub fn operations(&self) -> usize {
        self.operations.load(AtomicOrdering::SeqCst)
    }

    fn begin(&self) -> GatewayResult<()> {
        self.operations.fetch_add(1, AtomicOrdering::SeqCst);
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(GatewayError::Unavailable("Gateway unreachable".to_string()));
        }
        Ok(())
    }
}

fn joined<R: MemoryRecord>(row: &R, data: &MemoryData) -> R {
    let mut row = row.clone();
    if let Some(customer_id) = row.customer_id() {
        row.set_customer_name(data.customer_name(customer_id));
    }
    row
}

fn check_customer<R: MemoryRecord>(row: &R, data: &MemoryData) -> GatewayResult<()> {
    match row.customer_id() {
        Some(id) if !data.customers.contains_key(&id) => Err(missing_customer(R::TABLE)),
        _ => Ok(()),
    }
}

#[async_trait]
impl<R: MemoryRecord> Table<R> for MemoryGateway {
    async fn list(&self) -> GatewayResult<Vec<R>> {
        self.begin()?;
        let data = self.data.lock().await;
        let mut rows: Vec<R> = R::rows(&data).values().map(|r| joined(r, &data)).collect();
        rows.sort_by(R::listing_order);
        Ok(rows)
    }

    async fn get(&self, id: i64) -> GatewayResult<Option<R>> {
        self.begin()?;
        let data = self.data.lock().await;
        Ok(R::rows(&data).get(&id).map(|r| joined(r, &data)))
    }

    async fn insert(&self, draft: &R::Draft) -> GatewayResult<R> {
        self.begin()?;
        let mut data = self.data.lock().await;
        let id = data.last_id + 1;
        let row = R::create(id, draft, Utc::now())?;
        check_customer(&row, &data)?;
        data.next_id();
        let saved = joined(&row, &data);
        R::rows_mut(&mut data).insert(id, row);
        Ok(saved)
    }

    async fn update(&self, id: i64, draft: &R::Draft) -> GatewayResult<Option<R>> {
        self.begin()?;
        let mut data = self.data.lock().await;
        let Some(mut row) = R::rows(&data).get(&id).cloned() else {
            return Ok(None);
        };
        row.apply(draft)?;
        check_customer(&row, &data)?;
        let saved = joined(&row, &data);
        R::rows_mut(&mut data).insert(id, row);
        Ok(Some(saved))
    }

    async fn delete(&self, id: i64) -> GatewayResult<bool> {
        self.begin()?;
        let mut data = self.data.lock().await;
        if !R::rows(&data).contains_key(&id) {
            return Ok(false);
        }
        if R::referenced(id, &data) {
            return Err(GatewayError::Conflict(format!(
                "update or delete on table \"{}\" violates foreign key constraint",
                R::TABLE
            )));
        }
        Ok(R::rows_mut(&mut data).remove(&id).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryGateway {
    async fn list_orders(&self) -> GatewayResult<Vec<Order>> {
        self.begin()?;
        let data = self.data.lock().await;
        let mut orders: Vec<Order> = data.orders.values().map(|o| data.joined_order(o)).collect();
        orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn get_order(&self, id: i64) -> GatewayResult<Option<Order>> {
        self.begin()?;
        let data = self.data.lock().await;
        Ok(data.orders.get(&id).map(|o| data.joined_order(o)))
    }

    async fn save_order(&self, plan: &OrderPlan) -> GatewayResult<Order> {
        self.begin()?;
        let mut data = self.data.lock().await;
        // Work on a copy and swap it in only when every step succeeded.
        let mut staged = data.clone();

        if !staged.customers.contains_key(&plan.customer_id) {
            return Err(missing_customer("orders"));
        }

        let (id, ordered_at) = match plan.id {
            Some(id) => {
                let previous = staged
                    .orders
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| GatewayError::NotFound("Order not found".to_string()))?;
                for line in &previous.lines {
                    if let Some(product) = staged.products.get_mut(&line.product_id) {
                        product.stock += line.quantity;
                    }
                }
                (id, previous.ordered_at)
            }
            None => (staged.next_id(), Utc::now()),
        };

        for line in &plan.lines {
            let product = staged.products.get_mut(&line.product_id).ok_or_else(|| {
                GatewayError::Conflict(
                    "insert or update on table \"order_lines\" violates foreign key constraint".to_string(),
                )
            })?;
            if product.stock < line.quantity {
                return Err(GatewayError::InsufficientStock { product: line.product_name.clone() });
            }
            product.stock -= line.quantity;
        }

        staged.orders.insert(
            id,
            Order {
                id,
                customer_id: plan.customer_id,
                customer_name: None,
                description: plan.description.clone(),
                status: plan.status,
                ordered_at,
                lines: plan.lines.clone(),
            },
        );

        *data = staged;
        let saved = data
            .orders
            .get(&id)
            .map(|o| data.joined_order(o))
            .ok_or_else(|| GatewayError::NotFound("Order not found".to_string()))?;
        Ok(saved)
    }

    async fn delete_order(&self, id: i64) -> GatewayResult<bool> {
        self.begin()?;
        let mut data = self.data.lock().await;
        Ok(data.orders.remove(&id).is_some())
    }
}

#[async_trait]
impl AccountStore for MemoryGateway {
    async fn find_account(&self, email: &str) -> GatewayResult<Option<Account>> {
        self.begin()?;
        let data = self.data.lock().await;
        Ok(data.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn create_account(&self, email: &str, password_hash: &str) -> GatewayResult<Account> {
        self.begin()?;
        let mut data = self.data.lock().await;
        if data.accounts.values().any(|a| a.email == email) {
            return Err(GatewayError::Conflict("Email already registered".to_string()));
        }
        let id = data.next_id();
        let account = Account {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        data.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn find_profile(&self, user_id: i64) -> GatewayResult<Option<Profile>> {
        self.begin()?;
        let data = self.data.lock().await;
        Ok(data.profiles.get(&user_id).cloned())
    }

    async fn create_profile(&self, user_id: i64, email: &str) -> GatewayResult<Profile> {
        self.begin()?;
        let mut data = self.data.lock().await;
        let profile = data
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile { id: user_id, email: email.to_string(), created_at: Utc::now() })
            .clone();
        Ok(profile)
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    fn customers(&self) -> &dyn Table<Customer> {
        self
    }

    fn calls(&self) -> &dyn Table<Call> {
        self
    }

    fn purchases(&self) -> &dyn Table<Purchase> {
        self
    }

    fn payments(&self) -> &dyn Table<Payment> {
        self
    }

    fn products(&self) -> &dyn Table<Product> {
        self
    }

    async fn health_check(&self) -> GatewayResult<()> {
        self.begin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::call::CallDraft;
    use crate::dtos::customer::CustomerDraft;
    use crate::dtos::product::ProductDraft;
    use crate::models::order::{OrderLine, OrderStatus};
    use chrono::NaiveDate;

    async fn customer(gw: &MemoryGateway, name: &str) -> Customer {
        gw.customers()
            .insert(&CustomerDraft { name: name.to_string(), ..Default::default() })
            .await
            .unwrap()
    }

    async fn product(gw: &MemoryGateway, name: &str, stock: i32) -> Product {
        gw.products()
            .insert(&ProductDraft {
                name: name.to_string(),
                price: Some(10.0),
                stock,
                category: "General".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn plan(customer_id: i64, product: &Product, quantity: i32) -> OrderPlan {
        OrderPlan {
            id: None,
            customer_id,
            description: None,
            status: OrderStatus::Pending,
            lines: vec![OrderLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity,
                unit_price: product.price,
            }],
        }
    }

    #[tokio::test]
    async fn calls_join_customer_name_and_sort_newest_first() {
        let gw = MemoryGateway::new();
        let ana = customer(&gw, "Ana").await;
        for day in [3, 9, 5] {
            gw.calls()
                .insert(&CallDraft {
                    customer_id: Some(ana.id),
                    scheduled_at: NaiveDate::from_ymd_opt(2024, 5, day).and_then(|d| d.and_hms_opt(10, 0, 0)),
                    reason: None,
                    completed: false,
                })
                .await
                .unwrap();
        }

        let calls = gw.calls().list().await.unwrap();
        let days: Vec<String> = calls.iter().map(|c| c.scheduled_at.format("%d").to_string()).collect();
        assert_eq!(days, vec!["09", "05", "03"]);
        assert!(calls.iter().all(|c| c.customer_name.as_deref() == Some("Ana")));
    }

    #[tokio::test]
    async fn insert_with_unknown_customer_is_a_conflict() {
        let gw = MemoryGateway::new();
        let err = gw
            .calls()
            .insert(&CallDraft {
                customer_id: Some(42),
                scheduled_at: NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(9, 0, 0)),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
        assert!(gw.calls().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn referenced_customer_cannot_be_deleted() {
        let gw = MemoryGateway::new();
        let ana = customer(&gw, "Ana").await;
        let yerba = product(&gw, "Yerba", 5).await;
        gw.save_order(&plan(ana.id, &yerba, 1)).await.unwrap();

        let err = gw.customers().delete(ana.id).await.unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
        assert!(gw.customers().get(ana.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_order_save_leaves_everything_untouched() {
        let gw = MemoryGateway::new();
        let ana = customer(&gw, "Ana").await;
        let yerba = product(&gw, "Yerba", 5).await;
        let azucar = product(&gw, "Azúcar", 1).await;

        let mut two_lines = plan(ana.id, &yerba, 3);
        two_lines.lines.push(OrderLine {
            product_id: azucar.id,
            product_name: azucar.name.clone(),
            quantity: 2,
            unit_price: azucar.price,
        });

        let err = gw.save_order(&two_lines).await.unwrap_err();
        assert_eq!(err, GatewayError::InsufficientStock { product: "Azúcar".to_string() });
        assert!(gw.list_orders().await.unwrap().is_empty());
        assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn editing_an_order_returns_previous_quantities_first() {
        let gw = MemoryGateway::new();
        let ana = customer(&gw, "Ana").await;
        let yerba = product(&gw, "Yerba", 10).await;

        let saved = gw.save_order(&plan(ana.id, &yerba, 4)).await.unwrap();
        assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 6);

        let mut edited = plan(ana.id, &yerba, 7);
        edited.id = Some(saved.id);
        gw.save_order(&edited).await.unwrap();
        assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn offline_gateway_reports_unavailable() {
        let gw = MemoryGateway::new();
        gw.set_offline(true);
        let err = Table::<Customer>::list(&gw).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
        assert_eq!(gw.operations(), 1);
    }
}
