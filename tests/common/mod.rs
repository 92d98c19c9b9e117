#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use marketplace_orders::{
    config::FulfillmentConfig,
    db::run_migrations,
    dto::orders::{CheckoutItem, CheckoutRequest, OrderDetail},
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        payments::{Column as PaymentCol, Entity as Payments},
        products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentMethod, PaymentStatus, Role},
    notify::InMemoryNotifier,
    services::{checkout_service, order_service},
    state::AppState,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use tempfile::TempDir;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub state: AppState,
    pub notifier: InMemoryNotifier,
    // Keeps the database file alive for file-backed setups.
    _dir: Option<TempDir>,
}

/// Fresh in-memory database with the schema applied.
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub async fn setup() -> anyhow::Result<TestApp> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    build(options, None).await
}

/// File-backed database behind a pool of `connections`, so transactions on
/// different connections really overlap.
pub async fn setup_pooled(connections: u32) -> anyhow::Result<TestApp> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("orders.db").display());
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(connections)
        .min_connections(connections)
        .sqlx_logging(false);
    build(options, Some(dir)).await
}

async fn build(options: ConnectOptions, dir: Option<TempDir>) -> anyhow::Result<TestApp> {
    let orm = Database::connect(options).await?;
    run_migrations(&orm).await?;

    let notifier = InMemoryNotifier::new();
    let state = AppState::new(
        orm,
        Arc::new(notifier.clone()),
        FulfillmentConfig::default(),
        JWT_SECRET,
    );
    Ok(TestApp {
        state,
        notifier,
        _dir: dir,
    })
}

impl TestApp {
    pub async fn create_user(&self, role: Role) -> anyhow::Result<AuthUser> {
        let id = Uuid::new_v4();
        UserActive {
            id: Set(id),
            email: Set(format!("{id}@example.com")),
            full_name: Set(format!("{role} {id}")),
            role: Set(role.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.state.orm)
        .await?;
        Ok(AuthUser::new(id, role))
    }

    pub async fn create_product(&self, owner: &AuthUser, price: i64) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        ProductActive {
            id: Set(id),
            seller_id: Set(owner.user_id),
            name: Set(format!("product {id}")),
            price: Set(price),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.state.orm)
        .await?;
        Ok(id)
    }

    pub async fn checkout(
        &self,
        buyer: &AuthUser,
        method: PaymentMethod,
        items: Vec<CheckoutItem>,
    ) -> marketplace_orders::error::AppResult<Vec<OrderDetail>> {
        let request = CheckoutRequest {
            shipping_address: "12 Market Street".into(),
            payment_method: method,
            note: Some("leave at the door".into()),
            items,
        };
        let resp = checkout_service::checkout(&self.state, buyer, request).await?;
        Ok(resp.data.map(|data| data.orders).unwrap_or_default())
    }

    /// A buyer, a seller and one PENDING order between them.
    pub async fn pending_order(
        &self,
        method: PaymentMethod,
    ) -> anyhow::Result<(AuthUser, AuthUser, OrderDetail)> {
        let buyer = self.create_user(Role::Buyer).await?;
        let seller = self.create_user(Role::Seller).await?;
        let product = self.create_product(&seller, 120).await?;
        let mut orders = self
            .checkout(&buyer, method, vec![item(product, 2, 100)])
            .await?;
        let order = orders.pop().expect("one order");
        Ok((buyer, seller, order))
    }

    /// Same as [`pending_order`] but already confirmed and shipped.
    pub async fn shipped_order(
        &self,
        method: PaymentMethod,
    ) -> anyhow::Result<(AuthUser, AuthUser, OrderDetail)> {
        let (buyer, seller, order) = self.pending_order(method).await?;
        order_service::confirm_order(&self.state, &seller, order.order.id).await?;
        order_service::ship_order(&self.state, &seller, order.order.id).await?;
        Ok((buyer, seller, order))
    }

    pub async fn backdate_shipment(&self, order_id: Uuid, by: Duration) -> anyhow::Result<()> {
        let order = Orders::find_by_id(order_id)
            .one(&self.state.orm)
            .await?
            .expect("order exists");
        let mut active: OrderActive = order.into();
        active.shipped_at = Set(Some((Utc::now() - by).into()));
        active.update(&self.state.orm).await?;
        Ok(())
    }

    pub async fn order_status(&self, order_id: Uuid) -> anyhow::Result<OrderStatus> {
        let order = Orders::find_by_id(order_id)
            .one(&self.state.orm)
            .await?
            .expect("order exists");
        Ok(order.status.parse()?)
    }

    pub async fn payment_status(&self, order_id: Uuid) -> anyhow::Result<PaymentStatus> {
        let payment = Payments::find()
            .filter(PaymentCol::OrderId.eq(order_id))
            .one(&self.state.orm)
            .await?
            .expect("payment exists");
        Ok(payment.status.parse()?)
    }

    pub async fn order_count(&self) -> anyhow::Result<u64> {
        Ok(Orders::find().count(&self.state.orm).await?)
    }

    pub async fn payment_count(&self) -> anyhow::Result<u64> {
        Ok(Payments::find().count(&self.state.orm).await?)
    }

    pub async fn orders_of_seller(&self, seller: &AuthUser) -> anyhow::Result<u64> {
        Ok(Orders::find()
            .filter(OrderCol::SellerId.eq(seller.user_id))
            .count(&self.state.orm)
            .await?)
    }
}

pub fn item(product_id: Uuid, quantity: i32, price: i64) -> CheckoutItem {
    CheckoutItem {
        product_id,
        quantity,
        price,
    }
}
