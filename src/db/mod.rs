//! Storage seam.
//!
//! Handlers talk to the database only through the repository traits below.
//! [`pg::PgRepository`] is the production implementation (diesel-async over a
//! bb8 pool); [`memory::MemoryRepository`] keeps everything in process and
//! backs the test-suite and credential-less local runs.
//!
//! Counters that used to be read-modify-write (stock, coupon usage) are
//! exposed as single operations so each backend can make them atomic.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    domain::{OrderSource, OrderStatus, StockAction},
    models::{
        CartEntity, CartItemEntity, CouponEntity, CouponUsageEntity, CreateCartItemEntity,
        CreateCouponUsageEntity, CreateOrderEntity, CreatePaymentEntity, CreateUserEntity,
        NewOrderItem, OrderEntity, OrderItemEntity, PaymentEntity, ProductEntity,
        UpdateOrderEntity, UserEntity,
    },
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The database could not be reached (pool exhausted, connection refused or dropped).
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Query(DieselError),

    #[error("{0}")]
    Other(String),
}

impl RepositoryError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}

impl From<DieselError> for RepositoryError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                RepositoryError::Unavailable(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                RepositoryError::Conflict(info.message().to_string())
            }
            other => RepositoryError::Query(other),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Filters for the seller order listing. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub source: Option<OrderSource>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<UserEntity>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserEntity>>;
    async fn find_user_by_phone(&self, phone: &str) -> RepoResult<Option<UserEntity>>;
    async fn create_user(&self, user: CreateUserEntity) -> RepoResult<UserEntity>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_product(&self, id: Uuid) -> RepoResult<Option<ProductEntity>>;
    async fn find_products(&self, ids: &[Uuid]) -> RepoResult<Vec<ProductEntity>>;

    /// Products owned by `seller_id`, lowest stock first.
    async fn list_seller_products(&self, seller_id: Uuid) -> RepoResult<Vec<ProductEntity>>;

    /// Applies `action` to the product's stock as one atomic step and returns
    /// the previous quantity together with the updated product.
    async fn adjust_stock(
        &self,
        id: Uuid,
        action: StockAction,
        quantity: i32,
    ) -> RepoResult<Option<(i32, ProductEntity)>>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_cart(&self, user_id: Uuid) -> RepoResult<Option<CartEntity>>;

    /// Returns the user's cart, creating it on first use. A user owns at most one cart.
    async fn get_or_create_cart(&self, user_id: Uuid) -> RepoResult<CartEntity>;

    async fn list_cart_items(&self, cart_id: Uuid) -> RepoResult<Vec<CartItemEntity>>;

    /// Inserts the item, or adds its quantity to the existing row for the same
    /// `(cart, product)` pair, capped at [`MAX_LINE_QUANTITY`].
    ///
    /// [`MAX_LINE_QUANTITY`]: crate::domain::MAX_LINE_QUANTITY
    async fn add_cart_item(&self, item: CreateCartItemEntity) -> RepoResult<CartItemEntity>;

    async fn update_cart_item_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> RepoResult<Option<CartItemEntity>>;

    async fn remove_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> RepoResult<bool>;

    async fn clear_cart(&self, cart_id: Uuid) -> RepoResult<usize>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order and its items; either both land or neither does.
    async fn create_order(
        &self,
        order: CreateOrderEntity,
        items: Vec<NewOrderItem>,
    ) -> RepoResult<(OrderEntity, Vec<OrderItemEntity>)>;

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<OrderEntity>>;

    async fn list_order_items(&self, order_ids: &[Uuid]) -> RepoResult<Vec<OrderItemEntity>>;

    /// Orders matching `filter`, newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<OrderEntity>>;

    async fn update_order(
        &self,
        id: Uuid,
        changes: UpdateOrderEntity,
    ) -> RepoResult<Option<OrderEntity>>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert_payment(&self, payment: CreatePaymentEntity) -> RepoResult<PaymentEntity>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn find_coupon(&self, id: Uuid) -> RepoResult<Option<CouponEntity>>;
    async fn find_coupon_by_code(&self, code: &str) -> RepoResult<Option<CouponEntity>>;
    async fn count_coupon_usage(&self, coupon_id: Uuid, user_id: Uuid) -> RepoResult<i64>;
    async fn record_coupon_usage(
        &self,
        usage: CreateCouponUsageEntity,
    ) -> RepoResult<CouponUsageEntity>;

    /// Increments `usage_count` in place.
    async fn increment_coupon_usage(&self, coupon_id: Uuid) -> RepoResult<()>;
}

/// Everything the HTTP layer needs from storage.
pub trait Repository:
    UserRepository
    + CatalogRepository
    + CartRepository
    + OrderRepository
    + PaymentRepository
    + CouponRepository
{
}

impl<T> Repository for T where
    T: UserRepository
        + CatalogRepository
        + CartRepository
        + OrderRepository
        + PaymentRepository
        + CouponRepository
{
}
