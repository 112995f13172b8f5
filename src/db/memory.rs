//! In-process repository.
//!
//! Used by the test-suite and by development runs without `DATABASE_URL`.
//! One lock guards all tables, so every trait method is atomic with respect
//! to the others.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    CartRepository, CatalogRepository, CouponRepository, OrderFilter, OrderRepository,
    PaymentRepository, RepoResult, RepositoryError, UserRepository,
};
use crate::{
    domain::{MAX_LINE_QUANTITY, StockAction},
    models::{
        CartEntity, CartItemEntity, CouponEntity, CouponUsageEntity, CreateCartItemEntity,
        CreateCouponUsageEntity, CreateOrderEntity, CreatePaymentEntity, CreateUserEntity,
        NewOrderItem, OrderEntity, OrderItemEntity, PaymentEntity, ProductEntity,
        UpdateOrderEntity, UserEntity,
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<UserEntity>,
    products: Vec<ProductEntity>,
    carts: Vec<CartEntity>,
    cart_items: Vec<CartItemEntity>,
    orders: Vec<OrderEntity>,
    order_items: Vec<OrderItemEntity>,
    payments: Vec<PaymentEntity>,
    coupons: Vec<CouponEntity>,
    coupon_usage: Vec<CouponUsageEntity>,
}

#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    reject_payments: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a catalogue product. Product management lives outside this
    /// service, so this is the only way products enter the memory store.
    pub async fn seed_product(
        &self,
        seller_id: Option<Uuid>,
        name: &str,
        price: f64,
        stock_quantity: i32,
    ) -> ProductEntity {
        let now = Utc::now();
        let product = ProductEntity {
            id: Uuid::new_v4(),
            seller_id,
            name: name.to_string(),
            price,
            stock_quantity,
            featured_image: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.products.push(product.clone());
        product
    }

    pub async fn seed_coupon(&self, coupon: CouponEntity) {
        self.tables.lock().await.coupons.push(coupon);
    }

    /// Makes every subsequent `insert_payment` fail.
    pub fn reject_payment_inserts(&self, reject: bool) {
        self.reject_payments.store(reject, Ordering::SeqCst);
    }

    pub async fn payments(&self) -> Vec<PaymentEntity> {
        self.tables.lock().await.payments.clone()
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<UserEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_phone(&self, phone: &str) -> RepoResult<Option<UserEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.phone == phone).cloned())
    }

    async fn create_user(&self, user: CreateUserEntity) -> RepoResult<UserEntity> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .iter()
            .any(|u| u.email == user.email || u.phone == user.phone)
        {
            return Err(RepositoryError::Conflict(
                "duplicate key value violates unique constraint on users".to_string(),
            ));
        }

        let now = Utc::now();
        let user = UserEntity {
            id: Uuid::new_v4(),
            email: user.email,
            phone: user.phone,
            full_name: user.full_name,
            role: user.role,
            business_name: user.business_name,
            gst_number: user.gst_number,
            business_address: user.business_address,
            business_license: user.business_license,
            company_name: user.company_name,
            reseller_type: user.reseller_type,
            tax_id: user.tax_id,
            is_verified: user.is_verified,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CatalogRepository for MemoryRepository {
    async fn find_product(&self, id: Uuid) -> RepoResult<Option<ProductEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_products(&self, ids: &[Uuid]) -> RepoResult<Vec<ProductEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_seller_products(&self, seller_id: Uuid) -> RepoResult<Vec<ProductEntity>> {
        let tables = self.tables.lock().await;
        let mut products: Vec<ProductEntity> = tables
            .products
            .iter()
            .filter(|p| p.seller_id == Some(seller_id))
            .cloned()
            .collect();
        products.sort_by_key(|p| p.stock_quantity);
        Ok(products)
    }

    async fn adjust_stock(
        &self,
        id: Uuid,
        action: StockAction,
        quantity: i32,
    ) -> RepoResult<Option<(i32, ProductEntity)>> {
        let mut tables = self.tables.lock().await;
        let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        let previous = product.stock_quantity;
        product.stock_quantity = action.apply(previous, quantity);
        product.updated_at = Utc::now();
        Ok(Some((previous, product.clone())))
    }
}

#[async_trait]
impl CartRepository for MemoryRepository {
    async fn find_cart(&self, user_id: Uuid) -> RepoResult<Option<CartEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables.carts.iter().find(|c| c.user_id == user_id).cloned())
    }

    async fn get_or_create_cart(&self, user_id: Uuid) -> RepoResult<CartEntity> {
        let mut tables = self.tables.lock().await;
        if let Some(cart) = tables.carts.iter().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }

        let now = Utc::now();
        let cart = CartEntity {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            updated_at: now,
        };
        tables.carts.push(cart.clone());
        Ok(cart)
    }

    async fn list_cart_items(&self, cart_id: Uuid) -> RepoResult<Vec<CartItemEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn add_cart_item(&self, item: CreateCartItemEntity) -> RepoResult<CartItemEntity> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        if let Some(existing) = tables
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == item.cart_id && i.product_id == item.product_id)
        {
            existing.quantity = existing
                .quantity
                .saturating_add(item.quantity)
                .min(MAX_LINE_QUANTITY);
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let item = CartItemEntity {
            id: Uuid::new_v4(),
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            lens_type: item.lens_type,
            lens_prescription: item.lens_prescription,
            lens_coating: item.lens_coating,
            lens_price: item.lens_price,
            created_at: now,
            updated_at: now,
        };
        tables.cart_items.push(item.clone());
        Ok(item)
    }

    async fn update_cart_item_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> RepoResult<Option<CartItemEntity>> {
        let mut tables = self.tables.lock().await;
        let item = tables
            .cart_items
            .iter_mut()
            .find(|i| i.id == item_id && i.cart_id == cart_id)
            .map(|item| {
                item.quantity = quantity;
                item.updated_at = Utc::now();
                item.clone()
            });
        Ok(item)
    }

    async fn remove_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.cart_items.len();
        tables
            .cart_items
            .retain(|i| !(i.id == item_id && i.cart_id == cart_id));
        Ok(tables.cart_items.len() < before)
    }

    async fn clear_cart(&self, cart_id: Uuid) -> RepoResult<usize> {
        let mut tables = self.tables.lock().await;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|i| i.cart_id != cart_id);
        Ok(before - tables.cart_items.len())
    }
}

#[async_trait]
impl OrderRepository for MemoryRepository {
    async fn create_order(
        &self,
        order: CreateOrderEntity,
        items: Vec<NewOrderItem>,
    ) -> RepoResult<(OrderEntity, Vec<OrderItemEntity>)> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let order = OrderEntity {
            id: Uuid::new_v4(),
            order_number: order.order_number,
            user_id: order.user_id,
            order_source: order.order_source,
            status: order.status,
            payment_status: order.payment_status,
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            shipping_amount: order.shipping_amount,
            discount_amount: order.discount_amount,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address,
            tracking_number: None,
            admin_notes: None,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<OrderItemEntity> = items
            .into_iter()
            .map(|item| {
                let item = item.into_entity(order.id);
                OrderItemEntity {
                    id: Uuid::new_v4(),
                    order_id: item.order_id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    product_image: item.product_image,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                    lens_prescription: item.lens_prescription,
                    created_at: now,
                }
            })
            .collect();

        tables.orders.push(order.clone());
        tables.order_items.extend(items.iter().cloned());
        Ok((order, items))
    }

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<OrderEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_order_items(&self, order_ids: &[Uuid]) -> RepoResult<Vec<OrderItemEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .order_items
            .iter()
            .filter(|i| order_ids.contains(&i.order_id))
            .cloned()
            .collect())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<OrderEntity>> {
        let tables = self.tables.lock().await;
        // latest insert wins ties on created_at
        let mut orders: Vec<OrderEntity> = tables
            .orders
            .iter()
            .rev()
            .filter(|o| filter.status.is_none_or(|s| o.status == s.as_str()))
            .filter(|o| filter.source.is_none_or(|s| o.order_source == s.as_str()))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_order(
        &self,
        id: Uuid,
        changes: UpdateOrderEntity,
    ) -> RepoResult<Option<OrderEntity>> {
        let mut tables = self.tables.lock().await;
        let Some(order) = tables.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };

        if let Some(status) = changes.status {
            order.status = status;
        }
        if let Some(payment_status) = changes.payment_status {
            order.payment_status = payment_status;
        }
        if changes.tracking_number.is_some() {
            order.tracking_number = changes.tracking_number;
        }
        if changes.admin_notes.is_some() {
            order.admin_notes = changes.admin_notes;
        }
        if changes.shipped_at.is_some() {
            order.shipped_at = changes.shipped_at;
        }
        if changes.delivered_at.is_some() {
            order.delivered_at = changes.delivered_at;
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}

#[async_trait]
impl PaymentRepository for MemoryRepository {
    async fn insert_payment(&self, payment: CreatePaymentEntity) -> RepoResult<PaymentEntity> {
        if self.reject_payments.load(Ordering::SeqCst) {
            return Err(RepositoryError::Other(
                "payments table rejected the insert".to_string(),
            ));
        }

        let payment = PaymentEntity {
            id: Uuid::new_v4(),
            order_id: payment.order_id,
            user_id: payment.user_id,
            amount: payment.amount,
            currency: payment.currency,
            payment_method: payment.payment_method,
            payment_gateway: payment.payment_gateway,
            transaction_id: payment.transaction_id,
            gateway_payment_id: payment.gateway_payment_id,
            gateway_order_id: payment.gateway_order_id,
            status: payment.status,
            completed_at: payment.completed_at,
            created_at: Utc::now(),
        };
        self.tables.lock().await.payments.push(payment.clone());
        Ok(payment)
    }
}

#[async_trait]
impl CouponRepository for MemoryRepository {
    async fn find_coupon(&self, id: Uuid) -> RepoResult<Option<CouponEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables.coupons.iter().find(|c| c.id == id).cloned())
    }

    async fn find_coupon_by_code(&self, code: &str) -> RepoResult<Option<CouponEntity>> {
        let tables = self.tables.lock().await;
        Ok(tables.coupons.iter().find(|c| c.code == code).cloned())
    }

    async fn count_coupon_usage(&self, coupon_id: Uuid, user_id: Uuid) -> RepoResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .coupon_usage
            .iter()
            .filter(|u| u.coupon_id == coupon_id && u.user_id == user_id)
            .count();
        Ok(count as i64)
    }

    async fn record_coupon_usage(
        &self,
        usage: CreateCouponUsageEntity,
    ) -> RepoResult<CouponUsageEntity> {
        let usage = CouponUsageEntity {
            id: Uuid::new_v4(),
            coupon_id: usage.coupon_id,
            user_id: usage.user_id,
            order_id: usage.order_id,
            discount_amount: usage.discount_amount,
            created_at: Utc::now(),
        };
        self.tables.lock().await.coupon_usage.push(usage.clone());
        Ok(usage)
    }

    async fn increment_coupon_usage(&self, coupon_id: Uuid) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(coupon) = tables.coupons.iter_mut().find(|c| c.id == coupon_id) {
            coupon.usage_count += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart_item(cart_id: Uuid, product_id: Uuid, quantity: i32) -> CreateCartItemEntity {
        CreateCartItemEntity {
            cart_id,
            product_id,
            quantity,
            price: 1499.0,
            lens_type: None,
            lens_prescription: None,
            lens_coating: None,
            lens_price: 0.0,
        }
    }

    #[tokio::test]
    async fn same_product_merges_into_one_row() {
        let repo = MemoryRepository::new();
        let product = repo.seed_product(None, "Aviator", 1499.0, 10).await;
        let cart = repo.get_or_create_cart(Uuid::new_v4()).await.unwrap();

        repo.add_cart_item(cart_item(cart.id, product.id, 2))
            .await
            .unwrap();
        let merged = repo
            .add_cart_item(cart_item(cart.id, product.id, 3))
            .await
            .unwrap();

        assert_eq!(merged.quantity, 5);
        assert_eq!(repo.list_cart_items(cart.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn merged_quantity_is_capped() {
        let repo = MemoryRepository::new();
        let product = repo.seed_product(None, "Aviator", 1499.0, 10).await;
        let cart = repo.get_or_create_cart(Uuid::new_v4()).await.unwrap();

        for _ in 0..2 {
            repo.add_cart_item(cart_item(cart.id, product.id, i32::MAX))
                .await
                .unwrap();
        }
        let items = repo.list_cart_items(cart.id).await.unwrap();
        assert_eq!(items[0].quantity, MAX_LINE_QUANTITY);
    }

    #[tokio::test]
    async fn one_cart_per_user() {
        let repo = MemoryRepository::new();
        let user_id = Uuid::new_v4();
        let first = repo.get_or_create_cart(user_id).await.unwrap();
        let second = repo.get_or_create_cart(user_id).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn cart_item_updates_are_scoped_to_the_cart() {
        let repo = MemoryRepository::new();
        let product = repo.seed_product(None, "Wayfarer", 999.0, 10).await;
        let mine = repo.get_or_create_cart(Uuid::new_v4()).await.unwrap();
        let theirs = repo.get_or_create_cart(Uuid::new_v4()).await.unwrap();
        let item = repo
            .add_cart_item(cart_item(theirs.id, product.id, 1))
            .await
            .unwrap();

        assert!(
            repo.update_cart_item_quantity(mine.id, item.id, 4)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!repo.remove_cart_item(mine.id, item.id).await.unwrap());
        assert!(repo.remove_cart_item(theirs.id, item.id).await.unwrap());
    }

    #[tokio::test]
    async fn subtract_never_goes_negative() {
        let repo = MemoryRepository::new();
        let product = repo.seed_product(None, "Round", 799.0, 3).await;

        let (previous, updated) = repo
            .adjust_stock(product.id, StockAction::Subtract, 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous, 3);
        assert_eq!(updated.stock_quantity, 0);
    }

    #[tokio::test]
    async fn duplicate_phone_is_a_conflict() {
        let repo = MemoryRepository::new();
        let user = CreateUserEntity {
            email: "a@example.com".into(),
            phone: "9876543210".into(),
            full_name: "A B".into(),
            role: "customer".into(),
            business_name: None,
            gst_number: None,
            business_address: None,
            business_license: None,
            company_name: None,
            reseller_type: None,
            tax_id: None,
            is_verified: true,
        };
        repo.create_user(user.clone()).await.unwrap();

        let err = repo
            .create_user(CreateUserEntity {
                email: "b@example.com".into(),
                ..user
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
