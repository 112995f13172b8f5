use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use super::PgRepository;
use crate::{
    db::{OrderFilter, OrderRepository, PaymentRepository, RepoResult, RepositoryError},
    models::{
        CreateOrderEntity, CreateOrderItemEntity, CreatePaymentEntity, NewOrderItem, OrderEntity,
        OrderItemEntity, PaymentEntity, UpdateOrderEntity,
    },
    schema::{order_items, orders, payments},
};

#[async_trait]
impl OrderRepository for PgRepository {
    async fn create_order(
        &self,
        order: CreateOrderEntity,
        items: Vec<NewOrderItem>,
    ) -> RepoResult<(OrderEntity, Vec<OrderItemEntity>)> {
        let conn = &mut self.conn().await?;
        conn.transaction::<_, RepositoryError, _>(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(order)
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let items: Vec<CreateOrderItemEntity> = items
                    .into_iter()
                    .map(|item| item.into_entity(order.id))
                    .collect();

                let items = diesel::insert_into(order_items::table)
                    .values(items)
                    .returning(OrderItemEntity::as_returning())
                    .get_results(conn)
                    .await?;

                Ok((order, items))
            })
        })
        .await
    }

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let order = orders::table
            .find(id)
            .select(OrderEntity::as_select())
            .get_result(conn)
            .await
            .optional()?;
        Ok(order)
    }

    async fn list_order_items(&self, order_ids: &[Uuid]) -> RepoResult<Vec<OrderItemEntity>> {
        let conn = &mut self.conn().await?;
        let items = order_items::table
            .filter(order_items::order_id.eq_any(order_ids))
            .order_by(order_items::created_at.asc())
            .select(OrderItemEntity::as_select())
            .load(conn)
            .await?;
        Ok(items)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<OrderEntity>> {
        let conn = &mut self.conn().await?;

        let mut query = orders::table
            .select(OrderEntity::as_select())
            .order_by(orders::created_at.desc())
            .into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(orders::status.eq(status.as_str()));
        }
        if let Some(source) = filter.source {
            query = query.filter(orders::order_source.eq(source.as_str()));
        }

        let orders = query.load(conn).await?;
        Ok(orders)
    }

    async fn update_order(
        &self,
        id: Uuid,
        changes: UpdateOrderEntity,
    ) -> RepoResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let order = diesel::update(orders::table.find(id))
            .set((changes, orders::updated_at.eq(diesel::dsl::now)))
            .returning(OrderEntity::as_returning())
            .get_result(conn)
            .await
            .optional()?;
        Ok(order)
    }
}

#[async_trait]
impl PaymentRepository for PgRepository {
    async fn insert_payment(&self, payment: CreatePaymentEntity) -> RepoResult<PaymentEntity> {
        let conn = &mut self.conn().await?;
        let payment = diesel::insert_into(payments::table)
            .values(payment)
            .returning(PaymentEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(payment)
    }
}
