use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use super::PgRepository;
use crate::{
    db::{CatalogRepository, RepoResult, RepositoryError},
    domain::StockAction,
    models::ProductEntity,
    schema::products,
};

#[async_trait]
impl CatalogRepository for PgRepository {
    async fn find_product(&self, id: Uuid) -> RepoResult<Option<ProductEntity>> {
        let conn = &mut self.conn().await?;
        let product = products::table
            .find(id)
            .select(ProductEntity::as_select())
            .get_result(conn)
            .await
            .optional()?;
        Ok(product)
    }

    async fn find_products(&self, ids: &[Uuid]) -> RepoResult<Vec<ProductEntity>> {
        let conn = &mut self.conn().await?;
        let products = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductEntity::as_select())
            .load(conn)
            .await?;
        Ok(products)
    }

    async fn list_seller_products(&self, seller_id: Uuid) -> RepoResult<Vec<ProductEntity>> {
        let conn = &mut self.conn().await?;
        let products = products::table
            .filter(products::seller_id.eq(seller_id))
            .order_by(products::stock_quantity.asc())
            .select(ProductEntity::as_select())
            .load(conn)
            .await?;
        Ok(products)
    }

    async fn adjust_stock(
        &self,
        id: Uuid,
        action: StockAction,
        quantity: i32,
    ) -> RepoResult<Option<(i32, ProductEntity)>> {
        let conn = &mut self.conn().await?;
        conn.transaction::<_, RepositoryError, _>(move |conn| {
            Box::pin(async move {
                // row lock keeps concurrent adjustments from losing updates
                let current: Option<i32> = products::table
                    .find(id)
                    .select(products::stock_quantity)
                    .for_update()
                    .get_result(conn)
                    .await
                    .optional()?;

                let Some(current) = current else {
                    return Ok(None);
                };

                let product = diesel::update(products::table.find(id))
                    .set((
                        products::stock_quantity.eq(action.apply(current, quantity)),
                        products::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(ProductEntity::as_returning())
                    .get_result(conn)
                    .await?;

                Ok(Some((current, product)))
            })
        })
        .await
    }
}
