use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, upsert::excluded};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::PgRepository;
use crate::{
    db::{CartRepository, RepoResult},
    domain::MAX_LINE_QUANTITY,
    models::{CartEntity, CartItemEntity, CreateCartEntity, CreateCartItemEntity},
    schema::{cart_items, carts},
};

diesel::define_sql_function! {
    /// Postgres `LEAST`, used to cap merged cart quantities.
    fn least(a: diesel::sql_types::Integer, b: diesel::sql_types::Integer) -> diesel::sql_types::Integer;
}

#[async_trait]
impl CartRepository for PgRepository {
    async fn find_cart(&self, user_id: Uuid) -> RepoResult<Option<CartEntity>> {
        let conn = &mut self.conn().await?;
        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(cart)
    }

    async fn get_or_create_cart(&self, user_id: Uuid) -> RepoResult<CartEntity> {
        let conn = &mut self.conn().await?;

        diesel::insert_into(carts::table)
            .values(CreateCartEntity { user_id })
            .on_conflict(carts::user_id)
            .do_nothing()
            .execute(conn)
            .await?;

        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartEntity::as_select())
            .first(conn)
            .await?;
        Ok(cart)
    }

    async fn list_cart_items(&self, cart_id: Uuid) -> RepoResult<Vec<CartItemEntity>> {
        let conn = &mut self.conn().await?;
        let items = cart_items::table
            .filter(cart_items::cart_id.eq(cart_id))
            .order_by(cart_items::created_at.asc())
            .select(CartItemEntity::as_select())
            .load(conn)
            .await?;
        Ok(items)
    }

    async fn add_cart_item(&self, item: CreateCartItemEntity) -> RepoResult<CartItemEntity> {
        let conn = &mut self.conn().await?;
        let item = diesel::insert_into(cart_items::table)
            .values(item)
            .on_conflict((cart_items::cart_id, cart_items::product_id))
            .do_update()
            .set((
                cart_items::quantity.eq(least(
                    cart_items::quantity + excluded(cart_items::quantity),
                    MAX_LINE_QUANTITY,
                )),
                cart_items::updated_at.eq(diesel::dsl::now),
            ))
            .returning(CartItemEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(item)
    }

    async fn update_cart_item_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> RepoResult<Option<CartItemEntity>> {
        let conn = &mut self.conn().await?;
        let item = diesel::update(
            cart_items::table
                .filter(cart_items::id.eq(item_id))
                .filter(cart_items::cart_id.eq(cart_id)),
        )
        .set((
            cart_items::quantity.eq(quantity),
            cart_items::updated_at.eq(diesel::dsl::now),
        ))
        .returning(CartItemEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?;
        Ok(item)
    }

    async fn remove_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let conn = &mut self.conn().await?;
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::id.eq(item_id))
                .filter(cart_items::cart_id.eq(cart_id)),
        )
        .execute(conn)
        .await?;
        Ok(deleted > 0)
    }

    async fn clear_cart(&self, cart_id: Uuid) -> RepoResult<usize> {
        let conn = &mut self.conn().await?;
        let deleted = diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id)))
            .execute(conn)
            .await?;
        Ok(deleted)
    }
}
