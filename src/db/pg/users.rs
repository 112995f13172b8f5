use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::PgRepository;
use crate::{
    db::{RepoResult, UserRepository},
    models::{CreateUserEntity, UserEntity},
    schema::users,
};

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<UserEntity>> {
        let conn = &mut self.conn().await?;
        let user = users::table
            .find(id)
            .select(UserEntity::as_select())
            .get_result(conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserEntity>> {
        let conn = &mut self.conn().await?;
        let user = users::table
            .filter(users::email.eq(email))
            .select(UserEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_phone(&self, phone: &str) -> RepoResult<Option<UserEntity>> {
        let conn = &mut self.conn().await?;
        let user = users::table
            .filter(users::phone.eq(phone))
            .select(UserEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn create_user(&self, user: CreateUserEntity) -> RepoResult<UserEntity> {
        let conn = &mut self.conn().await?;
        let user = diesel::insert_into(users::table)
            .values(user)
            .returning(UserEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(user)
    }
}
