use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::PgRepository;
use crate::{
    db::{CouponRepository, RepoResult},
    models::{CouponEntity, CouponUsageEntity, CreateCouponUsageEntity},
    schema::{coupon_usage, coupons},
};

#[async_trait]
impl CouponRepository for PgRepository {
    async fn find_coupon(&self, id: Uuid) -> RepoResult<Option<CouponEntity>> {
        let conn = &mut self.conn().await?;
        let coupon = coupons::table
            .find(id)
            .select(CouponEntity::as_select())
            .get_result(conn)
            .await
            .optional()?;
        Ok(coupon)
    }

    async fn find_coupon_by_code(&self, code: &str) -> RepoResult<Option<CouponEntity>> {
        let conn = &mut self.conn().await?;
        let coupon = coupons::table
            .filter(coupons::code.eq(code))
            .select(CouponEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(coupon)
    }

    async fn count_coupon_usage(&self, coupon_id: Uuid, user_id: Uuid) -> RepoResult<i64> {
        let conn = &mut self.conn().await?;
        let count = coupon_usage::table
            .filter(coupon_usage::coupon_id.eq(coupon_id))
            .filter(coupon_usage::user_id.eq(user_id))
            .count()
            .get_result(conn)
            .await?;
        Ok(count)
    }

    async fn record_coupon_usage(
        &self,
        usage: CreateCouponUsageEntity,
    ) -> RepoResult<CouponUsageEntity> {
        let conn = &mut self.conn().await?;
        let usage = diesel::insert_into(coupon_usage::table)
            .values(usage)
            .returning(CouponUsageEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(usage)
    }

    async fn increment_coupon_usage(&self, coupon_id: Uuid) -> RepoResult<()> {
        let conn = &mut self.conn().await?;
        diesel::update(coupons::table.find(coupon_id))
            .set(coupons::usage_count.eq(coupons::usage_count + 1))
            .execute(conn)
            .await?;
        Ok(())
    }
}
