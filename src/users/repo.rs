use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::AppError;
use crate::users::repo_types::{
    ClaimedReward, PointBalance, RankCounts, RegistrationType, RewardClaim, Stamp, StampGrant,
    StampRecord, User,
};
use crate::users::store::UserStore;

const USER_COLUMNS: &str = "id, user_number, registration_type, survey_completed, badge_claimed, \
                            total_points, redeemable_points, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Reads the user row and holds its lock until the transaction ends.
async fn lock_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::UserNotFound)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user(&self, user_id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find user")?;
        Ok(user)
    }

    async fn create_user(
        &self,
        user_id: &str,
        registration: RegistrationType,
    ) -> anyhow::Result<User> {
        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, registration_type)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(registration)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;

        match inserted {
            Some(user) => Ok(user),
            // Lost a race with a concurrent first contact; the other insert won.
            None => self
                .find_user(user_id)
                .await?
                .with_context(|| format!("user {user_id} missing after insert conflict")),
        }
    }

    async fn list_stamps(&self, user_id: &str) -> anyhow::Result<Vec<StampRecord>> {
        let rows = sqlx::query_as::<_, StampRecord>(
            r#"
            SELECT stamp_id, acquired_at
              FROM user_stamps
             WHERE user_id = $1
             ORDER BY acquired_at ASC, stamp_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list stamps")?;
        Ok(rows)
    }

    async fn list_rewards(&self, user_id: &str) -> anyhow::Result<Vec<ClaimedReward>> {
        let rows = sqlx::query_as::<_, ClaimedReward>(
            r#"
            SELECT reward_type, points_spent, claimed_at
              FROM claimed_rewards
             WHERE user_id = $1
             ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list claimed rewards")?;
        Ok(rows)
    }

    async fn grant_stamp(
        &self,
        user_id: &str,
        stamp: Stamp,
        points: i32,
    ) -> Result<StampGrant, AppError> {
        let mut tx = self.db.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_stamps (user_id, stamp_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, stamp_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(stamp.code())
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(AppError::StampAlreadyGranted(stamp.code().to_string()));
        }

        let balance = sqlx::query_as::<_, PointBalance>(
            r#"
            UPDATE users
               SET total_points = total_points + $2,
                   redeemable_points = redeemable_points + $2
             WHERE id = $1
            RETURNING total_points, redeemable_points
            "#,
        )
        .bind(user_id)
        .bind(points)
        .fetch_one(&mut *tx)
        .await?;

        let acquired_stamps = sqlx::query_scalar::<_, String>(
            r#"
            SELECT stamp_id
              FROM user_stamps
             WHERE user_id = $1
             ORDER BY acquired_at ASC, stamp_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(StampGrant {
            balance,
            acquired_stamps,
        })
    }

    async fn complete_survey(&self, user_id: &str, bonus: i32) -> Result<PointBalance, AppError> {
        let mut tx = self.db.begin().await?;
        lock_user(&mut tx, user_id).await?.ensure_survey_open()?;

        let balance = sqlx::query_as::<_, PointBalance>(
            r#"
            UPDATE users
               SET survey_completed = TRUE,
                   total_points = total_points + $2,
                   redeemable_points = redeemable_points + $2
             WHERE id = $1
            RETURNING total_points, redeemable_points
            "#,
        )
        .bind(user_id)
        .bind(bonus)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(balance)
    }

    async fn claim_reward(
        &self,
        user_id: &str,
        reward_type: &str,
        cost: i32,
    ) -> Result<RewardClaim, AppError> {
        let mut tx = self.db.begin().await?;
        lock_user(&mut tx, user_id).await?.ensure_can_spend(cost)?;

        let redeemable_points = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
               SET redeemable_points = redeemable_points - $2
             WHERE id = $1
            RETURNING redeemable_points
            "#,
        )
        .bind(user_id)
        .bind(cost)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO claimed_rewards (user_id, reward_type, points_spent)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(reward_type)
        .bind(cost)
        .execute(&mut *tx)
        .await?;

        let claimed_rewards = sqlx::query_as::<_, ClaimedReward>(
            r#"
            SELECT reward_type, points_spent, claimed_at
              FROM claimed_rewards
             WHERE user_id = $1
             ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RewardClaim {
            redeemable_points,
            claimed_rewards,
        })
    }

    async fn claim_badge(&self, user_id: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        lock_user(&mut tx, user_id).await?.ensure_badge_claimable()?;

        sqlx::query("UPDATE users SET badge_claimed = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn rank_counts(&self, points: i32) -> anyhow::Result<RankCounts> {
        let counts = sqlx::query_as::<_, RankCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE total_points > $1) AS higher
              FROM users
            "#,
        )
        .bind(points)
        .fetch_one(&self.db)
        .await
        .context("count users by points")?;
        Ok(counts)
    }
}
