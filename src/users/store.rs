use async_trait::async_trait;

use crate::error::AppError;
use crate::users::repo_types::{
    ClaimedReward, PointBalance, RankCounts, RegistrationType, RewardClaim, Stamp, StampGrant,
    StampRecord, User,
};

/// Persistence for participant records.
///
/// Every mutating method is atomic: it either applies all of its changes or none,
/// and balance changes are applied against the stored value, never a caller-computed one.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, user_id: &str) -> anyhow::Result<Option<User>>;

    /// Inserts a fresh record unless one already exists, returning the stored record.
    async fn create_user(
        &self,
        user_id: &str,
        registration: RegistrationType,
    ) -> anyhow::Result<User>;

    /// Stamps in acquisition order.
    async fn list_stamps(&self, user_id: &str) -> anyhow::Result<Vec<StampRecord>>;

    /// Claimed rewards, oldest first.
    async fn list_rewards(&self, user_id: &str) -> anyhow::Result<Vec<ClaimedReward>>;

    async fn grant_stamp(
        &self,
        user_id: &str,
        stamp: Stamp,
        points: i32,
    ) -> Result<StampGrant, AppError>;

    async fn complete_survey(&self, user_id: &str, bonus: i32) -> Result<PointBalance, AppError>;

    async fn claim_reward(
        &self,
        user_id: &str,
        reward_type: &str,
        cost: i32,
    ) -> Result<RewardClaim, AppError>;

    async fn claim_badge(&self, user_id: &str) -> Result<(), AppError>;

    /// All users, and those with strictly more total points than `points`.
    async fn rank_counts(&self, points: i32) -> anyhow::Result<RankCounts>;
}
