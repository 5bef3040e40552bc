use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::users::repo_types::{
    ClaimedReward, PointBalance, RankCounts, RegistrationType, RewardClaim, Stamp, StampGrant,
    StampRecord, User,
};
use crate::users::store::UserStore;

struct Entry {
    user: User,
    stamps: Vec<StampRecord>,
    rewards: Vec<ClaimedReward>,
}

#[derive(Default)]
struct Inner {
    last_number: i64,
    entries: HashMap<String, Entry>,
}

impl Inner {
    fn insert(&mut self, user_id: &str, registration: RegistrationType) -> &mut Entry {
        let last_number = &mut self.last_number;
        self.entries.entry(user_id.to_string()).or_insert_with(|| {
            *last_number += 1;
            Entry {
                user: User {
                    id: user_id.to_string(),
                    user_number: *last_number,
                    registration_type: registration,
                    survey_completed: false,
                    badge_claimed: false,
                    total_points: 0,
                    redeemable_points: 0,
                    created_at: OffsetDateTime::now_utc(),
                },
                stamps: Vec::new(),
                rewards: Vec::new(),
            }
        })
    }

    fn entry(&mut self, user_id: &str) -> Result<&mut Entry, AppError> {
        self.entries.get_mut(user_id).ok_or(AppError::UserNotFound)
    }
}

/// In-process store used by tests.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
    fail_lookups: bool,
}

impl MemoryUserStore {
    /// Store whose `find_user` always errors.
    pub fn with_failing_lookups() -> Self {
        Self {
            fail_lookups: true,
            ..Self::default()
        }
    }

    /// Seeds a user with the given balances.
    pub fn seed(&self, user_id: &str, total_points: i32, redeemable_points: i32) -> User {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.insert(user_id, RegistrationType::OnSite);
        entry.user.total_points = total_points;
        entry.user.redeemable_points = redeemable_points;
        entry.user.clone()
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(user_id).map(|e| e.user.clone())
    }

    pub fn stamp_ids(&self, user_id: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .get(user_id)
            .map(|e| e.stamps.iter().map(|s| s.stamp_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn reward_count(&self, user_id: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(user_id).map_or(0, |e| e.rewards.len())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user(&self, user_id: &str) -> anyhow::Result<Option<User>> {
        if self.fail_lookups {
            anyhow::bail!("lookup unavailable");
        }
        Ok(self.user(user_id))
    }

    async fn create_user(
        &self,
        user_id: &str,
        registration: RegistrationType,
    ) -> anyhow::Result<User> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.entries.get(user_id) {
            return Ok(existing.user.clone());
        }
        Ok(inner.insert(user_id, registration).user.clone())
    }

    async fn list_stamps(&self, user_id: &str) -> anyhow::Result<Vec<StampRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .get(user_id)
            .map(|e| e.stamps.clone())
            .unwrap_or_default())
    }

    async fn list_rewards(&self, user_id: &str) -> anyhow::Result<Vec<ClaimedReward>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .get(user_id)
            .map(|e| e.rewards.clone())
            .unwrap_or_default())
    }

    async fn grant_stamp(
        &self,
        user_id: &str,
        stamp: Stamp,
        points: i32,
    ) -> Result<StampGrant, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entry(user_id)?;
        if entry.stamps.iter().any(|s| s.stamp_id == stamp.code()) {
            return Err(AppError::StampAlreadyGranted(stamp.code().to_string()));
        }
        entry.stamps.push(StampRecord {
            stamp_id: stamp.code().to_string(),
            acquired_at: OffsetDateTime::now_utc(),
        });
        entry.user.total_points += points;
        entry.user.redeemable_points += points;
        Ok(StampGrant {
            balance: PointBalance {
                total_points: entry.user.total_points,
                redeemable_points: entry.user.redeemable_points,
            },
            acquired_stamps: entry.stamps.iter().map(|s| s.stamp_id.clone()).collect(),
        })
    }

    async fn complete_survey(&self, user_id: &str, bonus: i32) -> Result<PointBalance, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entry(user_id)?;
        entry.user.ensure_survey_open()?;
        entry.user.survey_completed = true;
        entry.user.total_points += bonus;
        entry.user.redeemable_points += bonus;
        Ok(PointBalance {
            total_points: entry.user.total_points,
            redeemable_points: entry.user.redeemable_points,
        })
    }

    async fn claim_reward(
        &self,
        user_id: &str,
        reward_type: &str,
        cost: i32,
    ) -> Result<RewardClaim, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entry(user_id)?;
        entry.user.ensure_can_spend(cost)?;
        entry.user.redeemable_points -= cost;
        entry.rewards.push(ClaimedReward {
            reward_type: reward_type.to_string(),
            points_spent: cost,
            claimed_at: OffsetDateTime::now_utc(),
        });
        Ok(RewardClaim {
            redeemable_points: entry.user.redeemable_points,
            claimed_rewards: entry.rewards.clone(),
        })
    }

    async fn claim_badge(&self, user_id: &str) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entry(user_id)?;
        entry.user.ensure_badge_claimable()?;
        entry.user.badge_claimed = true;
        Ok(())
    }

    async fn rank_counts(&self, points: i32) -> anyhow::Result<RankCounts> {
        let inner = self.inner.lock().unwrap();
        let total = inner.entries.len() as i64;
        let higher = inner
            .entries
            .values()
            .filter(|e| e.user.total_points > points)
            .count() as i64;
        Ok(RankCounts { total, higher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reseeding_keeps_display_numbers_dense() {
        let store = MemoryUserStore::default();
        assert_eq!(store.seed("x", 0, 0).user_number, 1);
        assert_eq!(store.seed("x", 5, 5).user_number, 1);
        assert_eq!(store.seed("y", 0, 0).user_number, 2);
    }

    #[tokio::test]
    async fn create_after_seed_takes_next_number() {
        let store = MemoryUserStore::default();
        store.seed("x", 0, 0);
        let again = store.create_user("x", RegistrationType::Anonymous).await.unwrap();
        assert_eq!(again.user_number, 1);
        let fresh = store.create_user("z", RegistrationType::Anonymous).await.unwrap();
        assert_eq!(fresh.user_number, 2);
    }
}
