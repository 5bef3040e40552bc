use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::error::AppError;

/// How a participant entered the rally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationType {
    Anonymous,
    #[default]
    #[serde(alias = "onsite")]
    OnSite,
    #[serde(alias = "prereg")]
    PreRegistered,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: String,
    pub user_number: i64,
    pub registration_type: RegistrationType,
    pub survey_completed: bool,
    pub badge_claimed: bool,
    pub total_points: i32,      // lifetime earned, never decreases
    pub redeemable_points: i32, // spendable balance
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn ensure_survey_open(&self) -> Result<(), AppError> {
        if self.survey_completed {
            return Err(AppError::SurveyAlreadyCompleted);
        }
        Ok(())
    }

    pub fn ensure_badge_claimable(&self) -> Result<(), AppError> {
        if !self.survey_completed {
            return Err(AppError::SurveyNotCompleted);
        }
        if self.badge_claimed {
            return Err(AppError::BadgeAlreadyClaimed);
        }
        Ok(())
    }

    pub fn ensure_can_spend(&self, cost: i32) -> Result<(), AppError> {
        if self.redeemable_points < cost {
            return Err(AppError::InsufficientPoints {
                available: self.redeemable_points,
                required: cost,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StampRecord {
    pub stamp_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub acquired_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClaimedReward {
    pub reward_type: String,
    pub points_spent: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub claimed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct PointBalance {
    pub total_points: i32,
    pub redeemable_points: i32,
}

/// Result of a successful stamp grant.
#[derive(Debug, Clone)]
pub struct StampGrant {
    pub balance: PointBalance,
    pub acquired_stamps: Vec<String>,
}

/// Result of a successful reward redemption.
#[derive(Debug, Clone)]
pub struct RewardClaim {
    pub redeemable_points: i32,
    pub claimed_rewards: Vec<ClaimedReward>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct RankCounts {
    pub total: i64,
    pub higher: i64,
}

/// Stamps that can be collected: booths A-F plus event stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stamp {
    A,
    B,
    C,
    D,
    E,
    F,
    Stage,
    TalkSession,
    Presentation,
}

impl Stamp {
    pub const ALL: [Stamp; 9] = [
        Stamp::A,
        Stamp::B,
        Stamp::C,
        Stamp::D,
        Stamp::E,
        Stamp::F,
        Stamp::Stage,
        Stamp::TalkSession,
        Stamp::Presentation,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Stamp::A => "A",
            Stamp::B => "B",
            Stamp::C => "C",
            Stamp::D => "D",
            Stamp::E => "E",
            Stamp::F => "F",
            Stamp::Stage => "STAGE",
            Stamp::TalkSession => "TALKSESSION",
            Stamp::Presentation => "PRESENTATION",
        }
    }

    pub fn is_booth(self) -> bool {
        !matches!(self, Stamp::Stage | Stamp::TalkSession | Stamp::Presentation)
    }

    /// Case-insensitive lookup.
    pub fn parse(raw: &str) -> Option<Stamp> {
        let code = normalize_code(raw);
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn parse_booth(raw: &str) -> Option<Stamp> {
        Self::parse(raw).filter(|s| s.is_booth())
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}
