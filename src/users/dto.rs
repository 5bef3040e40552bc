use serde::{Deserialize, Serialize};

use crate::users::repo_types::{ClaimedReward, RegistrationType, StampRecord, User};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserDataRequest {
    pub user_id: Option<String>,
    pub registration_type: Option<RegistrationType>,
}

#[derive(Debug, Serialize)]
pub struct UserDataResponse {
    pub user: User,
    pub progress: Progress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub acquired_booths: Vec<String>,
    pub stamps: Vec<StampRecord>,
    pub claimed_rewards: Vec<ClaimedReward>,
}

/// The stamp may arrive as `stampId`, `stampCode` or `boothId` depending on the client.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantStampRequest {
    pub user_id: Option<String>,
    pub stamp_id: Option<String>,
    pub stamp_code: Option<String>,
    pub booth_id: Option<String>,
}

impl GrantStampRequest {
    pub fn requested_stamp(&self) -> Option<&str> {
        [&self.stamp_id, &self.stamp_code, &self.booth_id]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantStampResponse {
    pub success: bool,
    pub stamp_id: String,
    pub points_added: i32,
    pub new_total_points: i32,
    pub new_redeemable_points: i32,
    pub acquired_stamps: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSurveyRequest {
    pub user_id: Option<String>,
    pub survey_data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSurveyResponse {
    pub success: bool,
    pub bonus_points: i32,
    pub new_total_points: i32,
    pub new_redeemable_points: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRewardRequest {
    pub user_id: Option<String>,
    pub reward_type: Option<String>,
    pub points_cost: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRewardResponse {
    pub success: bool,
    pub reward_type: String,
    pub points_spent: i32,
    pub new_redeemable_points: i32,
    pub claimed_rewards: Vec<ClaimedReward>,
}

/// Body for endpoints that only need the participant.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct PercentileResponse {
    pub percentile: i64,
}
