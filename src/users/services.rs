use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::users::dto::{
    ClaimRewardRequest, ClaimRewardResponse, GetUserDataRequest, GrantStampRequest,
    GrantStampResponse, PercentileResponse, Progress, SubmitSurveyRequest, SubmitSurveyResponse,
    SuccessResponse, UserDataResponse, UserIdRequest,
};
use crate::users::repo_types::{normalize_code, Stamp};
use crate::users::store::UserStore;

/// Points awarded per stamp.
pub const STAMP_POINTS: i32 = 1;
/// One-time bonus for completing the survey.
pub const SURVEY_BONUS_POINTS: i32 = 1;

fn required(value: Option<String>, what: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::missing(what))
}

/// Fetch-or-create: the first request for an unknown key provisions its record.
pub async fn get_user_data(
    store: &dyn UserStore,
    req: GetUserDataRequest,
) -> Result<UserDataResponse, AppError> {
    let user_id = required(req.user_id, "userId is")?;

    let existing = match store.find_user(&user_id).await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, %user_id, "user lookup failed; provisioning");
            None
        }
    };
    let user = match existing {
        Some(user) => user,
        None => {
            let registration = req.registration_type.unwrap_or_default();
            let user = store.create_user(&user_id, registration).await?;
            info!(%user_id, user_number = user.user_number, ?registration, "user created");
            user
        }
    };

    let stamps = store.list_stamps(&user_id).await.unwrap_or_else(|e| {
        error!(error = %e, %user_id, "fetching stamps failed");
        Vec::new()
    });
    let claimed_rewards = store.list_rewards(&user_id).await.unwrap_or_else(|e| {
        error!(error = %e, %user_id, "fetching rewards failed");
        Vec::new()
    });

    Ok(UserDataResponse {
        user,
        progress: Progress {
            acquired_booths: stamps.iter().map(|s| s.stamp_id.clone()).collect(),
            stamps,
            claimed_rewards,
        },
    })
}

pub async fn grant_stamp(
    store: &dyn UserStore,
    req: GrantStampRequest,
) -> Result<GrantStampResponse, AppError> {
    let raw_stamp = req.requested_stamp().map(str::to_string);
    let user_id = required(req.user_id, "userId and stampId are")?;
    let raw_stamp = required(raw_stamp, "userId and stampId are")?;

    let stamp =
        Stamp::parse(&raw_stamp).ok_or_else(|| AppError::UnsupportedStamp(normalize_code(&raw_stamp)))?;

    let grant = store.grant_stamp(&user_id, stamp, STAMP_POINTS).await?;
    info!(%user_id, %stamp, total_points = grant.balance.total_points, "stamp granted");

    Ok(GrantStampResponse {
        success: true,
        stamp_id: stamp.code().to_string(),
        points_added: STAMP_POINTS,
        new_total_points: grant.balance.total_points,
        new_redeemable_points: grant.balance.redeemable_points,
        acquired_stamps: grant.acquired_stamps,
    })
}

/// The survey answers are accepted but not persisted; only completion matters.
pub async fn submit_survey(
    store: &dyn UserStore,
    req: SubmitSurveyRequest,
) -> Result<SubmitSurveyResponse, AppError> {
    let user_id = required(req.user_id, "userId and surveyData are")?;
    let survey = req
        .survey_data
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::missing("userId and surveyData are"))?;
    debug!(%user_id, answers = survey.as_object().map_or(0, |o| o.len()), "survey received");

    let balance = store.complete_survey(&user_id, SURVEY_BONUS_POINTS).await?;
    info!(%user_id, bonus = SURVEY_BONUS_POINTS, "survey submitted");

    Ok(SubmitSurveyResponse {
        success: true,
        bonus_points: SURVEY_BONUS_POINTS,
        new_total_points: balance.total_points,
        new_redeemable_points: balance.redeemable_points,
    })
}

pub async fn claim_reward(
    store: &dyn UserStore,
    req: ClaimRewardRequest,
) -> Result<ClaimRewardResponse, AppError> {
    const FIELDS: &str = "userId, rewardType, and pointsCost are";
    let user_id = required(req.user_id, FIELDS)?;
    let reward_type = required(req.reward_type, FIELDS)?;
    let cost = req.points_cost.ok_or_else(|| AppError::missing(FIELDS))?;
    if cost < 0 {
        return Err(AppError::BadRequest("pointsCost must not be negative".into()));
    }

    let claim = store.claim_reward(&user_id, &reward_type, cost).await?;
    info!(%user_id, %reward_type, cost, redeemable = claim.redeemable_points, "reward claimed");

    Ok(ClaimRewardResponse {
        success: true,
        reward_type,
        points_spent: cost,
        new_redeemable_points: claim.redeemable_points,
        claimed_rewards: claim.claimed_rewards,
    })
}

pub async fn claim_badge(
    store: &dyn UserStore,
    req: UserIdRequest,
) -> Result<SuccessResponse, AppError> {
    let user_id = required(req.user_id, "userId is")?;
    store.claim_badge(&user_id).await?;
    info!(%user_id, "badge claimed");
    Ok(SuccessResponse { success: true })
}

pub async fn get_percentile(
    store: &dyn UserStore,
    req: UserIdRequest,
) -> Result<PercentileResponse, AppError> {
    let user_id = required(req.user_id, "userId is")?;
    let user = store
        .find_user(&user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    let counts = store.rank_counts(user.total_points).await?;
    Ok(PercentileResponse {
        percentile: top_percentile(counts.higher, counts.total),
    })
}

/// "Top N%" rank: the leader gets the smallest value, `round((higher + 1) / total * 100)`.
/// Zero users yields 0.
pub fn top_percentile(higher: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let rank = (higher.max(0) + 1).min(total);
    // round-half-up in integers
    ((rank * 200 + total) / (total * 2)).clamp(0, 100)
}
