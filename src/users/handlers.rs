use std::future::Future;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::{error::AppError, state::AppState};

use super::dto::{
    ClaimRewardRequest, ClaimRewardResponse, GetUserDataRequest, GrantStampRequest,
    GrantStampResponse, PercentileResponse, SubmitSurveyRequest, SubmitSurveyResponse,
    SuccessResponse, UserDataResponse, UserIdRequest,
};
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/get-user-data", post(get_user_data))
        .route("/grant-stamp", post(grant_stamp))
        .route("/submit-survey", post(submit_survey))
        .route("/claim-reward", post(claim_reward))
        .route("/claim-badge", post(claim_badge))
        .route("/get-percentile", post(get_percentile))
}

/// Parses the body as JSON whatever its `Content-Type`, runs the operation and
/// logs any failure under `handler`.
async fn respond<Req, Res, F, Fut>(
    handler: &'static str,
    body: Bytes,
    op: F,
) -> Result<Json<Res>, AppError>
where
    Req: DeserializeOwned,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<Res, AppError>>,
{
    let result = match serde_json::from_slice::<Req>(&body) {
        Ok(req) => op(req).await,
        Err(e) => Err(e.into()),
    };
    result.map(Json).inspect_err(|e| e.log(handler))
}

#[instrument(skip_all)]
pub async fn get_user_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UserDataResponse>, AppError> {
    respond("get-user-data", body, |req| {
        services::get_user_data(state.store.as_ref(), req)
    })
    .await
}

#[instrument(skip_all)]
pub async fn grant_stamp(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GrantStampResponse>, AppError> {
    respond("grant-stamp", body, |req| {
        services::grant_stamp(state.store.as_ref(), req)
    })
    .await
}

#[instrument(skip_all)]
pub async fn submit_survey(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SubmitSurveyResponse>, AppError> {
    respond("submit-survey", body, |req| {
        services::submit_survey(state.store.as_ref(), req)
    })
    .await
}

#[instrument(skip_all)]
pub async fn claim_reward(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ClaimRewardResponse>, AppError> {
    respond("claim-reward", body, |req| {
        services::claim_reward(state.store.as_ref(), req)
    })
    .await
}

#[instrument(skip_all)]
pub async fn claim_badge(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    respond("claim-badge", body, |req| {
        services::claim_badge(state.store.as_ref(), req)
    })
    .await
}

#[instrument(skip_all)]
pub async fn get_percentile(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PercentileResponse>, AppError> {
    respond("get-percentile", body, |req| {
        services::get_percentile(state.store.as_ref(), req)
    })
    .await
}
