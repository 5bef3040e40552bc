use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{info, warn};

use crate::{state::AppState, users::repo_types::Stamp};

const INVALID_BOOTH: &str = "Invalid booth ID. Valid booths: A, B, C, D, E, F";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/booth/:id", get(booth))
        .route("/pre-registration", get(pre_registration))
}

/// QR code target for a booth: `/booth/a` → `/?stamp=A`.
pub async fn booth(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match Stamp::parse_booth(&id) {
        Some(stamp) => {
            info!(%stamp, "booth redirect");
            found(format!("{}/?stamp={}", state.config.public_origin, stamp))
        }
        None => {
            warn!(booth = %id, "invalid booth id");
            (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/plain")],
                INVALID_BOOTH,
            )
                .into_response()
        }
    }
}

pub async fn pre_registration(State(state): State<AppState>) -> Response {
    found(format!("{}/?mode=prereg", state.config.public_origin))
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
