//! Plain HTTP routes: the widget document and the follower-count API.
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_common::Creator;
use tally_social::LookupError;

use crate::state::AppState;

const OVERLAY_HTML: &str = include_str!("../assets/overlay.html");

#[derive(Debug, Serialize)]
pub struct FollowersBody {
    pub followers: u64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `GET /` — the overlay widget document.
pub async fn widget() -> Html<&'static str> {
    Html(OVERLAY_HTML)
}

/// `GET /api/followers/{creator}`.
///
/// 404 when the fallback page yielded nothing, 500 when it could not be
/// fetched at all. Primary-source trouble never shows up here.
pub async fn followers(
    State(state): State<Arc<AppState>>,
    Path(creator): Path<String>,
) -> Response {
    let creator = Creator::from(creator);
    match state.lookup.followers(&creator).await {
        Ok(snap) => (
            StatusCode::OK,
            Json(FollowersBody {
                followers: snap.followers,
                cached: snap.cached,
            }),
        )
            .into_response(),
        Err(err) => {
            let status = match &err {
                LookupError::NotFound { .. } => StatusCode::NOT_FOUND,
                LookupError::Unavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}
