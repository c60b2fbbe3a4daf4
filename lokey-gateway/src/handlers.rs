use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use lokey_api::{Error, ServiceStats, Source};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Standard `{status, data?, error?}` response envelope used by every
/// handler on this HTTP surface.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::OK, Json(ApiResponse { status: "ok", data: Some(data), error: None }))
    }
}

/// Maps a core `Error` to its HTTP status and wraps it in the response
/// envelope. `not_seeded_status` lets callers that treat `NotSeeded` as
/// "no data yet" (503) differ from ones that don't.
fn error_response(err: Error, not_seeded_status: StatusCode) -> Response {
    let status = match &err {
        Error::Overflow(_) => StatusCode::BAD_REQUEST,
        Error::NotSeeded => not_seeded_status,
        Error::Storage(_)
        | Error::Corrupt(_)
        | Error::HardwareUnavailable(_)
        | Error::HardwareTransient(_)
        | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::<()> { status: "error", data: None, error: Some(err.to_string()) }))
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    consume: bool,
}

fn default_limit() -> u32 {
    10
}

impl FetchQuery {
    /// Validates `limit` against its documented bound (1-1000); `offset`
    /// is unsigned so its `>= 0` bound is enforced by the type itself.
    fn validated(&self) -> Result<(), Error> {
        if self.limit == 0 || self.limit > 1000 {
            return Err(Error::Overflow(format!("limit must be in 1..=1000, got {}", self.limit)));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TrngHashView {
    id: i64,
    hash_hex: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    consumed: bool,
    source: Source,
    chunk_size: u32,
}

#[derive(Debug, Serialize)]
struct FortunaDataView {
    id: i64,
    data_hex: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    consumed: bool,
    chunk_size: u32,
    amplification_factor: u32,
}

pub async fn health(State(state): State<AppState>) -> Response {
    match (state.trng_queue.stats().await, state.fortuna_queue.stats().await) {
        (Ok(_), Ok(_)) => {
            log::debug!("health check ok");
            ApiResponse::ok(()).into_response()
        }
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("health check failed: {e}");
            error_response(e, StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

pub async fn trng_hashes(State(state): State<AppState>, Query(query): Query<FetchQuery>) -> Response {
    if let Err(e) = query.validated() {
        return error_response(e, StatusCode::SERVICE_UNAVAILABLE);
    }

    match state.trng_queue.fetch(query.limit, query.offset, query.consume).await {
        Ok(records) => {
            let views: Vec<TrngHashView> = records
                .into_iter()
                .map(|r| TrngHashView {
                    id: r.id,
                    hash_hex: r.hash_hex(),
                    timestamp: r.timestamp,
                    consumed: r.consumed,
                    source: r.source,
                    chunk_size: r.chunk_size,
                })
                .collect();
            ApiResponse::ok(views).into_response()
        }
        Err(e) => error_response(e, StatusCode::SERVICE_UNAVAILABLE),
    }
}

pub async fn fortuna_data(State(state): State<AppState>, Query(query): Query<FetchQuery>) -> Response {
    if let Err(e) = query.validated() {
        return error_response(e, StatusCode::SERVICE_UNAVAILABLE);
    }

    match state.fortuna_queue.fetch(query.limit, query.offset, query.consume).await {
        Ok(records) => {
            let views: Vec<FortunaDataView> = records
                .into_iter()
                .map(|r| FortunaDataView {
                    id: r.id,
                    data_hex: r.data_hex(),
                    timestamp: r.timestamp,
                    consumed: r.consumed,
                    chunk_size: r.chunk_size,
                    amplification_factor: r.amplification_factor,
                })
                .collect();
            ApiResponse::ok(views).into_response()
        }
        // No data yet because the generator hasn't reseeded: 503, distinct
        // from a hard storage failure.
        Err(e) => error_response(e, StatusCode::SERVICE_UNAVAILABLE),
    }
}

pub async fn stats(State(state): State<AppState>) -> Response {
    let trng = match state.trng_queue.stats().await {
        Ok(s) => s,
        Err(e) => return error_response(e, StatusCode::SERVICE_UNAVAILABLE),
    };
    let fortuna = match state.fortuna_queue.stats().await {
        Ok(s) => s,
        Err(e) => return error_response(e, StatusCode::SERVICE_UNAVAILABLE),
    };
    let reseed_count = state.fortuna_core.lock().reseed_count();

    ApiResponse::ok(ServiceStats { trng, fortuna, reseed_count }).into_response()
}
