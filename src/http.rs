//! HTTP endpoints. Thin by design: path parsing, JSON shaping and
//! status-code mapping live here, everything else in [`crate::service`].

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use serde_json::json;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::error::Error;
use crate::model::ConversionRecord;
use crate::service::{ExchangeService, QueryReply, SaveOutcome, StoreStatus};

/// The router wrapped so `/last/` and `/last` hit the same handler.
///
/// Trailing-slash trimming has to wrap the router as an outer service;
/// a route layer would run only after routing already 404'd.
pub fn app(service: Arc<ExchangeService>) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(service))
}

pub fn router(service: Arc<ExchangeService>) -> Router {
    Router::new()
        .route(
            "/grab_and_save/{currency}/{amount}",
            get(grab_and_save).post(grab_and_save),
        )
        .route("/last", get(last))
        .route("/last/{arg}", get(last_arg))
        .route("/last/{currency}/{n}", get(last_currency_n))
        .with_state(service)
}

#[derive(Serialize)]
struct SaveResponse {
    record: ConversionRecord,
    stores: StoreStatuses,
}

#[derive(Serialize)]
struct StoreStatuses {
    relational: StoreStatus,
    cache: StoreStatus,
}

#[derive(Serialize)]
#[serde(untagged)]
enum QueryResponse {
    Results {
        relational: Vec<ConversionRecord>,
        cache: Vec<ConversionRecord>,
    },
    Warning {
        warning: String,
    },
}

impl From<QueryReply> for QueryResponse {
    fn from(reply: QueryReply) -> Self {
        match reply {
            QueryReply::Results { relational, cache } => {
                QueryResponse::Results { relational, cache }
            }
            QueryReply::Warning(warning) => QueryResponse::Warning {
                warning: warning.to_string(),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::CurrencyNotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidAmount(_) | Error::InvalidCurrency(_) | Error::SameAsBase(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::InvalidRate { .. } | Error::Upstream(_) | Error::UpstreamDecode(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::StoreWrite { .. } | Error::StoreRead { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn grab_and_save(
    State(service): State<Arc<ExchangeService>>,
    Path((currency, amount)): Path<(String, f64)>,
) -> Result<Response, Error> {
    let SaveOutcome {
        record,
        relational,
        cache,
    } = service.grab_and_save(&currency, amount).await?;

    // Partial failure keeps a 200-shaped body but signals via status
    let status = if relational.is_saved() && cache.is_saved() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = SaveResponse {
        record,
        stores: StoreStatuses { relational, cache },
    };
    Ok((status, Json(body)).into_response())
}

async fn last(State(service): State<Arc<ExchangeService>>) -> Result<Response, Error> {
    let reply = service.query(None, None).await?;
    Ok(Json(QueryResponse::from(reply)).into_response())
}

/// `/last/{arg}`: an integer argument is a count, anything else a currency.
async fn last_arg(
    State(service): State<Arc<ExchangeService>>,
    Path(arg): Path<String>,
) -> Result<Response, Error> {
    let reply = match arg.parse::<usize>() {
        Ok(0) => return Ok(bad_request("n must be at least 1")),
        Ok(n) => service.query(Some(n), None).await?,
        Err(_) => service.query(None, Some(&arg)).await?,
    };
    Ok(Json(QueryResponse::from(reply)).into_response())
}

async fn last_currency_n(
    State(service): State<Arc<ExchangeService>>,
    Path((currency, n)): Path<(String, usize)>,
) -> Result<Response, Error> {
    if n == 0 {
        return Ok(bad_request("n must be at least 1"));
    }
    let reply = service.query(Some(n), Some(&currency)).await?;
    Ok(Json(QueryResponse::from(reply)).into_response())
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
