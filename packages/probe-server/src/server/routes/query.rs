//! Probe endpoints.
//!
//! POST /q?prompt=&location=&country_code=&deep_scrape=
//! POST /q/stream?...
//!
//! `/q` answers with one JSON result set. `/q/stream` answers with SSE:
//! one `partial` event per completed extraction batch, then a single
//! `complete` event, or a single `error` event.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use vendor_probe::{ProbeError, ProbeInput, ResultSet};

use crate::server::app::AppState;

const DEFAULT_COUNTRY_CODE: &str = "US";

#[derive(Debug, Deserialize)]
pub struct ProbeQuery {
    prompt: Option<String>,
    location: Option<String>,
    country_code: Option<String>,
    #[serde(default)]
    deep_scrape: bool,
}

impl ProbeQuery {
    /// Reject missing or blank prompt/location before any work starts.
    fn into_input(self) -> Result<ProbeInput, ApiError> {
        let prompt = required(self.prompt, "prompt")?;
        let location = required(self.location, "location")?;
        let country_code = self
            .country_code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());

        Ok(ProbeInput::new(prompt, location, country_code).with_deep_scrape(self.deep_scrape))
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError(ProbeError::InvalidInput { field }))
}

/// A request-level probe failure rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(ProbeError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ProbeError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ProbeError::NoSearchResults | ProbeError::NoContent => StatusCode::NOT_FOUND,
            ProbeError::QueryGeneration(_) | ProbeError::ExtractionFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProbeError> for ApiError {
    fn from(error: ProbeError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Probe failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Run one probe to completion.
pub async fn query_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<ProbeQuery>,
) -> Result<Json<ResultSet>, ApiError> {
    let input = query.into_input()?;
    let set = state.probe.run(input).await?;
    Ok(Json(set))
}

/// Stream partial result sets as SSE.
pub async fn stream_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<ProbeQuery>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let input = query.into_input()?;
    let probe = state.probe;

    let events = stream! {
        let mut sets = probe.run_stream(input);
        while let Some(item) = sets.next().await {
            let event = match item {
                Ok(set) => {
                    let name = if set.has_more { "partial" } else { "complete" };
                    Event::default().event(name).json_data(&set)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Probe stream failed");
                    Event::default()
                        .event("error")
                        .json_data(serde_json::json!({ "error": e.to_string() }))
                }
            };
            match event {
                Ok(event) => yield Ok(event),
                Err(e) => tracing::error!(error = %e, "Failed to encode SSE event"),
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
