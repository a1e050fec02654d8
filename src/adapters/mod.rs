// Adapters layer: reqwest-backed implementations of the provider ports.

pub mod directions;
pub mod transit;

pub use directions::GoogleDirectionsClient;
pub use transit::BusDataClient;

use crate::utils::error::{PlanError, Result};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;

pub(crate) fn build_client(timeout_seconds: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PlanError::config(format!("cannot build HTTP client: {}", e)))
}

pub(crate) fn network_error(provider: &str, source: reqwest::Error) -> PlanError {
    PlanError::NetworkError {
        provider: provider.to_string(),
        source,
    }
}

/// Reads the body and maps non-success statuses onto the error taxonomy.
pub(crate) async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    let status = response.status();
    tracing::debug!("{} response status: {}", provider, status);

    let body = response
        .text()
        .await
        .map_err(|e| network_error(provider, e))?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PlanError::AuthenticationError {
            provider: provider.to_string(),
            message: format!("HTTP {}: {}", status.as_u16(), truncate(&body)),
        });
    }

    if !status.is_success() {
        return Err(PlanError::ProviderError {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            message: truncate(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| PlanError::ProviderError {
        provider: provider.to_string(),
        status: Some(status.as_u16()),
        message: format!("unexpected response body: {}", e),
    })
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "empty response".to_string();
    }
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let head: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{}...", head)
}
