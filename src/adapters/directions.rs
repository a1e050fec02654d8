use crate::adapters::{build_client, network_error, read_json};
use crate::config::toml_config::DirectionsConfig;
use crate::domain::model::{CommuteQuery, DirectionsResult};
use crate::domain::ports::DirectionsProvider;
use crate::utils::error::{PlanError, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeZone};
use reqwest::Client;
use serde::Deserialize;

pub const PROVIDER_NAME: &str = "Google Directions";

/// Client for the Google Directions JSON API.
pub struct GoogleDirectionsClient {
    client: Client,
    endpoint: String,
    api_key: String,
    mode: String,
    traffic_model: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteDto>,
}

#[derive(Debug, Deserialize)]
struct RouteDto {
    summary: Option<String>,
    #[serde(default)]
    legs: Vec<LegDto>,
}

#[derive(Debug, Deserialize)]
struct LegDto {
    distance: Option<TextValue>,
    duration: Option<TextValue>,
    duration_in_traffic: Option<TextValue>,
    start_address: Option<String>,
    end_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: Option<String>,
    value: u64,
}

impl GoogleDirectionsClient {
    pub fn new(config: &DirectionsConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            mode: config.mode.clone(),
            traffic_model: config.traffic_model.clone(),
        })
    }

    fn departure_param(query: &CommuteQuery) -> String {
        if query.leave_now {
            "now".to_string()
        } else {
            unix_seconds(query.departure).to_string()
        }
    }

    fn into_result(query: &CommuteQuery, response: DirectionsResponse) -> Result<DirectionsResult> {
        match response.status.as_str() {
            "OK" => {}
            "REQUEST_DENIED" => {
                return Err(PlanError::AuthenticationError {
                    provider: PROVIDER_NAME.to_string(),
                    message: response
                        .error_message
                        .unwrap_or_else(|| response.status.clone()),
                })
            }
            status => {
                let message = match response.error_message {
                    Some(detail) => format!("{}: {}", status, detail),
                    None => status.to_string(),
                };
                return Err(PlanError::ProviderError {
                    provider: PROVIDER_NAME.to_string(),
                    status: None,
                    message,
                });
            }
        }

        let route = response.routes.into_iter().next();
        let summary = route.as_ref().and_then(|r| r.summary.clone());
        let leg = route.and_then(|r| r.legs.into_iter().next()).ok_or_else(|| {
            PlanError::ProviderError {
                provider: PROVIDER_NAME.to_string(),
                status: None,
                message: format!(
                    "no route found from {} to {}",
                    query.origin, query.destination
                ),
            }
        })?;

        Ok(DirectionsResult {
            departure: query.departure,
            summary: summary.filter(|s| !s.is_empty()),
            start_address: leg.start_address,
            end_address: leg.end_address,
            distance_meters: leg.distance.as_ref().map(|d| d.value),
            distance_text: leg.distance.and_then(|d| d.text),
            duration_secs: leg.duration.map(|d| d.value),
            duration_in_traffic_secs: leg.duration_in_traffic.map(|d| d.value),
        })
    }
}

/// Local wall-clock time to unix seconds; falls back to UTC inside a DST gap.
fn unix_seconds(at: NaiveDateTime) -> i64 {
    Local
        .from_local_datetime(&at)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| at.and_utc().timestamp())
}

#[async_trait]
impl DirectionsProvider for GoogleDirectionsClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn directions(&self, query: &CommuteQuery) -> Result<DirectionsResult> {
        tracing::debug!(
            "Requesting {} directions from '{}' to '{}'",
            self.mode,
            query.origin,
            query.destination
        );

        let departure_time = Self::departure_param(query);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origin", query.origin.as_str()),
                ("destination", query.destination.as_str()),
                ("mode", self.mode.as_str()),
                ("departure_time", departure_time.as_str()),
                ("traffic_model", self.traffic_model.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| network_error(PROVIDER_NAME, e))?;

        let body: DirectionsResponse = read_json(PROVIDER_NAME, response).await?;
        let result = Self::into_result(query, body)?;

        tracing::debug!(
            "Route found: duration {:?}s, in traffic {:?}s",
            result.duration_secs,
            result.duration_in_traffic_secs
        );
        Ok(result)
    }
}
