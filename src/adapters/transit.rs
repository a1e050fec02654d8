use crate::adapters::{build_client, network_error, read_json};
use crate::config::toml_config::TransitConfig;
use crate::domain::model::{TransitDeparture, TransitRequest, TransitResult};
use crate::domain::ports::TransitProvider;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

pub const PROVIDER_NAME: &str = "Bus open data";

const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Client for a bus open-data departures endpoint.
pub struct BusDataClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct DeparturesResponse {
    line: Option<String>,
    operator: Option<String>,
    stop_name: Option<String>,
    destination_name: Option<String>,
    #[serde(default)]
    departures: Vec<DepartureDto>,
}

#[derive(Debug, Deserialize)]
struct DepartureDto {
    aimed_departure: NaiveDateTime,
    expected_departure: Option<NaiveDateTime>,
    aimed_arrival: Option<NaiveDateTime>,
}

impl BusDataClient {
    pub fn new(config: &TransitConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
        })
    }

    /// Keeps the first `limit` departures still to leave at `request.after`.
    fn into_result(request: &TransitRequest, response: DeparturesResponse) -> TransitResult {
        let mut departures: Vec<TransitDeparture> = response
            .departures
            .into_iter()
            .map(|d| TransitDeparture {
                aimed_departure: d.aimed_departure,
                expected_departure: d.expected_departure,
                aimed_arrival: d.aimed_arrival,
            })
            .filter(|d| d.departure_time() >= request.after)
            .collect();
        departures.sort_by_key(|d| d.aimed_departure);
        departures.truncate(request.limit);

        TransitResult {
            line: response.line.unwrap_or_else(|| request.line.clone()),
            operator: response.operator,
            boarding_stop_name: response
                .stop_name
                .unwrap_or_else(|| request.boarding_stop.clone()),
            alighting_stop_name: response
                .destination_name
                .unwrap_or_else(|| request.alighting_stop.clone()),
            departures,
        }
    }
}

#[async_trait]
impl TransitProvider for BusDataClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn departures(&self, request: &TransitRequest) -> Result<TransitResult> {
        tracing::debug!(
            "Requesting line {} departures from stop {} towards {}",
            request.line,
            request.boarding_stop,
            request.alighting_stop
        );

        let after = request.after.format(QUERY_TIME_FORMAT).to_string();
        let limit = request.limit.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("line", request.line.as_str()),
                ("stop", request.boarding_stop.as_str()),
                ("destination", request.alighting_stop.as_str()),
                ("after", after.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| network_error(PROVIDER_NAME, e))?;

        let body: DeparturesResponse = read_json(PROVIDER_NAME, response).await?;
        let result = Self::into_result(request, body);

        tracing::debug!("Received {} departures", result.departures.len());
        Ok(result)
    }
}
