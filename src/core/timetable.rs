//! Predicted arrival times along a published bus timetable.
//!
//! Each served stop is timed from the previous served stop using the live
//! driving duration. A bus that would arrive early waits for its scheduled
//! time, and any time beyond the scheduled gap is reported as extra traffic.

use crate::domain::model::{CommuteQuery, TimetableStop};
use crate::domain::ports::DirectionsProvider;
use crate::utils::error::{ErrorCategory, PlanError, Result};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Origin,
    Served,
    NotStopping,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopPrediction {
    pub stop: String,
    pub scheduled: Option<String>,
    pub status: StopStatus,
    pub extra_traffic_minutes: Option<f64>,
    pub predicted_arrival: Option<String>,
    pub error: Option<String>,
}

impl StopPrediction {
    fn counts_towards_summary(&self) -> bool {
        matches!(self.status, StopStatus::Origin | StopStatus::Served)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimetableSummary {
    pub total_extra_traffic_minutes: f64,
    pub max_extra_traffic_minutes: f64,
    pub journey: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimetableReport {
    pub line: Option<String>,
    pub stops: Vec<StopPrediction>,
    pub summary: TimetableSummary,
}

pub fn time_to_minutes(time: NaiveTime) -> f64 {
    (time.hour() * 60 + time.minute()) as f64
}

/// Minutes since midnight as `HH:MM`, truncating partial minutes.
pub fn minutes_to_clock(minutes: f64) -> String {
    let whole = minutes.max(0.0).floor() as i64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Returns `(actual_arrival, extra_traffic)` in minutes since midnight.
pub fn predict_stop(
    last_time: f64,
    travel_minutes: f64,
    scheduled: f64,
    previous_scheduled: Option<f64>,
) -> (f64, f64) {
    let predicted = last_time + travel_minutes;
    let actual = predicted.max(scheduled);
    let extra = match previous_scheduled {
        Some(previous) => {
            let scheduled_travel = scheduled - previous;
            let actual_travel = actual - last_time;
            (actual_travel - scheduled_travel).max(0.0)
        }
        None => 0.0,
    };
    (actual, extra)
}

pub fn summarize(stops: &[StopPrediction]) -> TimetableSummary {
    let counted: Vec<&StopPrediction> = stops.iter().filter(|s| s.counts_towards_summary()).collect();

    let extras = counted.iter().filter_map(|s| s.extra_traffic_minutes);
    let total = extras.clone().sum::<f64>();
    let max = extras.fold(0.0_f64, f64::max);

    let journey = match (counted.first(), counted.last()) {
        (Some(first), Some(last)) => match (&first.scheduled, &last.predicted_arrival) {
            (Some(from), Some(to)) => Some(format!("{} -> {}", from, to)),
            _ => None,
        },
        _ => None,
    };

    TimetableSummary {
        total_extra_traffic_minutes: round_tenth(total),
        max_extra_traffic_minutes: round_tenth(max),
        journey,
    }
}

pub struct TimetableAnalyzer<D: DirectionsProvider> {
    directions: D,
    pause: Duration,
}

impl<D: DirectionsProvider> TimetableAnalyzer<D> {
    pub fn new(directions: D, pause: Duration) -> Self {
        Self { directions, pause }
    }

    async fn leg_minutes(&self, from: &str, to: &str, now: NaiveDateTime) -> Result<f64> {
        let query = CommuteQuery {
            origin: from.to_string(),
            destination: to.to_string(),
            departure: now,
            leave_now: true,
        };
        let result = self.directions.directions(&query).await?;
        let secs = result
            .best_duration_secs()
            .ok_or_else(|| PlanError::assembly(format!("no duration from {} to {}", from, to)))?;
        Ok(secs as f64 / 60.0)
    }

    /// Authentication failures abort the run; any other failed leg is
    /// recorded and the next stop is timed from the last served stop.
    pub async fn analyze(
        &self,
        line: Option<String>,
        stops: &[TimetableStop],
        now: NaiveDateTime,
    ) -> Result<TimetableReport> {
        let first = stops.first().ok_or_else(|| PlanError::MissingConfigError {
            field: "timetable.stops".to_string(),
        })?;
        let first_time = first.scheduled.ok_or_else(|| PlanError::InvalidConfigValueError {
            field: "timetable.stops[0].scheduled".to_string(),
            value: "x".to_string(),
            reason: "the first stop must be served".to_string(),
        })?;

        tracing::info!("Analyzing {} stops with current traffic conditions", stops.len());

        let mut rows = vec![StopPrediction {
            stop: first.name.clone(),
            scheduled: Some(first_time.format("%H:%M").to_string()),
            status: StopStatus::Origin,
            extra_traffic_minutes: Some(0.0),
            predicted_arrival: Some(first_time.format("%H:%M").to_string()),
            error: None,
        }];

        let mut last_stop = first.name.as_str();
        let mut last_time = time_to_minutes(first_time);
        let mut previous_scheduled = Some(time_to_minutes(first_time));
        let mut calls_made = 0usize;

        for stop in &stops[1..] {
            let Some(scheduled) = stop.scheduled else {
                rows.push(StopPrediction {
                    stop: stop.name.clone(),
                    scheduled: None,
                    status: StopStatus::NotStopping,
                    extra_traffic_minutes: None,
                    predicted_arrival: None,
                    error: None,
                });
                continue;
            };
            let scheduled_minutes = time_to_minutes(scheduled);

            if calls_made > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            calls_made += 1;

            tracing::info!("Analyzing: {}", stop.name);
            match self.leg_minutes(last_stop, &stop.name, now).await {
                Ok(travel) => {
                    let (actual, extra) =
                        predict_stop(last_time, travel, scheduled_minutes, previous_scheduled);
                    rows.push(StopPrediction {
                        stop: stop.name.clone(),
                        scheduled: Some(scheduled.format("%H:%M").to_string()),
                        status: StopStatus::Served,
                        extra_traffic_minutes: Some(round_tenth(extra)),
                        predicted_arrival: Some(minutes_to_clock(actual)),
                        error: None,
                    });
                    last_stop = stop.name.as_str();
                    last_time = actual;
                }
                Err(e) if e.category() == ErrorCategory::Authentication => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping {} due to provider error: {}", stop.name, e);
                    rows.push(StopPrediction {
                        stop: stop.name.clone(),
                        scheduled: Some(scheduled.format("%H:%M").to_string()),
                        status: StopStatus::Failed,
                        extra_traffic_minutes: None,
                        predicted_arrival: None,
                        error: Some(e.to_string()),
                    });
                }
            }
            previous_scheduled = Some(scheduled_minutes);
        }

        let summary = summarize(&rows);
        Ok(TimetableReport {
            line,
            stops: rows,
            summary,
        })
    }
}
