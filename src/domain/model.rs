use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API keys for both providers, loaded once per run.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub directions_api_key: String,
    pub transit_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("directions_api_key", &"<redacted>")
            .field("transit_api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommuteQuery {
    pub origin: String,
    pub destination: String,
    /// Local wall-clock departure time.
    pub departure: NaiveDateTime,
    /// Ask the directions provider for "now" rather than a fixed timestamp.
    pub leave_now: bool,
}

/// Driving route as reported by the directions provider. Every field the
/// provider may omit is optional; the assembler decides what is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionsResult {
    pub departure: NaiveDateTime,
    pub summary: Option<String>,
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub distance_meters: Option<u64>,
    pub distance_text: Option<String>,
    pub duration_secs: Option<u64>,
    pub duration_in_traffic_secs: Option<u64>,
}

impl DirectionsResult {
    /// Duration in traffic when the provider gave one, otherwise the free-flow duration.
    pub fn best_duration_secs(&self) -> Option<u64> {
        self.duration_in_traffic_secs.or(self.duration_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitRequest {
    pub line: String,
    pub boarding_stop: String,
    pub alighting_stop: String,
    pub after: NaiveDateTime,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitDeparture {
    pub aimed_departure: NaiveDateTime,
    pub expected_departure: Option<NaiveDateTime>,
    pub aimed_arrival: Option<NaiveDateTime>,
}

impl TransitDeparture {
    /// Real-time estimate when available, otherwise the timetabled time.
    pub fn departure_time(&self) -> NaiveDateTime {
        self.expected_departure.unwrap_or(self.aimed_departure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitResult {
    pub line: String,
    pub operator: Option<String>,
    pub boarding_stop_name: String,
    pub alighting_stop_name: String,
    pub departures: Vec<TransitDeparture>,
}

/// One row of a published bus timetable; `scheduled` is `None` where the bus
/// passes without stopping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableStop {
    pub name: String,
    pub scheduled: Option<NaiveTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLevel {
    Light,
    Moderate,
    Heavy,
    Unknown,
}

impl fmt::Display for TrafficLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrafficLevel::Light => "light",
            TrafficLevel::Moderate => "moderate",
            TrafficLevel::Heavy => "heavy",
            TrafficLevel::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrivingOption {
    pub summary: Option<String>,
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub distance_meters: Option<u64>,
    pub duration_minutes: i64,
    pub traffic_delay_minutes: i64,
    pub traffic: TrafficLevel,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusOption {
    pub line: String,
    pub operator: Option<String>,
    pub boarding_stop: String,
    pub alighting_stop: String,
    pub scheduled_departure: NaiveDateTime,
    pub departure: NaiveDateTime,
    pub delay_minutes: i64,
    pub wait_minutes: i64,
    pub ride_minutes: i64,
    pub arrival: NaiveDateTime,
}

impl BusOption {
    /// Door-to-door minutes counted from the query time: waiting plus riding.
    pub fn total_minutes(&self) -> i64 {
        self.wait_minutes + self.ride_minutes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Drive,
    Bus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommutePlan {
    pub origin: String,
    pub destination: String,
    pub requested_departure: NaiveDateTime,
    pub driving: DrivingOption,
    pub bus: BusOption,
    pub recommendation: Recommendation,
}

/// Whole minutes, rounded to the nearest minute. `None` when the duration
/// does not fit the plan's minute counters.
pub fn secs_to_minutes(secs: u64) -> Option<i64> {
    let minutes = secs.checked_add(30)? / 60;
    i64::try_from(minutes).ok()
}

pub fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_minutes()
}

/// `None` when the result would fall outside the representable calendar.
pub fn add_secs(at: NaiveDateTime, secs: u64) -> Option<NaiveDateTime> {
    let secs = i64::try_from(secs).ok()?;
    at.checked_add_signed(Duration::try_seconds(secs)?)
}
