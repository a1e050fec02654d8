use crate::domain::model::{CommuteQuery, TimetableStop, TransitRequest};
use crate::utils::error::{PlanError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use chrono::{Days, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DIRECTIONS_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/directions/json";
pub const DEFAULT_DIRECTIONS_KEY_FILE: &str = "~/.gcloud/dcommute-service-account-key.json";
pub const DEFAULT_TRANSIT_KEY_FILE: &str = "~/.config/commute-plan/transit-api-key";

/// Marker used in timetables for stops the bus passes without stopping.
pub const NOT_STOPPING: &str = "x";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommuteConfig {
    #[serde(default)]
    pub commute: CommuteSection,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub directions: DirectionsConfig,
    /// Only `plan` and `check` need this section.
    #[serde(default)]
    pub transit: TransitConfig,
    pub timetable: Option<TimetableConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommuteSection {
    pub origin: String,
    pub destination: String,
    /// `HH:MM`, the next time it comes round; absent means "leave now".
    pub depart_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_directions_key_file")]
    pub directions_key_file: String,
    #[serde(default = "default_transit_key_file")]
    pub transit_key_file: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            directions_key_file: default_directions_key_file(),
            transit_key_file: default_transit_key_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsConfig {
    #[serde(default = "default_directions_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_traffic_model")]
    pub traffic_model: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_directions_endpoint(),
            mode: default_mode(),
            traffic_model: default_traffic_model(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitConfig {
    pub endpoint: String,
    pub line: String,
    pub boarding_stop: String,
    pub alighting_stop: String,
    #[serde(default = "default_max_departures")]
    pub max_departures: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            line: String::new(),
            boarding_stop: String::new(),
            alighting_stop: String::new(),
            max_departures: default_max_departures(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableConfig {
    pub line: Option<String>,
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    pub stops: Vec<TimetableStopConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableStopConfig {
    pub name: String,
    pub scheduled: String,
}

fn default_directions_key_file() -> String {
    DEFAULT_DIRECTIONS_KEY_FILE.to_string()
}

fn default_transit_key_file() -> String {
    DEFAULT_TRANSIT_KEY_FILE.to_string()
}

fn default_directions_endpoint() -> String {
    DEFAULT_DIRECTIONS_ENDPOINT.to_string()
}

fn default_mode() -> String {
    "driving".to_string()
}

fn default_traffic_model() -> String {
    "best_guess".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_max_departures() -> usize {
    5
}

fn default_pause_ms() -> u64 {
    200
}

/// Parses `HH:MM` (or `H:MM`) wall-clock times.
pub fn parse_clock_time(field_name: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        PlanError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("expected HH:MM ({})", e),
        }
    })
}

impl CommuteConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::ConfigError {
            message: format!("cannot read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PlanError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TRANSIT_ENDPOINT})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| PlanError::config(format!("env substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// `<config_dir>/commute-plan/commute.toml`, or `./commute.toml` when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("commute-plan").join("commute.toml"))
            .unwrap_or_else(|| PathBuf::from("commute.toml"))
    }

    pub fn apply_overrides(
        &mut self,
        origin: Option<String>,
        destination: Option<String>,
        depart_at: Option<String>,
    ) {
        if let Some(origin) = origin {
            tracing::debug!("Origin overridden to: {}", origin);
            self.commute.origin = origin;
        }
        if let Some(destination) = destination {
            tracing::debug!("Destination overridden to: {}", destination);
            self.commute.destination = destination;
        }
        if let Some(depart_at) = depart_at {
            tracing::debug!("Departure overridden to: {}", depart_at);
            self.commute.depart_at = Some(depart_at);
        }
    }

    /// Builds the query for one run. `now` is the local wall-clock time; a
    /// `depart_at` that has already passed today means the same time tomorrow.
    pub fn commute_query(&self, now: NaiveDateTime) -> Result<CommuteQuery> {
        let (departure, leave_now) = match self.commute.depart_at.as_deref() {
            Some(at) => {
                let time = parse_clock_time("commute.depart_at", at)?;
                let today = now.date().and_time(time);
                if today >= now {
                    (today, false)
                } else {
                    let tomorrow = today.checked_add_days(Days::new(1)).ok_or_else(|| {
                        PlanError::InvalidConfigValueError {
                            field: "commute.depart_at".to_string(),
                            value: at.to_string(),
                            reason: "no next departure date".to_string(),
                        }
                    })?;
                    tracing::debug!("{} has passed today, planning for {}", at, tomorrow);
                    (tomorrow, false)
                }
            }
            None => (now, true),
        };

        Ok(CommuteQuery {
            origin: self.commute.origin.clone(),
            destination: self.commute.destination.clone(),
            departure,
            leave_now,
        })
    }

    pub fn transit_request(&self, after: NaiveDateTime) -> TransitRequest {
        TransitRequest {
            line: self.transit.line.clone(),
            boarding_stop: self.transit.boarding_stop.clone(),
            alighting_stop: self.transit.alighting_stop.clone(),
            after,
            limit: self.transit.max_departures,
        }
    }

    pub fn timetable_stops(&self) -> Result<Vec<TimetableStop>> {
        let timetable = self
            .timetable
            .as_ref()
            .ok_or_else(|| PlanError::MissingConfigError {
                field: "timetable".to_string(),
            })?;

        timetable
            .stops
            .iter()
            .enumerate()
            .map(|(i, stop)| {
                let scheduled = if stop.scheduled.trim().eq_ignore_ascii_case(NOT_STOPPING) {
                    None
                } else {
                    Some(parse_clock_time(
                        &format!("timetable.stops[{}].scheduled", i),
                        &stop.scheduled,
                    )?)
                };
                Ok(TimetableStop {
                    name: stop.name.clone(),
                    scheduled,
                })
            })
            .collect()
    }

    pub fn validate_commute(&self) -> Result<()> {
        validate_non_empty_string("commute.origin", &self.commute.origin)?;
        validate_non_empty_string("commute.destination", &self.commute.destination)?;
        if let Some(at) = &self.commute.depart_at {
            parse_clock_time("commute.depart_at", at)?;
        }
        Ok(())
    }

    pub fn validate_credentials(&self) -> Result<()> {
        validate_path(
            "credentials.directions_key_file",
            &self.credentials.directions_key_file,
        )?;
        validate_path("credentials.transit_key_file", &self.credentials.transit_key_file)
    }

    pub fn validate_directions(&self) -> Result<()> {
        validate_url("directions.endpoint", &self.directions.endpoint)?;
        validate_non_empty_string("directions.mode", &self.directions.mode)?;
        validate_range(
            "directions.timeout_seconds",
            self.directions.timeout_seconds,
            1,
            120,
        )
    }

    pub fn validate_transit(&self) -> Result<()> {
        validate_url("transit.endpoint", &self.transit.endpoint)?;
        validate_non_empty_string("transit.line", &self.transit.line)?;
        validate_non_empty_string("transit.boarding_stop", &self.transit.boarding_stop)?;
        validate_non_empty_string("transit.alighting_stop", &self.transit.alighting_stop)?;
        validate_range("transit.max_departures", self.transit.max_departures, 1, 50)?;
        validate_range("transit.timeout_seconds", self.transit.timeout_seconds, 1, 120)
    }

    /// A missing `[timetable]` section is only an error for `analyze`.
    pub fn validate_timetable(&self) -> Result<()> {
        if self.timetable.is_none() {
            return Ok(());
        }
        let stops = self.timetable_stops()?;
        match stops.first() {
            None => Err(PlanError::MissingConfigError {
                field: "timetable.stops".to_string(),
            }),
            Some(first) if first.scheduled.is_none() => Err(PlanError::InvalidConfigValueError {
                field: "timetable.stops[0].scheduled".to_string(),
                value: NOT_STOPPING.to_string(),
                reason: "the first stop must be served".to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        self.validate_commute()?;
        self.validate_credentials()?;
        self.validate_directions()?;
        self.validate_transit()?;
        self.validate_timetable()
    }
}

impl Validate for CommuteConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[commute]
origin = "Headington, Oxford, UK"
destination = "Marble Arch, London, UK"

[transit]
endpoint = "https://transit.example.com/departures"
line = "X90"
boarding_stop = "340000006R1"
alighting_stop = "490000147H"
"#;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_basic_config_with_defaults() {
        let config = CommuteConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.commute.origin, "Headington, Oxford, UK");
        assert_eq!(config.directions.endpoint, DEFAULT_DIRECTIONS_ENDPOINT);
        assert_eq!(config.directions.mode, "driving");
        assert_eq!(config.directions.traffic_model, "best_guess");
        assert_eq!(config.directions.timeout_seconds, 10);
        assert_eq!(config.transit.max_departures, 5);
        assert_eq!(
            config.credentials.directions_key_file,
            DEFAULT_DIRECTIONS_KEY_FILE
        );
        assert!(config.timetable.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COMMUTE_TEST_TRANSIT_ENDPOINT", "https://bus.test/api");

        let toml_content = r#"
[commute]
origin = "A"
destination = "B"

[transit]
endpoint = "${COMMUTE_TEST_TRANSIT_ENDPOINT}"
line = "X90"
boarding_stop = "S1"
alighting_stop = "S2"
"#;

        let config = CommuteConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.transit.endpoint, "https://bus.test/api");

        std::env::remove_var("COMMUTE_TEST_TRANSIT_ENDPOINT");
    }

    #[test]
    fn test_unknown_env_var_is_left_verbatim() {
        let toml_content = BASIC.replace(
            "https://transit.example.com/departures",
            "${COMMUTE_TEST_DEFINITELY_UNSET}",
        );
        let config = CommuteConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.transit.endpoint, "${COMMUTE_TEST_DEFINITELY_UNSET}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_commute_query_leave_now_vs_fixed_time() {
        let mut config = CommuteConfig::from_toml_str(BASIC).unwrap();

        let query = config.commute_query(at(7, 42)).unwrap();
        assert!(query.leave_now);
        assert_eq!(query.departure, at(7, 42));

        config.apply_overrides(None, Some("Victoria, London, UK".to_string()), Some("08:15".to_string()));
        let query = config.commute_query(at(7, 42)).unwrap();
        assert!(!query.leave_now);
        assert_eq!(query.departure, at(8, 15));
        assert_eq!(query.destination, "Victoria, London, UK");
    }

    #[test]
    fn test_passed_depart_at_rolls_over_to_tomorrow() {
        let mut config = CommuteConfig::from_toml_str(BASIC).unwrap();
        config.commute.depart_at = Some("07:30".to_string());

        let now = at(9, 0);
        let query = config.commute_query(now).unwrap();
        assert!(!query.leave_now);
        assert!(query.departure >= now);
        assert_eq!(
            query.departure,
            NaiveDate::from_ymd_opt(2026, 10, 16)
                .unwrap()
                .and_hms_opt(7, 30, 0)
                .unwrap()
        );
        assert_eq!(config.transit_request(query.departure).after, query.departure);

        let query = config.commute_query(at(7, 30)).unwrap();
        assert_eq!(query.departure, at(7, 30));
    }

    #[test]
    fn test_invalid_depart_at_is_rejected() {
        let mut config = CommuteConfig::from_toml_str(BASIC).unwrap();
        config.commute.depart_at = Some("quarter past eight".to_string());
        assert!(matches!(
            config.validate(),
            Err(PlanError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_timetable_parsing_and_first_stop_rule() {
        let toml_content = format!(
            r#"{}
[timetable]
line = "X90"
pause_ms = 0

[[timetable.stops]]
name = "Oxford Gloucester Green, Oxford, UK"
scheduled = "07:00"

[[timetable.stops]]
name = "White City, London, UK"
scheduled = "x"

[[timetable.stops]]
name = "London Victoria Coach Station, London, UK"
scheduled = "09:39"
"#,
            BASIC
        );

        let mut config = CommuteConfig::from_toml_str(&toml_content).unwrap();
        let stops = config.timetable_stops().unwrap();
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[0].scheduled, NaiveTime::from_hms_opt(7, 0, 0));
        assert_eq!(stops[1].scheduled, None);
        assert!(config.validate().is_ok());

        if let Some(timetable) = config.timetable.as_mut() {
            timetable.stops[0].scheduled = "x".to_string();
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_directions_only_config_without_transit_section() {
        let toml_content = r#"
[commute]
origin = "Headington, Oxford, UK"
destination = "Marble Arch, London, UK"

[directions]
endpoint = "https://maps.example.com/directions/json"
"#;
        let config = CommuteConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate_commute().is_ok());
        assert!(config.validate_directions().is_ok());
        assert!(config.validate_credentials().is_ok());
        assert_eq!(config.transit.max_departures, 5);
        assert!(matches!(
            config.validate_transit(),
            Err(PlanError::InvalidConfigValueError { .. })
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_timetable_section() {
        let config = CommuteConfig::from_toml_str(BASIC).unwrap();
        assert!(matches!(
            config.timetable_stops(),
            Err(PlanError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = CommuteConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.transit.line, "X90");
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let err = CommuteConfig::from_file("/nonexistent/commute.toml").unwrap_err();
        assert!(matches!(err, PlanError::ConfigError { .. }));
    }

    #[test]
    fn test_example_config_is_valid() {
        std::env::set_var("TRANSIT_DEPARTURES_ENDPOINT", "https://bus.example.com/departures");

        let config =
            CommuteConfig::from_toml_str(include_str!("../../commute.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        let stops = config.timetable_stops().unwrap();
        assert_eq!(stops.len(), 10);
        assert_eq!(stops.iter().filter(|s| s.scheduled.is_none()).count(), 2);

        std::env::remove_var("TRANSIT_DEPARTURES_ENDPOINT");
    }

    #[test]
    fn test_transit_request_uses_configured_line() {
        let config = CommuteConfig::from_toml_str(BASIC).unwrap();
        let request = config.transit_request(at(8, 0));
        assert_eq!(request.line, "X90");
        assert_eq!(request.boarding_stop, "340000006R1");
        assert_eq!(request.limit, 5);
    }
}
