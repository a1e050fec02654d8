use crate::adapters::{BusDataClient, GoogleDirectionsClient};
use crate::config::cli::{AnalyzeArgs, CliConfig, Command};
use crate::config::{CommuteConfig, KeyFileCredentials};
use crate::core::planner::CommutePlanner;
use crate::core::presenter::{render_directions, render_plan, render_report, OutputFormat};
use crate::core::timetable::TimetableAnalyzer;
use crate::domain::ports::{CredentialSource, DirectionsProvider};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use chrono::{Local, NaiveDateTime};
use std::time::Duration;

/// Loads the config named on the command line and runs the selected command.
/// Returns the text to print on stdout.
pub async fn run(cli: &CliConfig) -> Result<String> {
    let config_path = cli.config.clone().unwrap_or_else(CommuteConfig::default_path);
    tracing::info!("📁 Loading configuration from: {}", config_path.display());

    let mut config = CommuteConfig::from_file(&config_path)?;
    let now = Local::now().naive_local();

    match cli.command() {
        Command::Plan(args) => {
            config.apply_overrides(args.route.origin, args.route.destination, args.at);
            config.validate()?;
            let credentials = KeyFileCredentials::from_config(&config.credentials);
            run_plan(&config, &credentials, now, args.format).await
        }
        Command::Directions(args) => {
            config.apply_overrides(args.origin, args.destination, None);
            config.validate_commute()?;
            config.validate_credentials()?;
            config.validate_directions()?;
            let api_key = KeyFileCredentials::from_config(&config.credentials).load_directions_key()?;
            run_directions(&config, api_key, now).await
        }
        Command::Analyze(args) => {
            config.validate_credentials()?;
            config.validate_directions()?;
            config.validate_timetable()?;
            let api_key = KeyFileCredentials::from_config(&config.credentials).load_directions_key()?;
            let client = GoogleDirectionsClient::new(&config.directions, api_key)?;
            run_analyze(&config, client, &args, now).await
        }
        Command::Check => {
            let credentials = KeyFileCredentials::from_config(&config.credentials);
            run_check(&config, &credentials)
        }
    }
}

pub async fn run_plan<C: CredentialSource>(
    config: &CommuteConfig,
    credentials: &C,
    now: NaiveDateTime,
    format: OutputFormat,
) -> Result<String> {
    let credentials = credentials.load()?;
    let query = config.commute_query(now)?;

    let directions = GoogleDirectionsClient::new(&config.directions, credentials.directions_api_key)?;
    let transit = BusDataClient::new(&config.transit, credentials.transit_api_key)?;
    let planner = CommutePlanner::new(directions, transit);

    let plan = planner
        .plan(&query, &config.transit_request(query.departure))
        .await?;
    render_plan(&plan, format)
}

pub async fn run_directions(
    config: &CommuteConfig,
    api_key: String,
    now: NaiveDateTime,
) -> Result<String> {
    let query = config.commute_query(now)?;
    let client = GoogleDirectionsClient::new(&config.directions, api_key)?;

    tracing::info!(
        "Making API call from '{}' to '{}'...",
        query.origin,
        query.destination
    );
    let result = client.directions(&query).await?;
    Ok(render_directions(&result))
}

pub async fn run_analyze<D: DirectionsProvider>(
    config: &CommuteConfig,
    directions: D,
    args: &AnalyzeArgs,
    now: NaiveDateTime,
) -> Result<String> {
    let stops = config.timetable_stops()?;
    let timetable = config.timetable.as_ref();
    let pause_ms = args
        .pause_ms
        .or_else(|| timetable.map(|t| t.pause_ms))
        .unwrap_or_default();
    let line = timetable
        .and_then(|t| t.line.clone())
        .or_else(|| Some(config.transit.line.clone()).filter(|l| !l.is_empty()));

    let analyzer = TimetableAnalyzer::new(directions, Duration::from_millis(pause_ms));
    let report = analyzer.analyze(line, &stops, now).await?;
    render_report(&report, args.format)
}

pub fn run_check<C: CredentialSource>(config: &CommuteConfig, credentials: &C) -> Result<String> {
    config.validate()?;
    credentials.load()?;

    let mut lines = vec![
        "✅ Configuration is valid".to_string(),
        format!(
            "Commute: {} -> {}",
            config.commute.origin, config.commute.destination
        ),
        format!(
            "Bus line {}: {} -> {}",
            config.transit.line, config.transit.boarding_stop, config.transit.alighting_stop
        ),
        "Credentials: both key files readable".to_string(),
    ];
    if let Some(timetable) = &config.timetable {
        lines.push(format!("Timetable: {} stops", timetable.stops.len()));
    }
    Ok(lines.join("\n"))
}
