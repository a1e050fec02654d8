use crate::core::presenter::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "commute-plan")]
#[command(about = "Compare driving and bus options for a daily commute")]
#[command(version)]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build a commute plan (default)
    Plan(PlanArgs),

    /// Query the directions provider once and print the route
    Directions(RouteArgs),

    /// Predict arrival times along the configured bus timetable
    Analyze(AnalyzeArgs),

    /// Validate the configuration and credential files without calling any provider
    Check,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RouteArgs {
    /// Override the configured origin
    #[arg(long)]
    pub origin: Option<String>,

    /// Override the configured destination
    #[arg(long)]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub route: RouteArgs,

    /// Departure time today (HH:MM); defaults to now
    #[arg(long)]
    pub at: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Default, Args)]
pub struct AnalyzeArgs {
    /// Override the pause between provider calls, in milliseconds
    #[arg(long)]
    pub pause_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl CliConfig {
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Plan(PlanArgs::default()))
    }
}
