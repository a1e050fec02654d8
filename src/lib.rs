pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::config::{CliConfig, CommuteConfig, KeyFileCredentials};
pub use crate::core::{
    assembler::assemble_plan, planner::CommutePlanner, timetable::TimetableAnalyzer,
};
pub use crate::utils::error::{PlanError, Result};
