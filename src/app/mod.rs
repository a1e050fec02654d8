// Application layer: wires config, credentials and adapters into the core for each command.

pub mod commands;

pub use commands::{run, run_analyze, run_check, run_directions, run_plan};
