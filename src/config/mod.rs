pub mod cli;
pub mod credentials;
pub mod toml_config;

pub use cli::CliConfig;
pub use credentials::KeyFileCredentials;
pub use toml_config::CommuteConfig;
