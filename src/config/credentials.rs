use crate::config::toml_config::CredentialsConfig;
use crate::domain::model::Credentials;
use crate::domain::ports::CredentialSource;
use crate::utils::error::{PlanError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads both API keys from files on disk.
#[derive(Debug, Clone)]
pub struct KeyFileCredentials {
    directions_key_path: PathBuf,
    transit_key_path: PathBuf,
}

impl KeyFileCredentials {
    pub fn new(directions_key_path: impl Into<PathBuf>, transit_key_path: impl Into<PathBuf>) -> Self {
        Self {
            directions_key_path: directions_key_path.into(),
            transit_key_path: transit_key_path.into(),
        }
    }

    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self::new(
            expand_home(&config.directions_key_file),
            expand_home(&config.transit_key_file),
        )
    }

    pub fn load_directions_key(&self) -> Result<String> {
        read_api_key(&self.directions_key_path)
    }

    pub fn load_transit_key(&self) -> Result<String> {
        read_api_key(&self.transit_key_path)
    }
}

impl CredentialSource for KeyFileCredentials {
    fn load(&self) -> Result<Credentials> {
        let directions_api_key = self.load_directions_key()?;
        let transit_api_key = self.load_transit_key()?;
        tracing::debug!(
            "Loaded credentials from {} and {}",
            self.directions_key_path.display(),
            self.transit_key_path.display()
        );

        Ok(Credentials {
            directions_api_key,
            transit_api_key,
        })
    }
}

impl CredentialSource for Credentials {
    fn load(&self) -> Result<Credentials> {
        Ok(self.clone())
    }
}

/// Expands a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// A key file holds either the bare key or a JSON object with an `api_key`
/// (or `key`) string field.
pub fn read_api_key(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| PlanError::CredentialFileError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    parse_api_key(&content).map_err(|reason| PlanError::CredentialFileError {
        path: path.display().to_string(),
        reason,
    })
}

fn parse_api_key(content: &str) -> std::result::Result<String, String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("file is empty".to_string());
    }

    if trimmed.starts_with('{') {
        let document: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON: {}", e))?;
        let key = ["api_key", "key"]
            .iter()
            .find_map(|field| document.get(*field).and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|key| !key.is_empty());

        return match key {
            Some(key) => Ok(key.to_string()),
            None => Err("JSON document has no non-empty \"api_key\" or \"key\" field".to_string()),
        };
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err("key must be a single token".to_string());
    }

    Ok(trimmed.to_string())
}
