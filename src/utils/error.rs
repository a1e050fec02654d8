use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Credential file {path} could not be used: {reason}")]
    CredentialFileError { path: String, reason: String },

    #[error("{provider} rejected the credentials: {message}")]
    AuthenticationError { provider: String, message: String },

    #[error("Could not reach {provider}: {source}")]
    NetworkError {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an error{}: {message}", http_status_suffix(.status))]
    ProviderError {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Cannot assemble commute plan: {message}")]
    AssemblyError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Network,
    Provider,
    Assembly,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PlanError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn assembly(message: impl Into<String>) -> Self {
        Self::AssemblyError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::CredentialFileError { .. } => ErrorCategory::Configuration,
            Self::AuthenticationError { .. } => ErrorCategory::Authentication,
            Self::NetworkError { .. } => ErrorCategory::Network,
            Self::ProviderError { .. } => ErrorCategory::Provider,
            Self::AssemblyError { .. } => ErrorCategory::Assembly,
            Self::IoError(_) | Self::SerializationError(_) | Self::CsvError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Provider => ErrorSeverity::Medium,
            ErrorCategory::Assembly => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit status for a run that failed with this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Authentication => 3,
            ErrorCategory::Network => 4,
            ErrorCategory::Provider => 5,
            ErrorCategory::Assembly => 6,
            ErrorCategory::System => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingConfigError { field } => {
                format!("Required setting '{}' is not configured", field)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            Self::CredentialFileError { path, .. } => {
                format!("Could not read credentials from {}", path)
            }
            Self::AuthenticationError { provider, .. } => {
                format!("{} did not accept your API key", provider)
            }
            Self::NetworkError { provider, .. } => {
                format!("{} is unreachable right now", provider)
            }
            Self::ProviderError { provider, message, .. } => {
                format!("{} could not answer the request: {}", provider, message)
            }
            Self::AssemblyError { message } => format!("No commute plan could be built: {}", message),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the config file and make sure both API key files exist and are readable"
            }
            ErrorCategory::Authentication => {
                "Verify the API key is valid and that the API is enabled for it"
            }
            ErrorCategory::Network => "Check your internet connection and try again",
            ErrorCategory::Provider => {
                "Check the origin, destination and stop identifiers, then try again later"
            }
            ErrorCategory::Assembly => {
                "The providers returned incomplete data; try a different departure time"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

fn http_status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (HTTP {})", code))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, PlanError>;
