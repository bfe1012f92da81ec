use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutreachError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

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

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Input error: {message}")]
    InputError { message: String },

    #[error("LLM API error (status {status}): {message}")]
    LlmApiError { status: u16, message: String },

    #[error("LLM rate limited (retry after {retry_after:?}s)")]
    LlmRateLimited { retry_after: Option<u64> },

    #[error("LLM returned an unusable reply: {message}")]
    LlmResponseError { message: String },

    #[error("Mail delivery failed: {message}")]
    MailError { message: String },

    #[error("Daily email limit reached ({limit})")]
    QuotaExhausted { limit: u32 },

    #[error("Tracker error: {message}")]
    TrackerError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    ExternalService,
    Delivery,
    Quota,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OutreachError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::InputError { .. } | Self::CsvError(_) | Self::ValidationError { .. } => {
                ErrorCategory::Input
            }
            Self::HttpError(_) => ErrorCategory::Network,
            Self::LlmApiError { .. }
            | Self::LlmRateLimited { .. }
            | Self::LlmResponseError { .. }
            | Self::TrackerError { .. } => ErrorCategory::ExternalService,
            Self::MailError { .. } => ErrorCategory::Delivery,
            Self::QuotaExhausted { .. } => ErrorCategory::Quota,
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::Storage,
            Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 額度用完不是錯誤，明天再跑即可
            Self::QuotaExhausted { .. } => ErrorSeverity::Low,
            Self::TrackerError { .. } => ErrorSeverity::Low,
            Self::HttpError(_)
            | Self::LlmApiError { .. }
            | Self::LlmRateLimited { .. }
            | Self::MailError { .. } => ErrorSeverity::Medium,
            Self::InputError { .. }
            | Self::CsvError(_)
            | Self::ValidationError { .. }
            | Self::LlmResponseError { .. }
            | Self::SerializationError(_)
            | Self::ProcessingError { .. } => ErrorSeverity::High,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. }
            | Self::IoError(_)
            | Self::ZipError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check outreach.toml and the referenced environment variables"
            }
            ErrorCategory::Input => {
                "Check the input file: each prospect needs at least a name and a valid email"
            }
            ErrorCategory::Network => "Check network connectivity and try again",
            ErrorCategory::ExternalService => {
                "Check the API key and provider status, then retry later"
            }
            ErrorCategory::Delivery => {
                "Check SMTP credentials (use an app password for Gmail) and the sender address"
            }
            ErrorCategory::Quota => "The daily send limit is reached; resume tomorrow",
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
            ErrorCategory::Processing => "Re-run with --verbose to see which step failed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::QuotaExhausted { limit } => {
                format!("Daily email limit of {} reached, nothing more will be sent today", limit)
            }
            Self::MissingConfigError { field } => {
                format!("Required setting '{}' is missing", field)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            Self::InputError { message } => format!("Could not read prospects: {}", message),
            other => other.to_string(),
        }
    }

    /// 供 CLI 決定結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    /// 非零才需要中止程序，Low 等級只記警告後正常結束
    pub fn fatal_exit_code(&self) -> Option<i32> {
        Some(self.exit_code()).filter(|code| *code != 0)
    }
}

impl From<lettre::error::Error> for OutreachError {
    fn from(e: lettre::error::Error) -> Self {
        Self::MailError {
            message: e.to_string(),
        }
    }
}

impl From<lettre::transport::smtp::Error> for OutreachError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        Self::MailError {
            message: e.to_string(),
        }
    }
}

impl From<lettre::address::AddressError> for OutreachError {
    fn from(e: lettre::address::AddressError) -> Self {
        Self::MailError {
            message: format!("invalid address: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, OutreachError>;
