pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::domain::ports::{ConfigProvider, InputFormat};
#[cfg(feature = "cli")]
use clap::Parser;

pub use toml_config::OutreachConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "outreach-etl")]
#[command(about = "Research prospects, draft personalized cold emails and send them within a daily quota")]
pub struct CliConfig {
    /// Prospect file relative to the current directory, or "-" for stdin
    pub input: String,

    #[arg(long, value_enum, default_value = "csv")]
    pub format: InputFormat,

    #[arg(long, help = "Path to outreach.toml (defaults to environment variables)")]
    pub config: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, help = "Process at most this many prospects from the input")]
    pub limit: Option<usize>,

    #[arg(long, default_value = "0", help = "Skip this many data rows (Apollo exports)")]
    pub start_row: usize,

    #[arg(long, help = "Send every email to this address instead of the prospect")]
    pub test_email: Option<String>,

    #[arg(long, help = "Override rate_limit.daily_email_limit")]
    pub daily_limit: Option<u32>,

    #[arg(long, help = "Draft messages without sending or touching the quota file")]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn input_format(&self) -> InputFormat {
        self.format
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }

    fn start_row(&self) -> usize {
        self.start_row
    }

    fn test_email(&self) -> Option<&str> {
        self.test_email.as_deref()
    }
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        use crate::utils::validation::{validate_email, validate_path, validate_positive_number};

        validate_path("input", &self.input)?;
        validate_path("output_path", &self.output_path)?;
        if let Some(limit) = self.limit {
            validate_positive_number("limit", limit, 1)?;
        }
        if let Some(limit) = self.daily_limit {
            validate_positive_number("daily_limit", limit as usize, 1)?;
        }
        if let Some(email) = &self.test_email {
            validate_email("test_email", email)?;
        }
        Ok(())
    }
}
