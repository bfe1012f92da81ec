use crate::domain::model::{
    BatchOutcome, CampaignResult, DailyStats, OutreachMessage, Prospect, TrackingEntry,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum InputFormat {
    /// Header row: Name, Email, LinkedIn URL, Company Domain, Phone
    Csv,
    /// One prospect per line, tab or comma separated
    Manual,
    /// Sales-intelligence export (First Name, Last Name, Email, ...)
    Apollo,
}

/// Per-run parameters for a batch: where prospects come from and where the report goes.
pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn input_format(&self) -> InputFormat;
    fn output_path(&self) -> &str;
    fn limit(&self) -> Option<usize>;
    fn start_row(&self) -> usize;
    fn test_email(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Prospect>>;
    async fn transform(&self, prospects: Vec<Prospect>) -> Result<BatchOutcome>;
    async fn load(&self, outcome: BatchOutcome) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.3,
            max_tokens: 300,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A chat-completion language model. Returns the assistant reply text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// Outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// False when the transport has no usable credentials.
    fn is_configured(&self) -> bool {
        true
    }

    async fn deliver(&self, message: &OutreachMessage) -> Result<()>;
}

/// Remote log of every processed prospect. Implementations must not fail the pipeline.
#[async_trait]
pub trait CampaignTracker: Send + Sync {
    async fn record(&self, entry: TrackingEntry);

    /// `None` when the backend keeps no readable log.
    async fn daily_stats(&self, _today: NaiveDate) -> Option<DailyStats> {
        None
    }
}

/// Called once for every result a batch produces.
pub type ProgressFn = Arc<dyn Fn(&CampaignResult) + Send + Sync>;

/// Runs one batch of prospects end to end.
#[async_trait]
pub trait CampaignRunner: Send + Sync {
    async fn run_campaign(&self, prospects: Vec<Prospect>, progress: Option<ProgressFn>) -> BatchOutcome;
}
