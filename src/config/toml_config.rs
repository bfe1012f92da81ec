use crate::domain::model::ServiceOffer;
use crate::utils::error::{OutreachError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_required_field, validate_url, Validate,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

static ENV_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex is valid"));

/// outreach.toml 的完整內容，每個區段都可省略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    pub campaign: CampaignConfig,
    pub llm: LlmConfig,
    pub smtp: SmtpConfig,
    pub rate_limit: RateLimitConfig,
    pub research: ResearchConfig,
    pub message: MessageConfig,
    pub tracker: TrackerConfig,
    #[serde(default = "default_offers")]
    pub offers: Vec<ServiceOffer>,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            campaign: CampaignConfig::default(),
            llm: LlmConfig::default(),
            smtp: SmtpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            research: ResearchConfig::default(),
            message: MessageConfig::default(),
            tracker: TrackerConfig::default(),
            offers: default_offers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    pub name: String,
    pub description: Option<String>,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            name: "outreach".to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender_name: String,
    /// 空白時使用 username
    pub sender_email: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            sender_name: String::new(),
            sender_email: String::new(),
        }
    }
}

impl SmtpConfig {
    pub fn from_address(&self) -> &str {
        if self.sender_email.trim().is_empty() {
            &self.username
        } else {
            &self.sender_email
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub daily_email_limit: u32,
    pub delay_between_emails_secs: u64,
    pub delay_between_scrapes_secs: u64,
    pub step_delay_secs: u64,
    pub tracking_file: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            daily_email_limit: 50,
            delay_between_emails_secs: 5,
            delay_between_scrapes_secs: 2,
            step_delay_secs: 1,
            tracking_file: "data/email_tracking.json".to_string(),
        }
    }
}

impl RateLimitConfig {
    pub fn delay_between_emails(&self) -> Duration {
        Duration::from_secs(self.delay_between_emails_secs)
    }

    pub fn delay_between_scrapes(&self) -> Duration {
        Duration::from_secs(self.delay_between_scrapes_secs)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_secs(self.step_delay_secs)
    }

    /// 測試與 dry-run 用，不等待
    pub fn without_delays(mut self) -> Self {
        self.delay_between_emails_secs = 0;
        self.delay_between_scrapes_secs = 0;
        self.step_delay_secs = 0;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Number of the five quality checks that must hold before a message is drafted.
    pub min_quality_checks: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            min_quality_checks: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub signature: Option<String>,
    pub strategies_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub enabled: bool,
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    pub access_token: Option<String>,
    pub base_url: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spreadsheet_id: None,
            sheet_name: "Sheet1".to_string(),
            access_token: None,
            base_url: "https://sheets.googleapis.com".to_string(),
        }
    }
}

pub fn default_offers() -> Vec<ServiceOffer> {
    let offer = |name: &str, description: &str, best_for: &[&str], cta: &str| ServiceOffer {
        name: name.to_string(),
        description: description.to_string(),
        best_for: best_for.iter().map(|s| s.to_string()).collect(),
        cta: cta.to_string(),
        fit_rationale: None,
    };

    vec![
        offer(
            "Rhyka MRP",
            "Material requirements planning for manufacturers: inventory, production scheduling and purchasing in one place",
            &["manufacturing", "distribution", "operations-heavy companies"],
            "Want to see a 10-minute walkthrough?",
        ),
        offer(
            "AI Consulting",
            "Hands-on help finding and shipping AI automation for repetitive business workflows",
            &["professional services", "small and mid-size businesses", "agencies"],
            "Open to a quick call to compare notes?",
        ),
        offer(
            "GovCon Optimization",
            "Tooling that speeds up government contract discovery, compliance checks and proposal drafting",
            &["government contractors", "defense", "public sector vendors"],
            "Worth a short chat about your pipeline?",
        ),
        offer(
            "Steward Voting AI",
            "AI research assistant for proxy voting and stewardship teams",
            &["asset managers", "pension funds", "ESG teams"],
            "Want to see what we built?",
        ),
    ]
}

impl OutreachConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OutreachError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，空白欄位再以環境變數補上
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| OutreachError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.apply_env_fallbacks();
        Ok(config)
    }

    /// 沒有設定檔時，只靠環境變數
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_fallbacks();
        config
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})，未設定者保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    fn apply_env_fallbacks(&mut self) {
        fill_from_env(&mut self.llm.api_key, "OPENAI_API_KEY");
        fill_from_env(&mut self.smtp.username, "GMAIL_EMAIL");
        fill_from_env(&mut self.smtp.password, "GMAIL_APP_PASSWORD");
        fill_from_env(&mut self.smtp.sender_name, "SENDER_NAME");

        if let Ok(limit) = std::env::var("DAILY_EMAIL_LIMIT") {
            match limit.trim().parse::<u32>() {
                Ok(limit) => self.rate_limit.daily_email_limit = limit,
                Err(_) => tracing::warn!("⚠️ Ignoring non-numeric DAILY_EMAIL_LIMIT '{}'", limit),
            }
        }
        if self.offers.is_empty() {
            self.offers = default_offers();
        }
    }

    pub fn offer_names(&self) -> Vec<String> {
        self.offers.iter().map(|o| o.name.clone()).collect()
    }
}

/// 未替換的 ${VAR} 視同空白
fn fill_from_env(field: &mut String, var: &str) {
    let unresolved = field.trim().is_empty() || ENV_VAR_RE.is_match(field);
    if unresolved {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => *field = value,
            _ if ENV_VAR_RE.is_match(field) => field.clear(),
            _ => {}
        }
    }
}

impl Validate for OutreachConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("llm.api_key", &self.llm.api_key)?;
        validate_non_empty_string("llm.model", &self.llm.model)?;
        validate_url("llm.base_url", &self.llm.base_url)?;
        validate_positive_number("llm.timeout_seconds", self.llm.timeout_seconds as usize, 1)?;

        validate_non_empty_string("smtp.host", &self.smtp.host)?;
        validate_range("smtp.port", self.smtp.port, 1, u16::MAX)?;

        validate_positive_number(
            "rate_limit.daily_email_limit",
            self.rate_limit.daily_email_limit as usize,
            1,
        )?;
        validate_path("rate_limit.tracking_file", &self.rate_limit.tracking_file)?;
        validate_range("research.min_quality_checks", self.research.min_quality_checks, 0, 5)?;

        if self.offers.is_empty() {
            return Err(OutreachError::ConfigValidationError {
                field: "offers".to_string(),
                message: "at least one offer is required".to_string(),
            });
        }
        for (i, offer) in self.offers.iter().enumerate() {
            validate_non_empty_string(&format!("offers[{}].name", i), &offer.name)?;
        }

        if self.tracker.enabled {
            let id = validate_required_field("tracker.spreadsheet_id", &self.tracker.spreadsheet_id)?;
            validate_non_empty_string("tracker.spreadsheet_id", id)?;
            let token = validate_required_field("tracker.access_token", &self.tracker.access_token)?;
            validate_non_empty_string("tracker.access_token", token)?;
            validate_non_empty_string("tracker.sheet_name", &self.tracker.sheet_name)?;
            validate_url("tracker.base_url", &self.tracker.base_url)?;
        }

        Ok(())
    }
}
