use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// 日誌輸出模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// 終端機，精簡單行
    Cli { verbose: bool },
    /// HTTP 服務，每筆一行 JSON
    Server,
}

impl LogMode {
    /// RUST_LOG 未設定時的過濾規則
    pub fn default_directives(self) -> &'static str {
        match self {
            LogMode::Cli { verbose: true } => "outreach_etl=debug,single_outreach=debug,info",
            LogMode::Cli { verbose: false } => "outreach_etl=info,single_outreach=info,warn",
            LogMode::Server => "outreach_etl=info,outreach_api=info,actix_web=info,warn",
        }
    }
}

pub fn init(mode: LogMode) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(mode.default_directives()));

    // CLI 只顯示訊息與 span 欄位，server 模式保留目前 span 供集中查詢
    let (compact, json) = match mode {
        LogMode::Cli { .. } => (Some(fmt::layer().with_target(false).compact()), None),
        LogMode::Server => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            ),
        ),
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(compact)
        .with(json)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logger already installed");
    }
}

/// One CLI invocation. `run_id` ties every line of a batch together.
pub fn run_span(source: &str, dry_run: bool) -> Span {
    let id = Uuid::new_v4().simple().to_string();
    let run_id = &id[..8];
    tracing::info_span!("run", run_id = %run_id, source = %source, dry_run)
}

/// A background campaign started through the API.
pub fn campaign_span(campaign_id: &Uuid, name: &str) -> Span {
    tracing::info_span!("campaign", campaign_id = %campaign_id, name = %name)
}

pub fn prospect_span(position: usize, email: &str) -> Span {
    tracing::info_span!("prospect", position, email = %email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for mode in [
            LogMode::Cli { verbose: true },
            LogMode::Cli { verbose: false },
            LogMode::Server,
        ] {
            assert!(EnvFilter::try_new(mode.default_directives()).is_ok());
        }
        assert!(LogMode::Cli { verbose: true }
            .default_directives()
            .starts_with("outreach_etl=debug"));
        assert!(LogMode::Server.default_directives().contains("actix_web=info"));
    }

    #[test]
    fn test_spans_carry_identifying_fields() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let id = Uuid::new_v4();
            let campaign = campaign_span(&id, "Spring push");
            let meta = campaign.metadata().unwrap();
            assert_eq!(meta.name(), "campaign");
            assert!(meta.fields().field("campaign_id").is_some());
            assert!(meta.fields().field("name").is_some());

            let run = run_span("prospects.csv", true);
            let meta = run.metadata().unwrap();
            assert_eq!(meta.name(), "run");
            assert!(meta.fields().field("run_id").is_some());
            assert!(meta.fields().field("dry_run").is_some());

            let prospect = prospect_span(3, "ann@lee.io");
            assert!(prospect.metadata().unwrap().fields().field("email").is_some());
        });
    }
}
