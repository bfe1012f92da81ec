use clap::Parser;
use outreach_etl::utils::logger::{self, LogMode};
use outreach_etl::utils::validation::Validate;
use outreach_etl::{
    CliConfig, LocalStorage, OutreachConfig, OutreachEngine, OutreachError, OutreachPipeline,
    OutreachRunner, RunSummary,
};
use std::sync::Arc;
use tracing::Instrument;

fn load_config(cli: &CliConfig) -> outreach_etl::Result<OutreachConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("📄 Loading configuration from {}", path);
            OutreachConfig::from_file(path)?
        }
        None => OutreachConfig::from_env(),
    };
    if let Some(limit) = cli.daily_limit {
        config.rate_limit.daily_email_limit = limit;
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: CliConfig) -> outreach_etl::Result<RunSummary> {
    cli.validate()?;
    let config = load_config(&cli)?;
    let runner = Arc::new(OutreachRunner::bootstrap(&config, cli.dry_run).await?);

    let storage = LocalStorage::new(".".to_string());
    let pipeline = OutreachPipeline::new(storage, cli, runner);
    OutreachEngine::new(pipeline).run().await
}

/// 只有非零結束碼才中止程序
fn finish_with(e: &OutreachError) {
    let Some(code) = e.fatal_exit_code() else {
        tracing::warn!("⚠️ {} ({:?})", e, e.category());
        eprintln!("⚠️ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        return;
    };

    tracing::error!(
        "❌ Outreach run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(code);
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init(LogMode::Cli {
        verbose: cli.verbose,
    });
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let span = logger::run_span(&cli.input, cli.dry_run);
    let result = async {
        tracing::info!("Starting outreach-etl");
        run(cli).await
    }
    .instrument(span)
    .await;

    match result {
        Ok(summary) => {
            println!("✅ Outreach run completed!");
            println!(
                "📨 Sent {} / processed {} (failed or skipped {}, deferred {})",
                summary.sent, summary.processed, summary.failed, summary.deferred
            );
            println!("📁 Report saved to: {}", summary.report_path);
            if summary.deferred > 0 {
                println!("⏳ Daily limit reached. Re-run deferred.csv from the report tomorrow.");
            }
        }
        Err(e) => finish_with(&e),
    }
}
