use clap::Parser;
use outreach_etl::core::input::extract_company_name;
use outreach_etl::domain::model::Prospect;
use outreach_etl::utils::logger::{self, LogMode};
use outreach_etl::utils::validation::Validate;
use outreach_etl::{OutreachConfig, OutreachError, OutreachRunner};
use tracing::Instrument;

#[derive(Debug, Parser)]
#[command(name = "single-outreach")]
#[command(about = "Research, draft and send one outreach email")]
struct SingleArgs {
    name: String,
    email: String,
    linkedin_url: String,
    company_url: String,

    #[arg(long, help = "Path to outreach.toml (defaults to environment variables)")]
    config: Option<String>,

    #[arg(long, help = "Draft the message without sending it")]
    dry_run: bool,

    #[arg(long)]
    verbose: bool,
}

async fn run(args: SingleArgs) -> outreach_etl::Result<bool> {
    let config = match &args.config {
        Some(path) => OutreachConfig::from_file(path)?,
        None => OutreachConfig::from_env(),
    };
    config.validate()?;

    let mut prospect = Prospect::new(
        args.name,
        args.email,
        Some(args.linkedin_url),
        Some(args.company_url),
        None,
    )?;
    let company_url = prospect.company_domain.clone().unwrap_or_default();
    prospect.company = Some(extract_company_name(&company_url));

    println!("🚀 STARTING OUTREACH FOR: {}", prospect.name);
    println!("📧 Email: {}", prospect.email);
    println!("🔗 LinkedIn: {}", prospect.linkedin_url.as_deref().unwrap_or_default());
    println!("🌐 Company: {} ({})", prospect.company_or_unknown(), company_url);
    println!("{}", "=".repeat(60));

    let runner = OutreachRunner::bootstrap(&config, args.dry_run).await?;
    let name = prospect.name.clone();
    let outcome = runner.process_prospects(vec![prospect], None).await;

    println!("\n{}", "=".repeat(60));
    let snapshot = runner.quota().snapshot().await;
    if outcome.sent_count() > 0 {
        println!("✅ SUCCESS: Email sent to {}", name);
        println!("📊 Daily total: {}/{}", snapshot.sent_today, snapshot.limit);
        println!("📈 {} emails remaining today", snapshot.remaining);
    } else if !outcome.deferred.is_empty() {
        println!("⏳ Daily limit of {} reached, {} not contacted", snapshot.limit, name);
    } else {
        println!("❌ FAILED: Could not send email to {}", name);
        match outcome.results.first().and_then(|r| r.error.as_deref()) {
            Some(error) => println!("📝 Error: {}", error),
            None => println!("📝 Skipped, see the log for the reason"),
        }
    }

    Ok(outcome.sent_count() > 0)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = SingleArgs::parse();
    logger::init(LogMode::Cli {
        verbose: args.verbose,
    });

    let span = logger::run_span(&args.email, args.dry_run);
    match run(args).instrument(span).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => report(&e),
    }
}

fn report(e: &OutreachError) {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    match e.fatal_exit_code() {
        Some(code) => {
            tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
            std::process::exit(code);
        }
        None => tracing::warn!("⚠️ {}", e),
    }
}
