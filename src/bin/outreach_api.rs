use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use outreach_etl::api::{self, AppState};
use outreach_etl::utils::logger::{self, LogMode};
use outreach_etl::utils::validation::Validate;
use outreach_etl::{OutreachConfig, OutreachRunner};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "outreach-api")]
#[command(about = "HTTP job API for outreach campaigns")]
struct ServerArgs {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value = "8000")]
    port: u16,

    #[arg(long, help = "Path to outreach.toml (defaults to environment variables)")]
    config: Option<String>,

    #[arg(long, default_value = "4")]
    workers: usize,
}

fn config_error(e: outreach_etl::OutreachError) -> std::io::Error {
    error!("❌ {}", e.user_friendly_message());
    error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();
    let args = ServerArgs::parse();

    logger::init(LogMode::Server);
    info!("Starting outreach API...");

    let config = match &args.config {
        Some(path) => OutreachConfig::from_file(path).map_err(config_error)?,
        None => OutreachConfig::from_env(),
    };
    config.validate().map_err(config_error)?;

    let runner = Arc::new(
        OutreachRunner::bootstrap(&config, false)
            .await
            .map_err(config_error)?,
    );
    let quota = runner.quota().clone();
    let snapshot = quota.snapshot().await;
    info!(
        "📊 Daily quota: {}/{} sent, {} remaining",
        snapshot.sent_today, snapshot.limit, snapshot.remaining
    );

    let tracker = runner.tracker().clone();
    let app_state = AppState::new(runner, quota, tracker, Arc::new(config));

    info!("Starting HTTP server on {}:{}", args.host, args.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(api::json_config())
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(api::configure)
    })
    .workers(args.workers)
    .bind((args.host, args.port))?
    .run()
    .await
}
