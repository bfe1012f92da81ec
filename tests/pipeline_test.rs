use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::Parser;
use httpmock::prelude::*;
use outreach_etl::config::toml_config::OutreachConfig;
use outreach_etl::core::QuotaCounter;
use outreach_etl::domain::model::OutreachMessage;
use outreach_etl::domain::ports::Mailer;
use outreach_etl::llm::OpenAiClient;
use outreach_etl::tracker::NullTracker;
use outreach_etl::utils::clock::fixed_clock;
use outreach_etl::{
    CliConfig, LocalStorage, OutreachEngine, OutreachError, OutreachPipeline, OutreachRunner,
};
use serde_json::json;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const TRIGGERS: &str = r#"{"trigger": "Launched a second warehouse in February 2025",
    "challenge": "Manual pick lists take 30 hours a week", "opportunity": "Pick lists generated in minutes"}"#;

#[derive(Default)]
struct InboxMailer {
    inbox: Mutex<Vec<OutreachMessage>>,
}

#[async_trait]
impl Mailer for InboxMailer {
    async fn deliver(&self, message: &OutreachMessage) -> outreach_etl::Result<()> {
        self.inbox.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct RejectingMailer;

#[async_trait]
impl Mailer for RejectingMailer {
    async fn deliver(&self, _: &OutreachMessage) -> outreach_etl::Result<()> {
        Err(OutreachError::MailError {
            message: "550 mailbox unavailable".to_string(),
        })
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

/// Chat endpoint that answers the research, relevance and offer prompts.
/// Anything else gets a 404 and falls back.
async fn llm_server() -> MockServer {
    let server = MockServer::start_async().await;
    let replies = [
        ("Trigger:", "8"),
        ("company website news pages", "Hired 4 pickers in March 2025"),
        ("NO GENERIC PAIN POINTS", TRIGGERS),
        (
            "MY AVAILABLE OFFERS",
            r#"{"name": "Rhyka MRP", "rationale": "Warehouse planning"}"#,
        ),
    ];
    for (needle, reply) in replies {
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .body_contains(needle);
                then.status(200).json_body(completion(reply));
            })
            .await;
    }
    server
}

fn config() -> OutreachConfig {
    let mut config = OutreachConfig::default();
    config.rate_limit = config.rate_limit.without_delays();
    config.message.signature = Some("Sam".to_string());
    config
}

async fn runner(
    server: &MockServer,
    mailer: Arc<dyn Mailer>,
    quota_file: &Path,
    limit: u32,
) -> OutreachRunner {
    let clock = fixed_clock(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap());
    let quota = QuotaCounter::load_with_clock(Some(quota_file.to_path_buf()), limit, clock.clone()).await;
    let model = OpenAiClient::with_base_url("test-key".into(), "gpt-4".into(), server.base_url());

    OutreachRunner::with_clock(
        &config(),
        Arc::new(model),
        mailer,
        Arc::new(NullTracker),
        Arc::new(quota),
        clock,
    )
    .await
    .unwrap()
}

fn read_entry(zip_path: &Path, name: &str) -> Option<String> {
    let file = std::fs::File::open(zip_path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).ok()?;
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    Some(content)
}

fn cli(dir: &TempDir, input: &str, extra: &[&str]) -> CliConfig {
    let output = dir.path().join("out");
    let mut args = vec![
        "outreach-etl".to_string(),
        dir.path().join(input).to_string_lossy().to_string(),
        "--output-path".to_string(),
        output.to_string_lossy().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    CliConfig::parse_from(args)
}

#[tokio::test]
async fn test_batch_over_limit_sends_within_quota_and_defers_the_rest() -> Result<()> {
    let server = llm_server().await;
    let dir = TempDir::new()?;
    std::fs::write(
        dir.path().join("prospects.csv"),
        "Name,Email,LinkedIn URL,Company Domain,Phone\n\
         Ann Lee,ann@lee.io,,,\n\
         Bob Roe,bob@roe.io,,,555-0100\n\
         Cat Poe,cat@poe.io,,,\n",
    )?;

    let quota_file = dir.path().join("email_tracking.json");
    let mailer = Arc::new(InboxMailer::default());
    let runner = runner(&server, mailer.clone(), &quota_file, 2).await;

    let pipeline = OutreachPipeline::new(
        LocalStorage::new(".".to_string()),
        cli(&dir, "prospects.csv", &[]),
        Arc::new(runner),
    );
    let summary = OutreachEngine::new(pipeline).run().await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.deferred, 1);

    let inbox = mailer.inbox.lock().unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].prospect.email, "ann@lee.io");
    assert_eq!(inbox[0].selected_offer.name, "Rhyka MRP");
    assert!(inbox[0].message_body.starts_with("Hey Ann,"));

    let tracking: serde_json::Value = serde_json::from_slice(&std::fs::read(&quota_file)?)?;
    assert_eq!(tracking, json!({"date": "2025-03-20", "count": 2}));

    let report = Path::new(&summary.report_path);
    assert!(report.ends_with("out/outreach_report.zip"));
    let results = read_entry(report, "results.csv").unwrap();
    assert_eq!(results.lines().count(), 3);
    assert!(results.lines().nth(1).unwrap().starts_with("Ann Lee,ann@lee.io,"));

    let deferred = read_entry(report, "deferred.csv").unwrap();
    assert!(deferred.starts_with("Name,Email,LinkedIn URL,Company Domain,Phone"));
    assert!(deferred.contains("Cat Poe,cat@poe.io"));
    Ok(())
}

#[tokio::test]
async fn test_rejected_delivery_is_reported_and_not_counted() -> Result<()> {
    let server = llm_server().await;
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("leads.txt"), "Ann Lee, ann@lee.io\nnot a prospect\n")?;

    let quota_file = dir.path().join("email_tracking.json");
    let runner = runner(&server, Arc::new(RejectingMailer), &quota_file, 5).await;

    let pipeline = OutreachPipeline::new(
        LocalStorage::new(".".to_string()),
        cli(&dir, "leads.txt", &["--format", "manual"]),
        Arc::new(runner),
    );
    let summary = OutreachEngine::new(pipeline).run().await?;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.failed, 1);
    assert!(!quota_file.exists());

    let report = Path::new(&summary.report_path);
    let results = read_entry(report, "results.csv").unwrap();
    assert!(results.contains("550 mailbox unavailable"));
    assert!(read_entry(report, "deferred.csv").is_none());
    Ok(())
}

#[tokio::test]
async fn test_llm_outage_skips_without_sending() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).body("upstream down");
        })
        .await;

    let dir = TempDir::new().unwrap();
    let quota_file = dir.path().join("email_tracking.json");
    let mailer = Arc::new(InboxMailer::default());
    let runner = runner(&server, mailer.clone(), &quota_file, 5).await;

    let prospect =
        outreach_etl::domain::model::Prospect::new("Ann Lee", "ann@lee.io", None, None, None).unwrap();
    let outcome = runner.process_prospects(vec![prospect], None).await;

    assert!(outcome.results.is_empty());
    assert!(outcome.deferred.is_empty());
    assert!(mailer.inbox.lock().unwrap().is_empty());
    assert_eq!(runner.quota().remaining().await, 5);
}
