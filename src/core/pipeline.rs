use crate::core::input::{parse_apollo_csv, parse_csv_input, parse_manual_input, ApolloOptions};
use crate::domain::model::{BatchOutcome, CampaignResult, Prospect};
use crate::domain::ports::{CampaignRunner, ConfigProvider, InputFormat, Pipeline, Storage};
use crate::utils::error::{OutreachError, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use zip::write::{FileOptions, ZipWriter};

pub const REPORT_FILE: &str = "outreach_report.zip";

/// Flat per-prospect line of `results.csv`.
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    name: &'a str,
    email: &'a str,
    company: &'a str,
    sent: bool,
    sent_at: &'a str,
    subject_line: &'a str,
    strategy: &'a str,
    offer: &'a str,
    error: &'a str,
}

impl<'a> ResultRow<'a> {
    fn from_result(result: &'a CampaignResult) -> Self {
        let message = result.message.as_ref();
        Self {
            name: &result.prospect.name,
            email: &result.prospect.email,
            company: result.prospect.company.as_deref().unwrap_or(""),
            sent: result.sent,
            sent_at: result.sent_at.as_deref().unwrap_or(""),
            subject_line: message.map(|m| m.subject_line.as_str()).unwrap_or(""),
            strategy: message.map(|m| m.strategy.as_str()).unwrap_or(""),
            offer: message.map(|m| m.selected_offer.name.as_str()).unwrap_or(""),
            error: result.error.as_deref().unwrap_or(""),
        }
    }
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| OutreachError::IoError(e.into_error()))
}

pub fn results_csv(results: &[CampaignResult]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer.serialize(ResultRow::from_result(result))?;
    }
    if results.is_empty() {
        // serialize 才會寫表頭，空結果時手動補上
        writer.write_record([
            "name",
            "email",
            "company",
            "sent",
            "sent_at",
            "subject_line",
            "strategy",
            "offer",
            "error",
        ])?;
    }
    finish_csv(writer)
}

/// Deferred prospects in the CSV input layout, so the file can be fed back in.
pub fn deferred_csv(prospects: &[Prospect]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Name", "Email", "LinkedIn URL", "Company Domain", "Phone"])?;
    for p in prospects {
        writer.write_record([
            p.name.as_str(),
            p.email.as_str(),
            p.linkedin_url.as_deref().unwrap_or(""),
            p.company_domain.as_deref().unwrap_or(""),
            p.phone.as_deref().unwrap_or(""),
        ])?;
    }
    finish_csv(writer)
}

/// Apply `start_row`, `limit` and `test_email` to line and CSV inputs the
/// same way the Apollo reader does.
fn window(prospects: Vec<Prospect>, options: &ApolloOptions) -> Vec<Prospect> {
    prospects
        .into_iter()
        .skip(options.start_row)
        .take(options.limit.unwrap_or(usize::MAX))
        .map(|mut p| {
            if let Some(email) = &options.test_email {
                p.email = email.clone();
            }
            p
        })
        .collect()
}

pub struct OutreachPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    runner: Arc<dyn CampaignRunner>,
}

impl<S: Storage, C: ConfigProvider> OutreachPipeline<S, C> {
    pub fn new(storage: S, config: C, runner: Arc<dyn CampaignRunner>) -> Self {
        Self {
            storage,
            config,
            runner,
        }
    }

    async fn read_input(&self) -> Result<String> {
        let path = self.config.input_path();
        let bytes = if path == "-" {
            tracing::debug!("Reading prospects from stdin");
            let mut buffer = Vec::new();
            tokio::io::stdin().read_to_end(&mut buffer).await?;
            buffer
        } else {
            tracing::debug!("Reading prospects from {}", path);
            self.storage.read_file(path).await?
        };

        String::from_utf8(bytes).map_err(|e| OutreachError::InputError {
            message: format!("{} is not valid UTF-8: {}", path, e),
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for OutreachPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Prospect>> {
        let text = self.read_input().await?;
        let options = ApolloOptions {
            start_row: self.config.start_row(),
            limit: self.config.limit(),
            test_email: self.config.test_email().map(str::to_string),
        };

        let prospects = match self.config.input_format() {
            InputFormat::Manual => window(parse_manual_input(&text), &options),
            InputFormat::Csv => window(parse_csv_input(&text)?, &options),
            InputFormat::Apollo => parse_apollo_csv(&text, &options)?,
        };

        if prospects.is_empty() {
            return Err(OutreachError::InputError {
                message: format!("no valid prospects in {}", self.config.input_path()),
            });
        }
        tracing::info!("📋 Parsed {} prospects", prospects.len());
        Ok(prospects)
    }

    async fn transform(&self, prospects: Vec<Prospect>) -> Result<BatchOutcome> {
        Ok(self.runner.run_campaign(prospects, None).await)
    }

    async fn load(&self, outcome: BatchOutcome) -> Result<String> {
        let output_path = format!("{}/{}", self.config.output_path(), REPORT_FILE);

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("results.csv", FileOptions::default())?;
            zip.write_all(&results_csv(&outcome.results)?)?;

            zip.start_file::<_, ()>("results.json", FileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(&outcome.results)?.as_bytes())?;

            if !outcome.deferred.is_empty() {
                zip.start_file::<_, ()>("deferred.csv", FileOptions::default())?;
                zip.write_all(&deferred_csv(&outcome.deferred)?)?;
            }

            zip.finish()?.into_inner()
        };

        tracing::debug!("Writing report ({} bytes) to {}", zip_data.len(), output_path);
        self.storage.write_file(&output_path, &zip_data).await?;
        Ok(output_path)
    }
}
