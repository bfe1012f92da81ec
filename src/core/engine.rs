use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub report_path: String,
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub deferred: usize,
}

pub struct OutreachEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> OutreachEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting outreach run");

        let prospects = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} prospects", prospects.len());

        let outcome = self.pipeline.transform(prospects).await?;
        let summary = RunSummary {
            report_path: String::new(),
            processed: outcome.results.len(),
            sent: outcome.sent_count(),
            failed: outcome.failed_count(),
            deferred: outcome.deferred.len(),
        };
        tracing::info!(
            "🔄 Processed {} prospects ({} sent, {} failed, {} deferred)",
            summary.processed,
            summary.sent,
            summary.failed,
            summary.deferred
        );

        let report_path = self.pipeline.load(outcome).await?;
        tracing::info!("💾 Report saved to: {}", report_path);

        Ok(RunSummary {
            report_path,
            ..summary
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BatchOutcome, CampaignResult, Prospect};
    use crate::utils::error::OutreachError;
    use async_trait::async_trait;

    struct FixedPipeline {
        fail_extract: bool,
    }

    #[async_trait]
    impl Pipeline for FixedPipeline {
        async fn extract(&self) -> Result<Vec<Prospect>> {
            if self.fail_extract {
                return Err(OutreachError::InputError {
                    message: "empty".to_string(),
                });
            }
            Ok(vec![
                Prospect::new("Ann Lee", "ann@a.io", None, None, None)?,
                Prospect::new("Bob Roe", "bob@b.io", None, None, None)?,
                Prospect::new("Cat Poe", "cat@c.io", None, None, None)?,
            ])
        }

        async fn transform(&self, mut prospects: Vec<Prospect>) -> Result<BatchOutcome> {
            let deferred = prospects.split_off(2);
            let mut results: Vec<_> = prospects
                .into_iter()
                .map(|p| CampaignResult::failed(p, None, "smtp down"))
                .collect();
            results[0].sent = true;
            results[0].error = None;
            Ok(BatchOutcome { results, deferred })
        }

        async fn load(&self, _outcome: BatchOutcome) -> Result<String> {
            Ok("out/outreach_report.zip".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_summarizes_outcome() {
        let engine = OutreachEngine::new(FixedPipeline { fail_extract: false });
        let summary = engine.run().await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                report_path: "out/outreach_report.zip".to_string(),
                processed: 2,
                sent: 1,
                failed: 1,
                deferred: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_extract_error_propagates() {
        let engine = OutreachEngine::new(FixedPipeline { fail_extract: true });
        assert!(matches!(
            engine.run().await,
            Err(OutreachError::InputError { .. })
        ));
    }
}
