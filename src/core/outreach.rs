use crate::agents::{
    load_playbook, validate_authenticity, AuthenticityAgent, DryRunMailer, EmailSender,
    MessageComposer, OfferAgent, ProfileAgent, ResearchAgent, SendOutcome, SmtpMailer,
    StrategyAgent, ValidationAgent, WebsiteAgent,
};
use crate::config::toml_config::{OutreachConfig, RateLimitConfig};
use crate::core::quota::QuotaCounter;
use crate::domain::model::{
    BatchOutcome, CampaignResult, Prospect, ResearchData, TrackingEntry, ValidationReport,
};
use crate::domain::ports::{CampaignRunner, CampaignTracker, ChatModel, Mailer, ProgressFn};
use crate::llm::OpenAiClient;
use crate::tracker::{tracker_from_config, NullTracker};
use crate::utils::clock::{system_clock, Clock};
use crate::utils::error::Result;
use crate::utils::logger;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

pub const SKIP_QUALITY_GATE: &str = "Quality gate failed - insufficient research";
pub const SKIP_NO_OFFER: &str = "Could not determine best service offer";
pub const SKIP_NO_STRATEGY: &str = "Could not select outreach strategy";
pub const SKIP_NO_MESSAGE: &str = "Could not generate message";

/// How one prospect left the loop.
enum Step {
    /// Logged to the tracker, no result.
    Skipped,
    Finished(CampaignResult),
    /// The send hit the daily ceiling. Nothing was recorded.
    QuotaHit,
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// The sequential prospect loop: enrich, research, gate, draft and send.
pub struct OutreachRunner {
    profile: ProfileAgent,
    website: WebsiteAgent,
    research: ResearchAgent,
    validation: ValidationAgent,
    authenticity: AuthenticityAgent,
    offers: OfferAgent,
    strategies: StrategyAgent,
    composer: MessageComposer,
    sender: EmailSender,
    tracker: Arc<dyn CampaignTracker>,
    rate_limit: RateLimitConfig,
}

impl OutreachRunner {
    pub async fn from_config(
        config: &OutreachConfig,
        model: Arc<dyn ChatModel>,
        mailer: Arc<dyn Mailer>,
        tracker: Arc<dyn CampaignTracker>,
        quota: Arc<QuotaCounter>,
    ) -> Result<Self> {
        Self::with_clock(config, model, mailer, tracker, quota, system_clock()).await
    }

    pub async fn with_clock(
        config: &OutreachConfig,
        model: Arc<dyn ChatModel>,
        mailer: Arc<dyn Mailer>,
        tracker: Arc<dyn CampaignTracker>,
        quota: Arc<QuotaCounter>,
        clock: Clock,
    ) -> Result<Self> {
        let playbook = load_playbook(config.message.strategies_file.as_deref().map(Path::new)).await;

        Ok(Self {
            profile: ProfileAgent::new(model.clone()),
            website: WebsiteAgent::new(model.clone())?,
            research: ResearchAgent::new(model.clone(), clock.clone()),
            validation: ValidationAgent::new(
                model.clone(),
                clock,
                config.research.min_quality_checks,
                &config.offers,
            ),
            authenticity: AuthenticityAgent::new(model.clone()),
            offers: OfferAgent::new(model.clone(), config.offers.clone()),
            strategies: StrategyAgent::new(model, playbook),
            composer: MessageComposer::new(config.message.signature.clone()),
            sender: EmailSender::new(mailer, quota),
            tracker,
            rate_limit: config.rate_limit.clone(),
        })
    }

    /// Wires the real collaborators. A dry run logs instead of sending,
    /// keeps the quota file untouched and skips the tracker.
    pub async fn bootstrap(config: &OutreachConfig, dry_run: bool) -> Result<Self> {
        let limit = config.rate_limit.daily_email_limit;
        let quota = QuotaCounter::load(&config.rate_limit.tracking_file, limit).await;

        let mailer: Arc<dyn Mailer>;
        let tracker: Arc<dyn CampaignTracker>;
        let quota = if dry_run {
            tracing::info!("📝 Dry run: nothing will be sent");
            mailer = Arc::new(DryRunMailer);
            tracker = Arc::new(NullTracker);
            quota.without_persistence()
        } else {
            mailer = Arc::new(SmtpMailer::new(&config.smtp)?);
            tracker = tracker_from_config(&config.tracker)?;
            quota
        };

        let model = OpenAiClient::with_timeout(
            config.llm.api_key.clone(),
            config.llm.model.clone(),
            config.llm.base_url.clone(),
            Duration::from_secs(config.llm.timeout_seconds),
        );

        Self::from_config(config, Arc::new(model), mailer, tracker, Arc::new(quota)).await
    }

    pub fn quota(&self) -> &Arc<QuotaCounter> {
        self.sender.quota()
    }

    pub fn tracker(&self) -> &Arc<dyn CampaignTracker> {
        &self.tracker
    }

    pub async fn process_prospects(
        &self,
        prospects: Vec<Prospect>,
        progress: Option<ProgressFn>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let quota = self.sender.quota();
        let snapshot = quota.snapshot().await;
        tracing::info!(
            "📊 Daily email status: {}/{} sent today",
            snapshot.sent_today,
            snapshot.limit
        );
        tracing::info!("📈 Can send {} more emails today", snapshot.remaining);

        if snapshot.remaining == 0 {
            tracing::error!("❌ Daily email limit reached. Please try again tomorrow.");
            outcome.deferred = prospects;
            return outcome;
        }

        let allowance = snapshot.remaining as usize;
        let mut queue = prospects;
        if queue.len() > allowance {
            outcome.deferred = queue.split_off(allowance);
            tracing::warn!("⚠️ Processing only {} prospects due to daily limit", allowance);
            tracing::warn!("   Remaining {} will be deferred", outcome.deferred.len());
        }

        let total = queue.len();
        let mut pending = queue.into_iter().enumerate();
        while let Some((index, prospect)) = pending.next() {
            tracing::info!(
                "🎯 [{}/{}] Processing {} ({})",
                index + 1,
                total,
                prospect.name,
                prospect.company_or_unknown()
            );

            let span = logger::prospect_span(index + 1, &prospect.email);
            let step = match self.process_one(prospect.clone()).instrument(span).await {
                Ok(step) => step,
                Err(e) => {
                    tracing::error!("❌ Error processing {}: {}", prospect.name, e);
                    self.tracker
                        .record(TrackingEntry::skipped(
                            &prospect,
                            format!("Pipeline error: {}", e),
                            None,
                            None,
                        ))
                        .await;
                    Step::Finished(CampaignResult::failed(prospect.clone(), None, e.to_string()))
                }
            };

            match step {
                Step::Finished(result) => {
                    if let Some(progress) = &progress {
                        progress(&result);
                    }
                    outcome.results.push(result);
                }
                Step::Skipped => {}
                Step::QuotaHit => {
                    let mut halted = vec![prospect];
                    halted.extend(pending.by_ref().map(|(_, p)| p));
                    tracing::warn!(
                        "⚠️ Daily limit reached mid-batch, deferring {} prospects",
                        halted.len()
                    );
                    halted.append(&mut outcome.deferred);
                    outcome.deferred = halted;
                    break;
                }
            }

            if index + 1 < total {
                tracing::info!(
                    "⏳ Waiting {} seconds before next prospect...",
                    self.rate_limit.delay_between_emails_secs
                );
                pause(self.rate_limit.delay_between_emails()).await;
            }
        }

        let after = quota.snapshot().await;
        tracing::info!("✨ Pipeline complete!");
        tracing::info!(
            "📊 Results: {}/{} emails sent successfully",
            outcome.sent_count(),
            outcome.results.len()
        );
        tracing::info!("📈 Daily total: {}/{}", after.sent_today, after.limit);
        if after.remaining == 0 {
            tracing::info!("⚠️ Daily limit reached. Resume tomorrow for more sends.");
        }
        outcome
    }

    async fn process_one(&self, prospect: Prospect) -> Result<Step> {
        prospect.validate_identity()?;
        let scrape_delay = self.rate_limit.delay_between_scrapes();
        let step_delay = self.rate_limit.step_delay();

        tracing::info!("🔍 Step 1: Scraping LinkedIn profile...");
        let prospect = self.profile.enrich(prospect).await;
        pause(scrape_delay).await;

        tracing::info!("🌐 Step 2: Analyzing company website...");
        let prospect = self.website.enrich(prospect).await;
        pause(scrape_delay).await;

        tracing::info!("🔬 Step 3: Conducting deep prospect research...");
        let research = self.research.research_prospect(&prospect).await;
        pause(scrape_delay).await;

        tracing::info!("🔍 Step 4: Validating research triggers...");
        let validation = self.validation.validate(&prospect, &research).await;
        if !validation.quality_gate_passed {
            tracing::warn!(
                "⚠️ Quality gate FAILED for {} ({}), skipping email generation",
                prospect.name,
                validation.quality_score()
            );
            self.skip(&prospect, SKIP_QUALITY_GATE, &research, &validation).await;
            return Ok(Step::Skipped);
        }
        tracing::info!("✅ Research quality gate PASSED");
        pause(step_delay).await;

        tracing::info!("🎯 Step 5: Creating authentic positioning...");
        let positioning = self.authenticity.create_positioning(&prospect, &research).await;
        tracing::debug!("Positioning opener: {}", positioning.honest_opener);
        pause(step_delay).await;

        tracing::info!("🎯 Step 6: Matching best service offer...");
        let Some(offer) = self.offers.match_offer(&prospect).await else {
            tracing::error!("❌ Could not determine best offer for {}", prospect.name);
            self.skip(&prospect, SKIP_NO_OFFER, &research, &validation).await;
            return Ok(Step::Skipped);
        };

        tracing::info!("📋 Step 7: Selecting outreach strategy...");
        let Some((strategy, explanation)) = self.strategies.select(&prospect).await else {
            tracing::error!("❌ Could not select strategy for {}", prospect.name);
            self.skip(&prospect, SKIP_NO_STRATEGY, &research, &validation).await;
            return Ok(Step::Skipped);
        };
        tracing::info!("✅ Selected strategy: {}", strategy.name);

        tracing::info!("✍️ Step 8: Generating message...");
        let Some(message) =
            self.composer
                .compose(&prospect, &offer, &strategy, &explanation, &research)
        else {
            tracing::error!("❌ Could not generate message for {}", prospect.name);
            self.skip(&prospect, SKIP_NO_MESSAGE, &research, &validation).await;
            return Ok(Step::Skipped);
        };

        let check = validate_authenticity(&message.message_body);
        if check.is_authentic {
            tracing::info!("✅ Message passed authenticity validation");
        } else {
            tracing::warn!(
                "⚠️ Authenticity warning for {} (fake claims: {}, authentic language: {}, score: {})",
                prospect.name,
                check.has_fake_claims,
                check.uses_authentic_language,
                check.score
            );
        }
        tracing::info!("✅ Generated message with subject: '{}'", message.subject_line);

        tracing::info!("📧 Step 9: Sending email...");
        match self.sender.send(&message).await {
            SendOutcome::Sent(result) => {
                self.tracker
                    .record(TrackingEntry::sent(&message, &research, &validation))
                    .await;
                Ok(Step::Finished(result))
            }
            SendOutcome::Failed(result) => {
                let reason = format!(
                    "Email send failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                );
                self.skip(&prospect, &reason, &research, &validation).await;
                Ok(Step::Finished(result))
            }
            SendOutcome::QuotaExhausted(_) => Ok(Step::QuotaHit),
        }
    }

    async fn skip(
        &self,
        prospect: &Prospect,
        reason: &str,
        research: &ResearchData,
        validation: &ValidationReport,
    ) {
        self.tracker
            .record(TrackingEntry::skipped(
                prospect,
                reason,
                Some(research),
                Some(validation),
            ))
            .await;
    }
}

#[async_trait]
impl CampaignRunner for OutreachRunner {
    async fn run_campaign(&self, prospects: Vec<Prospect>, progress: Option<ProgressFn>) -> BatchOutcome {
        self.process_prospects(prospects, progress).await
    }
}
