pub mod sheets;

pub use crate::domain::model::DailyStats;
pub use sheets::SheetsTracker;

use crate::config::toml_config::TrackerConfig;
use crate::domain::model::{ResearchData, ServiceOffer, TrackingEntry};
use crate::domain::ports::CampaignTracker;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;

pub const COLUMNS: [&str; 17] = [
    "timestamp",
    "prospect_name",
    "company",
    "email",
    "linkedin_url",
    "website_url",
    "status",
    "trigger_found",
    "trigger_details",
    "ai_application",
    "subject_line",
    "email_body",
    "skip_reason",
    "research_quality_score",
    "personality_type",
    "services_offered",
    "ai_info",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Index of `status` in [`COLUMNS`].
pub const STATUS_COLUMN: usize = 6;

const OFFER_SUMMARIES: &[(&str, &str)] = &[
    ("rhyka mrp", "MRP optimization"),
    ("ai consulting", "AI automation tools"),
    ("govcon optimization", "government contract optimization"),
    ("steward voting ai", "voting analysis AI"),
];

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// First body line that talks about AI, automation or tools.
pub fn ai_application(body: &str) -> String {
    body.lines()
        .find(|line| line.contains("AI") || line.contains("automation") || line.contains("tools"))
        .map(|line| truncate_chars(line.trim(), 100))
        .unwrap_or_default()
}

/// Short "what they do - what we offered" summary for the sheet.
pub fn ai_info(research: Option<&ResearchData>, offer: Option<&ServiceOffer>) -> String {
    let focus = research
        .and_then(|r| {
            r.services_offered
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| r.business_focus.as_deref().filter(|s| !s.trim().is_empty()))
        })
        .map(|s| truncate_chars(s, 30))
        .unwrap_or_else(|| "business services".to_string());

    let offer_name = offer
        .map(|o| o.name.to_lowercase())
        .unwrap_or_else(|| "ai consulting".to_string());
    let offered = OFFER_SUMMARIES
        .iter()
        .find(|(name, _)| *name == offer_name)
        .map(|(_, summary)| *summary)
        .unwrap_or("AI automation tools");

    let info = format!("{} - offered {}", focus, offered);
    if info.chars().count() > 60 {
        format!("{}...", truncate_chars(&info, 57))
    } else {
        info
    }
}

/// One sheet row, in [`COLUMNS`] order.
pub fn build_row(entry: &TrackingEntry, now: NaiveDateTime) -> Vec<String> {
    let prospect = &entry.prospect;
    let research = entry.research.as_ref();

    let (trigger_found, trigger_details) = match research {
        Some(r) if !r.specific_trigger.trim().is_empty() => {
            let details = [r.specific_trigger.as_str(), r.recent_activity.as_str()]
                .iter()
                .filter(|s| !s.trim().is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("; ");
            ("Yes", details)
        }
        _ => ("No", String::new()),
    };

    let (subject_line, email_body) = entry
        .message
        .as_ref()
        .map(|m| (m.subject_line.clone(), m.message_body.clone()))
        .unwrap_or_default();

    let services_offered = research
        .and_then(|r| r.services_offered.clone().or_else(|| r.business_focus.clone()))
        .unwrap_or_default();

    vec![
        now.format(TIMESTAMP_FORMAT).to_string(),
        prospect.name.clone(),
        prospect.company_or_unknown().to_string(),
        prospect.email.clone(),
        prospect.linkedin_url.clone().unwrap_or_default(),
        prospect.company_domain.clone().unwrap_or_default(),
        entry.status.as_str().to_string(),
        trigger_found.to_string(),
        trigger_details,
        ai_application(&email_body),
        subject_line,
        email_body,
        entry.skip_reason.clone().unwrap_or_default(),
        entry
            .validation
            .as_ref()
            .map(|v| v.quality_score())
            .unwrap_or_else(|| "0".to_string()),
        prospect
            .personality_type
            .map(|p| p.as_str().to_string())
            .unwrap_or_default(),
        services_offered,
        ai_info(research, entry.offer.as_ref()),
    ]
}

/// Sheets when `[tracker] enabled`, otherwise a no-op.
pub fn tracker_from_config(config: &TrackerConfig) -> Result<Arc<dyn CampaignTracker>> {
    if config.enabled {
        tracing::info!("📊 Logging prospects to sheet '{}'", config.sheet_name);
        Ok(Arc::new(SheetsTracker::new(config)?))
    } else {
        Ok(Arc::new(NullTracker))
    }
}

/// Tracking turned off.
#[derive(Debug, Default)]
pub struct NullTracker;

#[async_trait]
impl CampaignTracker for NullTracker {
    async fn record(&self, entry: TrackingEntry) {
        tracing::debug!(
            "Tracker disabled, not logging {} ({})",
            entry.prospect.name,
            entry.status.as_str()
        );
    }
}
