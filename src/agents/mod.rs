//! One module per pipeline step. Each step takes what the previous steps
//! produced and degrades to a fallback instead of failing the prospect.

pub mod authenticity;
pub mod message;
pub mod offer;
pub mod profile;
pub mod research;
pub mod sender;
pub mod signals;
pub mod strategy;
pub mod validation;
pub mod website;

pub use authenticity::{validate_authenticity, AuthenticityAgent, AuthenticityCheck};
pub use message::MessageComposer;
pub use offer::OfferAgent;
pub use profile::ProfileAgent;
pub use research::ResearchAgent;
pub use sender::{DryRunMailer, EmailSender, SendOutcome, SmtpMailer};
pub use strategy::{default_playbook, load_playbook, StrategyAgent};
pub use validation::ValidationAgent;
pub use website::WebsiteAgent;

use crate::domain::model::Prospect;

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Unknown")
}

/// Multi-line profile used as LLM context by several steps.
pub(crate) fn profile_summary(prospect: &Prospect) -> String {
    let personality = prospect
        .personality_type
        .map(|p| p.as_str())
        .unwrap_or("Unknown");

    [
        format!("Name: {}", prospect.name),
        format!("Title: {}", or_unknown(&prospect.title)),
        format!("Company: {}", or_unknown(&prospect.company)),
        format!("Personality Type: {}", personality),
        format!("Company Mission: {}", or_unknown(&prospect.company_mission)),
        format!("Company Product: {}", or_unknown(&prospect.company_product)),
        format!("Team Size: {}", or_unknown(&prospect.team_size)),
        format!("Sector: {}", or_unknown(&prospect.sector)),
        format!("Tech Stack: {}", prospect.tech_stack.join(", ")),
        format!("Pain Points: {}", prospect.pain_points.join(", ")),
        format!("Company Values: {}", or_unknown(&prospect.company_values)),
        format!("Inferred Needs: {}", prospect.inferred_needs.join(", ")),
    ]
    .join("\n")
}

/// 產業描述：有 sector 用 sector，否則泛稱
pub(crate) fn sector_label(prospect: &Prospect) -> &str {
    match prospect.sector.as_deref() {
        Some(sector) if !sector.trim().is_empty() && !sector.eq_ignore_ascii_case("unknown") => {
            sector
        }
        _ => "their industry",
    }
}
