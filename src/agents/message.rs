//! Template-based drafting. No model call: the opener comes from research
//! or keyword tables, the rest of the email is fixed.

use crate::domain::model::{
    OutreachMessage, OutreachStrategy, PlaybookStrategy, Prospect, ResearchData, ServiceOffer,
};
use once_cell::sync::Lazy;
use regex::Regex;

pub const CTA: &str = "Want to see what we built?";
const GENERIC_FOCUS: &str = "specializes in business services";
const MAX_FOCUS_CHARS: usize = 60;

static FORMAL_CLOSING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\n\n(?:best regards|sincerely|yours truly|regards|best),?[ \t]*(?:\n.*)?$")
        .unwrap()
});

const FALLBACK_OPENERS: [&str; 5] = [
    "Been following your work.",
    "Came across your profile.",
    "Saw your background in the industry.",
    "Noticed your expertise.",
    "Impressive track record.",
];

// 公司名稱關鍵字 -> 業務描述，依序比對
const COMPANY_FOCUS: &[(&[&str], &str)] = &[
    (&["logistics", "shipping", "freight"], "handles logistics and supply chain management"),
    (&["consulting", "advisory"], "provides strategic consulting"),
    (&["law", "legal", "attorney"], "handles legal work"),
    (&["tech", "software"], "builds technology solutions"),
    (&["marketing", "agency"], "handles marketing and communications"),
    (&["real estate", "property", "realty"], "works in real estate"),
    (&["research"], "does research and analysis"),
    (&["management"], "provides management services"),
];

const COMPANY_INDUSTRY: &[(&[&str], &str)] = &[
    (&["tech", "software"], "tech"),
    (&["consulting", "advisory"], "consulting"),
    (&["real estate", "property", "realty"], "real estate"),
    (&["legal", "law", "attorney"], "legal"),
    (&["marketing", "agency"], "marketing"),
    (&["logistics", "shipping"], "logistics"),
    (&["research", "analysis"], "research"),
    (&["management", "operations"], "operations"),
];

const TITLE_INDUSTRY: &[(&[&str], &str)] = &[
    (&["ceo", "founder", "executive"], "executive"),
    (&["marketing", "growth"], "marketing"),
    (&["operations", "ops"], "operations"),
    (&["tech", "engineering"], "tech"),
];

// 其餘產業的 workflow 詞
const FOCUS_WORKFLOWS: &[(&[&str], &str)] = &[
    (&["finance", "investment", "banking", "financial"], "financial workflows"),
    (&["healthcare", "medical", "health"], "healthcare workflows"),
    (&["education", "training", "learning"], "educational workflows"),
    (&["manufacturing", "production", "factory"], "manufacturing workflows"),
    (&["retail", "ecommerce", "store", "shop"], "retail workflows"),
    (&["insurance", "claims"], "insurance workflows"),
    (&["construction", "engineering", "contractor"], "construction workflows"),
    (&["media", "entertainment", "content"], "content workflows"),
    (&["agriculture", "food", "farming"], "agriculture workflows"),
];

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

fn lookup<'a>(text: &str, table: &[(&[&str], &'a str)]) -> Option<&'a str> {
    table
        .iter()
        .find(|(words, _)| contains_any(text, words))
        .map(|(_, value)| *value)
}

fn usable_research_field(value: Option<&str>) -> Option<&str> {
    let value = value?.trim();
    let len = value.chars().count();
    (len > 0 && len < MAX_FOCUS_CHARS && !value.to_lowercase().starts_with("not specified"))
        .then_some(value)
}

fn known_sector(prospect: &Prospect) -> Option<String> {
    prospect
        .sector
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("unknown"))
        .map(str::to_lowercase)
}

/// One phrase describing what the prospect's company does.
pub fn business_focus(prospect: &Prospect, research: &ResearchData) -> String {
    if let Some(services) = usable_research_field(research.services_offered.as_deref()) {
        return format!("specializes in {}", services);
    }
    if let Some(focus) = usable_research_field(research.business_focus.as_deref()) {
        return format!("focuses on {}", focus);
    }
    if let Some(sector) = known_sector(prospect) {
        return format!("works in {}", sector);
    }

    let company = prospect.company.as_deref().unwrap_or_default().to_lowercase();
    if company.contains("estate") && company.contains("law") {
        return "specializes in estate planning and probate law".to_string();
    }
    if let Some(focus) = lookup(&company, COMPANY_FOCUS) {
        return focus.to_string();
    }

    let title = prospect.title.as_deref().unwrap_or_default().to_lowercase();
    let name = prospect.company_or_unknown();
    if contains_any(&title, &["ceo", "founder"]) {
        format!("runs {}", name)
    } else if title.contains("director") {
        format!("leads strategy at {}", name)
    } else if title.contains("manager") {
        format!("manages operations at {}", name)
    } else {
        format!("works at {}", name)
    }
}

/// "X workflows" phrase for the pitch line.
pub fn relevant_workflow(focus: &str, company: Option<&str>) -> String {
    let focus = focus.to_lowercase();
    let company = company.unwrap_or_default().to_lowercase();
    let in_focus = |words: &[&str]| contains_any(&focus, words);
    let in_company = |words: &[&str]| contains_any(&company, words);

    let workflow = if in_focus(&["logistics", "supply chain", "shipping", "freight", "transport"])
        || in_company(&["logistics"])
    {
        if focus.contains("logistics") {
            "supply chain workflows"
        } else {
            "logistics workflows"
        }
    } else if in_focus(&["real estate", "property", "valuation"]) || in_company(&["realty"]) {
        if focus.contains("real estate") {
            "property workflows"
        } else if focus.contains("valuation") {
            "property analysis workflows"
        } else {
            "real estate workflows"
        }
    } else if in_focus(&["legal", "law", "attorney", "estate planning", "probate"])
        || in_company(&["law"])
    {
        if focus.contains("legal") {
            "document workflows"
        } else {
            "legal workflows"
        }
    } else if in_focus(&["research", "analysis"]) || in_company(&["research"]) {
        if focus.contains("research") {
            "data analysis workflows"
        } else {
            "research workflows"
        }
    } else if in_focus(&["consulting", "strategy", "advisory"]) || in_company(&["consulting"]) {
        if focus.contains("consulting") {
            "strategy workflows"
        } else {
            "consulting workflows"
        }
    } else if in_focus(&["advocacy", "non-profit", "nonprofit"]) || in_company(&["advocacy"]) {
        if focus.contains("advocacy") {
            "non-profit workflows"
        } else {
            "advocacy workflows"
        }
    } else if in_focus(&["transportation management", "tms"]) || in_company(&["tms"]) {
        "transportation workflows"
    } else if in_focus(&["technology", "software", "tech"]) {
        if focus.contains("software") {
            "technology workflows"
        } else {
            "software workflows"
        }
    } else if in_focus(&["marketing", "communications", "agency"]) {
        if focus.contains("marketing") {
            "communications workflows"
        } else {
            "marketing workflows"
        }
    } else if in_focus(&["management", "operations"]) {
        "operational workflows"
    } else {
        lookup(&focus, FOCUS_WORKFLOWS).unwrap_or("business automation workflows")
    };
    workflow.to_string()
}

/// Subject line industry. Never "unknown".
pub fn subject_industry(prospect: &Prospect) -> String {
    if let Some(sector) = known_sector(prospect) {
        return sector;
    }
    let industry = match (&prospect.company, &prospect.title) {
        (Some(company), _) => lookup(&company.to_lowercase(), COMPANY_INDUSTRY),
        (None, Some(title)) => lookup(&title.to_lowercase(), TITLE_INDUSTRY),
        (None, None) => None,
    };
    industry.unwrap_or("business").to_string()
}

/// 64-bit FNV-1a, stable across runs and platforms.
fn stable_hash(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn fallback_opener(name: &str) -> &'static str {
    FALLBACK_OPENERS[(stable_hash(name) % FALLBACK_OPENERS.len() as u64) as usize]
}

fn needs_fallback_opener(focus: &str, company: Option<&str>) -> bool {
    let Some(company) = company.filter(|c| !c.trim().is_empty()) else {
        return true;
    };
    focus.starts_with("been following")
        || focus.starts_with("works at")
        || focus.to_lowercase().contains(&company.to_lowercase())
        || focus.contains(GENERIC_FOCUS)
}

pub struct MessageComposer {
    signature: Option<String>,
}

impl MessageComposer {
    pub fn new(signature: Option<String>) -> Self {
        Self {
            signature: signature.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn compose(
        &self,
        prospect: &Prospect,
        offer: &ServiceOffer,
        strategy: &PlaybookStrategy,
        strategy_explanation: &str,
        research: &ResearchData,
    ) -> Option<OutreachMessage> {
        let first_name = prospect.name.split_whitespace().next()?;

        let focus = business_focus(prospect, research);
        let workflow = relevant_workflow(&focus, prospect.company.as_deref());
        tracing::debug!("Focus for {}: '{}' / {}", prospect.name, focus, workflow);

        let opener = if needs_fallback_opener(&focus, prospect.company.as_deref()) {
            fallback_opener(&prospect.name).to_string()
        } else {
            format!("Noticed {} {}.", prospect.company_or_unknown(), focus)
        };

        let body = format!(
            "Hey {first_name},\n\n{opener}\n\nWorking on AI tools for {workflow}. {CTA}"
        );

        Some(OutreachMessage {
            prospect: prospect.clone(),
            selected_offer: offer.clone(),
            strategy: OutreachStrategy::from_name(&strategy.name),
            strategy_explanation: strategy_explanation.to_string(),
            subject_line: format!("AI for {} workflows", subject_industry(prospect)),
            message_body: self.finish_body(&body),
            cta: CTA.to_string(),
        })
    }

    /// Drops a trailing formal closing, then appends the configured signature.
    pub fn finish_body(&self, body: &str) -> String {
        let body = FORMAL_CLOSING_RE.replace(body, "");
        let body = body.trim_end();
        match &self.signature {
            Some(signature) => format!("{}\n\n--\n{}", body, signature.trim()),
            None => body.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::strategy::default_playbook;
    use crate::config::toml_config::default_offers;

    fn prospect(company: Option<&str>, title: Option<&str>, sector: Option<&str>) -> Prospect {
        let mut p = Prospect::new("Jane Doe", "jane@acme.io", None, None, None).unwrap();
        p.company = company.map(str::to_string);
        p.title = title.map(str::to_string);
        p.sector = sector.map(str::to_string);
        p
    }

    fn research(services: Option<&str>, focus: Option<&str>) -> ResearchData {
        ResearchData {
            services_offered: services.map(str::to_string),
            business_focus: focus.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_business_focus_priority() {
        let p = prospect(Some("Acme"), Some("CEO"), Some("Logistics"));
        assert_eq!(
            business_focus(&p, &research(Some("cold chain freight"), Some("x"))),
            "specializes in cold chain freight"
        );
        assert_eq!(
            business_focus(&p, &research(Some("Not specified on site"), Some("regional carriers"))),
            "focuses on regional carriers"
        );
        let long = "a".repeat(60);
        assert_eq!(
            business_focus(&p, &research(Some(&long), None)),
            "works in logistics"
        );

        let p = prospect(Some("Hill Estate Law Group"), None, Some("unknown"));
        assert_eq!(
            business_focus(&p, &ResearchData::default()),
            "specializes in estate planning and probate law"
        );

        let p = prospect(Some("Northwind"), Some("Marketing Director"), None);
        assert_eq!(
            business_focus(&p, &ResearchData::default()),
            "leads strategy at Northwind"
        );
    }

    #[test]
    fn test_relevant_workflow_avoids_repeating_focus_words() {
        assert_eq!(
            relevant_workflow("handles logistics and supply chain management", None),
            "supply chain workflows"
        );
        assert_eq!(relevant_workflow("works in freight", None), "logistics workflows");
        assert_eq!(relevant_workflow("handles legal work", None), "document workflows");
        assert_eq!(relevant_workflow("works in healthcare", None), "healthcare workflows");
        assert_eq!(relevant_workflow("runs Acme", Some("Acme")), "business automation workflows");
    }

    #[test]
    fn test_subject_industry() {
        assert_eq!(subject_industry(&prospect(Some("Acme"), None, Some("Fintech"))), "fintech");
        assert_eq!(subject_industry(&prospect(Some("Acme Software"), None, None)), "tech");
        assert_eq!(subject_industry(&prospect(Some("Acme"), Some("CEO"), None)), "business");
        assert_eq!(subject_industry(&prospect(None, Some("Head of Growth"), None)), "marketing");
        assert_eq!(subject_industry(&prospect(None, None, Some("Unknown"))), "business");
    }

    #[test]
    fn test_compose_with_specific_focus() {
        let composer = MessageComposer::new(None);
        let p = prospect(Some("Acme"), Some("CEO"), Some("Logistics"));
        let strategy = default_playbook()[5].clone();

        let message = composer
            .compose(&p, &default_offers()[1], &strategy, "direct", &ResearchData::default())
            .unwrap();

        assert_eq!(
            message.message_body,
            "Hey Jane,\n\nNoticed Acme works in logistics.\n\nWorking on AI tools for supply chain workflows. Want to see what we built?"
        );
        assert_eq!(message.subject_line, "AI for logistics workflows");
        assert_eq!(message.strategy, OutreachStrategy::StraightShooter);
        assert_eq!(message.cta, CTA);
    }

    #[test]
    fn test_compose_uses_stable_fallback_opener() {
        let composer = MessageComposer::new(None);
        let p = prospect(Some("Northwind"), Some("Analyst"), None);
        let strategy = default_playbook()[0].clone();

        let first = composer
            .compose(&p, &default_offers()[0], &strategy, "", &ResearchData::default())
            .unwrap();
        let second = composer
            .compose(&p, &default_offers()[0], &strategy, "", &ResearchData::default())
            .unwrap();

        assert_eq!(first.message_body, second.message_body);
        assert!(!first.message_body.contains("works at"));
        assert!(FALLBACK_OPENERS
            .iter()
            .any(|o| first.message_body.contains(o)));
    }

    #[test]
    fn test_signature_replaces_formal_closing() {
        let composer = MessageComposer::new(Some("Sam\nExample Labs".to_string()));
        assert_eq!(
            composer.finish_body("Hey Jane,\n\nShort note.\n\nBest regards,\n[Your Name]"),
            "Hey Jane,\n\nShort note.\n\n--\nSam\nExample Labs"
        );

        let bare = MessageComposer::new(None);
        assert_eq!(bare.finish_body("Hey Jane,\n\nSincerely"), "Hey Jane,");
        assert_eq!(bare.finish_body("Hey Jane,\n\nBest of luck"), "Hey Jane,\n\nBest of luck");
    }
}
