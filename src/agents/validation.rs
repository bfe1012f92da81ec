use crate::agents::signals::{is_verifiable, source_type, DateSignals};
use crate::domain::model::{
    DateCheck, Prospect, ResearchData, ServiceOffer, SourceCheck, ValidationReport,
};
use crate::domain::ports::{ChatModel, ChatRequest};
use crate::utils::clock::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;

const HIGH_RELEVANCE: u8 = 7;
const MIN_VERIFIABLE_SOURCES: usize = 2;

/// Quality gate over research claims. Everything is keyword heuristics
/// except relevance, which the model scores 1-10 per claim.
pub struct ValidationAgent {
    model: Arc<dyn ChatModel>,
    clock: Clock,
    min_quality_checks: usize,
    services: String,
}

impl ValidationAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        clock: Clock,
        min_quality_checks: usize,
        offers: &[ServiceOffer],
    ) -> Self {
        Self {
            model,
            clock,
            min_quality_checks,
            services: describe_services(offers),
        }
    }

    pub async fn validate(&self, prospect: &Prospect, research: &ResearchData) -> ValidationReport {
        let claims = research.claims();
        if claims.is_empty() {
            tracing::warn!("⚠️ No research claims to validate for {}", prospect.name);
            return ValidationReport::failed("no research claims to validate");
        }

        let signals = DateSignals::for_date((self.clock)());
        let mut report = ValidationReport::default();

        for (key, claim) in &claims {
            let key = key.to_string();
            let verifiable = is_verifiable(claim);
            let has_specific_date = signals.has_specific_date(claim);
            let is_recent = signals.is_recent(claim);

            report.sources.push(SourceCheck {
                claim: claim.to_string(),
                source_type: source_type(claim).to_string(),
                confidence: signals.confidence(claim).to_string(),
                verifiable,
            });
            report.date_checks.insert(
                key.clone(),
                DateCheck {
                    has_specific_date,
                    is_recent,
                    date_quality: if has_specific_date && is_recent { "good" } else { "poor" }
                        .to_string(),
                },
            );
            report
                .relevance_scores
                .insert(key.clone(), self.score_relevance(prospect, claim).await);
            report.uniqueness.insert(key.clone(), signals.is_unique(claim));
            report
                .accuracy
                .insert(key, accuracy(has_specific_date, verifiable).to_string());
        }

        report.quality_checks = quality_checks(&report);
        let passed = report.passed_checks();
        report.quality_gate_passed = passed >= self.min_quality_checks;

        tracing::info!(
            "🧪 Quality gate for {}: {}/{} checks passed (need {}) {:?}",
            prospect.name,
            passed,
            report.quality_checks.len(),
            self.min_quality_checks,
            report.quality_checks
        );
        report
    }

    async fn score_relevance(&self, prospect: &Prospect, claim: &str) -> u8 {
        let prompt = format!(
            "Score the relevance of this trigger to the services we sell.\n\n\
             Trigger: {claim}\n\
             Prospect: {name} at {company}\n\
             Our services:\n{services}\n\n\
             Score 1-10 where:\n\
             10 = Directly solved by one of our services\n\
             7-9 = Related to efficiency/technology\n\
             4-6 = Somewhat related to business growth\n\
             1-3 = Not relevant to our services\n\n\
             Respond with just the number (1-10).",
            name = prospect.name,
            company = prospect.company_or_unknown(),
            services = self.services,
        );

        let request = ChatRequest::new(
            "You score business trigger relevance. Respond with only a number 1-10.",
            prompt,
        )
        .temperature(0.1)
        .max_tokens(10);

        match self.model.complete(request).await {
            Ok(reply) => parse_score(&reply),
            Err(e) => {
                tracing::warn!("⚠️ Relevance scoring failed: {}", e);
                1
            }
        }
    }
}

/// 解析失敗視為 1 分
fn parse_score(reply: &str) -> u8 {
    reply
        .trim()
        .trim_end_matches('.')
        .parse::<i64>()
        .map(|s| s.clamp(1, 10) as u8)
        .unwrap_or(1)
}

fn accuracy(has_specific_date: bool, verifiable: bool) -> &'static str {
    match (has_specific_date, verifiable) {
        (true, true) => "high_confidence",
        (false, true) => "medium_confidence",
        _ => "low_confidence",
    }
}

fn describe_services(offers: &[ServiceOffer]) -> String {
    if offers.is_empty() {
        return "- (none configured)".to_string();
    }
    offers
        .iter()
        .map(|o| format!("- {}: {}", o.name, o.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn quality_checks(report: &ValidationReport) -> BTreeMap<String, bool> {
    let verifiable = report.sources.iter().filter(|s| s.verifiable).count();
    let high_relevance = report
        .relevance_scores
        .values()
        .filter(|s| **s >= HIGH_RELEVANCE)
        .count();
    let unique = report.uniqueness.values().filter(|u| **u).count();
    let recent_specific = report
        .date_checks
        .values()
        .filter(|d| d.date_quality == "good")
        .count();
    let high_confidence = report
        .accuracy
        .values()
        .filter(|a| *a == "high_confidence")
        .count();

    BTreeMap::from([
        ("verifiable_sources".to_string(), verifiable >= MIN_VERIFIABLE_SOURCES),
        ("high_relevance".to_string(), high_relevance >= 1),
        ("unique_triggers".to_string(), unique >= 1),
        ("recent_specific".to_string(), recent_specific >= 1),
        ("high_confidence".to_string(), high_confidence >= 1),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedModel;
    use crate::config::toml_config::default_offers;
    use crate::utils::clock::fixed_clock;
    use chrono::NaiveDate;

    fn agent(model: ScriptedModel, min: usize) -> ValidationAgent {
        ValidationAgent::new(
            Arc::new(model),
            fixed_clock(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            min,
            &default_offers(),
        )
    }

    fn prospect() -> Prospect {
        Prospect::new("Jane Doe", "jane@acme.io", None, None, None).unwrap()
    }

    fn strong_research() -> ResearchData {
        ResearchData {
            specific_trigger: "Launched a client portal in February 2025".to_string(),
            recent_activity: "Hired 3 dispatchers in March 2025".to_string(),
            specific_challenge: "Manual routing eats 40 hours a week".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_strong_research_passes_every_check() {
        let report = agent(ScriptedModel::new().reply("Trigger:", "8"), 2)
            .validate(&prospect(), &strong_research())
            .await;

        assert_eq!(report.sources.len(), 3);
        assert_eq!(report.passed_checks(), 5);
        assert_eq!(report.quality_score(), "5/5");
        assert!(report.quality_gate_passed);
        assert_eq!(report.accuracy["specific_trigger"], "high_confidence");
        assert_eq!(report.accuracy["specific_challenge"], "low_confidence");
        assert_eq!(report.date_checks["recent_activity"].date_quality, "good");
    }

    #[tokio::test]
    async fn test_generic_research_fails_the_gate() {
        let research = ResearchData {
            specific_trigger: "Digital transformation across the business".to_string(),
            recent_activity: "Focus on strategic initiatives".to_string(),
            ..Default::default()
        };
        let report = agent(ScriptedModel::new().reply("Trigger:", "not a number"), 2)
            .validate(&prospect(), &research)
            .await;

        assert_eq!(report.passed_checks(), 0);
        assert!(!report.quality_gate_passed);
        assert!(report.relevance_scores.values().all(|s| *s == 1));
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let research = ResearchData {
            recent_activity: "Partnered with a regional bank".to_string(),
            ..Default::default()
        };
        // 只有 unique_triggers 成立
        let strict = agent(ScriptedModel::new(), 2).validate(&prospect(), &research).await;
        assert_eq!(strict.passed_checks(), 1);
        assert!(!strict.quality_gate_passed);

        let lenient = agent(ScriptedModel::new(), 1).validate(&prospect(), &research).await;
        assert!(lenient.quality_gate_passed);
    }

    #[tokio::test]
    async fn test_empty_research_is_a_failed_report() {
        let report = agent(ScriptedModel::new(), 0)
            .validate(&prospect(), &ResearchData::default())
            .await;
        assert!(!report.quality_gate_passed);
        assert!(report.error.is_some());
        assert_eq!(report.quality_score(), "0");
    }

    #[tokio::test]
    async fn test_relevance_prompt_lists_configured_offers() {
        let offers = vec![ServiceOffer {
            name: "Rhyka MRP".to_string(),
            description: "Material planning for small warehouses".to_string(),
            best_for: vec!["Distributors".to_string()],
            cta: "Worth a look?".to_string(),
            fit_rationale: None,
        }];
        let model = Arc::new(ScriptedModel::new().reply("Trigger:", "6"));
        let agent = ValidationAgent::new(
            model.clone(),
            fixed_clock(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            2,
            &offers,
        );

        assert_eq!(agent.score_relevance(&prospect(), "Opened a new depot").await, 6);
        let requests = model.requests.lock().unwrap();
        let prompt = &requests[0].user;
        assert!(prompt.contains("- Rhyka MRP: Material planning for small warehouses"));
        assert!(!prompt.contains("document processing"));
    }

    #[test]
    fn test_parse_score_clamps() {
        assert_eq!(parse_score(" 9 "), 9);
        assert_eq!(parse_score("42"), 10);
        assert_eq!(parse_score("0"), 1);
        assert_eq!(parse_score("7."), 7);
        assert_eq!(parse_score("seven"), 1);
    }
}
