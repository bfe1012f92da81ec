use crate::domain::model::{OutreachStrategy, PersonalityType, PlaybookStrategy, Prospect};
use crate::domain::ports::{ChatModel, ChatRequest};
use crate::llm::parse_json_reply;
use crate::utils::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct StrategyPick {
    #[serde(default)]
    strategy_name: String,
    #[serde(default)]
    explanation: String,
}

/// Ten built-in strategies, one per [`OutreachStrategy`].
pub fn default_playbook() -> Vec<PlaybookStrategy> {
    use PersonalityType::*;

    let entry = |strategy: OutreachStrategy,
                 description: &str,
                 template: &str,
                 personalities: &[PersonalityType],
                 company_types: &[&str],
                 success_rate: f64| PlaybookStrategy {
        name: strategy.as_str().to_string(),
        description: description.to_string(),
        template: template.to_string(),
        best_for_personality: personalities.to_vec(),
        best_for_company_type: company_types.iter().map(|s| s.to_string()).collect(),
        success_rate: Some(success_rate),
        source_url: None,
    };

    vec![
        entry(
            OutreachStrategy::ShortTailoredValue,
            "Three sentences: a specific observation, what we built, a soft ask",
            "Noticed {observation}. Working on {offer}. Want to see what we built?",
            &[CorporateExec, GrowthLead],
            &["established", "mid-market"],
            0.18,
        ),
        entry(
            OutreachStrategy::PainAgitateSolution,
            "Name a concrete pain, show its cost, offer the fix",
            "{pain} usually costs {cost}. We built {offer} for exactly that.",
            &[StartupFounder],
            &["startup", "small business"],
            0.15,
        ),
        entry(
            OutreachStrategy::SocialProofCaseStudy,
            "Lead with what a similar company achieved",
            "A {peer} team cut {metric} after switching to {offer}.",
            &[CorporateExec, SalesProfessional],
            &["enterprise", "regulated"],
            0.14,
        ),
        entry(
            OutreachStrategy::GiveValueFirst,
            "Share a useful insight or resource before asking for anything",
            "Put together {resource} on {topic}, thought it might help.",
            &[GrowthLead, StartupFounder],
            &["agency", "marketing"],
            0.20,
        ),
        entry(
            OutreachStrategy::WhoShouldITalkTo,
            "Ask to be pointed to the right person",
            "Who handles {area} at {company}?",
            &[SalesProfessional, CorporateExec],
            &["enterprise"],
            0.12,
        ),
        entry(
            OutreachStrategy::StraightShooter,
            "Say exactly what it is and what it does, no fluff",
            "We built {offer}. It does {capability}. Useful for you?",
            &[TechnicalOperator],
            &["software", "engineering"],
            0.17,
        ),
        entry(
            OutreachStrategy::HyperPersonalized,
            "Build the whole email around one researched detail",
            "Saw {detail}. Made me think of {connection}.",
            &[StartupFounder, CorporateExec],
            &["professional services"],
            0.22,
        ),
        entry(
            OutreachStrategy::HumorPatternInterrupt,
            "A light, unexpected opener that breaks inbox routine",
            "Not another sales email (ok, a little bit). {observation}",
            &[GrowthLead, SalesProfessional],
            &["creative", "startup"],
            0.11,
        ),
        entry(
            OutreachStrategy::BulletPointBenefits,
            "Three short bullets of concrete outcomes",
            "- {benefit_1}\n- {benefit_2}\n- {benefit_3}",
            &[TechnicalOperator, CorporateExec],
            &["operations", "manufacturing"],
            0.13,
        ),
        entry(
            OutreachStrategy::TwoEmailQualifier,
            "A one-line qualifying question, with detail saved for the reply",
            "Quick one: is {problem} something you deal with?",
            &[SalesProfessional, StartupFounder],
            &["small business"],
            0.16,
        ),
    ]
}

/// Reads a JSON playbook. A missing or unreadable file falls back to the built-in one.
pub async fn load_playbook(path: Option<&Path>) -> Vec<PlaybookStrategy> {
    let Some(path) = path else {
        return default_playbook();
    };

    let loaded: Result<Vec<PlaybookStrategy>> = async {
        let data = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }
    .await;

    match loaded {
        Ok(playbook) => {
            tracing::info!("📚 Loaded {} strategies from {}", playbook.len(), path.display());
            playbook
        }
        Err(e) => {
            tracing::warn!(
                "⚠️ Could not load playbook {} ({}), using built-in strategies",
                path.display(),
                e
            );
            default_playbook()
        }
    }
}

fn preferred_for(personality: PersonalityType) -> OutreachStrategy {
    match personality {
        PersonalityType::TechnicalOperator => OutreachStrategy::StraightShooter,
        PersonalityType::GrowthLead => OutreachStrategy::GiveValueFirst,
        PersonalityType::CorporateExec => OutreachStrategy::ShortTailoredValue,
        PersonalityType::StartupFounder => OutreachStrategy::PainAgitateSolution,
        PersonalityType::SalesProfessional => OutreachStrategy::WhoShouldITalkTo,
    }
}

pub struct StrategyAgent {
    model: Arc<dyn ChatModel>,
    playbook: Vec<PlaybookStrategy>,
}

impl StrategyAgent {
    pub fn new(model: Arc<dyn ChatModel>, playbook: Vec<PlaybookStrategy>) -> Self {
        Self { model, playbook }
    }

    pub fn playbook(&self) -> &[PlaybookStrategy] {
        &self.playbook
    }

    /// Returns the chosen strategy and why. `None` only for an empty playbook.
    pub async fn select(&self, prospect: &Prospect) -> Option<(PlaybookStrategy, String)> {
        if self.playbook.is_empty() {
            tracing::error!("❌ No strategies available");
            return None;
        }

        match self.ask(prospect).await {
            Ok(pick) => {
                let wanted = pick.strategy_name.trim();
                if let Some(strategy) = self
                    .playbook
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(wanted))
                {
                    return Some((strategy.clone(), pick.explanation));
                }
                tracing::warn!("⚠️ Recommended strategy '{}' not found, using fallback", wanted);
            }
            Err(e) => tracing::warn!("⚠️ Strategy selection failed for {}: {}", prospect.name, e),
        }

        self.fallback(prospect)
    }

    fn fallback(&self, prospect: &Prospect) -> Option<(PlaybookStrategy, String)> {
        if let Some(personality) = prospect.personality_type {
            let preferred = preferred_for(personality).as_str();
            if let Some(strategy) = self.playbook.iter().find(|s| s.name == preferred) {
                let explanation = format!(
                    "Selected {} based on {} personality type",
                    strategy.name, personality
                );
                return Some((strategy.clone(), explanation));
            }
        }

        // 成功率最高者，同分取第一個
        let best = self.playbook.iter().fold(None, |best: Option<&PlaybookStrategy>, s| {
            match best {
                Some(b) if b.success_rate.unwrap_or(0.0) >= s.success_rate.unwrap_or(0.0) => Some(b),
                _ => Some(s),
            }
        })?;
        let explanation = format!("Selected {} as highest success rate fallback", best.name);
        Some((best.clone(), explanation))
    }

    async fn ask(&self, prospect: &Prospect) -> Result<StrategyPick> {
        let strategies = self
            .playbook
            .iter()
            .map(|s| {
                format!(
                    "- {}: {}\n  Best for personalities: {}\n  Best for company types: {}\n  Success rate: {}",
                    s.name,
                    s.description,
                    s.best_for_personality
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    s.best_for_company_type.join(", "),
                    s.success_rate
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "Unknown".to_string()),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "Unknown".to_string());
        let prompt = format!(
            "Based on this prospect profile, determine which outreach strategy would be most effective.\n\n\
             PROSPECT PROFILE:\n\
             Name: {name}\n\
             Title: {title}\n\
             Company: {company}\n\
             Personality Type: {personality}\n\
             Team Size: {team}\n\
             Sector: {sector}\n\
             Company Values: {values}\n\n\
             AVAILABLE STRATEGIES:\n{strategies}\n\n\
             Respond with JSON in this exact format:\n\
             {{\n\
               \"strategy_name\": \"exact_strategy_name_from_list\",\n\
               \"explanation\": \"One sentence explaining why this strategy is best for this prospect\"\n\
             }}",
            name = prospect.name,
            title = or_unknown(&prospect.title),
            company = or_unknown(&prospect.company),
            personality = prospect
                .personality_type
                .map(|p| p.as_str())
                .unwrap_or("Unknown"),
            team = or_unknown(&prospect.team_size),
            sector = or_unknown(&prospect.sector),
            values = or_unknown(&prospect.company_values),
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(
                    "You are an expert in cold outreach strategy selection. Always respond with valid JSON.",
                    prompt,
                )
                .temperature(0.3)
                .max_tokens(150),
            )
            .await?;
        parse_json_reply(&reply)
    }
}
