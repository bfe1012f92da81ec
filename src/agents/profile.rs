use crate::domain::model::{PersonalityType, Prospect};
use crate::domain::ports::{ChatModel, ChatRequest};
use crate::utils::error::{OutreachError, Result};
use std::sync::Arc;

const DEFAULT_YEARS_EXPERIENCE: u32 = 8;

const SYSTEM_PROMPT: &str = "You are an expert at analyzing professional profiles and \
determining personality types for sales outreach.";

/// Profile step. Fills experience, recent activity and a personality type
/// from what the prospect record already carries.
pub struct ProfileAgent {
    model: Arc<dyn ChatModel>,
}

impl ProfileAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn enrich(&self, mut prospect: Prospect) -> Prospect {
        if prospect.linkedin_url.is_none() {
            tracing::warn!("⚠️ No LinkedIn URL provided for {}", prospect.name);
            return prospect;
        }

        tracing::info!("👤 Building profile for {}", prospect.name);

        if prospect.years_experience.is_none() {
            prospect.years_experience = Some(DEFAULT_YEARS_EXPERIENCE);
        }
        if prospect.recent_activity.is_none() {
            prospect.recent_activity = Some(format!(
                "Leading work at {}",
                prospect.company_or_unknown()
            ));
        }

        let personality = match self.classify(&prospect).await {
            Ok(p) => p,
            Err(e) => {
                let fallback = personality_from_title(prospect.title.as_deref());
                tracing::warn!(
                    "⚠️ Personality classification failed for {} ({}), using {}",
                    prospect.name,
                    e,
                    fallback
                );
                fallback
            }
        };
        prospect.personality_type = Some(personality);

        tracing::debug!("Profile for {}: {:?}", prospect.name, prospect.personality_type);
        prospect
    }

    async fn classify(&self, prospect: &Prospect) -> Result<PersonalityType> {
        let profile = [
            format!("Name: {}", prospect.name),
            format!("Title: {}", prospect.title.as_deref().unwrap_or("Unknown")),
            format!("Company: {}", prospect.company.as_deref().unwrap_or("Unknown")),
            format!("Bio: {}", prospect.bio.as_deref().unwrap_or("No bio available")),
            format!(
                "Years Experience: {}",
                prospect
                    .years_experience
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "Unknown".to_string())
            ),
            format!(
                "Recent Activity: {}",
                prospect.recent_activity.as_deref().unwrap_or("No recent activity")
            ),
        ]
        .join("\n");

        let prompt = format!(
            "Based on this profile data, classify this person's personality type for cold outreach.\n\n\
             Profile Data:\n{profile}\n\n\
             Choose ONE of these personality types:\n\
             - technical_operator: Engineers, developers, technical leads who focus on implementation\n\
             - growth_lead: Marketing, growth, business development professionals\n\
             - corporate_exec: C-suite, VPs, directors in established companies\n\
             - startup_founder: Entrepreneurs, founders, early-stage company leaders\n\
             - sales_professional: Sales reps, account managers, business development\n\n\
             Respond with ONLY the personality type (e.g., \"technical_operator\"). No explanation needed."
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(SYSTEM_PROMPT, prompt)
                    .temperature(0.3)
                    .max_tokens(50),
            )
            .await?;

        PersonalityType::parse(&reply).ok_or_else(|| OutreachError::LlmResponseError {
            message: format!("unknown personality type '{}'", reply),
        })
    }
}

/// Title keywords, checked in order.
pub fn personality_from_title(title: Option<&str>) -> PersonalityType {
    let title = title.unwrap_or_default().to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| title.contains(w));

    if has(&["founder"]) {
        PersonalityType::StartupFounder
    } else if has(&["engineer", "developer", "cto"]) {
        PersonalityType::TechnicalOperator
    } else if has(&["marketing", "growth"]) {
        PersonalityType::GrowthLead
    } else if has(&["sales", "account"]) {
        PersonalityType::SalesProfessional
    } else {
        PersonalityType::CorporateExec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedModel;

    fn prospect(title: Option<&str>) -> Prospect {
        let mut p = Prospect::new(
            "Jane Doe",
            "jane@acme.io",
            Some("https://linkedin.com/in/jane".to_string()),
            None,
            None,
        )
        .unwrap();
        p.title = title.map(str::to_string);
        p.company = Some("Acme".to_string());
        p
    }

    #[tokio::test]
    async fn test_without_linkedin_prospect_is_untouched() {
        let model = Arc::new(ScriptedModel::new());
        let agent = ProfileAgent::new(model.clone());
        let p = Prospect::new("Jane", "jane@acme.io", None, None, None).unwrap();

        let enriched = agent.enrich(p.clone()).await;
        assert_eq!(enriched, p);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_fills_defaults_and_llm_personality() {
        let model = Arc::new(ScriptedModel::new().reply("personality type", "Growth_Lead\n"));
        let agent = ProfileAgent::new(model.clone());

        let enriched = agent.enrich(prospect(Some("VP Operations"))).await;
        assert_eq!(enriched.years_experience, Some(8));
        assert_eq!(enriched.recent_activity.as_deref(), Some("Leading work at Acme"));
        assert_eq!(enriched.personality_type, Some(PersonalityType::GrowthLead));
        assert_eq!(enriched.title.as_deref(), Some("VP Operations"));

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, 50);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back_to_title() {
        let model = Arc::new(ScriptedModel::new().reply("personality type", "a visionary"));
        let agent = ProfileAgent::new(model);

        let enriched = agent.enrich(prospect(Some("Co-Founder & CEO"))).await;
        assert_eq!(enriched.personality_type, Some(PersonalityType::StartupFounder));
    }

    #[tokio::test]
    async fn test_missing_title_stays_missing() {
        let agent = ProfileAgent::new(Arc::new(ScriptedModel::new()));
        let enriched = agent.enrich(prospect(None)).await;
        assert_eq!(enriched.title, None);
        assert_eq!(enriched.personality_type, Some(PersonalityType::CorporateExec));
    }

    #[test]
    fn test_personality_from_title() {
        assert_eq!(
            personality_from_title(Some("Senior Software Engineer")),
            PersonalityType::TechnicalOperator
        );
        assert_eq!(personality_from_title(Some("CTO")), PersonalityType::TechnicalOperator);
        assert_eq!(
            personality_from_title(Some("Head of Growth")),
            PersonalityType::GrowthLead
        );
        assert_eq!(
            personality_from_title(Some("Account Executive")),
            PersonalityType::SalesProfessional
        );
        assert_eq!(personality_from_title(None), PersonalityType::CorporateExec);
    }
}
