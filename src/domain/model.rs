use crate::utils::error::Result;
use crate::utils::validation::{validate_email, validate_non_empty_string, validate_url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityType {
    TechnicalOperator,
    GrowthLead,
    CorporateExec,
    StartupFounder,
    SalesProfessional,
}

impl PersonalityType {
    pub const ALL: [PersonalityType; 5] = [
        PersonalityType::TechnicalOperator,
        PersonalityType::GrowthLead,
        PersonalityType::CorporateExec,
        PersonalityType::StartupFounder,
        PersonalityType::SalesProfessional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TechnicalOperator => "technical_operator",
            Self::GrowthLead => "growth_lead",
            Self::CorporateExec => "corporate_exec",
            Self::StartupFounder => "startup_founder",
            Self::SalesProfessional => "sales_professional",
        }
    }

    /// 解析 LLM 回覆的分類字串，容忍大小寫與多餘標點
    pub fn parse(value: &str) -> Option<Self> {
        let token = value
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.as_str() == token)
    }
}

impl std::fmt::Display for PersonalityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachStrategy {
    ShortTailoredValue,
    PainAgitateSolution,
    SocialProofCaseStudy,
    GiveValueFirst,
    WhoShouldITalkTo,
    StraightShooter,
    HyperPersonalized,
    HumorPatternInterrupt,
    BulletPointBenefits,
    TwoEmailQualifier,
}

impl OutreachStrategy {
    pub const ALL: [OutreachStrategy; 10] = [
        OutreachStrategy::ShortTailoredValue,
        OutreachStrategy::PainAgitateSolution,
        OutreachStrategy::SocialProofCaseStudy,
        OutreachStrategy::GiveValueFirst,
        OutreachStrategy::WhoShouldITalkTo,
        OutreachStrategy::StraightShooter,
        OutreachStrategy::HyperPersonalized,
        OutreachStrategy::HumorPatternInterrupt,
        OutreachStrategy::BulletPointBenefits,
        OutreachStrategy::TwoEmailQualifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTailoredValue => "short_tailored_value",
            Self::PainAgitateSolution => "pain_agitate_solution",
            Self::SocialProofCaseStudy => "social_proof_case_study",
            Self::GiveValueFirst => "give_value_first",
            Self::WhoShouldITalkTo => "who_should_i_talk_to",
            Self::StraightShooter => "straight_shooter",
            Self::HyperPersonalized => "hyper_personalized",
            Self::HumorPatternInterrupt => "humor_pattern_interrupt",
            Self::BulletPointBenefits => "bullet_point_benefits",
            Self::TwoEmailQualifier => "two_email_qualifier",
        }
    }

    /// 未知名稱一律落回 short_tailored_value
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == name)
            .unwrap_or(Self::ShortTailoredValue)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub company_domain: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,

    // LinkedIn 補充欄位
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub years_experience: Option<u32>,
    #[serde(default)]
    pub recent_activity: Option<String>,
    #[serde(default)]
    pub personality_type: Option<PersonalityType>,

    // 公司網站補充欄位
    #[serde(default)]
    pub company_mission: Option<String>,
    #[serde(default)]
    pub company_product: Option<String>,
    #[serde(default)]
    pub team_size: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub company_values: Option<String>,
    #[serde(default)]
    pub inferred_needs: Vec<String>,
}

impl Prospect {
    /// Builds a prospect from identity fields, rejecting a bad email or profile URL.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        linkedin_url: Option<String>,
        company_domain: Option<String>,
        phone: Option<String>,
    ) -> Result<Self> {
        let prospect = Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            linkedin_url: non_empty(linkedin_url),
            company_domain: non_empty(company_domain),
            phone: non_empty(phone),
            ..Default::default()
        };
        prospect.validate_identity()?;
        Ok(prospect)
    }

    pub fn validate_identity(&self) -> Result<()> {
        validate_non_empty_string("name", &self.name)?;
        validate_email("email", &self.email)?;
        if let Some(url) = &self.linkedin_url {
            validate_url("linkedin_url", url)?;
        }
        Ok(())
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("there")
    }

    pub fn company_or_unknown(&self) -> &str {
        self.company.as_deref().unwrap_or("Unknown Company")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffer {
    pub name: String,
    pub description: String,
    pub best_for: Vec<String>,
    pub cta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_rationale: Option<String>,
}

/// 一條冷開發話術，來自策略庫
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybookStrategy {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub best_for_personality: Vec<PersonalityType>,
    #[serde(default)]
    pub best_for_company_type: Vec<String>,
    #[serde(default)]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub prospect: Prospect,
    pub selected_offer: ServiceOffer,
    pub strategy: OutreachStrategy,
    pub strategy_explanation: String,
    pub subject_line: String,
    pub message_body: String,
    pub cta: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignResult {
    pub prospect: Prospect,
    pub message: Option<OutreachMessage>,
    pub sent: bool,
    pub sent_at: Option<String>,
    pub error: Option<String>,
}

impl CampaignResult {
    pub fn failed(prospect: Prospect, message: Option<OutreachMessage>, error: impl Into<String>) -> Self {
        Self {
            prospect,
            message,
            sent: false,
            sent_at: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchData {
    #[serde(default)]
    pub specific_trigger: String,
    #[serde(default)]
    pub recent_activity: String,
    #[serde(default)]
    pub specific_challenge: String,
    #[serde(default)]
    pub concrete_opportunity: String,
    #[serde(default)]
    pub personal_details: String,
    #[serde(default)]
    pub services_offered: Option<String>,
    #[serde(default)]
    pub business_focus: Option<String>,
}

impl ResearchData {
    /// Research fields that count as claims, in a stable order.
    pub fn claims(&self) -> Vec<(&'static str, &str)> {
        [
            ("specific_trigger", self.specific_trigger.as_str()),
            ("recent_activity", self.recent_activity.as_str()),
            ("specific_challenge", self.specific_challenge.as_str()),
            ("concrete_opportunity", self.concrete_opportunity.as_str()),
            ("personal_details", self.personal_details.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.trim().is_empty() && *v != "None found")
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.claims().is_empty() && self.services_offered.is_none() && self.business_focus.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCheck {
    pub claim: String,
    pub source_type: String,
    pub confidence: String,
    pub verifiable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateCheck {
    pub has_specific_date: bool,
    pub is_recent: bool,
    pub date_quality: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub sources: Vec<SourceCheck>,
    pub date_checks: BTreeMap<String, DateCheck>,
    pub relevance_scores: BTreeMap<String, u8>,
    pub uniqueness: BTreeMap<String, bool>,
    pub accuracy: BTreeMap<String, String>,
    pub quality_checks: BTreeMap<String, bool>,
    pub quality_gate_passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationReport {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn passed_checks(&self) -> usize {
        self.quality_checks.values().filter(|v| **v).count()
    }

    /// "passed/total"，沒有檢查時為 "0"
    pub fn quality_score(&self) -> String {
        if self.quality_checks.is_empty() {
            "0".to_string()
        } else {
            format!("{}/{}", self.passed_checks(), self.quality_checks.len())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticPositioning {
    pub honest_opener: String,
    pub honest_context: String,
    pub peer_curiosity: String,
    pub natural_ask: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub results: Vec<CampaignResult>,
    /// Prospects left untouched because the daily quota ran out.
    pub deferred: Vec<Prospect>,
}

impl BatchOutcome {
    pub fn sent_count(&self) -> usize {
        self.results.iter().filter(|r| r.sent).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.sent_count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    Sent,
    Skipped,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Skipped => "skipped",
        }
    }
}

/// One processed prospect as it is reported to the campaign tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingEntry {
    pub prospect: Prospect,
    pub status: TrackingStatus,
    pub research: Option<ResearchData>,
    pub validation: Option<ValidationReport>,
    pub offer: Option<ServiceOffer>,
    pub message: Option<OutreachMessage>,
    pub skip_reason: Option<String>,
}

impl TrackingEntry {
    pub fn sent(
        message: &OutreachMessage,
        research: &ResearchData,
        validation: &ValidationReport,
    ) -> Self {
        Self {
            prospect: message.prospect.clone(),
            status: TrackingStatus::Sent,
            research: Some(research.clone()),
            validation: Some(validation.clone()),
            offer: Some(message.selected_offer.clone()),
            message: Some(message.clone()),
            skip_reason: None,
        }
    }

    pub fn skipped(
        prospect: &Prospect,
        reason: impl Into<String>,
        research: Option<&ResearchData>,
        validation: Option<&ValidationReport>,
    ) -> Self {
        Self {
            prospect: prospect.clone(),
            status: TrackingStatus::Skipped,
            research: research.cloned(),
            validation: validation.cloned(),
            offer: None,
            message: None,
            skip_reason: Some(reason.into()),
        }
    }
}

/// Tracker rows stamped on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub sent: usize,
    pub skipped: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prospect_new_trims_and_drops_blank_optionals() {
        let p = Prospect::new(
            "  Jane Doe ",
            " jane@acme.io ",
            Some("   ".to_string()),
            Some("acme.io".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(p.name, "Jane Doe");
        assert_eq!(p.email, "jane@acme.io");
        assert_eq!(p.linkedin_url, None);
        assert_eq!(p.company_domain.as_deref(), Some("acme.io"));
        assert_eq!(p.first_name(), "Jane");
    }

    #[test]
    fn test_prospect_new_rejects_bad_email_and_url() {
        assert!(Prospect::new("Jane", "nope", None, None, None).is_err());
        assert!(Prospect::new(
            "Jane",
            "jane@acme.io",
            Some("linkedin/jane".to_string()),
            None,
            None
        )
        .is_err());
    }

    #[test]
    fn test_personality_parse_tolerates_noise() {
        assert_eq!(
            PersonalityType::parse(" \"Growth_Lead\". "),
            Some(PersonalityType::GrowthLead)
        );
        assert_eq!(PersonalityType::parse("visionary"), None);
    }

    #[test]
    fn test_strategy_from_unknown_name_defaults() {
        assert_eq!(
            OutreachStrategy::from_name("straight_shooter"),
            OutreachStrategy::StraightShooter
        );
        assert_eq!(
            OutreachStrategy::from_name("carrier_pigeon"),
            OutreachStrategy::ShortTailoredValue
        );
    }

    #[test]
    fn test_research_claims_skip_blank_and_none_found() {
        let research = ResearchData {
            specific_trigger: "Hired 3 engineers in March".to_string(),
            recent_activity: "None found".to_string(),
            personal_details: "  ".to_string(),
            ..Default::default()
        };
        let claims = research.claims();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].0, "specific_trigger");
    }

    #[test]
    fn test_quality_score_format() {
        let mut report = ValidationReport::default();
        assert_eq!(report.quality_score(), "0");
        report.quality_checks.insert("a".to_string(), true);
        report.quality_checks.insert("b".to_string(), false);
        assert_eq!(report.quality_score(), "1/2");
    }
}
