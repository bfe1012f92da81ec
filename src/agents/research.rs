use crate::agents::sector_label;
use crate::agents::signals::DateSignals;
use crate::domain::model::{Prospect, ResearchData};
use crate::domain::ports::{ChatModel, ChatRequest};
use crate::llm::parse_json_reply;
use crate::utils::clock::Clock;
use crate::utils::error::Result;
use chrono::Datelike;
use serde::Deserialize;
use std::sync::Arc;

const NO_ACTIVITY: &str = "No specific recent activity found";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebsiteSpecifics {
    specific_services: Option<String>,
    specializations: Option<String>,
    recent_changes: Option<String>,
    client_focus: Option<String>,
    personal_details: Option<String>,
}

impl WebsiteSpecifics {
    fn summary(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "Unknown".to_string());
        format!(
            "services: {}; specializations: {}; recent changes: {}; client focus: {}",
            field(&self.specific_services),
            field(&self.specializations),
            field(&self.recent_changes),
            field(&self.client_focus),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Triggers {
    trigger: String,
    challenge: String,
    opportunity: String,
}

/// One activity lookup: which kind of public source it imitates.
struct ActivityLookup {
    label: &'static str,
    system: &'static str,
    sources: &'static str,
    temperature: f32,
}

const LOOKUPS: [ActivityLookup; 3] = [
    ActivityLookup {
        label: "website announcements",
        system: "You generate specific, verifiable business activities for research purposes. \
                 Always include dates and numbers.",
        sources: "company website news pages, press releases, product announcements",
        temperature: 0.6,
    },
    ActivityLookup {
        label: "industry activity",
        system: "You research industry activities with specific dates and verifiable sources.",
        sources: "trade association announcements, industry journals, conference speaking, \
                  professional certifications, partnership changes",
        temperature: 0.5,
    },
    ActivityLookup {
        label: "business directories",
        system: "You research business directory information with specific dates and \
                 verifiable details.",
        sources: "chamber of commerce announcements, local business journals, \
                  office relocations, staff additions or promotions",
        temperature: 0.4,
    },
];

/// Deep research step. Everything here is best effort; a failed call only
/// blanks the fields it would have produced.
pub struct ResearchAgent {
    model: Arc<dyn ChatModel>,
    clock: Clock,
}

impl ResearchAgent {
    pub fn new(model: Arc<dyn ChatModel>, clock: Clock) -> Self {
        Self { model, clock }
    }

    pub async fn research_prospect(&self, prospect: &Prospect) -> ResearchData {
        tracing::info!("🔎 Researching {}", prospect.name);

        let specifics = match self.website_specifics(prospect).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("❌ Website specifics failed for {}: {}", prospect.name, e);
                WebsiteSpecifics::default()
            }
        };

        let recent_activity = self.find_recent_activity(prospect).await;

        let triggers = match self.identify_triggers(prospect, &specifics).await {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("❌ Trigger identification failed for {}: {}", prospect.name, e);
                Triggers::default()
            }
        };

        ResearchData {
            specific_trigger: triggers.trigger,
            recent_activity,
            specific_challenge: triggers.challenge,
            concrete_opportunity: triggers.opportunity,
            personal_details: specifics.personal_details.unwrap_or_default(),
            services_offered: specifics.specific_services,
            business_focus: specifics.specializations,
        }
    }

    async fn website_specifics(&self, prospect: &Prospect) -> Result<WebsiteSpecifics> {
        let Some(domain) = &prospect.company_domain else {
            return Ok(WebsiteSpecifics::default());
        };

        let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "Unknown".to_string());
        let prompt = format!(
            "Analyze this company information and extract SPECIFIC, CONCRETE details that could \
             be used for personalized outreach:\n\n\
             Company: {company}\n\
             Domain: {domain}\n\
             Industry: {sector}\n\
             Mission: {mission}\n\
             Services: {product}\n\
             Team Size: {team}\n\
             Values: {values}\n\n\
             Find the specific services they offer, recent changes or new offerings, unique \
             specializations, the challenges they address and the clients they serve. \
             Avoid generic terms like \"comprehensive\" or \"experienced\".\n\n\
             Respond with JSON:\n\
             {{\n\
               \"specific_services\": \"exact services they list\",\n\
               \"specializations\": \"what makes them unique\",\n\
               \"recent_changes\": \"any recent updates or expansions\",\n\
               \"client_focus\": \"specific types of clients they serve\",\n\
               \"personal_details\": \"any specific details about the founder/team\"\n\
             }}",
            company = prospect.company_or_unknown(),
            sector = sector_label(prospect),
            mission = or_unknown(&prospect.company_mission),
            product = or_unknown(&prospect.company_product),
            team = or_unknown(&prospect.team_size),
            values = or_unknown(&prospect.company_values),
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(
                    "You are a research expert who finds specific, concrete details for \
                     personalized outreach. Always respond with valid JSON.",
                    prompt,
                )
                .temperature(0.3)
                .max_tokens(300),
            )
            .await?;
        parse_json_reply(&reply)
    }

    async fn find_recent_activity(&self, prospect: &Prospect) -> String {
        let signals = DateSignals::for_date((self.clock)());

        let mut best: Option<(u32, String)> = None;
        for lookup in &LOOKUPS {
            let candidate = match self.run_lookup(lookup, prospect).await {
                Ok(text) if !text.is_empty() => text,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("⚠️ {} lookup failed for {}: {}", lookup.label, prospect.name, e);
                    continue;
                }
            };
            let score = signals.specificity_score(&candidate);
            tracing::debug!("Lookup '{}' scored {}: {}", lookup.label, score, candidate);
            // 同分保留先出現的
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, candidate));
            }
        }

        if let Some((_, activity)) = best {
            return activity;
        }

        match self.plausible_activity(prospect).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => NO_ACTIVITY.to_string(),
            Err(e) => {
                tracing::error!("❌ Activity generation failed for {}: {}", prospect.name, e);
                NO_ACTIVITY.to_string()
            }
        }
    }

    async fn run_lookup(&self, lookup: &ActivityLookup, prospect: &Prospect) -> Result<String> {
        let year = (self.clock)().year();
        let prompt = format!(
            "Find ONE specific, verifiable recent activity for this company.\n\n\
             Company: {company}\n\
             Contact: {name}\n\
             Industry: {sector}\n\
             Domain: {domain}\n\n\
             Sources to draw on: {sources}.\n\n\
             Requirements:\n\
             - Include a specific month and year (for example March {year} or Q1 {year})\n\
             - Include specific numbers (staff hired, square footage, dollar amounts)\n\
             - Must be relevant to their work in {sector}\n\n\
             Response format: \"[SPECIFIC ACTIVITY] in [MONTH YEAR]\"",
            company = prospect.company_or_unknown(),
            name = prospect.name,
            sector = sector_label(prospect),
            domain = prospect.company_domain.as_deref().unwrap_or("Unknown"),
            sources = lookup.sources,
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(lookup.system, prompt)
                    .temperature(lookup.temperature)
                    .max_tokens(100),
            )
            .await?;
        Ok(reply.trim().to_string())
    }

    async fn plausible_activity(&self, prospect: &Prospect) -> Result<String> {
        let year = (self.clock)().year();
        let prompt = format!(
            "Generate a HIGHLY SPECIFIC, plausible recent activity for this company.\n\n\
             Company: {company}\n\
             Industry: {sector}\n\n\
             Requirements:\n\
             - Exact month and year within the last 6 months\n\
             - Specific numbers (square footage, staff count, dollar amount)\n\
             - A verifiable type of activity (hiring, moving, launching, winning)\n\n\
             Template: \"[ACTION] [SPECIFIC DETAILS] in [MONTH {year}]\"\n\n\
             Generate ONE highly specific activity.",
            company = prospect.company_or_unknown(),
            sector = sector_label(prospect),
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(
                    "You generate highly specific, plausible business activities with exact details.",
                    prompt,
                )
                .temperature(0.7)
                .max_tokens(80),
            )
            .await?;
        Ok(reply.trim().to_string())
    }

    async fn identify_triggers(
        &self,
        prospect: &Prospect,
        specifics: &WebsiteSpecifics,
    ) -> Result<Triggers> {
        let prompt = format!(
            "Find SPECIFIC triggers with exact numbers and processes. NO GENERIC PAIN POINTS.\n\n\
             Prospect: {name}\n\
             Company: {company}\n\
             Website Analysis: {website}\n\
             Industry: {sector}\n\n\
             1. SPECIFIC TRIGGER: exact recent change with date/number/name\n\
             2. SPECIFIC CHALLENGE: exact workflow problem with time/pages/volume\n\
             3. CONCRETE OPPORTUNITY: specific process we could automate with a measurable outcome\n\n\
             Avoid phrases like \"digital transformation\" or \"streamline their processes\".\n\n\
             Respond with JSON:\n\
             {{\n\
               \"trigger\": \"Exact recent activity with date/number/name\",\n\
               \"challenge\": \"Specific workflow problem with exact time/volume/pages\",\n\
               \"opportunity\": \"Concrete automation with specific before/after metrics\"\n\
             }}",
            name = prospect.name,
            company = prospect.company_or_unknown(),
            website = specifics.summary(),
            sector = sector_label(prospect),
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(
                    "You identify specific, concrete triggers for personalized business outreach. \
                     Always respond with valid JSON.",
                    prompt,
                )
                .temperature(0.4)
                .max_tokens(200),
            )
            .await?;
        parse_json_reply(&reply)
    }
}
