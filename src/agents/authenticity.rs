use crate::domain::model::{AuthenticPositioning, Prospect, ResearchData};
use crate::domain::ports::{ChatModel, ChatRequest};
use crate::llm::parse_json_reply;
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;

const FAKE_INDICATORS: &[&str] = &[
    "i hope this finds you well",
    "best regards",
    "sincerely",
    "innovative",
    "cutting-edge",
    "streamline",
    "managing all that data must be tough",
    "brief call to discuss",
    "explore opportunities",
    "see if there's a fit",
    "our client",
    "case study",
    "proven results",
    "track record",
    "[your name]",
    "3-day to 4-hour",
    "we automated",
    "here's a time saver",
    "15-minute demo",
    "cut review time",
    "reduce processing",
    "time savings",
    "client results",
];

const AUTHENTIC_INDICATORS: &[&str] = &[
    "saw you",
    "noticed",
    "i've been building",
    "working on",
    "curious what you think",
    "want to see what we built",
    "mind if i show you",
    "worth a quick look",
    "interested in checking it out",
    "want to take a peek",
];

/// Outcome of scanning a drafted body for sales clichés.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthenticityCheck {
    pub is_authentic: bool,
    pub has_fake_claims: bool,
    pub uses_authentic_language: bool,
    /// +1 for authentic language, -1 for fake claims
    pub score: i32,
}

pub fn validate_authenticity(body: &str) -> AuthenticityCheck {
    let lower = body.to_lowercase();
    let has_fake_claims = FAKE_INDICATORS.iter().any(|p| lower.contains(p));
    let uses_authentic_language = AUTHENTIC_INDICATORS.iter().any(|p| lower.contains(p));

    AuthenticityCheck {
        is_authentic: !has_fake_claims && uses_authentic_language,
        has_fake_claims,
        uses_authentic_language,
        score: i32::from(uses_authentic_language) - i32::from(has_fake_claims),
    }
}

pub fn fallback_positioning() -> AuthenticPositioning {
    AuthenticPositioning {
        honest_opener: "Saw what your team has been working on".to_string(),
        honest_context: "I've been building AI tools for business workflows".to_string(),
        peer_curiosity: "Curious what you think about it".to_string(),
        natural_ask: "want to see what we built?".to_string(),
    }
}

/// Peer-to-peer framing for the opener, drafted by the model.
pub struct AuthenticityAgent {
    model: Arc<dyn ChatModel>,
}

impl AuthenticityAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn create_positioning(
        &self,
        prospect: &Prospect,
        research: &ResearchData,
    ) -> AuthenticPositioning {
        match self.request_positioning(prospect, research).await {
            Ok(positioning) => positioning,
            Err(e) => {
                tracing::error!("❌ Positioning failed for {}: {}", prospect.name, e);
                fallback_positioning()
            }
        }
    }

    async fn request_positioning(
        &self,
        prospect: &Prospect,
        research: &ResearchData,
    ) -> Result<AuthenticPositioning> {
        let findings = research
            .claims()
            .iter()
            .map(|(key, value)| format!("- {}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Create PEER-TO-PEER positioning. Sound like sharing something cool, NOT SELLING.\n\n\
             What we actually do:\n\
             - Building AI tools for business workflows\n\
             - Want to share what we built with someone who gets it\n\n\
             Prospect:\n\
             Name: {name}\n\
             Company: {company}\n\
             Research findings:\n{findings}\n\n\
             Structure (3 lines max):\n\
             1. SPECIFIC TRIGGER: \"Saw you [specific research finding]\"\n\
             2. HONEST CONTEXT: \"I've been building [what we're actually building]\"\n\
             3. PEER CURIOSITY: natural peer interest, not a sales ask\n\n\
             Never use time savings claims, client results, demo or meeting requests, \
             or sales language.\n\n\
             Natural asks only: \"curious what you think\", \"want to see what we built?\", \
             \"mind if I show you?\", \"worth a quick look?\", \"interested in checking it out?\"\n\n\
             Respond with JSON:\n\
             {{\n\
               \"honest_opener\": \"Saw you [specific trigger from research]\",\n\
               \"honest_context\": \"I've been building [what we're actually working on]\",\n\
               \"peer_curiosity\": \"Natural curiosity question (not sales ask)\",\n\
               \"natural_ask\": \"One of the approved natural asks\"\n\
             }}",
            name = prospect.name,
            company = prospect.company_or_unknown(),
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(
                    "You create authentic, honest business outreach that builds trust through \
                     transparency. Always respond with valid JSON.",
                    prompt,
                )
                .temperature(0.4)
                .max_tokens(300),
            )
            .await?;
        parse_json_reply(&reply)
    }
}
