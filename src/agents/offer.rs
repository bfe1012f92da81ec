use crate::agents::profile_summary;
use crate::domain::model::{Prospect, ServiceOffer};
use crate::domain::ports::{ChatModel, ChatRequest};
use crate::llm::parse_json_reply;
use crate::utils::error::Result;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct OfferPick {
    name: String,
    #[serde(default)]
    rationale: String,
}

/// Picks one of the configured offers for a prospect.
pub struct OfferAgent {
    model: Arc<dyn ChatModel>,
    offers: Vec<ServiceOffer>,
}

impl OfferAgent {
    pub fn new(model: Arc<dyn ChatModel>, offers: Vec<ServiceOffer>) -> Self {
        Self { model, offers }
    }

    /// `None` means no offer fits and the prospect is skipped.
    pub async fn match_offer(&self, prospect: &Prospect) -> Option<ServiceOffer> {
        let pick = match self.ask(prospect).await {
            Ok(pick) => pick,
            Err(e) => {
                tracing::error!("❌ Offer matching failed for {}: {}", prospect.name, e);
                return None;
            }
        };

        let matched = self
            .offers
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(pick.name.trim()))
            .map(|o| ServiceOffer {
                fit_rationale: Some(pick.rationale.clone()),
                ..o.clone()
            });

        match &matched {
            Some(offer) => tracing::info!("🎯 Offer for {}: {}", prospect.name, offer.name),
            None => tracing::warn!(
                "⚠️ Model picked unknown offer '{}' for {}",
                pick.name,
                prospect.name
            ),
        }
        matched
    }

    async fn ask(&self, prospect: &Prospect) -> Result<OfferPick> {
        let offers = self
            .offers
            .iter()
            .enumerate()
            .map(|(i, o)| {
                format!(
                    "{}. {}\n   Description: {}\n   Best for: {}\n   CTA: {}",
                    i + 1,
                    o.name,
                    o.description,
                    o.best_for.join(", "),
                    o.cta
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Based on this prospect profile, determine which of my service offerings is the best fit.\n\n\
             PROSPECT PROFILE:\n{profile}\n\n\
             MY AVAILABLE OFFERS:\n{offers}\n\n\
             Respond with JSON in this exact format:\n\
             {{\n\
               \"name\": \"Exact name of the best offer\",\n\
               \"rationale\": \"One sentence explaining why this is the best fit\"\n\
             }}",
            profile = profile_summary(prospect),
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(
                    "You are an expert sales consultant who matches service offerings to \
                     prospect needs. Always respond with valid JSON.",
                    prompt,
                )
                .temperature(0.3)
                .max_tokens(200),
            )
            .await?;
        parse_json_reply(&reply)
    }
}
