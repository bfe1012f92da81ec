use crate::domain::model::Prospect;
use crate::domain::ports::{ChatModel, ChatRequest};
use crate::llm::parse_json_reply;
use crate::utils::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONTENT_CHARS: usize = 8000;
const MIN_SNIPPET_CHARS: usize = 20;

const SYSTEM_PROMPT: &str = "You are a business intelligence analyst who extracts key \
information from company websites for sales outreach purposes. Always respond with valid JSON.";

static SCRIPT_STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());
static META_DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\s[^>]*name\s*=\s*["']description["'][^>]*>"#).unwrap()
});
static CONTENT_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)content\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NUMERIC_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").unwrap());

// 依序擷取的標籤
static CONTENT_TAGS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["h1", "h2", "h3", "p", "li"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}(?:\s[^>]*)?>(.*?)</{tag}\s*>")).unwrap())
        .collect()
});

/// LLM reading of a company site.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyAnalysis {
    pub mission: Option<String>,
    pub product: Option<String>,
    pub team_size: Option<String>,
    pub sector: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub pain_points: Option<Vec<String>>,
    pub values: Option<String>,
    pub inferred_needs: Option<Vec<String>>,
}

impl CompanyAnalysis {
    fn apply_to(self, prospect: &mut Prospect) {
        prospect.company_mission = self.mission;
        prospect.company_product = self.product;
        prospect.team_size = self.team_size;
        prospect.sector = self.sector;
        prospect.tech_stack = self.tech_stack.unwrap_or_default();
        prospect.pain_points = self.pain_points.unwrap_or_default();
        prospect.company_values = self.values;
        prospect.inferred_needs = self.inferred_needs.unwrap_or_default();
    }
}

/// Website step. Plain GET of the company homepage, then an LLM summary.
pub struct WebsiteAgent {
    http: reqwest::Client,
    model: Arc<dyn ChatModel>,
}

impl WebsiteAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { http, model })
    }

    pub async fn enrich(&self, mut prospect: Prospect) -> Prospect {
        let Some(domain) = prospect.company_domain.clone() else {
            tracing::warn!("⚠️ No company domain provided for {}", prospect.name);
            return prospect;
        };

        let url = with_scheme(&domain);
        tracing::info!("🌐 Analyzing website {}", url);

        match self.analyze(&url, &prospect).await {
            Ok(analysis) => {
                analysis.apply_to(&mut prospect);
                tracing::info!(
                    "✅ Website analyzed for {}",
                    prospect.company_or_unknown()
                );
            }
            Err(e) => {
                tracing::error!("❌ Website analysis failed for {}: {}", url, e);
            }
        }
        prospect
    }

    async fn analyze(&self, url: &str, prospect: &Prospect) -> Result<CompanyAnalysis> {
        let html = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let content = extract_page_text(&html);
        tracing::debug!("Extracted {} chars from {}", content.chars().count(), url);

        let prompt = format!(
            "Analyze this company website content and extract key business information.\n\n\
             Company: {company}\n\
             Website Content: {content}\n\n\
             Extract and return the following information in JSON format:\n\
             {{\n\
               \"mission\": \"One sentence describing their core mission/purpose\",\n\
               \"product\": \"What they sell or offer in 1-2 sentences\",\n\
               \"team_size\": \"Estimate: startup, small, medium, large, or enterprise\",\n\
               \"sector\": \"Industry/sector they operate in\",\n\
               \"tech_stack\": [\"technologies\", \"mentioned\"],\n\
               \"pain_points\": [\"likely\", \"business\", \"challenges\"],\n\
               \"values\": \"Their key values or culture in one sentence\",\n\
               \"inferred_needs\": [\"potential\", \"business\", \"needs\"]\n\
             }}\n\n\
             If information is not available, use \"Unknown\" or empty arrays as appropriate.",
            company = prospect.company_or_unknown(),
        );

        let reply = self
            .model
            .complete(
                ChatRequest::new(SYSTEM_PROMPT, prompt)
                    .temperature(0.3)
                    .max_tokens(800),
            )
            .await?;
        parse_json_reply(&reply)
    }
}

fn with_scheme(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// Title, meta description, then headings, paragraphs and list items.
pub fn extract_page_text(html: &str) -> String {
    let html = SCRIPT_STYLE_RE.replace_all(html, " ");
    let mut parts = Vec::new();

    if let Some(title) = TITLE_RE.captures(&html).and_then(|c| c.get(1)) {
        parts.push(format!("Title: {}", clean_text(title.as_str())));
    }

    if let Some(meta) = META_DESCRIPTION_RE.find(&html) {
        let description = CONTENT_ATTR_RE
            .captures(meta.as_str())
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| clean_text(m.as_str()))
            .unwrap_or_default();
        parts.push(format!("Description: {}", description));
    }

    for tag_re in CONTENT_TAGS.iter() {
        for capture in tag_re.captures_iter(&html) {
            let text = clean_text(capture.get(1).map_or("", |m| m.as_str()));
            if text.chars().count() > MIN_SNIPPET_CHARS {
                parts.push(text);
            }
        }
    }

    parts.join(" ").chars().take(MAX_CONTENT_CHARS).collect()
}

fn clean_text(fragment: &str) -> String {
    let text = ANY_TAG_RE.replace_all(fragment, " ");
    let text = decode_entities(&text);
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&rsquo;", "'")
        .replace("&mdash;", "-");

    // &amp; 最後處理，避免 "&amp;#39;" 被解碼兩次
    NUMERIC_ENTITY_RE
        .replace_all(&named, |caps: &regex::Captures| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(dec)) => dec.as_str().parse().ok(),
                _ => None,
            };
            match code.and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .replace("&amp;", "&")
}
