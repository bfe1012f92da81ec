//! Chat-completion client and helpers for reading JSON out of model replies.

pub mod client;

pub use client::OpenAiClient;

use crate::utils::error::{OutreachError, Result};
use serde::de::DeserializeOwned;

/// Parses a JSON object out of a model reply.
///
/// Markdown code fences and ASCII/C1 control characters are removed first.
/// When the reply wraps the object in prose, the outermost `{...}` is tried.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let cleaned = clean_reply(reply);

    match serde_json::from_str(&cleaned) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let embedded = match (cleaned.find('{'), cleaned.rfind('}')) {
                (Some(start), Some(end)) if start < end => &cleaned[start..=end],
                _ => {
                    return Err(OutreachError::LlmResponseError {
                        message: format!("reply is not JSON: {}", first_err),
                    })
                }
            };
            serde_json::from_str(embedded).map_err(|e| OutreachError::LlmResponseError {
                message: format!("reply is not JSON: {}", e),
            })
        }
    }
}

fn clean_reply(reply: &str) -> String {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1f | 0x7f..=0x9f))
        .collect::<String>()
        .trim()
        .to_string()
}
