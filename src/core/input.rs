use crate::domain::model::Prospect;
use crate::utils::error::Result;
use csv::{ReaderBuilder, StringRecord, Trim};
use url::Url;

/// Apollo 匯出檔的讀取選項
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApolloOptions {
    /// 0-indexed data rows to skip before reading
    pub start_row: usize,
    pub limit: Option<usize>,
    /// Replaces every prospect's email, for sending a batch to yourself.
    pub test_email: Option<String>,
}

/// One prospect per line: `name, email[, linkedin[, domain[, phone]]]`.
///
/// A line containing a tab is split on tabs, otherwise on commas. Lines with
/// fewer than two fields, or with an invalid email or profile URL, are
/// skipped with a warning.
pub fn parse_manual_input(text: &str) -> Vec<Prospect> {
    let mut prospects = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let separator = if line.contains('\t') { '\t' } else { ',' };
        let parts: Vec<&str> = line
            .split(separator)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() < 2 {
            tracing::warn!(
                "⚠️ Line {}: need at least a name and an email, got '{}'",
                line_no + 1,
                line
            );
            continue;
        }

        let field = |i: usize| parts.get(i).map(|s| s.to_string());
        match Prospect::new(parts[0], parts[1], field(2), field(3), field(4)) {
            Ok(prospect) => prospects.push(prospect),
            Err(e) => tracing::warn!("⚠️ Line {} skipped: {}", line_no + 1, e),
        }
    }

    prospects
}

/// CSV with header row `Name, Email, LinkedIn URL, Company Domain, Phone`.
pub fn parse_csv_input(text: &str) -> Result<Vec<Prospect>> {
    let mut reader = reader_for(text);
    let headers = reader.headers()?.clone();
    let mut prospects = Vec::new();

    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        let get = |name: &str| column(&headers, &record, name);

        let (Some(name), Some(email)) = (get("Name"), get("Email")) else {
            tracing::warn!("⚠️ Row {} skipped: missing Name or Email", row_no + 1);
            continue;
        };

        match Prospect::new(
            name,
            email,
            get("LinkedIn URL"),
            get("Company Domain"),
            get("Phone"),
        ) {
            Ok(prospect) => prospects.push(prospect),
            Err(e) => tracing::warn!("⚠️ Row {} skipped: {}", row_no + 1, e),
        }
    }

    Ok(prospects)
}

/// Reads a sales-intelligence CSV export (Apollo column names).
pub fn parse_apollo_csv(text: &str, options: &ApolloOptions) -> Result<Vec<Prospect>> {
    let mut reader = reader_for(text);
    let headers = reader.headers()?.clone();

    let mut prospects = Vec::new();
    let mut skipped = 0usize;
    let take = options.limit.filter(|l| *l > 0).unwrap_or(usize::MAX);

    for record in reader.records().skip(options.start_row).take(take) {
        let record = record?;
        match apollo_row_to_prospect(&headers, &record, options.test_email.as_deref()) {
            Some(prospect) => prospects.push(prospect),
            None => skipped += 1,
        }
    }

    tracing::info!("✅ Converted {} prospects from export", prospects.len());
    if skipped > 0 {
        tracing::warn!("⚠️ Skipped {} rows (missing or invalid name/email)", skipped);
    }
    Ok(prospects)
}

fn apollo_row_to_prospect(
    headers: &StringRecord,
    record: &StringRecord,
    test_email: Option<&str>,
) -> Option<Prospect> {
    let get = |name: &str| column(headers, record, name);

    let full_name = format!(
        "{} {}",
        get("First Name").unwrap_or_default(),
        get("Last Name").unwrap_or_default()
    )
    .trim()
    .to_string();
    if full_name.is_empty() {
        return None;
    }

    let email = match test_email {
        Some(test) => test.to_string(),
        None => get("Email")?,
    };

    let website = get("Website");
    let company = get("Company Name for Emails")
        .or_else(|| get("Company"))
        .unwrap_or_else(|| extract_company_name(website.as_deref().unwrap_or_default()));

    let mut prospect = match Prospect::new(
        full_name,
        email,
        get("Person Linkedin Url").and_then(|u| clean_url(&u)),
        website.and_then(|u| clean_url(&u)),
        get("Work Direct Phone"),
    ) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!("Row rejected: {}", e);
            return None;
        }
    };
    prospect.title = get("Title");
    prospect.company = Some(company);
    Some(prospect)
}

/// Normalizes a URL cell: blank is none, a missing scheme becomes https.
pub fn clean_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Some(candidate),
        _ => None,
    }
}

/// `https://www.acme.io` -> `Acme`; anything not URL-shaped is returned as-is.
pub fn extract_company_name(url_or_name: &str) -> String {
    let value = url_or_name.trim();
    if value.is_empty() {
        return "Unknown".to_string();
    }

    let looks_like_url =
        value.starts_with("http://") || value.starts_with("https://") || value.starts_with("www.");
    if !looks_like_url {
        return value.to_string();
    }

    let Some(url) = clean_url(value).and_then(|u| Url::parse(&u).ok()) else {
        return "Unknown".to_string();
    };
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    match host.split('.').next() {
        Some(label) if !label.is_empty() => capitalize(label),
        _ => "Unknown".to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn reader_for(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// 空字串視為缺值
fn column(headers: &StringRecord, record: &StringRecord, name: &str) -> Option<String> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
