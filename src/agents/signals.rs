//! Keyword heuristics shared by the research and validation steps.
//!
//! All matching is plain substring search on lower-cased text. Year and
//! "recent month" vocabulary is derived from the date the check runs on.

use chrono::{Datelike, NaiveDate};

pub const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const QUARTERS: [&str; 4] = ["q1", "q2", "q3", "q4"];
const RELATIVE_MONTHS: [&str; 2] = ["last month", "this month"];
const RECENCY_WORDS: [&str; 3] = ["recently", "new", "latest"];

const VERIFIABLE_ACTIONS: [&str; 9] = [
    "launched",
    "announced",
    "hired",
    "won",
    "moved",
    "partnered",
    "acquired",
    "opened",
    "expanded",
];

const GENERIC_PHRASES: [&str; 9] = [
    "digital transformation",
    "growing business",
    "expanding services",
    "improving efficiency",
    "modernizing operations",
    "industry changes",
    "market trends",
    "business development",
    "strategic initiatives",
];

const UNIQUE_INDICATORS: [&str; 10] = [
    "launched",
    "hired",
    "moved to",
    "won",
    "partnered with",
    "acquired",
    "opened",
    "announced",
    "$",
    "sq ft",
];

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// 以執行當天為基準的日期詞彙
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSignals {
    current_year: String,
    previous_year: String,
    recent_months: [&'static str; 3],
}

impl DateSignals {
    pub fn for_date(today: NaiveDate) -> Self {
        let month = today.month0() as usize;
        let recent_months = [
            MONTHS[month],
            MONTHS[(month + 11) % 12],
            MONTHS[(month + 10) % 12],
        ];
        Self {
            current_year: today.year().to_string(),
            previous_year: (today.year() - 1).to_string(),
            recent_months,
        }
    }

    pub fn mentions_month(&self, text: &str) -> bool {
        contains_any(&text.to_lowercase(), &MONTHS)
    }

    pub fn mentions_year(&self, text: &str) -> bool {
        text.contains(&self.current_year) || text.contains(&self.previous_year)
    }

    /// Month, quarter, current/previous year or "last/this month".
    pub fn has_specific_date(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        contains_any(&lower, &MONTHS)
            || contains_any(&lower, &QUARTERS)
            || contains_any(&lower, &RELATIVE_MONTHS)
            || self.mentions_year(&lower)
    }

    /// Current year, one of the last three month names, or a recency word.
    pub fn is_recent(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains(&self.current_year)
            || contains_any(&lower, &self.recent_months)
            || contains_any(&lower, &RELATIVE_MONTHS)
            || contains_any(&lower, &RECENCY_WORDS)
    }

    /// high: dated, medium: recency word, else low.
    pub fn confidence(&self, text: &str) -> &'static str {
        let lower = text.to_lowercase();
        if contains_any(&lower, &MONTHS) || contains_any(&lower, &QUARTERS) || self.mentions_year(&lower)
        {
            "high"
        } else if contains_any(&lower, &RECENCY_WORDS) {
            "medium"
        } else {
            "low"
        }
    }

    /// Higher means more concrete. Used to rank candidate activity lines.
    pub fn specificity_score(&self, text: &str) -> u32 {
        let lower = text.to_lowercase();
        let mut score = 0;
        if contains_any(&lower, &MONTHS) {
            score += 3;
        }
        if self.mentions_year(&lower) {
            score += 2;
        }
        if lower.chars().any(|c| c.is_ascii_digit()) {
            score += 2;
        }
        if contains_any(&lower, &["street", "avenue", "building", "center"]) {
            score += 2;
        }
        if contains_any(&lower, &["hired", "launched", "moved", "won", "partnered"]) {
            score += 3;
        }
        score
    }

    /// Generic phrasing loses; otherwise it needs a concrete action, date, amount or size.
    pub fn is_unique(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        if contains_any(&lower, &GENERIC_PHRASES) {
            return false;
        }
        contains_any(&lower, &UNIQUE_INDICATORS)
            || contains_any(&lower, &MONTHS)
            || self.mentions_year(&lower)
    }
}

pub fn is_verifiable(text: &str) -> bool {
    contains_any(&text.to_lowercase(), &VERIFIABLE_ACTIONS)
}

pub fn source_type(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if contains_any(&lower, &["launched", "announced"]) {
        "press_release_or_news"
    } else if contains_any(&lower, &["hired", "joined"]) {
        "linkedin_or_company_news"
    } else if contains_any(&lower, &["won", "case"]) {
        "legal_database_or_news"
    } else if contains_any(&lower, &["moved", "office"]) {
        "business_directory_or_news"
    } else {
        "website_or_social_media"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals() -> DateSignals {
        DateSignals::for_date(NaiveDate::from_ymd_opt(2025, 2, 14).unwrap())
    }

    #[test]
    fn test_recent_months_wrap_around_the_year() {
        let s = signals();
        assert_eq!(s.recent_months, ["february", "january", "december"]);
        assert!(s.is_recent("Opened a second office in December"));
        assert!(!s.is_recent("Opened a second office in October"));
    }

    #[test]
    fn test_years_follow_the_clock() {
        let s = signals();
        assert!(s.has_specific_date("Hired 3 engineers in 2024"));
        assert!(!s.has_specific_date("Hired 3 engineers in 2019"));
        assert!(s.is_recent("Expanded in 2025"));
        assert!(!s.is_recent("Expanded in 2024"));
    }

    #[test]
    fn test_specificity_score() {
        let s = signals();
        assert_eq!(s.specificity_score("Something nice happened"), 0);
        // month 3 + year 2 + digit 2 + street 2 + hired 3
        assert_eq!(
            s.specificity_score("Hired 4 staff at the Main Street office in March 2025"),
            12
        );
    }

    #[test]
    fn test_confidence_levels() {
        let s = signals();
        assert_eq!(s.confidence("Launched portal in Q3"), "high");
        assert_eq!(s.confidence("Latest product update"), "medium");
        assert_eq!(s.confidence("Does good work"), "low");
    }

    #[test]
    fn test_uniqueness_rejects_generic_phrases() {
        let s = signals();
        assert!(!s.is_unique("Launched a digital transformation program"));
        assert!(s.is_unique("Partnered with a regional bank"));
        assert!(s.is_unique("Signed a $2M contract"));
        assert!(!s.is_unique("Great team culture"));
    }

    #[test]
    fn test_source_type_and_verifiable() {
        assert_eq!(source_type("Announced a new CFO"), "press_release_or_news");
        assert_eq!(source_type("Joined the board"), "linkedin_or_company_news");
        assert_eq!(source_type("Moved HQ"), "business_directory_or_news");
        assert_eq!(source_type("Nice blog"), "website_or_social_media");
        assert!(is_verifiable("Acquired a competitor"));
        assert!(!is_verifiable("Cares about customers"));
    }
}
