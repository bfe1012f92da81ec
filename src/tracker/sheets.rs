use crate::config::toml_config::TrackerConfig;
use crate::domain::model::{DailyStats, TrackingEntry};
use crate::domain::ports::CampaignTracker;
use crate::tracker::{build_row, COLUMNS, STATUS_COLUMN};
use crate::utils::error::{OutreachError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct ValuesBody<'a> {
    values: Vec<Vec<&'a str>>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Appends one row per processed prospect to a Google Sheet (v4 REST).
pub struct SheetsTracker {
    http: Client,
    base_url: Url,
    spreadsheet_id: String,
    sheet_name: String,
    access_token: String,
    headers_checked: AtomicBool,
}

impl SheetsTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OutreachError::MissingConfigError {
                field: "tracker.spreadsheet_id".to_string(),
            })?;
        let access_token = config
            .access_token
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OutreachError::MissingConfigError {
                field: "tracker.access_token".to_string(),
            })?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            OutreachError::InvalidConfigValueError {
                field: "tracker.base_url".to_string(),
                value: config.base_url.clone(),
                reason: e.to_string(),
            }
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url,
            spreadsheet_id,
            sheet_name: config.sheet_name.clone(),
            access_token,
            headers_checked: AtomicBool::new(false),
        })
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}`
    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OutreachError::TrackerError {
                message: format!("cannot build a path on {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn read_range(&self, range: &str) -> Result<ValueRange> {
        let url = self.values_url(range)?;
        let range = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<ValueRange>()
            .await?;
        Ok(range)
    }

    /// 第一列是空的就寫入欄位名稱
    async fn ensure_headers(&self) -> Result<()> {
        let first_row = self.read_range(&format!("{}!1:1", self.sheet_name)).await?;
        if first_row.values.iter().any(|row| !row.is_empty()) {
            return Ok(());
        }

        let mut url = self.values_url(&format!("{}!A1", self.sheet_name))?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.http
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&ValuesBody {
                values: vec![COLUMNS.to_vec()],
            })
            .send()
            .await?
            .error_for_status()?;
        tracing::info!("📋 Wrote header row to sheet '{}'", self.sheet_name);
        Ok(())
    }

    pub async fn append_row(&self, row: &[String]) -> Result<()> {
        if !self.headers_checked.load(Ordering::Acquire) {
            self.ensure_headers().await?;
            self.headers_checked.store(true, Ordering::Release);
        }

        let mut url = self.values_url(&format!("{}!A1:append", self.sheet_name))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        self.http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&ValuesBody {
                values: vec![row.iter().map(String::as_str).collect()],
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn count_day(rows: &[Vec<serde_json::Value>], today: NaiveDate) -> DailyStats {
    let prefix = today.format("%Y-%m-%d").to_string();
    let mut stats = DailyStats::default();

    for row in rows {
        let stamped_today = row
            .first()
            .map(|cell| cell_text(cell).starts_with(&prefix))
            .unwrap_or(false);
        if !stamped_today {
            continue;
        }
        stats.total += 1;
        match row.get(STATUS_COLUMN).map(cell_text).as_deref() {
            Some("sent") => stats.sent += 1,
            Some("skipped") => stats.skipped += 1,
            _ => {}
        }
    }
    stats
}

#[async_trait]
impl CampaignTracker for SheetsTracker {
    async fn record(&self, entry: TrackingEntry) {
        let row = build_row(&entry, chrono::Local::now().naive_local());
        match self.append_row(&row).await {
            Ok(()) => tracing::info!(
                "✅ Logged {} to Google Sheets (Status: {})",
                entry.prospect.name,
                entry.status.as_str()
            ),
            // 記錄失敗不影響寄信流程
            Err(e) => tracing::error!("❌ Error logging to Google Sheets: {}", e),
        }
    }

    /// Zeroes when the sheet cannot be read.
    async fn daily_stats(&self, today: NaiveDate) -> Option<DailyStats> {
        match self.read_range(&self.sheet_name).await {
            Ok(range) => Some(count_day(&range.values, today)),
            Err(e) => {
                tracing::error!("Error getting daily stats: {}", e);
                Some(DailyStats::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Prospect;
    use httpmock::prelude::*;
    use serde_json::json;

    fn tracker_for(server: &MockServer) -> SheetsTracker {
        SheetsTracker::new(&TrackerConfig {
            enabled: true,
            spreadsheet_id: Some("sheet-123".to_string()),
            sheet_name: "Outreach".to_string(),
            access_token: Some("ya29.token".to_string()),
            base_url: server.base_url(),
        })
        .unwrap()
    }

    fn skipped_entry() -> TrackingEntry {
        let prospect = Prospect::new("Jane Doe", "jane@acme.io", None, None, None).unwrap();
        TrackingEntry::skipped(&prospect, "Research quality gate failed", None, None)
    }

    #[test]
    fn test_requires_id_and_token() {
        let err = SheetsTracker::new(&TrackerConfig {
            enabled: true,
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, OutreachError::MissingConfigError { field } if field == "tracker.spreadsheet_id"));
    }

    #[tokio::test]
    async fn test_writes_headers_once_then_appends() {
        let server = MockServer::start_async().await;
        let header_read = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v4/spreadsheets/sheet-123/values/Outreach!1:1")
                    .header("authorization", "Bearer ya29.token");
                then.status(200).json_body(json!({"range": "Outreach!A1:Z1"}));
            })
            .await;
        let header_write = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/v4/spreadsheets/sheet-123/values/Outreach!A1")
                    .query_param("valueInputOption", "RAW")
                    .body_contains(r#"["timestamp","prospect_name","#);
                then.status(200).json_body(json!({}));
            })
            .await;
        let append = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v4/spreadsheets/sheet-123/values/Outreach!A1:append")
                    .query_param("insertDataOption", "INSERT_ROWS")
                    .body_contains("Research quality gate failed");
                then.status(200).json_body(json!({"updates": {"updatedRows": 1}}));
            })
            .await;

        let tracker = tracker_for(&server);
        tracker.record(skipped_entry()).await;
        tracker.record(skipped_entry()).await;

        assert_eq!(header_read.hits_async().await, 1);
        assert_eq!(header_write.hits_async().await, 1);
        assert_eq!(append.hits_async().await, 2);
    }

    #[tokio::test]
    async fn test_existing_headers_are_kept() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/spreadsheets/sheet-123/values/Outreach!1:1");
                then.status(200)
                    .json_body(json!({"values": [["timestamp", "prospect_name"]]}));
            })
            .await;
        let header_write = server
            .mock_async(|when, then| {
                when.method(PUT);
                then.status(200);
            })
            .await;
        let append = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({}));
            })
            .await;

        tracker_for(&server).record(skipped_entry()).await;

        assert_eq!(header_write.hits_async().await, 0);
        assert_eq!(append.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_api_failure_is_swallowed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path_contains("/v4/spreadsheets/");
                then.status(403).body("PERMISSION_DENIED");
            })
            .await;

        // 不會 panic，也不回傳錯誤
        tracker_for(&server).record(skipped_entry()).await;
    }

    #[tokio::test]
    async fn test_daily_stats_counts_today_only() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/spreadsheets/sheet-123/values/Outreach");
                then.status(200).json_body(json!({"values": [
                    COLUMNS,
                    ["2026-03-14 09:00:00", "A", "", "", "", "", "sent"],
                    ["2026-03-14 09:10:00", "B", "", "", "", "", "skipped"],
                    ["2026-03-14 09:20:00", "C", "", "", "", "", "sent"],
                    ["2026-03-13 17:00:00", "D", "", "", "", "", "sent"]
                ]}));
            })
            .await;

        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let stats = tracker_for(&server).daily_stats(today).await;
        assert_eq!(
            stats,
            Some(DailyStats {
                sent: 2,
                skipped: 1,
                total: 3
            })
        );
    }

    #[tokio::test]
    async fn test_daily_stats_zero_on_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path_contains("/v4/spreadsheets/");
                then.status(500);
            })
            .await;

        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(
            tracker_for(&server).daily_stats(today).await,
            Some(DailyStats::default())
        );
    }
}
