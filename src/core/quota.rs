use crate::config::cli::write_atomic;
use crate::utils::clock::{system_clock, Clock};
use crate::utils::error::{OutreachError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 追蹤檔內容：{"date": "YYYY-MM-DD", "count": N}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct QuotaRecord {
    date: String,
    count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub date: String,
    pub sent_today: u32,
    pub limit: u32,
    pub remaining: u32,
}

/// Daily send ceiling persisted to a flat JSON file.
///
/// The count is held behind an async mutex for the whole check, deliver and
/// increment sequence, so concurrent callers in one process cannot overrun
/// the limit. A changed calendar date resets the count before any check.
pub struct QuotaCounter {
    limit: u32,
    tracking_file: Option<PathBuf>,
    clock: Clock,
    state: Mutex<QuotaRecord>,
}

impl QuotaCounter {
    pub async fn load(tracking_file: impl Into<PathBuf>, limit: u32) -> Self {
        Self::load_with_clock(Some(tracking_file.into()), limit, system_clock()).await
    }

    /// 不落地的計數器，dry-run 與測試用
    pub fn in_memory(limit: u32) -> Self {
        Self::from_parts(None, limit, system_clock(), 0)
    }

    pub async fn load_with_clock(tracking_file: Option<PathBuf>, limit: u32, clock: Clock) -> Self {
        let today = clock().format(DATE_FORMAT).to_string();
        let count = match &tracking_file {
            Some(path) => restore_count(path, &today).await,
            None => 0,
        };

        tracing::debug!("📊 Quota loaded: {}/{} sent on {}", count, limit, today);
        Self::from_parts(tracking_file, limit, clock, count)
    }

    fn from_parts(tracking_file: Option<PathBuf>, limit: u32, clock: Clock, count: u32) -> Self {
        let date = clock().format(DATE_FORMAT).to_string();
        Self {
            limit,
            tracking_file,
            clock,
            state: Mutex::new(QuotaRecord { date, count }),
        }
    }

    /// Keeps the restored count but never writes it back.
    pub fn without_persistence(mut self) -> Self {
        self.tracking_file = None;
        self
    }

    /// The day the counter is tracking.
    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub async fn snapshot(&self) -> QuotaSnapshot {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);
        QuotaSnapshot {
            date: state.date.clone(),
            sent_today: state.count,
            limit: self.limit,
            remaining: self.limit.saturating_sub(state.count),
        }
    }

    pub async fn remaining(&self) -> u32 {
        self.snapshot().await.remaining
    }

    pub async fn can_send(&self) -> bool {
        self.remaining().await > 0
    }

    /// Runs `deliver` only while under the limit, counting it once it succeeds.
    ///
    /// At the ceiling this returns [`OutreachError::QuotaExhausted`] without
    /// calling `deliver`. A failed delivery leaves the count untouched.
    pub async fn send_within_quota<F, Fut, T>(&self, deliver: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);

        if state.count >= self.limit {
            return Err(OutreachError::QuotaExhausted { limit: self.limit });
        }

        let delivered = deliver().await?;

        state.count += 1;
        tracing::info!("📧 Emails sent today: {}/{}", state.count, self.limit);
        self.persist(&state).await;

        Ok(delivered)
    }

    fn roll_over(&self, state: &mut QuotaRecord) {
        let today = (self.clock)().format(DATE_FORMAT).to_string();
        if state.date != today {
            tracing::info!("🗓️ New day {}, resetting email count (was {})", today, state.count);
            state.date = today;
            state.count = 0;
        }
    }

    async fn persist(&self, state: &QuotaRecord) {
        let Some(path) = &self.tracking_file else {
            return;
        };

        let result: Result<()> = async {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let data = serde_json::to_vec(state)?;
            write_atomic(path, &data).await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("❌ Failed to save email tracking file {}: {}", path.display(), e);
        }
    }
}

async fn restore_count(path: &Path, today: &str) -> u32 {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!("⚠️ Could not read email tracking file {}: {}", path.display(), e);
            return 0;
        }
    };

    match serde_json::from_slice::<QuotaRecord>(&data) {
        Ok(record) if record.date == today => record.count,
        Ok(record) => {
            tracing::debug!("Tracking file is from {}, starting a fresh count", record.date);
            0
        }
        Err(e) => {
            tracing::warn!("⚠️ Could not parse email tracking file {}: {}", path.display(), e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn movable_clock(date: NaiveDate) -> (Clock, Arc<std::sync::Mutex<NaiveDate>>) {
        let shared = Arc::new(std::sync::Mutex::new(date));
        let handle = shared.clone();
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, shared)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn read_record(path: &std::path::Path) -> QuotaRecord {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_restores_count_only_for_today() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, r#"{"date":"2024-03-05","count":7}"#).unwrap();

        let (clock, _) = movable_clock(day(5));
        let counter = QuotaCounter::load_with_clock(Some(path.clone()), 10, clock).await;
        assert_eq!(counter.remaining().await, 3);

        let (clock, _) = movable_clock(day(6));
        let counter = QuotaCounter::load_with_clock(Some(path), 10, clock).await;
        assert_eq!(counter.remaining().await, 10);
    }

    #[tokio::test]
    async fn test_unreadable_file_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, "not json").unwrap();

        let (clock, _) = movable_clock(day(5));
        let counter = QuotaCounter::load_with_clock(Some(path), 3, clock).await;
        assert_eq!(counter.snapshot().await.sent_today, 0);
    }

    #[tokio::test]
    async fn test_successful_send_increments_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("tracking.json");
        let (clock, _) = movable_clock(day(5));
        let counter = QuotaCounter::load_with_clock(Some(path.clone()), 2, clock).await;

        let value = counter.send_within_quota(|| async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);

        let record = read_record(&path);
        assert_eq!(record.date, "2024-03-05");
        assert_eq!(record.count, 1);
        assert!(!dir.path().join("data").join("tracking.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_send_leaves_count_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        let (clock, _) = movable_clock(day(5));
        let counter = QuotaCounter::load_with_clock(Some(path.clone()), 2, clock).await;

        let result: Result<()> = counter
            .send_within_quota(|| async {
                Err(OutreachError::MailError {
                    message: "535 auth".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.remaining().await, 2);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_refuses_at_ceiling_without_delivering() {
        let (clock, _) = movable_clock(day(5));
        let counter = QuotaCounter::load_with_clock(None, 1, clock).await;
        let calls = AtomicUsize::new(0);

        counter
            .send_within_quota(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        let second = counter
            .send_within_quota(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(second, Err(OutreachError::QuotaExhausted { limit: 1 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!counter.can_send().await);
    }

    #[tokio::test]
    async fn test_rolls_over_when_the_date_changes() {
        let (clock, today) = movable_clock(day(5));
        let counter = QuotaCounter::load_with_clock(None, 1, clock).await;
        counter.send_within_quota(|| async { Ok(()) }).await.unwrap();
        assert_eq!(counter.remaining().await, 0);

        *today.lock().unwrap() = day(6);

        let snapshot = counter.snapshot().await;
        assert_eq!(snapshot.date, "2024-03-06");
        assert_eq!(snapshot.remaining, 1);
        assert!(counter.send_within_quota(|| async { Ok(()) }).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_senders_never_overrun() {
        let (clock, _) = movable_clock(day(5));
        let counter = Arc::new(QuotaCounter::load_with_clock(None, 3, clock).await);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                counter
                    .send_within_quota(|| async {
                        tokio::task::yield_now().await;
                        Ok(())
                    })
                    .await
                    .is_ok()
            }));
        }

        let mut sent = 0;
        for handle in handles {
            if handle.await.unwrap() {
                sent += 1;
            }
        }
        assert_eq!(sent, 3);
        assert_eq!(counter.remaining().await, 0);
    }

    #[tokio::test]
    async fn test_without_persistence_keeps_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, r#"{"date":"2024-03-05","count":1}"#).unwrap();

        let (clock, _) = movable_clock(day(5));
        let counter = QuotaCounter::load_with_clock(Some(path.clone()), 5, clock)
            .await
            .without_persistence();
        counter.send_within_quota(|| async { Ok(()) }).await.unwrap();

        assert_eq!(counter.remaining().await, 3);
        assert_eq!(read_record(&path).count, 1);
    }
}
