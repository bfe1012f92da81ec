//! HTTP job API. Campaigns run in the background and live in memory only.

pub mod campaigns;

pub use campaigns::{CampaignJob, JobStatus, JobStore};

use crate::config::toml_config::OutreachConfig;
use crate::core::quota::{QuotaCounter, QuotaSnapshot};
use crate::domain::ports::{CampaignRunner, CampaignTracker};
use actix_web::{error, http::StatusCode, web, HttpResponse, Responder};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<dyn CampaignRunner>,
    pub quota: Arc<QuotaCounter>,
    pub tracker: Arc<dyn CampaignTracker>,
    pub config: Arc<OutreachConfig>,
    pub jobs: JobStore,
}

impl AppState {
    pub fn new(
        runner: Arc<dyn CampaignRunner>,
        quota: Arc<QuotaCounter>,
        tracker: Arc<dyn CampaignTracker>,
        config: Arc<OutreachConfig>,
    ) -> Self {
        Self {
            runner,
            quota,
            tracker,
            config,
            jobs: JobStore::default(),
        }
    }
}

/// JSON body for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            status_code: status.as_u16(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

impl error::ResponseError for ErrorResponse {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ErrorResponse::new(
        StatusCode::BAD_REQUEST,
        "invalid_json",
        format!("Invalid JSON: {}", err),
    )
    .into()
}

/// JSON config with the custom payload error handler; register it with `app_data`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(handle_json_payload_error)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(health))
        .route("/status", web::get().to(status))
        .configure(campaigns::configure);
}

fn email_status(snapshot: &QuotaSnapshot) -> serde_json::Value {
    json!({
        "sent_today": snapshot.sent_today,
        "limit": snapshot.limit,
        "remaining": snapshot.remaining,
    })
}

async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Outreach Pipeline API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "status": "/status",
            "start_campaign": "/campaign/start",
            "campaign_status": "/campaign/{campaign_id}",
            "campaigns": "/campaigns",
            "health": "/health"
        }
    }))
}

async fn health(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.quota.snapshot().await;
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Local::now().to_rfc3339(),
        "daily_email_status": email_status(&snapshot),
    }))
}

async fn status(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.quota.snapshot().await;
    let tracker_stats = state.tracker.daily_stats(state.quota.today()).await;
    let config = &state.config;
    HttpResponse::Ok().json(json!({
        "system": "Outreach Pipeline",
        "status": "operational",
        "configuration": {
            "daily_email_limit": config.rate_limit.daily_email_limit,
            "delay_between_emails": config.rate_limit.delay_between_emails_secs,
            "delay_between_scrapes": config.rate_limit.delay_between_scrapes_secs,
            "llm_model": config.llm.model,
            "tracker_enabled": config.tracker.enabled,
        },
        "email_status": email_status(&snapshot),
        "tracker_stats": tracker_stats,
        "active_campaigns": state.jobs.running_count(),
        "available_offers": config.offer_names(),
    }))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::domain::model::{BatchOutcome, CampaignResult, Prospect};
    use crate::domain::ports::ProgressFn;
    use crate::tracker::NullTracker;
    use async_trait::async_trait;

    /// Marks every prospect sent, reporting progress as it goes.
    pub struct InstantRunner;

    #[async_trait]
    impl CampaignRunner for InstantRunner {
        async fn run_campaign(&self, prospects: Vec<Prospect>, progress: Option<ProgressFn>) -> BatchOutcome {
            let mut outcome = BatchOutcome::default();
            for prospect in prospects {
                let result = CampaignResult {
                    prospect,
                    message: None,
                    sent: true,
                    sent_at: Some(chrono::Local::now().to_rfc3339()),
                    error: None,
                };
                if let Some(progress) = &progress {
                    progress(&result);
                }
                outcome.results.push(result);
            }
            outcome
        }
    }

    /// Panics inside the background task.
    pub struct PanickingRunner;

    #[async_trait]
    impl CampaignRunner for PanickingRunner {
        async fn run_campaign(&self, _: Vec<Prospect>, _: Option<ProgressFn>) -> BatchOutcome {
            panic!("runner blew up")
        }
    }

    pub fn state(runner: Arc<dyn CampaignRunner>) -> AppState {
        AppState::new(
            runner,
            Arc::new(QuotaCounter::in_memory(50)),
            Arc::new(NullTracker),
            Arc::new(OutreachConfig::default()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{state, InstantRunner};
    use super::*;
    use crate::domain::model::DailyStats;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_root_lists_endpoints() {
        let app = test::init_service(App::new().configure(configure)).await;
        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(body["endpoints"]["health"], "/health");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn test_health_reports_quota() {
        let state = state(Arc::new(InstantRunner));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
                .await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["daily_email_status"]["limit"], 50);
        assert_eq!(body["daily_email_status"]["remaining"], 50);
    }

    #[actix_web::test]
    async fn test_status_lists_offers() {
        let state = state(Arc::new(InstantRunner));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/status").to_request())
                .await;
        assert_eq!(body["status"], "operational");
        assert_eq!(body["active_campaigns"], 0);
        assert_eq!(body["configuration"]["llm_model"], "gpt-4");
        assert_eq!(body["available_offers"].as_array().unwrap().len(), 4);
        assert!(body["tracker_stats"].is_null());
    }

    struct SheetStub;

    #[async_trait::async_trait]
    impl CampaignTracker for SheetStub {
        async fn record(&self, _: crate::domain::model::TrackingEntry) {}

        async fn daily_stats(&self, _: chrono::NaiveDate) -> Option<DailyStats> {
            Some(DailyStats {
                sent: 3,
                skipped: 1,
                total: 4,
            })
        }
    }

    #[actix_web::test]
    async fn test_status_reports_tracker_stats() {
        let mut state = state(Arc::new(InstantRunner));
        state.tracker = Arc::new(SheetStub);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/status").to_request())
                .await;
        assert_eq!(body["tracker_stats"], json!({"sent": 3, "skipped": 1, "total": 4}));
    }

    #[core::prelude::v1::test]
    fn test_error_response_status() {
        use actix_web::ResponseError;
        let err = ErrorResponse::not_found("Campaign not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "not_found: Campaign not found");
    }
}
