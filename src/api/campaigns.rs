use crate::api::{AppState, ErrorResponse};
use crate::domain::model::{BatchOutcome, CampaignResult, Prospect};
use crate::domain::ports::ProgressFn;
use crate::utils::logger;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignJob {
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub status: JobStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub total_prospects: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub deferred: usize,
    pub results: Vec<CampaignResult>,
    pub error: Option<String>,
}

impl CampaignJob {
    fn start(campaign_id: Uuid, campaign_name: Option<String>, total_prospects: usize) -> Self {
        let short_id = campaign_id.simple().to_string();
        Self {
            campaign_id,
            campaign_name: campaign_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("Campaign {}", &short_id[..8])),
            status: JobStatus::Running,
            started_at: chrono::Local::now().to_rfc3339(),
            completed_at: None,
            total_prospects,
            processed: 0,
            successful: 0,
            failed: 0,
            deferred: 0,
            results: Vec::new(),
            error: None,
        }
    }

    fn count(&mut self, result: &CampaignResult) {
        self.processed += 1;
        if result.sent {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }

    fn complete(&mut self, outcome: BatchOutcome) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(chrono::Local::now().to_rfc3339());
        self.processed = outcome.results.len();
        self.successful = outcome.sent_count();
        self.failed = outcome.failed_count();
        self.deferred = outcome.deferred.len();
        self.results = outcome.results;
    }

    fn fail(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(chrono::Local::now().to_rfc3339());
        self.error = Some(error);
    }
}

/// In-memory campaign registry shared between handlers and background jobs.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, CampaignJob>>>,
}

impl JobStore {
    pub fn insert(&self, job: CampaignJob) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.campaign_id, job);
    }

    pub fn get(&self, id: &Uuid) -> Option<CampaignJob> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn list(&self) -> Vec<CampaignJob> {
        let mut jobs: Vec<_> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        jobs
    }

    pub fn update(&self, id: &Uuid, apply: impl FnOnce(&mut CampaignJob)) {
        if let Some(job) = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(id)
        {
            apply(job);
        }
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|j| j.status == JobStatus::Running)
            .count()
    }

    /// Removes a finished job. Running jobs stay.
    pub fn remove(&self, id: &Uuid) -> Result<(), ErrorResponse> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.get(id).map(|j| j.status) {
            None => Err(ErrorResponse::not_found("Campaign not found")),
            Some(JobStatus::Running) => {
                Err(ErrorResponse::bad_request("Cannot delete running campaign"))
            }
            Some(_) => {
                jobs.remove(id);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProspectRequest {
    pub name: String,
    pub email: String,
    pub linkedin_url: Option<String>,
    pub company_domain: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartCampaignRequest {
    #[serde(default)]
    pub prospects: Vec<ProspectRequest>,
    pub campaign_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct CampaignStatusResponse {
    campaign_id: Uuid,
    campaign_name: String,
    status: JobStatus,
    started_at: String,
    completed_at: Option<String>,
    total_prospects: usize,
    processed: usize,
    successful: usize,
    failed: usize,
    deferred: usize,
    error: Option<String>,
    /// Only once the job has completed.
    results: Option<Vec<CampaignResult>>,
}

impl From<CampaignJob> for CampaignStatusResponse {
    fn from(job: CampaignJob) -> Self {
        let results = (job.status == JobStatus::Completed).then_some(job.results);
        Self {
            campaign_id: job.campaign_id,
            campaign_name: job.campaign_name,
            status: job.status,
            started_at: job.started_at,
            completed_at: job.completed_at,
            total_prospects: job.total_prospects,
            processed: job.processed,
            successful: job.successful,
            failed: job.failed,
            deferred: job.deferred,
            error: job.error,
            results,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/campaign/start", web::post().to(start_campaign))
        .route("/campaign/{campaign_id}", web::get().to(get_campaign))
        .route("/campaign/{campaign_id}", web::delete().to(delete_campaign))
        .route("/campaigns", web::get().to(list_campaigns));
}

fn parse_id(raw: &str) -> Result<Uuid, ErrorResponse> {
    Uuid::parse_str(raw).map_err(|_| ErrorResponse::not_found("Campaign not found"))
}

async fn start_campaign(
    state: web::Data<AppState>,
    req: web::Json<StartCampaignRequest>,
) -> Result<HttpResponse, ErrorResponse> {
    let req = req.into_inner();
    if req.prospects.is_empty() {
        return Err(ErrorResponse::bad_request("No prospects provided"));
    }

    let prospects = req
        .prospects
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            Prospect::new(p.name, p.email, p.linkedin_url, p.company_domain, p.phone)
                .map_err(|e| ErrorResponse::bad_request(format!("prospects[{}]: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let campaign_id = Uuid::new_v4();
    let total = prospects.len();
    let job = CampaignJob::start(campaign_id, req.campaign_name, total);
    let span = logger::campaign_span(&campaign_id, &job.campaign_name);
    state.jobs.insert(job);
    span.in_scope(|| tracing::info!("🚀 Campaign {} started with {} prospects", campaign_id, total));

    let jobs = state.jobs.clone();
    let progress_jobs = jobs.clone();
    let progress: ProgressFn = Arc::new(move |result: &CampaignResult| {
        progress_jobs.update(&campaign_id, |job| job.count(result));
    });
    let runner = state.runner.clone();

    let work = tokio::spawn(
        async move { runner.run_campaign(prospects, Some(progress)).await }
            .instrument(span.clone()),
    );
    tokio::spawn(async move {
        match work.await {
            Ok(outcome) => {
                tracing::info!(
                    "✨ Campaign {} completed: {}/{} sent",
                    campaign_id,
                    outcome.sent_count(),
                    outcome.results.len()
                );
                jobs.update(&campaign_id, |job| job.complete(outcome));
            }
            Err(e) => {
                tracing::error!("❌ Campaign {} failed: {}", campaign_id, e);
                jobs.update(&campaign_id, |job| job.fail(e.to_string()));
            }
        }
    }
    .instrument(span));

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "campaign_id": campaign_id,
        "status": "started",
        "message": format!("Campaign started with {} prospects", total),
        "check_status_url": format!("/campaign/{}", campaign_id),
    })))
}

async fn get_campaign(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ErrorResponse> {
    let id = parse_id(&path)?;
    let job = state
        .jobs
        .get(&id)
        .ok_or_else(|| ErrorResponse::not_found("Campaign not found"))?;
    Ok(HttpResponse::Ok().json(CampaignStatusResponse::from(job)))
}

async fn list_campaigns(state: web::Data<AppState>) -> impl Responder {
    let campaigns: Vec<_> = state
        .jobs
        .list()
        .into_iter()
        .map(|job| {
            serde_json::json!({
                "campaign_id": job.campaign_id,
                "campaign_name": job.campaign_name,
                "status": job.status,
                "started_at": job.started_at,
                "total_prospects": job.total_prospects,
                "successful": job.successful,
                "failed": job.failed,
            })
        })
        .collect();
    HttpResponse::Ok().json(serde_json::json!({ "campaigns": campaigns }))
}

async fn delete_campaign(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ErrorResponse> {
    let id = parse_id(&path)?;
    state.jobs.remove(&id)?;
    tracing::info!("🗑️ Campaign {} deleted", id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Campaign {} deleted", id)
    })))
}
