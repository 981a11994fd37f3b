use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::catalog::{TrialCatalog, DEFAULT_CANDIDATE_LIMIT};
use super::domain::{Patient, Trial, TrialId};
use super::ranking::CandidateAssessment;
use super::service::{MatchingError, TrialMatchingService};

/// Base score used by the diversity endpoint when the caller supplies none.
const DEFAULT_BASE_SCORE: f64 = 50.0;

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    pub patient: Patient,
    pub trial: Trial,
}

#[derive(Debug, Deserialize)]
pub struct DiversityRequest {
    pub patient: Patient,
    pub trial: Trial,
    #[serde(default)]
    pub base_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RankingRequest {
    pub patient: Patient,
    #[serde(default)]
    pub candidates: Vec<CandidateAssessment>,
}

/// Batch match request. Explicit trials win over ids; with neither, the catalog is searched.
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub patient: Patient,
    #[serde(default)]
    pub trials: Option<Vec<Trial>>,
    #[serde(default)]
    pub trial_ids: Option<Vec<TrialId>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Router builder exposing eligibility, diversity, ranking and batch matching endpoints.
pub fn matching_router<C>(service: Arc<TrialMatchingService<C>>) -> Router
where
    C: TrialCatalog + 'static,
{
    Router::new()
        .route("/api/v1/eligibility", post(eligibility_handler::<C>))
        .route("/api/v1/diversity", post(diversity_handler::<C>))
        .route("/api/v1/rankings", post(ranking_handler::<C>))
        .route("/api/v1/matches", post(match_handler::<C>))
        .route("/api/v1/trials/:trial_id", get(trial_handler::<C>))
        .with_state(service)
}

pub(crate) async fn eligibility_handler<C>(
    State(service): State<Arc<TrialMatchingService<C>>>,
    axum::Json(request): axum::Json<EligibilityRequest>,
) -> Response
where
    C: TrialCatalog + 'static,
{
    match service.assess(&request.patient, &request.trial).await {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn diversity_handler<C>(
    State(service): State<Arc<TrialMatchingService<C>>>,
    axum::Json(request): axum::Json<DiversityRequest>,
) -> Response
where
    C: TrialCatalog + 'static,
{
    let base_score = request.base_score.unwrap_or(DEFAULT_BASE_SCORE);
    match service.score_diversity(&request.patient, &request.trial, base_score) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ranking_handler<C>(
    State(service): State<Arc<TrialMatchingService<C>>>,
    axum::Json(request): axum::Json<RankingRequest>,
) -> Response
where
    C: TrialCatalog + 'static,
{
    match service.rank(&request.patient, request.candidates) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn match_handler<C>(
    State(service): State<Arc<TrialMatchingService<C>>>,
    axum::Json(request): axum::Json<MatchRequest>,
) -> Response
where
    C: TrialCatalog + 'static,
{
    let MatchRequest {
        patient,
        trials,
        trial_ids,
        limit,
    } = request;

    let trials = match (trials, trial_ids) {
        (Some(trials), _) => Ok(trials),
        (None, Some(ids)) => service.resolve(&ids),
        (None, None) => service.search(&patient, limit.unwrap_or(DEFAULT_CANDIDATE_LIMIT)),
    };

    let outcome = match trials {
        Ok(trials) => service.match_trials(&patient, trials).await,
        Err(error) => Err(error),
    };

    match outcome {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn trial_handler<C>(
    State(service): State<Arc<TrialMatchingService<C>>>,
    Path(trial_id): Path<String>,
) -> Response
where
    C: TrialCatalog + 'static,
{
    match service.trial(&TrialId(trial_id)) {
        Ok(trial) => (StatusCode::OK, axum::Json(trial)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn status_for(error: &MatchingError) -> StatusCode {
    match error {
        MatchingError::InvalidPatient(_)
        | MatchingError::InvalidBaseScore(_)
        | MatchingError::InvalidConfidence { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MatchingError::TrialNotFound(_) => StatusCode::NOT_FOUND,
        MatchingError::Catalog(_) | MatchingError::Cancelled { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn error_response(error: MatchingError) -> Response {
    let status = status_for(&error);
    let mut payload = json!({
        "error": error.to_string(),
    });
    if let MatchingError::TrialNotFound(id) = &error {
        payload["trial_id"] = json!(id);
    }
    (status, axum::Json(payload)).into_response()
}
