use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::matching::catalog::{select_candidates, CandidateQuery, CatalogError, TrialCatalog};
use crate::matching::domain::{
    Gender, IncomeBracket, LocationTier, Patient, SexRestriction, Trial, TrialId,
};
use crate::matching::eligibility::{
    BackendError, EligibilityAssessor, EligibilityEngine, EligibilityResult, GenerationSettings,
    ReasoningBackend, ReasoningRequest,
};
use crate::matching::service::TrialMatchingService;

pub(super) const DIABETES_CRITERIA: &str = "Inclusion Criteria:\n\
    - Adults aged 18 to 65 with Type 2 Diabetes\n\
    - HbA1c between 7.0% and 10.5%\n\
    Exclusion Criteria:\n\
    - Pregnancy or breastfeeding\n\
    - eGFR below 30";

pub(super) fn patient() -> Patient {
    Patient {
        patient_id: Some("PT-0042".to_string()),
        age: Some(45),
        gender: Some(Gender::Male),
        location: Some("Nagpur".to_string()),
        location_tier: Some(LocationTier::Tier2),
        conditions: vec!["Type 2 Diabetes".to_string()],
        income_bracket: Some(IncomeBracket::Middle),
        ..Patient::default()
    }
}

pub(super) fn diabetes_trial() -> Trial {
    let mut trial = Trial::new("NCT05000001");
    trial.title = Some("Once-weekly GLP-1 agonist in Type 2 Diabetes".to_string());
    trial.status = Some("RECRUITING".to_string());
    trial.minimum_age = Some("18".to_string());
    trial.maximum_age = Some("65".to_string());
    trial.conditions = vec!["Type 2 Diabetes".to_string()];
    trial.locations = vec!["India".to_string()];
    trial.eligibility_criteria = Some(DIABETES_CRITERIA.to_string());
    trial
}

pub(super) fn womens_health_trial() -> Trial {
    let mut trial = Trial::new("NCT05000002");
    trial.title = Some("Bone density after menopause".to_string());
    trial.minimum_age = Some("50 Years".to_string());
    trial.sex = SexRestriction::Female;
    trial.conditions = vec!["Osteoporosis".to_string()];
    trial.locations = vec!["Toronto, Canada".to_string()];
    trial.eligibility_criteria = Some("Postmenopausal women aged 50 or older".to_string());
    trial
}

pub(super) fn cardiology_trial() -> Trial {
    let mut trial = Trial::new("NCT05000003");
    trial.title = Some("Statin adherence coaching".to_string());
    trial.maximum_age = Some("80 Years".to_string());
    trial.conditions = vec!["Coronary Artery Disease".to_string()];
    trial.locations = vec!["Boston, United States".to_string()];
    trial
}

pub(super) fn eligible_payload() -> String {
    serde_json::json!({
        "status": "ELIGIBLE",
        "confidence": 0.92,
        "inclusion_criteria": [
            {
                "criterion": "Adults aged 18 to 65 with Type 2 Diabetes",
                "patient_value": "45, Type 2 Diabetes",
                "status": "PASS",
                "reasoning": "Age and diagnosis match"
            }
        ],
        "exclusion_criteria": [
            {
                "criterion": "Pregnancy or breastfeeding",
                "patient_value": "male",
                "status": "NO_MATCH",
                "reasoning": "Not applicable"
            }
        ],
        "missing_data": [
            {"field": "HbA1c", "reason": "No recent lab value", "impact": "HIGH"}
        ]
    })
    .to_string()
}

/// How a [`ScriptedBackend`] answers every request.
pub(super) enum Script {
    Reply(String),
    Unreachable,
    Stall(Duration),
}

/// In-memory backend that replays a fixed script and records prompts.
pub(super) struct ScriptedBackend {
    script: Script,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(super) fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn replying(payload: impl Into<String>) -> Self {
        Self::new(Script::Reply(payload.into()))
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn last_prompt(&self) -> Option<String> {
        self.prompts
            .lock()
            .expect("prompt mutex poisoned")
            .last()
            .cloned()
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &ReasoningRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompt mutex poisoned")
            .push(request.prompt.clone());

        match &self.script {
            Script::Reply(payload) => Ok(payload.clone()),
            Script::Unreachable => Err(BackendError::Connection(
                "http://127.0.0.1:9".to_string(),
            )),
            Script::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("{}".to_string())
            }
        }
    }
}

pub(super) struct PanickingBackend;

#[async_trait]
impl ReasoningBackend for PanickingBackend {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn generate(&self, _request: &ReasoningRequest) -> Result<String, BackendError> {
        panic!("backend bug")
    }
}

/// Assessor that panics for one trial and delegates to the rules for the rest.
pub(super) struct FaultyAssessor {
    pub(super) poisoned: TrialId,
}

#[async_trait]
impl EligibilityAssessor for FaultyAssessor {
    async fn assess(&self, patient: &Patient, trial: &Trial) -> EligibilityResult {
        if trial.id == self.poisoned {
            panic!("assessor bug on {}", trial.id);
        }
        EligibilityEngine::rule_based().assess(patient, trial).await
    }
}

/// Assessor that never finishes, for cancellation tests.
pub(super) struct HangingAssessor;

#[async_trait]
impl EligibilityAssessor for HangingAssessor {
    async fn assess(&self, _patient: &Patient, _trial: &Trial) -> EligibilityResult {
        futures::future::pending::<()>().await;
        EligibilityResult::errored("unreachable")
    }
}

#[derive(Default)]
pub(super) struct MemoryCatalog {
    trials: Vec<Trial>,
}

impl MemoryCatalog {
    pub(super) fn with_trials(trials: Vec<Trial>) -> Self {
        Self { trials }
    }
}

impl TrialCatalog for MemoryCatalog {
    fn candidates(&self, query: &CandidateQuery) -> Result<Vec<Trial>, CatalogError> {
        Ok(select_candidates(&self.trials, query))
    }

    fn fetch(&self, id: &TrialId) -> Result<Option<Trial>, CatalogError> {
        Ok(self.trials.iter().find(|trial| &trial.id == id).cloned())
    }
}

pub(super) struct UnavailableCatalog;

impl TrialCatalog for UnavailableCatalog {
    fn candidates(&self, _query: &CandidateQuery) -> Result<Vec<Trial>, CatalogError> {
        Err(CatalogError::Unavailable("registry mirror offline".to_string()))
    }

    fn fetch(&self, _id: &TrialId) -> Result<Option<Trial>, CatalogError> {
        Err(CatalogError::Unavailable("registry mirror offline".to_string()))
    }
}

pub(super) fn engine_with(backend: Arc<dyn ReasoningBackend>) -> EligibilityEngine {
    EligibilityEngine::new(backend, GenerationSettings::default())
}

pub(super) fn sample_catalog() -> MemoryCatalog {
    MemoryCatalog::with_trials(vec![
        diabetes_trial(),
        womens_health_trial(),
        cardiology_trial(),
    ])
}

pub(super) fn rule_based_service() -> TrialMatchingService<MemoryCatalog> {
    TrialMatchingService::new(
        Arc::new(EligibilityEngine::rule_based()),
        Arc::new(sample_catalog()),
        4,
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
