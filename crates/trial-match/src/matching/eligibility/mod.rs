mod evaluator;
mod policy;
pub mod reasoner;
mod rules;

pub use evaluator::CriterionEvaluator;
pub use reasoner::{
    AiReasoner, BackendError, DisabledBackend, GeminiBackend, GenerationSettings, PayloadError,
    ReasonerFailure, ReasoningBackend, ReasoningRequest,
};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{Patient, Trial};
use crate::config::ReasonerConfig;

/// Overall eligibility classification for a (patient, trial) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityStatus {
    Eligible,
    NotEligible,
    PossiblyEligible,
    Error,
}

impl EligibilityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EligibilityStatus::Eligible => "ELIGIBLE",
            EligibilityStatus::NotEligible => "NOT_ELIGIBLE",
            EligibilityStatus::PossiblyEligible => "POSSIBLY_ELIGIBLE",
            EligibilityStatus::Error => "ERROR",
        }
    }

    /// Parse one of the three decision statuses a reasoner may report.
    ///
    /// `ERROR` is reserved for assessments that could not run at all, so it is
    /// not accepted from external payloads.
    pub fn parse_decision(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "ELIGIBLE" => Some(EligibilityStatus::Eligible),
            "NOT_ELIGIBLE" | "INELIGIBLE" => Some(EligibilityStatus::NotEligible),
            "POSSIBLY_ELIGIBLE" => Some(EligibilityStatus::PossiblyEligible),
            _ => None,
        }
    }
}

/// Per-criterion judgement. Inclusion criteria use pass/fail/missing, exclusion
/// criteria use match/no-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriterionStatus {
    Pass,
    Fail,
    Missing,
    Match,
    NoMatch,
}

impl CriterionStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "PASS" | "MET" => Some(CriterionStatus::Pass),
            "FAIL" | "NOT_MET" => Some(CriterionStatus::Fail),
            "MISSING" | "UNKNOWN" => Some(CriterionStatus::Missing),
            "MATCH" => Some(CriterionStatus::Match),
            "NO_MATCH" | "NOT_MATCH" => Some(CriterionStatus::NoMatch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityCriterion {
    pub criterion: String,
    pub patient_value: String,
    pub status: CriterionStatus,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactLevel {
    Critical,
    High,
    Medium,
    Low,
    System,
}

impl ImpactLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "CRITICAL" => Some(ImpactLevel::Critical),
            "HIGH" => Some(ImpactLevel::High),
            "MEDIUM" | "MODERATE" => Some(ImpactLevel::Medium),
            "LOW" => Some(ImpactLevel::Low),
            "SYSTEM" => Some(ImpactLevel::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDataItem {
    pub field: String,
    pub reason: String,
    pub impact: ImpactLevel,
}

impl MissingDataItem {
    pub fn new(field: impl Into<String>, reason: impl Into<String>, impact: ImpactLevel) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
            impact,
        }
    }
}

/// Which path produced an eligibility result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentSource {
    Ai,
    RuleBased,
}

/// Field name of the marker prepended whenever the reasoner was bypassed.
pub const DEGRADED_MODE_FIELD: &str = "llm_status";

/// Canonical eligibility output shared by the reasoner and the rule-based evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub status: EligibilityStatus,
    pub confidence: f64,
    #[serde(default)]
    pub inclusion_criteria: Vec<EligibilityCriterion>,
    #[serde(default)]
    pub exclusion_criteria: Vec<EligibilityCriterion>,
    #[serde(default)]
    pub missing_data: Vec<MissingDataItem>,
    #[serde(default = "default_source")]
    pub source: AssessmentSource,
}

fn default_source() -> AssessmentSource {
    AssessmentSource::RuleBased
}

impl EligibilityResult {
    /// Fixed answer for trials that publish no free-text criteria.
    pub fn criteria_unavailable() -> Self {
        Self {
            status: EligibilityStatus::PossiblyEligible,
            confidence: 0.6,
            inclusion_criteria: Vec::new(),
            exclusion_criteria: Vec::new(),
            missing_data: vec![MissingDataItem::new(
                "eligibility_criteria",
                "Trial eligibility criteria not available",
                ImpactLevel::Critical,
            )],
            source: AssessmentSource::RuleBased,
        }
    }

    /// Result used when an assessment aborted before producing any judgement.
    pub fn errored(reason: impl Into<String>) -> Self {
        Self {
            status: EligibilityStatus::Error,
            confidence: 0.0,
            inclusion_criteria: Vec::new(),
            exclusion_criteria: Vec::new(),
            missing_data: vec![MissingDataItem::new(
                "assessment",
                reason,
                ImpactLevel::System,
            )],
            source: AssessmentSource::RuleBased,
        }
    }

    /// Prepend the degraded-mode marker and tag the result as rule-derived.
    pub fn degraded(mut self, cause: &ReasonerFailure) -> Self {
        self.missing_data.insert(
            0,
            MissingDataItem::new(
                DEGRADED_MODE_FIELD,
                format!("AI reasoning unavailable ({cause}); rule-based evaluation applied"),
                ImpactLevel::System,
            ),
        );
        self.source = AssessmentSource::RuleBased;
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.missing_data
            .iter()
            .any(|item| item.field == DEGRADED_MODE_FIELD && item.impact == ImpactLevel::System)
    }

    pub fn has_critical_gap(&self) -> bool {
        self.missing_data
            .iter()
            .any(|item| item.impact == ImpactLevel::Critical)
    }
}

/// Shared capability of every eligibility path, so callers never care which one ran.
#[async_trait]
pub trait EligibilityAssessor: Send + Sync {
    async fn assess(&self, patient: &Patient, trial: &Trial) -> EligibilityResult;
}

/// Orchestrates the reasoner and the rule-based evaluator behind one infallible call.
pub struct EligibilityEngine {
    reasoner: AiReasoner,
    evaluator: CriterionEvaluator,
}

impl EligibilityEngine {
    pub fn new(backend: Arc<dyn ReasoningBackend>, settings: GenerationSettings) -> Self {
        Self {
            reasoner: AiReasoner::new(backend, settings),
            evaluator: CriterionEvaluator,
        }
    }

    /// Engine without a reasoning backend; every assessment resolves through the rules.
    pub fn rule_based() -> Self {
        Self::new(Arc::new(DisabledBackend), GenerationSettings::default())
    }

    /// Build the Gemini-backed engine when an API key is configured, else the rule-based one.
    pub fn from_config(config: &ReasonerConfig) -> Result<Self, BackendError> {
        let settings = GenerationSettings::from(config);
        if !config.is_enabled() {
            return Ok(Self::new(Arc::new(DisabledBackend), settings));
        }

        let backend = GeminiBackend::from_config(config)?;
        Ok(Self::new(Arc::new(backend), settings))
    }

    pub fn backend_name(&self) -> &str {
        self.reasoner.backend_name()
    }
}

#[async_trait]
impl EligibilityAssessor for EligibilityEngine {
    async fn assess(&self, patient: &Patient, trial: &Trial) -> EligibilityResult {
        let Some(criteria) = trial.criteria_text() else {
            debug!(trial = %trial.id, "trial publishes no free-text criteria");
            return EligibilityResult::criteria_unavailable();
        };

        match self.reasoner.reason(patient, trial, criteria).await {
            Ok(result) => {
                debug!(
                    trial = %trial.id,
                    status = result.status.label(),
                    confidence = result.confidence,
                    "reasoner assessment complete"
                );
                result
            }
            Err(failure) => {
                if matches!(failure, ReasonerFailure::Unconfigured) {
                    debug!(trial = %trial.id, "reasoning backend disabled; applying rules");
                } else {
                    warn!(trial = %trial.id, %failure, "reasoner failed; applying rules");
                }
                self.evaluator.evaluate(patient, trial).degraded(&failure)
            }
        }
    }
}

fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}
