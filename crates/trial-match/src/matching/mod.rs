//! Clinical trial matching: eligibility determination, diversity scoring and ranking.
//!
//! Eligibility runs through an AI reasoner when a backend is configured and
//! degrades to deterministic rule checks otherwise. Diversity scoring and
//! ranking are pure functions over the patient, the trial and the eligibility
//! confidence.

pub mod catalog;
pub mod diversity;
pub mod domain;
pub mod eligibility;
pub mod ranking;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{
    select_candidates, CandidateQuery, CatalogError, TrialCatalog, DEFAULT_CANDIDATE_LIMIT,
};
pub use diversity::{
    DiversityFactor, DiversityProfile, DiversityReason, DiversityResult, DiversityScorer,
    DiversityWeight, PriorityLevel,
};
pub use domain::{
    Gender, IncomeBracket, LabValue, LocationTier, Medication, Patient, PatientValidationError,
    SexRestriction, Trial, TrialId, MAX_PATIENT_AGE,
};
pub use eligibility::{
    AiReasoner, AssessmentSource, BackendError, CriterionEvaluator, CriterionStatus,
    DisabledBackend, EligibilityAssessor, EligibilityCriterion, EligibilityEngine,
    EligibilityResult, EligibilityStatus, GeminiBackend, GenerationSettings, ImpactLevel,
    MissingDataItem, PayloadError, ReasonerFailure, ReasoningBackend, ReasoningRequest,
    DEGRADED_MODE_FIELD,
};
pub use ranking::{
    CandidateAssessment, RankedTrial, RankingAggregator, RankingReport,
    DEFAULT_CANDIDATE_CONFIDENCE,
};
pub use router::matching_router;
pub use service::{MatchReport, MatchingError, OutcomeTally, TrialMatchingService};
