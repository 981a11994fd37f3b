use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::catalog::{CandidateQuery, CatalogError, TrialCatalog};
use super::diversity::{DiversityProfile, DiversityResult, DiversityScorer};
use super::domain::{Patient, PatientValidationError, Trial, TrialId};
use super::eligibility::{EligibilityAssessor, EligibilityResult, EligibilityStatus};
use super::ranking::{CandidateAssessment, RankingAggregator, RankingReport};

/// Service composing the eligibility engine, diversity scoring, ranking and the trial catalog.
pub struct TrialMatchingService<C> {
    assessor: Arc<dyn EligibilityAssessor>,
    aggregator: RankingAggregator,
    catalog: Arc<C>,
    concurrency: usize,
}

/// Counts of assessment outcomes across one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub eligible: usize,
    pub possibly_eligible: usize,
    pub not_eligible: usize,
    pub errored: usize,
}

impl OutcomeTally {
    fn record(&mut self, status: EligibilityStatus) {
        match status {
            EligibilityStatus::Eligible => self.eligible += 1,
            EligibilityStatus::PossiblyEligible => self.possibly_eligible += 1,
            EligibilityStatus::NotEligible => self.not_eligible += 1,
            EligibilityStatus::Error => self.errored += 1,
        }
    }
}

/// Output of a full match run for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub patient_profile: DiversityProfile,
    pub trials_checked: usize,
    pub tally: OutcomeTally,
    pub ranking: RankingReport,
}

impl<C> TrialMatchingService<C>
where
    C: TrialCatalog + 'static,
{
    pub fn new(assessor: Arc<dyn EligibilityAssessor>, catalog: Arc<C>, concurrency: usize) -> Self {
        Self {
            assessor,
            aggregator: RankingAggregator::new(DiversityScorer),
            catalog,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Assess a single (patient, trial) pair.
    pub async fn assess(
        &self,
        patient: &Patient,
        trial: &Trial,
    ) -> Result<EligibilityResult, MatchingError> {
        patient.validate()?;
        Ok(self.assessor.assess(patient, trial).await)
    }

    pub fn score_diversity(
        &self,
        patient: &Patient,
        trial: &Trial,
        base_score: f64,
    ) -> Result<DiversityResult, MatchingError> {
        patient.validate()?;
        if !base_score.is_finite() || base_score < 0.0 {
            return Err(MatchingError::InvalidBaseScore(base_score));
        }
        Ok(DiversityScorer.score(patient, trial, base_score))
    }

    /// Rank pre-assessed candidates; no eligibility calls are made.
    ///
    /// Caller-supplied confidences must be finite and within `[0, 1]`.
    pub fn rank(
        &self,
        patient: &Patient,
        candidates: Vec<CandidateAssessment>,
    ) -> Result<RankingReport, MatchingError> {
        patient.validate()?;
        if let Some(candidate) = candidates
            .iter()
            .find(|candidate| !candidate.has_valid_confidence())
        {
            return Err(MatchingError::InvalidConfidence {
                trial: candidate.trial.id.clone(),
            });
        }
        Ok(self.aggregator.rank(patient, candidates))
    }

    pub fn profile(&self, patient: &Patient) -> Result<DiversityProfile, MatchingError> {
        patient.validate()?;
        Ok(DiversityProfile::for_patient(patient))
    }

    pub fn trial(&self, id: &TrialId) -> Result<Trial, MatchingError> {
        self.catalog
            .fetch(id)?
            .ok_or_else(|| MatchingError::TrialNotFound(id.clone()))
    }

    /// Resolve trial ids through the catalog, failing on the first unknown id.
    pub fn resolve(&self, ids: &[TrialId]) -> Result<Vec<Trial>, MatchingError> {
        ids.iter().map(|id| self.trial(id)).collect()
    }

    /// Pull candidate trials for the patient from the catalog.
    pub fn search(&self, patient: &Patient, limit: usize) -> Result<Vec<Trial>, MatchingError> {
        let query = CandidateQuery::for_patient(patient, limit);
        let trials = self.catalog.candidates(&query)?;
        debug!(found = trials.len(), limit, "catalog candidates loaded");
        Ok(trials)
    }

    /// Assess every trial concurrently, then rank the results.
    pub async fn match_trials(
        &self,
        patient: &Patient,
        trials: Vec<Trial>,
    ) -> Result<MatchReport, MatchingError> {
        patient.validate()?;
        let requested = trials.len();
        info!(
            trials = requested,
            concurrency = self.concurrency,
            "starting batch eligibility assessment"
        );

        let assessments = self.assess_all(patient, trials).await;

        let mut tally = OutcomeTally::default();
        for candidate in &assessments {
            if let Some(result) = &candidate.eligibility {
                tally.record(result.status);
            }
        }

        let ranking = self.aggregator.rank(patient, assessments);
        info!(
            trials = requested,
            eligible = tally.eligible,
            possibly_eligible = tally.possibly_eligible,
            not_eligible = tally.not_eligible,
            errored = tally.errored,
            high_priority = ranking.total_high_priority,
            "batch assessment ranked"
        );

        Ok(MatchReport {
            patient_profile: DiversityProfile::for_patient(patient),
            trials_checked: requested,
            tally,
            ranking,
        })
    }

    /// [`match_trials`](Self::match_trials) that gives up when `cancel` resolves first.
    ///
    /// In-flight backend calls are dropped and the batch reports
    /// [`MatchingError::Cancelled`] instead of a partial ranking.
    pub async fn match_trials_until<F>(
        &self,
        patient: &Patient,
        trials: Vec<Trial>,
        cancel: F,
    ) -> Result<MatchReport, MatchingError>
    where
        F: Future<Output = ()>,
    {
        let requested = trials.len();
        tokio::select! {
            biased;
            _ = cancel => {
                info!(trials = requested, "batch assessment cancelled");
                Err(MatchingError::Cancelled { requested })
            }
            report = self.match_trials(patient, trials) => report,
        }
    }

    async fn assess_all(&self, patient: &Patient, trials: Vec<Trial>) -> Vec<CandidateAssessment> {
        futures::stream::iter(trials)
            .map(|trial| async move {
                let outcome = AssertUnwindSafe(self.assessor.assess(patient, &trial))
                    .catch_unwind()
                    .await;
                let eligibility = match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        error!(trial = %trial.id, "eligibility assessment panicked");
                        EligibilityResult::errored("Eligibility assessment aborted unexpectedly")
                    }
                };
                CandidateAssessment {
                    trial,
                    eligibility: Some(eligibility),
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Error raised by the matching service.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error(transparent)]
    InvalidPatient(#[from] PatientValidationError),
    #[error("base score must be a non-negative number (found {0})")]
    InvalidBaseScore(f64),
    #[error("eligibility confidence for trial {trial} must be a number between 0 and 1")]
    InvalidConfidence { trial: TrialId },
    #[error("trial {0} not found")]
    TrialNotFound(TrialId),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("batch of {requested} assessments was cancelled")]
    Cancelled { requested: usize },
}
