use serde::{Deserialize, Serialize};

use super::diversity::{DiversityResult, DiversityScorer, PriorityLevel};
use super::domain::{Patient, Trial};
use super::eligibility::EligibilityResult;

/// Confidence assumed for candidates that arrive without an eligibility assessment.
pub const DEFAULT_CANDIDATE_CONFIDENCE: f64 = 0.5;

/// A trial offered for ranking, optionally with its eligibility assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAssessment {
    pub trial: Trial,
    #[serde(default)]
    pub eligibility: Option<EligibilityResult>,
}

impl CandidateAssessment {
    pub fn base_score(&self) -> f64 {
        self.eligibility
            .as_ref()
            .map_or(DEFAULT_CANDIDATE_CONFIDENCE, |result| result.confidence)
            * 100.0
    }

    /// Whether the attached confidence (if any) is a finite value in `[0, 1]`.
    pub fn has_valid_confidence(&self) -> bool {
        self.eligibility
            .as_ref()
            .map_or(true, |result| (0.0..=1.0).contains(&result.confidence))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTrial {
    pub trial: Trial,
    #[serde(default)]
    pub eligibility: Option<EligibilityResult>,
    pub diversity: DiversityResult,
}

/// Ranked candidates split by diversity priority, each bucket sorted by final score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub high_priority: Vec<RankedTrial>,
    pub medium_priority: Vec<RankedTrial>,
    pub standard: Vec<RankedTrial>,
    pub total_high_priority: usize,
    pub total_medium_priority: usize,
    pub total_standard: usize,
}

impl RankingReport {
    pub fn len(&self) -> usize {
        self.total_high_priority + self.total_medium_priority + self.total_standard
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buckets concatenated in priority order.
    pub fn into_ordered(self) -> Vec<RankedTrial> {
        let mut ordered = self.high_priority;
        ordered.extend(self.medium_priority);
        ordered.extend(self.standard);
        ordered
    }
}

/// Scores every candidate for diversity and orders them by final score.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingAggregator {
    scorer: DiversityScorer,
}

impl RankingAggregator {
    pub fn new(scorer: DiversityScorer) -> Self {
        Self { scorer }
    }

    pub fn rank(&self, patient: &Patient, candidates: Vec<CandidateAssessment>) -> RankingReport {
        let mut scored: Vec<RankedTrial> = candidates
            .into_iter()
            .map(|candidate| {
                let diversity =
                    self.scorer
                        .score(patient, &candidate.trial, candidate.base_score());
                RankedTrial {
                    trial: candidate.trial,
                    eligibility: candidate.eligibility,
                    diversity,
                }
            })
            .collect();

        // Stable: equal scores keep their input order.
        scored.sort_by(|a, b| b.diversity.final_score.total_cmp(&a.diversity.final_score));

        let mut report = RankingReport::default();
        for ranked in scored {
            match ranked.diversity.priority_level {
                PriorityLevel::High => report.high_priority.push(ranked),
                PriorityLevel::Medium => report.medium_priority.push(ranked),
                PriorityLevel::Standard => report.standard.push(ranked),
            }
        }
        report.total_high_priority = report.high_priority.len();
        report.total_medium_priority = report.medium_priority.len();
        report.total_standard = report.standard.len();
        report
    }
}
