use async_trait::async_trait;

use super::super::domain::{Patient, Trial};
use super::policy::decide_outcome;
use super::rules::collect_findings;
use super::{AssessmentSource, EligibilityAssessor, EligibilityResult};

/// Deterministic checks over the structured registry fields (age, sex, conditions).
///
/// Never touches the network and never fails. Exclusion criteria need the
/// free-text description, so this path always leaves them empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriterionEvaluator;

impl CriterionEvaluator {
    pub fn evaluate(&self, patient: &Patient, trial: &Trial) -> EligibilityResult {
        let findings = collect_findings(patient, trial);
        let (status, confidence) = decide_outcome(&findings);

        EligibilityResult {
            status,
            confidence,
            inclusion_criteria: findings.inclusion,
            exclusion_criteria: Vec::new(),
            missing_data: findings.missing,
            source: AssessmentSource::RuleBased,
        }
    }
}

#[async_trait]
impl EligibilityAssessor for CriterionEvaluator {
    async fn assess(&self, patient: &Patient, trial: &Trial) -> EligibilityResult {
        self.evaluate(patient, trial)
    }
}
