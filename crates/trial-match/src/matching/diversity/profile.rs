use serde::{Deserialize, Serialize};

use super::super::domain::{IncomeBracket, Patient};
use super::{table, OLDER_ADULT_AGE, YOUNG_ADULT_AGE};

/// Factors needed before a patient counts as a priority candidate.
const PRIORITY_CANDIDATE_FACTORS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityFactor {
    pub factor: String,
    pub description: String,
}

impl DiversityFactor {
    fn new(factor: &str, description: impl Into<String>) -> Self {
        Self {
            factor: factor.to_string(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityProfile {
    pub diversity_factors: Vec<DiversityFactor>,
    pub total_factors: usize,
    pub is_priority_candidate: bool,
}

impl DiversityProfile {
    pub fn for_patient(patient: &Patient) -> Self {
        let mut factors = Vec::new();

        if let Some(tier) = patient.location_tier.filter(|tier| tier.is_underserved()) {
            factors.push(DiversityFactor::new(
                "Geographic",
                format!("Patient from {} city", tier.label()),
            ));
        }

        if let Some(gender) = patient.gender {
            for condition in &patient.conditions {
                if table::needed_gender(condition) == Some(gender) {
                    factors.push(DiversityFactor::new(
                        "Gender Balance",
                        format!("{} patient for {condition}", gender.label()),
                    ));
                }
            }
        }

        if patient
            .age
            .is_some_and(|age| age >= OLDER_ADULT_AGE || age <= YOUNG_ADULT_AGE)
        {
            factors.push(DiversityFactor::new(
                "Age Diversity",
                "Age group often underrepresented in trials",
            ));
        }

        if patient.income_bracket == Some(IncomeBracket::Low) {
            factors.push(DiversityFactor::new("Socioeconomic", "Low income background"));
        }

        Self {
            total_factors: factors.len(),
            is_priority_candidate: factors.len() >= PRIORITY_CANDIDATE_FACTORS,
            diversity_factors: factors,
        }
    }
}
