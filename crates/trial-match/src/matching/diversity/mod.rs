mod profile;
pub mod table;

pub use profile::{DiversityFactor, DiversityProfile};

use serde::{Deserialize, Serialize};

use super::domain::{IncomeBracket, Patient, Trial};

pub(crate) const UNDERSERVED_REGION_POINTS: u32 = 20;
pub(crate) const RECRUITING_REGION_POINTS: u32 = 5;
pub(crate) const GENDER_BALANCE_POINTS: u32 = 15;
pub(crate) const AGE_DIVERSITY_POINTS: u32 = 10;
pub(crate) const LOW_INCOME_POINTS: u32 = 10;

pub(crate) const OLDER_ADULT_AGE: u8 = 65;
pub(crate) const YOUNG_ADULT_AGE: u8 = 25;

/// Region whose recruitment earns the geographic bonus.
pub(crate) const FOCUS_REGION: &str = "india";

const HIGH_PRIORITY_POINTS: u32 = 20;
const MEDIUM_PRIORITY_POINTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiversityWeight {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityReason {
    pub text: String,
    pub weight: DiversityWeight,
}

impl DiversityReason {
    fn new(text: impl Into<String>, weight: DiversityWeight) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityLevel {
    High,
    Medium,
    Standard,
}

impl PriorityLevel {
    /// Bucket for a number of diversity points (not the final score).
    pub const fn from_points(points: u32) -> Self {
        if points >= HIGH_PRIORITY_POINTS {
            PriorityLevel::High
        } else if points >= MEDIUM_PRIORITY_POINTS {
            PriorityLevel::Medium
        } else {
            PriorityLevel::Standard
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PriorityLevel::High => "High Priority Match",
            PriorityLevel::Medium => "Priority Match",
            PriorityLevel::Standard => "Standard Match",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityResult {
    pub base_score: f64,
    pub diversity_boost: u32,
    pub final_score: f64,
    pub diversity_reasons: Vec<DiversityReason>,
    pub priority_level: PriorityLevel,
    pub priority_label: String,
}

/// Scores how much a patient would improve a trial's participant diversity.
///
/// Points accumulate across four axes (geography, gender balance, age and
/// socioeconomic status) and are added to the caller's base score without a cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiversityScorer;

impl DiversityScorer {
    pub fn score(&self, patient: &Patient, trial: &Trial, base_score: f64) -> DiversityResult {
        let mut tally = Tally::default();

        score_geography(patient, trial, &mut tally);
        score_gender_balance(patient, &mut tally);
        score_age(patient, &mut tally);
        score_income(patient, &mut tally);

        let priority_level = PriorityLevel::from_points(tally.points);
        DiversityResult {
            base_score,
            diversity_boost: tally.points,
            final_score: base_score + f64::from(tally.points),
            diversity_reasons: tally.reasons,
            priority_level,
            priority_label: priority_level.label().to_string(),
        }
    }

    /// Patient-only summary of the diversity factors that apply regardless of trial.
    pub fn profile(&self, patient: &Patient) -> DiversityProfile {
        DiversityProfile::for_patient(patient)
    }
}

#[derive(Default)]
struct Tally {
    points: u32,
    reasons: Vec<DiversityReason>,
}

impl Tally {
    fn award(&mut self, points: u32, text: impl Into<String>, weight: DiversityWeight) {
        self.points += points;
        self.reasons.push(DiversityReason::new(text, weight));
    }
}

fn score_geography(patient: &Patient, trial: &Trial, tally: &mut Tally) {
    if !trial.recruits_in(FOCUS_REGION) {
        return;
    }

    if patient.location_tier.is_some_and(|tier| tier.is_underserved()) {
        tally.award(
            UNDERSERVED_REGION_POINTS,
            "Trial includes India and benefits from participants from smaller cities",
            DiversityWeight::High,
        );
    } else {
        tally.award(
            RECRUITING_REGION_POINTS,
            "Trial is recruiting in India",
            DiversityWeight::Low,
        );
    }
}

fn score_gender_balance(patient: &Patient, tally: &mut Tally) {
    let Some(gender) = patient.gender else {
        return;
    };

    for condition in &patient.conditions {
        if table::needed_gender(condition) == Some(gender) {
            tally.award(
                GENDER_BALANCE_POINTS,
                format!(
                    "{condition} studies usually need more {} participants",
                    gender.label()
                ),
                DiversityWeight::High,
            );
        }
    }
}

fn score_age(patient: &Patient, tally: &mut Tally) {
    match patient.age {
        Some(age) if age >= OLDER_ADULT_AGE => tally.award(
            AGE_DIVERSITY_POINTS,
            "Older adults (65+) are often underrepresented in trials",
            DiversityWeight::Medium,
        ),
        Some(age) if age <= YOUNG_ADULT_AGE => tally.award(
            AGE_DIVERSITY_POINTS,
            "Young adults are needed for balanced age representation",
            DiversityWeight::Medium,
        ),
        _ => {}
    }
}

fn score_income(patient: &Patient, tally: &mut Tally) {
    if patient.income_bracket == Some(IncomeBracket::Low) {
        tally.award(
            LOW_INCOME_POINTS,
            "Low-income participants help improve trial accessibility",
            DiversityWeight::Medium,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_thresholds_are_inclusive() {
        assert_eq!(PriorityLevel::from_points(20), PriorityLevel::High);
        assert_eq!(PriorityLevel::from_points(19), PriorityLevel::Medium);
        assert_eq!(PriorityLevel::from_points(10), PriorityLevel::Medium);
        assert_eq!(PriorityLevel::from_points(9), PriorityLevel::Standard);
        assert_eq!(PriorityLevel::from_points(0), PriorityLevel::Standard);
    }

    #[test]
    fn labels_follow_levels() {
        assert_eq!(PriorityLevel::High.label(), "High Priority Match");
        assert_eq!(PriorityLevel::Medium.label(), "Priority Match");
        assert_eq!(PriorityLevel::Standard.label(), "Standard Match");
    }

    #[test]
    fn empty_inputs_score_nothing() {
        let result = DiversityScorer.score(&Patient::default(), &Trial::new("NCT1"), 42.0);
        assert_eq!(result.diversity_boost, 0);
        assert_eq!(result.final_score, 42.0);
        assert!(result.diversity_reasons.is_empty());
        assert_eq!(result.priority_level, PriorityLevel::Standard);
        assert_eq!(result.priority_label, "Standard Match");
    }
}
