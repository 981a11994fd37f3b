use super::domain::{Patient, Trial, TrialId};

/// Default number of candidates pulled from a catalog for one patient.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 50;

/// Filter describing which trials a patient should be screened against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub conditions: Vec<String>,
    pub location: Option<String>,
    pub limit: usize,
}

impl CandidateQuery {
    pub fn for_patient(patient: &Patient, limit: usize) -> Self {
        Self {
            conditions: patient.conditions.clone(),
            location: patient.location.clone(),
            limit,
        }
    }

    /// Whether any requested condition appears in the trial's conditions.
    /// A query without conditions admits every trial.
    pub fn admits(&self, trial: &Trial) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        let haystack = trial.joined_conditions().to_lowercase();
        self.conditions
            .iter()
            .any(|condition| haystack.contains(&condition.to_lowercase()))
    }

    pub fn prefers(&self, trial: &Trial) -> bool {
        self.location
            .as_deref()
            .is_some_and(|location| trial.recruits_in(location))
    }
}

/// Apply `query` to an in-memory trial list: admitted trials only, trials
/// recruiting in the preferred location first, truncated to the limit.
pub fn select_candidates<'a, I>(trials: I, query: &CandidateQuery) -> Vec<Trial>
where
    I: IntoIterator<Item = &'a Trial>,
{
    let (mut preferred, others): (Vec<&Trial>, Vec<&Trial>) = trials
        .into_iter()
        .filter(|trial| query.admits(trial))
        .partition(|trial| query.prefers(trial));

    preferred.extend(others);
    preferred
        .into_iter()
        .take(query.limit)
        .cloned()
        .collect()
}

/// Source of candidate trials (a registry mirror, a search index, or a fixture file).
pub trait TrialCatalog: Send + Sync {
    fn candidates(&self, query: &CandidateQuery) -> Result<Vec<Trial>, CatalogError>;
    fn fetch(&self, id: &TrialId) -> Result<Option<Trial>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("trial catalog unavailable: {0}")]
    Unavailable(String),
    #[error("trial catalog data is malformed: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(id: &str, condition: &str, location: &str) -> Trial {
        let mut trial = Trial::new(id);
        trial.conditions = vec![condition.to_string()];
        trial.locations = vec![location.to_string()];
        trial
    }

    #[test]
    fn selection_filters_prefers_location_and_truncates() {
        let trials = vec![
            trial("NCT1", "Type 2 Diabetes", "Boston, United States"),
            trial("NCT2", "Asthma", "Pune, India"),
            trial("NCT3", "Diabetes Mellitus, Type 2", "Nagpur, India"),
            trial("NCT4", "type 2 diabetes", "Lyon, France"),
        ];
        let query = CandidateQuery {
            conditions: vec!["Type 2 Diabetes".to_string()],
            location: Some("India".to_string()),
            limit: 2,
        };

        let selected: Vec<_> = select_candidates(&trials, &query)
            .into_iter()
            .map(|trial| trial.id.0)
            .collect();

        // NCT3 mentions diabetes but not the exact phrase.
        assert_eq!(selected, ["NCT1", "NCT4"]);
    }

    #[test]
    fn preferred_location_moves_ahead() {
        let trials = vec![
            trial("NCT1", "COPD", "Boston"),
            trial("NCT2", "Severe COPD", "Chennai, India"),
        ];
        let query = CandidateQuery {
            conditions: vec!["copd".to_string()],
            location: Some("chennai".to_string()),
            limit: DEFAULT_CANDIDATE_LIMIT,
        };

        let selected: Vec<_> = select_candidates(&trials, &query)
            .into_iter()
            .map(|trial| trial.id.0)
            .collect();
        assert_eq!(selected, ["NCT2", "NCT1"]);
    }
}
