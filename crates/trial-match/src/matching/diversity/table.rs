use super::super::domain::Gender;

/// Conditions whose trials tend to under-enroll one gender, in lookup order.
///
/// Lookup stops at the first entry whose name appears in the patient's
/// condition.
pub const UNDERREPRESENTED_BY_CONDITION: &[(&str, Gender)] = &[
    ("Type 2 Diabetes", Gender::Female),
    ("Type 2 Diabetes Mellitus", Gender::Female),
    ("Heart Disease", Gender::Female),
    ("Coronary Artery Disease", Gender::Female),
    ("Cardiovascular Disease", Gender::Female),
    ("COPD", Gender::Female),
    ("Chronic Obstructive Pulmonary Disease", Gender::Female),
    ("Depression", Gender::Male),
    ("Major Depressive Disorder", Gender::Male),
    ("Anxiety", Gender::Male),
    ("Eating Disorders", Gender::Male),
    ("Osteoporosis", Gender::Male),
    ("Lung Cancer", Gender::Female),
];

/// Gender a trial for `condition` usually needs more of, if the table knows.
pub fn needed_gender(condition: &str) -> Option<Gender> {
    let condition = condition.to_lowercase();
    UNDERREPRESENTED_BY_CONDITION
        .iter()
        .find(|(known, _)| condition.contains(&known.to_lowercase()))
        .map(|(_, gender)| *gender)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_substring() {
        assert_eq!(needed_gender("type 2 diabetes"), Some(Gender::Female));
        assert_eq!(needed_gender("Severe COPD, stage III"), Some(Gender::Female));
        assert_eq!(needed_gender("Postpartum depression"), Some(Gender::Male));
        assert_eq!(needed_gender("Hypertension"), None);
    }

    #[test]
    fn first_entry_wins() {
        // "depression" is not a substring of "depressive".
        assert_eq!(
            needed_gender("Major Depressive Disorder"),
            Some(Gender::Male)
        );
        assert_eq!(needed_gender("Type 2 Diabetes Mellitus"), Some(Gender::Female));
    }
}
