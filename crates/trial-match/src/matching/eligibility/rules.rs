use super::super::domain::{Patient, SexRestriction, Trial};
use super::{CriterionStatus, EligibilityCriterion, ImpactLevel, MissingDataItem};

/// Judgements gathered from the structured registry fields.
#[derive(Debug, Default)]
pub(crate) struct RuleFindings {
    pub inclusion: Vec<EligibilityCriterion>,
    pub missing: Vec<MissingDataItem>,
}

pub(crate) fn collect_findings(patient: &Patient, trial: &Trial) -> RuleFindings {
    let mut findings = RuleFindings::default();
    check_age(patient, trial, &mut findings);
    check_sex(patient, trial, &mut findings);
    check_conditions(patient, trial, &mut findings);
    findings
}

/// First run of ASCII digits in a registry age string ("18 Years" -> 18).
pub(crate) fn parse_age_bound(raw: Option<&str>) -> Option<u32> {
    raw?.split(|c: char| !c.is_ascii_digit())
        .find(|run| !run.is_empty())
        .and_then(|digits| digits.parse().ok())
}

fn check_age(patient: &Patient, trial: &Trial, findings: &mut RuleFindings) {
    let min_age = parse_age_bound(trial.minimum_age.as_deref());
    let max_age = parse_age_bound(trial.maximum_age.as_deref());

    if min_age.is_none() && max_age.is_none() {
        return;
    }

    let Some(age) = patient.age.map(u32::from) else {
        findings.missing.push(MissingDataItem::new(
            "age",
            "Age required for eligibility",
            ImpactLevel::Critical,
        ));
        return;
    };

    let (status, reasoning) = match (min_age, max_age) {
        (Some(min), _) if age < min => (
            CriterionStatus::Fail,
            format!("Patient age {age} is below minimum {min}"),
        ),
        (_, Some(max)) if age > max => (
            CriterionStatus::Fail,
            format!("Patient age {age} is above maximum {max}"),
        ),
        _ => (
            CriterionStatus::Pass,
            format!("Patient age {age} is within range"),
        ),
    };

    let upper = max_age
        .map(|max| max.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    findings.inclusion.push(EligibilityCriterion {
        criterion: format!("Age {}-{} years", min_age.unwrap_or(0), upper),
        patient_value: age.to_string(),
        status,
        reasoning,
    });
}

fn check_sex(patient: &Patient, trial: &Trial, findings: &mut RuleFindings) {
    let restriction = trial.sex;
    if restriction == SexRestriction::All {
        return;
    }

    let required = restriction.label().to_ascii_lowercase();
    match patient.gender {
        None => findings.missing.push(MissingDataItem::new(
            "gender",
            format!("Gender required (trial is for {required} only)"),
            ImpactLevel::Critical,
        )),
        Some(gender) => {
            let status = if restriction.admits(gender) {
                CriterionStatus::Pass
            } else {
                CriterionStatus::Fail
            };
            findings.inclusion.push(EligibilityCriterion {
                criterion: format!("Gender: {}", restriction.label()),
                patient_value: gender.label().to_string(),
                status,
                reasoning: format!("Trial requires {required} participants"),
            });
        }
    }
}

fn check_conditions(patient: &Patient, trial: &Trial, findings: &mut RuleFindings) {
    if trial.conditions.is_empty() {
        return;
    }

    if patient.conditions.is_empty() {
        findings.missing.push(MissingDataItem::new(
            "conditions",
            format!(
                "Patient conditions required (trial targets {})",
                trial.conditions.join(", ")
            ),
            ImpactLevel::Critical,
        ));
        return;
    }

    let haystack = trial.joined_conditions().to_lowercase();
    let matched = patient
        .conditions
        .iter()
        .find(|condition| haystack.contains(&condition.to_lowercase()));

    let (status, reasoning) = match matched {
        Some(condition) => (
            CriterionStatus::Pass,
            format!("Patient condition '{condition}' is among the trial's target conditions"),
        ),
        None => (
            CriterionStatus::Fail,
            "None of the patient's conditions are targeted by this trial".to_string(),
        ),
    };

    findings.inclusion.push(EligibilityCriterion {
        criterion: format!("Condition: {}", trial.conditions.join(", ")),
        patient_value: patient.conditions.join(", "),
        status,
        reasoning,
    });
}
