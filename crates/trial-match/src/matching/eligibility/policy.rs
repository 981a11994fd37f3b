use super::rules::RuleFindings;
use super::{
    CriterionStatus, EligibilityCriterion, EligibilityStatus, ImpactLevel, MissingDataItem,
};

pub(crate) const NOT_ELIGIBLE_CONFIDENCE: f64 = 0.85;
pub(crate) const CRITICAL_GAP_CONFIDENCE: f64 = 0.6;
pub(crate) const ELIGIBLE_CONFIDENCE: f64 = 0.75;
pub(crate) const UNDETERMINED_CONFIDENCE: f64 = 0.5;

/// Decision rule for the rule-based path, applied in precedence order.
pub(crate) fn decide_outcome(findings: &RuleFindings) -> (EligibilityStatus, f64) {
    if findings
        .inclusion
        .iter()
        .any(|criterion| criterion.status == CriterionStatus::Fail)
    {
        return (EligibilityStatus::NotEligible, NOT_ELIGIBLE_CONFIDENCE);
    }

    if findings
        .missing
        .iter()
        .any(|item| item.impact == ImpactLevel::Critical)
    {
        return (EligibilityStatus::PossiblyEligible, CRITICAL_GAP_CONFIDENCE);
    }

    if !findings.inclusion.is_empty()
        && findings
            .inclusion
            .iter()
            .all(|criterion| criterion.status == CriterionStatus::Pass)
    {
        return (EligibilityStatus::Eligible, ELIGIBLE_CONFIDENCE);
    }

    (EligibilityStatus::PossiblyEligible, UNDETERMINED_CONFIDENCE)
}

/// Bring a reported status in line with the criteria that accompany it.
///
/// A failed inclusion or a matched exclusion always means not eligible, and an
/// eligible verdict cannot stand next to a critical data gap.
pub(crate) fn reconcile_status(
    reported: EligibilityStatus,
    inclusion: &[EligibilityCriterion],
    exclusion: &[EligibilityCriterion],
    missing: &[MissingDataItem],
) -> EligibilityStatus {
    let disqualified = inclusion
        .iter()
        .any(|criterion| criterion.status == CriterionStatus::Fail)
        || exclusion
            .iter()
            .any(|criterion| criterion.status == CriterionStatus::Match);
    if disqualified {
        return EligibilityStatus::NotEligible;
    }

    let critical_gap = missing
        .iter()
        .any(|item| item.impact == ImpactLevel::Critical);
    if reported == EligibilityStatus::Eligible && critical_gap {
        return EligibilityStatus::PossiblyEligible;
    }

    reported
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(status: CriterionStatus) -> EligibilityCriterion {
        EligibilityCriterion {
            criterion: "Pregnant or breastfeeding".to_string(),
            patient_value: "unknown".to_string(),
            status,
            reasoning: String::new(),
        }
    }

    #[test]
    fn empty_findings_are_undetermined() {
        let (status, confidence) = decide_outcome(&RuleFindings::default());
        assert_eq!(status, EligibilityStatus::PossiblyEligible);
        assert_eq!(confidence, UNDETERMINED_CONFIDENCE);
    }

    #[test]
    fn failure_outranks_critical_gap() {
        let findings = RuleFindings {
            inclusion: vec![criterion(CriterionStatus::Fail)],
            missing: vec![MissingDataItem::new("gender", "", ImpactLevel::Critical)],
        };
        assert_eq!(
            decide_outcome(&findings),
            (EligibilityStatus::NotEligible, NOT_ELIGIBLE_CONFIDENCE)
        );
    }

    #[test]
    fn non_critical_gaps_do_not_block_eligibility() {
        let findings = RuleFindings {
            inclusion: vec![criterion(CriterionStatus::Pass)],
            missing: vec![MissingDataItem::new("bmi", "", ImpactLevel::High)],
        };
        assert_eq!(
            decide_outcome(&findings),
            (EligibilityStatus::Eligible, ELIGIBLE_CONFIDENCE)
        );
    }

    #[test]
    fn matched_exclusion_overrides_reported_eligibility() {
        let status = reconcile_status(
            EligibilityStatus::Eligible,
            &[criterion(CriterionStatus::Pass)],
            &[criterion(CriterionStatus::Match)],
            &[],
        );
        assert_eq!(status, EligibilityStatus::NotEligible);
    }

    #[test]
    fn critical_gap_downgrades_reported_eligibility() {
        let status = reconcile_status(
            EligibilityStatus::Eligible,
            &[criterion(CriterionStatus::Pass)],
            &[criterion(CriterionStatus::NoMatch)],
            &[MissingDataItem::new("HbA1c", "", ImpactLevel::Critical)],
        );
        assert_eq!(status, EligibilityStatus::PossiblyEligible);
    }

    #[test]
    fn consistent_reports_pass_through() {
        let status = reconcile_status(
            EligibilityStatus::PossiblyEligible,
            &[criterion(CriterionStatus::Missing)],
            &[],
            &[],
        );
        assert_eq!(status, EligibilityStatus::PossiblyEligible);
    }
}
