use super::common::*;
use std::sync::Arc;

use crate::matching::eligibility::{
    AiReasoner, AssessmentSource, CriterionStatus, EligibilityStatus, GenerationSettings,
    ImpactLevel, ReasonerFailure,
};

fn reasoner_for(backend: Arc<ScriptedBackend>) -> AiReasoner {
    AiReasoner::new(backend, GenerationSettings::default())
}

#[tokio::test]
async fn prompt_carries_criteria_and_patient_record() {
    let backend = Arc::new(ScriptedBackend::replying(eligible_payload()));
    let reasoner = reasoner_for(backend.clone());

    reasoner
        .reason(&patient(), &diabetes_trial(), DIABETES_CRITERIA)
        .await
        .expect("reasoning succeeds");

    let prompt = backend.last_prompt().expect("prompt recorded");
    assert!(prompt.contains(DIABETES_CRITERIA));
    assert!(prompt.contains("\"patient_id\": \"PT-0042\""));
    assert!(prompt.contains("\"location_tier\": \"Tier 2\""));
    assert!(prompt.contains("Today's date is: "));
}

#[tokio::test]
async fn contradictory_status_is_reconciled() {
    let payload = serde_json::json!({
        "status": "ELIGIBLE",
        "confidence": 0.9,
        "inclusion_criteria": [
            {"criterion": "Age 18-65", "patient_value": "45", "status": "PASS", "reasoning": ""}
        ],
        "exclusion_criteria": [
            {"criterion": "eGFR below 30", "patient_value": "22", "status": "MATCH", "reasoning": ""}
        ]
    });
    let reasoner = reasoner_for(Arc::new(ScriptedBackend::replying(payload.to_string())));

    let result = reasoner
        .reason(&patient(), &diabetes_trial(), DIABETES_CRITERIA)
        .await
        .expect("reasoning succeeds");

    assert_eq!(result.status, EligibilityStatus::NotEligible);
    assert_eq!(result.source, AssessmentSource::Ai);
    assert_eq!(result.exclusion_criteria[0].status, CriterionStatus::Match);
}

#[tokio::test]
async fn critical_gap_downgrades_reported_eligibility() {
    let payload = serde_json::json!({
        "status": "eligible",
        "missing_data": [
            {"field": "HbA1c", "reason": "Required lab value missing", "impact": "critical"}
        ]
    });
    let reasoner = reasoner_for(Arc::new(ScriptedBackend::replying(payload.to_string())));

    let result = reasoner
        .reason(&patient(), &diabetes_trial(), DIABETES_CRITERIA)
        .await
        .expect("reasoning succeeds");

    assert_eq!(result.status, EligibilityStatus::PossiblyEligible);
    assert_eq!(result.confidence, 0.7);
    assert_eq!(result.missing_data[0].impact, ImpactLevel::Critical);
}

#[tokio::test]
async fn failures_are_typed() {
    let reasoner = reasoner_for(Arc::new(ScriptedBackend::new(Script::Unreachable)));
    let outcome = reasoner
        .reason(&patient(), &diabetes_trial(), DIABETES_CRITERIA)
        .await;
    assert!(matches!(outcome, Err(ReasonerFailure::Backend(_))));

    let reasoner = reasoner_for(Arc::new(ScriptedBackend::replying("[]")));
    let outcome = reasoner
        .reason(&patient(), &diabetes_trial(), DIABETES_CRITERIA)
        .await;
    assert!(matches!(outcome, Err(ReasonerFailure::Payload(_))));
}

#[tokio::test]
async fn unexpected_field_types_never_escape_the_enum() {
    let payload = r#"{
        "status": 42,
        "confidence": "high",
        "inclusion_criteria": [{"criterion": ["a", "b"], "status": null}],
        "missing_data": [{"field": "BMI"}]
    }"#;
    let reasoner = reasoner_for(Arc::new(ScriptedBackend::replying(payload)));

    let result = reasoner
        .reason(&patient(), &diabetes_trial(), DIABETES_CRITERIA)
        .await
        .expect("lenient parse");

    assert_eq!(result.status, EligibilityStatus::PossiblyEligible);
    assert_eq!(result.confidence, 0.7);
    assert_eq!(result.inclusion_criteria[0].criterion, "[\"a\",\"b\"]");
    assert_eq!(result.inclusion_criteria[0].status, CriterionStatus::Missing);
    assert_eq!(result.missing_data[0].impact, ImpactLevel::Medium);
}
