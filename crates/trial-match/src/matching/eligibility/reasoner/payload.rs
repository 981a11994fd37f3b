use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::super::policy::reconcile_status;
use super::super::{
    AssessmentSource, CriterionStatus, EligibilityCriterion, EligibilityResult, EligibilityStatus,
    ImpactLevel, MissingDataItem,
};

/// Confidence assumed when the payload omits one or sends something non-numeric.
pub(crate) const DEFAULT_REPORTED_CONFIDENCE: f64 = 0.7;

/// Reasons a backend response could not be turned into a result.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("response contained no JSON object")]
    NoObject,
    #[error("response JSON did not match the eligibility schema: {0}")]
    Schema(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(default)]
    status: Value,
    #[serde(default)]
    confidence: Value,
    #[serde(default)]
    inclusion_criteria: Option<Vec<WireCriterion>>,
    #[serde(default)]
    exclusion_criteria: Option<Vec<WireCriterion>>,
    #[serde(default)]
    missing_data: Option<Vec<WireMissing>>,
}

#[derive(Debug, Deserialize)]
struct WireCriterion {
    #[serde(default)]
    criterion: Value,
    #[serde(default)]
    patient_value: Value,
    #[serde(default)]
    status: Value,
    #[serde(default)]
    reasoning: Value,
}

#[derive(Debug, Deserialize)]
struct WireMissing {
    #[serde(default)]
    field: Value,
    #[serde(default)]
    reason: Value,
    #[serde(default)]
    impact: Value,
}

/// Strip wrapping markdown fences (```json ... ```) around a payload.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```JSON") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a backend response into the canonical result shape.
pub(crate) fn parse_response(raw: &str) -> Result<EligibilityResult, PayloadError> {
    let cleaned = strip_code_fences(raw);
    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(_) => serde_json::from_str(embedded_object(cleaned).ok_or(PayloadError::NoObject)?)?,
    };

    if !value.is_object() {
        return Err(PayloadError::NoObject);
    }

    let wire: WirePayload = serde_json::from_value(value)?;
    Ok(normalize(wire))
}

// Prose around the object: keep the outermost braces.
fn embedded_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn normalize(wire: WirePayload) -> EligibilityResult {
    let inclusion: Vec<EligibilityCriterion> = wire
        .inclusion_criteria
        .unwrap_or_default()
        .into_iter()
        .map(to_criterion)
        .collect();
    let exclusion: Vec<EligibilityCriterion> = wire
        .exclusion_criteria
        .unwrap_or_default()
        .into_iter()
        .map(to_criterion)
        .collect();
    let missing: Vec<MissingDataItem> = wire
        .missing_data
        .unwrap_or_default()
        .into_iter()
        .map(to_missing)
        .collect();

    let reported = match wire.status.as_str().and_then(EligibilityStatus::parse_decision) {
        Some(status) => status,
        None => {
            warn!(status = %wire.status, "unrecognized reasoner status; treating as possibly eligible");
            EligibilityStatus::PossiblyEligible
        }
    };
    let status = reconcile_status(reported, &inclusion, &exclusion, &missing);

    EligibilityResult {
        status,
        confidence: confidence_from(&wire.confidence),
        inclusion_criteria: inclusion,
        exclusion_criteria: exclusion,
        missing_data: missing,
        source: AssessmentSource::Ai,
    }
}

fn confidence_from(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|confidence| confidence.is_finite())
        .map(|confidence| confidence.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_REPORTED_CONFIDENCE)
}

fn to_criterion(wire: WireCriterion) -> EligibilityCriterion {
    EligibilityCriterion {
        criterion: text_of(&wire.criterion),
        patient_value: text_of(&wire.patient_value),
        status: wire
            .status
            .as_str()
            .and_then(CriterionStatus::parse)
            .unwrap_or(CriterionStatus::Missing),
        reasoning: text_of(&wire.reasoning),
    }
}

fn to_missing(wire: WireMissing) -> MissingDataItem {
    MissingDataItem {
        field: text_of(&wire.field),
        reason: text_of(&wire.reason),
        impact: wire
            .impact
            .as_str()
            .and_then(ImpactLevel::parse)
            .unwrap_or(ImpactLevel::Medium),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
