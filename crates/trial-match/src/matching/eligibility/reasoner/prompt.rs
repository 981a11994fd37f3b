use chrono::NaiveDate;

use super::super::super::domain::Patient;

/// Render the step-by-step eligibility prompt sent to the reasoning backend.
pub(crate) fn build_prompt(
    today: NaiveDate,
    criteria: &str,
    patient: &Patient,
) -> Result<String, serde_json::Error> {
    let patient_data = serde_json::to_string_pretty(patient)?;
    let current_date = today.format("%Y-%m-%d");

    Ok(format!(
        r#"You are a clinical trial eligibility checker. Your job is to determine if a patient qualifies for a specific trial.

Follow these steps EXACTLY:

STEP 1: EXTRACT INCLUSION CRITERIA
List each inclusion criterion from the trial as a separate item.

STEP 2: CHECK PATIENT AGAINST INCLUSION
For each inclusion criterion:
- State the criterion requirement clearly
- State the patient's corresponding value
- Determine: PASS, FAIL, or MISSING (if patient data unavailable)
- Provide brief reasoning

STEP 3: EXTRACT EXCLUSION CRITERIA
List each exclusion criterion from the trial as a separate item.

STEP 4: CHECK PATIENT AGAINST EXCLUSION
For each exclusion criterion:
- State what is excluded
- State the patient's status
- Determine: MATCH (patient has this, so excluded) or NO_MATCH (patient does not have this)
- Provide brief reasoning

STEP 5: OVERALL ELIGIBILITY
- If ANY inclusion criterion = FAIL -> status = NOT_ELIGIBLE
- If ANY exclusion criterion = MATCH -> status = NOT_ELIGIBLE
- If ANY critical inclusion = MISSING -> status = POSSIBLY_ELIGIBLE
- If ALL inclusions = PASS and ALL exclusions = NO_MATCH -> status = ELIGIBLE

STEP 6: CONFIDENCE SCORE
- All data available, clear matches -> 0.95
- Minor missing non-critical data -> 0.85
- Some missing critical data -> 0.70
- Significant missing data -> 0.50

IMPORTANT NOTES:
- Today's date is: {current_date}
- For duration requirements (e.g. "diagnosed >= 6 months ago"), calculate from today
- Standard units: HbA1c in %, glucose in mg/dL, blood pressure in mmHg
- If units are ambiguous, assume standard units

OUTPUT FORMAT:
Output ONLY valid JSON in exactly this shape (no markdown, no extra text):

{{
  "status": "ELIGIBLE" | "NOT_ELIGIBLE" | "POSSIBLY_ELIGIBLE",
  "confidence": 0.95,
  "inclusion_criteria": [
    {{
      "criterion": "Age between 18 and 65 years",
      "patient_value": "52 years",
      "status": "PASS",
      "reasoning": "Patient age 52 falls within required range 18-65"
    }}
  ],
  "exclusion_criteria": [
    {{
      "criterion": "Pregnant or breastfeeding",
      "patient_value": "Male patient",
      "status": "NO_MATCH",
      "reasoning": "Patient is male, cannot be pregnant"
    }}
  ],
  "missing_data": [
    {{
      "field": "BMI",
      "reason": "Trial requires BMI 25-40, but patient BMI not provided",
      "impact": "CRITICAL"
    }}
  ]
}}

TRIAL ELIGIBILITY CRITERIA:
{criteria}

PATIENT DATA:
{patient_data}

Now think step by step, then output ONLY the JSON response.
"#
    ))
}
