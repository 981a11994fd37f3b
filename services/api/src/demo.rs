use crate::infra::{build_engine, InMemoryTrialCatalog};
use clap::Args;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use trial_match::config::AppConfig;
use trial_match::error::AppError;
use trial_match::matching::{
    EligibilityEngine, MatchReport, Patient, RankedTrial, Trial, TrialMatchingService,
    DEFAULT_CANDIDATE_LIMIT,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Use the configured reasoning backend instead of the rule-based evaluator.
    #[arg(long)]
    pub(crate) use_reasoner: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let engine = if args.use_reasoner {
        let config = AppConfig::load()?;
        build_engine(&config.reasoner)?
    } else {
        EligibilityEngine::rule_based()
    };

    println!("Trial matching demo");
    println!("Eligibility backend: {}", engine.backend_name());

    let report = demo_report(engine).await?;
    render_match_report(&report);
    Ok(())
}

pub(crate) async fn demo_report(engine: EligibilityEngine) -> Result<MatchReport, AppError> {
    let catalog = InMemoryTrialCatalog::from_trials(sample_trials()?);
    let service = TrialMatchingService::new(Arc::new(engine), Arc::new(catalog), 4);

    let patient = sample_patient()?;
    let trials = service.search(&patient, DEFAULT_CANDIDATE_LIMIT)?;
    Ok(service.match_trials(&patient, trials).await?)
}

pub(crate) fn render_match_report(report: &MatchReport) {
    print!("{}", format_match_report(report));
}

pub(crate) fn format_match_report(report: &MatchReport) -> String {
    let mut out = String::new();
    let tally = &report.tally;

    let _ = writeln!(out, "\nTrials checked: {}", report.trials_checked);
    let _ = writeln!(
        out,
        "- {} eligible | {} possibly eligible | {} not eligible | {} errored",
        tally.eligible, tally.possibly_eligible, tally.not_eligible, tally.errored
    );

    let profile = &report.patient_profile;
    let _ = writeln!(
        out,
        "\nDiversity profile: {} factor(s){}",
        profile.total_factors,
        if profile.is_priority_candidate {
            " | priority candidate"
        } else {
            ""
        }
    );
    for factor in &profile.diversity_factors {
        let _ = writeln!(out, "  - {}: {}", factor.factor, factor.description);
    }

    let ranking = &report.ranking;
    for (heading, bucket) in [
        ("High priority", &ranking.high_priority),
        ("Priority", &ranking.medium_priority),
        ("Standard", &ranking.standard),
    ] {
        let _ = writeln!(out, "\n{heading} ({})", bucket.len());
        for ranked in bucket {
            write_ranked(&mut out, ranked);
        }
    }

    out
}

fn write_ranked(out: &mut String, ranked: &RankedTrial) {
    let title = ranked.trial.title.as_deref().unwrap_or("Untitled trial");
    let _ = writeln!(
        out,
        "  - {} {} | score {:.1} (+{})",
        ranked.trial.id, title, ranked.diversity.final_score, ranked.diversity.diversity_boost
    );

    if let Some(eligibility) = &ranked.eligibility {
        let _ = writeln!(
            out,
            "      {} at {:.0}% confidence{}",
            eligibility.status.label(),
            eligibility.confidence * 100.0,
            if eligibility.is_degraded() {
                " (rule-based fallback)"
            } else {
                ""
            }
        );
        for item in eligibility
            .missing_data
            .iter()
            .filter(|item| item.field != trial_match::matching::DEGRADED_MODE_FIELD)
        {
            let _ = writeln!(out, "      missing {}: {}", item.field, item.reason);
        }
    }

    for reason in &ranked.diversity.diversity_reasons {
        let _ = writeln!(out, "      * {}", reason.text);
    }
}

fn sample_patient() -> Result<Patient, AppError> {
    Ok(serde_json::from_value(json!({
        "patient_id": "DEMO-001",
        "age": 67,
        "gender": "female",
        "location": "Nashik",
        "location_tier": "Tier 2",
        "conditions": ["Type 2 Diabetes", "Osteoporosis"],
        "income_bracket": "Low",
        "medications": [
            {"name": "Metformin", "dose": "500mg", "frequency": "twice daily", "duration_months": 36}
        ],
        "lab_values": {
            "HbA1c": {"value": 8.1, "unit": "%", "date": "2024-11-02"}
        }
    }))?)
}

fn sample_trials() -> Result<Vec<Trial>, AppError> {
    Ok(serde_json::from_value(json!([
        {
            "nct_id": "NCT05500101",
            "title": "Oral semaglutide in older adults with Type 2 Diabetes",
            "status": "RECRUITING",
            "phase": "PHASE3",
            "eligibility_criteria": "Inclusion: age 60-80, HbA1c 7.0-10.0%. Exclusion: eGFR < 30.",
            "minimum_age": "60 Years",
            "maximum_age": "80 Years",
            "sex": "ALL",
            "conditions": ["Type 2 Diabetes"],
            "locations": ["Pune, Maharashtra, India", "Nashik, Maharashtra, India"]
        },
        {
            "nct_id": "NCT05500102",
            "title": "Continuous glucose monitoring coaching",
            "status": "RECRUITING",
            "eligibility_criteria": "Inclusion: adults 18-65 with Type 2 Diabetes on metformin.",
            "minimum_age": "18 Years",
            "maximum_age": "65 Years",
            "conditions": ["Type 2 Diabetes Mellitus", "Type 2 Diabetes"],
            "locations": ["Houston, Texas, United States"]
        },
        {
            "nct_id": "NCT05500103",
            "title": "Zoledronic acid dosing intervals",
            "status": "RECRUITING",
            "minimum_age": "50 Years",
            "sex": "FEMALE",
            "conditions": ["Osteoporosis"],
            "locations": ["Bengaluru, India"]
        },
        {
            "nct_id": "NCT05500104",
            "title": "Testosterone and bone density",
            "status": "NOT_YET_RECRUITING",
            "eligibility_criteria": "Inclusion: men aged 50 or older with low bone density.",
            "minimum_age": "50 Years",
            "sex": "MALE",
            "conditions": ["Osteoporosis"],
            "locations": ["Manchester, United Kingdom"]
        },
        {
            "nct_id": "NCT05500105",
            "title": "Severe asthma biologic switch",
            "conditions": ["Asthma"],
            "locations": ["Delhi, India"]
        }
    ]))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trial_match::matching::EligibilityStatus;

    #[tokio::test]
    async fn demo_ranks_sample_trials() {
        let report = demo_report(EligibilityEngine::rule_based())
            .await
            .expect("demo runs");

        assert_eq!(report.trials_checked, 4, "asthma trial is not a candidate");
        assert!(report.patient_profile.is_priority_candidate);

        let ordered = report.ranking.clone().into_ordered();
        assert_eq!(ordered[0].trial.id.0, "NCT05500101");
        let male_only = ordered
            .iter()
            .find(|ranked| ranked.trial.id.0 == "NCT05500104")
            .expect("male-only trial assessed");
        assert_eq!(
            male_only.eligibility.as_ref().map(|result| result.status),
            Some(EligibilityStatus::NotEligible)
        );
    }

    #[tokio::test]
    async fn console_summary_lists_buckets_and_fallbacks() {
        let report = demo_report(EligibilityEngine::rule_based())
            .await
            .expect("demo runs");

        let text = format_match_report(&report);
        assert!(text.contains("Trials checked: 4"));
        assert!(text.contains("High priority ("));
        assert!(text.contains("(rule-based fallback)"));
        assert!(text.contains("missing eligibility_criteria"));
        assert!(!text.contains("llm_status"));
    }
}
