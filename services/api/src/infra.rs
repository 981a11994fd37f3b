use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use trial_match::config::{AppConfig, ReasonerConfig};
use trial_match::error::AppError;
use trial_match::matching::{
    select_candidates, CandidateQuery, CatalogError, EligibilityEngine, Trial, TrialCatalog,
    TrialId, TrialMatchingService,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Catalog backed by a fixed list of trials, optionally loaded from a JSON file.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTrialCatalog {
    trials: Arc<Vec<Trial>>,
}

impl InMemoryTrialCatalog {
    pub(crate) fn from_trials(trials: Vec<Trial>) -> Self {
        Self {
            trials: Arc::new(trials),
        }
    }

    pub(crate) fn load(path: &Path) -> Result<Self, AppError> {
        let trials: Vec<Trial> = read_json(path)?;
        info!(path = %path.display(), trials = trials.len(), "trial catalog loaded");
        Ok(Self::from_trials(trials))
    }

    pub(crate) fn len(&self) -> usize {
        self.trials.len()
    }
}

impl TrialCatalog for InMemoryTrialCatalog {
    fn candidates(&self, query: &CandidateQuery) -> Result<Vec<Trial>, CatalogError> {
        Ok(select_candidates(self.trials.iter(), query))
    }

    fn fetch(&self, id: &TrialId) -> Result<Option<Trial>, CatalogError> {
        Ok(self.trials.iter().find(|trial| &trial.id == id).cloned())
    }
}

pub(crate) fn build_engine(config: &ReasonerConfig) -> Result<EligibilityEngine, AppError> {
    let engine = EligibilityEngine::from_config(config)?;
    info!(
        backend = engine.backend_name(),
        model = %config.model,
        "eligibility engine configured"
    );
    Ok(engine)
}

pub(crate) fn build_service(
    config: &AppConfig,
) -> Result<TrialMatchingService<InMemoryTrialCatalog>, AppError> {
    let catalog = match &config.matching.catalog_path {
        Some(path) => InMemoryTrialCatalog::load(path)?,
        None => InMemoryTrialCatalog::default(),
    };
    let engine = build_engine(&config.reasoner)?;

    Ok(TrialMatchingService::new(
        Arc::new(engine),
        Arc::new(catalog),
        config.matching.concurrency,
    ))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{name}", std::process::id()));
        let mut file = std::fs::File::create(&path).expect("temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        path
    }

    #[test]
    fn catalog_loads_registry_shaped_json() {
        let path = temp_file(
            "catalog.json",
            r#"[
                {"nct_id": "NCT1", "conditions": ["Lung Cancer"], "locations": ["Kochi, India"]},
                {"nct_id": "NCT2", "conditions": ["Asthma"]}
            ]"#,
        );

        let catalog = InMemoryTrialCatalog::load(&path).expect("catalog loads");
        std::fs::remove_file(&path).ok();

        assert_eq!(catalog.len(), 2);
        let query = CandidateQuery {
            conditions: vec!["lung cancer".to_string()],
            location: None,
            limit: 10,
        };
        let found = catalog.candidates(&query).expect("search succeeds");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, TrialId("NCT1".to_string()));
        assert!(catalog
            .fetch(&TrialId("NCT2".to_string()))
            .expect("fetch succeeds")
            .is_some());
    }

    #[test]
    fn malformed_catalog_is_a_json_error() {
        let path = temp_file("broken.json", "{ not json");
        let outcome = InMemoryTrialCatalog::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(outcome, Err(AppError::Json(_))));
    }

    #[test]
    fn missing_catalog_is_an_io_error() {
        let outcome = InMemoryTrialCatalog::load(Path::new("/nonexistent/trials.json"));
        assert!(matches!(outcome, Err(AppError::Io(_))));
    }

    #[test]
    fn engine_without_key_is_rule_based() {
        let engine = build_engine(&ReasonerConfig::default()).expect("engine builds");
        assert_eq!(engine.backend_name(), "disabled");
    }
}
