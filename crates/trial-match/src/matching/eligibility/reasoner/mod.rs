//! AI-backed eligibility reasoning.
//!
//! The reasoner renders a structured prompt, delegates generation to a
//! [`ReasoningBackend`] and normalizes whatever comes back into an
//! [`EligibilityResult`]. Every failure surfaces as a [`ReasonerFailure`] so the
//! engine can decide how to degrade.

mod backend;
mod gemini;
mod payload;
mod prompt;

pub use backend::{BackendError, DisabledBackend, ReasoningBackend, ReasoningRequest};
pub use gemini::GeminiBackend;
pub use payload::PayloadError;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::super::domain::{Patient, Trial};
use super::EligibilityResult;
use crate::config::ReasonerConfig;

/// Sampling and deadline knobs for a single reasoning call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: 2048,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&ReasonerConfig> for GenerationSettings {
    fn from(config: &ReasonerConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: config.timeout(),
        }
    }
}

/// Why the reasoner could not produce a result.
#[derive(Debug, thiserror::Error)]
pub enum ReasonerFailure {
    #[error("reasoning backend not configured")]
    Unconfigured,
    #[error("reasoning timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("reasoning backend panicked")]
    Panicked,
    #[error("unable to encode patient record: {0}")]
    Prompt(serde_json::Error),
}

pub struct AiReasoner {
    backend: Arc<dyn ReasoningBackend>,
    settings: GenerationSettings,
}

impl AiReasoner {
    pub fn new(backend: Arc<dyn ReasoningBackend>, settings: GenerationSettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    /// Ask the backend for a structured assessment of `criteria` against `patient`.
    pub async fn reason(
        &self,
        patient: &Patient,
        trial: &Trial,
        criteria: &str,
    ) -> Result<EligibilityResult, ReasonerFailure> {
        if !self.backend.is_available() {
            return Err(ReasonerFailure::Unconfigured);
        }

        let today = chrono::Local::now().date_naive();
        let prompt =
            prompt::build_prompt(today, criteria, patient).map_err(ReasonerFailure::Prompt)?;
        let request = ReasoningRequest {
            prompt,
            temperature: self.settings.temperature,
            max_output_tokens: self.settings.max_output_tokens,
        };

        tracing::debug!(
            trial = %trial.id,
            backend = self.backend.name(),
            prompt_chars = request.prompt.len(),
            "requesting eligibility reasoning"
        );

        let call = AssertUnwindSafe(self.backend.generate(&request)).catch_unwind();
        let raw = match tokio::time::timeout(self.settings.timeout, call).await {
            Err(_) => return Err(ReasonerFailure::Timeout(self.settings.timeout)),
            Ok(Err(_panic)) => return Err(ReasonerFailure::Panicked),
            Ok(Ok(outcome)) => outcome?,
        };

        Ok(payload::parse_response(&raw)?)
    }
}
