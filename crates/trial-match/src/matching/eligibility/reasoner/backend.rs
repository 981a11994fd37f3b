use async_trait::async_trait;

/// A single generation call against the reasoning backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Text-generation capability the eligibility reasoner delegates to.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    fn name(&self) -> &str;

    /// `false` short-circuits the reasoner straight into the rule-based path.
    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &ReasoningRequest) -> Result<String, BackendError>;
}

/// Null backend used when nothing is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl ReasoningBackend for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn generate(&self, _request: &ReasoningRequest) -> Result<String, BackendError> {
        Err(BackendError::NotConfigured)
    }
}

/// Transport-level failures talking to a reasoning backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("reasoning backend not configured")]
    NotConfigured,
    #[error("unable to build http client: {0}")]
    Client(String),
    #[error("cannot reach reasoning backend at {0}")]
    Connection(String),
    #[error("reasoning backend timed out after {0}s")]
    Timeout(u64),
    #[error("reasoning backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("reasoning backend returned no text")]
    EmptyResponse,
    #[error("unreadable reasoning backend response: {0}")]
    Decode(String),
}
