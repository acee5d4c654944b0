use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

/// Where a model call went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Non-2xx from the model endpoint.
    Http,
    /// A 2xx response carrying no usable text (blocked prompt, no candidates).
    Empty,
    /// Text that is not JSON.
    Parse,
    /// JSON that does not fit the expected contract.
    Schema,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Http => "http",
            Stage::Empty => "empty",
            Stage::Parse => "parse",
            Stage::Schema => "schema",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed model call with whatever the model sent back, for logs and Sentry.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: Stage,
    pub detail: String,
    /// Model text or HTTP body, verbatim.
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    pub fn http(provider: Provider, detail: String, body: String) -> Self {
        Self {
            provider,
            stage: Stage::Http,
            detail,
            raw_response_json: serde_json::from_str(&body).ok(),
            raw_output: Some(body),
        }
    }

    pub fn empty(provider: Provider, detail: String, response: &Value) -> Self {
        Self {
            provider,
            stage: Stage::Empty,
            detail,
            raw_output: None,
            raw_response_json: Some(response.clone()),
        }
    }

    /// Output that was received but did not match the expected JSON contract.
    pub fn malformed(stage: Stage, detail: String, raw_output: &str) -> Self {
        Self {
            provider: Provider::Gemini,
            stage,
            detail,
            raw_output: Some(raw_output.to_string()),
            raw_response_json: None,
        }
    }

    pub fn is_malformed_output(&self) -> bool {
        matches!(self.stage, Stage::Parse | Stage::Schema)
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} error: {}", self.provider, self.stage, self.detail)
    }
}

impl std::error::Error for LlmDiagnosticsError {}
