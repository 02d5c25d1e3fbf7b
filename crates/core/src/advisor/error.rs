use serde_json::Value;
use std::fmt;

/// Advisor failure with enough raw material attached to debug a misbehaving
/// model response after the fact.
#[derive(Debug, Clone)]
pub struct AdvisorDiagnosticsError {
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for AdvisorDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "advisor error (stage={}): {}", self.stage, self.detail)
    }
}

impl std::error::Error for AdvisorDiagnosticsError {}
