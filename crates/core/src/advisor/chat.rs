use crate::advisor::error::AdvisorDiagnosticsError;
use crate::advisor::json;
use crate::advisor::AdvisorClient;
use crate::config::Settings;
use crate::domain::analysis::{Anomaly, Recommendation, Violation};
use crate::domain::snapshot::FinancialSnapshot;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Low temperatures keep the structured-output contract honest.
const ANOMALY_TEMPERATURE: f64 = 0.3;
const ANOMALY_MAX_TOKENS: u32 = 1000;
const RECOMMENDATION_TEMPERATURE: f64 = 0.4;
const RECOMMENDATION_MAX_TOKENS: u32 = 800;

/// Client for an OpenAI-shaped `/v1/chat/completions` endpoint. One request
/// per operation, no retries; parse failures degrade to empty output.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatCompletionClient {
    /// Returns `None` when no credential is configured; callers then skip
    /// advisor calls entirely rather than attempting network I/O.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = settings.openai_api_key.as_deref() else {
            return Ok(None);
        };

        let base_url =
            std::env::var("ADVISOR_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ADVISOR_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("ADVISOR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build advisor http client")?;

        Ok(Some(Self {
            http,
            api_key: api_key.to_string(),
            base_url,
            model,
        }))
    }

    async fn create_chat(
        &self,
        req: ChatCompletionRequest,
    ) -> anyhow::Result<ChatCompletionResponse> {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("advisor request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read advisor response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(AdvisorDiagnosticsError {
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to decode advisor response JSON: {text}"))
    }

    fn response_text(res: ChatCompletionResponse) -> Option<String> {
        res.choices.into_iter().next()?.message.content
    }

    fn anomaly_system_prompt() -> String {
        [
            "You are a financial compliance expert.",
            "Analyze the company snapshot for anomalies a deterministic rule set would miss.",
            "Respond ONLY with a JSON array. No markdown, no prose around it.",
            "Each entry: {\"type\": string, \"description\": string, \"severity\": \"low\"|\"medium\"|\"high\"|\"critical\", \"confidence\": number in [0,1]}.",
            "Return [] if nothing stands out.",
        ]
        .join("\n")
    }

    fn recommendation_system_prompt() -> String {
        [
            "You are a compliance consultant.",
            "Given a company snapshot and its detected violations, propose remediation actions.",
            "Respond ONLY with a JSON array. No markdown, no prose around it.",
            "Each entry: {\"priority\": \"low\"|\"medium\"|\"high\"|\"critical\", \"action\": string, \"description\": string, \"timeline\": string}.",
        ]
        .join("\n")
    }

    fn anomaly_user_prompt(snapshot: &FinancialSnapshot) -> anyhow::Result<String> {
        let snapshot_json = serde_json::to_string_pretty(snapshot)
            .context("failed to serialize snapshot for advisor prompt")?;
        Ok(format!(
            "Company financial snapshot:\n{snapshot_json}\n\nList the anomalies."
        ))
    }

    fn recommendation_user_prompt(
        snapshot: &FinancialSnapshot,
        violations: &[Violation],
        anomalies: &[Anomaly],
    ) -> anyhow::Result<String> {
        let snapshot_json = serde_json::to_string_pretty(snapshot)
            .context("failed to serialize snapshot for advisor prompt")?;
        let violations_json = serde_json::to_string_pretty(violations)
            .context("failed to serialize violations for advisor prompt")?;
        let anomalies_json = serde_json::to_string_pretty(anomalies)
            .context("failed to serialize anomalies for advisor prompt")?;
        Ok(format!(
            "Company financial snapshot:\n{snapshot_json}\n\n\
Detected violations:\n{violations_json}\n\n\
Detected anomalies:\n{anomalies_json}\n\n\
Recommend remediation actions."
        ))
    }

    fn request(
        &self,
        system: String,
        user: String,
        temperature: f64,
        max_tokens: u32,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl AdvisorClient for ChatCompletionClient {
    fn name(&self) -> &'static str {
        "chat_completions"
    }

    async fn detect_anomalies(
        &self,
        snapshot: &FinancialSnapshot,
    ) -> anyhow::Result<Vec<Anomaly>> {
        let req = self.request(
            Self::anomaly_system_prompt(),
            Self::anomaly_user_prompt(snapshot)?,
            ANOMALY_TEMPERATURE,
            ANOMALY_MAX_TOKENS,
        );
        let res = self.create_chat(req).await?;

        let Some(text) = Self::response_text(res) else {
            tracing::warn!(company_id = %snapshot.company_id, "advisor returned no message content");
            return Ok(Vec::new());
        };
        Ok(json::parse_anomalies(&text))
    }

    async fn generate_recommendations(
        &self,
        snapshot: &FinancialSnapshot,
        violations: &[Violation],
        anomalies: &[Anomaly],
    ) -> anyhow::Result<Vec<Recommendation>> {
        let req = self.request(
            Self::recommendation_system_prompt(),
            Self::recommendation_user_prompt(snapshot, violations, anomalies)?,
            RECOMMENDATION_TEMPERATURE,
            RECOMMENDATION_MAX_TOKENS,
        );
        let res = self.create_chat(req).await?;

        let Some(text) = Self::response_text(res) else {
            tracing::warn!(company_id = %snapshot.company_id, "advisor returned no message content");
            return Ok(Vec::new());
        };
        Ok(json::parse_recommendations(&text))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_api_key_short_circuits_to_none() {
        let settings = Settings {
            database_url: None,
            openai_api_key: None,
            sentry_dsn: None,
        };
        assert!(ChatCompletionClient::from_settings(&settings)
            .unwrap()
            .is_none());
    }

    #[test]
    fn response_text_reads_the_first_choice() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "[]"},
                    "finish_reason": "stop",
                },
            ],
        }))
        .unwrap();

        assert_eq!(
            ChatCompletionClient::response_text(res),
            Some("[]".to_string())
        );
    }

    #[test]
    fn response_without_content_is_none() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant"}},
            ],
        }))
        .unwrap();
        assert_eq!(ChatCompletionClient::response_text(res), None);
    }

    #[test]
    fn request_carries_the_sampling_contract() {
        let req = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "system",
                content: "x".to_string(),
            }],
            temperature: ANOMALY_TEMPERATURE,
            max_tokens: ANOMALY_MAX_TOKENS,
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["temperature"], json!(0.3));
        assert_eq!(value["max_tokens"], json!(1000));
        assert_eq!(value["messages"][0]["role"], json!("system"));
    }
}
