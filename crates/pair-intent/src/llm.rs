//! Language-model collaborator: request/response types, the model trait and
//! output post-processing.
//!
//! The model's reply is untrusted text. The only thing taken from it is the
//! first JSON object it contains ([`extract_structured`]), which then goes
//! through the intent validator like any other raw input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::LlmError;

/// Shown when the self-hosted model streamed nothing usable.
pub const NO_STREAMED_OUTPUT: &str = "(no output from OSS model)";
/// Shown when the hosted model returned no message content.
pub const NO_RESPONSE: &str = "(no response)";

/// Prepended to the user's sentence so the model answers with one intent object.
pub const INTENT_INSTRUCTIONS: &str = r#"You translate requests for a two-token exchange into JSON.
Reply with exactly one JSON object and nothing else. Shapes:
{"action":"swap","tokenIn":"BTC","tokenOut":"ETH","amount":10}
{"action":"deposit","amounts":[{"token":"USDT","amount":5},{"token":"XRP","amount":5}]}
{"action":"redeem","pool":["BNB","SOL"]}
{"action":"query","type":"reserves"|"swaps"|"volume","pool":["USDC","DOGE"]}
Use token tickers exactly as the user wrote them. Use a list when the user names several tokens
for one side. For anything else, set "action" to a short verb describing the request.
Request: "#;

/// Which model answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// Hosted chat-completions model.
    Primary,
    /// Self-hosted model behind a streaming endpoint.
    Secondary,
}

impl ModelChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Primary => "primary",
            ModelChoice::Secondary => "secondary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub model: ModelChoice,
    /// Overrides the configured endpoint of the secondary model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: ModelChoice) -> Self {
        Self { prompt: prompt.into(), model, endpoint: None }
    }

    /// Wraps a user sentence in [`INTENT_INSTRUCTIONS`].
    pub fn for_intent(sentence: &str, model: ModelChoice) -> Self {
        Self::new(format!("{INTENT_INSTRUCTIONS}{}", sentence.trim()), model)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
}

impl LlmResponse {
    /// Builds a response from raw text, extracting the embedded intent if any.
    pub fn from_output(output: impl Into<String>) -> Self {
        let output = output.into();
        let structured = extract_structured(&output);
        Self { output, structured }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

/// Joins a newline-delimited JSON stream by each chunk's `response` field.
/// Lines that are not JSON, or lack a string `response`, contribute nothing.
pub fn merge_streamed_output(raw: &str) -> String {
    let merged: String = raw
        .trim()
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|chunk| chunk.get("response").and_then(Value::as_str).map(str::to_owned))
        .collect();
    if merged.is_empty() {
        NO_STREAMED_OUTPUT.to_string()
    } else {
        merged
    }
}

/// First JSON object embedded in `text`, tolerating prose and code fences
/// around it.
pub fn extract_structured(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            let mut values =
                serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match values.next() {
                Some(Ok(value @ Value::Object(_))) => Some(value),
                _ => None,
            }
        })
}

#[cfg(feature = "http")]
pub use self::http::HttpLanguageModel;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use reqwest::Client;
    use serde_json::{json, Value};
    use tracing::{debug, info};

    use super::{
        merge_streamed_output, LanguageModel, LlmRequest, LlmResponse, ModelChoice, NO_RESPONSE,
    };
    use crate::config::AppConfig;
    use crate::types::LlmError;

    /// [`LanguageModel`] over HTTP: a chat-completions API for the primary
    /// model and a streaming `{model, prompt}` endpoint for the secondary one.
    #[derive(Debug, Clone)]
    pub struct HttpLanguageModel {
        client: Client,
        api_key: Option<String>,
        primary_url: String,
        primary_model: String,
        secondary_endpoint: Option<String>,
        secondary_model: String,
    }

    impl HttpLanguageModel {
        pub fn from_config(config: &AppConfig) -> Self {
            Self {
                client: Client::new(),
                api_key: config.llm_api_key.clone(),
                primary_url: config.llm_primary_url.clone(),
                primary_model: config.llm_primary_model.clone(),
                secondary_endpoint: config.llm_secondary_endpoint.clone(),
                secondary_model: config.llm_secondary_model.clone(),
            }
        }

        async fn primary(&self, prompt: &str) -> Result<String, LlmError> {
            let api_key = self.api_key.as_deref().ok_or_else(|| {
                LlmError::InvalidSetup("no API key for the primary model".to_string())
            })?;
            let payload = json!({
                "model": self.primary_model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0,
            });
            let body: Value = self
                .client
                .post(&self.primary_url)
                .bearer_auth(api_key)
                .json(&payload)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| LlmError::Transport(e.to_string()))?
                .json()
                .await
                .map_err(|e| LlmError::BadResponse(e.to_string()))?;

            let content = body
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty());
            Ok(content.unwrap_or(NO_RESPONSE).to_string())
        }

        async fn secondary(&self, prompt: &str, endpoint: &str) -> Result<String, LlmError> {
            let payload = json!({ "model": self.secondary_model, "prompt": prompt });
            let raw = self
                .client
                .post(endpoint)
                .json(&payload)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| LlmError::Transport(e.to_string()))?
                .text()
                .await
                .map_err(|e| LlmError::BadResponse(e.to_string()))?;
            debug!(bytes = raw.len(), "secondary model stream received");
            Ok(merge_streamed_output(&raw))
        }
    }

    #[async_trait]
    impl LanguageModel for HttpLanguageModel {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            if request.prompt.trim().is_empty() {
                return Err(LlmError::EmptyPrompt);
            }
            info!(model = request.model.as_str(), "sending prompt to language model");
            let output = match request.model {
                ModelChoice::Primary => self.primary(&request.prompt).await?,
                ModelChoice::Secondary => {
                    let endpoint = request
                        .endpoint
                        .as_deref()
                        .or(self.secondary_endpoint.as_deref())
                        .ok_or_else(|| {
                            LlmError::InvalidSetup(
                                "no endpoint for the secondary model".to_string(),
                            )
                        })?;
                    self.secondary(&request.prompt, endpoint).await?
                }
            };
            Ok(LlmResponse::from_output(output))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn unconfigured() -> HttpLanguageModel {
            HttpLanguageModel::from_config(&AppConfig::default())
        }

        #[tokio::test]
        async fn blank_prompt_is_refused() {
            for model in [ModelChoice::Primary, ModelChoice::Secondary] {
                let request = LlmRequest::new(" \n\t", model);
                assert_eq!(unconfigured().complete(&request).await, Err(LlmError::EmptyPrompt));
            }
        }

        #[tokio::test]
        async fn primary_model_needs_an_api_key() {
            let request = LlmRequest::new("swap 1 BTC for ETH", ModelChoice::Primary);
            let err = unconfigured().complete(&request).await.unwrap_err();
            assert!(matches!(err, LlmError::InvalidSetup(msg) if msg.contains("API key")));
        }

        #[tokio::test]
        async fn secondary_model_needs_an_endpoint() {
            let request = LlmRequest::new("swap 1 BTC for ETH", ModelChoice::Secondary);
            let err = unconfigured().complete(&request).await.unwrap_err();
            assert!(matches!(err, LlmError::InvalidSetup(msg) if msg.contains("endpoint")));
        }
    }
}
