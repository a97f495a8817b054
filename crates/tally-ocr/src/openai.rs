//! OpenAI-compatible chat completions adapter for receipt OCR

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;
use tally_core::OcrSettings;

use crate::extractor::{OcrError, ReceiptExtractor};
use crate::prompt::RECEIPT_EXTRACTION_PROMPT;

pub struct OpenAiReceiptExtractor {
    http_client: reqwest::Client,
    settings: OcrSettings,
}

impl Debug for OpenAiReceiptExtractor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiReceiptExtractor")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl OpenAiReceiptExtractor {
    pub fn new(settings: OcrSettings) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to create HTTP client for OCR provider, using default client");
                reqwest::Client::default()
            });
        Self {
            http_client,
            settings,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ReceiptExtractor for OpenAiReceiptExtractor {
    async fn extract(&self, image_url: &str) -> Result<String, OcrError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| OcrError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let request_body = json!({
            "model": self.settings.model,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": RECEIPT_EXTRACTION_PROMPT },
                        { "type": "image_url", "image_url": { "url": image_url } }
                    ]
                }
            ]
        });

        tracing::debug!(model = %self.settings.model, image_url = %image_url, "Sending receipt to OCR provider");

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| OcrError::Transport(format!("Failed to reach OCR provider: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(error_body) = serde_json::from_str::<ApiErrorBody>(&error_text) {
                return Err(OcrError::Transport(format!(
                    "OCR provider error ({}): {} - Status: {}",
                    error_body.error.kind.as_deref().unwrap_or("api_error"),
                    error_body.error.message,
                    status
                )));
            }

            return Err(OcrError::Transport(format!(
                "OCR request failed: {} - {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Transport(format!("Failed to parse OCR response: {}", e)))?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OCR provider usage"
            );
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(OcrError::EmptyResponse)?;

        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn extractor(base_url: String, api_key: Option<&str>) -> OpenAiReceiptExtractor {
        OpenAiReceiptExtractor::new(OcrSettings {
            api_key: api_key.map(String::from),
            base_url,
            model: "gpt-5-nano".to_string(),
            timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let ocr = extractor("http://127.0.0.1:9".to_string(), None);
        let err = ocr.extract("https://example.com/r.png").await.unwrap_err();
        assert!(matches!(err, OcrError::Config(_)));
    }

    #[tokio::test]
    async fn test_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-5-nano",
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": RECEIPT_EXTRACTION_PROMPT },
                        { "type": "image_url", "image_url": { "url": "https://example.com/r.png" } }
                    ]
                }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{ "message": { "content": "  {\"items\":[]}  " } }],
                    "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let ocr = extractor(server.url(), Some("sk-test"));
        let text = ocr.extract("https://example.com/r.png").await.unwrap();
        assert_eq!(text, "{\"items\":[]}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let ocr = extractor(server.url(), Some("sk-test"));
        let err = ocr.extract("https://example.com/r.png").await.unwrap_err();
        assert!(matches!(err, OcrError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_api_error_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "Rate limit reached", "type": "rate_limit_error"}}"#)
            .create_async()
            .await;

        let ocr = extractor(format!("{}/", server.url()), Some("sk-test"));
        match ocr.extract("https://example.com/r.png").await.unwrap_err() {
            OcrError::Transport(msg) => {
                assert!(msg.contains("rate_limit_error"));
                assert!(msg.contains("Rate limit reached"));
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        let ocr = extractor("http://127.0.0.1:9".to_string(), Some("sk-test"));
        let err = ocr.extract("https://example.com/r.png").await.unwrap_err();
        assert!(matches!(err, OcrError::Transport(_)));
    }
}
