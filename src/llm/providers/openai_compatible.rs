use async_trait::async_trait;

use crate::errors::{EuporieError, EuporieResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String, client: reqwest::Client) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client,
        }
    }
}

/// Copy of the request body with inline images replaced, for logging.
fn sanitized_body(body: &serde_json::Value) -> serde_json::Value {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            // content can be string or array of parts; we only touch the array case.
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if part.get("type").and_then(|t| t.as_str()) != Some("image_url") {
                    continue;
                }
                if let Some(url) = part.get_mut("image_url").and_then(|u| u.get_mut("url")) {
                    *url = serde_json::Value::String("<omitted_base64_image>".to_string());
                }
            }
        }
    }
    log_body
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> EuporieResult<LlmResponse> {
        let body = serde_json::json!({
            "model": cfg.model,
            "messages": &messages,
            "stream": false,
            "temperature": cfg.temperature,
        });

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            messages = messages.len(),
            "sending LLM request"
        );
        tracing::trace!(
            body = %serde_json::to_string(&sanitized_body(&body)).unwrap_or_default(),
            "request body (sanitized, base64 omitted)"
        );

        let mut request = self.client.post(&self.api_base).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(EuporieError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        let json: serde_json::Value = response.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                EuporieError::LlmProvider("response has no choices[0].message.content".into())
            })?
            .to_string();

        tracing::info!(
            provider = %self.id,
            content_len = content.len(),
            "LLM JSON response received"
        );

        Ok(LlmResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ContentPart;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg() -> CallConfig {
        CallConfig {
            model: "gpt-test".into(),
            temperature: 0.1,
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"data_generation_required\": false}"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            "test".into(),
            format!("{}/v1/chat/completions", server.uri()),
            "sk-test".into(),
            reqwest::Client::new(),
        );
        let response = provider
            .chat(vec![ChatMessage::user("hello")], &cfg())
            .await
            .unwrap();
        assert_eq!(response.content, "{\"data_generation_required\": false}");
    }

    #[tokio::test]
    async fn http_errors_surface_as_provider_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            "test".into(),
            server.uri(),
            String::new(),
            reqwest::Client::new(),
        );
        let err = provider
            .chat(vec![ChatMessage::user("hello")], &cfg())
            .await
            .unwrap_err();
        assert!(matches!(err, EuporieError::LlmProvider(ref m) if m.contains("slow down")));
    }

    #[test]
    fn sanitizer_hides_images() {
        let messages = vec![ChatMessage::user_parts(vec![
            ContentPart::text("look"),
            ContentPart::image_base64("image/png", "AAAA"),
        ])];
        let body = serde_json::json!({"messages": messages});
        let clean = sanitized_body(&body);
        assert_eq!(
            clean["messages"][0]["content"][1]["image_url"]["url"],
            "<omitted_base64_image>"
        );
        assert_eq!(clean["messages"][0]["content"][0]["text"], "look");
    }
}
