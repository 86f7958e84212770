use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::constants;
use crate::error::ChatError;

// Structures matching Ollama's /api/chat endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

/// One request, one full reply. Used by the browser chat page and the terminal chat.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl ChatClient {
    pub fn new(client: Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single user message and return the model's reply text.
    ///
    /// A reply without `message.content` yields [`constants::NO_RESPONSE`].
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn chat(&self, message: &str) -> Result<String, ChatError> {
        let request_payload = ChatRequest::new(self.model.clone(), vec![ChatMessage::user(message)]);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request_payload)
            .timeout(Duration::from_secs(constants::CHAT_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Ollama chat request failed");
            return Err(ChatError::Upstream { status, body });
        }

        let chat_response = response.json::<ChatResponse>().await?;
        let reply = chat_response
            .message
            .and_then(|m| m.content)
            .unwrap_or_else(|| constants::NO_RESPONSE.to_string());

        debug!(reply_len = reply.len(), "Received Ollama reply");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_streaming_request_serializes_flag() {
        let request = ChatRequest::new("gemma3:1b", vec![ChatMessage::user("hi")]).streaming();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gemma3:1b",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn test_chat_response_without_message() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(parsed.message.is_none());
    }
}
