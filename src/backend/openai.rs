//! Adapter for OpenAI-compatible chat-completions APIs.
//!
//! Endpoint: `/v1/chat/completions`. Covers OpenAI itself plus the usual
//! compatible providers (vLLM, llama.cpp server, LM Studio, Together AI,
//! Groq, Mistral, and Ollama's `/v1/` endpoint).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Completion, CompletionBackend, CompletionRequest};

/// Backend for any OpenAI-compatible chat-completions API.
///
/// # Example
///
/// ```
/// use promptsheet::backend::OpenAiBackend;
///
/// let backend = OpenAiBackend::new().with_api_key("sk-...");
/// ```
#[derive(Clone)]
pub struct OpenAiBackend {
    /// Optional API key. If set, sent as `Authorization: Bearer {key}`.
    api_key: Option<String>,
    /// Optional organization ID. If set, sent as `OpenAI-Organization: {org}`.
    organization: Option<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|k| {
                    if k.len() > 6 {
                        format!("{}***", &k[..6])
                    } else {
                        "***".to_string()
                    }
                }),
            )
            .field("organization", &self.organization)
            .finish()
    }
}

impl OpenAiBackend {
    /// Create a new backend without authentication.
    pub fn new() -> Self {
        Self {
            api_key: None,
            organization: None,
        }
    }

    /// Set the API key for authentication.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the organization ID header.
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Returns `true` if an API key has been configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the request body for `/v1/chat/completions`.
    ///
    /// An empty system prompt is omitted rather than sent as a blank message.
    fn build_body(request: &CompletionRequest) -> Value {
        let mut messages = Vec::new();
        if !request.system_prompt.is_empty() {
            messages.push(json!({"role": "system", "content": request.system_prompt}));
        }
        messages.push(json!({"role": "user", "content": request.user_prompt}));

        json!({
            "model": request.model,
            "messages": messages,
        })
    }

    /// Parse a `Retry-After` header value as seconds.
    fn parse_retry_after(value: &str) -> Option<std::time::Duration> {
        value
            .trim()
            .parse::<u64>()
            .ok()
            .map(std::time::Duration::from_secs)
    }

    /// Build the reqwest request with appropriate headers.
    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).json(body);

        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        if let Some(ref org) = self.organization {
            req = req.header("OpenAI-Organization", org.as_str());
        }

        req
    }

    /// Extract the generated text from a chat-completions response, trimmed.
    ///
    /// `None` when the choice list is missing or empty.
    fn extract_text(response: &Value) -> Option<String> {
        response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
    }
}

impl Default for OpenAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &CompletionRequest,
    ) -> Completion {
        let base = base_url.trim_end_matches('/');
        let url = format!("{}/v1/chat/completions", base);
        let body = Self::build_body(request);

        let resp = match self.build_http_request(client, &url, &body).send().await {
            Ok(resp) => resp,
            Err(e) => return Completion::Failed(format!("failed to reach {}: {}", url, e)),
        };

        let status = resp.status();

        if status.as_u16() == 429 {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after);
            return Completion::Throttled { retry_after };
        }

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Completion::Failed(format!("HTTP {}: {}", status.as_u16(), text));
        }

        let json_resp: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => return Completion::Failed(format!("malformed response body: {}", e)),
        };

        match Self::extract_text(&json_resp) {
            Some(text) => Completion::Generated(text),
            None => Completion::Failed("response contained no choices".to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".into(),
            system_prompt: "You are a helpful assistant.".into(),
            user_prompt: "Why is the sky blue?".into(),
        }
    }

    #[test]
    fn test_build_body_chat_payload() {
        let body = OpenAiBackend::build_body(&test_request());

        assert_eq!(body["model"], "gpt-4o-mini");
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are a helpful assistant.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "Why is the sky blue?");
    }

    #[test]
    fn test_build_body_skips_empty_system() {
        let mut request = test_request();
        request.system_prompt = String::new();

        let body = OpenAiBackend::build_body(&request);
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_auth_headers() {
        let backend = OpenAiBackend::new()
            .with_api_key("sk-test123")
            .with_organization("org-abc");

        let client = Client::new();
        let body = json!({"test": true});
        let req = backend
            .build_http_request(&client, "https://api.openai.com/v1/chat/completions", &body)
            .build()
            .expect("build request");

        let auth = req.headers().get("Authorization").expect("auth header");
        assert_eq!(auth, "Bearer sk-test123");
        let org = req.headers().get("OpenAI-Organization").expect("org header");
        assert_eq!(org, "org-abc");
    }

    #[test]
    fn test_no_auth_headers_by_default() {
        let backend = OpenAiBackend::new();

        let client = Client::new();
        let body = json!({"test": true});
        let req = backend
            .build_http_request(&client, "https://api.openai.com/v1/chat/completions", &body)
            .build()
            .expect("build request");

        assert!(req.headers().get("Authorization").is_none());
        assert!(req.headers().get("OpenAI-Organization").is_none());
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(
            OpenAiBackend::parse_retry_after("30"),
            Some(std::time::Duration::from_secs(30))
        );
        assert_eq!(
            OpenAiBackend::parse_retry_after(" 5 "),
            Some(std::time::Duration::from_secs(5))
        );
        assert_eq!(OpenAiBackend::parse_retry_after("soon"), None);
    }

    #[test]
    fn test_extract_text_trims() {
        let resp = json!({
            "choices": [{"message": {"content": "  hello world \n"}}]
        });
        assert_eq!(
            OpenAiBackend::extract_text(&resp),
            Some("hello world".to_string())
        );
    }

    #[test]
    fn test_extract_text_empty_choices() {
        let resp = json!({"choices": []});
        assert_eq!(OpenAiBackend::extract_text(&resp), None);
    }

    #[test]
    fn test_extract_text_missing_choices() {
        let resp = json!({"error": {"message": "nope"}});
        assert_eq!(OpenAiBackend::extract_text(&resp), None);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = OpenAiBackend::new().with_api_key("sk-1234567890abcdef");
        let debug_output = format!("{:?}", backend);
        assert!(
            !debug_output.contains("1234567890abcdef"),
            "API key must not appear in Debug output"
        );
        assert!(debug_output.contains("sk-123"));
        assert!(debug_output.contains("***"));
    }

    #[test]
    fn test_has_api_key() {
        assert!(!OpenAiBackend::new().has_api_key());
        assert!(OpenAiBackend::new().with_api_key("sk-test").has_api_key());
    }
}
