use crate::core::generation::{ChatProvider, Conversation, GenerationConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl From<GenerationConfig> for WireGenerationConfig {
    fn from(config: GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Google Generative Language API (`generateContent`).
#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    key_env: String,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>, key_env: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: GEMINI_API_BASE.to_string(),
            api_key,
            key_env: key_env.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn open_conversation(
        &self,
        model: &str,
        config: GenerationConfig,
    ) -> Result<Box<dyn Conversation>> {
        Ok(Box::new(self.conversation(model, config)))
    }
}

impl GeminiProvider {
    fn conversation(&self, model: &str, config: GenerationConfig) -> GeminiConversation {
        GeminiConversation {
            client: self.client.clone(),
            endpoint: format!("{}/models/{model}:generateContent", self.api_base),
            api_key: self.api_key.clone(),
            key_env: self.key_env.clone(),
            config,
            history: Vec::new(),
        }
    }
}

struct GeminiConversation {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    key_env: String,
    config: GenerationConfig,
    history: Vec<Content>,
}

impl GeminiConversation {
    /// Prior turns plus the new user message. The history itself is untouched.
    fn next_contents(&self, text: &str) -> Vec<Content> {
        let mut contents = self.history.clone();
        contents.push(Content::user(text));
        contents
    }

    fn record(&mut self, mut contents: Vec<Content>, reply: &str) {
        contents.push(Content::model(reply));
        self.history = contents;
    }

    async fn generate(&self, api_key: &str, contents: &[Content]) -> Result<String> {
        let body = request_body(contents, self.config);
        debug!(turns = contents.len(), endpoint = %self.endpoint, "sending generateContent");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Gemini returned {status}: {}",
                api_error_message(&body)
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        reply_text(&parsed)
    }
}

#[async_trait]
impl Conversation for GeminiConversation {
    async fn send(&mut self, text: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| Error::MissingApiKey {
            env_var: self.key_env.clone(),
        })?;

        let contents = self.next_contents(text);
        let reply = self.generate(api_key, &contents).await?;
        self.record(contents, &reply);
        Ok(reply)
    }
}

fn request_body(contents: &[Content], config: GenerationConfig) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents,
        generation_config: config.into(),
    }
}

fn reply_text(response: &GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(Error::generation(format!("prompt was blocked ({reason})")));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| Error::generation("response contained no candidates"))?;

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .map(|p| p.text.as_str())
        .collect();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(Error::generation(format!(
            "response contained no text (finish reason: {reason})"
        )));
    }

    Ok(text)
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    type Requests = Arc<Mutex<Vec<Value>>>;

    /// Serves one canned `(status, body)` reply per connection and records
    /// each request's JSON body.
    async fn stub_server(replies: Vec<(u16, Value)>) -> (String, Requests) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests: Requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.expect("accept");
                let request = read_json_body(&mut socket).await;
                log.lock().expect("lock").push(request);

                let body = body.to_string();
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.expect("write");
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), requests)
    }

    async fn read_json_body(socket: &mut TcpStream) -> Value {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.expect("read");
            assert!(n > 0, "connection closed before the request body arrived");
            buf.extend_from_slice(&chunk[..n]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let start = end + 4;
            if buf.len() >= start + len {
                return serde_json::from_slice(&buf[start..start + len]).expect("json body");
            }
        }
    }

    fn reply(text: &str) -> (u16, Value) {
        (
            200,
            json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}]}),
        )
    }

    fn conversation_at(api_base: &str) -> GeminiConversation {
        GeminiProvider::new(Some("test-key".to_string()), GEMINI_KEY_ENV, Duration::from_secs(5))
            .expect("client")
            .with_api_base(api_base)
            .conversation("gemini-1.5-pro", GenerationConfig::default())
    }

    fn roles_and_texts(request: &Value) -> Vec<(String, String)> {
        request["contents"]
            .as_array()
            .expect("contents array")
            .iter()
            .map(|c| {
                (
                    c["role"].as_str().unwrap_or_default().to_string(),
                    c["parts"][0]["text"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    fn pair(role: &str, text: &str) -> (String, String) {
        (role.to_string(), text.to_string())
    }

    #[tokio::test]
    async fn follow_up_request_carries_prior_turns() {
        let (base, requests) = stub_server(vec![reply("outline"), reply("answer")]).await;
        let mut conversation = conversation_at(&base);

        assert_eq!(conversation.send("prompt").await.expect("first"), "outline");
        assert_eq!(conversation.send("question").await.expect("second"), "answer");

        let requests = requests.lock().expect("lock").clone();
        assert_eq!(roles_and_texts(&requests[0]), vec![pair("user", "prompt")]);
        assert_eq!(
            roles_and_texts(&requests[1]),
            vec![
                pair("user", "prompt"),
                pair("model", "outline"),
                pair("user", "question"),
            ]
        );
        assert_eq!(conversation.history.len(), 4);
    }

    #[tokio::test]
    async fn failed_exchanges_leave_history_unchanged() {
        let (base, requests) = stub_server(vec![
            reply("outline"),
            (500, json!({"error": {"code": 500, "message": "backend error"}})),
            (200, json!({"candidates": []})),
            reply("answer"),
        ])
        .await;
        let mut conversation = conversation_at(&base);
        conversation.send("prompt").await.expect("first");

        let err = conversation.send("lost 1").await.expect_err("server error");
        assert!(err.to_string().contains("backend error"));
        assert_eq!(conversation.history.len(), 2);

        conversation.send("lost 2").await.expect_err("no candidates");
        assert_eq!(conversation.history.len(), 2);

        conversation.send("kept").await.expect("recovers");

        let requests = requests.lock().expect("lock").clone();
        assert_eq!(requests.len(), 4);
        assert_eq!(
            roles_and_texts(&requests[3]),
            vec![
                pair("user", "prompt"),
                pair("model", "outline"),
                pair("user", "kept"),
            ]
        );
        assert_eq!(conversation.history.len(), 4);
    }

    #[tokio::test]
    async fn unreachable_endpoint_leaves_history_unchanged() {
        let mut conversation = conversation_at("http://127.0.0.1:1");
        conversation.record(vec![Content::user("prompt")], "outline");

        let err = conversation.send("question").await.expect_err("refused");
        assert_eq!(err.kind(), ErrorKind::Generation);
        assert_eq!(conversation.history, vec![Content::user("prompt"), Content::model("outline")]);
        assert_eq!(conversation.next_contents("again").len(), 3);
    }

    #[test]
    fn request_uses_camel_case_sampling_fields() {
        let contents = vec![Content::user("hi"), Content::model("hello"), Content::user("again")];
        let body = serde_json::to_value(request_body(&contents, GenerationConfig::default()))
            .expect("serializes");

        assert_eq!(body["contents"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "again");

        let config = &body["generationConfig"];
        assert!((config["temperature"].as_f64().expect("temperature") - 0.1).abs() < 1e-6);
        assert!((config["topP"].as_f64().expect("topP") - 0.5).abs() < 1e-6);
        assert_eq!(config["topK"], 16);
        assert_eq!(config["maxOutputTokens"], 20_000);
    }

    #[test]
    fn reply_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "## **1. Intro**"}, {"text": "\n- hello"}]},
                "finishReason": "STOP"
            }]
        }))
        .expect("parses");

        assert_eq!(reply_text(&response).expect("text"), "## **1. Intro**\n- hello");
    }

    #[test]
    fn reply_rejects_empty_or_blocked_responses() {
        let empty: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).expect("parses");
        assert_eq!(reply_text(&empty).expect_err("empty").kind(), ErrorKind::Generation);

        let no_text: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .expect("parses");
        let err = reply_text(&no_text).expect_err("no text");
        assert!(err.to_string().contains("MAX_TOKENS"));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .expect("parses");
        assert!(reply_text(&blocked).expect_err("blocked").to_string().contains("SAFETY"));
    }

    #[test]
    fn extracts_api_error_message() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(api_error_message(body), "Quota exceeded");
        assert_eq!(api_error_message(" gateway timeout "), "gateway timeout");
    }

    #[tokio::test]
    async fn missing_key_fails_every_send() {
        let provider = GeminiProvider::new(None, GEMINI_KEY_ENV, Duration::from_secs(5))
            .expect("client");
        let mut conversation = provider
            .open_conversation("gemini-1.5-pro", GenerationConfig::default())
            .await
            .expect("opens");

        for _ in 0..2 {
            let err = conversation.send("hello").await.expect_err("no key");
            assert!(matches!(err, Error::MissingApiKey { ref env_var } if env_var == GEMINI_KEY_ENV));
        }
    }
}
