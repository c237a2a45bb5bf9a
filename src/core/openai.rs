use crate::core::generation::{ChatProvider, Conversation, GenerationConfig};
use crate::error::{Error, Result};
use async_openai::{
    self,
    config::OpenAIConfig,
    types::responses::{
        CreateResponse, CreateResponseArgs, EasyInputMessageArgs, InputItem, InputParam, OutputItem,
        OutputMessageContent, Role,
    },
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI Responses API. Conversation state lives on the server and is
/// chained through `previous_response_id`.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: async_openai::Client<OpenAIConfig>,
    has_key: bool,
    key_env: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: Option<String>,
        key_env: &str,
        api_base: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let has_key = api_key.is_some();
        let mut config = OpenAIConfig::new().with_api_key(api_key.unwrap_or_default());
        if let Some(base) = api_base {
            config = config.with_api_base(base.trim_end_matches('/'));
        }

        Ok(Self {
            client: async_openai::Client::with_config(config).with_http_client(http_client),
            has_key,
            key_env: key_env.to_string(),
        })
    }

    fn conversation(&self, model: &str, config: GenerationConfig) -> OpenAiConversation {
        OpenAiConversation {
            client: self.client.clone(),
            has_key: self.has_key,
            key_env: self.key_env.clone(),
            model: model.to_string(),
            config,
            previous_response_id: None,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn open_conversation(
        &self,
        model: &str,
        config: GenerationConfig,
    ) -> Result<Box<dyn Conversation>> {
        debug!(top_k = config.top_k, "top_k is not supported by the Responses API; ignoring");
        Ok(Box::new(self.conversation(model, config)))
    }
}

struct OpenAiConversation {
    client: async_openai::Client<OpenAIConfig>,
    has_key: bool,
    key_env: String,
    model: String,
    config: GenerationConfig,
    previous_response_id: Option<String>,
}

impl OpenAiConversation {
    /// Request for `text`, chained to the last successful response.
    fn request(&self, text: &str) -> Result<CreateResponse> {
        let mut args = CreateResponseArgs::default();
        args.model(self.model.as_str())
            .max_output_tokens(self.config.max_output_tokens)
            .temperature(self.config.temperature)
            .top_p(self.config.top_p)
            .store(true)
            .input(InputParam::Items(vec![InputItem::EasyMessage(
                EasyInputMessageArgs::default()
                    .role(Role::User)
                    .content(text)
                    .build()?,
            )]));
        if let Some(previous) = &self.previous_response_id {
            args.previous_response_id(previous.as_str());
        }
        Ok(args.build()?)
    }
}

#[async_trait]
impl Conversation for OpenAiConversation {
    async fn send(&mut self, text: &str) -> Result<String> {
        if !self.has_key {
            return Err(Error::MissingApiKey {
                env_var: self.key_env.clone(),
            });
        }

        let request = self.request(text)?;
        let response = self.client.responses().create(request).await?;

        let mut content = String::new();
        for output in response.output {
            if let OutputItem::Message(out) = output {
                for c in out.content {
                    match c {
                        OutputMessageContent::OutputText(text) => content.push_str(&text.text),
                        other => debug!(?other, "skipping non-text output"),
                    }
                }
            }
        }

        if content.trim().is_empty() {
            return Err(Error::generation("response contained no text"));
        }

        self.previous_response_id = Some(response.id);
        Ok(content)
    }
}
