#[cfg(test)]
pub mod fakes;
pub mod gemini;
pub mod generation;
pub mod openai;
pub mod prompt;
pub mod session;
pub mod transcript;
pub mod video;

pub use generation::*;
pub use session::*;
pub use transcript::*;
pub use video::*;

use crate::config::{ModelSettings, ProviderKind, Settings};
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Everything an analyze/ask action needs besides the session itself.
#[derive(Clone)]
pub struct Services {
    pub resolver: TranscriptResolver,
    pub provider: Arc<dyn ChatProvider>,
    pub model: String,
    pub generation: GenerationConfig,
}

impl Services {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let captions = Arc::new(YoutubeCaptions::new()?);
        Ok(Self {
            resolver: TranscriptResolver::with_language(
                captions,
                &settings.transcript.preferred_language,
            ),
            provider: chat_provider(&settings.model)?,
            model: settings.model.model_name().to_string(),
            generation: settings.generation,
        })
    }

    /// Seeds `session` with the outline prompt for `transcript`.
    pub async fn start_session(
        &self,
        session: &mut ChatSession,
        transcript: &Transcript,
    ) -> Result<String> {
        session
            .start(self.provider.as_ref(), &self.model, self.generation, transcript)
            .await
    }
}

/// Builds the chat backend named by the settings.
pub fn chat_provider(settings: &ModelSettings) -> Result<Arc<dyn ChatProvider>> {
    let api_key = settings.api_key();
    if api_key.is_none() {
        debug!(env_var = settings.key_env(), "API key not set; remote calls will fail");
    }

    Ok(match settings.provider {
        ProviderKind::Gemini => {
            let mut provider =
                gemini::GeminiProvider::new(api_key, settings.key_env(), settings.timeout())?;
            if let Some(base) = &settings.api_base {
                provider = provider.with_api_base(base);
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAi => Arc::new(openai::OpenAiProvider::new(
            api_key,
            settings.key_env(),
            settings.api_base.as_deref(),
            settings.timeout(),
        )?),
    })
}
