use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling parameters applied to every request of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    /// Nucleus-sampling threshold.
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.5,
            top_k: 16,
            max_output_tokens: 20_000,
        }
    }
}

/// A hosted chat model that can open stateful conversations.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn open_conversation(
        &self,
        model: &str,
        config: GenerationConfig,
    ) -> Result<Box<dyn Conversation>>;
}

/// Handle to one ongoing conversation.
///
/// The handle keeps whatever history the backend needs; callers only pass
/// the newest message. A failed `send` leaves the history as it was.
#[async_trait]
pub trait Conversation: Send {
    async fn send(&mut self, text: &str) -> Result<String>;
}
