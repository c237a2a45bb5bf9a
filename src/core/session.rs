use crate::core::generation::{ChatProvider, Conversation, GenerationConfig};
use crate::core::prompt::initial_prompt;
use crate::core::transcript::Transcript;
use crate::error::{Error, Result};
use derive_more::Display;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Role {
    #[display("You")]
    User,
    #[display("Assistant")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Seeded,
}

/// One conversation about one video.
///
/// The turn log is append-only between resets. Turns are never edited or
/// removed individually.
#[derive(Default)]
pub struct ChatSession {
    turns: Vec<Turn>,
    conversation: Option<Box<dyn Conversation>>,
    video_id: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.conversation.is_some() {
            SessionState::Seeded
        } else {
            SessionState::Empty
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.state() == SessionState::Seeded
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    /// Opens a new conversation and sends the structuring prompt.
    ///
    /// Any previous conversation is discarded first. On failure the session
    /// stays `Empty` with no turns.
    pub async fn start(
        &mut self,
        provider: &dyn ChatProvider,
        model: &str,
        config: GenerationConfig,
        transcript: &Transcript,
    ) -> Result<String> {
        self.reset();

        let prompt = initial_prompt(transcript);
        let mut conversation = provider.open_conversation(model, config).await?;
        let reply = conversation.send(&prompt).await.inspect_err(|e| {
            warn!(video_id = %transcript.video_id, error = %e, "initial prompt failed");
        })?;

        info!(
            video_id = %transcript.video_id,
            provider = provider.name(),
            model,
            "chat session seeded"
        );

        self.turns.push(Turn {
            role: Role::Assistant,
            text: reply.clone(),
        });
        self.conversation = Some(conversation);
        self.video_id = Some(transcript.video_id.clone());
        Ok(reply)
    }

    /// Sends a follow-up question on the existing conversation.
    ///
    /// The question is logged verbatim before sending and stays logged if the
    /// send fails.
    pub async fn ask(&mut self, message: &str) -> Result<String> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("Question cannot be empty".to_string()));
        }
        let conversation = self
            .conversation
            .as_mut()
            .ok_or(Error::SessionNotStarted)?;

        self.turns.push(Turn {
            role: Role::User,
            text: message.to_string(),
        });

        let reply = conversation.send(message).await.inspect_err(|e| {
            warn!(error = %e, "follow-up question failed");
        })?;

        self.turns.push(Turn {
            role: Role::Assistant,
            text: reply.clone(),
        });
        Ok(reply)
    }

    pub fn reset(&mut self) {
        self.turns.clear();
        self.conversation = None;
        self.video_id = None;
    }

    /// Whether the user turn at `index` never received an answer.
    pub fn is_unanswered(&self, index: usize) -> bool {
        matches!(self.turns.get(index), Some(t) if t.role == Role::User)
            && self
                .turns
                .get(index + 1)
                .is_none_or(|next| next.role != Role::Assistant)
    }
}
