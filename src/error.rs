use derive_more::{Display, From};

pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification used by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUrl,
    TranscriptUnavailable,
    NoTranscriptFetchable,
    Generation,
    InvalidInput,
    SessionNotStarted,
    Config,
    Internal,
}

#[derive(Debug, Display, From, derive_more::Error)]
pub enum Error {
    #[display("Could not find a YouTube video ID in '{_0}'")]
    InvalidUrl(#[error(not(source))] String),

    #[display("No transcript available for video {video_id}: {reason}")]
    TranscriptUnavailable { video_id: String, reason: String },

    #[display("None of the {attempted} caption tracks for video {video_id} could be fetched")]
    NoTranscriptFetchable { video_id: String, attempted: usize },

    #[display("Generation failed: {_0}")]
    Generation(#[error(not(source))] String),

    #[display("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[display("{_0}")]
    InvalidInput(#[error(not(source))] String),

    #[display("No active chat session; analyze a video first")]
    SessionNotStarted,

    #[display("Configuration error: {_0}")]
    Config(#[error(not(source))] String),

    #[display("{_0}")]
    Custom(#[error(not(source))] String),

    #[display("IO error: {_0}")]
    #[from]
    Io(std::io::Error),

    #[display("HTTP error: {_0}")]
    #[from]
    Http(reqwest::Error),

    #[display("TOML parse error: {_0}")]
    #[from]
    TomlParse(toml::de::Error),

    #[display("OpenAI API error: {_0}")]
    #[from]
    OpenAI(async_openai::error::OpenAIError),
}

impl Error {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::TranscriptUnavailable { .. } => ErrorKind::TranscriptUnavailable,
            Self::NoTranscriptFetchable { .. } => ErrorKind::NoTranscriptFetchable,
            Self::Generation(_)
            | Self::MissingApiKey { .. }
            | Self::Http(_)
            | Self::OpenAI(_) => ErrorKind::Generation,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::SessionNotStarted => ErrorKind::SessionNotStarted,
            Self::Config(_) | Self::TomlParse(_) => ErrorKind::Config,
            Self::Custom(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Whether re-submitting the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Generation | ErrorKind::Internal)
    }

    /// Message shown to the user in place of the raw error.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InvalidUrl => format!("{self}. Paste a watch, youtu.be or embed link."),
            ErrorKind::TranscriptUnavailable | ErrorKind::NoTranscriptFetchable => {
                format!("{self}. Try a different video.")
            }
            _ if self.is_retryable() => format!("{self}. Press Enter to try again."),
            _ => self.to_string(),
        }
    }
}
