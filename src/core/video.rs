use crate::error::{Error, Result};
use derive_more::Display;
use regex::Regex;
use std::sync::LazyLock;

// Tried in order; the first pattern that captures an ID wins.
static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/watch\?(?:[^#]*&)?v=([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"youtu\.be/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"/embed/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"/shorts/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"/live/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"/v/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"^([A-Za-z0-9_-]{11})$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("video ID pattern is valid"))
    .collect()
});

/// A validated YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct VideoReference(String);

impl VideoReference {
    /// Parses a watch, youtu.be, embed, shorts, live or bare-ID input.
    pub fn parse(url: &str) -> Result<Self> {
        extract_video_id(url)
            .map(Self)
            .ok_or_else(|| Error::InvalidUrl(url.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

pub fn extract_video_id(url: &str) -> Option<String> {
    let trimmed = url.trim();
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
