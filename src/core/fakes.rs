//! Scripted providers shared by unit tests.

use crate::core::generation::{ChatProvider, Conversation, GenerationConfig};
use crate::core::transcript::{CaptionFragment, CaptionProvider, CaptionTrack};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct FakeTrack {
    code: String,
    generated: bool,
    texts: Option<Vec<String>>,
}

/// Caption tracks in listing order; a `None` text makes that track's fetch fail.
pub struct FakeCaptions {
    tracks: Vec<FakeTrack>,
    listing_fails: bool,
    fetched: Mutex<Vec<String>>,
}

impl FakeCaptions {
    pub fn new(tracks: Vec<(&str, Option<Vec<&str>>)>) -> Self {
        Self {
            tracks: tracks
                .into_iter()
                .map(|(code, texts)| FakeTrack {
                    code: code.to_string(),
                    generated: false,
                    texts: texts.map(|t| t.into_iter().map(String::from).collect()),
                })
                .collect(),
            listing_fails: false,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_listing() -> Self {
        Self {
            listing_fails: true,
            ..Self::new(Vec::new())
        }
    }

    /// Appends an auto-generated track.
    pub fn with_generated(mut self, code: &str, texts: Option<Vec<&str>>) -> Self {
        self.tracks.push(FakeTrack {
            code: code.to_string(),
            generated: true,
            texts: texts.map(|t| t.into_iter().map(String::from).collect()),
        });
        self
    }

    /// Language codes in the order their fetch was attempted; generated
    /// tracks are suffixed with ` (generated)`.
    pub fn fetch_log(&self) -> Vec<String> {
        self.fetched.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CaptionProvider for FakeCaptions {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        if self.listing_fails {
            return Err(Error::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: "captions disabled".to_string(),
            });
        }
        Ok(self
            .tracks
            .iter()
            .map(|t| CaptionTrack {
                language_code: t.code.clone(),
                language: t.code.to_uppercase(),
                is_generated: t.generated,
            })
            .collect())
    }

    async fn fetch_track(
        &self,
        _video_id: &str,
        track: &CaptionTrack,
    ) -> Result<Vec<CaptionFragment>> {
        let entry = if track.is_generated {
            format!("{} (generated)", track.language_code)
        } else {
            track.language_code.clone()
        };
        self.fetched.lock().expect("lock").push(entry);

        let texts = self
            .tracks
            .iter()
            .find(|t| t.code == track.language_code && t.generated == track.is_generated)
            .and_then(|t| t.texts.clone());

        match texts {
            Some(texts) => Ok(texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| CaptionFragment {
                    text,
                    start: i as f64,
                    duration: 1.0,
                })
                .collect()),
            None => Err(Error::custom("fetch failed")),
        }
    }
}

type Replies = Arc<Mutex<VecDeque<std::result::Result<String, String>>>>;

/// Chat backend whose replies are scripted per send; `Err` entries fail.
pub struct ScriptedProvider {
    replies: Replies,
    sent: Arc<Mutex<Vec<String>>>,
    opened: Arc<Mutex<usize>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(String::from).map_err(String::from))
                    .collect(),
            )),
            sent: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(Mutex::new(0)),
        }
    }

    /// Every message sent on any conversation, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("lock").clone()
    }

    pub fn opened(&self) -> usize {
        *self.opened.lock().expect("lock")
    }
}

struct ScriptedConversation {
    replies: Replies,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn open_conversation(
        &self,
        _model: &str,
        _config: GenerationConfig,
    ) -> Result<Box<dyn Conversation>> {
        *self.opened.lock().expect("lock") += 1;
        Ok(Box::new(ScriptedConversation {
            replies: self.replies.clone(),
            sent: self.sent.clone(),
        }))
    }
}

#[async_trait]
impl Conversation for ScriptedConversation {
    async fn send(&mut self, text: &str) -> Result<String> {
        self.sent.lock().expect("lock").push(text.to_string());
        let next = self.replies.lock().expect("lock").pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(Error::generation(reason)),
            None => Err(Error::generation("no scripted reply")),
        }
    }
}

/// Chat backend whose conversations panic on send.
pub struct PanickingProvider;

struct PanickingConversation;

#[async_trait]
impl ChatProvider for PanickingProvider {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn open_conversation(
        &self,
        _model: &str,
        _config: GenerationConfig,
    ) -> Result<Box<dyn Conversation>> {
        Ok(Box::new(PanickingConversation))
    }
}

#[async_trait]
impl Conversation for PanickingConversation {
    async fn send(&mut self, _text: &str) -> Result<String> {
        panic!("backend crashed")
    }
}
