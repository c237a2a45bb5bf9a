use crate::core::video::VideoReference;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use yt_transcript_rs::Transcript as YoutubeTrack;
use yt_transcript_rs::api::YouTubeTranscriptApi;

pub const DEFAULT_LANGUAGE: &str = "en";

/// One language's caption track as listed by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language: String,
    pub is_generated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionFragment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Concatenated caption text for the one language picked during resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub video_id: String,
    pub language_code: String,
    pub text: String,
}

impl Transcript {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Source of caption tracks for a video.
///
/// Listing and fetching are separate calls: a track that was listed can still
/// fail to fetch on its own.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    async fn fetch_track(&self, video_id: &str, track: &CaptionTrack)
    -> Result<Vec<CaptionFragment>>;
}

/// YouTube captions through `yt-transcript-rs`.
///
/// Listed track handles are kept per video so each attempt fetches exactly
/// the listed track, including a generated track that shares its language
/// code with a manual one.
pub struct YoutubeCaptions {
    api: YouTubeTranscriptApi,
    client: reqwest::Client,
    listed: Mutex<HashMap<String, Vec<YoutubeTrack>>>,
}

impl YoutubeCaptions {
    pub fn new() -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::custom(format!("Failed to create transcript client: {e}")))?;
        Ok(Self {
            api,
            client: reqwest::Client::new(),
            listed: Mutex::new(HashMap::new()),
        })
    }

    fn listed_handle(&self, video_id: &str, track: &CaptionTrack) -> Option<YoutubeTrack> {
        self.listed
            .lock()
            .ok()?
            .get(video_id)?
            .iter()
            .find(|t| {
                t.language_code() == track.language_code && t.is_generated() == track.is_generated
            })
            .cloned()
    }
}

#[async_trait]
impl CaptionProvider for YoutubeCaptions {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let list = self
            .api
            .list_transcripts(video_id)
            .await
            .map_err(|e| Error::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: e.to_string(),
            })?;

        let handles: Vec<YoutubeTrack> = list.transcripts().cloned().collect();
        let tracks = handles
            .iter()
            .map(|t| CaptionTrack {
                language_code: t.language_code().to_string(),
                language: t.language().to_string(),
                is_generated: t.is_generated(),
            })
            .collect();

        if let Ok(mut listed) = self.listed.lock() {
            listed.insert(video_id.to_string(), handles);
        }
        Ok(tracks)
    }

    async fn fetch_track(
        &self,
        video_id: &str,
        track: &CaptionTrack,
    ) -> Result<Vec<CaptionFragment>> {
        let handle = match self.listed_handle(video_id, track) {
            Some(handle) => handle,
            None => {
                self.list_tracks(video_id).await?;
                self.listed_handle(video_id, track).ok_or_else(|| {
                    Error::custom(format!("Caption track {} is no longer listed", track.language_code))
                })?
            }
        };

        let fetched = handle
            .fetch(&self.client, false)
            .await
            .map_err(|e| {
                Error::custom(format!(
                    "Failed to fetch {} transcript: {e}",
                    track.language_code
                ))
            })?;

        Ok(fetched
            .snippets
            .into_iter()
            .map(|snippet| CaptionFragment {
                text: snippet.text,
                start: snippet.start,
                duration: snippet.duration,
            })
            .collect())
    }
}

/// Turns a URL into the best available transcript.
#[derive(Clone)]
pub struct TranscriptResolver {
    provider: Arc<dyn CaptionProvider>,
    preferred_language: String,
}

impl TranscriptResolver {
    pub fn new(provider: Arc<dyn CaptionProvider>) -> Self {
        Self::with_language(provider, DEFAULT_LANGUAGE)
    }

    pub fn with_language(provider: Arc<dyn CaptionProvider>, language: &str) -> Self {
        Self {
            provider,
            preferred_language: language.to_string(),
        }
    }

    pub async fn resolve(&self, url: &str) -> Result<Transcript> {
        let video = VideoReference::parse(url)?;
        self.resolve_video(&video).await
    }

    pub async fn resolve_video(&self, video: &VideoReference) -> Result<Transcript> {
        let video_id = video.as_str();
        let tracks = self.provider.list_tracks(video_id).await?;
        if tracks.is_empty() {
            return Err(Error::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: "the video has no caption tracks".to_string(),
            });
        }

        debug!(video_id, tracks = tracks.len(), "listed caption tracks");

        // Every track in the preferred language, then the rest in listing order.
        let (preferred, others): (Vec<&CaptionTrack>, Vec<&CaptionTrack>) = tracks
            .iter()
            .partition(|t| t.language_code == self.preferred_language);

        let mut attempted = 0;
        for track in preferred.into_iter().chain(others) {
            attempted += 1;
            debug!(
                video_id,
                language = %track.language,
                generated = track.is_generated,
                "trying caption track"
            );
            match self.provider.fetch_track(video_id, track).await {
                Ok(fragments) => {
                    let text = normalize(&fragments);
                    let covered = fragments.last().map_or(0.0, |f| f.start + f.duration);
                    info!(
                        video_id,
                        language = %track.language_code,
                        fragments = fragments.len(),
                        covered_secs = covered,
                        "fetched transcript"
                    );
                    return Ok(Transcript {
                        video_id: video_id.to_string(),
                        language_code: track.language_code.clone(),
                        text,
                    });
                }
                Err(e) => {
                    warn!(
                        video_id,
                        language = %track.language_code,
                        error = %e,
                        "caption track fetch failed"
                    );
                }
            }
        }

        Err(Error::NoTranscriptFetchable {
            video_id: video_id.to_string(),
            attempted,
        })
    }
}

/// Joins fragment texts with single spaces and trims the result.
pub fn normalize(fragments: &[CaptionFragment]) -> String {
    fragments
        .iter()
        .map(|f| {
            let decoded = html_escape::decode_html_entities(&f.text);
            decoded.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fakes::FakeCaptions;
    use crate::error::ErrorKind;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn fragments(texts: &[&str]) -> Vec<CaptionFragment> {
        texts
            .iter()
            .map(|t| CaptionFragment {
                text: t.to_string(),
                start: 0.0,
                duration: 0.0,
            })
            .collect()
    }

    #[test]
    fn normalize_joins_with_single_spaces() {
        assert_eq!(normalize(&fragments(&["Hello", "world"])), "Hello world");
        assert_eq!(normalize(&fragments(&["  Hello ", "", "world  "])), "Hello world");
        assert_eq!(normalize(&fragments(&["line one\nline two"])), "line one line two");
        assert_eq!(normalize(&fragments(&[])), "");
    }

    #[test]
    fn normalize_decodes_entities() {
        assert_eq!(
            normalize(&fragments(&["it&#39;s", "rock &amp; roll"])),
            "it's rock & roll"
        );
    }

    #[tokio::test]
    async fn prefers_english_and_skips_other_tracks() {
        let provider = Arc::new(FakeCaptions::new(vec![
            ("de", Some(vec!["Hallo", "Welt"])),
            ("en", Some(vec!["Hello", "world"])),
            ("fr", Some(vec!["Bonjour"])),
        ]));
        let resolver = TranscriptResolver::new(provider.clone());

        let transcript = resolver.resolve(URL).await.expect("resolves");
        assert_eq!(transcript.language_code, "en");
        assert_eq!(transcript.text, "Hello world");
        assert_eq!(transcript.video_id, "dQw4w9WgXcQ");
        assert_eq!(provider.fetch_log(), vec!["en".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_first_working_track() {
        let provider = Arc::new(FakeCaptions::new(vec![
            ("ja", None),
            ("es", Some(vec!["Hola", "mundo"])),
            ("fr", Some(vec!["Bonjour"])),
        ]));
        let resolver = TranscriptResolver::new(provider.clone());

        let transcript = resolver.resolve(URL).await.expect("resolves");
        assert_eq!(transcript.language_code, "es");
        assert_eq!(transcript.text, "Hola mundo");
        assert_eq!(provider.fetch_log(), vec!["ja".to_string(), "es".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_when_english_fetch_fails() {
        let provider = Arc::new(FakeCaptions::new(vec![
            ("en", None),
            ("pt", Some(vec!["Olá"])),
        ]));
        let resolver = TranscriptResolver::new(provider.clone());

        let transcript = resolver.resolve(URL).await.expect("resolves");
        assert_eq!(transcript.language_code, "pt");
        assert_eq!(provider.fetch_log(), vec!["en".to_string(), "pt".to_string()]);
    }

    #[tokio::test]
    async fn tries_generated_track_sharing_the_preferred_code() {
        let provider = Arc::new(
            FakeCaptions::new(vec![("en", None), ("de", Some(vec!["Hallo"]))])
                .with_generated("en", Some(vec!["auto", "captions"])),
        );
        let resolver = TranscriptResolver::new(provider.clone());

        let transcript = resolver.resolve(URL).await.expect("resolves");
        assert_eq!(transcript.language_code, "en");
        assert_eq!(transcript.text, "auto captions");
        assert_eq!(
            provider.fetch_log(),
            vec!["en".to_string(), "en (generated)".to_string()]
        );
    }

    #[tokio::test]
    async fn counts_each_listed_track_once() {
        let provider = Arc::new(
            FakeCaptions::new(vec![("en", None), ("de", None)]).with_generated("en", None),
        );
        let resolver = TranscriptResolver::new(provider);

        let err = resolver.resolve(URL).await.expect_err("should fail");
        assert!(matches!(err, Error::NoTranscriptFetchable { attempted: 3, .. }));
    }

    #[tokio::test]
    async fn fails_when_every_track_fails() {
        let provider = Arc::new(FakeCaptions::new(vec![("en", None), ("de", None)]));
        let resolver = TranscriptResolver::new(provider);

        let err = resolver.resolve(URL).await.expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::NoTranscriptFetchable);
        assert!(matches!(err, Error::NoTranscriptFetchable { attempted: 2, .. }));
    }

    #[tokio::test]
    async fn reports_unavailable_when_listing_fails_or_is_empty() {
        let resolver = TranscriptResolver::new(Arc::new(FakeCaptions::failing_listing()));
        let err = resolver.resolve(URL).await.expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::TranscriptUnavailable);

        let resolver = TranscriptResolver::new(Arc::new(FakeCaptions::new(Vec::new())));
        let err = resolver.resolve(URL).await.expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::TranscriptUnavailable);
    }

    #[tokio::test]
    async fn rejects_invalid_url_before_listing() {
        let provider = Arc::new(FakeCaptions::new(vec![("en", Some(vec!["Hello"]))]));
        let resolver = TranscriptResolver::new(provider.clone());

        let err = resolver.resolve("https://example.com").await.expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
        assert!(provider.fetch_log().is_empty());
    }

    #[tokio::test]
    async fn honours_configured_language() {
        let provider = Arc::new(FakeCaptions::new(vec![
            ("en", Some(vec!["Hello"])),
            ("es", Some(vec!["Hola"])),
        ]));
        let resolver = TranscriptResolver::with_language(provider, "es");

        let transcript = resolver.resolve(URL).await.expect("resolves");
        assert_eq!(transcript.language_code, "es");
        assert_eq!(transcript.word_count(), 1);
    }
}
