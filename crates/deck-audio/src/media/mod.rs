//! Media transport boundary.
//!
//! A `MediaElement` owns fetching, decoding and output of one stream at a
//! time. Re-pointing it at another URL swaps the source; the processor slot
//! and anything attached to it survive.

mod ffmpeg;

pub use ffmpeg::FfmpegElement;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::context::AudioProcessor;
use crate::error::{GraphError, PlayRejection};

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    /// Buffering: no audio available yet or the stream stalled.
    Waiting,
    /// Audio is flowing.
    Playing,
    /// The stream died after it had started.
    Error(String),
    /// The source finished cleanly (end of a local file, server hang-up).
    Ended,
}

/// Element event tagged with the source generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub generation: u64,
    pub kind: MediaEventKind,
}

#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Point the element at `url`. Any pending `play()` for the previous
    /// source resolves with `PlayRejection::Aborted`.
    fn set_source(&self, url: &str, generation: u64);

    /// Drop buffered data and stop fetching; the next `play()` starts fresh.
    fn load(&self);

    /// Start playback of the source loaded under `generation`. Resolves once
    /// audio is decodable, or with `PlayRejection::Aborted` when the source
    /// moved on or `pause()` ran after this request was issued.
    async fn play(&self, generation: u64) -> Result<(), PlayRejection>;

    /// Stop output and cancel pending `play()` requests. Only a new
    /// `set_source` re-arms the element.
    fn pause(&self);

    /// 0.0 ..= 1.0
    fn set_volume(&self, volume: f32);

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> usize;

    /// Insert a processor into the output path. Only one per element.
    fn attach_processor(&self, processor: Box<dyn AudioProcessor>) -> Result<(), GraphError>;
}

/// Session-local handles for local files, in the form `blob:deckradio/<n>`.
/// Handles die with the registry; they are never persisted.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    next: AtomicU64,
    entries: Mutex<HashMap<String, PathBuf>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: &Path) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("blob:deckradio/{n}");
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(url.clone(), path.to_path_buf());
        url
    }

    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(url)
            .cloned()
    }
}
