use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::player::error::MediaError;

/// Audio that passed the "can play" check and is ready to hand to an output.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    /// Where the audio came from: a URL, or `beep` for a synthesized tone.
    pub origin: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub duration: Option<Duration>,
    /// Set once an output has staged the clip on disk.
    pub local_path: Option<PathBuf>,
}

impl Clip {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_deref() {
            Some("audio/mpeg") => "mp3",
            Some("audio/ogg") => "ogg",
            Some("audio/wav") | Some("audio/x-wav") => "wav",
            Some("audio/mp4") => "m4a",
            Some("audio/aac") => "aac",
            Some("audio/flac") => "flac",
            _ => "bin",
        }
    }
}

/// Where started clips go.
///
/// `start` is synchronous: the player calls it while holding its state lock so
/// that starting a clip and committing the `Playing` state happen atomically.
/// Implementations must hand the clip off quickly and never block on playback.
/// Slow work such as file I/O goes in `prepare`, which runs before the lock is
/// taken.
pub trait AudioOutput: Send + Sync + 'static {
    fn prepare(&self, clip: Clip) -> impl Future<Output = Result<Clip, MediaError>> + Send {
        std::future::ready(Ok(clip))
    }

    fn start(&self, clip: &Clip) -> Result<(), MediaError>;

    /// Stop whatever is currently playing. Idempotent.
    fn stop(&self);
}

impl<T: AudioOutput> AudioOutput for Arc<T> {
    fn prepare(&self, clip: Clip) -> impl Future<Output = Result<Clip, MediaError>> + Send {
        (**self).prepare(clip)
    }

    fn start(&self, clip: &Clip) -> Result<(), MediaError> {
        (**self).start(clip)
    }

    fn stop(&self) {
        (**self).stop()
    }
}

/// Writes each started clip into a directory, for headless hosts.
pub struct FileOutput {
    dir: PathBuf,
    now_playing: Mutex<Option<PathBuf>>,
}

impl FileOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            now_playing: Mutex::new(None),
        }
    }

    /// Timestamped, with a random suffix so clips started within the same
    /// millisecond never share a file.
    fn clip_path(&self, clip: &Clip) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let suffix: u32 = rand::random();
        self.dir
            .join(format!("{stamp}-{suffix:08x}.{}", clip.extension()))
    }

    pub fn now_playing(&self) -> Option<PathBuf> {
        self.now_playing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AudioOutput for FileOutput {
    async fn prepare(&self, mut clip: Clip) -> Result<Clip, MediaError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| unavailable(&self.dir, e))?;

        let path = self.clip_path(&clip);
        tokio::fs::write(&path, &clip.bytes)
            .await
            .map_err(|e| unavailable(&path, e))?;
        clip.local_path = Some(path);
        Ok(clip)
    }

    fn start(&self, clip: &Clip) -> Result<(), MediaError> {
        let path = match &clip.local_path {
            Some(path) => path.clone(),
            None => {
                std::fs::create_dir_all(&self.dir).map_err(|e| unavailable(&self.dir, e))?;
                let path = self.clip_path(clip);
                std::fs::write(&path, &clip.bytes).map_err(|e| unavailable(&path, e))?;
                path
            }
        };

        tracing::info!(origin = %clip.origin, path = %path.display(), "clip started");
        *self
            .now_playing
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(path);
        Ok(())
    }

    fn stop(&self) {
        if let Some(path) = self
            .now_playing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            tracing::debug!(path = %path.display(), "clip stopped");
        }
    }
}

fn unavailable(path: &Path, e: std::io::Error) -> MediaError {
    MediaError::OutputUnavailable(format!("{}: {e}", path.display()))
}

/// Discards audio. Useful for probing reachability only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn start(&self, clip: &Clip) -> Result<(), MediaError> {
        tracing::debug!(origin = %clip.origin, bytes = clip.bytes.len(), "clip discarded");
        Ok(())
    }

    fn stop(&self) {}
}
