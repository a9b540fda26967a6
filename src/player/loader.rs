use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{StatusCode, Url};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::player::error::MediaError;
use crate::player::output::Clip;
use crate::player::resolver::absolute_url;

/// Upper bound on a fetched sound, matching the upload limit.
pub const MAX_CLIP_BYTES: usize = crate::storage::MAX_SOUND_SIZE;

/// Fetches a sound and decides whether it can play.
///
/// A successful `load` means the clip is ready to start; any error sends the
/// player to the next tier. The player bounds each call with its attempt
/// timeout and drops the future on cancellation.
pub trait MediaLoader: Send + Sync + 'static {
    fn load(&self, url: &str) -> impl Future<Output = Result<Clip, MediaError>> + Send;
}

impl<T: MediaLoader> MediaLoader for Arc<T> {
    fn load(&self, url: &str) -> impl Future<Output = Result<Clip, MediaError>> + Send {
        (**self).load(url)
    }
}

/// Loads sounds over HTTP and checks that the first packet decodes.
#[derive(Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
    base_url: Option<Url>,
    max_bytes: usize,
}

impl HttpLoader {
    /// `base_url` is used to resolve internal `/api/sounds?id=N` references.
    pub fn new(base_url: Option<Url>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("o2paris-player/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: Option<Url>) -> Self {
        Self {
            client,
            base_url,
            max_bytes: MAX_CLIP_BYTES,
        }
    }

    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    async fn fetch(&self, url: &str) -> Result<Clip, MediaError> {
        let target = absolute_url(self.base_url.as_ref(), url)?;
        let origin = target.to_string();

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| MediaError::NetworkUnavailable {
                url: origin.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(MediaError::NotFound { url: origin });
        }
        if !status.is_success() {
            return Err(MediaError::HttpStatus {
                url: origin,
                status: status.as_u16(),
            });
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(MediaError::TooLarge {
                url: origin,
                limit: self.max_bytes,
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::NetworkUnavailable {
                url: origin.clone(),
                reason: e.to_string(),
            })?;
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(MediaError::TooLarge {
                    url: origin,
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        let hint = mime_type.clone();
        let (bytes, duration) =
            tokio::task::spawn_blocking(move || probe_audio(bytes, hint.as_deref()))
                .await
                .map_err(|e| MediaError::Decode {
                    url: origin.clone(),
                    reason: e.to_string(),
                })?
                .map_err(|reason| MediaError::Decode {
                    url: origin.clone(),
                    reason,
                })?;

        Ok(Clip {
            origin,
            mime_type,
            bytes,
            duration,
            local_path: None,
        })
    }
}

impl MediaLoader for HttpLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<Clip, MediaError>> + Send {
        self.fetch(url)
    }
}

/// Probe the container and decode the first packet of its default track.
/// Hands the bytes back along with the track duration, when known.
pub fn probe_audio(
    bytes: Vec<u8>,
    mime_type: Option<&str>,
) -> Result<(Vec<u8>, Option<Duration>), String> {
    if bytes.is_empty() {
        return Err("empty response".to_string());
    }

    let mut hint = Hint::new();
    if let Some(mime) = mime_type {
        hint.mime_type(mime);
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.clone())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("unrecognised format: {e}"))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| "no audio track found".to_string())?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let duration = match (codec_params.n_frames, codec_params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => {
            Some(Duration::from_secs_f64(frames as f64 / f64::from(rate)))
        }
        _ => None,
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| format!("unsupported codec: {e}"))?;

    loop {
        let packet = format
            .next_packet()
            .map_err(|e| format!("no decodable packet: {e}"))?;
        if packet.track_id() != track_id {
            continue;
        }
        decoder
            .decode(&packet)
            .map_err(|e| format!("decode failed: {e}"))?;
        break;
    }

    Ok((bytes, duration))
}
