//! Local tone synthesis, the last rung of the fallback ladder.

use std::f32::consts::TAU;
use std::io::Cursor;
use std::time::Duration;

use crate::player::error::MediaError;
use crate::player::output::Clip;

pub const BEEP_ORIGIN: &str = "beep";

#[derive(Debug, Clone, PartialEq)]
pub struct BeepConfig {
    pub frequency_hz: f32,
    pub duration: Duration,
    pub sample_rate: u32,
    /// Peak amplitude in `0.0..=1.0`.
    pub amplitude: f32,
    /// Linear fade at both ends to avoid clicks.
    pub fade: Duration,
}

impl Default for BeepConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            duration: Duration::from_millis(300),
            sample_rate: 44_100,
            amplitude: 0.3,
            fade: Duration::from_millis(10),
        }
    }
}

/// Render a sine tone as a 16-bit mono WAV clip.
pub fn synthesize(config: &BeepConfig) -> Result<Clip, MediaError> {
    if config.sample_rate == 0 || config.duration.is_zero() {
        return Err(MediaError::Synthesis(
            "sample rate and duration must be non-zero".to_string(),
        ));
    }
    if !(config.frequency_hz > 0.0 && config.frequency_hz < config.sample_rate as f32 / 2.0) {
        return Err(MediaError::Synthesis(format!(
            "{} Hz is not representable at {} Hz",
            config.frequency_hz, config.sample_rate
        )));
    }

    let rate = config.sample_rate as f32;
    let total = (config.duration.as_secs_f32() * rate).round() as usize;
    let fade = ((config.fade.as_secs_f32() * rate) as usize).min(total / 2);
    let amplitude = config.amplitude.clamp(0.0, 1.0) * f32::from(i16::MAX);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + total * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| MediaError::Synthesis(e.to_string()))?;
        for n in 0..total {
            let envelope = if fade == 0 {
                1.0
            } else if n < fade {
                n as f32 / fade as f32
            } else if n >= total - fade {
                (total - n) as f32 / fade as f32
            } else {
                1.0
            };
            let sample = (TAU * config.frequency_hz * n as f32 / rate).sin() * amplitude * envelope;
            writer
                .write_sample(sample as i16)
                .map_err(|e| MediaError::Synthesis(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| MediaError::Synthesis(e.to_string()))?;
    }

    Ok(Clip {
        origin: BEEP_ORIGIN.to_string(),
        mime_type: Some("audio/wav".to_string()),
        bytes: cursor.into_inner(),
        duration: Some(config.duration),
        local_path: None,
    })
}
