//! WAV rendering of generated tones
//!
//! Writes what a `SineToneGenerator` would play to a 32-bit float stereo
//! WAV file, so a reference tone can be played back by any media player.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::tone::SineToneGenerator;
use crate::error::{HearingError, Result};

/// Longest tone we are willing to render, in seconds
const MAX_RENDER_SECS: f32 = 60.0;

/// Render `duration_secs` of the generator's output to `path`.
///
/// Returns the number of frames written.
///
/// # Errors
/// * `Audio` - non-positive or overlong duration, or a hound encoding failure
/// * `FileWriteError` - the file could not be created
pub fn render_to_wav(
    generator: &mut SineToneGenerator,
    duration_secs: f32,
    path: &Path,
) -> Result<usize> {
    if !(duration_secs > 0.0 && duration_secs <= MAX_RENDER_SECS) {
        return Err(HearingError::Audio {
            reason: format!(
                "render duration must be within 0-{}s, got {}",
                MAX_RENDER_SECS, duration_secs
            ),
        });
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate: generator.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| match e {
        hound::Error::IoError(source) => HearingError::FileWriteError {
            path: path.to_path_buf(),
            source,
        },
        other => HearingError::Audio {
            reason: other.to_string(),
        },
    })?;

    let frames = (duration_secs * generator.sample_rate() as f32) as usize;
    for [left, right] in generator.render(frames) {
        writer
            .write_sample(left)
            .and_then(|_| writer.write_sample(right))
            .map_err(|e| HearingError::Audio {
                reason: e.to_string(),
            })?;
    }

    writer.finalize().map_err(|e| HearingError::Audio {
        reason: e.to_string(),
    })?;

    Ok(frames)
}
