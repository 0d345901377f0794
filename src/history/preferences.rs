//! Persisted calibration preferences.
//!
//! The audio level chosen during setup is remembered between sessions
//! and recorded with each result.

use log::warn;

use crate::audio::calibration::DEFAULT_LEVEL;
use crate::error::{HearingError, Result};
use crate::history::storage::StorageBackend;
use crate::session::scorer::MAX_VOLUME;

/// Storage key holding the audio level
pub const AUDIO_LEVEL_KEY: &str = "hearing-audio-level";

/// Load the remembered audio level, falling back to the default when it
/// is absent or unreadable.
pub fn load_audio_level<B: StorageBackend>(backend: &B) -> u8 {
    match backend.read(AUDIO_LEVEL_KEY) {
        Ok(Some(raw)) => match raw.trim().parse::<u8>() {
            Ok(level) if level <= MAX_VOLUME => level,
            _ => {
                warn!("Ignoring stored audio level {:?}", raw);
                DEFAULT_LEVEL
            }
        },
        Ok(None) => DEFAULT_LEVEL,
        Err(e) => {
            warn!("Could not read audio level: {}", e);
            DEFAULT_LEVEL
        }
    }
}

/// Remember `level` for the next session.
///
/// # Errors
/// * `InvalidVolume` - above 100
pub fn save_audio_level<B: StorageBackend>(backend: &mut B, level: u8) -> Result<()> {
    if level > MAX_VOLUME {
        return Err(HearingError::InvalidVolume {
            value: i64::from(level),
        });
    }
    backend.write(AUDIO_LEVEL_KEY, &level.to_string())
}
