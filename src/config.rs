//! Configuration management
//!
//! Runtime configuration loaded from a JSON file. Every field has a
//! default, so a partial file only overrides what it names. An invalid
//! frequency list or ear order is rejected at startup.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{HearingError, Result};
use crate::session::scorer::MAX_VOLUME;
use crate::session::Ear;

/// Frequencies tested when no configuration overrides them.
pub const DEFAULT_FREQUENCIES: [u32; 11] = [
    2000, 4000, 6000, 8000, 10000, 12000, 14000, 16000, 18000, 20000, 22000,
];

/// Directory name used under the platform data directory.
const APP_DIR_NAME: &str = "hearing-test";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub test: TestConfig,
    pub calibration: CalibrationConfig,
    pub storage: StorageConfig,
}

/// Trial layout for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Tested frequencies in Hz, in presentation order
    pub frequencies: Vec<u32>,
    /// Ear order; determines which ear is tested first
    pub ears: Vec<Ear>,
    /// Raise the tone gain automatically while waiting for a response
    pub auto_ramp: bool,
    /// Volume points added per ramp step
    pub ramp_step: u8,
    /// Milliseconds between ramp steps
    pub ramp_interval_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            frequencies: DEFAULT_FREQUENCIES.to_vec(),
            ears: vec![Ear::Right, Ear::Left],
            auto_ramp: false,
            ramp_step: 10,
            ramp_interval_ms: 1000,
        }
    }
}

/// Reference tone used to set the system volume before testing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Reference pitch in Hz
    pub frequency_hz: f32,
    /// Linear gain at level 100
    pub gain_scale: f32,
    /// Auto-stop delay in milliseconds
    pub duration_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1000.0,
            gain_scale: 0.3,
            duration_ms: 2000,
        }
    }
}

/// Where history and preferences are kept
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the data directory.
    ///
    /// - Linux: `~/.local/share/hearing-test`
    /// - macOS: `~/Library/Application Support/hearing-test`
    /// - Windows: `C:\Users\<user>\AppData\Local\hearing-test`
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a JSON file.
    ///
    /// Unlike a missing optional setting, an unreadable or malformed file
    /// is a startup error: running a test with a half-parsed frequency
    /// list would produce results that cannot be compared.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| HearingError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: AppConfig =
            serde_json::from_str(&contents).map_err(|e| HearingError::Config {
                reason: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;

        info!("[Config] Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if given, otherwise use validated defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Check the invariants the sequencer and calibration rely on.
    pub fn validate(&self) -> Result<()> {
        self.test.validate()?;

        let cal = &self.calibration;
        if !(cal.frequency_hz.is_finite() && cal.frequency_hz > 0.0) {
            return Err(HearingError::Config {
                reason: format!("calibration frequency must be positive, got {}", cal.frequency_hz),
            });
        }
        if !(0.0..=1.0).contains(&cal.gain_scale) {
            return Err(HearingError::Config {
                reason: format!("calibration gain scale must be within 0-1, got {}", cal.gain_scale),
            });
        }
        if cal.duration_ms == 0 {
            return Err(HearingError::Config {
                reason: "calibration duration must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

impl TestConfig {
    /// Validate the frequency set and ear set.
    pub fn validate(&self) -> Result<()> {
        validate_frequencies(&self.frequencies)?;
        validate_ears(&self.ears)?;

        if self.auto_ramp && (self.ramp_step == 0 || self.ramp_interval_ms == 0) {
            return Err(HearingError::Config {
                reason: "auto ramp needs a non-zero step and interval".to_string(),
            });
        }
        if self.ramp_step > MAX_VOLUME {
            return Err(HearingError::Config {
                reason: format!(
                    "ramp step must be at most {}, got {}",
                    MAX_VOLUME, self.ramp_step
                ),
            });
        }

        Ok(())
    }
}

/// A frequency set must be non-empty, positive and free of duplicates.
pub fn validate_frequencies(frequencies: &[u32]) -> Result<()> {
    if frequencies.is_empty() {
        return Err(HearingError::Config {
            reason: "frequency set is empty".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for &hz in frequencies {
        if hz == 0 {
            return Err(HearingError::Config {
                reason: "frequencies must be positive".to_string(),
            });
        }
        if !seen.insert(hz) {
            return Err(HearingError::Config {
                reason: format!("duplicate frequency {} Hz", hz),
            });
        }
    }

    Ok(())
}

/// An ear set must contain each ear exactly once.
pub fn validate_ears(ears: &[Ear]) -> Result<()> {
    let valid = ears.len() == 2 && ears.contains(&Ear::Right) && ears.contains(&Ear::Left);
    if !valid {
        return Err(HearingError::Config {
            reason: format!("ear set must be [right, left] in some order, got {:?}", ears),
        });
    }
    Ok(())
}
