//! Trial Sequencer
//!
//! Produces the ordered stream of (frequency, ear) trials for a run.
//! Trials are laid out row-major by ear: every frequency for the first
//! ear, then every frequency for the second. The sequencer holds no
//! progress state of its own; the position in a run is the number of
//! results submitted so far.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{validate_ears, validate_frequencies, TestConfig};
use crate::error::{HearingError, Result};

/// The ear a tone is presented to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ear {
    Right,
    Left,
}

impl fmt::Display for Ear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ear::Right => write!(f, "right"),
            Ear::Left => write!(f, "left"),
        }
    }
}

/// One (frequency, ear) presentation awaiting a volume response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    /// Tone frequency in Hz
    pub frequency: u32,
    /// Ear the tone is played to
    pub ear: Ear,
    /// Position in the flattened trial sequence
    pub index: usize,
}

/// Map a submitted-result count onto `(frequency_index, ear_index)`.
///
/// Returns `None` once every trial has been submitted. This is the only
/// place the row-major layout is spelled out; the scorer uses
/// [`result_index`] to read it back.
///
/// # Example
/// ```
/// use hearing_test::session::trial_at;
/// assert_eq!(trial_at(0, 3, 2), Some((0, 0)));
/// assert_eq!(trial_at(4, 3, 2), Some((1, 1)));
/// assert_eq!(trial_at(6, 3, 2), None);
/// ```
pub fn trial_at(n: usize, frequency_count: usize, ear_count: usize) -> Option<(usize, usize)> {
    if frequency_count == 0 || n >= frequency_count * ear_count {
        return None;
    }
    Some((n % frequency_count, n / frequency_count))
}

/// Position in the results sequence of the trial for a given frequency and ear.
///
/// Inverse of [`trial_at`].
pub fn result_index(frequency_index: usize, ear_index: usize, frequency_count: usize) -> usize {
    ear_index * frequency_count + frequency_index
}

/// Orders the trials of a run over a fixed frequency set and ear set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSequencer {
    frequencies: Vec<u32>,
    ears: Vec<Ear>,
}

impl TrialSequencer {
    /// Create a sequencer, failing fast on an invalid layout.
    ///
    /// # Errors
    /// * `Config` - empty or duplicate frequencies, or an ear set that is
    ///   not exactly one right and one left ear
    pub fn new(frequencies: Vec<u32>, ears: Vec<Ear>) -> Result<Self> {
        validate_frequencies(&frequencies)?;
        validate_ears(&ears)?;
        Ok(Self { frequencies, ears })
    }

    /// Create a sequencer from the `test` configuration section.
    pub fn from_config(config: &TestConfig) -> Result<Self> {
        Self::new(config.frequencies.clone(), config.ears.clone())
    }

    /// Tested frequencies, in presentation order.
    pub fn frequencies(&self) -> &[u32] {
        &self.frequencies
    }

    /// Ear order.
    pub fn ears(&self) -> &[Ear] {
        &self.ears
    }

    /// Number of trials in a full run.
    pub fn total_trials(&self) -> usize {
        self.frequencies.len() * self.ears.len()
    }

    /// Whether `submitted` results complete the run.
    pub fn is_complete(&self, submitted: usize) -> bool {
        submitted >= self.total_trials()
    }

    /// The trial awaiting a response after `submitted` results.
    ///
    /// # Errors
    /// * `SequenceComplete` - every trial already has a result
    pub fn current_trial(&self, submitted: usize) -> Result<Trial> {
        let (freq_idx, ear_idx) =
            trial_at(submitted, self.frequencies.len(), self.ears.len())
                .ok_or(HearingError::SequenceComplete)?;

        Ok(Trial {
            frequency: self.frequencies[freq_idx],
            ear: self.ears[ear_idx],
            index: submitted,
        })
    }

    /// Percentage of the run completed after `submitted` results.
    pub fn progress_percent(&self, submitted: usize) -> f64 {
        let total = self.total_trials();
        let done = submitted.min(total);
        100.0 * done as f64 / total as f64
    }

    /// All trials of a run in presentation order.
    pub fn trials(&self) -> impl Iterator<Item = Trial> + '_ {
        (0..self.total_trials()).filter_map(move |n| self.current_trial(n).ok())
    }
}

impl Default for TrialSequencer {
    fn default() -> Self {
        let config = TestConfig::default();
        Self {
            frequencies: config.frequencies,
            ears: config.ears,
        }
    }
}
