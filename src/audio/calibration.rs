//! Audio Calibration Helper
//!
//! Plays the fixed reference tone used to set the system volume before a
//! test. The tone stops on its own after a bounded duration, can be
//! stopped by hand at any time, and is always stopped when the helper is
//! dropped so no oscillator outlives the setup screen.

use std::time::{Duration, Instant};

use log::debug;

use crate::audio::timer::Timer;
use crate::audio::tone::{Channel, ToneGenerator};
use crate::config::CalibrationConfig;
use crate::session::scorer::MAX_VOLUME;

/// Level used before the subject has chosen one
pub const DEFAULT_LEVEL: u8 = 50;

/// Reference tone player for the setup flow
pub struct CalibrationTone<G: ToneGenerator> {
    generator: G,
    config: CalibrationConfig,
    level: u8,
    auto_stop: Timer,
}

impl<G: ToneGenerator> CalibrationTone<G> {
    /// Create a stopped calibration tone at `level` (clamped to 0-100).
    pub fn new(generator: G, config: CalibrationConfig, level: u8) -> Self {
        Self {
            generator,
            config,
            level: level.min(MAX_VOLUME),
            auto_stop: Timer::idle(),
        }
    }

    /// Linear gain for a level: `level / 100 * gain_scale`.
    pub fn gain_for_level(&self, level: u8) -> f32 {
        f32::from(level.min(MAX_VOLUME)) / 100.0 * self.config.gain_scale
    }

    /// Current level, 0-100
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Whether the reference tone is audible
    pub fn is_playing(&self) -> bool {
        self.generator.is_playing()
    }

    /// Borrow the underlying generator, e.g. to render its output
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Mutably borrow the underlying generator
    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    /// Start the reference tone and arm the auto-stop timer.
    ///
    /// Playing an already playing tone restarts the auto-stop window.
    pub fn play(&mut self, now: Instant) {
        self.generator.set_frequency(self.config.frequency_hz);
        self.generator.set_ear(Channel::Both);
        self.generator.set_gain(self.gain_for_level(self.level));
        self.generator.start();
        self.auto_stop = Timer::once(now, Duration::from_millis(self.config.duration_ms));

        debug!(
            "[CALIBRATION] Playing {:.0} Hz at level {} (gain {:.3})",
            self.config.frequency_hz,
            self.level,
            self.generator.gain()
        );
    }

    /// Play if stopped, stop if playing. Returns whether the tone is now playing.
    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.is_playing() {
            self.stop();
        } else {
            self.play(now);
        }
        self.is_playing()
    }

    /// Stop the tone and cancel the auto-stop timer. Idempotent.
    pub fn stop(&mut self) {
        self.auto_stop.cancel();
        if self.generator.is_playing() {
            self.generator.stop();
            debug!("[CALIBRATION] Stopped reference tone");
        }
    }

    /// Change the level; a playing tone picks it up immediately.
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(MAX_VOLUME);
        if self.generator.is_playing() {
            self.generator.set_gain(self.gain_for_level(self.level));
        }
    }

    /// Drive the auto-stop timer. Returns true if the tone was stopped.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.auto_stop.poll(now) > 0 && self.generator.is_playing() {
            self.generator.stop();
            debug!("[CALIBRATION] Auto-stopped reference tone");
            return true;
        }
        false
    }

    /// Time the auto-stop window lasts
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.config.duration_ms)
    }
}

impl<G: ToneGenerator> Drop for CalibrationTone<G> {
    fn drop(&mut self) {
        self.stop();
    }
}
