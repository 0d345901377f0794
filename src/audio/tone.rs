//! Tone Generator
//!
//! The capability the test and calibration flows drive: a single sine
//! oscillator routed to one or both ears. `SineToneGenerator` is the
//! software implementation; it renders stereo frames that a host audio
//! callback (or the WAV renderer) can consume.

use std::fmt;

use crate::session::Ear;

/// Internal sample rate for rendered tones
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Output routing for a tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    Left,
    Right,
    /// Both ears, used for the calibration tone
    #[default]
    Both,
}

impl From<Ear> for Channel {
    fn from(ear: Ear) -> Self {
        match ear {
            Ear::Left => Channel::Left,
            Ear::Right => Channel::Right,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Left => write!(f, "left"),
            Channel::Right => write!(f, "right"),
            Channel::Both => write!(f, "both"),
        }
    }
}

/// A tone source the engine can steer.
///
/// Gain changes must take effect immediately while playing, and
/// `stop` on a stopped tone must be a no-op.
pub trait ToneGenerator {
    /// Set the oscillator frequency in Hz
    fn set_frequency(&mut self, hz: f32);

    /// Route the tone to one ear or both
    fn set_ear(&mut self, channel: Channel);

    /// Set linear gain, clamped to 0..=1
    fn set_gain(&mut self, gain: f32);

    /// Start the tone; starting a playing tone keeps it playing
    fn start(&mut self);

    /// Stop the tone; idempotent
    fn stop(&mut self);

    /// Whether the tone is currently audible
    fn is_playing(&self) -> bool;

    /// Current linear gain
    fn gain(&self) -> f32;

    /// Current frequency in Hz
    fn frequency(&self) -> f32;

    /// Current routing
    fn channel(&self) -> Channel;
}

/// Software sine oscillator with continuous phase
#[derive(Debug, Clone)]
pub struct SineToneGenerator {
    sample_rate: u32,
    frequency: f32,
    channel: Channel,
    gain: f32,
    playing: bool,
    phase: f32,
}

impl Default for SineToneGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl SineToneGenerator {
    /// Create a stopped, silent generator at the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frequency: 1000.0,
            channel: Channel::Both,
            gain: 0.0,
            playing: false,
            phase: 0.0,
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render `frames` stereo frames as `[left, right]` pairs.
    ///
    /// A stopped generator renders silence and does not advance its phase.
    pub fn render(&mut self, frames: usize) -> Vec<[f32; 2]> {
        if !self.playing {
            return vec![[0.0, 0.0]; frames];
        }

        let step = 2.0 * std::f32::consts::PI * self.frequency / self.sample_rate as f32;
        let (left_gain, right_gain) = match self.channel {
            Channel::Left => (self.gain, 0.0),
            Channel::Right => (0.0, self.gain),
            Channel::Both => (self.gain, self.gain),
        };

        let mut out = Vec::with_capacity(frames);
        for _ in 0..frames {
            let value = self.phase.sin();
            out.push([value * left_gain, value * right_gain]);
            self.phase = (self.phase + step) % (2.0 * std::f32::consts::PI);
        }
        out
    }
}

impl ToneGenerator for SineToneGenerator {
    fn set_frequency(&mut self, hz: f32) {
        if hz.is_finite() && hz > 0.0 {
            self.frequency = hz;
        }
    }

    fn set_ear(&mut self, channel: Channel) {
        self.channel = channel;
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = if gain.is_finite() {
            gain.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    fn start(&mut self) {
        if !self.playing {
            self.phase = 0.0;
            self.playing = true;
        }
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn gain(&self) -> f32 {
        self.gain
    }

    fn frequency(&self) -> f32 {
        self.frequency
    }

    fn channel(&self) -> Channel {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn peak(frames: &[[f32; 2]], ch: usize) -> f32 {
        frames.iter().map(|f| f[ch].abs()).fold(0.0, f32::max)
    }

    #[test]
    fn test_stopped_generator_is_silent() {
        let mut gen = SineToneGenerator::default();
        gen.set_gain(1.0);
        let frames = gen.render(256);
        assert_eq!(peak(&frames, 0), 0.0);
        assert_eq!(peak(&frames, 1), 0.0);
    }

    #[test]
    fn test_routes_to_one_ear() {
        let mut gen = SineToneGenerator::default();
        gen.set_ear(Channel::from(Ear::Right));
        gen.set_gain(0.5);
        gen.start();
        let frames = gen.render(480);
        assert_eq!(peak(&frames, 0), 0.0);
        assert_relative_eq!(peak(&frames, 1), 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_gain_change_applies_immediately() {
        let mut gen = SineToneGenerator::default();
        gen.start();
        gen.set_gain(0.1);
        let quiet = gen.render(480);
        gen.set_gain(0.8);
        let loud = gen.render(480);
        assert!(peak(&loud, 0) > peak(&quiet, 0) * 4.0);
    }

    #[test]
    fn test_gain_is_clamped() {
        let mut gen = SineToneGenerator::default();
        gen.set_gain(3.0);
        assert_eq!(gen.gain(), 1.0);
        gen.set_gain(-1.0);
        assert_eq!(gen.gain(), 0.0);
        gen.set_gain(f32::NAN);
        assert_eq!(gen.gain(), 0.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut gen = SineToneGenerator::default();
        gen.stop();
        assert!(!gen.is_playing());
        gen.start();
        gen.stop();
        gen.stop();
        assert!(!gen.is_playing());
    }
}
