//! Active test run
//!
//! Owns the results submitted so far and keeps the tone generator in
//! step with the current trial. When the last trial is answered the
//! results are handed to the scorer.
//!
//! The optional gain ramp raises the tone while the subject waits. It
//! belongs to the trial that armed it and is cancelled whenever that
//! trial ends, so it can never change the gain of a later trial.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::audio::timer::Timer;
use crate::audio::tone::{Channel, ToneGenerator};
use crate::config::TestConfig;
use crate::error::{HearingError, Result};
use crate::session::scorer::{assemble, Datapoint, MAX_VOLUME};
use crate::session::sequencer::{Trial, TrialSequencer};

/// Outcome of submitting a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStep {
    /// The next trial is now playing
    Next(Trial),
    /// Every trial is answered; the assembled hearing profile
    Complete(Vec<Datapoint>),
}

/// Automatic gain increase while a trial waits for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampSettings {
    /// Volume points added per step
    pub step: u8,
    /// Time between steps
    pub interval: Duration,
}

/// One pass over all trials
pub struct TestRun<G: ToneGenerator> {
    sequencer: TrialSequencer,
    generator: G,
    results: Vec<u8>,
    volume: u8,
    ramp: Option<RampSettings>,
    ramp_timer: Timer,
}

impl<G: ToneGenerator> TestRun<G> {
    /// Create a run that has not presented any tone yet
    pub fn new(sequencer: TrialSequencer, generator: G) -> Self {
        Self {
            sequencer,
            generator,
            results: Vec::new(),
            volume: 0,
            ramp: None,
            ramp_timer: Timer::idle(),
        }
    }

    /// Create a run from the `test` configuration section
    pub fn from_config(config: &TestConfig, generator: G) -> Result<Self> {
        config.validate()?;
        let run = Self::new(TrialSequencer::from_config(config)?, generator);
        Ok(if config.auto_ramp {
            run.with_ramp(RampSettings {
                step: config.ramp_step,
                interval: Duration::from_millis(config.ramp_interval_ms),
            })
        } else {
            run
        })
    }

    /// Enable the automatic gain ramp
    pub fn with_ramp(mut self, ramp: RampSettings) -> Self {
        self.ramp = Some(ramp);
        self
    }

    /// Present the first unanswered trial.
    ///
    /// # Errors
    /// * `SequenceComplete` - every trial already has a result
    pub fn start(&mut self, now: Instant) -> Result<Trial> {
        self.present(now)
    }

    fn present(&mut self, now: Instant) -> Result<Trial> {
        let trial = self.sequencer.current_trial(self.results.len())?;

        self.volume = 0;
        self.generator.set_frequency(trial.frequency as f32);
        self.generator.set_ear(Channel::from(trial.ear));
        self.generator.set_gain(0.0);
        self.generator.start();

        self.ramp_timer = match self.ramp {
            Some(ramp) => Timer::periodic(now, ramp.interval),
            None => Timer::idle(),
        };

        debug!(
            "[TRIAL {}/{}] {} Hz, {} ear",
            trial.index + 1,
            self.sequencer.total_trials(),
            trial.frequency,
            trial.ear
        );
        Ok(trial)
    }

    /// Adjust the volume of the playing trial; audible immediately.
    ///
    /// # Errors
    /// * `InvalidVolume` - above 100
    /// * `SequenceComplete` - there is no trial left to adjust
    pub fn set_volume(&mut self, volume: u8) -> Result<()> {
        check_volume(volume)?;
        if self.is_complete() {
            return Err(HearingError::SequenceComplete);
        }
        self.volume = volume;
        self.generator.set_gain(f32::from(volume) / 100.0);
        Ok(())
    }

    /// Record `volume` for the current trial and move on.
    ///
    /// # Errors
    /// * `InvalidVolume` - above 100
    /// * `SequenceComplete` - the run was already complete
    pub fn submit(&mut self, volume: u8, now: Instant) -> Result<RunStep> {
        check_volume(volume)?;
        if self.is_complete() {
            return Err(HearingError::SequenceComplete);
        }

        self.ramp_timer.cancel();
        self.generator.stop();
        self.results.push(volume);

        if self.is_complete() {
            let datapoints = assemble(
                &self.results,
                self.sequencer.frequencies(),
                self.sequencer.ears(),
            )?;
            info!("Run complete: {} trials answered", self.results.len());
            return Ok(RunStep::Complete(datapoints));
        }

        self.present(now).map(RunStep::Next)
    }

    /// Submit whatever volume the current trial is at ("I hear it").
    pub fn submit_current(&mut self, now: Instant) -> Result<RunStep> {
        self.submit(self.volume, now)
    }

    /// Advance the gain ramp. Returns the new volume if it changed.
    pub fn tick(&mut self, now: Instant) -> Option<u8> {
        let ramp = self.ramp?;
        let fired = self.ramp_timer.poll(now);
        if fired == 0 || self.is_complete() {
            return None;
        }

        let raised = u32::from(ramp.step)
            .saturating_mul(fired)
            .saturating_add(u32::from(self.volume));
        let next = raised.min(u32::from(MAX_VOLUME)) as u8;
        if next == self.volume {
            return None;
        }

        self.volume = next;
        self.generator.set_gain(f32::from(next) / 100.0);
        Some(next)
    }

    /// Discard all results and present the first trial again.
    pub fn restart(&mut self, now: Instant) -> Result<Trial> {
        self.ramp_timer.cancel();
        self.generator.stop();
        self.results.clear();
        info!("Run restarted");
        self.present(now)
    }

    /// Stop the tone and any pending ramp without discarding results
    pub fn teardown(&mut self) {
        self.ramp_timer.cancel();
        self.generator.stop();
    }

    /// The trial awaiting a response
    pub fn current_trial(&self) -> Result<Trial> {
        self.sequencer.current_trial(self.results.len())
    }

    /// Percentage of trials answered
    pub fn progress_percent(&self) -> f64 {
        self.sequencer.progress_percent(self.results.len())
    }

    /// Whether every trial has a result
    pub fn is_complete(&self) -> bool {
        self.sequencer.is_complete(self.results.len())
    }

    /// Volumes submitted so far, in trial order
    pub fn results(&self) -> &[u8] {
        &self.results
    }

    /// Volume of the current trial
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Trial layout of this run
    pub fn sequencer(&self) -> &TrialSequencer {
        &self.sequencer
    }

    /// Borrow the tone generator
    pub fn generator(&self) -> &G {
        &self.generator
    }
}

impl<G: ToneGenerator> Drop for TestRun<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn check_volume(volume: u8) -> Result<()> {
    if volume > MAX_VOLUME {
        return Err(HearingError::InvalidVolume {
            value: i64::from(volume),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tone::SineToneGenerator;
    use crate::session::sequencer::Ear;
    use approx::assert_relative_eq;

    fn run() -> TestRun<SineToneGenerator> {
        let seq = TrialSequencer::new(vec![2000, 4000], vec![Ear::Right, Ear::Left]).unwrap();
        TestRun::new(seq, SineToneGenerator::default())
    }

    #[test]
    fn test_full_run_scenario() {
        let now = Instant::now();
        let mut run = run();
        run.start(now).unwrap();

        assert!(matches!(run.submit(10, now).unwrap(), RunStep::Next(_)));
        assert!(matches!(run.submit(20, now).unwrap(), RunStep::Next(_)));
        assert!(matches!(run.submit(30, now).unwrap(), RunStep::Next(_)));

        match run.submit(40, now).unwrap() {
            RunStep::Complete(data) => {
                assert_eq!(data.len(), 2);
                assert_eq!(data[0], Datapoint { frequency: 2000, right: 10, left: 30 });
                assert_eq!(data[1], Datapoint { frequency: 4000, right: 20, left: 40 });
            }
            other => panic!("expected completion, got {:?}", other),
        }

        assert!(!run.generator().is_playing());
        assert!(matches!(
            run.submit(50, now),
            Err(HearingError::SequenceComplete)
        ));
    }

    #[test]
    fn test_generator_follows_trial() {
        let now = Instant::now();
        let mut run = run();
        run.start(now).unwrap();
        run.submit(10, now).unwrap();
        run.submit(10, now).unwrap();

        assert!(run.generator().is_playing());
        assert_eq!(run.generator().frequency(), 2000.0);
        assert_eq!(run.generator().channel(), Channel::Left);
        assert_eq!(run.generator().gain(), 0.0);
        assert_relative_eq!(run.progress_percent(), 50.0);
    }

    #[test]
    fn test_set_volume_is_audible_immediately() {
        let mut run = run();
        run.start(Instant::now()).unwrap();
        run.set_volume(35).unwrap();
        assert_relative_eq!(run.generator().gain(), 0.35);
        assert!(matches!(
            run.set_volume(101),
            Err(HearingError::InvalidVolume { value: 101 })
        ));
    }

    #[test]
    fn test_restart_resets_to_first_trial() {
        let now = Instant::now();
        let mut run = run();
        run.start(now).unwrap();
        run.submit(10, now).unwrap();
        run.submit(20, now).unwrap();

        let first = run.restart(now).unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.ear, Ear::Right);
        assert!(run.results().is_empty());
    }

    #[test]
    fn test_ramp_raises_gain_and_caps() {
        let start = Instant::now();
        let mut run = run().with_ramp(RampSettings {
            step: 10,
            interval: Duration::from_millis(1000),
        });
        run.start(start).unwrap();

        assert_eq!(run.tick(start + Duration::from_millis(999)), None);
        assert_eq!(run.tick(start + Duration::from_millis(1000)), Some(10));
        assert_eq!(run.tick(start + Duration::from_millis(3000)), Some(30));
        assert_eq!(run.tick(start + Duration::from_secs(60)), Some(100));
        assert_eq!(run.tick(start + Duration::from_secs(61)), None);
        assert_relative_eq!(run.generator().gain(), 1.0);
    }

    #[test]
    fn test_ramp_never_touches_next_trial() {
        let start = Instant::now();
        let mut run = run().with_ramp(RampSettings {
            step: 10,
            interval: Duration::from_millis(1000),
        });
        run.start(start).unwrap();
        run.tick(start + Duration::from_millis(2500));
        assert!(matches!(
            run.submit_current(start + Duration::from_millis(2600)),
            Ok(RunStep::Next(_))
        ));
        assert_eq!(run.results(), &[20]);

        // the old schedule would have fired at 3000 ms; the new trial's first step is at 3600 ms
        assert_eq!(run.tick(start + Duration::from_millis(3000)), None);
        assert_eq!(run.volume(), 0);
        assert_eq!(run.tick(start + Duration::from_millis(3600)), Some(10));
    }

    #[test]
    fn test_ramp_after_long_idle_caps_without_overflow() {
        let start = Instant::now();
        let mut run = run().with_ramp(RampSettings {
            step: u8::MAX,
            interval: Duration::from_millis(1),
        });
        run.start(start).unwrap();

        assert_eq!(run.tick(start + Duration::from_secs(6 * 3600)), Some(100));
        assert_eq!(run.tick(start + Duration::from_secs(7 * 3600)), None);
        assert_eq!(run.volume(), 100);
    }

    #[test]
    fn test_teardown_stops_generator() {
        let mut run = run();
        run.start(Instant::now()).unwrap();
        run.teardown();
        assert!(!run.generator().is_playing());
    }
}
