//! Session Tests
//!
//! End-to-end tests for a test run: sequencing, tone control and scoring.

use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use hearing_test::audio::{SineToneGenerator, ToneGenerator};
use hearing_test::config::TestConfig;
use hearing_test::session::{
    score, score_info, Datapoint, Ear, RampSettings, RunStep, ScoreBand, TestRun, TrialSequencer,
};
use hearing_test::HearingError;

fn generator() -> SineToneGenerator {
    SineToneGenerator::new(48000)
}

fn two_by_two() -> TrialSequencer {
    TrialSequencer::new(vec![1000, 2000], vec![Ear::Right, Ear::Left]).unwrap()
}

// === Full Run Tests ===

#[test]
fn test_two_frequency_run_scores_good() {
    let now = Instant::now();
    let mut run = TestRun::new(two_by_two(), generator());

    let first = run.start(now).unwrap();
    assert_eq!((first.frequency, first.ear), (1000, Ear::Right));

    let mut step = None;
    for volume in [10, 20, 30, 40] {
        step = Some(run.submit(volume, now).unwrap());
    }

    let Some(RunStep::Complete(datapoints)) = step else {
        panic!("run did not complete");
    };
    assert_eq!(
        datapoints,
        vec![
            Datapoint { frequency: 1000, right: 10, left: 30 },
            Datapoint { frequency: 2000, right: 20, left: 40 },
        ]
    );

    let total = score(&datapoints).unwrap();
    assert_eq!(total, 75);
    assert_eq!(score_info(i32::from(total)).band, ScoreBand::Good);
    assert_eq!(score_info(i32::from(total)).label, "Good");
}

#[test]
fn test_trials_presented_in_order() {
    let now = Instant::now();
    let mut run = TestRun::new(two_by_two(), generator());
    run.start(now).unwrap();

    let mut seen = vec![];
    while let Ok(trial) = run.current_trial() {
        assert_eq!(run.generator().frequency(), trial.frequency as f32);
        seen.push((trial.frequency, trial.ear));
        run.submit(0, now).unwrap();
    }

    assert_eq!(
        seen,
        vec![
            (1000, Ear::Right),
            (2000, Ear::Right),
            (1000, Ear::Left),
            (2000, Ear::Left),
        ]
    );
    assert!(!run.generator().is_playing());
}

#[test]
fn test_submit_after_completion_fails() {
    let now = Instant::now();
    let mut run = TestRun::new(two_by_two(), generator());
    run.start(now).unwrap();
    for _ in 0..4 {
        run.submit(5, now).unwrap();
    }

    assert!(matches!(run.submit(5, now), Err(HearingError::SequenceComplete)));
    assert_eq!(run.results().len(), 4);
}

#[test]
fn test_restart_mid_run() {
    let now = Instant::now();
    let mut run = TestRun::new(two_by_two(), generator());
    run.start(now).unwrap();
    run.submit(50, now).unwrap();
    run.submit(60, now).unwrap();

    let first = run.restart(now).unwrap();
    assert_eq!(first.index, 0);
    assert!(run.results().is_empty());
    assert_relative_eq!(run.progress_percent(), 0.0);
}

#[test]
fn test_progress_reaches_hundred() {
    let now = Instant::now();
    let mut run = TestRun::new(two_by_two(), generator());
    run.start(now).unwrap();

    let mut last = run.progress_percent();
    for _ in 0..4 {
        run.submit(1, now).unwrap();
        assert!(run.progress_percent() >= last);
        last = run.progress_percent();
    }
    assert_relative_eq!(last, 100.0);
}

// === Gain Ramp Tests ===

#[test]
fn test_ramp_does_not_leak_into_next_trial() {
    let start = Instant::now();
    let mut run = TestRun::new(two_by_two(), generator()).with_ramp(RampSettings {
        step: 10,
        interval: Duration::from_millis(1000),
    });
    run.start(start).unwrap();

    assert_eq!(run.tick(start + Duration::from_millis(2500)), Some(20));
    run.submit_current(start + Duration::from_millis(2600)).unwrap();

    // the new trial starts silent; its own ramp only fires a full interval later
    assert_eq!(run.volume(), 0);
    assert_eq!(run.tick(start + Duration::from_millis(3000)), None);
    assert_eq!(run.tick(start + Duration::from_millis(3600)), Some(10));
    assert_eq!(run.results(), &[20]);
}

#[test]
fn test_ramp_from_config_caps_at_max() {
    let config = TestConfig {
        frequencies: vec![1000],
        auto_ramp: true,
        ..TestConfig::default()
    };
    let start = Instant::now();
    let mut run = TestRun::from_config(&config, generator()).unwrap();
    run.start(start).unwrap();

    assert_eq!(run.tick(start + Duration::from_secs(30)), Some(100));
    assert_relative_eq!(run.generator().gain(), 1.0);
    assert_eq!(run.tick(start + Duration::from_secs(31)), None);
}

#[test]
fn test_invalid_config_rejected() {
    let config = TestConfig {
        frequencies: vec![1000, 1000],
        ..TestConfig::default()
    };
    assert!(matches!(
        TestRun::from_config(&config, generator()),
        Err(HearingError::Config { .. })
    ));
}
