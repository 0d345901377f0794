//! Session Module
//!
//! Everything that happens during one test run:
//! - Trial sequencing (which frequency and ear comes next)
//! - The active run, driving the tone generator
//! - Scoring of the completed run

pub mod run;
pub mod scorer;
pub mod sequencer;

pub use run::{RampSettings, RunStep, TestRun};
pub use scorer::{assemble, ear_average, score, score_info, Datapoint, ScoreBand, ScoreInfo};
pub use sequencer::{result_index, trial_at, Ear, Trial, TrialSequencer};
