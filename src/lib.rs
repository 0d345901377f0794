//! Hearing Test - self-administered hearing threshold test
//!
//! A subject listens to pure tones across a fixed set of frequencies, one
//! ear at a time, and reports the lowest volume at which each tone is
//! audible. The responses become a per-frequency hearing profile and a
//! single 0-100 score, kept in a local history that can be exported and
//! merged back in.
//!
//! # Architecture
//!
//! - `session`: trial sequencing, the active run, scoring
//! - `history`: result persistence, import/export, preferences
//! - `audio`: tone generation, calibration tone, timers

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod session;

pub use error::{HearingError, Result};
