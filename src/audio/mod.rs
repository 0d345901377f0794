//! Audio Module
//!
//! Tone generation and the calibration reference tone:
//! - Tone generator capability and software sine oscillator
//! - Calibration helper with auto-stop
//! - Cancellable timers polled by the event loop
//! - WAV rendering

pub mod calibration;
pub mod render;
pub mod timer;
pub mod tone;

pub use calibration::CalibrationTone;
pub use render::render_to_wav;
pub use timer::Timer;
pub use tone::{Channel, SineToneGenerator, ToneGenerator};
