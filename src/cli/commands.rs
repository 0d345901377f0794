//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

use chrono::Local;
use log::{debug, info, warn};

use crate::audio::calibration::CalibrationTone;
use crate::audio::render::render_to_wav;
use crate::audio::tone::{SineToneGenerator, ToneGenerator, DEFAULT_SAMPLE_RATE};
use crate::config::AppConfig;
use crate::error::{HearingError, Result};
use crate::history::backups::list_backups;
use crate::history::devices::{filter_suggestions, DeviceEnumerator};
use crate::history::preferences::{load_audio_level, save_audio_level};
use crate::history::record::SavedResult;
use crate::history::storage::FileStorage;
use crate::history::store::HistoryStore;
use crate::session::run::{RunStep, TestRun};
use crate::session::scorer::{ear_average, score, score_info, Datapoint, MAX_VOLUME};
use crate::session::sequencer::Ear;

/// What the subject typed in response to a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// The tone is audible at its current volume
    Heard,
    /// Record this volume
    Volume(u8),
    /// Start over from the first trial
    Restart,
    /// Abandon the run
    Quit,
}

/// Parse one line of input during a run
pub fn parse_answer(line: &str) -> Result<Answer> {
    match line.trim() {
        "" => Ok(Answer::Heard),
        "r" | "restart" => Ok(Answer::Restart),
        "q" | "quit" => Ok(Answer::Quit),
        other => {
            let value: i64 = other.parse().map_err(|_| HearingError::InvalidFormat {
                reason: format!("expected a volume 0-100, Enter, 'r' or 'q', got {:?}", other),
            })?;
            u8::try_from(value)
                .ok()
                .filter(|v| *v <= 100)
                .map(Answer::Volume)
                .ok_or(HearingError::InvalidVolume { value })
        }
    }
}

fn open_store(data_dir: &Path) -> HistoryStore<FileStorage> {
    HistoryStore::open(FileStorage::new(data_dir))
}

/// Run the test interactively over stdin and save the result.
pub fn run_test(config: &AppConfig, data_dir: &Path, device: Option<String>) -> Result<()> {
    let stdin = io::stdin();
    run_test_with(config, data_dir, device, stdin.lock())
}

/// Run the test reading answers from `input`.
pub fn run_test_with<R: BufRead>(
    config: &AppConfig,
    data_dir: &Path,
    device: Option<String>,
    input: R,
) -> Result<()> {
    let mut store = open_store(data_dir);
    let audio_level = load_audio_level(store.backend());
    let generator = SineToneGenerator::new(DEFAULT_SAMPLE_RATE);
    let mut run = TestRun::from_config(&config.test, generator)?;

    info!("Starting run at audio level {}", audio_level);
    println!("Enter the lowest volume (0-100) at which you hear each tone.");
    if config.test.auto_ramp {
        println!("Or press Enter once you hear it; the tone gets louder while you wait.");
    }
    println!("Type 'r' to restart or 'q' to quit.");

    let Some(datapoints) = drive_run(&mut run, input, Instant::now)? else {
        return Ok(());
    };

    let saved = store.save(datapoints, Some(audio_level), device)?;
    print_result(&saved);
    Ok(())
}

/// Feed answers from `input` into `run` until it completes.
///
/// `clock` is read once per answer; the gain ramp is advanced to that
/// instant before the answer is applied. Returns `None` when the subject
/// quits or the input ends first.
pub fn drive_run<G, R, C>(
    run: &mut TestRun<G>,
    mut input: R,
    mut clock: C,
) -> Result<Option<Vec<Datapoint>>>
where
    G: ToneGenerator,
    R: BufRead,
    C: FnMut() -> Instant,
{
    let mut trial = run.start(clock())?;
    loop {
        print!(
            "[{:>3.0}%] {} Hz, {} ear > ",
            run.progress_percent(),
            trial.frequency,
            trial.ear
        );
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            println!();
            warn!("Input closed before the run finished");
            return Ok(None);
        }

        let now = clock();
        if let Some(volume) = run.tick(now) {
            debug!("Ramp raised volume to {}", volume);
        }

        let answer = match parse_answer(&line) {
            Ok(answer) => answer,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let step = match answer {
            Answer::Heard => run.submit_current(now)?,
            Answer::Volume(volume) => run.submit(volume, now)?,
            Answer::Restart => {
                trial = run.restart(now)?;
                continue;
            }
            Answer::Quit => {
                println!("Run abandoned");
                return Ok(None);
            }
        };

        match step {
            RunStep::Next(next) => trial = next,
            RunStep::Complete(datapoints) => return Ok(Some(datapoints)),
        }
    }
}

/// Play the calibration tone, optionally render it, and remember the level.
pub fn calibrate(
    config: &AppConfig,
    data_dir: &Path,
    level: Option<u8>,
    wav: Option<&Path>,
) -> Result<()> {
    if let Some(level) = level.filter(|l| *l > MAX_VOLUME) {
        return Err(HearingError::InvalidVolume {
            value: i64::from(level),
        });
    }

    let mut storage = FileStorage::new(data_dir);
    let level = level.unwrap_or_else(|| load_audio_level(&storage));
    info!("Calibrating at level {}", level);

    let generator = SineToneGenerator::new(DEFAULT_SAMPLE_RATE);
    let mut tone = CalibrationTone::new(generator, config.calibration.clone(), level);
    tone.play(Instant::now());

    if let Some(path) = wav {
        let seconds = tone.duration().as_secs_f32();
        let frames = render_to_wav(tone.generator_mut(), seconds, path)?;
        println!("Rendered {} frames to {}", frames, path.display());
    }
    tone.stop();

    save_audio_level(&mut storage, tone.level())?;
    println!(
        "Calibration level {} saved ({:.0} Hz reference, gain {:.3})",
        tone.level(),
        config.calibration.frequency_hz,
        tone.gain_for_level(tone.level())
    );
    Ok(())
}

/// List past results.
pub fn show_history(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir);

    if store.is_empty() {
        println!("No results yet");
        return Ok(());
    }

    println!("{:<36}  {:<19}  {:>5}  {:<13}  Device", "Id", "Date", "Score", "Rating");
    for result in store.list() {
        let (score_text, label) = match result.score() {
            Ok(s) => (s.to_string(), score_info(i32::from(s)).label),
            Err(_) => ("-".to_string(), "-"),
        };
        println!(
            "{:<36}  {:<19}  {:>5}  {:<13}  {}",
            result.id,
            result.date.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            score_text,
            label,
            result.device.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Show one result in detail.
pub fn show_result(data_dir: &Path, id: &str) -> Result<()> {
    let store = open_store(data_dir);
    match store.get(id) {
        Some(result) => print_result(result),
        None => println!("No result with id {}", id),
    }
    Ok(())
}

/// Delete one result.
pub fn delete_result(data_dir: &Path, id: &str) -> Result<()> {
    let mut store = open_store(data_dir);
    if store.delete_one(id)? {
        println!("Deleted {}", id);
    } else {
        println!("No result with id {}", id);
    }
    Ok(())
}

/// Delete every result.
pub fn clear_history(data_dir: &Path, confirmed: bool) -> Result<()> {
    if !confirmed {
        print!("Delete all results? [y/N] ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        if !matches!(line.trim(), "y" | "Y" | "yes") {
            println!("Nothing deleted");
            return Ok(());
        }
    }

    let mut store = open_store(data_dir);
    let count = store.len();
    store.clear()?;
    println!("Deleted {} results", count);
    Ok(())
}

/// Export history to a dated backup file.
pub fn export_history(data_dir: &Path, out: &Path) -> Result<()> {
    let store = open_store(data_dir);
    std::fs::create_dir_all(out).map_err(|e| HearingError::FileWriteError {
        path: out.to_path_buf(),
        source: e,
    })?;

    let path = store.export_to_dir(out, Local::now().date_naive())?;
    println!("Exported {} results to {}", store.len(), path.display());
    Ok(())
}

/// Merge results from an exported file.
pub fn import_history(data_dir: &Path, path: &Path) -> Result<()> {
    let mut store = open_store(data_dir);
    let outcome = store.import_file(path)?;
    println!(
        "Imported {} results, skipped {}",
        outcome.imported, outcome.skipped
    );
    Ok(())
}

/// List devices used in earlier runs.
pub fn list_devices(data_dir: &Path, query: Option<&str>) -> Result<()> {
    let store = open_store(data_dir);
    let devices = store.devices();
    let matches = filter_suggestions(&devices, query.unwrap_or(""));

    if matches.is_empty() {
        println!("No devices found");
    }
    for device in matches {
        println!("{}", device);
    }
    Ok(())
}

/// List backup files, newest first.
pub fn show_backups(dir: &Path) -> Result<()> {
    let backups = list_backups(dir);
    if backups.is_empty() {
        println!("No backups in {}", dir.display());
    }
    for path in backups {
        println!("{}", path.display());
    }
    Ok(())
}

fn print_result(result: &SavedResult) {
    println!("Result {}", result.id);
    println!("Date: {}", result.date.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    if let Some(device) = &result.device {
        println!("Device: {}", device);
    }
    if let Some(level) = result.audio_level {
        println!("Audio level: {}", level);
    }
    match score(&result.data) {
        Ok(total) => println!("Score: {} ({})", total, score_info(i32::from(total)).label),
        Err(_) => println!("Score: -"),
    }
    println!();
    println!("{:>8}  {:>5}  {:>5}", "Hz", "Right", "Left");
    for Datapoint { frequency, right, left } in &result.data {
        println!("{:>8}  {:>5}  {:>5}", frequency, right, left);
    }
    for ear in [Ear::Right, Ear::Left] {
        if let Some(avg) = ear_average(&result.data, ear) {
            println!("Average {}: {:.1}", ear, avg);
        }
    }
}
