//! Error handling for the hearing test engine
//!
//! Every failure the engine can report, with error codes and
//! recovery hints for the command-line surface.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hearing test operations
pub type Result<T> = std::result::Result<T, HearingError>;

/// Main error type for hearing test operations
#[derive(Error, Debug)]
pub enum HearingError {
    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // Sequencing Errors
    #[error("All trials have been submitted")]
    SequenceComplete,

    #[error("Incomplete run: expected {expected} results, got {actual}")]
    IncompleteRun { expected: usize, actual: usize },

    #[error("Cannot score an empty set of datapoints")]
    EmptyInput,

    #[error("Volume out of range: {value} (expected 0-100)")]
    InvalidVolume { value: i64 },

    // Import Errors
    #[error("Invalid import format: {reason}")]
    InvalidFormat { reason: String },

    // Storage Errors
    #[error("Failed to read storage key '{key}': {source}")]
    StorageRead {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write storage key '{key}': {source}")]
    StorageWrite {
        key: String,
        #[source]
        source: std::io::Error,
    },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Audio Errors
    #[error("Audio error: {reason}")]
    Audio { reason: String },

    // Serialization Errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HearingError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            HearingError::Config { .. } => "CONFIG_ERROR",
            HearingError::SequenceComplete => "SEQUENCE_COMPLETE",
            HearingError::IncompleteRun { .. } => "INCOMPLETE_RUN",
            HearingError::EmptyInput => "EMPTY_INPUT",
            HearingError::InvalidVolume { .. } => "INVALID_VOLUME",
            HearingError::InvalidFormat { .. } => "INVALID_FORMAT",
            HearingError::StorageRead { .. } => "STORAGE_READ_ERROR",
            HearingError::StorageWrite { .. } => "STORAGE_WRITE_ERROR",
            HearingError::FileReadError { .. } => "FILE_READ_ERROR",
            HearingError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            HearingError::Audio { .. } => "AUDIO_ERROR",
            HearingError::Json(_) => "SERIALIZATION_ERROR",
            HearingError::Io(_) => "IO_ERROR",
        }
    }

    /// Check if the user can recover by retrying or starting over.
    ///
    /// Configuration errors and scorer misuse are fatal; everything the
    /// user can trigger from the history view is recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            HearingError::Config { .. } | HearingError::IncompleteRun { .. }
        )
    }

    /// Returns a short recovery suggestion for the user.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            HearingError::Config { .. } => {
                Some("Check the frequency list and ear order in the config file.")
            }
            HearingError::InvalidFormat { .. } => {
                Some("Choose a file created by 'hearing-cli export'.")
            }
            HearingError::InvalidVolume { .. } => Some("Enter a volume between 0 and 100."),
            HearingError::FileReadError { .. } => Some("Check the file path and try again."),
            HearingError::StorageWrite { .. } | HearingError::FileWriteError { .. } => {
                Some("Check free disk space and permissions on the data directory.")
            }
            HearingError::SequenceComplete => Some("The run is finished; view your results."),
            _ => None,
        }
    }
}
