// Error types - one enum per concern

use std::fmt;

use crate::sequencer::MusicTimeStamp;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by the bridge to the owning mixer
#[derive(Debug, thiserror::Error)]
pub enum NativeMidiError {
    #[error("MIDI load failed while {step}: {source}")]
    LoadFailed {
        step: LoadStep,
        #[source]
        source: BoxError,
    },

    #[error("Seek to {time} failed: {source}")]
    SeekFailed {
        time: MusicTimeStamp,
        #[source]
        source: PlatformError,
    },

    #[error("Native MIDI is not available on this platform")]
    UnsupportedPlatform,
}

impl NativeMidiError {
    pub(crate) fn load(step: LoadStep, source: impl Into<BoxError>) -> Self {
        NativeMidiError::LoadFailed {
            step,
            source: source.into(),
        }
    }

    /// Step at which a load failed, if this is a load failure
    pub fn load_step(&self) -> Option<LoadStep> {
        match self {
            NativeMidiError::LoadFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Stage of the load pipeline, carried by `LoadFailed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    Open,
    ReadStream,
    AllocatePlayer,
    AllocateSequence,
    ImportData,
    TrackCount,
    TrackLength(usize),
    BindSequence,
}

impl fmt::Display for LoadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStep::Open => write!(f, "opening the file"),
            LoadStep::ReadStream => write!(f, "reading the stream"),
            LoadStep::AllocatePlayer => write!(f, "allocating the player"),
            LoadStep::AllocateSequence => write!(f, "allocating the sequence"),
            LoadStep::ImportData => write!(f, "importing MIDI data"),
            LoadStep::TrackCount => write!(f, "counting tracks"),
            LoadStep::TrackLength(index) => write!(f, "measuring track {}", index),
            LoadStep::BindSequence => write!(f, "binding the sequence to the player"),
        }
    }
}

/// Failure of a single platform sequencer call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlatformError {
    #[error("{operation} failed with status {status}")]
    Status { operation: &'static str, status: i32 },

    #[error("Invalid MIDI data: {0}")]
    InvalidData(String),

    #[error("No {what} at index {index}")]
    OutOfRange { what: &'static str, index: usize },

    #[error("Timestamp {0} rejected")]
    InvalidTime(MusicTimeStamp),

    #[error("No sequence attached to the player")]
    NoSequence,

    #[error("Song handle is no longer valid")]
    StaleHandle,

    #[error("MIDI device error: {0}")]
    Device(String),
}

/// Errors from building the cpal output host
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio stream error: {0}")]
    Stream(String),
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
