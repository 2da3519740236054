use thiserror::Error;

/// All errors produced by brainwave-core.
#[derive(Debug, Error)]
pub enum BrainwaveError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("clip decode error: {0}")]
    ClipDecode(String),

    #[error("recorder is already running")]
    AlreadyRecording,

    #[error("recorder is not running")]
    NotRecording,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BrainwaveError>;
