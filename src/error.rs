//! Error types for soundscape

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("Sound {0} not found")]
    UnknownSound(String),

    #[error("Entity {0} has no position")]
    UnknownEntity(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Audio format error: {0}")]
    Format(String),

    #[error("Output backend error: {0}")]
    Backend(String),

    #[error("Audio device error: {0}")]
    DeviceInit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SoundError>;
