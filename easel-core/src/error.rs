use std::fmt;

use thiserror::Error;

/// What a run produces, used to pick the accelerator policy and the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("GPU acceleration not available; CPU is too slow for {kind} generation")]
    AcceleratorUnavailable { kind: MediaKind },

    /// Anything raised by the inference engine. Format with `{:#}` to include its causes.
    #[error(transparent)]
    Engine(anyhow::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid menu: {0}")]
    InvalidMenu(String),

    #[error("input closed before an answer was given")]
    InputClosed,

    #[error("no valid answer after {0} attempts")]
    TooManyAttempts(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EaselResult<T> = Result<T, GenerationError>;
