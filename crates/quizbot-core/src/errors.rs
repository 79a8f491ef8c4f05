use std::path::PathBuf;

/// Core error type for the quiz bot.
///
/// Nothing in the bank/selection path is fatal: callers map these into
/// "bank not (re)loaded" or a user-facing notice and carry on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("question bank file not found: {path}")]
    FileMissing { path: PathBuf },

    #[error("question bank is not loaded")]
    NotLoaded,

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("no active question")]
    NoActiveQuestion,

    #[error("invalid answer choice {choice} (expected 1..={max})")]
    InvalidChoice { choice: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
