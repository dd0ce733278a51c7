use crate::command_util;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Player unavailable: {0}")]
    PlayerUnavailable(String),
    #[error("Player command failed: {0}")]
    PlayerCommandFailed(std::io::Error),
    #[error("Live status unavailable: {0}")]
    LiveStatusUnavailable(String),
    #[error("No media found in {0}")]
    NoMedia(String),
    #[error("Command failed: {0}")]
    CommandFailed(command_util::Error),
    #[error("std::io error: {0}")]
    IoError(std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(serde_json::Error),
    #[error("YAML error: {0}")]
    YamlError(serde_yaml::Error),
    #[error("Mustache error: {0}")]
    MustacheError(mustache::Error),
    #[error("HTTP error: {0}")]
    HttpError(reqwest::Error),
    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl From<command_util::Error> for Error {
    fn from(err: command_util::Error) -> Self {
        Self::CommandFailed(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err)
    }
}

impl From<mustache::Error> for Error {
    fn from(err: mustache::Error) -> Self {
        Self::MustacheError(err)
    }
}

impl From<mustache::EncoderError> for Error {
    fn from(err: mustache::EncoderError) -> Self {
        Self::MustacheError(mustache::Error::from(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err)
    }
}

/// Process exit codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    Shutdown = 0,
    ConsumerFailed = 4,
    Panic = 5,
    Abort = 6,
}

impl ExitReason {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&Error> for ExitReason {
    fn from(err: &Error) -> Self {
        match err {
            Error::PlayerUnavailable(_) => ExitReason::Abort,
            _ => ExitReason::ConsumerFailed,
        }
    }
}

// </coverage:exclude>
