//! Error kinds shared by the resolver, the fetcher and the config loader.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while walking the MIME structure of one message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MimeError {
    /// Header/body framing (or multipart framing) cannot be parsed.
    #[error("malformed message envelope: {0}")]
    MalformedEnvelope(String),

    /// Multipart nesting goes deeper than the configured bound.
    #[error("multipart nesting exceeds the limit of {limit} levels")]
    ExcessiveNesting { limit: usize },
}

/// Failures while reading a message through the IMAP session.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport or protocol error reported by the session.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error(transparent)]
    Mime(#[from] MimeError),
}

impl FetchError {
    pub fn failed<E: std::fmt::Display>(reason: E) -> Self {
        Self::FetchFailed(reason.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A required setting is neither in the environment nor in the file.
    #[error("{setting} is not set (export {env_var})")]
    Missing {
        setting: &'static str,
        env_var: &'static str,
    },

    #[error("invalid IMAP server address '{0}'")]
    BadServer(String),
}
