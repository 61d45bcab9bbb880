//! Error type definitions for the EPG filter
//!
//! The hierarchy mirrors the pipeline: a source goes through fetch, decode and
//! parse, and any of those stages can fail with a [`SourceError`]. Config and
//! write failures sit beside it in [`AppError`].

use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A source failed somewhere between download and parse
    #[error("Source {url} failed: {error}")]
    Source {
        url: String,
        #[source]
        error: SourceError,
    },

    /// Output could not be written
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Missing or invalid runtime configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No source URL was configured
    #[error("no EPG source configured (set EPG_URL_1 or list `sources` in the config file)")]
    MissingSources,

    /// No channel selection was configured
    #[error("no channel selection configured (set EPG_CHANNEL_IDS, EPG_CHANNEL_NAMES or [selection])")]
    MissingSelection,

    /// A field holds a value we cannot use
    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },

    /// Layered configuration could not be extracted
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Network or HTTP status failure for a single URL
#[derive(Error, Debug)]
#[error("failed to fetch {url}: {message}")]
pub struct FetchError {
    /// Source URL with credentials obfuscated
    pub url: String,
    pub message: String,
    /// HTTP status when the server answered with a non-success code
    pub status: Option<u16>,
}

/// Payload is not a compressed stream we can decode
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Magic bytes do not match any enabled compression format
    #[error("payload is not a supported compressed stream (detected: {detected})")]
    UnsupportedFormat { detected: String },

    /// The stream started out right but could not be decompressed
    #[error("failed to decompress {format} data: {source}")]
    Corrupt {
        format: String,
        #[source]
        source: std::io::Error,
    },
}

/// Payload is not well-formed XMLTV
#[derive(Error, Debug)]
pub enum ParseError {
    /// Document declares or defaults to UTF-8 but is not valid UTF-8
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The XML declaration names an encoding we cannot decode
    #[error("unsupported document encoding '{label}'")]
    UnsupportedEncoding { label: String },

    /// Bytes that are not valid in the declared encoding
    #[error("document is not valid {encoding}")]
    InvalidBytes { encoding: String },

    /// quick-xml rejected the document
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    /// Root element is missing or is not `tv`
    #[error("unexpected root element: expected <tv>, found {found}")]
    UnexpectedRoot { found: String },
}

/// Any failure that discards a single source's contribution
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Downloaded artifacts could not be kept on disk
    #[error("failed to store download artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Output destination I/O failure
#[derive(Error, Debug)]
#[error("failed to write {path}: {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl AppError {
    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attach the failing URL to a source error
    pub fn source_failed<U: Into<String>>(url: U, error: SourceError) -> Self {
        Self::Source {
            url: url.into(),
            error,
        }
    }

    /// Pipeline stage the error originated from, used in diagnostics
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Source { error, .. } => error.stage(),
            Self::Write(_) => "write",
            Self::Internal { .. } => "internal",
        }
    }
}

impl ConfigError {
    /// Create an invalid field error
    pub fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::Load(Box::new(error))
    }
}

impl FetchError {
    pub fn new<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a non-success status error
    pub fn status<U: Into<String>>(url: U, status: u16, reason: &str) -> Self {
        Self {
            url: url.into(),
            message: format!("HTTP {status} {reason}"),
            status: Some(status),
        }
    }
}

impl SourceError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Decode(_) => "decode",
            Self::Parse(_) => "parse",
            Self::Artifact { .. } => "download",
        }
    }
}
