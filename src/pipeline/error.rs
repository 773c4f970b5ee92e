use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while converting a single cursor resource.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("malformed resource: {0}")]
    MalformedResource(String),

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(u32),

    #[error("I/O error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output `{}` is already written from `{}`", path.display(), claimed_by.display())]
    OutputConflict { path: PathBuf, claimed_by: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedResource,
    UnsupportedCompression,
    IoFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedResource => "MalformedResource",
            ErrorKind::UnsupportedCompression => "UnsupportedCompression",
            ErrorKind::IoFailure => "IoFailure",
        };
        f.write_str(name)
    }
}

impl ConversionError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ConversionError::MalformedResource(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConversionError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::MalformedResource(_) => ErrorKind::MalformedResource,
            ConversionError::UnsupportedCompression(_) => ErrorKind::UnsupportedCompression,
            ConversionError::Io { .. } | ConversionError::OutputConflict { .. } => {
                ErrorKind::IoFailure
            }
        }
    }

    /// Message including the underlying I/O cause, for one-line reports.
    pub fn message(&self) -> String {
        match self {
            ConversionError::Io { source, .. } => format!("{}: {}", self, source),
            _ => self.to_string(),
        }
    }
}

/// Maps a short read from an in-memory buffer to a truncation error.
pub(crate) fn truncated(what: &'static str) -> impl FnOnce(std::io::Error) -> ConversionError {
    move |_| ConversionError::MalformedResource(format!("truncated {}", what))
}

pub type ConvResult<T> = std::result::Result<T, ConversionError>;
