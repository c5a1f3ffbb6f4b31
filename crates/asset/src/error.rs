//! Errors raised while loading OBJ/MTL files and textures.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Coarse classification used by callers deciding whether to skip an asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// File missing, unreadable or undecodable.
    Io,
    /// File was read but its contents are malformed.
    Format,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::Image { .. } => ErrorKind::Io,
            Self::Format { .. } => ErrorKind::Format,
        }
    }

    /// Attach a file path to a reader-level error that only knew about lines.
    pub(crate) fn in_file(self, path: &std::path::Path) -> Self {
        match self {
            Self::Format { line, message } => Self::Format {
                line,
                message: format!("{message} (in {})", path.display()),
            },
            other => other,
        }
    }
}

pub type AssetResult<T> = Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_classified() {
        let io = AssetError::io("missing.obj", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.to_string().contains("missing.obj"));

        let fmt = AssetError::format(7, "bad float");
        assert_eq!(fmt.kind(), ErrorKind::Format);
        assert_eq!(fmt.to_string(), "line 7: bad float");
    }
}
