use std::path::PathBuf;

use partwall_grid::{SnapshotError, TemplateError};
use partwall_inventory::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DoctorError>;

/// Exit code for bad arguments or unreadable input documents.
pub const EXIT_USAGE: i32 = 2;
/// Exit code for a refused placement or a snapshot that breaks invariants.
pub const EXIT_REJECTED: i32 = 3;

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("no template matches '{needle}'")]
    TemplateNotFound { needle: String },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{message}")]
    Rejected { message: String },
}

impl DoctorError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Json { .. }
            | Self::Config(_)
            | Self::InvalidArgument { .. }
            | Self::TemplateNotFound { .. } => EXIT_USAGE,
            Self::Snapshot(_) | Self::Template(_) | Self::Rejected { .. } => EXIT_REJECTED,
            Self::Io { .. } | Self::Output(_) => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_and_usage_errors_have_distinct_codes() {
        assert_eq!(DoctorError::rejected("overlap").exit_code(), EXIT_REJECTED);
        assert_eq!(DoctorError::invalid("width").exit_code(), EXIT_USAGE);
        assert_eq!(DoctorError::rejected("boom").to_string(), "boom");
    }

    #[test]
    fn io_errors_exit_with_one() {
        let error = DoctorError::Io {
            path: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(error.exit_code(), 1);
    }
}
