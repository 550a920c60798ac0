use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::contract::TransportError;
use crate::month::MonthParseError;
use std::path::PathBuf;

/// Every way a run can end early. All of them are terminal: the caller sees the
/// error and nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("tenant {tenant_index}: cannot read directory {path:?}: {source}")]
    DirectoryAccess {
        tenant_index: usize,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("tenant {tenant_index}: {source}")]
    Archive {
        tenant_index: usize,
        source: ArchiveError,
    },

    #[error("cannot read bundle {path:?} for attachment: {source}")]
    Bundle {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to send e-mail: {0}")]
    Transport(TransportError),

    #[error("{0}")]
    InputValidation(#[from] MonthParseError),
}

impl DispatchError {
    /// Splits archiver failures into the directory-access case, which the
    /// policy may downgrade to a skip, and everything else.
    pub(crate) fn from_archive(tenant_index: usize, err: ArchiveError) -> Self {
        match err {
            ArchiveError::DirectoryAccess { path, source } => DispatchError::DirectoryAccess {
                tenant_index,
                path,
                source,
            },
            other => DispatchError::Archive {
                tenant_index,
                source: other,
            },
        }
    }
}
