//! Archive codec error types.

use thiserror::Error;

/// Errors that can occur encoding or decoding an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Input is not a structurally valid archive.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    /// The archive was written by a newer codec than this one.
    #[error("unsupported archive format {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Filesystem failure reading or writing an archive file.
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}
