//! # sreg-archive
//!
//! Portable archive codec for [`MigrationSnapshot`]s: a self-describing JSON
//! envelope with an explicit format-version tag, used as the offline
//! backup/restore form of a registry capture.
//!
//! ```text
//! { "format": 1, "snapshot": { ... } }
//! ```
//!
//! Round-trips are lossless for every snapshot field. Decoding rejects
//! structurally invalid input with [`ArchiveError::MalformedArchive`] and
//! archives written by a newer tool with [`ArchiveError::UnsupportedVersion`].

mod error;

pub use error::ArchiveError;

use std::path::Path;

use serde::{Deserialize, Serialize};
use sreg_core::MigrationSnapshot;

/// Archive format version this codec writes and the newest it understands.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format: u32,
    snapshot: MigrationSnapshot,
}

/// Serialize a snapshot into the archive wire form.
///
/// # Errors
///
/// Returns [`ArchiveError::MalformedArchive`] if the snapshot cannot be
/// serialized (practically unreachable for well-formed model types).
pub fn encode(snapshot: &MigrationSnapshot) -> Result<Vec<u8>, ArchiveError> {
    let envelope = serde_json::json!({
        "format": FORMAT_VERSION,
        "snapshot": snapshot,
    });
    serde_json::to_vec_pretty(&envelope).map_err(|e| ArchiveError::MalformedArchive(e.to_string()))
}

/// Deserialize a snapshot from archive bytes.
///
/// # Errors
///
/// - [`ArchiveError::UnsupportedVersion`] when the archive's format tag is
///   newer than [`FORMAT_VERSION`].
/// - [`ArchiveError::MalformedArchive`] for anything structurally invalid.
pub fn decode(bytes: &[u8]) -> Result<MigrationSnapshot, ArchiveError> {
    // Read the tag before the payload so version mismatches are reported as
    // such rather than as parse noise from a changed snapshot shape.
    #[derive(Deserialize)]
    struct Tag {
        format: u32,
    }
    let tag: Tag = serde_json::from_slice(bytes)
        .map_err(|e| ArchiveError::MalformedArchive(e.to_string()))?;
    if tag.format > FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion {
            found: tag.format,
            supported: FORMAT_VERSION,
        });
    }

    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| ArchiveError::MalformedArchive(e.to_string()))?;
    Ok(envelope.snapshot)
}

/// Write a snapshot to an archive file.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] on filesystem failures, plus any [`encode`]
/// error.
pub fn write_archive(path: &Path, snapshot: &MigrationSnapshot) -> Result<(), ArchiveError> {
    let bytes = encode(snapshot)?;
    std::fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), versions = snapshot.version_count(), "wrote archive");
    Ok(())
}

/// Read a snapshot from an archive file.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] on filesystem failures, plus any [`decode`]
/// error.
pub fn read_archive(path: &Path) -> Result<MigrationSnapshot, ArchiveError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use sreg_core::{
        CaptureGap, CompatibilityMode, ContextSnapshot, DEFAULT_CONTEXT, SchemaReference,
        SchemaType, SchemaVersion, Subject,
    };

    fn sample_snapshot() -> MigrationSnapshot {
        MigrationSnapshot {
            source: "http://localhost:8081".to_string(),
            captured_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            contexts: vec![ContextSnapshot {
                name: DEFAULT_CONTEXT.to_string(),
                is_default: true,
                subjects: vec![Subject {
                    name: "user-value".to_string(),
                    context: DEFAULT_CONTEXT.to_string(),
                    versions: vec![SchemaVersion {
                        subject: "user-value".to_string(),
                        context: DEFAULT_CONTEXT.to_string(),
                        version: 1,
                        id: Some(7),
                        schema: r#"{"type":"record","name":"User","fields":[]}"#.to_string(),
                        schema_type: SchemaType::Avro,
                        references: vec![SchemaReference {
                            name: "com.example.Address".to_string(),
                            subject: "address-value".to_string(),
                            version: 3,
                        }],
                    }],
                    compatibility: Some(CompatibilityMode::FullTransitive),
                }],
            }],
            gaps: vec![CaptureGap {
                subject: "user-value".to_string(),
                context: DEFAULT_CONTEXT.to_string(),
                version: 2,
                cause: "API error (503): injected".to_string(),
            }],
        }
    }

    #[test]
    fn roundtrip_is_lossless() {
        let snapshot = sample_snapshot();
        let bytes = encode(&snapshot).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn encoded_archive_carries_format_tag() {
        let bytes = encode(&sample_snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["format"], FORMAT_VERSION);
        assert!(value["snapshot"].is_object());
    }

    #[test]
    fn newer_format_is_rejected() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&encode(&sample_snapshot()).unwrap()).unwrap();
        value["format"] = serde_json::json!(FORMAT_VERSION + 1);
        let bytes = serde_json::to_vec(&value).unwrap();

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::UnsupportedVersion { found, supported }
                if found == FORMAT_VERSION + 1 && supported == FORMAT_VERSION
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decode(b"not an archive").unwrap_err(),
            ArchiveError::MalformedArchive(_)
        ));
        assert!(matches!(
            decode(br#"{"format": 1, "snapshot": {"wrong": true}}"#).unwrap_err(),
            ArchiveError::MalformedArchive(_)
        ));
        assert!(matches!(
            decode(br#"{"snapshot": {}}"#).unwrap_err(),
            ArchiveError::MalformedArchive(_)
        ));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.sreg.json");
        let snapshot = sample_snapshot();

        write_archive(&path, &snapshot).unwrap();
        let restored = read_archive(&path).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_archive(Path::new("/nonexistent/backup.json")).unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
    }
}
