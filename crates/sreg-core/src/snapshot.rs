//! Snapshot model: a point-in-time, immutable capture of registry state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{CompatibilityMode, SchemaType};

/// Name of the implicit default context. Every registry instance has it,
/// whether or not the contexts endpoint reports it.
pub const DEFAULT_CONTEXT: &str = ".";

/// Reference from one schema to another registered schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
    /// Name the referencing schema uses (e.g. an Avro fullname or proto import path).
    pub name: String,
    /// Subject holding the referenced schema.
    pub subject: String,
    /// Version of the referenced subject.
    pub version: u32,
}

/// One registered version of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub subject: String,
    pub context: String,
    /// 1-based version number, strictly increasing within a subject.
    pub version: u32,
    /// Registry-assigned schema ID. Opaque, registry-local, never invented
    /// by this tool; absent for versions that have not been registered yet.
    pub id: Option<u32>,
    /// Raw schema text exactly as the registry returned it.
    pub schema: String,
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SchemaReference>,
}

/// A subject and its recorded version history, in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub context: String,
    pub versions: Vec<SchemaVersion>,
    /// Subject-level compatibility override; `None` means the subject
    /// inherits the registry default.
    pub compatibility: Option<CompatibilityMode>,
}

impl Subject {
    /// Latest recorded version, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&SchemaVersion> {
        self.versions.last()
    }
}

/// All captured subjects of one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub name: String,
    pub is_default: bool,
    /// Subjects sorted lexicographically by name.
    pub subjects: Vec<Subject>,
}

impl ContextSnapshot {
    /// Empty snapshot of a named context.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        let name = name.into();
        let is_default = name == DEFAULT_CONTEXT;
        Self {
            name,
            is_default,
            subjects: Vec::new(),
        }
    }

    /// Look up a captured subject by name.
    #[must_use]
    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }
}

/// A version that was found but could not be fetched during capture.
///
/// Gaps are data, not errors: a partial capture still yields a usable
/// snapshot, and the caller decides whether the gaps are acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureGap {
    pub subject: String,
    pub context: String,
    pub version: u32,
    pub cause: String,
}

/// Immutable point-in-time capture of registry (or archive) state.
///
/// Ordering is deterministic: the default context first, remaining contexts
/// lexicographic; subjects lexicographic within a context; versions
/// ascending within a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSnapshot {
    /// Human-readable description of where this snapshot came from
    /// (registry URL or archive path).
    pub source: String,
    pub captured_at: DateTime<Utc>,
    pub contexts: Vec<ContextSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<CaptureGap>,
}

impl MigrationSnapshot {
    /// Look up a captured context by name.
    #[must_use]
    pub fn context(&self, name: &str) -> Option<&ContextSnapshot> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Total number of schema versions across all contexts and subjects.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.contexts
            .iter()
            .flat_map(|c| &c.subjects)
            .map(|s| s.versions.len())
            .sum()
    }

    /// Total number of captured subjects.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.contexts.iter().map(|c| c.subjects.len()).sum()
    }
}
