//! # sreg-client
//!
//! Registry client adapter: the capability interface the migration engine
//! consumes, with two implementations:
//! - [`RestRegistryClient`] — Confluent-style REST API over reqwest, with
//!   context scoping via `:.ctx:` qualified subject names
//! - [`MemoryRegistry`] — in-process registry with real version assignment,
//!   canonical dedup, compatibility enforcement, and fault injection; drives
//!   the engine's test suite
//!
//! The engine never caches registry state across calls — every run re-reads
//! what it needs through this interface.

mod error;
mod http;
pub mod memory;
pub mod rest;

pub use error::RegistryError;
pub use memory::{Fault, FaultPoint, MemoryRegistry};
pub use rest::RestRegistryClient;

use async_trait::async_trait;
use sreg_core::{CompatibilityMode, SchemaReference, SchemaType, SchemaVersion};

/// Capability interface to a schema registry.
///
/// All calls are request/response against external mutable state; callers
/// must tolerate concurrent writers by re-validating preconditions rather
/// than assuming exclusive access.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Names of non-default contexts, plus the default context if the
    /// registry reports it. Implementations may return an empty list when
    /// only the implicit default context exists.
    async fn list_contexts(&self) -> Result<Vec<String>, RegistryError>;

    /// Subject names within a context (unqualified).
    async fn list_subjects(&self, context: &str) -> Result<Vec<String>, RegistryError>;

    /// Version numbers of a subject, ascending.
    async fn list_versions(&self, subject: &str, context: &str)
    -> Result<Vec<u32>, RegistryError>;

    /// Fetch one schema version.
    async fn get_schema(
        &self,
        subject: &str,
        version: u32,
        context: &str,
    ) -> Result<SchemaVersion, RegistryError>;

    /// Register a schema under a subject; returns the registry-assigned
    /// schema ID. Registering a schema identical to an existing version is a
    /// no-op returning the existing ID.
    async fn register_schema(
        &self,
        subject: &str,
        context: &str,
        schema: &str,
        schema_type: SchemaType,
        references: &[SchemaReference],
    ) -> Result<u32, RegistryError>;

    /// Subject-level compatibility override; `None` when the subject
    /// inherits the registry default.
    async fn get_compatibility(
        &self,
        subject: &str,
        context: &str,
    ) -> Result<Option<CompatibilityMode>, RegistryError>;

    /// Set the subject-level compatibility mode.
    async fn set_compatibility(
        &self,
        subject: &str,
        mode: CompatibilityMode,
        context: &str,
    ) -> Result<(), RegistryError>;

    /// Ask the registry whether a candidate schema would be accepted as the
    /// next version of a subject.
    async fn check_compatibility(
        &self,
        subject: &str,
        candidate: &str,
        schema_type: SchemaType,
        context: &str,
    ) -> Result<bool, RegistryError>;
}

/// Qualify a subject name with a context the way Confluent registries do.
///
/// The default context leaves names untouched; other contexts prefix
/// `:.ctx:`.
#[must_use]
pub fn qualified_subject(subject: &str, context: &str) -> String {
    if context == sreg_core::DEFAULT_CONTEXT {
        subject.to_string()
    } else {
        format!(":.{context}:{subject}")
    }
}

/// Split a possibly context-qualified subject name into (context, subject).
#[must_use]
pub fn split_qualified(name: &str) -> (String, String) {
    if let Some(rest) = name.strip_prefix(":.") {
        if let Some((context, subject)) = rest.split_once(':') {
            return (context.to_string(), subject.to_string());
        }
    }
    (sreg_core::DEFAULT_CONTEXT.to_string(), name.to_string())
}
