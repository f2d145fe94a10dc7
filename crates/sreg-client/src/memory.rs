//! In-process registry implementation.
//!
//! Behaves like a real registry: monotonically increasing version numbers,
//! globally unique assigned IDs, canonical-equality dedup on registration,
//! and compatibility enforcement via the same predictor the plan compiler
//! uses. Fault injection lets tests exercise retry, partial capture, and
//! chain-blocking paths deterministically.

use std::collections::BTreeMap;
use std::sync::Mutex;

use sreg_core::{
    CompatibilityMode, DEFAULT_CONTEXT, SchemaReference, SchemaType, SchemaVersion, predict_violations,
    schemas_equal,
};

use crate::{RegistryApi, RegistryError};

/// Where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    ListSubjects,
    ListVersions,
    GetSchema,
    RegisterSchema,
}

/// An injected failure: fires on the next `remaining` matching calls,
/// returning an API error with the given status.
#[derive(Debug, Clone)]
pub struct Fault {
    pub point: FaultPoint,
    /// Subject the fault applies to; `None` matches any subject.
    pub subject: Option<String>,
    /// Version the fault applies to; `None` matches any version.
    pub version: Option<u32>,
    /// How many matching calls fail before the fault is exhausted.
    pub remaining: u32,
    /// HTTP status the synthesized error carries (5xx reads as transient).
    pub status: u16,
    pub message: String,
}

impl Fault {
    /// Transient (503) fault firing `times` times.
    #[must_use]
    pub fn transient(point: FaultPoint, subject: &str, times: u32) -> Self {
        Self {
            point,
            subject: Some(subject.to_string()),
            version: None,
            remaining: times,
            status: 503,
            message: "injected transient failure".to_string(),
        }
    }

    /// Terminal (409) fault firing `times` times.
    #[must_use]
    pub fn terminal(point: FaultPoint, subject: &str, times: u32) -> Self {
        Self {
            point,
            subject: Some(subject.to_string()),
            version: None,
            remaining: times,
            status: 409,
            message: "injected terminal rejection".to_string(),
        }
    }

    /// Restrict the fault to one version.
    #[must_use]
    pub const fn at_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

#[derive(Debug, Default)]
struct StoredSubject {
    versions: Vec<SchemaVersion>,
    compatibility: Option<CompatibilityMode>,
}

#[derive(Debug, Default)]
struct Inner {
    /// context → subject name → stored data. BTreeMap keeps listings sorted.
    contexts: BTreeMap<String, BTreeMap<String, StoredSubject>>,
    next_id: u32,
    faults: Vec<Fault>,
}

/// In-memory schema registry.
#[derive(Debug)]
pub struct MemoryRegistry {
    default_compatibility: Option<CompatibilityMode>,
    inner: Mutex<Inner>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    /// Empty registry with only the implicit default context and no
    /// registry-wide compatibility mode.
    #[must_use]
    pub fn new() -> Self {
        let mut inner = Inner {
            next_id: 1,
            ..Inner::default()
        };
        inner.contexts.insert(DEFAULT_CONTEXT.to_string(), BTreeMap::new());
        Self {
            default_compatibility: None,
            inner: Mutex::new(inner),
        }
    }

    /// Empty registry enforcing `mode` for subjects without an override.
    #[must_use]
    pub fn with_default_compatibility(mode: CompatibilityMode) -> Self {
        let mut registry = Self::new();
        registry.default_compatibility = Some(mode);
        registry
    }

    /// Arm a fault. Faults fire in insertion order; exhausted faults are
    /// discarded.
    pub fn inject_fault(&self, fault: Fault) {
        self.inner.lock().expect("registry lock").faults.push(fault);
    }

    /// Register a version directly, bypassing compatibility enforcement.
    /// Test setup helper.
    pub fn seed(&self, subject: &str, context: &str, schema: &str, schema_type: SchemaType) -> u32 {
        let mut inner = self.inner.lock().expect("registry lock");
        let id = inner.next_id;
        inner.next_id += 1;
        let stored = inner
            .contexts
            .entry(context.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default();
        let version = stored.versions.last().map_or(1, |v| v.version + 1);
        stored.versions.push(SchemaVersion {
            subject: subject.to_string(),
            context: context.to_string(),
            version,
            id: Some(id),
            schema: schema.to_string(),
            schema_type,
            references: Vec::new(),
        });
        id
    }

    /// Total number of stored versions across all contexts. Test assertion
    /// helper.
    #[must_use]
    pub fn version_count(&self) -> usize {
        let inner = self.inner.lock().expect("registry lock");
        inner
            .contexts
            .values()
            .flat_map(BTreeMap::values)
            .map(|s| s.versions.len())
            .sum()
    }

    fn take_fault(
        inner: &mut Inner,
        point: FaultPoint,
        subject: &str,
        version: Option<u32>,
    ) -> Option<RegistryError> {
        let idx = inner.faults.iter().position(|f| {
            f.point == point
                && f.remaining > 0
                && f.subject.as_deref().is_none_or(|s| s == subject)
                && (f.version.is_none() || f.version == version)
        })?;
        let fault = &mut inner.faults[idx];
        fault.remaining -= 1;
        let error = RegistryError::Api {
            status: fault.status,
            message: fault.message.clone(),
        };
        if fault.remaining == 0 {
            inner.faults.remove(idx);
        }
        Some(error)
    }

    fn effective_mode(&self, stored: &StoredSubject) -> Option<CompatibilityMode> {
        stored.compatibility.or(self.default_compatibility)
    }
}

#[async_trait::async_trait]
impl RegistryApi for MemoryRegistry {
    async fn list_contexts(&self) -> Result<Vec<String>, RegistryError> {
        let inner = self.inner.lock().expect("registry lock");
        Ok(inner.contexts.keys().cloned().collect())
    }

    async fn list_subjects(&self, context: &str) -> Result<Vec<String>, RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock");
        if let Some(error) = Self::take_fault(&mut inner, FaultPoint::ListSubjects, "", None) {
            return Err(error);
        }
        Ok(inner
            .contexts
            .get(context)
            .map(|subjects| {
                subjects
                    .iter()
                    .filter(|(_, s)| !s.versions.is_empty())
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_versions(
        &self,
        subject: &str,
        context: &str,
    ) -> Result<Vec<u32>, RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock");
        if let Some(error) = Self::take_fault(&mut inner, FaultPoint::ListVersions, subject, None) {
            return Err(error);
        }
        let stored = inner
            .contexts
            .get(context)
            .and_then(|subjects| subjects.get(subject))
            .filter(|s| !s.versions.is_empty())
            .ok_or_else(|| RegistryError::NotFound(format!("subject '{subject}'")))?;
        Ok(stored.versions.iter().map(|v| v.version).collect())
    }

    async fn get_schema(
        &self,
        subject: &str,
        version: u32,
        context: &str,
    ) -> Result<SchemaVersion, RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock");
        if let Some(error) =
            Self::take_fault(&mut inner, FaultPoint::GetSchema, subject, Some(version))
        {
            return Err(error);
        }
        inner
            .contexts
            .get(context)
            .and_then(|subjects| subjects.get(subject))
            .and_then(|s| s.versions.iter().find(|v| v.version == version))
            .cloned()
            .ok_or_else(|| {
                RegistryError::NotFound(format!("subject '{subject}' version {version}"))
            })
    }

    async fn register_schema(
        &self,
        subject: &str,
        context: &str,
        schema: &str,
        schema_type: SchemaType,
        references: &[SchemaReference],
    ) -> Result<u32, RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock");
        if let Some(error) = Self::take_fault(&mut inner, FaultPoint::RegisterSchema, subject, None)
        {
            return Err(error);
        }

        let stored = inner
            .contexts
            .entry(context.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default();

        // Registering an identical schema is a no-op returning the existing ID.
        if let Some(existing) = stored
            .versions
            .iter()
            .find(|v| schemas_equal(&v.schema, schema, schema_type))
        {
            return Ok(existing.id.unwrap_or_default());
        }

        if let Some(mode) = stored.compatibility.or(self.default_compatibility) {
            let priors: Vec<(u32, String)> = stored
                .versions
                .iter()
                .map(|v| (v.version, v.schema.clone()))
                .collect();
            let violations = predict_violations(schema, schema_type, &priors, mode);
            if let Some(first) = violations.first() {
                return Err(RegistryError::Api {
                    status: 409,
                    message: format!("incompatible schema: {first}"),
                });
            }
        }

        let version = stored.versions.last().map_or(1, |v| v.version + 1);
        let entry = SchemaVersion {
            subject: subject.to_string(),
            context: context.to_string(),
            version,
            id: None,
            schema: schema.to_string(),
            schema_type,
            references: references.to_vec(),
        };
        let id = inner.next_id;
        inner.next_id += 1;
        let stored = inner
            .contexts
            .get_mut(context)
            .and_then(|subjects| subjects.get_mut(subject))
            .expect("subject entry just created");
        stored.versions.push(SchemaVersion {
            id: Some(id),
            ..entry
        });
        Ok(id)
    }

    async fn get_compatibility(
        &self,
        subject: &str,
        context: &str,
    ) -> Result<Option<CompatibilityMode>, RegistryError> {
        let inner = self.inner.lock().expect("registry lock");
        Ok(inner
            .contexts
            .get(context)
            .and_then(|subjects| subjects.get(subject))
            .and_then(|s| s.compatibility))
    }

    async fn set_compatibility(
        &self,
        subject: &str,
        mode: CompatibilityMode,
        context: &str,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock");
        inner
            .contexts
            .entry(context.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default()
            .compatibility = Some(mode);
        Ok(())
    }

    async fn check_compatibility(
        &self,
        subject: &str,
        candidate: &str,
        schema_type: SchemaType,
        context: &str,
    ) -> Result<bool, RegistryError> {
        let inner = self.inner.lock().expect("registry lock");
        let Some(stored) = inner
            .contexts
            .get(context)
            .and_then(|subjects| subjects.get(subject))
        else {
            return Ok(true);
        };
        let Some(mode) = self.effective_mode(stored) else {
            return Ok(true);
        };
        let priors: Vec<(u32, String)> = stored
            .versions
            .iter()
            .map(|v| (v.version, v.schema.clone()))
            .collect();
        Ok(predict_violations(candidate, schema_type, &priors, mode).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const V1: &str = r#"{"type":"record","name":"User","fields":[{"name":"id","type":"long"}]}"#;
    const V2: &str = r#"{"type":"record","name":"User","fields":[{"name":"id","type":"long"},{"name":"name","type":"string","default":""}]}"#;

    #[tokio::test]
    async fn register_assigns_increasing_versions_and_unique_ids() {
        let registry = MemoryRegistry::new();
        let id1 = registry
            .register_schema("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro, &[])
            .await
            .unwrap();
        let id2 = registry
            .register_schema("user-value", DEFAULT_CONTEXT, V2, SchemaType::Avro, &[])
            .await
            .unwrap();
        assert_ne!(id1, id2);

        let versions = registry
            .list_versions("user-value", DEFAULT_CONTEXT)
            .await
            .unwrap();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn register_dedups_canonically_equal_schemas() {
        let registry = MemoryRegistry::new();
        let id1 = registry
            .register_schema("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro, &[])
            .await
            .unwrap();
        // Same document, different whitespace
        let reordered = V1.replace(',', ", ");
        let id2 = registry
            .register_schema(
                "user-value",
                DEFAULT_CONTEXT,
                &reordered,
                SchemaType::Avro,
                &[],
            )
            .await
            .unwrap();
        assert_eq!(id1, id2);
        assert_eq!(registry.version_count(), 1);
    }

    #[tokio::test]
    async fn register_enforces_compatibility() {
        let registry = MemoryRegistry::with_default_compatibility(CompatibilityMode::Backward);
        registry
            .register_schema("user-value", DEFAULT_CONTEXT, V2, SchemaType::Avro, &[])
            .await
            .unwrap();
        // V1 drops the defaulted "name" field — fine under BACKWARD.
        registry
            .register_schema("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro, &[])
            .await
            .unwrap();

        // Adding a required field with no default is rejected.
        let incompatible = r#"{"type":"record","name":"User","fields":[{"name":"id","type":"long"},{"name":"email","type":"string"}]}"#;
        let err = registry
            .register_schema(
                "user-value",
                DEFAULT_CONTEXT,
                incompatible,
                SchemaType::Avro,
                &[],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Api { status: 409, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn faults_fire_then_exhaust() {
        let registry = MemoryRegistry::new();
        registry.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        registry.inject_fault(Fault::transient(FaultPoint::GetSchema, "user-value", 1));

        let err = registry
            .get_schema("user-value", 1, DEFAULT_CONTEXT)
            .await
            .unwrap_err();
        assert!(err.is_transient());

        // Second call succeeds: the fault is exhausted.
        let version = registry
            .get_schema("user-value", 1, DEFAULT_CONTEXT)
            .await
            .unwrap();
        assert_eq!(version.version, 1);
    }

    #[tokio::test]
    async fn version_scoped_fault_leaves_other_versions_alone() {
        let registry = MemoryRegistry::new();
        registry.seed("user-value", DEFAULT_CONTEXT, V1, SchemaType::Avro);
        registry.seed("user-value", DEFAULT_CONTEXT, V2, SchemaType::Avro);
        registry.inject_fault(
            Fault::transient(FaultPoint::GetSchema, "user-value", 1).at_version(2),
        );

        assert!(registry.get_schema("user-value", 1, DEFAULT_CONTEXT).await.is_ok());
        assert!(registry.get_schema("user-value", 2, DEFAULT_CONTEXT).await.is_err());
        assert!(registry.get_schema("user-value", 2, DEFAULT_CONTEXT).await.is_ok());
    }

    #[tokio::test]
    async fn contexts_are_isolated() {
        let registry = MemoryRegistry::new();
        registry.seed("user-value", "staging", V1, SchemaType::Avro);

        let default_subjects = registry.list_subjects(DEFAULT_CONTEXT).await.unwrap();
        assert!(default_subjects.is_empty());

        let staging_subjects = registry.list_subjects("staging").await.unwrap();
        assert_eq!(staging_subjects, vec!["user-value".to_string()]);

        let contexts = registry.list_contexts().await.unwrap();
        assert_eq!(contexts, vec![DEFAULT_CONTEXT.to_string(), "staging".to_string()]);
    }

    #[tokio::test]
    async fn compatibility_override_roundtrip() {
        let registry = MemoryRegistry::new();
        assert_eq!(
            registry
                .get_compatibility("user-value", DEFAULT_CONTEXT)
                .await
                .unwrap(),
            None
        );
        registry
            .set_compatibility("user-value", CompatibilityMode::Full, DEFAULT_CONTEXT)
            .await
            .unwrap();
        assert_eq!(
            registry
                .get_compatibility("user-value", DEFAULT_CONTEXT)
                .await
                .unwrap(),
            Some(CompatibilityMode::Full)
        );
    }
}
