//! Static compatibility prediction over schema documents.
//!
//! Implements the forward/backward/full/transitive field rules a registry
//! enforces, as a pure function over schema texts. Used by the plan compiler
//! to classify risk before execution and by the in-memory registry to enforce
//! registration, so the two can never disagree.
//!
//! The check is deliberately conservative: a flagged operation is a risk, not
//! a rejection — the destination registry's own check at execution time is
//! authoritative. Protobuf definitions get no static prediction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::{CompatibilityMode, SchemaType};

/// One predicted compatibility rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatViolation {
    /// Mode whose rule is violated.
    pub mode: CompatibilityMode,
    /// Version of the prior schema the candidate was checked against.
    pub against_version: u32,
    /// Rule description naming the offending field.
    pub rule: String,
}

impl fmt::Display for CompatViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (vs version {}): {}",
            self.mode, self.against_version, self.rule
        )
    }
}

/// Check a candidate schema against prior versions under a compatibility mode.
///
/// `priors` is the subject's recorded history as `(version, schema_text)` in
/// ascending order. Non-transitive modes check against the latest prior only;
/// transitive modes check against all of them. Returns every violation found,
/// empty when the candidate is predicted compatible (or when nothing can be
/// predicted for the schema type).
#[must_use]
pub fn predict_violations(
    candidate: &str,
    schema_type: SchemaType,
    priors: &[(u32, String)],
    mode: CompatibilityMode,
) -> Vec<CompatViolation> {
    if mode == CompatibilityMode::None || priors.is_empty() || !schema_type.is_json_text() {
        return Vec::new();
    }
    let Some(candidate_fields) = extract_fields(candidate, schema_type) else {
        return Vec::new();
    };

    let checked: &[(u32, String)] = if mode.is_transitive() {
        priors
    } else {
        &priors[priors.len() - 1..]
    };

    let mut violations = Vec::new();
    for (version, prior) in checked {
        let Some(prior_fields) = extract_fields(prior, schema_type) else {
            continue;
        };
        if mode.requires_backward() {
            for rule in backward_rules(&candidate_fields, &prior_fields) {
                violations.push(CompatViolation {
                    mode,
                    against_version: *version,
                    rule,
                });
            }
        }
        if mode.requires_forward() {
            for rule in forward_rules(&candidate_fields, &prior_fields) {
                violations.push(CompatViolation {
                    mode,
                    against_version: *version,
                    rule,
                });
            }
        }
    }
    violations
}

/// Backward: consumers on the candidate schema must read data written with
/// the prior schema. Adding a field without a default breaks the read;
/// dropping a defaultless field silently loses required data, flagged as a
/// risk as well.
fn backward_rules(candidate: &FieldSet, prior: &FieldSet) -> Vec<String> {
    let mut rules = Vec::new();
    for (name, has_default) in candidate {
        if !prior.contains_key(name) && !has_default {
            rules.push(format!("field '{name}' added without default"));
        }
    }
    for (name, has_default) in prior {
        if !candidate.contains_key(name) && !has_default {
            rules.push(format!("field '{name}' removed without default"));
        }
    }
    rules
}

/// Forward: consumers on the prior schema must read data written with the
/// candidate. Removing a field the prior schema cannot default breaks it.
fn forward_rules(candidate: &FieldSet, prior: &FieldSet) -> Vec<String> {
    let mut rules = Vec::new();
    for (name, has_default) in prior {
        if !candidate.contains_key(name) && !has_default {
            rules.push(format!("field '{name}' removed without default"));
        }
    }
    rules
}

/// Field name → whether the field has a default (or is otherwise optional).
type FieldSet = BTreeMap<String, bool>;

/// Extract the top-level field set from an Avro record or a JSON Schema
/// object. Returns `None` when the document cannot be parsed or has no
/// field-like structure to compare.
fn extract_fields(schema: &str, schema_type: SchemaType) -> Option<FieldSet> {
    let value: serde_json::Value = serde_json::from_str(schema).ok()?;
    match schema_type {
        SchemaType::Avro => avro_fields(&value),
        SchemaType::Json => json_schema_fields(&value),
        SchemaType::Protobuf => None,
    }
}

fn avro_fields(value: &serde_json::Value) -> Option<FieldSet> {
    let fields = value.get("fields")?.as_array()?;
    let mut set = FieldSet::new();
    for field in fields {
        let name = field.get("name")?.as_str()?;
        let has_default = field.get("default").is_some() || is_nullable_union(field.get("type"));
        set.insert(name.to_string(), has_default);
    }
    Some(set)
}

/// Avro `["null", T]` unions read as absent-tolerant even without an explicit
/// default in most producer configurations; treat them as defaulted.
fn is_nullable_union(ty: Option<&serde_json::Value>) -> bool {
    ty.and_then(serde_json::Value::as_array)
        .is_some_and(|union| union.iter().any(|t| t.as_str() == Some("null")))
}

fn json_schema_fields(value: &serde_json::Value) -> Option<FieldSet> {
    let properties = value.get("properties")?.as_object()?;
    let required: Vec<&str> = value
        .get("required")
        .and_then(serde_json::Value::as_array)
        .map(|r| r.iter().filter_map(serde_json::Value::as_str).collect())
        .unwrap_or_default();

    let mut set = FieldSet::new();
    for (name, prop) in properties {
        let has_default = prop.get("default").is_some() || !required.contains(&name.as_str());
        set.insert(name.clone(), has_default);
    }
    Some(set)
}
