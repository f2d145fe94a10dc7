//! Schema canonicalization for identity comparison.
//!
//! Registry-assigned IDs are registry-local and not portable, so schema
//! identity across registries is decided by canonical text equality. Avro
//! schemas and JSON Schemas are JSON documents: parsing and re-serializing
//! them normalizes key order and whitespace (serde_json keeps object keys
//! in sorted `BTreeMap` order). Protobuf definitions are not JSON and fall
//! back to whitespace-trimmed comparison.

use crate::enums::SchemaType;

/// Canonical form of a schema text for equality comparison.
///
/// For JSON-based schema types, returns the parsed document re-serialized
/// compactly with sorted keys. Unparseable input (and Protobuf) is returned
/// trimmed, so comparison degrades to exact-text rather than failing.
#[must_use]
pub fn canonicalize(schema: &str, schema_type: SchemaType) -> String {
    if schema_type.is_json_text() {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(schema) {
            // to_string on a Value cannot fail
            return serde_json::to_string(&value).unwrap_or_else(|_| schema.trim().to_string());
        }
    }
    schema.trim().to_string()
}

/// Whether two schema texts denote the same schema.
#[must_use]
pub fn schemas_equal(a: &str, b: &str, schema_type: SchemaType) -> bool {
    canonicalize(a, schema_type) == canonicalize(b, schema_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_order_and_whitespace_are_irrelevant_for_avro() {
        let a = r#"{"type": "record", "name": "User", "fields": []}"#;
        let b = "{\"fields\":[],\n  \"name\":\"User\",\"type\":\"record\"}";
        assert!(schemas_equal(a, b, SchemaType::Avro));
    }

    #[test]
    fn differing_documents_are_not_equal() {
        let a = r#"{"type":"record","name":"User","fields":[]}"#;
        let b = r#"{"type":"record","name":"Order","fields":[]}"#;
        assert!(!schemas_equal(a, b, SchemaType::Avro));
    }

    #[test]
    fn protobuf_compares_trimmed_text() {
        let a = "syntax = \"proto3\";\nmessage User {}\n";
        let b = "syntax = \"proto3\";\nmessage User {}";
        assert!(schemas_equal(a, b, SchemaType::Protobuf));

        let c = "syntax = \"proto3\";\nmessage  User {}";
        assert!(!schemas_equal(a, c, SchemaType::Protobuf));
    }

    #[test]
    fn unparseable_json_degrades_to_trimmed_text() {
        let a = "not json ";
        assert_eq!(canonicalize(a, SchemaType::Json), "not json");
        assert!(schemas_equal("not json", " not json  ", SchemaType::Json));
    }

    #[test]
    fn canonical_form_sorts_keys() {
        let canon = canonicalize(r#"{"b":1,"a":2}"#, SchemaType::Json);
        assert_eq!(canon, r#"{"a":2,"b":1}"#);
    }
}
