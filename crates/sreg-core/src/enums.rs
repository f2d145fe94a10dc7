//! Schema types, compatibility modes, and plan risk classes.
//!
//! All enums use `SCREAMING_SNAKE_CASE` serialization to match the wire
//! vocabulary of schema registries (`AVRO`, `BACKWARD_TRANSITIVE`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// SchemaType
// ---------------------------------------------------------------------------

/// Serialization format of a schema document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaType {
    #[default]
    Avro,
    Json,
    Protobuf,
}

impl SchemaType {
    /// Registry wire name for this schema type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avro => "AVRO",
            Self::Json => "JSON",
            Self::Protobuf => "PROTOBUF",
        }
    }

    /// Whether schema documents of this type are JSON texts.
    ///
    /// Avro schemas and JSON Schemas are JSON documents and can be compared
    /// canonically; Protobuf definitions are not.
    #[must_use]
    pub const fn is_json_text(self) -> bool {
        matches!(self, Self::Avro | Self::Json)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVRO" | "" => Ok(Self::Avro),
            "JSON" => Ok(Self::Json),
            "PROTOBUF" => Ok(Self::Protobuf),
            other => Err(format!("unknown schema type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// CompatibilityMode
// ---------------------------------------------------------------------------

/// Rule set governing whether a new schema version is accepted relative to
/// prior versions of the same subject.
///
/// Non-transitive modes check the candidate against the latest version only;
/// transitive modes check it against every recorded version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatibilityMode {
    None,
    Backward,
    BackwardTransitive,
    Forward,
    ForwardTransitive,
    Full,
    FullTransitive,
}

impl CompatibilityMode {
    /// Registry wire name for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Backward => "BACKWARD",
            Self::BackwardTransitive => "BACKWARD_TRANSITIVE",
            Self::Forward => "FORWARD",
            Self::ForwardTransitive => "FORWARD_TRANSITIVE",
            Self::Full => "FULL",
            Self::FullTransitive => "FULL_TRANSITIVE",
        }
    }

    /// Whether the candidate must be checked against all prior versions
    /// rather than just the latest.
    #[must_use]
    pub const fn is_transitive(self) -> bool {
        matches!(
            self,
            Self::BackwardTransitive | Self::ForwardTransitive | Self::FullTransitive
        )
    }

    /// Whether this mode requires the candidate to read data written by
    /// prior versions.
    #[must_use]
    pub const fn requires_backward(self) -> bool {
        matches!(
            self,
            Self::Backward | Self::BackwardTransitive | Self::Full | Self::FullTransitive
        )
    }

    /// Whether this mode requires prior versions to read data written by
    /// the candidate.
    #[must_use]
    pub const fn requires_forward(self) -> bool {
        matches!(
            self,
            Self::Forward | Self::ForwardTransitive | Self::Full | Self::FullTransitive
        )
    }
}

impl fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompatibilityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "BACKWARD" => Ok(Self::Backward),
            "BACKWARD_TRANSITIVE" => Ok(Self::BackwardTransitive),
            "FORWARD" => Ok(Self::Forward),
            "FORWARD_TRANSITIVE" => Ok(Self::ForwardTransitive),
            "FULL" => Ok(Self::Full),
            "FULL_TRANSITIVE" => Ok(Self::FullTransitive),
            other => Err(format!("unknown compatibility mode: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// RiskClass
// ---------------------------------------------------------------------------

/// Risk classification attached to every planned operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    /// No predicted obstacle at the destination.
    Safe,
    /// The destination may reject or regret this operation (predicted
    /// compatibility violation, or a forced overwrite).
    CompatibilityRisk,
    /// The destination holds a different schema in the target slot and the
    /// conflict policy forbids auto-resolution.
    Conflict,
}

impl RiskClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::CompatibilityRisk => "compatibility_risk",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
