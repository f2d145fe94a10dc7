//! Serde roundtrip tests for every model type that crosses a crate boundary.
//!
//! The archive codec and CLI output both rely on these types surviving
//! serialization unchanged.

use chrono::{TimeZone, Utc};
use sreg_core::{
    CaptureGap, CompatibilityMode, ContextSnapshot, DEFAULT_CONTEXT, MigrationOperation,
    MigrationPlan, MigrationReport, MigrationSnapshot, OperationOutcome, PlannedOperation,
    RiskClass, SchemaReference, SchemaType, SchemaVersion, Subject,
};

macro_rules! roundtrip {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;
            let json = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json).unwrap();
            assert_eq!(recovered, val, "serde roundtrip failed for {}", stringify!($ty));
        }
    };
}

fn sample_version() -> SchemaVersion {
    SchemaVersion {
        subject: "user-value".to_string(),
        context: DEFAULT_CONTEXT.to_string(),
        version: 2,
        id: Some(17),
        schema: r#"{"type":"record","name":"User","fields":[{"name":"id","type":"long"}]}"#
            .to_string(),
        schema_type: SchemaType::Avro,
        references: vec![SchemaReference {
            name: "com.example.Address".to_string(),
            subject: "address-value".to_string(),
            version: 1,
        }],
    }
}

fn sample_snapshot() -> MigrationSnapshot {
    MigrationSnapshot {
        source: "http://localhost:8081".to_string(),
        captured_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        contexts: vec![
            ContextSnapshot {
                name: DEFAULT_CONTEXT.to_string(),
                is_default: true,
                subjects: vec![Subject {
                    name: "user-value".to_string(),
                    context: DEFAULT_CONTEXT.to_string(),
                    versions: vec![sample_version()],
                    compatibility: Some(CompatibilityMode::BackwardTransitive),
                }],
            },
            ContextSnapshot {
                name: "staging".to_string(),
                is_default: false,
                subjects: Vec::new(),
            },
        ],
        gaps: vec![CaptureGap {
            subject: "user-value".to_string(),
            context: DEFAULT_CONTEXT.to_string(),
            version: 1,
            cause: "HTTP error: connection reset".to_string(),
        }],
    }
}

roundtrip!(schema_version_roundtrip, SchemaVersion, sample_version());

roundtrip!(snapshot_roundtrip, MigrationSnapshot, sample_snapshot());

roundtrip!(
    plan_roundtrip,
    MigrationPlan,
    MigrationPlan {
        operations: vec![
            PlannedOperation {
                op: MigrationOperation::CreateContext {
                    context: "staging".to_string(),
                },
                risk: RiskClass::Safe,
                justification: "context missing at destination".to_string(),
            },
            PlannedOperation {
                op: MigrationOperation::RegisterSchema {
                    subject: "user-value".to_string(),
                    context: "staging".to_string(),
                    schema: "{}".to_string(),
                    schema_type: SchemaType::Json,
                    references: Vec::new(),
                    expected_version: 1,
                },
                risk: RiskClass::CompatibilityRisk,
                justification: "BACKWARD: field 'email' removed without default".to_string(),
            },
            PlannedOperation {
                op: MigrationOperation::SetCompatibility {
                    subject: "user-value".to_string(),
                    context: "staging".to_string(),
                    mode: CompatibilityMode::Full,
                },
                risk: RiskClass::Safe,
                justification: "destination mode differs (NONE)".to_string(),
            },
        ],
    }
);

roundtrip!(report_roundtrip, MigrationReport, {
    let mut report = MigrationReport {
        dry_run: true,
        ..MigrationReport::default()
    };
    report.record(
        PlannedOperation {
            op: MigrationOperation::Noop {
                subject: "user-value".to_string(),
                context: DEFAULT_CONTEXT.to_string(),
                version: 1,
                reason: "already present".to_string(),
            },
            risk: RiskClass::Safe,
            justification: "already present".to_string(),
        },
        OperationOutcome::Skipped {
            reason: "already present".to_string(),
        },
    );
    report.cancelled_at = Some(1);
    report
});

#[test]
fn snapshot_json_omits_empty_gaps() {
    let mut snapshot = sample_snapshot();
    snapshot.gaps.clear();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json.get("gaps").is_none());
}
