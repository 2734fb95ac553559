// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema identity and the generation classification used by the
//! temperature dashboard.
//!
//! Flows are written under a registered schema: a named, versioned list
//! of tag definitions. The dashboard scenario receives samples written
//! under three different generations of the temperature schema and must
//! classify each one:
//!
//! 1. structurally compatible with the newest typed schema - then the
//!    humidity field decides between the two typed generations (a
//!    zero/absent humidity means the writer predates the field);
//! 2. otherwise legacy - the payload is treated as an untyped attribute
//!    list and scanned for a `temperature` field by name.

use std::sync::Arc;

use crate::river::{lookup, Sample, Value, ValueKind};

/// One tag (field) of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDef {
    pub name: String,
    pub kind: ValueKind,
}

/// A named, versioned attribute schema registered for a flow.
///
/// Identity is `name:namespace:version`, matching the class-id strings
/// used for discovery. Two schemas belong to the same typed lineage when
/// name and namespace agree; the legacy ad-hoc schemas live in their own
/// namespace, which is what keeps them out of the typed compatibility
/// check below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    namespace: String,
    version: String,
    tags: Vec<TagDef>,
}

impl Schema {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            version: version.into(),
            tags: Vec::new(),
        }
    }

    /// Add a tag definition (builder style).
    pub fn tag(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.tags.push(TagDef {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn tags(&self) -> &[TagDef] {
        &self.tags
    }

    /// Full identity string, e.g. `Temperature:com.naskel.example.typed:v3.0`.
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.name, self.namespace, self.version)
    }

    /// Structural compatibility test: can a sample written under `other`
    /// be read as this schema?
    ///
    /// Requires the same name and namespace (same typed lineage) and that
    /// every tag of `other` appears here with the same kind. Fields this
    /// schema defines but `other` lacks read as their zero value, which
    /// is exactly how older writers show up on newer readers.
    pub fn is_compatible(&self, other: &Schema) -> bool {
        if self.name != other.name || self.namespace != other.namespace {
            return false;
        }
        other.tags.iter().all(|tag| {
            self.tags
                .iter()
                .any(|own| own.name == tag.name && own.kind == tag.kind)
        })
    }
}

/// Namespace of the legacy ad-hoc schemas.
pub const LEGACY_NAMESPACE: &str = "com.naskel.example";
/// Namespace of the typed schema lineage.
pub const TYPED_NAMESPACE: &str = "com.naskel.example.typed";

/// First-generation temperature schema (legacy attribute list).
pub fn temperature_v1() -> Arc<Schema> {
    Arc::new(
        Schema::new("Temperature", LEGACY_NAMESPACE, "v1.0").tag("temperature", ValueKind::F32),
    )
}

/// Second-generation temperature schema (typed, temperature only).
pub fn temperature_v2() -> Arc<Schema> {
    Arc::new(Schema::new("Temperature", TYPED_NAMESPACE, "v2.0").tag("temperature", ValueKind::F32))
}

/// Third-generation temperature schema (typed, adds humidity).
pub fn temperature_v3() -> Arc<Schema> {
    Arc::new(
        Schema::new("Temperature", TYPED_NAMESPACE, "v3.0")
            .tag("temperature", ValueKind::F32)
            .tag("humidity", ValueKind::F32),
    )
}

/// Round-trip request schema (opaque payload).
pub fn ping() -> Arc<Schema> {
    Arc::new(Schema::new("Ping", LEGACY_NAMESPACE, "v1.0").tag("payload", ValueKind::Bytes))
}

/// Round-trip reply schema (opaque payload).
pub fn pong() -> Arc<Schema> {
    Arc::new(Schema::new("Pong", LEGACY_NAMESPACE, "v1.0").tag("payload", ValueKind::Bytes))
}

/// Throughput schema (sequence number plus filler payload).
pub fn throughput() -> Arc<Schema> {
    Arc::new(
        Schema::new("Throughput", LEGACY_NAMESPACE, "v1.0")
            .tag("sequencenumber", ValueKind::U64)
            .tag("sequencedata", ValueKind::Bytes),
    )
}

/// Which generation of the temperature schema a sample matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorGeneration {
    Gen1,
    Gen2,
    Gen3,
}

impl std::fmt::Display for SensorGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorGeneration::Gen1 => write!(f, "Gen1"),
            SensorGeneration::Gen2 => write!(f, "Gen2"),
            SensorGeneration::Gen3 => write!(f, "Gen3"),
        }
    }
}

/// A classified temperature reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub generation: SensorGeneration,
    pub temperature: f32,
    /// Zero for generations that predate the field.
    pub humidity: f32,
}

/// Classify a sample against the newest typed temperature schema.
///
/// Classification order matters: the typed check runs first, and only
/// incompatible samples fall back to the untyped name scan. A typed
/// sample whose humidity is exactly zero is indistinguishable from a
/// pre-humidity writer and is reported as such.
///
/// Returns `None` for samples whose shape cannot be read at all; those
/// are logged and skipped by the caller's loop.
pub fn classify_temperature(newest: &Schema, sample: &Sample) -> Option<TemperatureReading> {
    if newest.is_compatible(&sample.schema) {
        let temperature = lookup(&sample.data, "temperature")
            .and_then(Value::as_f32)
            .unwrap_or(0.0);
        let humidity = lookup(&sample.data, "humidity")
            .and_then(Value::as_f32)
            .unwrap_or(0.0);
        let generation = if humidity == 0.0 {
            SensorGeneration::Gen2
        } else {
            SensorGeneration::Gen3
        };
        return Some(TemperatureReading {
            generation,
            temperature,
            humidity,
        });
    }

    // Legacy fallback: untyped attribute list, single named field.
    match lookup(&sample.data, "temperature") {
        Some(Value::F32(t)) => Some(TemperatureReading {
            generation: SensorGeneration::Gen1,
            temperature: *t,
            humidity: 0.0,
        }),
        Some(other) => {
            log::warn!(
                "[Dashboard] skipping sample on flow {}: temperature has kind {:?}",
                sample.flow_id,
                other.kind()
            );
            None
        }
        None => Some(TemperatureReading {
            generation: SensorGeneration::Gen1,
            temperature: 0.0,
            humidity: 0.0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::river::{FlowState, Nvp, NvpSeq};

    fn sample_with(schema: Arc<Schema>, data: NvpSeq) -> Sample {
        Sample {
            flow: "temperature".to_string(),
            flow_id: "sensor-1".to_string(),
            state: FlowState::Alive,
            schema,
            data,
        }
    }

    #[test]
    fn test_schema_id_format() {
        assert_eq!(
            temperature_v3().id(),
            "Temperature:com.naskel.example.typed:v3.0"
        );
    }

    #[test]
    fn test_typed_lineage_compatibility() {
        let newest = temperature_v3();
        assert!(newest.is_compatible(&temperature_v2()));
        assert!(newest.is_compatible(&temperature_v3()));
        // Legacy namespace never passes the typed check.
        assert!(!newest.is_compatible(&temperature_v1()));
        // Unknown tags break compatibility.
        let wider =
            Schema::new("Temperature", TYPED_NAMESPACE, "v4.0").tag("pressure", ValueKind::F32);
        assert!(!newest.is_compatible(&wider));
    }

    #[test]
    fn test_classify_gen2_when_humidity_zero() {
        let newest = temperature_v3();
        let sample = sample_with(
            temperature_v2(),
            vec![Nvp::new("temperature", Value::F32(21.5))],
        );
        let reading = classify_temperature(&newest, &sample).unwrap();
        assert_eq!(reading.generation, SensorGeneration::Gen2);
        assert_eq!(reading.temperature, 21.5);
        assert_eq!(reading.humidity, 0.0);
    }

    #[test]
    fn test_classify_gen3_when_humidity_set() {
        let newest = temperature_v3();
        let sample = sample_with(
            temperature_v3(),
            vec![
                Nvp::new("temperature", Value::F32(21.5)),
                Nvp::new("humidity", Value::F32(48.0)),
            ],
        );
        let reading = classify_temperature(&newest, &sample).unwrap();
        assert_eq!(reading.generation, SensorGeneration::Gen3);
        assert_eq!(reading.humidity, 48.0);
    }

    #[test]
    fn test_classify_gen3_with_zero_humidity_reads_as_gen2() {
        // A typed writer reporting exactly 0.0 humidity cannot be told
        // apart from a pre-humidity writer. Pinned, not fixed.
        let newest = temperature_v3();
        let sample = sample_with(
            temperature_v3(),
            vec![
                Nvp::new("temperature", Value::F32(21.5)),
                Nvp::new("humidity", Value::F32(0.0)),
            ],
        );
        let reading = classify_temperature(&newest, &sample).unwrap();
        assert_eq!(reading.generation, SensorGeneration::Gen2);
    }

    #[test]
    fn test_classify_legacy_by_name_scan() {
        let newest = temperature_v3();
        let sample = sample_with(
            temperature_v1(),
            vec![Nvp::new("temperature", Value::F32(19.0))],
        );
        let reading = classify_temperature(&newest, &sample).unwrap();
        assert_eq!(reading.generation, SensorGeneration::Gen1);
        assert_eq!(reading.temperature, 19.0);
    }

    #[test]
    fn test_classify_malformed_field_is_skipped() {
        let newest = temperature_v3();
        let sample = sample_with(
            temperature_v1(),
            vec![Nvp::new("temperature", Value::Str("warm".to_string()))],
        );
        assert!(classify_temperature(&newest, &sample).is_none());
    }

    #[test]
    fn test_classify_legacy_without_field_defaults_to_zero() {
        let newest = temperature_v3();
        let sample = sample_with(temperature_v1(), Vec::new());
        let reading = classify_temperature(&newest, &sample).unwrap();
        assert_eq!(reading.generation, SensorGeneration::Gen1);
        assert_eq!(reading.temperature, 0.0);
    }
}
