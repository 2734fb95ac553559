// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Attribute values, name-value pairs, and data samples.
//!
//! A flow carries ordered lists of name-value pairs. The value kinds are
//! the ones the example scenarios need; anything richer belongs to the
//! real middleware and is out of scope here.

use std::sync::Arc;

use crate::schema::Schema;

/// Kind tag for [`Value`], used by structural schema checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer (sequence numbers).
    U64,
    /// 32-bit float (sensor readings).
    F32,
    /// UTF-8 string.
    Str,
    /// Opaque byte sequence (filler payloads).
    Bytes,
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U32(u32),
    U64(u64),
    F32(f32),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::U32(_) => ValueKind::U32,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::Str(_) => ValueKind::Str,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

/// A named attribute value.
#[derive(Debug, Clone, PartialEq)]
pub struct Nvp {
    pub name: String,
    pub value: Value,
}

impl Nvp {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Ordered attribute list carried by a sample.
pub type NvpSeq = Vec<Nvp>;

/// Find an attribute by name (first match wins).
pub fn lookup<'a>(data: &'a NvpSeq, name: &str) -> Option<&'a Value> {
    data.iter().find(|nvp| nvp.name == name).map(|nvp| &nvp.value)
}

/// Liveness marker carried by every sample.
///
/// `Purged` is the terminal marker a flow emits when it is intentionally
/// closed; readers use it to stop cleanly instead of waiting forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Normal data sample.
    Alive,
    /// The flow was closed by its writer; no further data will arrive.
    Purged,
}

/// One sample delivered on a flow.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Flow (topic) name the sample was delivered on.
    pub flow: String,
    /// Instance identifier distinguishing writers on a shared flow.
    pub flow_id: String,
    /// Liveness marker.
    pub state: FlowState,
    /// Schema the writer registered for the flow.
    pub schema: Arc<Schema>,
    /// Attribute payload; empty for `Purged` markers.
    pub data: NvpSeq,
}

impl Sample {
    /// True when this is a normal data sample.
    pub fn is_alive(&self) -> bool {
        self.state == FlowState::Alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_first_match() {
        let data = vec![
            Nvp::new("temperature", Value::F32(20.0)),
            Nvp::new("temperature", Value::F32(99.0)),
        ];
        assert_eq!(lookup(&data, "temperature"), Some(&Value::F32(20.0)));
        assert_eq!(lookup(&data, "humidity"), None);
    }

    #[test]
    fn test_value_kind_accessors() {
        assert_eq!(Value::U64(7).kind(), ValueKind::U64);
        assert_eq!(Value::U64(7).as_u64(), Some(7));
        assert_eq!(Value::U64(7).as_f32(), None);
        assert_eq!(Value::Bytes(vec![1, 2]).as_bytes(), Some(&[1u8, 2][..]));
    }
}
