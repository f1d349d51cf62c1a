//! Field schemas for chunked columnar event data. Pure data; no IO here.
//!
//! A chunk carries its own schema snapshot: the field list plus the observed
//! maximum array length per counter. Array fields reference exactly one
//! counter field by name; several arrays may share one counter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Leading letter that marks a counter field name ("count of ...").
pub const COUNTER_MARKER: char = 'n';

/// Closed set of scalar element kinds a field can carry.
///
/// `Float16` and `Double32` are truncated-precision on-disk kinds of the
/// source format; in memory they are held as `f32`/`f64`. The distinction
/// is kept as metadata so output schemas round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float16,
    Double64,
    Double32,
    Int64,
    UInt64,
    Bool,
}

impl ScalarKind {
    /// In-memory bytes per element, used for pre-serialization size estimates.
    pub fn elem_size(self) -> usize {
        use ScalarKind::*;
        match self {
            Int8 | UInt8 | Bool => 1,
            Int16 | UInt16 => 2,
            Int32 | UInt32 | Float32 | Float16 => 4,
            Int64 | UInt64 | Double64 | Double32 => 8,
        }
    }
}

/// One named, typed column. Array iff `counter` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: ScalarKind,
    /// Name of the counter field holding this array's per-record length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<String>,
    /// Documentation string carried through mirroring unchanged.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

impl Field {
    pub fn singleton(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            counter: None,
            doc: String::new(),
        }
    }

    pub fn array(name: impl Into<String>, kind: ScalarKind, counter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            counter: Some(counter.into()),
            doc: String::new(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn is_array(&self) -> bool {
        self.counter.is_some()
    }
}

/// Schema snapshot of one chunk: ordered field list plus the observed
/// maximum array length per counter field in that chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSchema {
    pub fields: Vec<Field>,
    /// counter field name -> max value that counter takes in this chunk.
    #[serde(default)]
    pub counter_max: BTreeMap<String, u32>,
}

impl ChunkSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            counter_max: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Observed maximum length of an array field in this chunk (via its counter).
    pub fn observed_max(&self, field: &Field) -> u32 {
        field
            .counter
            .as_deref()
            .and_then(|c| self.counter_max.get(c).copied())
            .unwrap_or(0)
    }

    /// Fail unless every name in `names` is present.
    pub fn require_fields(&self, dataset: &str, names: &[&str]) -> Result<()> {
        for name in names {
            if self.field(name).is_none() {
                return Err(Error::MissingKeyField {
                    dataset: dataset.to_string(),
                    field: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Derive the destination name of a mirrored field.
///
/// Counter-marked names keep the marker first and take the prefix right
/// after it; everything else is plainly prefixed:
/// `nJet` + `X.` -> `nX.Jet`, `Jet_pt` + `X.` -> `X.Jet_pt`.
pub fn mirror_name(name: &str, prefix: &str) -> String {
    match name.strip_prefix(COUNTER_MARKER) {
        Some(rest) => format!("{COUNTER_MARKER}{prefix}{rest}"),
        None => format!("{prefix}{name}"),
    }
}
