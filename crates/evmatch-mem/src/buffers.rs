//! Per-field buffer registry and the chunk-boundary resync pass.
//!
//! The manager is the sole owner of every merged-field buffer. Growth
//! replaces the buffer wholesale; the displaced allocation is dropped
//! exactly once, and no other handle to it can exist.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use evmatch_core::schema::{mirror_name, ChunkSchema, ScalarKind};

use crate::error::{Error, Result};
use crate::scalar::ScalarVec;
use crate::tracking::AllocTracker;

/// One merged-output field and its bound buffer.
#[derive(Debug)]
pub struct FieldBuffer {
    pub kind: ScalarKind,
    /// Mirrored counter name; `Some` iff this field is an array.
    pub counter: Option<String>,
    /// Element capacity of `buf`. Arrays start at max(1, chunk max); all
    /// other fields are fixed at 1 for their lifetime.
    pub capacity: u32,
    /// Counters only: declared upper bound over every array sharing this
    /// counter. Metadata; widening it never touches the counter's buffer.
    pub declared_max: u32,
    /// Documentation string copied through mirroring.
    pub doc: String,
    pub buf: ScalarVec,
}

/// Owns `merged field name -> (buffer, capacity, kind)` for the whole run.
#[derive(Debug, Default)]
pub struct BufferManager {
    order: Vec<String>,
    fields: HashMap<String, FieldBuffer>,
    tracker: AllocTracker,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a merged field with its initial capacity.
    ///
    /// Fields must be registered in merged-schema order; that order is what
    /// the segment writer later walks.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: ScalarKind,
        counter: Option<String>,
        capacity: u32,
        declared_max: u32,
        doc: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(Error::DuplicateField(name));
        }
        if let Some(c) = &counter {
            if !self.fields.contains_key(c) {
                return Err(Error::UnknownCounter {
                    field: name,
                    counter: c.clone(),
                });
            }
        }
        let capacity = capacity.max(1);
        self.tracker
            .record_alloc(kind.elem_size() * capacity as usize);
        self.fields.insert(
            name.clone(),
            FieldBuffer {
                kind,
                counter,
                capacity,
                declared_max,
                doc: doc.into(),
                buf: ScalarVec::alloc(kind, capacity as usize),
            },
        );
        self.order.push(name);
        Ok(())
    }

    /// Merged field names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn field(&self, name: &str) -> Result<&FieldBuffer> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    pub fn buffer(&self, name: &str) -> Result<&ScalarVec> {
        self.field(name).map(|f| &f.buf)
    }

    pub fn buffer_mut(&mut self, name: &str) -> Result<&mut ScalarVec> {
        self.fields
            .get_mut(name)
            .map(|f| &mut f.buf)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    pub fn capacity(&self, name: &str) -> Result<u32> {
        self.field(name).map(|f| f.capacity)
    }

    /// Current value of a counter field (per-record array length).
    pub fn counter_value(&self, name: &str) -> Result<usize> {
        let fb = self.field(name)?;
        fb.buf
            .get_usize(0)
            .ok_or_else(|| Error::BadCounterValue(name.to_string()))
    }

    /// Allocation statistics (live/peak bytes, reallocation count).
    pub fn tracker(&self) -> &AllocTracker {
        &self.tracker
    }

    /// Grow array buffers for one dataset after a chunk-boundary crossing.
    ///
    /// Walks `schema` in field order. Array fields sharing a counter grow in
    /// lock-step: the first grower widens the counter's declared maximum and
    /// marks it; later fields with a marked counter take that capacity
    /// without recomputing. Capacity is monotonic: a chunk maximum at or
    /// below the current capacity changes nothing.
    pub fn resync(&mut self, schema: &ChunkSchema, prefix: &str) -> Result<()> {
        let mut resized: HashSet<String> = HashSet::new();

        for field in &schema.fields {
            let Some(counter_src) = field.counter.as_deref() else {
                continue; // singletons are never resized
            };
            let dest = mirror_name(&field.name, prefix);
            let counter_dest = mirror_name(counter_src, prefix);

            if resized.contains(&counter_dest) {
                // A sibling sharing this counter already grew this pass.
                let new_cap = self.field(&counter_dest)?.declared_max.max(1);
                self.grow(&dest, new_cap)?;
            } else {
                let chunk_max = schema.observed_max(field);
                let cap = self.capacity(&dest)?;
                if chunk_max > cap {
                    self.grow(&dest, chunk_max)?;
                    let counter_fb = self
                        .fields
                        .get_mut(&counter_dest)
                        .ok_or_else(|| Error::UnknownField(counter_dest.clone()))?;
                    counter_fb.declared_max = counter_fb.declared_max.max(chunk_max);
                    resized.insert(counter_dest);
                }
            }
        }
        Ok(())
    }

    /// Replace a field's buffer with a fresh allocation of `new_cap` elements.
    fn grow(&mut self, name: &str, new_cap: u32) -> Result<()> {
        let fb = self
            .fields
            .get_mut(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        if new_cap <= fb.capacity {
            return Ok(());
        }
        let elem = fb.kind.elem_size();
        trace!(
            field = name,
            old_cap = fb.capacity,
            new_cap,
            "growing field buffer"
        );
        fb.buf = ScalarVec::alloc(fb.kind, new_cap as usize);
        self.tracker
            .record_realloc(elem * fb.capacity as usize, elem * new_cap as usize);
        fb.capacity = new_cap;
        Ok(())
    }
}
