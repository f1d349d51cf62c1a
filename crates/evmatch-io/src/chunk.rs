//! Columnar chunk payloads and per-record materialization.
//!
//! Singleton and counter columns hold one value per record. Array columns
//! are flattened; a record's slice is located through prefix sums of its
//! counter column, built once when the chunk is loaded.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use evmatch_core::key::{CompositeKey, EVENT_FIELD, RUN_FIELD};
use evmatch_core::schema::{mirror_name, ChunkSchema, Field};
use evmatch_mem::{BufferManager, ScalarVec};

use crate::error::{Error, Result};

/// One named column of chunk data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ScalarVec,
}

impl Column {
    pub fn new(name: impl Into<String>, data: impl Into<ScalarVec>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Columnar payload of one container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkData {
    pub n_records: u64,
    pub columns: Vec<Column>,
}

impl ChunkData {
    pub fn column(&self, name: &str) -> Option<&ScalarVec> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.data)
    }
}

/// Build a validated (schema, data) pair from fields and raw columns.
///
/// Record count comes from the first non-array column; per-counter maxima
/// are computed from the counter columns. Array column lengths must equal
/// the sum of their counter's values.
pub fn build_chunk(fields: Vec<Field>, columns: Vec<Column>) -> Result<(ChunkSchema, ChunkData)> {
    let data_of = |name: &str| -> Result<&ScalarVec> {
        columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.data)
            .ok_or_else(|| Error::ChunkData(format!("no column for field '{name}'")))
    };

    let n_records = fields
        .iter()
        .find(|f| !f.is_array())
        .map(|f| data_of(&f.name).map(|d| d.len() as u64))
        .transpose()?
        .ok_or_else(|| Error::ChunkData("chunk has no singleton column".to_string()))?;

    let mut counter_max: BTreeMap<String, u32> = BTreeMap::new();
    for field in &fields {
        let Some(counter) = field.counter.as_deref() else {
            continue;
        };
        let counts = data_of(counter)?;
        if counts.len() as u64 != n_records {
            return Err(Error::ChunkData(format!(
                "counter '{counter}' has {} values for {n_records} records",
                counts.len()
            )));
        }
        let mut max = 0u32;
        let mut total = 0usize;
        for i in 0..counts.len() {
            let v = counts
                .get_u32(i)
                .ok_or_else(|| Error::ChunkData(format!("counter '{counter}' not integral")))?;
            max = max.max(v);
            total += v as usize;
        }
        let flat = data_of(&field.name)?;
        if flat.len() != total {
            return Err(Error::ChunkData(format!(
                "array '{}' holds {} values, counter sums to {total}",
                field.name,
                flat.len()
            )));
        }
        counter_max.insert(counter.to_string(), max);
    }

    for field in fields.iter().filter(|f| !f.is_array()) {
        let d = data_of(&field.name)?;
        if d.len() as u64 != n_records {
            return Err(Error::ChunkData(format!(
                "column '{}' has {} values for {n_records} records",
                field.name,
                d.len()
            )));
        }
    }

    let mut schema = ChunkSchema::new(fields);
    schema.counter_max = counter_max;
    Ok((
        schema,
        ChunkData {
            n_records,
            columns,
        },
    ))
}

/// One chunk held in memory, with counter prefix sums for array slicing.
#[derive(Debug)]
pub struct LoadedChunk {
    path: String,
    schema: ChunkSchema,
    data: ChunkData,
    /// counter name -> per-record start offsets into its flattened arrays.
    offsets: HashMap<String, Vec<u64>>,
}

impl LoadedChunk {
    pub fn new(path: String, schema: ChunkSchema, data: ChunkData) -> Result<Self> {
        let mut offsets: HashMap<String, Vec<u64>> = HashMap::new();
        for field in &schema.fields {
            let Some(counter) = field.counter.as_deref() else {
                continue;
            };
            if offsets.contains_key(counter) {
                continue;
            }
            let counts = data
                .column(counter)
                .ok_or_else(|| Error::MissingField {
                    path: path.clone(),
                    field: counter.to_string(),
                })?;
            let mut sums = Vec::with_capacity(counts.len() + 1);
            let mut acc = 0u64;
            sums.push(0);
            for i in 0..counts.len() {
                acc += u64::from(counts.get_u32(i).unwrap_or(0));
                sums.push(acc);
            }
            offsets.insert(counter.to_string(), sums);
        }

        // Every schema field must be backed by a column of consistent
        // length: n_records for singletons and counters, the counter's
        // prefix-sum total for flattened arrays. Externally produced
        // containers fail here, not mid-match.
        for field in &schema.fields {
            let col = data.column(&field.name).ok_or_else(|| Error::MissingField {
                path: path.clone(),
                field: field.name.clone(),
            })?;
            let expected = match field.counter.as_deref() {
                Some(counter) => offsets
                    .get(counter)
                    .and_then(|sums| sums.last())
                    .copied()
                    .unwrap_or(0),
                None => data.n_records,
            };
            if col.len() as u64 != expected {
                return Err(Error::BadContainer {
                    path: path.clone(),
                    reason: format!(
                        "column '{}' holds {} values, expected {}",
                        field.name,
                        col.len(),
                        expected
                    ),
                });
            }
        }

        Ok(Self {
            path,
            schema,
            data,
            offsets,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn schema(&self) -> &ChunkSchema {
        &self.schema
    }

    pub fn n_records(&self) -> u64 {
        self.data.n_records
    }

    /// Composite key of one record. Fatal if the key columns are absent.
    pub fn key(&self, row: usize) -> Result<CompositeKey> {
        let run = self
            .data
            .column(RUN_FIELD)
            .and_then(|c| c.get_u32(row))
            .ok_or_else(|| Error::MissingField {
                path: self.path.clone(),
                field: RUN_FIELD.to_string(),
            })?;
        let event = self
            .data
            .column(EVENT_FIELD)
            .and_then(|c| c.get_u64(row))
            .ok_or_else(|| Error::MissingField {
                path: self.path.clone(),
                field: EVENT_FIELD.to_string(),
            })?;
        Ok(CompositeKey::new(run, event))
    }

    /// Materialize one record into the bound buffers under `prefix`.
    ///
    /// Buffer capacities are guaranteed sufficient by the resync that runs
    /// before any read from a freshly crossed chunk.
    pub fn read_record_into(
        &self,
        row: usize,
        prefix: &str,
        buffers: &mut BufferManager,
    ) -> Result<()> {
        for field in &self.schema.fields {
            let col = self
                .data
                .column(&field.name)
                .ok_or_else(|| Error::MissingField {
                    path: self.path.clone(),
                    field: field.name.clone(),
                })?;
            let dest = mirror_name(&field.name, prefix);
            let range = match field.counter.as_deref() {
                None => row..row + 1,
                Some(counter) => {
                    let sums = self.offsets.get(counter).ok_or_else(|| {
                        Error::MissingField {
                            path: self.path.clone(),
                            field: counter.to_string(),
                        }
                    })?;
                    let start = sums[row] as usize;
                    let end = sums[row + 1] as usize;
                    start..end
                }
            };
            buffers.buffer_mut(&dest)?.copy_from(0, col, range)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmatch_core::schema::ScalarKind;

    fn test_chunk() -> (ChunkSchema, ChunkData) {
        build_chunk(
            vec![
                Field::singleton("run", ScalarKind::UInt32),
                Field::singleton("event", ScalarKind::UInt64),
                Field::singleton("nJet", ScalarKind::Int32),
                Field::array("Jet_pt", ScalarKind::Float32, "nJet"),
            ],
            vec![
                Column::new("run", vec![1u32, 1]),
                Column::new("event", vec![100u64, 101]),
                Column::new("nJet", vec![2i32, 1]),
                Column::new("Jet_pt", vec![10.0f32, 20.0, 30.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn counter_maxima_are_computed() {
        let (schema, data) = test_chunk();
        assert_eq!(schema.counter_max.get("nJet"), Some(&2));
        assert_eq!(data.n_records, 2);
    }

    #[test]
    fn keys_and_array_slices() {
        let (schema, data) = test_chunk();
        let chunk = LoadedChunk::new("t.evc".into(), schema, data).unwrap();
        assert_eq!(chunk.key(1).unwrap(), CompositeKey::new(1, 101));

        let mut mgr = BufferManager::new();
        mgr.register("nX.Jet", ScalarKind::Int32, None, 1, 2, "").unwrap();
        mgr.register("X.run", ScalarKind::UInt32, None, 1, 0, "").unwrap();
        mgr.register("X.event", ScalarKind::UInt64, None, 1, 0, "").unwrap();
        mgr.register(
            "X.Jet_pt",
            ScalarKind::Float32,
            Some("nX.Jet".into()),
            2,
            0,
            "",
        )
        .unwrap();

        chunk.read_record_into(0, "X.", &mut mgr).unwrap();
        assert_eq!(mgr.counter_value("nX.Jet").unwrap(), 2);
        assert_eq!(mgr.buffer("X.Jet_pt").unwrap().get_f64(1), Some(20.0));

        chunk.read_record_into(1, "X.", &mut mgr).unwrap();
        assert_eq!(mgr.counter_value("nX.Jet").unwrap(), 1);
        assert_eq!(mgr.buffer("X.Jet_pt").unwrap().get_f64(0), Some(30.0));
    }

    #[test]
    fn short_singleton_column_fails_at_load() {
        let (schema, mut data) = test_chunk();
        data.columns.retain(|c| c.name != "event");
        data.columns.push(Column::new("event", vec![100u64]));
        let res = LoadedChunk::new("t.evc".into(), schema, data);
        assert!(matches!(res, Err(Error::BadContainer { .. })));
    }

    #[test]
    fn array_column_shorter_than_counter_sum_fails_at_load() {
        let (schema, mut data) = test_chunk();
        data.columns.retain(|c| c.name != "Jet_pt");
        data.columns.push(Column::new("Jet_pt", vec![10.0f32, 20.0]));
        let res = LoadedChunk::new("t.evc".into(), schema, data);
        assert!(matches!(res, Err(Error::BadContainer { .. })));
    }

    #[test]
    fn mismatched_array_length_is_rejected() {
        let res = build_chunk(
            vec![
                Field::singleton("nJet", ScalarKind::Int32),
                Field::array("Jet_pt", ScalarKind::Float32, "nJet"),
            ],
            vec![
                Column::new("nJet", vec![2i32]),
                Column::new("Jet_pt", vec![10.0f32]),
            ],
        );
        assert!(res.is_err());
    }
}
