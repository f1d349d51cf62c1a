//! Schema mirroring: derive merged-output fields from a chunk schema and
//! seed the buffer manager.

use evmatch_core::error::Error as CoreError;
use evmatch_core::schema::{mirror_name, ChunkSchema, Field};
use evmatch_mem::error::Error as MemError;
use evmatch_mem::BufferManager;

use crate::error::{Error, Result};

/// Mirror one dataset's schema under `prefix` into `buffers`.
///
/// Walks the field list in order, so counters must precede the arrays that
/// reference them (the source format guarantees this). For each field the
/// destination name is `mirror_name`, the doc string is copied unchanged,
/// and the initial capacity is max(1, the chunk's observed maximum) for
/// arrays, 1 for everything else. Counters record the chunk's observed
/// maximum as their declared upper bound.
///
/// Both sides mirror into the same manager; a destination-name collision
/// between them is fatal.
pub fn mirror_into(schema: &ChunkSchema, prefix: &str, buffers: &mut BufferManager) -> Result<()> {
    for field in &schema.fields {
        let dest = mirror_name(&field.name, prefix);
        let counter_dest = field.counter.as_deref().map(|c| mirror_name(c, prefix));
        let capacity = if field.is_array() {
            schema.observed_max(field).max(1)
        } else {
            1
        };
        // A field is a counter iff some array in this schema references it.
        let declared_max = schema.counter_max.get(&field.name).copied().unwrap_or(0);
        buffers
            .register(
                dest.clone(),
                field.kind,
                counter_dest,
                capacity,
                declared_max,
                field.doc.clone(),
            )
            .map_err(|e| match e {
                MemError::DuplicateField(name) => Error::Core(CoreError::NameCollision(name)),
                other => Error::Mem(other),
            })?;
    }
    Ok(())
}

/// Reconstruct the merged schema from the seeded buffer manager.
///
/// Used when persisting a segment: field order is registration order and
/// per-counter maxima come from the (possibly widened) declared bounds.
pub fn merged_schema(buffers: &BufferManager) -> Result<ChunkSchema> {
    let mut fields = Vec::with_capacity(buffers.len());
    let mut schema = ChunkSchema::new(Vec::new());
    for name in buffers.names() {
        let fb = buffers.field(name)?;
        fields.push(Field {
            name: name.to_string(),
            kind: fb.kind,
            counter: fb.counter.clone(),
            doc: fb.doc.clone(),
        });
        if fb.counter.is_none() && fb.declared_max > 0 {
            schema.counter_max.insert(name.to_string(), fb.declared_max);
        }
    }
    schema.fields = fields;
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmatch_core::schema::ScalarKind;

    fn side_schema() -> ChunkSchema {
        let mut s = ChunkSchema::new(vec![
            Field::singleton("run", ScalarKind::UInt32),
            Field::singleton("nJet", ScalarKind::Int32).with_doc("number of jets"),
            Field::array("Jet_pt", ScalarKind::Float32, "nJet").with_doc("jet pT"),
        ]);
        s.counter_max.insert("nJet".into(), 4);
        s
    }

    #[test]
    fn mirrors_names_capacities_and_docs() {
        let mut buffers = BufferManager::new();
        mirror_into(&side_schema(), "ZB.", &mut buffers).unwrap();

        assert_eq!(buffers.capacity("ZB.run").unwrap(), 1);
        assert_eq!(buffers.capacity("nZB.Jet").unwrap(), 1);
        assert_eq!(buffers.capacity("ZB.Jet_pt").unwrap(), 4);
        assert_eq!(buffers.field("nZB.Jet").unwrap().declared_max, 4);
        assert_eq!(buffers.field("ZB.Jet_pt").unwrap().doc, "jet pT");
        assert_eq!(
            buffers.field("ZB.Jet_pt").unwrap().counter.as_deref(),
            Some("nZB.Jet")
        );
    }

    #[test]
    fn both_sides_share_one_manager_without_collisions() {
        let mut buffers = BufferManager::new();
        mirror_into(&side_schema(), "ZB.", &mut buffers).unwrap();
        mirror_into(&side_schema(), "AlCa.", &mut buffers).unwrap();
        assert_eq!(buffers.len(), 6);

        // Same prefix twice collides.
        let err = mirror_into(&side_schema(), "ZB.", &mut buffers);
        assert!(matches!(
            err,
            Err(Error::Core(CoreError::NameCollision(_)))
        ));
    }

    #[test]
    fn merged_schema_round_trips_counter_bounds() {
        let mut buffers = BufferManager::new();
        mirror_into(&side_schema(), "X.", &mut buffers).unwrap();
        let merged = merged_schema(&buffers).unwrap();
        assert_eq!(merged.fields.len(), 3);
        assert_eq!(merged.counter_max.get("nX.Jet"), Some(&4));
        assert_eq!(merged.fields[2].counter.as_deref(), Some("nX.Jet"));
    }
}
