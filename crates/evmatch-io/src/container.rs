//! Self-contained `.evc` container: header, schema, payload, checksum.
//!
//! Layout on disk:
//! [ magic: u32 ][ version: u16 ][ reserved: u16 ]
//! [ n_records: u64 ][ schema_len: u64 ][ payload_len: u64 ]
//! [ schema JSON ][ payload JSON ][ checksum: 32 bytes ]
//!
//! The checksum is blake3 over (header || schema || payload). Record count
//! lives in the header so role resolution can count a dataset from headers
//! alone, without deserializing any payload.

use evmatch_core::schema::ChunkSchema;

use crate::chunk::ChunkData;
use crate::error::{Error, Result};
use crate::storage::Storage;

pub const MAGIC: u32 = 0x43_4D_56_45; // "EVMC"
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 2 + 8 + 8 + 8;
pub const CHECKSUM_LEN: usize = 32;

/// File extension of chunk and segment containers.
pub const CONTAINER_EXT: &str = "evc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: u32,
    pub version: u16,
    pub n_records: u64,
    pub schema_len: u64,
    pub payload_len: u64,
}

/// Caller guarantees `b.len() == 8`.
fn le_u64(b: &[u8]) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(b);
    u64::from_le_bytes(a)
}

impl ContainerHeader {
    pub fn new(n_records: u64, schema_len: u64, payload_len: u64) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            n_records,
            schema_len,
            payload_len,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // reserved
        out.extend_from_slice(&self.n_records.to_le_bytes());
        out.extend_from_slice(&self.schema_len.to_le_bytes());
        out.extend_from_slice(&self.payload_len.to_le_bytes());
        out
    }

    pub fn from_bytes(path: &str, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::BadContainer {
                path: path.to_string(),
                reason: "short header".to_string(),
            });
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        // bytes[6..8] reserved
        let n_records = le_u64(&bytes[8..16]);
        let schema_len = le_u64(&bytes[16..24]);
        let payload_len = le_u64(&bytes[24..32]);

        if magic != MAGIC || version != VERSION {
            return Err(Error::BadContainer {
                path: path.to_string(),
                reason: "bad magic/version".to_string(),
            });
        }

        Ok(Self {
            magic,
            version,
            n_records,
            schema_len,
            payload_len,
        })
    }

    /// Reject headers whose lengths would drive oversized allocations.
    pub fn validate_sizes(&self, path: &str, max_section: u64) -> Result<()> {
        if self.schema_len > max_section || self.payload_len > max_section {
            return Err(Error::BadContainer {
                path: path.to_string(),
                reason: format!(
                    "section lengths {}/{} exceed max {}",
                    self.schema_len, self.payload_len, max_section
                ),
            });
        }
        Ok(())
    }
}

/// Serialize a container to bytes: header, schema, payload, checksum.
///
/// Also the measurement path for the fixed per-segment header cost: encode
/// an empty container once and take its length.
pub fn encode(schema: &ChunkSchema, data: &ChunkData) -> Result<Vec<u8>> {
    let schema_bytes = serde_json::to_vec(schema)?;
    let payload_bytes = serde_json::to_vec(data)?;
    let header = ContainerHeader::new(
        data.n_records,
        schema_bytes.len() as u64,
        payload_bytes.len() as u64,
    );
    let header_bytes = header.to_bytes();

    let mut out =
        Vec::with_capacity(HEADER_LEN + schema_bytes.len() + payload_bytes.len() + CHECKSUM_LEN);
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&schema_bytes);
    out.extend_from_slice(&payload_bytes);

    let checksum: [u8; 32] = blake3::hash(&out).into();
    out.extend_from_slice(&checksum);
    Ok(out)
}

/// Write a container to `path`. Returns the number of bytes written.
pub fn write(storage: &dyn Storage, path: &str, schema: &ChunkSchema, data: &ChunkData) -> Result<u64> {
    let bytes = encode(schema, data)?;
    storage.write(path, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Read only the fixed header (cheap; used for record counting).
pub fn read_header(storage: &dyn Storage, path: &str) -> Result<ContainerHeader> {
    let bytes = storage.read_range(path, 0, HEADER_LEN)?;
    ContainerHeader::from_bytes(path, &bytes)
}

/// Read and verify a whole container.
pub fn read(storage: &dyn Storage, path: &str) -> Result<(ChunkSchema, ChunkData)> {
    let total = storage.size(path)? as usize;
    let bytes = storage.read_range(path, 0, total)?;
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(Error::BadContainer {
            path: path.to_string(),
            reason: "container too short".to_string(),
        });
    }

    let header = ContainerHeader::from_bytes(path, &bytes[..HEADER_LEN])?;
    header.validate_sizes(path, 1 << 34)?; // 16 GiB sanity limit per section

    let schema_end = HEADER_LEN + header.schema_len as usize;
    let payload_end = schema_end + header.payload_len as usize;
    if bytes.len() < payload_end + CHECKSUM_LEN {
        return Err(Error::BadContainer {
            path: path.to_string(),
            reason: "truncated container".to_string(),
        });
    }

    let computed: [u8; 32] = blake3::hash(&bytes[..payload_end]).into();
    if computed != bytes[payload_end..payload_end + CHECKSUM_LEN] {
        return Err(Error::ChecksumMismatch(path.to_string()));
    }

    let schema: ChunkSchema = serde_json::from_slice(&bytes[HEADER_LEN..schema_end])?;
    let data: ChunkData = serde_json::from_slice(&bytes[schema_end..payload_end])?;

    if data.n_records != header.n_records {
        return Err(Error::BadContainer {
            path: path.to_string(),
            reason: format!(
                "record count mismatch: header {} vs payload {}",
                header.n_records, data.n_records
            ),
        });
    }

    Ok((schema, data))
}
