//! `ScalarVec`: one typed contiguous buffer per storage class.
//!
//! The closed [`ScalarKind`] enumeration replaces type-name string matching
//! for allocate/free: allocation is the single generic
//! [`ScalarVec::alloc`] dispatch, and freeing is ownership (assigning a new
//! buffer drops the old one exactly once).
//!
//! Kinds collapse onto storage classes: `float16` is held as `f32`,
//! `double32` as `f64`. The kind itself stays in the field metadata.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use evmatch_core::schema::ScalarKind;

use crate::error::{Error, Result};

/// A contiguously allocated, typed buffer of scalar elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarVec {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
}

macro_rules! dispatch {
    ($val:expr, $v:ident => $body:expr) => {
        match $val {
            ScalarVec::I8($v) => $body,
            ScalarVec::U8($v) => $body,
            ScalarVec::I16($v) => $body,
            ScalarVec::U16($v) => $body,
            ScalarVec::I32($v) => $body,
            ScalarVec::U32($v) => $body,
            ScalarVec::I64($v) => $body,
            ScalarVec::U64($v) => $body,
            ScalarVec::F32($v) => $body,
            ScalarVec::F64($v) => $body,
            ScalarVec::Bool($v) => $body,
        }
    };
}

macro_rules! dispatch_pair {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr, $err:expr) => {
        match ($a, $b) {
            (ScalarVec::I8($x), ScalarVec::I8($y)) => $body,
            (ScalarVec::U8($x), ScalarVec::U8($y)) => $body,
            (ScalarVec::I16($x), ScalarVec::I16($y)) => $body,
            (ScalarVec::U16($x), ScalarVec::U16($y)) => $body,
            (ScalarVec::I32($x), ScalarVec::I32($y)) => $body,
            (ScalarVec::U32($x), ScalarVec::U32($y)) => $body,
            (ScalarVec::I64($x), ScalarVec::I64($y)) => $body,
            (ScalarVec::U64($x), ScalarVec::U64($y)) => $body,
            (ScalarVec::F32($x), ScalarVec::F32($y)) => $body,
            (ScalarVec::F64($x), ScalarVec::F64($y)) => $body,
            (ScalarVec::Bool($x), ScalarVec::Bool($y)) => $body,
            _ => $err,
        }
    };
}

impl ScalarVec {
    /// Allocate a zero-initialized buffer of `capacity` elements for `kind`.
    pub fn alloc(kind: ScalarKind, capacity: usize) -> Self {
        use ScalarKind::*;
        match kind {
            Int8 => ScalarVec::I8(vec![0; capacity]),
            UInt8 => ScalarVec::U8(vec![0; capacity]),
            Int16 => ScalarVec::I16(vec![0; capacity]),
            UInt16 => ScalarVec::U16(vec![0; capacity]),
            Int32 => ScalarVec::I32(vec![0; capacity]),
            UInt32 => ScalarVec::U32(vec![0; capacity]),
            Int64 => ScalarVec::I64(vec![0; capacity]),
            UInt64 => ScalarVec::U64(vec![0; capacity]),
            Float32 | Float16 => ScalarVec::F32(vec![0.0; capacity]),
            Double64 | Double32 => ScalarVec::F64(vec![0.0; capacity]),
            Bool => ScalarVec::Bool(vec![false; capacity]),
        }
    }

    /// Allocate an empty buffer for `kind` (accumulator use).
    pub fn empty(kind: ScalarKind) -> Self {
        Self::alloc(kind, 0)
    }

    /// Name of this buffer's storage class, for diagnostics.
    pub fn storage_name(&self) -> &'static str {
        match self {
            ScalarVec::I8(_) => "i8",
            ScalarVec::U8(_) => "u8",
            ScalarVec::I16(_) => "i16",
            ScalarVec::U16(_) => "u16",
            ScalarVec::I32(_) => "i32",
            ScalarVec::U32(_) => "u32",
            ScalarVec::I64(_) => "i64",
            ScalarVec::U64(_) => "u64",
            ScalarVec::F32(_) => "f32",
            ScalarVec::F64(_) => "f64",
            ScalarVec::Bool(_) => "bool",
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if this buffer's storage class matches what `kind` allocates.
    pub fn matches_kind(&self, kind: ScalarKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&Self::alloc(kind, 0))
    }

    /// Copy `src[range]` into `self` starting at `offset`.
    ///
    /// Both buffers must hold the same storage class, and the target slots
    /// must already exist (buffers are capacity-allocated, not grown here).
    pub fn copy_from(&mut self, offset: usize, src: &ScalarVec, range: Range<usize>) -> Result<()> {
        let count = range.len();
        if range.end > src.len() {
            return Err(Error::OutOfBounds {
                offset: range.start,
                count,
                len: src.len(),
            });
        }
        let dst_len = self.len();
        if offset + count > dst_len {
            return Err(Error::OutOfBounds {
                offset,
                count,
                len: dst_len,
            });
        }
        let expected = src.storage_name();
        let actual = self.storage_name();
        dispatch_pair!(
            self, src, dst, s => {
                dst[offset..offset + count].copy_from_slice(&s[range]);
                Ok(())
            },
            Err(Error::StorageMismatch {
                field: String::new(),
                expected,
                actual,
            })
        )
    }

    /// Append `src[range]` onto the end of `self` (accumulator use).
    pub fn extend_from(&mut self, src: &ScalarVec, range: Range<usize>) -> Result<()> {
        if range.end > src.len() {
            return Err(Error::OutOfBounds {
                offset: range.start,
                count: range.len(),
                len: src.len(),
            });
        }
        let expected = src.storage_name();
        let actual = self.storage_name();
        dispatch_pair!(
            self, src, dst, s => {
                dst.extend_from_slice(&s[range]);
                Ok(())
            },
            Err(Error::StorageMismatch {
                field: String::new(),
                expected,
                actual,
            })
        )
    }

    /// Read an element as u32 (key/counter columns).
    pub fn get_u32(&self, idx: usize) -> Option<u32> {
        match self {
            ScalarVec::U32(v) => v.get(idx).copied(),
            ScalarVec::I32(v) => v.get(idx).and_then(|&x| u32::try_from(x).ok()),
            ScalarVec::U16(v) => v.get(idx).map(|&x| x as u32),
            ScalarVec::U8(v) => v.get(idx).map(|&x| x as u32),
            ScalarVec::I16(v) => v.get(idx).and_then(|&x| u32::try_from(x).ok()),
            ScalarVec::I8(v) => v.get(idx).and_then(|&x| u32::try_from(x).ok()),
            _ => None,
        }
    }

    /// Read an element as u64 (key columns).
    pub fn get_u64(&self, idx: usize) -> Option<u64> {
        match self {
            ScalarVec::U64(v) => v.get(idx).copied(),
            ScalarVec::I64(v) => v.get(idx).and_then(|&x| u64::try_from(x).ok()),
            _ => self.get_u32(idx).map(u64::from),
        }
    }

    /// Read an element as a length (counter values are never negative).
    pub fn get_usize(&self, idx: usize) -> Option<usize> {
        self.get_u64(idx).map(|v| v as usize)
    }

    /// Read an element as f64 (test/diagnostic use).
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        match self {
            ScalarVec::F32(v) => v.get(idx).map(|&x| x as f64),
            ScalarVec::F64(v) => v.get(idx).copied(),
            _ => self.get_u64(idx).map(|v| v as f64),
        }
    }
}

macro_rules! from_vec {
    ($t:ty, $variant:ident) => {
        impl From<Vec<$t>> for ScalarVec {
            fn from(v: Vec<$t>) -> Self {
                ScalarVec::$variant(v)
            }
        }
    };
}

from_vec!(i8, I8);
from_vec!(u8, U8);
from_vec!(i16, I16);
from_vec!(u16, U16);
from_vec!(i32, I32);
from_vec!(u32, U32);
from_vec!(i64, I64);
from_vec!(u64, U64);
from_vec!(f32, F32);
from_vec!(f64, F64);
from_vec!(bool, Bool);
