//! The wire type catalogue.
//!
//! One immutable entry per supported oid, compiled in and read-only for the
//! life of the process. Lookups never crash on an unknown oid, they return
//! [`None`] and callers surface [`DecodeError::Unsupported`] carrying the
//! numeric oid.
use bytes::Bytes;

use super::Oid;
use crate::{decode, decode::DecodeError, value::Value};

/// Wire width of a catalogued type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireSize {
    /// Fixed payload width in bytes.
    Fixed(u8),
    /// Length-prefixed by the surrounding message.
    Variable,
}

/// One entry of the catalogue: a wire type and its decode rule.
pub struct WireType {
    pub oid: Oid,
    pub name: &'static str,
    pub size: WireSize,
    /// `true` for array-of-scalar types.
    pub array: bool,
    decode: fn(Oid, Bytes) -> Result<Value, DecodeError>,
}

impl WireType {
    /// Decode a cell payload as this type.
    pub fn decode(&self, payload: Bytes) -> Result<Value, DecodeError> {
        (self.decode)(self.oid, payload)
    }
}

impl std::fmt::Debug for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireType")
            .field("oid", &self.oid)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("array", &self.array)
            .finish()
    }
}

macro_rules! wire {
    ($oid:literal, $name:literal, $size:expr, $decode:path) => {
        WireType {
            oid: $oid,
            name: $name,
            size: $size,
            array: false,
            decode: $decode,
        }
    };
    (array $oid:literal, $name:literal, $decode:path) => {
        WireType {
            oid: $oid,
            name: $name,
            size: WireSize::Variable,
            array: true,
            decode: $decode,
        }
    };
}

use WireSize::{Fixed, Variable};

/// Sorted by oid, [`lookup`] runs a binary search.
///
/// Types carrying [`decode::unsupported`] are catalogued for their width
/// metadata but have no host representation yet.
static CATALOGUE: &[WireType] = &[
    wire!(16, "bool", Fixed(1), decode::bool_),
    wire!(17, "bytea", Variable, decode::bytea),
    wire!(18, "char", Fixed(1), decode::unsupported),
    wire!(20, "int8", Fixed(8), decode::int8),
    wire!(21, "int2", Fixed(2), decode::int2),
    wire!(23, "int4", Fixed(4), decode::int4),
    wire!(25, "text", Variable, decode::text),
    wire!(700, "float4", Fixed(4), decode::float4),
    wire!(701, "float8", Fixed(8), decode::float8),
    wire!(array 1007, "int4[]", decode::int4_array),
    wire!(array 1009, "text[]", decode::text_array),
    wire!(array 1021, "float4[]", decode::float4_array),
    wire!(1082, "date", Fixed(4), decode::unsupported),
    wire!(1083, "time", Fixed(8), decode::unsupported),
    wire!(1114, "timestamp", Fixed(8), decode::unsupported),
    wire!(1184, "timestamptz", Fixed(8), decode::unsupported),
    wire!(1186, "interval", Fixed(16), decode::unsupported),
    wire!(1266, "timetz", Fixed(12), decode::unsupported),
    wire!(2249, "record", Variable, decode::unsupported),
    wire!(2950, "uuid", Fixed(16), decode::unsupported),
];

/// Find the catalogue entry for `oid`.
pub fn lookup(oid: Oid) -> Option<&'static WireType> {
    CATALOGUE
        .binary_search_by_key(&oid, |ty| ty.oid)
        .ok()
        .map(|i| &CATALOGUE[i])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn catalogue_is_sorted_and_unique() {
        for pair in CATALOGUE.windows(2) {
            assert!(pair[0].oid < pair[1].oid, "{} before {}", pair[0].oid, pair[1].oid);
        }
    }

    #[test]
    fn lookup_known() {
        let text = lookup(25).unwrap();
        assert_eq!(text.name, "text");
        assert_eq!(text.size, WireSize::Variable);
        assert!(!text.array);

        let int4_array = lookup(1007).unwrap();
        assert!(int4_array.array);
    }

    #[test]
    fn lookup_unknown() {
        assert!(lookup(0).is_none());
        assert!(lookup(9999).is_none());
        assert!(lookup(u32::MAX).is_none());
    }
}
