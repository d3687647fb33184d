//! Cell value decoding.
//!
//! One function per wire type, dispatched through the
//! [`registry`][crate::postgres::registry] by the column's declared oid.
use bytes::{Buf, Bytes};
use std::{fmt, str::Utf8Error};

use crate::{
    common::ByteStr,
    endian,
    postgres::{Oid, lookup},
    value::Value,
};

/// Decode one cell payload according to its declared wire type.
///
/// The payload is the exact bytes the server reported for the cell, in
/// binary format. `NULL` cells never reach this point, the cursor yields
/// [`Value::Null`] for them without a lookup.
pub fn decode(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    match lookup(oid) {
        Some(ty) => ty.decode(payload),
        None => Err(DecodeError::Unsupported(oid)),
    }
}

/// An error when decoding a cell value.
pub enum DecodeError {
    /// The oid has no decode rule, either unknown to the catalogue or with
    /// no host representation. Carries the numeric oid for diagnosis.
    Unsupported(Oid),
    /// The payload is shorter than the wire type's layout requires.
    Truncated(Oid),
    /// Postgres returned non utf8 text.
    Utf8(Utf8Error),
}

impl std::error::Error for DecodeError { }

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::Unsupported(oid) => write!(f, "unsupported wire type: {oid}"),
            Self::Truncated(oid) => write!(f, "truncated payload for wire type: {oid}"),
            Self::Utf8(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl From<Utf8Error> for DecodeError {
    fn from(e: Utf8Error) -> Self {
        Self::Utf8(e)
    }
}

// ===== Scalar rules =====

pub(crate) fn bool_(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    match payload.first() {
        Some(&b) => Ok(Value::Bool(b != 0)),
        None => Err(DecodeError::Truncated(oid)),
    }
}

pub(crate) fn int2(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    let raw = endian::read16(&payload).ok_or(DecodeError::Truncated(oid))?;
    Ok(Value::Int2(raw as i16))
}

pub(crate) fn int4(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    let raw = endian::read32(&payload).ok_or(DecodeError::Truncated(oid))?;
    Ok(Value::Int4(raw as i32))
}

pub(crate) fn int8(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    let raw = endian::read64(&payload).ok_or(DecodeError::Truncated(oid))?;
    Ok(Value::Int8(raw as i64))
}

pub(crate) fn float4(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    let raw = endian::read32(&payload).ok_or(DecodeError::Truncated(oid))?;
    Ok(Value::Float4(f32::from_bits(raw)))
}

pub(crate) fn float8(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    let raw = endian::read64(&payload).ok_or(DecodeError::Truncated(oid))?;
    Ok(Value::Float8(f64::from_bits(raw)))
}

/// The payload is utf8 of the exact reported length, no nul termination.
pub(crate) fn text(_: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    Ok(Value::Text(ByteStr::from_utf8(payload)?))
}

pub(crate) fn bytea(_: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    Ok(Value::Bytes(payload))
}

/// Rule for oids whose host representation is not specified.
///
/// Fails closed instead of guessing a byte layout.
pub(crate) fn unsupported(oid: Oid, _: Bytes) -> Result<Value, DecodeError> {
    Err(DecodeError::Unsupported(oid))
}

// ===== Array rules =====
//
// Array layout: i32 dimension count, i32 has-null flag, u32 element oid,
// then per dimension i32 length and i32 lower bound, then elements as
// i32 length (-1 for NULL) and payload.
//
// <https://www.postgresql.org/docs/current/arrays.html>

pub(crate) fn int4_array(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    let items = elements(oid, payload, 23, |oid, bytes| {
        endian::read32(&bytes)
            .map(|raw| raw as i32)
            .ok_or(DecodeError::Truncated(oid))
    })?;
    Ok(Value::Int4Array(items))
}

pub(crate) fn text_array(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    let items = elements(oid, payload, 25, |_, bytes| {
        ByteStr::from_utf8(bytes).map_err(DecodeError::from)
    })?;
    Ok(Value::TextArray(items))
}

pub(crate) fn float4_array(oid: Oid, payload: Bytes) -> Result<Value, DecodeError> {
    let items = elements(oid, payload, 700, |oid, bytes| {
        endian::read32(&bytes)
            .map(f32::from_bits)
            .ok_or(DecodeError::Truncated(oid))
    })?;
    Ok(Value::Float4Array(items))
}

/// Walk a one dimensional array payload, decoding each non `NULL` element.
fn elements<T>(
    oid: Oid,
    mut payload: Bytes,
    elem_oid: Oid,
    mut elem: impl FnMut(Oid, Bytes) -> Result<T, DecodeError>,
) -> Result<Vec<Option<T>>, DecodeError> {
    let ndim = take_i32(oid, &mut payload)?;
    let _has_null = take_i32(oid, &mut payload)?;
    let elem_found = take_i32(oid, &mut payload)? as u32;

    if elem_found != elem_oid {
        return Err(DecodeError::Unsupported(oid));
    }

    match ndim {
        0 => return Ok(Vec::new()),
        1 => { },
        // Multi dimensional arrays have no host representation.
        _ => return Err(DecodeError::Unsupported(oid)),
    }

    let len = take_i32(oid, &mut payload)?;
    let _lower_bound = take_i32(oid, &mut payload)?;

    if len < 0 {
        return Err(DecodeError::Truncated(oid));
    }

    let mut items = Vec::with_capacity(len as usize);

    for _ in 0..len {
        let size = take_i32(oid, &mut payload)?;
        if size < 0 {
            items.push(None);
            continue;
        }
        let size = size as usize;
        if payload.remaining() < size {
            return Err(DecodeError::Truncated(oid));
        }
        items.push(Some(elem(elem_oid, payload.split_to(size))?));
    }

    Ok(items)
}

fn take_i32(oid: Oid, payload: &mut Bytes) -> Result<i32, DecodeError> {
    let raw = endian::read32(payload).ok_or(DecodeError::Truncated(oid))?;
    payload.advance(4);
    Ok(raw as i32)
}

#[cfg(test)]
mod test {
    use bytes::{BufMut, Bytes, BytesMut};

    use super::*;

    fn bytes(slice: &[u8]) -> Bytes {
        Bytes::copy_from_slice(slice)
    }

    #[test]
    fn bool_is_nonzero_byte() {
        assert_eq!(decode(16, bytes(&[1])).unwrap(), Value::Bool(true));
        assert_eq!(decode(16, bytes(&[2])).unwrap(), Value::Bool(true));
        assert_eq!(decode(16, bytes(&[0])).unwrap(), Value::Bool(false));
        assert!(matches!(
            decode(16, Bytes::new()),
            Err(DecodeError::Truncated(16)),
        ));
    }

    #[test]
    fn integers_are_network_order() {
        assert_eq!(decode(21, bytes(&[0x12, 0x34])).unwrap(), Value::Int2(0x1234));
        assert_eq!(decode(23, bytes(&[0, 0, 0, 42])).unwrap(), Value::Int4(42));
        assert_eq!(
            decode(23, bytes(&[0xff, 0xff, 0xff, 0xff])).unwrap(),
            Value::Int4(-1),
        );
        assert_eq!(
            decode(20, bytes(&[0, 0, 0, 1, 0, 0, 0, 0])).unwrap(),
            Value::Int8(1 << 32),
        );
    }

    #[test]
    fn floats_are_ieee_bits() {
        assert_eq!(
            decode(700, bytes(&1.5f32.to_bits().to_be_bytes())).unwrap(),
            Value::Float4(1.5),
        );
        assert_eq!(
            decode(701, bytes(&(-2.25f64).to_bits().to_be_bytes())).unwrap(),
            Value::Float8(-2.25),
        );
    }

    #[test]
    fn truncated_fixed_width_fails_closed() {
        assert!(matches!(decode(23, bytes(&[0, 0])), Err(DecodeError::Truncated(23))));
        assert!(matches!(decode(20, bytes(&[0; 4])), Err(DecodeError::Truncated(20))));
    }

    #[test]
    fn text_is_exact_length_utf8() {
        let value = decode(25, bytes("grüße".as_bytes())).unwrap();
        assert_eq!(value.as_str(), Some("grüße"));

        assert!(matches!(
            decode(25, bytes(&[0xff, 0xfe])),
            Err(DecodeError::Utf8(_)),
        ));
    }

    #[test]
    fn bytea_is_raw() {
        let value = decode(17, bytes(&[0, 159, 146, 150])).unwrap();
        assert_eq!(value.as_bytes(), Some(&[0u8, 159, 146, 150][..]));
    }

    #[test]
    fn unknown_oid_fails_closed() {
        assert!(matches!(
            decode(9999, bytes(&[1, 2, 3])),
            Err(DecodeError::Unsupported(9999)),
        ));
    }

    #[test]
    fn placeholder_oids_fail_closed() {
        // char, date, timestamp, interval, record, uuid
        for oid in [18, 1082, 1114, 1186, 2249, 2950] {
            assert!(matches!(
                decode(oid, bytes(&[0; 16])),
                Err(DecodeError::Unsupported(found)) if found == oid,
            ));
        }
    }

    fn array_payload(elem_oid: u32, items: &[Option<&[u8]>]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_i32(1); // ndim
        buf.put_i32(items.iter().any(Option::is_none) as i32);
        buf.put_u32(elem_oid);
        buf.put_i32(items.len() as i32);
        buf.put_i32(1); // lower bound
        for item in items {
            match item {
                Some(payload) => {
                    buf.put_i32(payload.len() as i32);
                    buf.put_slice(payload);
                },
                None => buf.put_i32(-1),
            }
        }
        buf.freeze()
    }

    #[test]
    fn int4_array_with_nulls() {
        let payload = array_payload(23, &[
            Some(&[0, 0, 0, 1]),
            None,
            Some(&[0xff, 0xff, 0xff, 0xfe]),
        ]);
        assert_eq!(
            decode(1007, payload).unwrap(),
            Value::Int4Array(vec![Some(1), None, Some(-2)]),
        );
    }

    #[test]
    fn text_array() {
        let payload = array_payload(25, &[Some(b"a"), Some(b"bc")]);
        let Value::TextArray(items) = decode(1009, payload).unwrap() else {
            panic!("expected text array");
        };
        assert_eq!(items[0].as_deref(), Some("a"));
        assert_eq!(items[1].as_deref(), Some("bc"));
    }

    #[test]
    fn float4_array() {
        let payload = array_payload(700, &[Some(&1.0f32.to_bits().to_be_bytes())]);
        assert_eq!(
            decode(1021, payload).unwrap(),
            Value::Float4Array(vec![Some(1.0)]),
        );
    }

    #[test]
    fn empty_array() {
        let mut buf = BytesMut::new();
        buf.put_i32(0); // ndim, no dimensions follow
        buf.put_i32(0);
        buf.put_u32(23);
        assert_eq!(decode(1007, buf.freeze()).unwrap(), Value::Int4Array(vec![]));
    }

    #[test]
    fn multi_dimensional_array_fails_closed() {
        let mut buf = BytesMut::new();
        buf.put_i32(2);
        buf.put_i32(0);
        buf.put_u32(23);
        assert!(matches!(
            decode(1007, buf.freeze()),
            Err(DecodeError::Unsupported(1007)),
        ));
    }

    #[test]
    fn array_element_oid_mismatch_fails_closed() {
        let payload = array_payload(25, &[Some(b"a")]);
        assert!(matches!(
            decode(1007, payload),
            Err(DecodeError::Unsupported(1007)),
        ));
    }
}
