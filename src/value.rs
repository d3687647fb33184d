use bytes::Bytes;
use std::fmt::{self, Debug};

use crate::{common::ByteStr, ext::FmtExt};

/// A decoded cell value.
///
/// The closed set of host representations both sides of the codec agree on:
/// the decoder produces these, and [`Parameters::push_value`][1] accepts the
/// scalar ones back as command parameters.
///
/// [1]: crate::encode::Parameters::push_value
#[derive(Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`, for any column type.
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    /// `text`, borrowing from the response buffer.
    Text(ByteStr),
    /// `bytea`, borrowing from the response buffer.
    Bytes(Bytes),
    /// `int4[]`, one dimension, elements may be `NULL`.
    Int4Array(Vec<Option<i32>>),
    /// `text[]`, one dimension, elements may be `NULL`.
    TextArray(Vec<Option<ByteStr>>),
    /// `float4[]`, one dimension, elements may be `NULL`.
    Float4Array(Vec<Option<f32>>),
}

impl Value {
    /// Return `true` for [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Any integer variant, widened.
    pub const fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int2(v) => Some(v as i64),
            Value::Int4(v) => Some(v as i64),
            Value::Int8(v) => Some(v),
            _ => None,
        }
    }

    /// Any float variant, widened.
    pub const fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float4(v) => Some(v as f64),
            Value::Float8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => v.fmt(f),
            Value::Int2(v) => v.fmt(f),
            Value::Int4(v) => v.fmt(f),
            Value::Int8(v) => v.fmt(f),
            Value::Float4(v) => v.fmt(f),
            Value::Float8(v) => v.fmt(f),
            Value::Text(v) => v.fmt(f),
            Value::Bytes(v) => v[..].lossy().fmt(f),
            Value::Int4Array(v) => v.fmt(f),
            Value::TextArray(v) => v.fmt(f),
            Value::Float4Array(v) => v.fmt(f),
        }
    }
}
