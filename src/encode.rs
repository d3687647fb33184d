//! Parameter encoding for extended protocol command submission.
//!
//! Host values are narrowed and serialized into wire form before the
//! command is submitted: fixed width payloads land in a scratch buffer in
//! network byte order, text and byte strings are referenced in place for
//! the duration of the call.
use bytes::BytesMut;
use std::fmt;

use crate::{
    endian,
    ext::UsizeExt,
    postgres::{Oid, PgFormat, PgType},
    value::Value,
};

/// Width of the base in which [`BigDigits`] limbs are held.
pub const DIGIT_BITS: u32 = 30;

/// A sign magnitude integer of arbitrary precision, as a host binding layer
/// holds it: base `2^30` limbs, least significant first.
///
/// The all-zero magnitude is canonical with an empty limb slice.
#[derive(Debug, Clone, Copy)]
pub struct BigDigits<'a> {
    pub negative: bool,
    pub digits: &'a [u32],
}

/// A host value bound to one command parameter.
///
/// This is a closed catalogue: binding layers convert their runtime values
/// into one of these variants before reaching the encoder, so encoding is
/// total over the set, short of the integer overflow paths.
#[derive(Debug, Clone, Copy)]
pub enum Param<'a> {
    /// Encodes as `text`, utf8 bytes referenced in place.
    Text(&'a str),
    /// Narrowed to `int2`, `int4` or `int8`.
    Int(i64),
    /// Narrowed like [`Param::Int`], accumulated limb by limb.
    BigInt(BigDigits<'a>),
    /// Encodes as `float8`.
    Float(f64),
    /// Encodes as `bool`, a single `0`/`1` byte.
    Bool(bool),
    /// Encodes as `bytea`, referenced in place.
    Bytes(&'a [u8]),
}

macro_rules! param_from {
    (<$lf:tt>$ty:ty => $var:ident) => {
        impl<$lf> From<$ty> for Param<$lf> {
            fn from(value: $ty) -> Self {
                Param::$var(value)
            }
        }
    };
    ($ty:ty => $var:ident) => {
        impl From<$ty> for Param<'_> {
            fn from(value: $ty) -> Self {
                Param::$var(value.into())
            }
        }
    };
}

param_from!(<'a>&'a str => Text);
param_from!(<'a>BigDigits<'a> => BigInt);
param_from!(<'a>&'a [u8] => Bytes);
param_from!(i16 => Int);
param_from!(i32 => Int);
param_from!(i64 => Int);
param_from!(f64 => Float);
param_from!(bool => Bool);

/// An error when binding a parameter.
pub enum EncodeError {
    /// Host value kind outside the supported catalogue.
    Unsupported(&'static str),
    /// Integer magnitude not representable on the wire.
    Overflow,
    /// More values bound than the set was sized for.
    ArityOverflow {
        capacity: usize,
    },
}

impl std::error::Error for EncodeError { }

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to encode value, ")?;
        match self {
            Self::Unsupported(kind) => write!(f, "unsupported host value: {kind}"),
            Self::Overflow => write!(f, "integer out of wire range"),
            Self::ArityOverflow { capacity } => {
                write!(f, "parameter set sized for {capacity} values")
            },
        }
    }
}

impl fmt::Debug for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Widest fixed width payload, sizes the scratch reservation per value.
const MAX_FIXED: usize = 8;

/// Where one encoded payload lives.
#[derive(Debug)]
enum Slot<'a> {
    /// Range of the scratch buffer.
    Scratch { offset: usize, len: usize },
    /// Caller owned memory, valid for the duration of the call.
    Borrowed(&'a [u8]),
}

/// An ordered set of encoded parameters bound to one command invocation.
///
/// Fixed width payloads are written into the scratch buffer at a
/// monotonically advancing offset; text and byte strings are borrowed in
/// place. The set is created per call, consumed by
/// [`execute`][crate::connection::Connection::execute], and dropped
/// immediately after, it owns nothing that outlives one command.
#[derive(Debug)]
pub struct Parameters<'a> {
    oids: Vec<Oid>,
    slots: Vec<Slot<'a>>,
    formats: Vec<PgFormat>,
    scratch: BytesMut,
    capacity: Option<usize>,
}

impl Default for Parameters<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Parameters<'a> {
    /// An empty set that grows with each bound value.
    pub fn new() -> Self {
        Self {
            oids: Vec::new(),
            slots: Vec::new(),
            formats: Vec::new(),
            scratch: BytesMut::new(),
            capacity: None,
        }
    }

    /// A set sized for exactly `n` values.
    ///
    /// Binding more than `n` is a caller contract violation, reported as
    /// [`EncodeError::ArityOverflow`] before anything reaches the wire.
    /// The scratch buffer is reserved up front so fixed width values never
    /// allocate per bind.
    pub fn fixed(n: usize) -> Self {
        Self {
            oids: Vec::with_capacity(n),
            slots: Vec::with_capacity(n),
            formats: Vec::with_capacity(n),
            scratch: BytesMut::with_capacity(n * MAX_FIXED),
            capacity: Some(n),
        }
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.oids.len()
    }

    /// Returns `true` if no parameter is bound.
    pub fn is_empty(&self) -> bool {
        self.oids.is_empty()
    }

    /// Bind the next parameter.
    pub fn push(&mut self, value: impl Into<Param<'a>>) -> Result<(), EncodeError> {
        if let Some(capacity) = self.capacity {
            if self.oids.len() == capacity {
                return Err(EncodeError::ArityOverflow { capacity });
            }
        }
        match value.into() {
            Param::BigInt(d) => return self.push_digits(d),
            Param::Text(s) => self.put_borrowed(<str as PgType>::OID, s.as_bytes()),
            Param::Int(v) => self.push_int(v),
            Param::Float(v) => self.put_fixed(<f64 as PgType>::OID, &endian::wire64(v.to_bits())),
            Param::Bool(b) => self.put_fixed(<bool as PgType>::OID, &[b as u8]),
            Param::Bytes(b) => self.put_borrowed(<[u8] as PgType>::OID, b),
        }
        Ok(())
    }

    /// Bind a previously decoded scalar back as a parameter.
    ///
    /// `NULL` and array values have no parameter encoding and are reported
    /// as [`EncodeError::Unsupported`].
    pub fn push_value(&mut self, value: &'a Value) -> Result<(), EncodeError> {
        match value {
            Value::Bool(b) => self.push(*b),
            Value::Int2(v) => self.push(*v),
            Value::Int4(v) => self.push(*v),
            Value::Int8(v) => self.push(*v),
            Value::Float4(v) => self.push(f64::from(*v)),
            Value::Float8(v) => self.push(*v),
            Value::Text(s) => self.push(s.as_str()),
            Value::Bytes(b) => self.push(&b[..]),
            Value::Null => Err(EncodeError::Unsupported("null")),
            Value::Int4Array(_) | Value::TextArray(_) | Value::Float4Array(_) => {
                Err(EncodeError::Unsupported("array"))
            },
        }
    }

    /// Narrow a host integer to the smallest wire width that holds it.
    ///
    /// The boundaries are asymmetric on purpose: `-32768` narrows to
    /// `int2` even though `32768` does not fit one, and likewise `-2^31`
    /// narrows to `int4`. Zero is `int2` zero.
    fn push_int(&mut self, v: i64) {
        let magnitude = v.unsigned_abs();
        if v >= 0 {
            if magnitude < 32_768 {
                self.put_int2(v as i16);
            } else if magnitude < 2_147_483_648 {
                self.put_int4(v as i32);
            } else {
                self.put_int8(v);
            }
        } else if magnitude <= 32_768 {
            self.put_int2(v as i16);
        } else if magnitude <= 2_147_483_648 {
            self.put_int4(v as i32);
        } else {
            self.put_int8(v);
        }
    }

    /// Accumulate limbs into a magnitude, then narrow like [`push_int`].
    ///
    /// Each accumulation step checks that the shift lost no high bits
    /// against the prior partial total; a magnitude past the signed 64-bit
    /// range is an [`EncodeError::Overflow`], never a wraparound.
    ///
    /// [`push_int`]: Self::push_int
    fn push_digits(&mut self, big: BigDigits) -> Result<(), EncodeError> {
        match big.digits {
            [] => return Ok(self.put_int2(0)),
            &[d] => {
                // Single limb fast path, same boundaries as `push_int`.
                if big.negative {
                    if u64::from(d) <= 32_768 {
                        return Ok(self.put_int2(-(d as i32) as i16));
                    }
                    return Ok(self.put_int4(-(i64::from(d)) as i32));
                }
                if u64::from(d) < 32_768 {
                    return Ok(self.put_int2(d as i16));
                }
                return Ok(self.put_int4(d as i32));
            },
            _ => { },
        }

        let mut total = 0u64;
        for &limb in big.digits.iter().rev() {
            let next = (total << DIGIT_BITS) | u64::from(limb);
            if (next >> DIGIT_BITS) != total {
                return Err(EncodeError::Overflow);
            }
            total = next;
        }

        if big.negative {
            if total <= 2_147_483_648 {
                self.put_int4(-(total as i64) as i32);
            } else if total <= 1 << 63 {
                // `2^63` maps onto `i64::MIN` exactly.
                self.put_int8((total as i64).wrapping_neg());
            } else {
                return Err(EncodeError::Overflow);
            }
        } else if total < 2_147_483_648 {
            self.put_int4(total as i32);
        } else if let Ok(v) = i64::try_from(total) {
            self.put_int8(v);
        } else {
            return Err(EncodeError::Overflow);
        }
        Ok(())
    }

    fn put_int2(&mut self, v: i16) {
        self.put_fixed(<i16 as PgType>::OID, &endian::wire16(v as u16));
    }

    fn put_int4(&mut self, v: i32) {
        self.put_fixed(<i32 as PgType>::OID, &endian::wire32(v as u32));
    }

    fn put_int8(&mut self, v: i64) {
        self.put_fixed(<i64 as PgType>::OID, &endian::wire64(v as u64));
    }

    /// Append a fixed width payload at the scratch high water mark.
    fn put_fixed(&mut self, oid: Oid, payload: &[u8]) {
        let offset = self.scratch.len();
        self.scratch.extend_from_slice(payload);
        self.record(oid, Slot::Scratch { offset, len: payload.len() });
    }

    /// Reference a variable width payload in caller owned memory.
    fn put_borrowed(&mut self, oid: Oid, payload: &'a [u8]) {
        self.record(oid, Slot::Borrowed(payload));
    }

    fn record(&mut self, oid: Oid, slot: Slot<'a>) {
        self.oids.push(oid);
        self.slots.push(slot);
        self.formats.push(PgFormat::Binary);
    }

    // ===== Accessors for the transport =====

    /// Parameter type oids, in bind order.
    pub fn oids(&self) -> &[Oid] {
        &self.oids
    }

    /// Parameter formats, in bind order. Always binary.
    pub fn formats(&self) -> &[PgFormat] {
        &self.formats
    }

    /// Encoded payload of the `i`th parameter.
    pub fn value(&self, i: usize) -> Option<&[u8]> {
        Some(match self.slots.get(i)? {
            Slot::Scratch { offset, len } => &self.scratch[*offset..*offset + *len],
            Slot::Borrowed(payload) => payload,
        })
    }

    /// Payload length of the `i`th parameter, as the wire carries it.
    pub fn size(&self, i: usize) -> Option<i32> {
        self.value(i).map(|payload| payload.len().to_i32())
    }

    /// Iterate `(oid, payload, format)` triples in bind order.
    pub fn iter(&self) -> impl Iterator<Item = (Oid, &[u8], PgFormat)> {
        (0..self.len()).map(|i| {
            (
                self.oids[i],
                self.value(i).unwrap_or_default(),
                self.formats[i],
            )
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn single<'a>(params: &'a Parameters) -> (Oid, &'a [u8]) {
        assert_eq!(params.len(), 1);
        (params.oids()[0], params.value(0).unwrap())
    }

    fn encode_int(v: i64) -> (Oid, Vec<u8>) {
        let mut params = Parameters::new();
        params.push(v).unwrap();
        let (oid, payload) = single(&params);
        (oid, payload.to_vec())
    }

    #[test]
    fn narrowing_boundaries() {
        // (value, expected oid, expected width)
        let table: &[(i64, Oid, usize)] = &[
            (0, 21, 2),
            (1, 21, 2),
            (-1, 21, 2),
            (32_767, 21, 2),
            (32_768, 23, 4), // does not fit int2
            (-32_768, 21, 2), // does fit int2
            (-32_769, 23, 4),
            (2_147_483_647, 23, 4),
            (2_147_483_648, 20, 8),
            (-2_147_483_648, 23, 4),
            (-2_147_483_649, 20, 8),
            (i64::MAX, 20, 8),
            (i64::MIN, 20, 8),
        ];
        for &(v, oid, width) in table {
            let (found, payload) = encode_int(v);
            assert_eq!(found, oid, "oid for {v}");
            assert_eq!(payload.len(), width, "width for {v}");
        }
    }

    #[test]
    fn payloads_are_network_order() {
        assert_eq!(encode_int(0x1234).1, [0x12, 0x34]);
        assert_eq!(encode_int(-1).1, [0xff, 0xff]);
        assert_eq!(encode_int(65_536).1, [0, 1, 0, 0]);
        assert_eq!(encode_int(1 << 40).1, [0, 0, 1, 0, 0, 0, 0, 0]);
    }

    fn digits<'a>(negative: bool, digits: &'a [u32]) -> Param<'a> {
        Param::BigInt(BigDigits { negative, digits })
    }

    fn encode_digits(negative: bool, limbs: &[u32]) -> Result<(Oid, Vec<u8>), EncodeError> {
        let mut params = Parameters::new();
        params.push(digits(negative, limbs))?;
        let (oid, payload) = single(&params);
        Ok((oid, payload.to_vec()))
    }

    #[test]
    fn digit_narrowing_matches_int_narrowing() {
        // zero limbs
        assert_eq!(encode_digits(false, &[]).unwrap(), (21, vec![0, 0]));
        // single limb, both sides of the asymmetric boundary
        assert_eq!(encode_digits(false, &[32_767]).unwrap().0, 21);
        assert_eq!(encode_digits(false, &[32_768]).unwrap().0, 23);
        assert_eq!(encode_digits(true, &[32_768]).unwrap(), (21, vec![0x80, 0]));
        assert_eq!(encode_digits(true, &[32_769]).unwrap().0, 23);
        // two limbs: 3 << 30 | 5
        let v = (3u64 << 30) | 5;
        assert_eq!(
            encode_digits(false, &[5, 3]).unwrap(),
            (20, (v as i64).to_be_bytes().to_vec()),
        );
        // negative two-limb magnitude 2^31 still narrows to int4
        let m31 = 1u64 << 31;
        assert_eq!(
            encode_digits(true, &[(m31 & 0x3fff_ffff) as u32, (m31 >> 30) as u32]).unwrap(),
            (23, i32::MIN.to_be_bytes().to_vec()),
        );
    }

    #[test]
    fn digit_accumulation_overflow() {
        // Three full limbs shift past 64 bits.
        assert!(matches!(
            encode_digits(false, &[0x3fff_ffff; 3]),
            Err(EncodeError::Overflow),
        ));
        // Magnitude between 2^63 and 2^64 survives the shift check but not
        // the signed cast.
        let m = u64::MAX;
        let limbs = [
            (m & 0x3fff_ffff) as u32,
            ((m >> 30) & 0x3fff_ffff) as u32,
            (m >> 60) as u32,
        ];
        assert!(matches!(encode_digits(false, &limbs), Err(EncodeError::Overflow)));
        assert!(matches!(encode_digits(true, &limbs), Err(EncodeError::Overflow)));
        // 2^63 itself: too large positive, exactly i64::MIN negative.
        let m = 1u64 << 63;
        let limbs = [
            (m & 0x3fff_ffff) as u32,
            ((m >> 30) & 0x3fff_ffff) as u32,
            (m >> 60) as u32,
        ];
        assert!(matches!(encode_digits(false, &limbs), Err(EncodeError::Overflow)));
        assert_eq!(
            encode_digits(true, &limbs).unwrap(),
            (20, i64::MIN.to_be_bytes().to_vec()),
        );
    }

    #[test]
    fn text_is_borrowed_in_place() {
        let owned = String::from("season");
        let mut params = Parameters::new();
        params.push(owned.as_str()).unwrap();
        let (oid, payload) = single(&params);
        assert_eq!(oid, 25);
        assert_eq!(payload, b"season");
        // zero copy: same allocation
        assert!(std::ptr::eq(payload.as_ptr(), owned.as_ptr()));
    }

    #[test]
    fn bool_and_bytes_and_float() {
        let mut params = Parameters::new();
        params.push(true).unwrap();
        params.push(false).unwrap();
        params.push(&b"\x00\x01"[..]).unwrap();
        params.push(1.5f64).unwrap();

        assert_eq!(params.oids(), &[16, 16, 17, 701]);
        assert_eq!(params.value(0).unwrap(), &[1]);
        assert_eq!(params.value(1).unwrap(), &[0]);
        assert_eq!(params.value(2).unwrap(), &[0, 1]);
        assert_eq!(params.value(3).unwrap(), &1.5f64.to_bits().to_be_bytes()[..]);
    }

    #[test]
    fn scratch_advances_monotonically() {
        let mut params = Parameters::fixed(3);
        params.push(1i64).unwrap(); // int2, 2 bytes
        params.push("borrowed").unwrap(); // no scratch
        params.push(100_000i64).unwrap(); // int4, 4 bytes

        assert_eq!(params.len(), 3);
        assert_eq!(params.size(0), Some(2));
        assert_eq!(params.size(1), Some(8));
        assert_eq!(params.size(2), Some(4));
        assert_eq!(params.scratch.len(), 6);
        assert!(params.formats().iter().all(|f| f.format_code() == 1));
    }

    #[test]
    fn fixed_arity_is_checked_before_submission() {
        let mut params = Parameters::fixed(1);
        params.push(1i32).unwrap();
        assert!(matches!(
            params.push(2i32),
            Err(EncodeError::ArityOverflow { capacity: 1 }),
        ));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn value_rebind() {
        let text = Value::Text("x".into());
        let mut params = Parameters::new();
        params.push_value(&Value::Int4(7)).unwrap();
        params.push_value(&text).unwrap();
        assert_eq!(params.oids(), &[21, 25]);

        assert!(matches!(
            params.push_value(&Value::Null),
            Err(EncodeError::Unsupported("null")),
        ));
        assert!(matches!(
            params.push_value(&Value::Int4Array(vec![])),
            Err(EncodeError::Unsupported("array")),
        ));
    }
}
