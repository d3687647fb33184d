//! The lazy row and cell view over a completed query's result set.
use bytes::{Buf, Bytes};
use std::fmt;

use crate::{
    decode::{self, DecodeError},
    endian,
    error::Error,
    postgres::Oid,
    value::Value,
};

// RowDescription per-field trailer, after the nul terminated name:
// table oid, attribute number, type oid, type size, type modifier,
// format code.
// <https://www.postgresql.org/docs/current/protocol-message-formats.html>
const FIELD_SUFFIX: usize = size_of::<u32>()
    + size_of::<u16>()
    + size_of::<u32>()
    + size_of::<i16>()
    + size_of::<i32>()
    + size_of::<u16>();

const OID_OFFSET: usize = size_of::<u32>() + size_of::<u16>();

/// A completed query's result set.
///
/// Owns the raw tuples response and is its single point of release: rows
/// and cells are non owning views, decoded on demand, and the buffers live
/// until the `Results` itself is dropped. Row and column counts are read
/// once at construction and never revalidated.
pub struct Results {
    /// `RowDescription` body after the field count.
    description: Bytes,
    /// `DataRow` bodies, column count prefix included.
    rows: Vec<Bytes>,
    column_count: u16,
}

impl Results {
    pub(crate) fn new(mut description: Bytes, rows: Vec<Bytes>) -> Self {
        let column_count = match description.len() {
            0 | 1 => 0,
            _ => description.get_u16(),
        };
        Self { description, rows, column_count }
    }

    /// Number of rows. Fixed for the life of the cursor.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns per row. Fixed for the life of the cursor.
    pub const fn column_count(&self) -> u16 {
        self.column_count
    }

    /// Borrow the row at `index`.
    pub fn get(&self, index: usize) -> Result<Row<'_>, IndexError> {
        if index >= self.rows.len() {
            return Err(IndexError::row(index, self.rows.len()));
        }
        Ok(Row { results: self, index })
    }

    /// Declared type oid of a column.
    ///
    /// One description walk per call; callers decoding many rows may cache
    /// the result per column.
    pub fn column_oid(&self, column: usize) -> Result<Oid, IndexError> {
        if column >= usize::from(self.column_count) {
            return Err(IndexError::column(column, usize::from(self.column_count)));
        }

        let mut body = &self.description[..];
        for _ in 0..column {
            let nul = body
                .iter()
                .position(|b| matches!(b, b'\0'))
                .unwrap_or(body.len());
            body = &body[(nul + 1 + FIELD_SUFFIX).min(body.len())..];
        }
        let nul = body
            .iter()
            .position(|b| matches!(b, b'\0'))
            .unwrap_or(body.len());
        endian::read32(&body[(nul + 1 + OID_OFFSET).min(body.len())..])
            .ok_or(IndexError::column(column, usize::from(self.column_count)))
    }

    /// Iterate the rows from the start.
    ///
    /// Every call yields a fresh forward-only iterator. Exhausting it
    /// releases nothing: the response buffer is released only when the
    /// `Results` itself is dropped.
    pub fn iter(&self) -> Rows<'_> {
        Rows { results: self, index: 0 }
    }

    /// Walk to the cell payload at `(row, column)`.
    ///
    /// `None` is a `NULL` cell. The row index must already be validated.
    fn cell(&self, row: usize, column: usize) -> Result<Option<Bytes>, DecodeError> {
        let oid = || self.column_oid(column).unwrap_or_default();

        let mut values = self.rows[row].clone();
        if values.remaining() < size_of::<u16>() {
            return Err(DecodeError::Truncated(oid()));
        }
        let present = values.get_u16();
        debug_assert_eq!(present, self.column_count, "DataRow width differs from RowDescription");

        let mut i = 0;
        loop {
            if values.remaining() < size_of::<i32>() {
                return Err(DecodeError::Truncated(oid()));
            }
            let len = values.get_i32();
            let cell = match len {
                -1 => None,
                _ => {
                    let len = len as usize;
                    if values.remaining() < len {
                        return Err(DecodeError::Truncated(oid()));
                    }
                    Some(values.split_to(len))
                },
            };
            if i == column {
                return Ok(cell);
            }
            i += 1;
        }
    }
}

impl<'a> IntoIterator for &'a Results {
    type Item = Row<'a>;

    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("rows", &self.rows.len())
            .field("columns", &self.column_count)
            .finish()
    }
}

/// A single row of a [`Results`].
///
/// A lightweight index into its cursor: no data is copied until a cell is
/// decoded, and the view is only valid while the cursor lives.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    results: &'a Results,
    index: usize,
}

impl<'a> Row<'a> {
    /// Number of columns.
    pub fn len(&self) -> usize {
        usize::from(self.results.column_count)
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.results.column_count == 0
    }

    /// Decode the cell at `column`.
    ///
    /// The column's declared oid picks the decode rule; a `NULL` cell is
    /// [`Value::Null`] whatever the column type.
    pub fn get(&self, column: usize) -> Result<Value, Error> {
        let oid = self.results.column_oid(column)?;
        let payload = self.results.cell(self.index, column)?;
        match payload {
            Some(payload) => Ok(decode::decode(oid, payload)?),
            None => Ok(Value::Null),
        }
    }

    /// Iterate the row's cells in column order.
    pub fn cells(&self) -> Cells<'a> {
        Cells { row: *self, column: 0 }
    }
}

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for cell in self.cells() {
            match cell {
                Ok(value) => list.entry(&value),
                Err(_) => list.entry(&format_args!("<undecodable>")),
            };
        }
        list.finish()
    }
}

/// Iterator over the rows of a [`Results`].
#[derive(Debug)]
pub struct Rows<'a> {
    results: &'a Results,
    index: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.results.get(self.index).ok()?;
        self.index += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.results.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> { }

/// Iterator over the cells of a [`Row`].
#[derive(Debug)]
pub struct Cells<'a> {
    row: Row<'a>,
    column: usize,
}

impl<'a> Iterator for Cells<'a> {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.column >= self.row.len() {
            return None;
        }
        let cell = self.row.get(self.column);
        self.column += 1;
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.row.len().saturating_sub(self.column);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Cells<'_> { }

/// A row or column access out of range.
///
/// Out of range access is a contract violation, reported to the caller and
/// never clamped.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IndexError {
    axis: &'static str,
    index: usize,
    len: usize,
}

impl IndexError {
    pub(crate) const fn row(index: usize, len: usize) -> Self {
        Self { axis: "row", index, len }
    }

    pub(crate) const fn column(index: usize, len: usize) -> Self {
        Self { axis: "column", index, len }
    }
}

impl std::error::Error for IndexError { }

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} index out of bounds: {} of {}", self.axis, self.index, self.len)
    }
}

impl fmt::Debug for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::error::ErrorKind;

    /// `RowDescription` body for columns of the given names and oids.
    fn description(columns: &[(&str, Oid)]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u16(columns.len() as u16);
        for (name, oid) in columns {
            buf.put_slice(name.as_bytes());
            buf.put_u8(0);
            buf.put_u32(0); // table oid
            buf.put_u16(0); // attribute number
            buf.put_u32(*oid);
            buf.put_i16(-1); // type size
            buf.put_i32(-1); // type modifier
            buf.put_u16(1); // binary
        }
        buf.freeze()
    }

    /// `DataRow` body from cell payloads, `None` for NULL.
    fn data_row(cells: &[Option<&[u8]>]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u16(cells.len() as u16);
        for cell in cells {
            match cell {
                Some(payload) => {
                    buf.put_i32(payload.len() as i32);
                    buf.put_slice(payload);
                },
                None => buf.put_i32(-1),
            }
        }
        buf.freeze()
    }

    fn sample() -> Results {
        Results::new(
            description(&[("value", 23), ("prime", 16)]),
            vec![
                data_row(&[Some(&[0, 0, 0, 2]), Some(&[1])]),
                data_row(&[Some(&[0, 0, 0, 3]), Some(&[1])]),
                data_row(&[Some(&[0, 0, 0, 4]), Some(&[0])]),
            ],
        )
    }

    #[test]
    fn counts_are_cached_at_construction() {
        let results = sample();
        assert_eq!(results.len(), 3);
        assert_eq!(results.column_count(), 2);
        assert!(!results.is_empty());
    }

    #[test]
    fn get_checks_bounds() {
        let results = sample();
        assert!(results.get(2).is_ok());
        let err = results.get(3).unwrap_err();
        assert_eq!(err, IndexError::row(3, 3));
        assert_eq!(err.to_string(), "row index out of bounds: 3 of 3");
    }

    #[test]
    fn cells_decode_on_demand() {
        let results = sample();
        let row = results.get(1).unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0).unwrap(), Value::Int4(3));
        assert_eq!(row.get(1).unwrap(), Value::Bool(true));
    }

    #[test]
    fn column_out_of_range() {
        let results = sample();
        let row = results.get(0).unwrap();
        let err = row.get(2).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Index(_)));
    }

    #[test]
    fn null_cell_decodes_to_null_value() {
        let results = Results::new(
            description(&[("name", 25)]),
            vec![data_row(&[None])],
        );
        assert_eq!(results.get(0).unwrap().get(0).unwrap(), Value::Null);
    }

    #[test]
    fn column_oids_come_from_the_description() {
        let results = sample();
        assert_eq!(results.column_oid(0).unwrap(), 23);
        assert_eq!(results.column_oid(1).unwrap(), 16);
        assert!(results.column_oid(2).is_err());
    }

    #[test]
    fn iteration_restarts_per_call() {
        let results = sample();

        let first: Vec<_> = results.iter().map(|r| r.get(0).unwrap()).collect();
        assert_eq!(first, [Value::Int4(2), Value::Int4(3), Value::Int4(4)]);

        // A second iterator starts over.
        let mut rows = results.iter();
        assert_eq!(rows.len(), 3);
        assert!(rows.next().is_some());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn cell_iterator_has_exact_size() {
        let results = sample();
        let row = results.get(0).unwrap();
        let mut cells = row.cells();
        assert_eq!(cells.len(), 2);
        assert!(cells.next().unwrap().is_ok());
        assert_eq!(cells.len(), 1);
        assert!(cells.next().is_some());
        assert!(cells.next().is_none());
    }

    #[test]
    fn empty_result_set() {
        let results = Results::new(description(&[]), vec![]);
        assert_eq!(results.len(), 0);
        assert_eq!(results.column_count(), 0);
        assert!(results.get(0).is_err());
        assert!(results.iter().next().is_none());
    }
}
