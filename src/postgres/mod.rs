//! Postgres wire vocabulary.
//!
//! ## Formats and Format Codes
//!
//! Data of a particular data type might be transmitted in any of several
//! different formats. As of PostgreSQL 7.4 the only supported formats are
//! “text” and “binary”. Text has format code zero, and Binary has format
//! code one.
//!
//! This crate requests [`Binary`][PgFormat::Binary] for both parameters and
//! results, unconditionally: binary representations for integers use network
//! byte order (most significant byte first), which is what the
//! [`endian`][crate::endian] rules exist for.
//!
//! ## Type Oids
//!
//! Columns and parameters identify their data type by numeric oid, exactly
//! as assigned by the server. The [`registry`] holds the catalogue of oids
//! this crate can decode.
//!
//! <https://www.postgresql.org/docs/current/protocol-overview.html>

mod pg_type;
mod pg_format;

pub mod registry;

pub use pg_type::{Oid, PgType};
pub use pg_format::PgFormat;
pub use registry::{WireSize, WireType, lookup};
