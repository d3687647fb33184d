//! Postgres client front end.
//!
//! A synchronous binding core: the binary wire-value codec, the parameter
//! binding protocol, and a lazy cursor over result sets. The network
//! transport and authentication handshake live behind the
//! [`Transport`]/[`Connect`] seam, owned by an underlying client library.
//!
//! # Examples
//!
//! Execute a parameterized command and walk its rows:
//!
//! ```no_run
//! use pgfront::{Connection, Outcome, Parameters, Transport};
//!
//! fn demo<T: Transport>(conn: &mut Connection<T>) -> pgfront::Result<()> {
//!     let mut params = Parameters::fixed(1);
//!     params.push(42)?;
//!
//!     match conn.execute("SELECT $1::int4", params)? {
//!         Outcome::Rows(results) => {
//!             for row in results.iter() {
//!                 println!("{:?}", row.get(0)?);
//!             }
//!         },
//!         Outcome::NoRows => { },
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Scope commands to a transaction:
//!
//! ```no_run
//! # fn demo<T: pgfront::Transport>(conn: &mut pgfront::Connection<T>) -> pgfront::Result<()> {
//! let mut tx = conn.transaction()?;
//! tx.batch("CREATE TABLE season (name TEXT PRIMARY KEY)")?;
//! tx.batch("INSERT INTO season VALUES ('Winter')")?;
//! tx.commit()?;
//! # Ok(())
//! # }
//! ```

pub mod common;
mod ext;

// Protocol
pub mod endian;
pub mod postgres;

// Encoding
mod value;
pub mod encode;
pub mod decode;

// Component
pub mod response;
pub mod row;

// Operation
pub mod transport;
pub mod connection;
pub mod transaction;

mod error;


pub use common::ByteStr;
pub use value::Value;

pub use encode::{EncodeError, Param, Parameters};
pub use decode::DecodeError;

pub use response::{Diagnostic, Response};
pub use row::{IndexError, Results, Row};

pub use transport::{Connect, Transport};
pub use connection::{Config, Connection, Outcome};
pub use transaction::Transaction;
pub use error::{ConnectError, Error, ErrorKind, Result};
