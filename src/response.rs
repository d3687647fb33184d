//! The raw tagged result of one command submission.
use bytes::{Buf, Bytes};
use std::fmt;

use crate::{common::ByteStr, ext::BytesExt};

/// The tagged response a [`Transport`][crate::transport::Transport] hands
/// back for one submitted command.
///
/// Exactly one place owns a response at any time: a
/// [`Results`][crate::row::Results] cursor for the tuples case, a
/// [`Diagnostic`] for the error case. Dropping that owner releases the
/// buffers.
#[derive(Debug)]
pub enum Response {
    /// Command completed without producing a result set.
    CommandOk {
        /// The command tag, e.g. `CREATE TABLE` or `INSERT 0 1`.
        tag: ByteStr,
    },
    /// Command produced a result set.
    Tuples {
        /// `RowDescription` body: field count, then per field the nul
        /// terminated name and its fixed size trailer.
        description: Bytes,
        /// One `DataRow` body per row: column count, then length prefixed
        /// cells.
        rows: Vec<Bytes>,
    },
    /// Command failed on the server.
    Error {
        /// `ErrorResponse` body: identified fields, each a code byte and a
        /// nul terminated string, closed by a zero byte.
        fields: Bytes,
    },
}

/// Structured server error detail.
///
/// Holds slices of the error response it was built from, so the raw buffer
/// stays alive for as long as the diagnostic can be inspected, one
/// generation past normal command completion.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Option<ByteStr>,
    code: Option<ByteStr>,
    primary: ByteStr,
    detail: Option<ByteStr>,
    hint: Option<ByteStr>,
}

impl Diagnostic {
    /// Extract the identified fields from an `ErrorResponse` body.
    ///
    /// Unrecognized field codes are skipped, as the protocol requires.
    pub fn from_fields(mut fields: Bytes) -> Self {
        let mut diagnostic = Self {
            severity: None,
            code: None,
            primary: ByteStr::default(),
            detail: None,
            hint: None,
        };

        while fields.has_remaining() {
            let code = fields.get_u8();
            if code == 0 {
                break;
            }
            let Ok(value) = fields.get_nul_bytestr() else {
                break;
            };
            match code {
                b'S' => diagnostic.severity = Some(value),
                b'C' => diagnostic.code = Some(value),
                b'M' => diagnostic.primary = value,
                b'D' => diagnostic.detail = Some(value),
                b'H' => diagnostic.hint = Some(value),
                _ => { },
            }
        }

        diagnostic
    }

    /// Severity field, e.g. `ERROR` or `FATAL`.
    pub fn severity(&self) -> Option<&str> {
        self.severity.as_deref()
    }

    /// SQLSTATE code.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The primary human readable message.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

const SEP: &str = "\n  * ";

impl fmt::Display for Diagnostic {
    /// Primary message, then `DETAIL`, then `HINT`.
    ///
    /// A hint is only rendered when a detail is present.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.primary)?;
        let Some(detail) = self.detail() else {
            return Ok(());
        };
        write!(f, "{SEP}DETAIL: {detail}")?;
        match self.hint() {
            Some(hint) => write!(f, "{SEP}HINT: {hint}"),
            None => Ok(()),
        }
    }
}

impl std::error::Error for Diagnostic { }
