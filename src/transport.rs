//! The transport seam.
//!
//! The network stream, startup handshake and authentication live behind
//! these traits, owned by an underlying client library. This crate layers
//! the value codec and cursor on top of an already established connection.
use crate::{
    connection::Config,
    encode::Parameters,
    error::{ConnectError, Result},
    response::Response,
};

/// An established connection capable of carrying one command at a time.
///
/// The discipline is strictly synchronous: a single in-flight command per
/// connection, no pipelining, and [`submit`][Transport::submit] blocks
/// until the tagged response has been received in full. Cancellation and
/// timeouts, if any, belong to the implementor.
pub trait Transport {
    /// Submit one command with its bound parameters and block for the
    /// tagged response.
    ///
    /// This is an extended protocol call: parameter types, payloads and
    /// formats travel separately from the command text, and the binary
    /// result format is requested unconditionally, for both directions.
    ///
    /// Transport level failures (a broken stream, a lost backend) are
    /// [`ErrorKind::Io`][crate::error::ErrorKind::Io]; a command the server
    /// rejected is a [`Response::Error`], not an `Err`.
    fn submit(&mut self, sql: &str, params: &Parameters<'_>) -> Result<Response>;
}

impl<T> Transport for &mut T
where
    T: Transport,
{
    fn submit(&mut self, sql: &str, params: &Parameters<'_>) -> Result<Response> {
        T::submit(self, sql, params)
    }
}

/// A transport that can establish itself from a [`Config`].
pub trait Connect: Transport + Sized {
    /// Open a connection to the configured server.
    ///
    /// A failed attempt is always recoverable: the caller may retry with
    /// different parameters.
    fn connect(config: &Config) -> Result<Self, ConnectError>;
}
