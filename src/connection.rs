//! Postgres connection and command execution.
use crate::{
    common::{span, verbose},
    encode::Parameters,
    error::Result,
    response::{Diagnostic, Response},
    row::Results,
    transport::{Connect, Transport},
};

mod config;

pub use config::{Config, ParseError};

/// A single database connection.
///
/// One command is in flight at a time; executing blocks until the server's
/// tagged response has been classified into an [`Outcome`].
#[derive(Debug)]
pub struct Connection<T> {
    io: T,
    config: Config,
}

impl<T: Connect> Connection<T> {
    /// Open a connection with the given configuration.
    pub fn connect(config: Config) -> Result<Self> {
        let io = T::connect(&config)?;
        #[cfg(feature = "log")]
        log::debug!("connected to {}/{}", config.host(), config.dbname());
        Ok(Self { io, config })
    }

    /// Open a connection configured from the environment.
    ///
    /// See [`Config::from_env`].
    pub fn connect_env() -> Result<Self> {
        Self::connect(Config::from_env())
    }
}

impl<T: Transport> Connection<T> {
    /// Wrap an already established transport.
    pub fn with_transport(io: T, config: Config) -> Self {
        Self { io, config }
    }

    /// Execute one command with its bound parameters.
    ///
    /// The parameter set is consumed: its scratch storage lives exactly as
    /// long as the call. A non-ok, non-tuples status from the transport
    /// becomes an [`ErrorKind::Database`][1] failure whose [`Diagnostic`]
    /// takes ownership of the response and releases it on its own drop, so
    /// the error stays inspectable after this call returns.
    ///
    /// [1]: crate::error::ErrorKind::Database
    pub fn execute(&mut self, sql: &str, params: Parameters<'_>) -> Result<Outcome> {
        span!("execute");
        verbose!(sql, params = params.len());

        match self.io.submit(sql, &params)? {
            Response::CommandOk { tag: _tag } => {
                #[cfg(feature = "log")]
                log::debug!("command complete: {_tag}");
                Ok(Outcome::NoRows)
            },
            Response::Tuples { description, rows } => {
                Ok(Outcome::Rows(Results::new(description, rows)))
            },
            Response::Error { fields } => {
                let diagnostic = Diagnostic::from_fields(fields);
                #[cfg(feature = "log")]
                log::debug!("command failed: {}", diagnostic.primary());
                Err(diagnostic.into())
            },
        }
    }

    /// Execute a command with no parameters.
    pub fn batch(&mut self, sql: &str) -> Result<Outcome> {
        self.execute(sql, Parameters::new())
    }

    /// Begin a transaction scoped to the returned guard.
    ///
    /// See [`Transaction`][crate::transaction::Transaction].
    pub fn transaction(&mut self) -> Result<crate::transaction::Transaction<'_, T>> {
        crate::transaction::Transaction::begin(self)
    }

    /// The server host name of the connection.
    pub fn host(&self) -> &str {
        self.config.host()
    }

    /// The server port of the connection.
    pub fn port(&self) -> u16 {
        self.config.port()
    }

    /// The user name of the connection.
    pub fn user(&self) -> &str {
        self.config.user()
    }

    /// The database name of the connection.
    pub fn dbname(&self) -> &str {
        self.config.dbname()
    }
}

/// The classified result of one executed command.
///
/// The failure arm lives in the [`Err`] channel as
/// [`ErrorKind::Database`][1], so that exactly one of a cursor or a
/// diagnostic owns the underlying response.
///
/// [1]: crate::error::ErrorKind::Database
#[derive(Debug)]
pub enum Outcome {
    /// Command completed without a result set.
    NoRows,
    /// Command produced a result set.
    Rows(Results),
}

impl Outcome {
    /// The result set, if the command produced one.
    pub fn rows(self) -> Option<Results> {
        match self {
            Outcome::Rows(results) => Some(results),
            Outcome::NoRows => None,
        }
    }

    /// Returns `true` if the command completed without a result set.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Outcome::NoRows)
    }
}
