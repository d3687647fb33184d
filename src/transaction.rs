//! The [`Transaction`] type.
use crate::{
    connection::Connection,
    encode::Parameters,
    error::Result,
    transport::Transport,
};

/// An RAII implementation of transaction scope.
///
/// Beginning a transaction issues `BEGIN`. To commit, use
/// [`Transaction::commit`]; if the guard is dropped without committing, the
/// transaction is rolled back. Either way the exclusive borrow of the
/// connection ends with the guard, whatever the outcome.
///
/// # Example
///
/// ```no_run
/// # fn demo<T: pgfront::Transport>(conn: &mut pgfront::Connection<T>) -> pgfront::Result<()> {
/// let mut tx = conn.transaction()?;
///
/// tx.batch("INSERT INTO season VALUES ('Spring')")?;
///
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction<'c, T: Transport> {
    conn: &'c mut Connection<T>,
    commited: bool,
}

impl<'c, T> Transaction<'c, T>
where
    T: Transport,
{
    pub(crate) fn begin(conn: &'c mut Connection<T>) -> Result<Self> {
        conn.execute("BEGIN", Parameters::new())?;
        Ok(Self { conn, commited: false })
    }

    /// Commit the transaction.
    pub fn commit(mut self) -> Result<()> {
        self.conn.execute("COMMIT", Parameters::new())?;
        self.commited = true;
        Ok(())
    }

    /// Roll back the transaction now instead of at drop.
    pub fn rollback(mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", Parameters::new())?;
        self.commited = true;
        Ok(())
    }
}

impl<T> Drop for Transaction<'_, T>
where
    T: Transport,
{
    fn drop(&mut self) {
        if !self.commited {
            if let Err(_err) = self.conn.execute("ROLLBACK", Parameters::new()) {
                #[cfg(feature = "log")]
                log::warn!("rollback failed: {_err}");
            }
        }
    }
}

impl<T: Transport> std::ops::Deref for Transaction<'_, T> {
    type Target = Connection<T>;

    fn deref(&self) -> &Self::Target {
        self.conn
    }
}

impl<T: Transport> std::ops::DerefMut for Transaction<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
    }
}
