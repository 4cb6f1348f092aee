use std::ops::Deref;

use rusqlite::types::Value;
use rusqlite::Connection;

use super::connection::DbConnection;
use crate::error::StoreResult;

/// A transaction on one pooled connection.
///
/// Finish it with [`UnitOfWork::commit`] or [`UnitOfWork::rollback`]. A unit
/// of work dropped before either (early return, `?`, panic) is rolled back and
/// its connection goes back to the pool.
pub struct UnitOfWork {
    conn: DbConnection,
    finished: bool,
}

impl UnitOfWork {
    pub(crate) fn begin(conn: DbConnection) -> StoreResult<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        tracing::debug!("Unit of work started");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    pub fn commit(mut self) -> StoreResult<()> {
        // On failure the transaction is still open and Drop rolls it back
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        tracing::debug!("Unit of work committed");
        Ok(())
    }

    pub fn rollback(mut self) -> StoreResult<()> {
        // On failure Drop retries the rollback
        self.conn.execute_batch("ROLLBACK")?;
        self.finished = true;
        tracing::debug!("Unit of work rolled back");
        Ok(())
    }

    /// Run one raw SQL statement; returns rows affected
    pub fn execute_raw(&self, sql: &str) -> StoreResult<usize> {
        tracing::debug!(%sql, "raw statement");
        Ok(self.conn.execute(sql, [])?)
    }

    /// Run a raw SQL script of one or more statements
    pub fn execute_batch(&self, sql: &str) -> StoreResult<()> {
        tracing::debug!(%sql, "raw batch");
        Ok(self.conn.execute_batch(sql)?)
    }

    /// Run a raw query and return every row as loosely typed values
    pub fn query_raw(&self, sql: &str) -> StoreResult<Vec<Vec<Value>>> {
        tracing::debug!(%sql, "raw query");
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<Result<Vec<Vec<Value>>, _>>()?;
        Ok(rows)
    }
}

impl Deref for UnitOfWork {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("Unit of work dropped without commit, rolling back");
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::error!("Failed to roll back unit of work: {}", e);
        }
    }
}

const OPERATION_SAVEPOINT: &str = "relata_operation";

/// Run `op` under a savepoint: on error every statement it issued is undone
/// and earlier work in the enclosing transaction is kept.
pub(crate) fn atomically<T, F>(conn: &Connection, op: F) -> StoreResult<T>
where
    F: FnOnce(&Connection) -> StoreResult<T>,
{
    conn.execute_batch(&format!("SAVEPOINT {}", OPERATION_SAVEPOINT))?;
    match op(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {}", OPERATION_SAVEPOINT))?;
            Ok(value)
        }
        Err(e) => {
            let undo = format!(
                "ROLLBACK TO {name}; RELEASE {name}",
                name = OPERATION_SAVEPOINT
            );
            if let Err(rollback_err) = conn.execute_batch(&undo) {
                tracing::error!("Failed to roll back operation: {}", rollback_err);
            }
            Err(e)
        }
    }
}
