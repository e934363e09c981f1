//! Driver plumbing: one connected backend, its transactions and row decoding.
//!
//! Every statement is sent as plain SQL text and every cell is read back as optional text, so
//! the engine above never sees driver types.

use std::fmt;

use futures::{Stream, TryStreamExt};
use tokio::sync::mpsc;

use super::row::RowData;
use crate::{DbError, Result};

#[cfg(feature = "mssql")]
pub type MsSqlClient = tiberius::Client<tokio_util::compat::Compat<tokio::net::TcpStream>>;

#[cfg(feature = "mssql")]
type SharedClient = std::sync::Arc<tokio::sync::Mutex<MsSqlClient>>;

/// A connected driver.
pub enum Backend {
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlPool),
    /// A single client; statements are serialized through the mutex.
    #[cfg(feature = "mssql")]
    MsSql(SharedClient),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(_) => f.write_str("Backend::Sqlite"),
            #[cfg(feature = "mysql")]
            Backend::MySql(_) => f.write_str("Backend::MySql"),
            #[cfg(feature = "mssql")]
            Backend::MsSql(_) => f.write_str("Backend::MsSql"),
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => f.write_str("Backend"),
        }
    }
}

impl Backend {
    /// Run a statement, returning the number of affected rows.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => {
                let mut conn = pool.acquire().await?;
                Ok(sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(sql)).await?.rows_affected())
            }
            #[cfg(feature = "mysql")]
            Backend::MySql(pool) => {
                let mut conn = pool.acquire().await?;
                Ok(sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(sql)).await?.rows_affected())
            }
            #[cfg(feature = "mssql")]
            Backend::MsSql(client) => mssql::execute(&mut *client.lock().await, sql).await,
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => Err(crate::DbError::FeatureDisabled("no database backends enabled")),
        }
    }

    /// Run a query, buffering every row.
    pub async fn select(&self, sql: &str) -> Result<Vec<RowData>> {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => {
                let mut conn = pool.acquire().await?;
                let rows = sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(sql)).await?;
                rows.iter().map(sqlite::decode_row).collect()
            }
            #[cfg(feature = "mysql")]
            Backend::MySql(pool) => {
                let mut conn = pool.acquire().await?;
                let rows = sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(sql)).await?;
                rows.iter().map(mysql::decode_row).collect()
            }
            #[cfg(feature = "mssql")]
            Backend::MsSql(client) => mssql::select(&mut *client.lock().await, sql).await,
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => Err(crate::DbError::FeatureDisabled("no database backends enabled")),
        }
    }

    /// Run a query and send every row through `tx` as the driver yields it.
    ///
    /// Stops quietly once the receiver is dropped. A driver error ends the stream and is
    /// returned; rows read before it have already been sent.
    pub async fn stream<T: Send>(
        &self,
        sql: &str,
        tx: &mpsc::Sender<Result<T>>,
        load: impl Fn(&RowData) -> T + Send,
    ) -> Result<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => {
                let mut conn = pool.acquire().await?;
                let rows = sqlx::raw_sql(sql).fetch(&mut *conn);
                forward(rows, sqlite::decode_row, tx, load).await
            }
            #[cfg(feature = "mysql")]
            Backend::MySql(pool) => {
                let mut conn = pool.acquire().await?;
                let rows = sqlx::raw_sql(sql).fetch(&mut *conn);
                forward(rows, mysql::decode_row, tx, load).await
            }
            #[cfg(feature = "mssql")]
            Backend::MsSql(client) => {
                let mut client = client.lock().await;
                let rows = client.simple_query(sql).await?.into_row_stream();
                forward(rows, mssql::decode_row, tx, load).await
            }
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => {
                let _ = (sql, tx, load);
                Err(crate::DbError::FeatureDisabled("no database backends enabled"))
            }
        }
    }

    /// Begin a transaction.
    pub async fn begin(&self) -> Result<DbTransaction> {
        let inner = match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => TxInner::Sqlite(pool.begin().await?),
            #[cfg(feature = "mysql")]
            Backend::MySql(pool) => TxInner::MySql(pool.begin().await?),
            #[cfg(feature = "mssql")]
            Backend::MsSql(client) => {
                let mut guard = std::sync::Arc::clone(client).lock_owned().await;
                mssql::batch(&mut guard, "BEGIN TRAN").await?;
                TxInner::MsSql(mssql::Tx { guard: Some(guard) })
            }
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => return Err(crate::DbError::FeatureDisabled("no database backends enabled")),
        };
        Ok(DbTransaction { inner })
    }

    /// Close the pool. SQL Server clients are closed when the last handle is dropped.
    pub async fn close(&self) {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => pool.close().await,
            #[cfg(feature = "mysql")]
            Backend::MySql(pool) => pool.close().await,
            #[cfg(feature = "mssql")]
            Backend::MsSql(_) => {}
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => {}
        }
    }
}

/// An open transaction.
///
/// Dropping it without [`commit`](DbTransaction::commit) rolls it back.
#[must_use = "a transaction is rolled back when dropped"]
pub struct DbTransaction {
    inner: TxInner,
}

enum TxInner {
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::Transaction<'static, sqlx::Sqlite>),
    #[cfg(feature = "mysql")]
    MySql(sqlx::Transaction<'static, sqlx::MySql>),
    #[cfg(feature = "mssql")]
    MsSql(mssql::Tx),
}

impl fmt::Debug for DbTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbTransaction").finish_non_exhaustive()
    }
}

impl DbTransaction {
    pub(crate) async fn execute(&mut self, sql: &str) -> Result<u64> {
        match &mut self.inner {
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(tx) => Ok(sqlx::Executor::execute(&mut **tx, sqlx::raw_sql(sql)).await?.rows_affected()),
            #[cfg(feature = "mysql")]
            TxInner::MySql(tx) => Ok(sqlx::Executor::execute(&mut **tx, sqlx::raw_sql(sql)).await?.rows_affected()),
            #[cfg(feature = "mssql")]
            TxInner::MsSql(tx) => mssql::execute(tx.client()?, sql).await,
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => Err(crate::DbError::FeatureDisabled("no database backends enabled")),
        }
    }

    pub(crate) async fn select(&mut self, sql: &str) -> Result<Vec<RowData>> {
        match &mut self.inner {
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(tx) => {
                let rows = sqlx::Executor::fetch_all(&mut **tx, sqlx::raw_sql(sql)).await?;
                rows.iter().map(sqlite::decode_row).collect()
            }
            #[cfg(feature = "mysql")]
            TxInner::MySql(tx) => {
                let rows = sqlx::Executor::fetch_all(&mut **tx, sqlx::raw_sql(sql)).await?;
                rows.iter().map(mysql::decode_row).collect()
            }
            #[cfg(feature = "mssql")]
            TxInner::MsSql(tx) => mssql::select(tx.client()?, sql).await,
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => Err(crate::DbError::FeatureDisabled("no database backends enabled")),
        }
    }

    /// [`Backend::stream`] on the transaction's connection.
    pub(crate) async fn stream<T: Send>(
        &mut self,
        sql: &str,
        tx: &mpsc::Sender<Result<T>>,
        load: impl Fn(&RowData) -> T + Send,
    ) -> Result<()> {
        match &mut self.inner {
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(conn) => {
                let rows = sqlx::raw_sql(sql).fetch(&mut **conn);
                forward(rows, sqlite::decode_row, tx, load).await
            }
            #[cfg(feature = "mysql")]
            TxInner::MySql(conn) => {
                let rows = sqlx::raw_sql(sql).fetch(&mut **conn);
                forward(rows, mysql::decode_row, tx, load).await
            }
            #[cfg(feature = "mssql")]
            TxInner::MsSql(conn) => {
                let rows = conn.client()?.simple_query(sql).await?.into_row_stream();
                forward(rows, mssql::decode_row, tx, load).await
            }
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => {
                let _ = (sql, tx, load);
                Err(crate::DbError::FeatureDisabled("no database backends enabled"))
            }
        }
    }

    /// Commit the transaction.
    ///
    /// # Errors
    /// Returns an error if the commit operation fails.
    pub async fn commit(self) -> Result<()> {
        match self.inner {
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(tx) => tx.commit().await.map_err(Into::into),
            #[cfg(feature = "mysql")]
            TxInner::MySql(tx) => tx.commit().await.map_err(Into::into),
            #[cfg(feature = "mssql")]
            TxInner::MsSql(tx) => tx.finish("COMMIT TRAN").await,
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => Ok(()),
        }
    }

    /// Roll back the transaction.
    ///
    /// # Errors
    /// Returns an error if the rollback operation fails.
    pub async fn rollback(self) -> Result<()> {
        match self.inner {
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(tx) => tx.rollback().await.map_err(Into::into),
            #[cfg(feature = "mysql")]
            TxInner::MySql(tx) => tx.rollback().await.map_err(Into::into),
            #[cfg(feature = "mssql")]
            TxInner::MsSql(tx) => tx.finish(mssql::ROLLBACK).await,
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => Ok(()),
        }
    }
}

/// Decode and send rows one at a time; the next row is read only after the previous one was
/// accepted by the channel.
#[cfg_attr(
    not(any(feature = "sqlite", feature = "mysql", feature = "mssql")),
    allow(dead_code)
)]
async fn forward<R, E, T>(
    mut rows: impl Stream<Item = std::result::Result<R, E>> + Unpin,
    decode: impl Fn(&R) -> Result<RowData>,
    tx: &mpsc::Sender<Result<T>>,
    load: impl Fn(&RowData) -> T,
) -> Result<()>
where
    DbError: From<E>,
{
    while let Some(row) = rows.try_next().await? {
        let item = load(&decode(&row)?);
        if tx.send(Ok(item)).await.is_err() {
            tracing::trace!("row stream receiver dropped");
            break;
        }
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

    use super::RowData;
    use crate::Result;

    /// Decode by the storage class of each value; declared column types are only advisory.
    pub fn decode_row(row: &SqliteRow) -> Result<RowData> {
        let mut cells = Vec::with_capacity(row.len());
        for (i, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(i)?;
            let cell = if raw.is_null() {
                None
            } else {
                match raw.type_info().name() {
                    "INTEGER" => Some(row.try_get_unchecked::<i64, _>(i)?.to_string()),
                    "REAL" => Some(row.try_get_unchecked::<f64, _>(i)?.to_string()),
                    "BLOB" => {
                        tracing::trace!(column = column.name(), "skipping BLOB cell");
                        None
                    }
                    _ => Some(row.try_get_unchecked::<String, _>(i)?),
                }
            };
            cells.push((column.name().to_owned(), cell));
        }
        Ok(RowData::new(cells))
    }
}

#[cfg(feature = "mysql")]
mod mysql {
    use sqlx::mysql::MySqlRow;
    use sqlx::{Column as _, Row as _};

    use super::RowData;
    use crate::Result;

    /// Raw statements use the text protocol, so every value arrives as text already.
    pub fn decode_row(row: &MySqlRow) -> Result<RowData> {
        let cells = row
            .columns()
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let cell = row.try_get_unchecked::<Option<String>, _>(i)?;
                Ok((column.name().to_owned(), cell))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RowData::new(cells))
    }
}

#[cfg(feature = "mssql")]
mod mssql {
    use chrono::NaiveDateTime;
    use tiberius::{ColumnData, FromSql, Row};
    use tokio::sync::OwnedMutexGuard;

    use super::{MsSqlClient, RowData};
    use crate::expr::value::format_timestamp;
    use crate::{DbError, Result};

    pub const ROLLBACK: &str = "IF @@TRANCOUNT > 0 ROLLBACK TRAN";

    pub async fn batch(client: &mut MsSqlClient, sql: &str) -> Result<()> {
        client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }

    pub async fn execute(client: &mut MsSqlClient, sql: &str) -> Result<u64> {
        Ok(client.execute(sql, &[]).await?.total())
    }

    pub async fn select(client: &mut MsSqlClient, sql: &str) -> Result<Vec<RowData>> {
        let rows = client.simple_query(sql).await?.into_first_result().await?;
        rows.iter().map(decode_row).collect()
    }

    #[allow(clippy::unnecessary_wraps)]
    pub fn decode_row(row: &Row) -> Result<RowData> {
        Ok(RowData::new(
            row.cells()
                .map(|(column, data)| (column.name().to_owned(), cell(data)))
                .collect(),
        ))
    }

    fn cell(data: &ColumnData<'static>) -> Option<String> {
        match data {
            ColumnData::U8(v) => v.map(|v| v.to_string()),
            ColumnData::I16(v) => v.map(|v| v.to_string()),
            ColumnData::I32(v) => v.map(|v| v.to_string()),
            ColumnData::I64(v) => v.map(|v| v.to_string()),
            ColumnData::F32(v) => v.map(|v| v.to_string()),
            ColumnData::F64(v) => v.map(|v| v.to_string()),
            ColumnData::Bit(v) => v.map(|v| String::from(if v { "1" } else { "0" })),
            ColumnData::String(v) => v.as_ref().map(ToString::to_string),
            ColumnData::Guid(v) => v.as_ref().map(ToString::to_string),
            ColumnData::Numeric(v) => v.as_ref().map(ToString::to_string),
            ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
                NaiveDateTime::from_sql(data)
                    .ok()
                    .flatten()
                    .map(|ts| format_timestamp(&ts.and_utc()))
            }
            _ => {
                tracing::trace!("skipping unsupported cell");
                None
            }
        }
    }

    /// Client guard held for the lifetime of an explicit transaction.
    pub struct Tx {
        pub guard: Option<OwnedMutexGuard<MsSqlClient>>,
    }

    impl Tx {
        pub fn client(&mut self) -> Result<&mut MsSqlClient> {
            self.guard
                .as_deref_mut()
                .ok_or_else(|| DbError::Other(anyhow::anyhow!("transaction already finished")))
        }

        pub async fn finish(mut self, sql: &str) -> Result<()> {
            let mut guard = self
                .guard
                .take()
                .ok_or_else(|| DbError::Other(anyhow::anyhow!("transaction already finished")))?;
            batch(&mut guard, sql).await
        }
    }

    impl Drop for Tx {
        fn drop(&mut self) {
            let Some(mut guard) = self.guard.take() else {
                return;
            };
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = batch(&mut guard, ROLLBACK).await {
                        tracing::warn!(error = %e, "rollback of dropped transaction failed");
                    }
                });
            }
        }
    }
}
