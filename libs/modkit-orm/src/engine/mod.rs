//! Data access engine.
//!
//! [`Database`] owns the dialect, the connected backend and the per-table schema caches. Every
//! entity operation makes sure the entity's table exists first: the table is checked once, created
//! (and seeded with standing data) when absent, and remembered for the lifetime of the engine.
//!
//! Unless [`OrmConfig::disable_transactions`] is set, each statement that is not run inside an
//! explicit [`DbTransaction`] gets its own transaction.

mod backend;
mod commands;
mod row;
mod stream;

use std::fmt;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

pub(crate) use backend::Backend;
pub use backend::DbTransaction;
pub use row::RowData;
pub use stream::EntityStream;

use crate::config::OrmConfig;
use crate::criteria::{Criteria, CriteriaArgs};
use crate::dialect::{Dialect, dialect_for};
use crate::expr::{Value, Where};
use crate::options::build_connect_options;
use crate::schema::field::ID;
use crate::schema::{Entity, FieldDescriptor, Model, ddl, now, populate};
use crate::{DbError, Result};

/// Handle to a connected database.
///
/// Cloning is cheap; clones share the pool and the schema caches.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    dialect: Arc<dyn Dialect>,
    backend: Backend,
    config: OrmConfig,
    known_tables: DashSet<&'static str>,
    /// Tables created by this engine whose standing data is not saved yet.
    unseeded: DashSet<&'static str>,
    descriptors: DashMap<&'static str, Arc<[FieldDescriptor]>>,
    /// Serializes first-use schema creation.
    schema_lock: Mutex<()>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.inner.dialect.kind())
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Connect using `config`. `${VAR}` references in the connection fields are expanded first.
    ///
    /// # Errors
    /// Returns `DbError::InvalidConfig` for an unknown engine or missing fields,
    /// `DbError::FeatureDisabled` when the backend's driver is not compiled in, and the driver
    /// error when the connection fails.
    pub async fn connect(config: &OrmConfig) -> Result<Self> {
        let config = config.resolved()?;
        let dialect = dialect_for(Some(&config))?;
        let backend = build_connect_options(&config, dialect.as_ref())?
            .connect(&config.pool)
            .await?;
        tracing::info!(engine = %dialect.kind(), "Connected to database");

        Ok(Self {
            inner: Arc::new(Inner {
                dialect,
                backend,
                config,
                known_tables: DashSet::new(),
                unseeded: DashSet::new(),
                descriptors: DashMap::new(),
                schema_lock: Mutex::new(()),
            }),
        })
    }

    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.inner.dialect.as_ref()
    }

    /// Resolved configuration the engine was connected with.
    #[must_use]
    pub fn config(&self) -> &OrmConfig {
        &self.inner.config
    }

    // --- Entity operations ---

    /// All entities matching `criteria`.
    ///
    /// # Errors
    /// Returns `DbError::InvalidCriteria` for unusable criteria, `DbError::Schema` when the
    /// table cannot be created, and driver errors.
    pub async fn fetch<E: Entity>(&self, criteria: impl Into<CriteriaArgs>) -> Result<Vec<E>> {
        let criteria = criteria.into().assemble()?;
        self.fetch_criteria(&criteria).await
    }

    /// Lazily stream the entities matching `criteria`.
    ///
    /// The query runs on a spawned task that reads the driver's cursor one row at a time; each
    /// row is populated only once the previous entity was taken from the stream. Errors,
    /// including invalid criteria, are yielded as items and end the stream. Must be called
    /// within a Tokio runtime.
    ///
    /// On SQL Server the single client is busy until the stream is exhausted or dropped.
    pub fn range<E: Entity>(&self, criteria: impl Into<CriteriaArgs>) -> EntityStream<E> {
        let (tx, rx) = mpsc::channel(1);
        let criteria = criteria.into().assemble();
        let db = self.clone();

        tokio::spawn(async move {
            let streamed = match criteria {
                Ok(criteria) => db.stream_rows::<E>(&criteria, &tx).await,
                Err(e) => Err(e),
            };
            if let Err(e) = streamed
                && tx.send(Err(e)).await.is_err()
            {
                tracing::trace!(table = E::TABLE, "range stream dropped");
            }
        });

        EntityStream::new(rx)
    }

    /// The first entity matching `criteria`.
    ///
    /// # Errors
    /// Returns `DbError::NoResults` when nothing matches, plus the errors of [`fetch`](Self::fetch).
    pub async fn first<E: Entity>(&self, criteria: impl Into<CriteriaArgs>) -> Result<E> {
        let criteria = criteria.into().assemble()?.with_limit(1).with_offset(0);
        self.fetch_criteria(&criteria)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::NoResults(format!("no {} matches the criteria", E::TABLE)))
    }

    /// Number of entities matching `criteria`.
    ///
    /// Returns `0` when the table does not exist yet and `-1` when the criteria are invalid.
    ///
    /// # Errors
    /// Returns driver errors.
    pub async fn count<E: Entity>(&self, criteria: impl Into<CriteriaArgs>) -> Result<i64> {
        let criteria = match criteria.into().assemble() {
            Ok(criteria) => criteria,
            Err(e) => {
                tracing::debug!(table = E::TABLE, error = %e, "count with invalid criteria");
                return Ok(-1);
            }
        };
        if !self.inner.known_tables.contains(E::TABLE) && !self.table_exists(E::TABLE).await? {
            return Ok(0);
        }

        let rows = self
            .query(&commands::count(self.dialect(), E::TABLE, &criteria))
            .await?;
        Ok(rows
            .first()
            .and_then(RowData::first)
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or_default())
    }

    /// Insert a new entity or update a persisted one.
    ///
    /// New entities receive a fresh ID and creation timestamps; updates refresh `LastUpdate`.
    /// Entities exposing [`Updatable`](crate::Updatable) run their own command instead.
    ///
    /// # Errors
    /// Returns `DbError::Schema` when the table cannot be created, any error of the entity's
    /// update command, and driver errors.
    pub async fn save<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let fields = self.ensure_table::<E>().await?;
        self.save_with(entity, &fields).await
    }

    /// Delete an entity: physically when `deletable` is configured, otherwise by stamping
    /// `DeleteDate` (on the entity too). Entities that were never saved are left alone.
    ///
    /// # Errors
    /// Returns driver errors.
    pub async fn remove<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let Some(id) = entity.model().id().map(str::to_owned) else {
            return Ok(());
        };
        self.ensure_table::<E>().await?;

        if self.inner.config.deletable {
            self.execute(&commands::remove(self.dialect(), E::TABLE, &id, None))
                .await?;
        } else {
            let ts = now();
            let delete_date = Value::from(ts);
            self.execute(&commands::remove(self.dialect(), E::TABLE, &id, Some(&delete_date)))
                .await?;
            entity.model_mut().delete_date = Some(ts);
        }
        Ok(())
    }

    /// Delete every live entity matching `criteria`, returning how many matched.
    ///
    /// # Errors
    /// Returns `DbError::InvalidCriteria` for unusable criteria and driver errors.
    pub async fn remove_many<E: Entity>(&self, criteria: impl Into<CriteriaArgs>) -> Result<u64> {
        let criteria = criteria.into().assemble()?.with_deleted(false);
        let matched = self.count::<E>(&criteria).await?;
        let Ok(matched) = u64::try_from(matched) else {
            return Ok(0);
        };
        if matched == 0 {
            return Ok(0);
        }

        let delete_date = (!self.inner.config.deletable).then(|| Value::from(now()));
        self.execute(&commands::remove_many(
            self.dialect(),
            E::TABLE,
            &criteria,
            delete_date.as_ref(),
        ))
        .await?;
        Ok(matched)
    }

    /// Reload a persisted entity in place.
    ///
    /// # Errors
    /// Returns `DbError::NoId` for an entity that was never saved and `DbError::NoResults` when
    /// its row is gone or soft-deleted.
    pub async fn refresh<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let id = entity.model().id().ok_or(DbError::NoId(E::TABLE))?.to_owned();
        *entity = self.first(Where::equal(ID, id)).await?;
        Ok(())
    }

    // --- Raw passthroughs ---

    /// Run a statement, returning the number of affected rows.
    ///
    /// # Errors
    /// Returns driver errors.
    pub async fn raw_execute(&self, sql: &str) -> Result<u64> {
        self.execute(sql).await
    }

    /// First cell of the first row, as text.
    ///
    /// # Errors
    /// Returns driver errors.
    pub async fn raw_scalar(&self, sql: &str) -> Result<Option<String>> {
        Ok(first_cell(&self.query(sql).await?))
    }

    /// Rows of named text cells.
    ///
    /// # Errors
    /// Returns driver errors.
    pub async fn raw_select(&self, sql: &str) -> Result<Vec<RowData>> {
        self.query(sql).await
    }

    /// [`raw_execute`](Self::raw_execute) inside `tx`.
    ///
    /// # Errors
    /// Returns driver errors.
    pub async fn raw_execute_in(&self, tx: &mut DbTransaction, sql: &str) -> Result<u64> {
        self.log_statement(sql);
        tx.execute(sql).await
    }

    /// [`raw_scalar`](Self::raw_scalar) inside `tx`.
    ///
    /// # Errors
    /// Returns driver errors.
    pub async fn raw_scalar_in(&self, tx: &mut DbTransaction, sql: &str) -> Result<Option<String>> {
        self.log_statement(sql);
        Ok(first_cell(&tx.select(sql).await?))
    }

    /// [`raw_select`](Self::raw_select) inside `tx`.
    ///
    /// # Errors
    /// Returns driver errors.
    pub async fn raw_select_in(&self, tx: &mut DbTransaction, sql: &str) -> Result<Vec<RowData>> {
        self.log_statement(sql);
        tx.select(sql).await
    }

    // --- Transactions and lifecycle ---

    /// Begin an explicit transaction.
    ///
    /// On SQL Server the single client stays reserved for the transaction until it is committed
    /// or rolled back; other operations on this engine wait for it.
    ///
    /// # Errors
    /// Returns an error if the transaction cannot be started.
    pub async fn begin(&self) -> Result<DbTransaction> {
        self.inner.backend.begin().await
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.inner.backend.close().await;
        tracing::debug!(engine = %self.inner.dialect.kind(), "Database closed");
    }

    // --- Internals ---

    fn log_statement(&self, sql: &str) {
        tracing::debug!(engine = %self.inner.dialect.kind(), sql = %sql, "Executing statement");
    }

    async fn query(&self, sql: &str) -> Result<Vec<RowData>> {
        self.log_statement(sql);
        if self.inner.config.disable_transactions {
            return self.inner.backend.select(sql).await;
        }
        let mut tx = self.inner.backend.begin().await?;
        let rows = tx.select(sql).await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        self.log_statement(sql);
        if self.inner.config.disable_transactions {
            return self.inner.backend.execute(sql).await;
        }
        let mut tx = self.inner.backend.begin().await?;
        let affected = tx.execute(sql).await?;
        tx.commit().await?;
        Ok(affected)
    }

    fn descriptors<E: Entity>(&self) -> Arc<[FieldDescriptor]> {
        Arc::clone(
            &self
                .inner
                .descriptors
                .entry(E::TABLE)
                .or_insert_with(|| E::descriptors().into()),
        )
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let rows = self.query(&self.dialect().table_exists_query(table)).await?;
        Ok(!rows.is_empty())
    }

    /// Make sure the table of `E` exists, creating and seeding it on first use.
    ///
    /// The table is remembered only once its standing data is in place; a failed seed is
    /// rolled back and retried by the next operation on the table.
    async fn ensure_table<E: Entity>(&self) -> Result<Arc<[FieldDescriptor]>> {
        let fields = self.descriptors::<E>();
        if self.inner.known_tables.contains(E::TABLE) {
            return Ok(fields);
        }

        let _schema = self.inner.schema_lock.lock().await;
        if self.inner.known_tables.contains(E::TABLE) {
            return Ok(fields);
        }

        if !self.table_exists(E::TABLE).await? {
            for sql in ddl::table_definition(self.dialect(), E::TABLE, &fields) {
                self.execute(&sql).await.map_err(|e| {
                    DbError::Schema(format!("cannot create table {}: {e}", E::TABLE))
                })?;
            }
            tracing::info!(table = E::TABLE, columns = fields.len(), "Created table");
            self.inner.unseeded.insert(E::TABLE);
        }

        if self.inner.unseeded.contains(E::TABLE) {
            self.seed::<E>(&fields).await.map_err(|e| {
                tracing::warn!(table = E::TABLE, error = %e, "Failed to save standing data");
                DbError::Schema(format!("cannot seed table {}: {e}", E::TABLE))
            })?;
            self.inner.unseeded.remove(E::TABLE);
        }

        self.inner.known_tables.insert(E::TABLE);
        Ok(fields)
    }

    /// Save the standing data of `E` in a single transaction.
    async fn seed<E: Entity>(&self, fields: &[FieldDescriptor]) -> Result<()> {
        let rows = E::standing_data();
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.inner.backend.begin().await?;
        for row in &rows {
            let (sql, _) = self.save_statement(row, fields)?;
            self.log_statement(&sql);
            tx.execute(&sql).await?;
        }
        tx.commit().await?;
        tracing::debug!(table = E::TABLE, rows = rows.len(), "Saved standing data");
        Ok(())
    }

    async fn save_with<E: Entity>(&self, entity: &mut E, fields: &[FieldDescriptor]) -> Result<()> {
        let (sql, model) = self.save_statement(entity, fields)?;
        self.execute(&sql).await?;
        if let Some(model) = model {
            *entity.model_mut() = model;
        }
        Ok(())
    }

    /// The statement saving `entity`, with the model it leaves behind when it runs.
    ///
    /// Updatable entities bring their own statement and keep their model untouched.
    fn save_statement<E: Entity>(
        &self,
        entity: &E,
        fields: &[FieldDescriptor],
    ) -> Result<(String, Option<Model>)> {
        if let Some(updatable) = entity.as_updatable() {
            return Ok((updatable.update_command(self.dialect())?, None));
        }

        let mut values = Vec::with_capacity(fields.len());
        entity.values(&mut values);

        let mut model = entity.model().clone();
        let ts = now();
        let sql = if model.is_new() {
            model.id = Some(Uuid::new_v4().to_string());
            model.create_date = ts;
            model.last_update = ts;
            commands::insert(self.dialect(), E::TABLE, &model, &values)
        } else {
            model.last_update = ts;
            commands::update(self.dialect(), E::TABLE, fields, &model, &values)
        };
        Ok((sql, Some(model)))
    }

    /// Send the entities matching `criteria` through `tx` as the driver reads them.
    async fn stream_rows<E: Entity>(
        &self,
        criteria: &Criteria,
        tx: &mpsc::Sender<Result<E>>,
    ) -> Result<()> {
        self.ensure_table::<E>().await?;
        let sql = commands::select(self.dialect(), E::TABLE, criteria);
        self.log_statement(&sql);

        let load = |row: &RowData| self.load::<E>(row);
        if self.inner.config.disable_transactions {
            return self.inner.backend.stream(&sql, tx, load).await;
        }
        let mut transaction = self.inner.backend.begin().await?;
        transaction.stream(&sql, tx, load).await?;
        transaction.commit().await
    }

    async fn select_rows<E: Entity>(&self, criteria: &Criteria) -> Result<Vec<RowData>> {
        self.ensure_table::<E>().await?;
        self.query(&commands::select(self.dialect(), E::TABLE, criteria))
            .await
    }

    async fn fetch_criteria<E: Entity>(&self, criteria: &Criteria) -> Result<Vec<E>> {
        let rows = self.select_rows::<E>(criteria).await?;
        Ok(rows.iter().map(|row| self.load(row)).collect())
    }

    /// Populate a fresh entity from `row` and run its restore hook.
    fn load<E: Entity>(&self, row: &RowData) -> E {
        let mut entity = E::default();
        populate(&mut entity, row.cells());
        if let Some(restorable) = entity.as_restorable() {
            restorable.restore(self.dialect());
        }
        entity
    }
}

fn first_cell(rows: &[RowData]) -> Option<String> {
    rows.first().and_then(RowData::first).map(str::to_owned)
}
