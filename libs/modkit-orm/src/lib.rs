#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `ModKit` ORM crate.
//!
//! This crate persists plain Rust structures to `SQLite`, `MySQL` and SQL Server through one
//! call surface. Per-backend SQL differences (identifier quoting, pagination, DDL) live behind
//! the [`Dialect`] strategy; filters and ordering are composed with [`Where`] and [`Order`] and
//! normalized into a [`Criteria`] before rendering.
//!
//! # Features
//! - `sqlite`, `mysql`: enable the `SQLx` drivers
//! - `mssql`: enable the `tiberius` driver for SQL Server
//! - `macros`: `#[derive(Entity)]` and `#[derive(Fields)]`
//!
//! # Example
//! ```rust,no_run
//! use modkit_orm::{Database, Entity, Model, OrmConfig, Where};
//! use figment::{Figment, providers::Serialized};
//!
//! #[derive(Debug, Default, Entity)]
//! struct Person {
//!     #[orm(model)]
//!     model: Model,
//!     #[orm("size:64")]
//!     name: String,
//!     #[orm]
//!     age: i32,
//! }
//!
//! # async fn run() -> modkit_orm::Result<()> {
//! let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
//!     "database": { "engine": "sqlite", "database": "/var/lib/app/app.db" }
//! })));
//! let db = Database::connect(&OrmConfig::from_figment(&figment)?).await?;
//!
//! let mut alex = Person { name: "Alex".into(), age: 30, ..Default::default() };
//! db.save(&mut alex).await?;
//!
//! let adults: Vec<Person> = db.fetch(Where::greater("age", 17)).await?;
//! # let _ = adults;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    not(any(feature = "mysql", feature = "sqlite", feature = "mssql")),
    allow(
        unused_imports,
        unused_variables,
        dead_code,
        unreachable_code,
        clippy::unused_async,
    )
)]

extern crate self as modkit_orm;

// Core modules
pub mod config;
pub mod criteria;
pub mod dialect;
pub mod engine;
pub mod expr;
pub mod options;
pub mod schema;

// Internal modules
mod pool_opts;

pub use config::{OrmConfig, PoolCfg};
pub use criteria::{Criteria, CriteriaArg, CriteriaArgs};
pub use dialect::{Dialect, DialectKind, dialect_for};
pub use engine::{Database, DbTransaction, EntityStream, RowData};
pub use expr::{Conjunction, Operator, Order, Value, Where};
pub use schema::{
    Column, Entity, FieldDescriptor, FieldSize, FieldType, Fields, Model, Restorable,
    StandingData, Updatable,
};

#[cfg(feature = "macros")]
pub use modkit_orm_macros::{Entity, Fields};

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the ORM engine and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("No results: {0}")]
    NoResults(String),

    #[error("Entity of table '{0}' has no id")]
    NoId(&'static str),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MsSql(#[from] tiberius::error::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    /// True when a single-row lookup matched nothing.
    #[must_use]
    pub fn is_no_results(&self) -> bool {
        matches!(self, DbError::NoResults(_))
    }
}
