//! Per-backend SQL dialects.
//!
//! A [`Dialect`] owns everything that differs between backends: the driver connection string,
//! identifier quoting, pagination syntax, the table-existence query, DDL templates and the
//! operator table consumed by [`Where`](crate::Where).
//!
//! Operator tables hold 14 templates with `{}` placeholders: seven positive forms (equal,
//! greater, less, like, in, between, is-null) followed by their negations in the same order.
//! DDL templates use the named placeholders `{table}`, `{columns}`, `{prefix}` and `{field}`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::OrmConfig;
use crate::criteria::Criteria;
use crate::schema::FieldType;
use crate::{DbError, Result};

mod mssql;
mod mysql;
mod sqlite;

pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use sqlite::SqliteDialect;

/// Supported backend families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Sqlite,
    MySql,
    MsSql,
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectKind::Sqlite => "sqlite",
            DialectKind::MySql => "mysql",
            DialectKind::MsSql => "sqlserver",
        })
    }
}

impl FromStr for DialectKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DialectKind::Sqlite),
            "mysql" | "mariadb" => Ok(DialectKind::MySql),
            "sqlserver" | "mssql" => Ok(DialectKind::MsSql),
            _ => Err(DbError::InvalidConfig(format!("invalid database type: {s}"))),
        }
    }
}

/// Backend-specific SQL strategy.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn kind(&self) -> DialectKind;

    /// Validate `cfg` and format the driver connection string.
    ///
    /// # Errors
    /// Returns `DbError::InvalidConfig` when a required field is missing or blank.
    fn connection_string(&self, cfg: &OrmConfig) -> Result<String>;

    /// Quote an identifier.
    fn identity(&self, name: &str) -> String;

    /// Pagination size clause, empty when no limit is set.
    fn limit_string(&self, criteria: &Criteria) -> String;

    /// Pagination offset clause, empty when no offset is set.
    fn offset_string(&self, criteria: &Criteria) -> String;

    /// Join rendered fragments in statement order.
    fn build_query(&self, where_sql: &str, order: &str, limit: &str, offset: &str) -> String {
        join_fragments(&[where_sql, order, limit, offset])
    }

    /// Query returning at least one row iff table `name` exists.
    fn table_exists_query(&self, name: &str) -> String;

    /// The 14-entry operator template table.
    fn operators(&self) -> &'static [&'static str];

    /// `CREATE TABLE` template with `{table}` and `{columns}` placeholders.
    fn table_create(&self) -> &'static str;

    /// `CREATE INDEX` template with `{prefix}`, `{field}` and `{table}` placeholders.
    fn index_create(&self) -> &'static str;

    /// Native column type for a semantic field type, without size suffix.
    fn column_type(&self, field_type: FieldType) -> &'static str {
        field_type.column_type()
    }

    /// Whether integer columns accept the `UNSIGNED` modifier.
    fn supports_unsigned(&self) -> bool {
        true
    }
}

/// Resolve the dialect declared by `cfg`.
///
/// # Errors
/// Returns `DbError::InvalidConfig` when no configuration is given or the engine name is not
/// recognized.
pub fn dialect_for(cfg: Option<&OrmConfig>) -> Result<Arc<dyn Dialect>> {
    let cfg = cfg.ok_or_else(|| DbError::InvalidConfig("config cannot be empty".to_owned()))?;
    let kind: DialectKind = cfg.engine.parse()?;
    tracing::debug!(engine = %cfg.engine, dialect = %kind, "Resolved SQL dialect");
    Ok(match kind {
        DialectKind::Sqlite => Arc::new(SqliteDialect),
        DialectKind::MySql => Arc::new(MySqlDialect::new(cfg.database.clone().unwrap_or_default())),
        DialectKind::MsSql => Arc::new(MsSqlDialect),
    })
}

/// Trim each fragment and prefix the non-empty ones with a single space.
pub(crate) fn join_fragments(fragments: &[&str]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            out.push(' ');
            out.push_str(fragment);
        }
    }
    out
}

/// Fetch a required connection field, rejecting blanks.
pub(crate) fn require<'a>(value: Option<&'a str>, field: &str, kind: DialectKind) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DbError::InvalidConfig(format!(
            "'{field}' is required for {kind} connections"
        ))),
    }
}

/// Replace `{name}` placeholders of a DDL template.
#[must_use]
pub fn render_template(template: &str, params: &[(&str, &str)]) -> String {
    params.iter().fold(template.to_owned(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}
