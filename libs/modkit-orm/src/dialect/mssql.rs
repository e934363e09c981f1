use super::{Dialect, DialectKind, join_fragments, require};
use crate::Result;
use crate::config::OrmConfig;
use crate::criteria::Criteria;
use crate::expr::value::quote;
use crate::schema::FieldType;

const OPERATORS: [&str; 14] = [
    "[{}] = {}",
    "[{}] > {}",
    "[{}] < {}",
    "[{}] LIKE {}",
    "[{}] IN ({})",
    "[{}] BETWEEN {} AND {}",
    "[{}] IS NULL",
    "[{}] <> {}",
    "[{}] <= {}",
    "[{}] >= {}",
    "[{}] NOT LIKE {}",
    "[{}] NOT IN ({})",
    "[{}] NOT BETWEEN {} AND {}",
    "[{}] IS NOT NULL",
];

/// ORDER BY used when paginating without a caller-supplied order; `OFFSET .. FETCH` requires one.
const IMPLICIT_ORDER: &str = " ORDER BY [ID]";

/// SQL Server family.
///
/// Pagination is `OFFSET o ROWS FETCH NEXT n ROWS ONLY`. When both a limit and an offset are set
/// the offset is emitted by [`limit_string`](Dialect::limit_string) and
/// [`offset_string`](Dialect::offset_string) stays empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct MsSqlDialect;

impl MsSqlDialect {
    fn implicit_order(criteria: &Criteria) -> &'static str {
        if criteria.has_order() { "" } else { IMPLICIT_ORDER }
    }
}

impl Dialect for MsSqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MsSql
    }

    fn connection_string(&self, cfg: &OrmConfig) -> Result<String> {
        let kind = self.kind();
        let user = require(cfg.user.as_deref(), "user", kind)?;
        let password = require(cfg.password.as_deref(), "password", kind)?;
        let host = require(cfg.host.as_deref(), "host", kind)?;
        let database = require(cfg.database.as_deref(), "database", kind)?;
        Ok(format!("sqlserver://{user}:{password}@{host}?database={database}"))
    }

    fn identity(&self, name: &str) -> String {
        format!("[{name}]")
    }

    fn limit_string(&self, criteria: &Criteria) -> String {
        match criteria.limit() {
            0 => String::new(),
            n => format!(
                "{} OFFSET {} ROWS FETCH NEXT {n} ROWS ONLY",
                Self::implicit_order(criteria),
                criteria.offset()
            ),
        }
    }

    fn offset_string(&self, criteria: &Criteria) -> String {
        if criteria.limit() > 0 {
            return String::new();
        }
        match criteria.offset() {
            0 => String::new(),
            o => format!("{} OFFSET {o} ROWS", Self::implicit_order(criteria)),
        }
    }

    fn build_query(&self, where_sql: &str, order: &str, limit: &str, offset: &str) -> String {
        join_fragments(&[where_sql, order, offset, limit])
    }

    fn table_exists_query(&self, name: &str) -> String {
        format!("SELECT [Name] FROM [sys].[tables] WHERE [Name] = {}", quote(name))
    }

    fn operators(&self) -> &'static [&'static str] {
        &OPERATORS
    }

    fn table_create(&self) -> &'static str {
        "IF OBJECT_ID(N'dbo.{table}', N'U') IS NULL BEGIN CREATE TABLE dbo.[{table}] ({columns}); END;"
    }

    fn index_create(&self) -> &'static str {
        "CREATE INDEX [{prefix}_{field}_Idx] ON [{table}]([{field}]);"
    }

    fn column_type(&self, field_type: FieldType) -> &'static str {
        match field_type {
            FieldType::Double => "FLOAT",
            other => other.column_type(),
        }
    }

    fn supports_unsigned(&self) -> bool {
        false
    }
}
