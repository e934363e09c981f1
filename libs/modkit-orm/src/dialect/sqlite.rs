use super::{Dialect, DialectKind, require};
use crate::Result;
use crate::config::OrmConfig;
use crate::criteria::Criteria;
use crate::expr::value::quote;

/// `OFFSET` needs a `LIMIT`; a negative one means no limit.
const UNBOUNDED_LIMIT: &str = " LIMIT -1";

const OPERATORS: [&str; 14] = [
    "\"{}\" = {}",
    "\"{}\" > {}",
    "\"{}\" < {}",
    "\"{}\" LIKE {}",
    "\"{}\" IN ({})",
    "\"{}\" BETWEEN {} AND {}",
    "\"{}\" IS NULL",
    "\"{}\" <> {}",
    "\"{}\" <= {}",
    "\"{}\" >= {}",
    "\"{}\" NOT LIKE {}",
    "\"{}\" NOT IN ({})",
    "\"{}\" NOT BETWEEN {} AND {}",
    "\"{}\" IS NOT NULL",
];

/// Embedded `SQLite` databases; the connection string is the database path.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn connection_string(&self, cfg: &OrmConfig) -> Result<String> {
        Ok(require(cfg.database.as_deref(), "database", self.kind())?.to_owned())
    }

    fn identity(&self, name: &str) -> String {
        format!("\"{name}\"")
    }

    fn limit_string(&self, criteria: &Criteria) -> String {
        match (criteria.limit(), criteria.offset()) {
            (0, 0) => String::new(),
            (0, _) => UNBOUNDED_LIMIT.to_owned(),
            (n, _) => format!(" LIMIT {n}"),
        }
    }

    fn offset_string(&self, criteria: &Criteria) -> String {
        match criteria.offset() {
            0 => String::new(),
            n => format!(" OFFSET {n}"),
        }
    }

    fn table_exists_query(&self, name: &str) -> String {
        format!(
            "SELECT \"name\" FROM sqlite_master WHERE type='table' AND name={}",
            quote(name)
        )
    }

    fn operators(&self) -> &'static [&'static str] {
        &OPERATORS
    }

    fn table_create(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS \"{table}\" ({columns});"
    }

    fn index_create(&self) -> &'static str {
        "CREATE INDEX IF NOT EXISTS \"{prefix}_{field}_Idx\" ON \"{table}\"(\"{field}\");"
    }
}
