use super::{Dialect, DialectKind, require};
use crate::Result;
use crate::config::OrmConfig;
use crate::criteria::Criteria;
use crate::expr::value::quote;

/// `OFFSET` needs a `LIMIT`; the largest unsigned value stands for no limit.
const UNBOUNDED_LIMIT: &str = " LIMIT 18446744073709551615";

const OPERATORS: [&str; 14] = [
    "`{}` = {}",
    "`{}` > {}",
    "`{}` < {}",
    "`{}` LIKE {}",
    "`{}` IN ({})",
    "`{}` BETWEEN {} AND {}",
    "`{}` IS NULL",
    "`{}` <> {}",
    "`{}` <= {}",
    "`{}` >= {}",
    "`{}` NOT LIKE {}",
    "`{}` NOT IN ({})",
    "`{}` NOT BETWEEN {} AND {}",
    "`{}` IS NOT NULL",
];

/// `MySQL` and `MariaDB`.
///
/// Keeps the database name: the table lookup filters `SHOW TABLES` on `Tables_in_<db>`.
#[derive(Clone, Debug, Default)]
pub struct MySqlDialect {
    database: String,
}

impl MySqlDialect {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn connection_string(&self, cfg: &OrmConfig) -> Result<String> {
        let kind = self.kind();
        let user = require(cfg.user.as_deref(), "user", kind)?;
        let password = require(cfg.password.as_deref(), "password", kind)?;
        let host = require(cfg.host.as_deref(), "host", kind)?;
        let database = require(cfg.database.as_deref(), "database", kind)?;
        Ok(format!("{user}:{password}@tcp({host})/{database}"))
    }

    fn identity(&self, name: &str) -> String {
        format!("`{name}`")
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
        format!("SHOW TABLES WHERE Tables_in_{} = {}", self.database, quote(name))
    }

    fn operators(&self) -> &'static [&'static str] {
        &OPERATORS
    }

    fn table_create(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS `{table}` ({columns});"
    }

    fn index_create(&self) -> &'static str {
        "CREATE INDEX `{prefix}_{field}_Idx` ON `{table}`(`{field}`);"
    }
}
