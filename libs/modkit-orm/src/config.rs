//! Database configuration types.
//!
//! Configuration is read from the `database` section of a [`Figment`]:
//!
//! ```yaml
//! database:
//!   engine: mysql            # sqlite | sqlite3 | mysql | mariadb | sqlserver | mssql
//!   host: db.local:3306
//!   database: shop           # database name, or the file path for SQLite
//!   user: app
//!   password: ${SHOP_DB_PASSWORD}
//!   deletable: false         # hard-delete instead of soft-delete
//!   disable_transactions: false
//!   trust_server_certificate: false  # SQL Server only: skip TLS certificate validation
//!   pool:
//!     max_conns: 10
//!     acquire_timeout: 30s
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use figment::Figment;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{DbError, Result};

#[allow(clippy::expect_used)]
static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env reference pattern")
});

/// Connection and behavior settings for a [`Database`](crate::Database).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Backend name; synonyms are accepted (see [`DialectKind`](crate::DialectKind)).
    #[serde(alias = "type")]
    pub engine: String,
    /// `host` or `host:port` for network backends.
    pub host: Option<String>,
    /// Database name, or the database file path for `SQLite`.
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Delete rows physically instead of stamping `DeleteDate`.
    pub deletable: bool,
    /// Run statements outside of per-operation transactions.
    #[serde(alias = "disabledTransactions")]
    pub disable_transactions: bool,
    /// Accept any TLS certificate from SQL Server. Off unless set explicitly.
    #[serde(alias = "trustServerCertificate", alias = "TrustServerCertificate")]
    pub trust_server_certificate: bool,
    pub pool: PoolCfg,
}

impl OrmConfig {
    /// Extract the `database` section of `figment`.
    ///
    /// # Errors
    /// Returns `DbError::InvalidConfig` when the section is missing or malformed.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment
            .extract_inner::<Self>("database")
            .map_err(|e| DbError::InvalidConfig(e.to_string()))
    }

    /// Copy of this configuration with `${VAR}` references expanded.
    ///
    /// # Errors
    /// Returns `DbError::EnvVar` when a referenced variable is not set.
    pub fn resolved(&self) -> Result<Self> {
        let expand = |v: Option<&str>| v.map(expand_env_refs).transpose();
        Ok(Self {
            host: expand(self.host.as_deref())?,
            database: expand(self.database.as_deref())?,
            user: expand(self.user.as_deref())?,
            password: expand(self.password.as_deref())?,
            ..self.clone()
        })
    }
}

/// Replace every `${NAME}` in `value` with the variable's value, in a single pass.
///
/// Text produced by a substitution is not scanned again.
fn expand_env_refs(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = 0;
    for caps in ENV_REF.captures_iter(value) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&value[rest..whole.start()]);
        out.push_str(&std::env::var(name.as_str())?);
        rest = whole.end();
    }
    out.push_str(&value[rest..]);
    Ok(out)
}

/// Connection pool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCfg {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections kept open.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    #[serde(with = "humantime_serde")]
    pub max_lifetime: Option<Duration>,
    /// Test connection health before acquire.
    pub test_before_acquire: bool,
}
