//! Typed connect options built from [`OrmConfig`].

use crate::config::{OrmConfig, PoolCfg};
use crate::dialect::{Dialect, DialectKind};
use crate::engine::Backend;
use crate::{DbError, Result};

/// Driver connect options for the configured backend.
#[derive(Debug, Clone)]
pub(crate) enum ConnectOptions {
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::sqlite::SqliteConnectOptions),
    #[cfg(feature = "mysql")]
    MySql(sqlx::mysql::MySqlConnectOptions),
    #[cfg(feature = "mssql")]
    MsSql(tiberius::Config),
}

impl ConnectOptions {
    /// Open the pool (or client) for these options.
    ///
    /// # Errors
    /// Returns the driver error when the connection cannot be established.
    pub(crate) async fn connect(self, pool: &PoolCfg) -> Result<Backend> {
        match self {
            #[cfg(feature = "sqlite")]
            ConnectOptions::Sqlite(opts) => {
                use crate::pool_opts::ApplyPoolOpts;

                let sqlx_pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .apply(pool)
                    .connect_with(opts)
                    .await?;
                Ok(Backend::Sqlite(sqlx_pool))
            }
            #[cfg(feature = "mysql")]
            ConnectOptions::MySql(opts) => {
                use crate::pool_opts::ApplyPoolOpts;

                let sqlx_pool = sqlx::mysql::MySqlPoolOptions::new()
                    .apply(pool)
                    .connect_with(opts)
                    .await?;
                Ok(Backend::MySql(sqlx_pool))
            }
            #[cfg(feature = "mssql")]
            ConnectOptions::MsSql(config) => {
                use tokio_util::compat::TokioAsyncWriteCompatExt;

                let tcp = tokio::net::TcpStream::connect(config.get_addr()).await?;
                tcp.set_nodelay(true)?;
                let client = tiberius::Client::connect(config, tcp.compat_write()).await?;
                Ok(Backend::MsSql(std::sync::Arc::new(tokio::sync::Mutex::new(client))))
            }
            #[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "mssql")))]
            _ => unreachable!("No database features enabled"),
        }
    }
}

/// Validate `cfg` and build driver options for `dialect`.
///
/// `cfg` is expected to be [`resolved`](OrmConfig::resolved) already.
///
/// # Errors
/// Returns `DbError::InvalidConfig` for missing fields, `DbError::UrlParse` for a host that is
/// not a valid URL authority, `DbError::FeatureDisabled` when the backend's driver is not
/// compiled in.
pub(crate) fn build_connect_options(cfg: &OrmConfig, dialect: &dyn Dialect) -> Result<ConnectOptions> {
    let dsn = dialect.connection_string(cfg)?;
    let kind = dialect.kind();
    let target = connection_target(kind, cfg, &dsn)?;
    tracing::debug!(engine = %kind, dsn = %target, "Building database connection");

    match kind {
        DialectKind::Sqlite => build_sqlite_options(&dsn),
        DialectKind::MySql => build_mysql_options(cfg),
        DialectKind::MsSql => build_mssql_options(cfg),
    }
}

/// `<engine>://<user>@<host>/<database>` for logs. The password is never part of it.
fn connection_target(kind: DialectKind, cfg: &OrmConfig, dsn: &str) -> Result<String> {
    if kind == DialectKind::Sqlite {
        return Ok(format!("{kind}://{dsn}"));
    }

    let host = cfg.host.as_deref().unwrap_or_default();
    let mut target = url::Url::parse(&format!("{kind}://{host}"))?;
    if let Some(user) = cfg.user.as_deref()
        && target.set_username(user).is_err()
    {
        return Err(DbError::InvalidConfig(format!("host '{host}' cannot carry a user name")));
    }
    target.set_path(cfg.database.as_deref().unwrap_or_default());
    Ok(target.to_string())
}

#[cfg(feature = "sqlite")]
fn build_sqlite_options(path: &str) -> Result<ConnectOptions> {
    use std::str::FromStr;

    if path == ":memory:" {
        let opts = sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")?;
        return Ok(ConnectOptions::Sqlite(opts));
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let opts = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    Ok(ConnectOptions::Sqlite(opts))
}

#[cfg(not(feature = "sqlite"))]
fn build_sqlite_options(_: &str) -> Result<ConnectOptions> {
    Err(DbError::FeatureDisabled("SQLite feature not enabled"))
}

#[cfg(feature = "mysql")]
fn build_mysql_options(cfg: &OrmConfig) -> Result<ConnectOptions> {
    let (host, port) = split_host_port(cfg.host.as_deref().unwrap_or_default(), 3306)?;
    let mut opts = sqlx::mysql::MySqlConnectOptions::new().host(host).port(port);
    if let Some(user) = &cfg.user {
        opts = opts.username(user);
    }
    if let Some(password) = &cfg.password {
        opts = opts.password(password);
    }
    if let Some(database) = &cfg.database {
        opts = opts.database(database);
    }
    Ok(ConnectOptions::MySql(opts))
}

#[cfg(not(feature = "mysql"))]
fn build_mysql_options(_: &OrmConfig) -> Result<ConnectOptions> {
    Err(DbError::FeatureDisabled("MySQL feature not enabled"))
}

#[cfg(feature = "mssql")]
fn build_mssql_options(cfg: &OrmConfig) -> Result<ConnectOptions> {
    let (host, port) = split_host_port(cfg.host.as_deref().unwrap_or_default(), 1433)?;
    let mut config = tiberius::Config::new();
    config.host(host);
    config.port(port);
    config.authentication(tiberius::AuthMethod::sql_server(
        cfg.user.as_deref().unwrap_or_default(),
        cfg.password.as_deref().unwrap_or_default(),
    ));
    if let Some(database) = &cfg.database {
        config.database(database);
    }
    if cfg.trust_server_certificate {
        config.trust_cert();
    }
    Ok(ConnectOptions::MsSql(config))
}

#[cfg(not(feature = "mssql"))]
fn build_mssql_options(_: &OrmConfig) -> Result<ConnectOptions> {
    Err(DbError::FeatureDisabled("SQL Server feature not enabled"))
}

/// Split `host[:port]`, falling back to `default_port`.
fn split_host_port(host: &str, default_port: u16) -> Result<(&str, u16)> {
    match host.rsplit_once(':') {
        Some((h, p)) if !h.contains(':') => {
            let port = p
                .parse()
                .map_err(|_| DbError::InvalidConfig(format!("invalid port in host '{host}'")))?;
            Ok((h, port))
        }
        _ => Ok((host, default_port)),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::dialect::{MsSqlDialect, MySqlDialect, SqliteDialect};

    fn network_cfg(engine: &str) -> OrmConfig {
        OrmConfig {
            engine: engine.to_owned(),
            host: Some("db.local:3306".to_owned()),
            database: Some("shop".to_owned()),
            user: Some("app".to_owned()),
            password: Some("s3cret".to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn connection_target_leaves_out_the_password() {
        let cfg = network_cfg("mysql");
        let target = connection_target(DialectKind::MySql, &cfg, "ignored").unwrap();
        assert_eq!(target, "mysql://app@db.local:3306/shop");

        let cfg = OrmConfig {
            user: Some("ops team".to_owned()),
            ..network_cfg("mssql")
        };
        let dsn = MsSqlDialect.connection_string(&cfg).unwrap();
        let target = connection_target(DialectKind::MsSql, &cfg, &dsn).unwrap();
        assert_eq!(target, "sqlserver://ops%20team@db.local:3306/shop");
        assert!(!target.contains("s3cret"));
    }

    #[test]
    fn connection_target_of_sqlite_is_the_path() {
        let cfg = OrmConfig {
            engine: "sqlite".to_owned(),
            database: Some("/tmp/app.db".to_owned()),
            ..Default::default()
        };
        let target = connection_target(DialectKind::Sqlite, &cfg, "/tmp/app.db").unwrap();
        assert_eq!(target, "sqlite:///tmp/app.db");
    }

    #[test]
    fn malformed_host_is_rejected() {
        let cfg = OrmConfig {
            host: Some("db local".to_owned()),
            ..network_cfg("mysql")
        };
        assert!(matches!(
            build_connect_options(&cfg, &MySqlDialect::new("shop")),
            Err(DbError::UrlParse(_))
        ));
    }

    #[test]
    fn split_host_port_defaults() {
        assert_eq!(split_host_port("db.local", 3306).unwrap(), ("db.local", 3306));
        assert_eq!(split_host_port("db.local:3307", 3306).unwrap(), ("db.local", 3307));
        assert!(matches!(
            split_host_port("db.local:x", 3306),
            Err(DbError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_fields_are_rejected_before_connecting() {
        let cfg = OrmConfig {
            engine: "sqlite".to_owned(),
            ..Default::default()
        };
        assert!(matches!(
            build_connect_options(&cfg, &SqliteDialect),
            Err(DbError::InvalidConfig(_))
        ));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_options_create_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.db");
        let opts = build_sqlite_options(path.to_str().unwrap()).unwrap();
        assert!(matches!(opts, ConnectOptions::Sqlite(_)));
        assert!(dir.path().join("nested").is_dir());
    }

    #[cfg(not(feature = "mysql"))]
    #[test]
    fn disabled_backend_is_reported() {
        assert!(matches!(
            build_connect_options(&network_cfg("mysql"), &MySqlDialect::new("shop")),
            Err(DbError::FeatureDisabled(_))
        ));
    }

    #[cfg(feature = "mssql")]
    #[test]
    #[allow(clippy::use_debug)]
    fn mssql_trusts_the_server_certificate_only_when_configured() {
        let Ok(ConnectOptions::MsSql(verified)) = build_mssql_options(&network_cfg("mssql")) else {
            panic!("expected SQL Server options");
        };
        assert_eq!(verified.get_addr(), "db.local:3306");
        assert!(!format!("{verified:?}").contains("TrustAll"));

        let cfg = OrmConfig {
            trust_server_certificate: true,
            ..network_cfg("mssql")
        };
        let Ok(ConnectOptions::MsSql(trusting)) = build_mssql_options(&cfg) else {
            panic!("expected SQL Server options");
        };
        assert!(format!("{trusting:?}").contains("TrustAll"));
    }
}
