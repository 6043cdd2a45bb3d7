use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, Pool, Postgres};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub type DbPool = Pool<Postgres>;
pub type DbConnection = PoolConnection<Postgres>;

pub const NAMES_TABLE: &str = "names";

const CREATE_NAMES_TABLE: &str = "CREATE TABLE IF NOT EXISTS names (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL CHECK (name <> '')
)";

/// Hands out database connections to request handlers.
///
/// Connections come from a bounded pool that connects lazily, so building the
/// provider never touches the network. A connection is released back to the
/// pool when the returned guard is dropped, whichever way the handler exits.
#[derive(Clone)]
pub struct ConnectionProvider {
    inner: Inner,
    acquire_timeout: Duration,
    statement_timeout: Duration,
}

#[derive(Clone)]
enum Inner {
    Ready {
        pool: DbPool,
        options: PgConnectOptions,
    },
    Misconfigured(Arc<str>),
}

impl ConnectionProvider {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(options.clone());

        Self {
            inner: Inner::Ready { pool, options },
            acquire_timeout: config.acquire_timeout,
            statement_timeout: config.statement_timeout,
        }
    }

    /// A provider that refuses every acquisition with the given problems.
    pub fn misconfigured(problems: &[String], statement_timeout: Duration) -> Self {
        Self {
            inner: Inner::Misconfigured(problems.join("; ").into()),
            acquire_timeout: Duration::ZERO,
            statement_timeout,
        }
    }

    /// Build the provider for a loaded configuration, honouring any problems
    /// found while loading it.
    pub fn from_config(config: &crate::config::Config) -> Self {
        if config.problems.is_empty() {
            Self::new(&config.database)
        } else {
            Self::misconfigured(&config.problems, config.database.statement_timeout)
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.inner, Inner::Ready { .. })
    }

    pub fn pool(&self) -> Option<&DbPool> {
        match &self.inner {
            Inner::Ready { pool, .. } => Some(pool),
            Inner::Misconfigured(_) => None,
        }
    }

    /// Take a connection from the pool.
    ///
    /// While the pool holds no connections, one direct connect is attempted
    /// first. The pool retries refused connections until its acquire deadline
    /// and then reports only `PoolTimedOut`; the direct attempt fails fast and
    /// keeps the driver's own message.
    pub async fn acquire(&self) -> Result<DbConnection> {
        let (pool, options) = match &self.inner {
            Inner::Ready { pool, options } => (pool, options),
            Inner::Misconfigured(problems) => return Err(AppError::Config(problems.to_string())),
        };

        if pool.size() == 0 {
            self.check_reachable(options).await?;
        }

        pool.acquire().await.map_err(AppError::Connection)
    }

    async fn check_reachable(&self, options: &PgConnectOptions) -> Result<()> {
        match tokio::time::timeout(self.acquire_timeout, options.connect()).await {
            Ok(Ok(conn)) => {
                if let Err(e) = conn.close().await {
                    tracing::debug!(error = %e, "closing reachability connection failed");
                }
                Ok(())
            }
            Ok(Err(e)) => Err(AppError::Connection(e)),
            Err(_) => Err(AppError::Connection(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!(
                    "connecting to {}:{} timed out after {:?}",
                    options.get_host(),
                    options.get_port(),
                    self.acquire_timeout
                ),
            )))),
        }
    }

    /// Run one database round trip, bounded by the statement timeout.
    ///
    /// On expiry the future is dropped; any connection it borrowed is still
    /// owned by the caller and released normally.
    pub async fn run_bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.statement_timeout, fut).await {
            Ok(result) => result.map_err(AppError::Query),
            Err(_) => Err(AppError::Timeout(self.statement_timeout)),
        }
    }
}

/// Create the `names` table if it does not exist yet.
///
/// Concurrent `CREATE TABLE IF NOT EXISTS` from two sessions can still fail in
/// Postgres with `unique_violation` on `pg_type` or `duplicate_table`; either
/// means the other session won, which is the state we want.
pub async fn ensure_schema(conn: &mut PgConnection) -> std::result::Result<(), sqlx::Error> {
    match sqlx::query(CREATE_NAMES_TABLE).execute(&mut *conn).await {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if matches!(e.code().as_deref(), Some("23505" | "42P07")) => {
            tracing::debug!(table = NAMES_TABLE, "schema created concurrently by another session");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Eager schema initialisation run once at startup. Failures are logged and
/// never stop the process.
pub async fn init_schema(provider: &ConnectionProvider) -> Result<()> {
    let mut conn = provider.acquire().await?;
    provider.run_bounded(ensure_schema(&mut *conn)).await?;
    tracing::info!(table = NAMES_TABLE, "schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[tokio::test]
    async fn test_misconfigured_provider_refuses_connections() {
        let cfg = config(&[("DB_CONFIG_MODE", "strict")]);
        let provider = ConnectionProvider::from_config(&cfg);

        assert!(!provider.is_ready());
        assert!(provider.pool().is_none());

        let err = provider.acquire().await.err().expect("acquire should fail");
        match err {
            AppError::Config(msg) => {
                assert!(msg.contains("DB_USER must be set"));
                assert!(msg.contains("DB_PORT must be set"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_construction_does_not_connect() {
        let cfg = config(&[("DB_HOST", "127.0.0.1"), ("DB_PORT", "1")]);
        let provider = ConnectionProvider::from_config(&cfg);

        assert!(provider.is_ready());
        assert_eq!(provider.pool().map(|p| p.size()), Some(0));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_a_connection_error() {
        let cfg = config(&[
            ("DB_HOST", "127.0.0.1"),
            ("DB_PORT", "1"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "5"),
        ]);
        let provider = ConnectionProvider::from_config(&cfg);

        let started = std::time::Instant::now();
        let err = provider.acquire().await.err().expect("acquire should fail");
        let elapsed = started.elapsed();

        assert!(matches!(err, AppError::Connection(_)), "got {:?}", err);
        let message = err.to_string();
        assert!(
            message.to_lowercase().contains("refused"),
            "driver message lost: {}",
            message
        );
        assert_ne!(message, sqlx::Error::PoolTimedOut.to_string());
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_init_schema_fails_without_database() {
        let cfg = config(&[
            ("DB_HOST", "127.0.0.1"),
            ("DB_PORT", "1"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "1"),
        ]);
        let err = tokio_test::assert_err!(init_schema(&ConnectionProvider::from_config(&cfg)).await);
        assert!(matches!(err, AppError::Connection(_)), "got {:?}", err);

        let cfg = config(&[("DB_CONFIG_MODE", "strict")]);
        let err = tokio_test::assert_err!(init_schema(&ConnectionProvider::from_config(&cfg)).await);
        assert!(matches!(err, AppError::Config(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_run_bounded_times_out() {
        let cfg = config(&[("DB_STATEMENT_TIMEOUT_SECS", "0")]);
        let provider = ConnectionProvider::from_config(&cfg);

        let slow = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, sqlx::Error>(())
        };
        let err = tokio_test::assert_err!(provider.run_bounded(slow).await);
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_run_bounded_maps_driver_errors() {
        let cfg = config(&[]);
        let provider = ConnectionProvider::from_config(&cfg);

        let failing = async { Err::<(), _>(sqlx::Error::RowNotFound) };
        let err = tokio_test::assert_err!(provider.run_bounded(failing).await);
        assert!(matches!(err, AppError::Query(_)));

        let ok = tokio_test::assert_ok!(provider.run_bounded(async { Ok::<_, sqlx::Error>(7) }).await);
        assert_eq!(ok, 7);
    }
}
