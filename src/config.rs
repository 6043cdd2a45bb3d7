use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_DB_PASSWORD: &str = "mysecretpassword";
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_NAME: &str = "postgres";
const DEFAULT_DB_PORT: u16 = 5432;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 10;

const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 5000;

/// How missing connection variables are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    /// Missing variables fall back to local development defaults.
    Permissive,
    /// All five connection variables are mandatory.
    Strict,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub mode: ConfigMode,
    /// Configuration problems found while loading. Not fatal: the connection
    /// provider refuses to hand out connections while this is non-empty.
    pub problems: Vec<String>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub name: String,
    pub port: u16,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// `DB_USER` and `DB_NAME` fall back to `POSTGRES_USER` and `POSTGRES_DB`
    /// respectively, so the same image runs next to the stock postgres
    /// container without extra wiring.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut problems = Vec::new();

        let mode = match get("DB_CONFIG_MODE").as_deref() {
            None | Some("permissive") => ConfigMode::Permissive,
            Some("strict") => ConfigMode::Strict,
            Some(other) => {
                problems.push(format!(
                    "DB_CONFIG_MODE must be 'permissive' or 'strict', got '{}'",
                    other
                ));
                ConfigMode::Strict
            }
        };

        let mut required = |keys: &[&str], default: &str| -> String {
            if let Some(value) = keys.iter().find_map(|&k| get(k)) {
                return value;
            }
            if mode == ConfigMode::Strict {
                problems.push(format!("{} must be set", keys[0]));
            }
            default.to_string()
        };

        let user = required(&["DB_USER", "POSTGRES_USER"], DEFAULT_DB_USER);
        let password = required(&["DB_PASSWORD"], DEFAULT_DB_PASSWORD);
        let host = required(&["DB_HOST"], DEFAULT_DB_HOST);
        let name = required(&["DB_NAME", "POSTGRES_DB"], DEFAULT_DB_NAME);
        let raw_port = required(&["DB_PORT"], &DEFAULT_DB_PORT.to_string());

        let port = match raw_port.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                problems.push(format!("DB_PORT must be a port number, got '{}'", raw_port));
                DEFAULT_DB_PORT
            }
        };

        let max_connections = parse_or(&get, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let acquire_timeout = Duration::from_secs(parse_or(
            &get,
            "DB_ACQUIRE_TIMEOUT_SECS",
            DEFAULT_ACQUIRE_TIMEOUT_SECS,
        ));
        let statement_timeout = Duration::from_secs(parse_or(
            &get,
            "DB_STATEMENT_TIMEOUT_SECS",
            DEFAULT_STATEMENT_TIMEOUT_SECS,
        ));

        let server_host = get("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string());
        let server_port = parse_or(&get, "SERVER_PORT", DEFAULT_SERVER_PORT);

        Config {
            database: DatabaseConfig {
                user,
                password,
                host,
                name,
                port,
                max_connections,
                acquire_timeout,
                statement_timeout,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
            },
            mode,
            problems,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// Tuning knobs are never fatal; a bad value just keeps the default.
fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: std::str::FromStr + fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
