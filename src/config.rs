// Connection bundles for the analytics databases.
//
// Each named target reads its fields from the environment (a `.env` file is
// honoured), using the prefix returned by `NamedTarget::env_prefix`:
//   <PREFIX>_BACKEND   mysql | mariadb | sqlite (defaults to mysql)
//   <PREFIX>_USER, <PREFIX>_PASSWORD, <PREFIX>_HOST, <PREFIX>_PORT
//   <PREFIX>_NAME      database name, or file path for sqlite

use dotenv::dotenv;
use sqlx::any::AnyConnectOptions;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::db::migration::SchemaProfile;
use crate::db::Dialect;
use crate::validation::{validate_required, ValidationError};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid port {value:?} in {field}")]
    InvalidPort { field: String, value: String },

    #[error("Unknown database backend: {0}. Must be 'mysql', 'mariadb' or 'sqlite'")]
    UnknownBackend(String),

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),
}

/// Database engine behind a configuration bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    MySql,
    /// Spoken through the MySQL wire driver.
    MariaDb,
    /// `database` is the file path; host, port and credentials are ignored.
    Sqlite,
}

impl Backend {
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Backend::MySql | Backend::MariaDb => "mysql",
            Backend::Sqlite => "sqlite",
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Backend::MySql | Backend::MariaDb => Dialect::MySql,
            Backend::Sqlite => Dialect::Sqlite,
        }
    }

    fn is_networked(&self) -> bool {
        !matches!(self, Backend::Sqlite)
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Backend::MySql),
            "mariadb" => Ok(Backend::MariaDb),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// The named database instances the project writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NamedTarget {
    /// Main analytics database.
    Primary,
    /// Database holding the model training extract.
    Training,
    /// Scam registry.
    Scam,
    /// Scam registry variant carrying owner/controller labels.
    ScamLabelled,
}

impl NamedTarget {
    pub fn env_prefix(&self) -> &'static str {
        match self {
            NamedTarget::Primary => "ETH_PRIMARY_DB",
            NamedTarget::Training => "ETH_TRAINING_DB",
            NamedTarget::Scam => "ETH_SCAM_DB",
            NamedTarget::ScamLabelled => "ETH_SCAM_LABELLED_DB",
        }
    }

    /// Tables a fresh database of this kind needs.
    pub fn default_profile(&self) -> SchemaProfile {
        match self {
            NamedTarget::Primary | NamedTarget::Training => SchemaProfile::Full,
            NamedTarget::Scam | NamedTarget::ScamLabelled => SchemaProfile::Scam,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConfig {
    pub fn new(
        backend: Backend,
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
            database: database.into(),
        }
    }

    /// A local SQLite database file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(Backend::Sqlite, "", "", "", 0, path)
    }

    /// Loads the bundle of a named target from the process environment.
    pub fn from_env(target: NamedTarget) -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(target.env_prefix(), |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |field: &str| lookup(&format!("{}_{}", prefix, field)).unwrap_or_default();

        let backend = match lookup(&format!("{}_BACKEND", prefix)) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => Backend::MySql,
        };

        let port_field = format!("{}_PORT", prefix);
        let raw_port = var("PORT");
        let port = if raw_port.trim().is_empty() && !backend.is_networked() {
            0
        } else {
            validate_required("port", &raw_port)?;
            raw_port.trim().parse().map_err(|_| ConfigError::InvalidPort {
                field: port_field.clone(),
                value: raw_port.clone(),
            })?
        };

        let config = Self {
            backend,
            user: var("USER"),
            password: var("PASSWORD"),
            host: var("HOST"),
            port,
            database: var("NAME"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every field the backend needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_required("database", &self.database)?;
        if self.backend.is_networked() {
            validate_required("user", &self.user)?;
            validate_required("password", &self.password)?;
            validate_required("host", &self.host)?;
            if self.port == 0 {
                return Err(ConfigError::InvalidPort {
                    field: "port".to_string(),
                    value: self.port.to_string(),
                });
            }
        }
        Ok(())
    }

    /// `<protocol>://<host>:<port>/<database>` with the credentials applied.
    pub fn connection_url(&self) -> Result<String, ConfigError> {
        self.validate()?;

        if !self.backend.is_networked() {
            return Ok(format!("sqlite://{}?mode=rwc", self.database));
        }

        let mut url = Url::parse(&format!(
            "{}://{}:{}/{}",
            self.backend.url_scheme(),
            self.host,
            self.port,
            self.database
        ))
        .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;

        url.set_username(&self.user)
            .map_err(|_| ConfigError::InvalidUrl(format!("cannot set user on {}", self)))?;
        url.set_password(Some(&self.password))
            .map_err(|_| ConfigError::InvalidUrl(format!("cannot set password on {}", self)))?;

        Ok(url.into())
    }

    pub fn connect_options(&self) -> Result<AnyConnectOptions, ConfigError> {
        AnyConnectOptions::from_str(&self.connection_url()?)
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))
    }
}

// Never prints the password.
impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend {
            Backend::Sqlite => write!(f, "sqlite://{}", self.database),
            _ => write!(
                f,
                "{}://{}@{}:{}/{}",
                self.backend.url_scheme(),
                self.user,
                self.host,
                self.port,
                self.database
            ),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}
