//! Connection configuration.
//!
//! The only setting the layer needs is where the store lives. It is read from the
//! process environment (after loading a `.env` file, if one exists):
//!
//! - `MONGO_URI` - connection string, required
//! - `MONGO_DATABASE` - database name, defaults to `people`

use thiserror::Error;

pub const URI_VAR: &str = "MONGO_URI";
pub const DATABASE_VAR: &str = "MONGO_DATABASE";
pub const DEFAULT_DATABASE: &str = "people";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration error: {0} is not set")]
    Missing(&'static str),
    #[error("Configuration error: {0} is empty")]
    Empty(&'static str),
    #[error("Configuration error: cannot load .env: {0}")]
    DotEnv(String),
}

/// Accepts a missing `.env` file; any other load failure is reported.
fn tolerate_missing<T>(loaded: dotenvy::Result<T>) -> Result<(), ConfigError> {
    match loaded {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::DotEnv(err.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
}

impl StoreConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
        }
    }

    /// Reads the configuration from the process environment, loading `.env` first.
    ///
    /// A missing `.env` file is fine; a malformed one is a [`ConfigError::DotEnv`].
    pub fn from_env() -> Result<Self, ConfigError> {
        tolerate_missing(dotenvy::dotenv())?;

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let uri = lookup(URI_VAR).ok_or(ConfigError::Missing(URI_VAR))?;
        if uri.trim().is_empty() {
            return Err(ConfigError::Empty(URI_VAR));
        }

        let database = match lookup(DATABASE_VAR) {
            Some(name) if name.trim().is_empty() => return Err(ConfigError::Empty(DATABASE_VAR)),
            Some(name) => name,
            None => DEFAULT_DATABASE.to_string(),
        };

        Ok(Self { uri, database })
    }

    /// Opens a MongoDB connection and wraps it in a repository.
    #[cfg(feature = "mongodb")]
    pub async fn connect(
        &self,
    ) -> crate::error::PersonResult<crate::repository::PersonRepository<personlayer_mongodb::MongoDbStore>> {
        use personlayer_core::backend::StoreBackendBuilder;

        let backend = personlayer_mongodb::MongoDbStore::builder(&self.uri, &self.database)
            .build()
            .await?;

        Ok(crate::repository::PersonRepository::new(backend))
    }
}
