use std::env;

use super::error::{CouchDaoError, CouchResult};

const ENV_BASE_URL: &str = "COUCH_BASE_URL";
const ENV_DATABASE: &str = "COUCH_DB";
const ENV_USERNAME: &str = "COUCH_USERNAME";
const ENV_PASSWORD: &str = "COUCH_PASSWORD";
const DEFAULT_DATABASE: &str = "family_roster";

/// Basic-auth credentials for the CouchDB server.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where the roster database lives.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, without trailing slash.
    pub base_url: String,
    pub database: String,
    pub credentials: Option<Credentials>,
}

impl CouchConfig {
    pub fn new(base_url: &str, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            database: database.into(),
            credentials: None,
        }
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` (defaults to `family_roster`)
    /// and the optional `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        let base_url = env::var(ENV_BASE_URL)
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or(CouchDaoError::MissingEnvVar { var: ENV_BASE_URL })?;
        let database = env::var(ENV_DATABASE).unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

        let mut config = Self::new(&base_url, database);
        config.credentials = match (env::var(ENV_USERNAME).ok(), env::var(ENV_PASSWORD).ok()) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => return Err(CouchDaoError::IncompleteCredentials),
        };

        Ok(config)
    }

    pub(super) fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }
}
