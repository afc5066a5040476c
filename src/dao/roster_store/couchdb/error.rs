//! Error types raised by the CouchDB roster backend.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while talking to the roster database.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Only one of username and password was provided.
    #[error("COUCH_USERNAME and COUCH_PASSWORD must be set together")]
    IncompleteCredentials,
    #[error("failed to build CouchDB client")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    /// The request never got an answer (DNS, refused connection, timeout).
    #[error("CouchDB request to `{path}` failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB answered {status} for `{path}`")]
    Status { path: String, status: StatusCode },
    #[error("failed to decode CouchDB response for `{path}`")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A bulk request was accepted but some documents were not written.
    #[error("CouchDB rejected {rejected} bulk write(s), first `{first_id}`: {reason}")]
    BulkRejected {
        rejected: usize,
        first_id: String,
        reason: String,
    },
    /// CouchDB accepted a write but did not report the assigned identifier.
    #[error("CouchDB did not return an identifier for the new roster record")]
    MissingId,
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
