//! Small helpers persisting serde values as JSON documents on disk.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::fs;

use crate::dao::storage::StorageError;

/// Failures raised while reading or writing a JSON document.
#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error("failed to read `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse `{path}`")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document for `{path}`")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<JsonFileError> for StorageError {
    fn from(err: JsonFileError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

/// Read and decode `path`, returning `None` when the file does not exist yet.
pub async fn read<T>(path: &Path) -> Result<Option<T>, JsonFileError>
where
    T: DeserializeOwned,
{
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(JsonFileError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| JsonFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Encode `value` and replace `path` atomically through a sibling temp file.
pub async fn write<T>(path: &Path, value: &T) -> Result<(), JsonFileError>
where
    T: ?Sized + Serialize,
{
    let encoded = serde_json::to_vec_pretty(value).map_err(|source| JsonFileError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    let write_err = |source| JsonFileError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, encoded).await.map_err(write_err)?;
    fs::rename(&staging, path).await.map_err(write_err)
}

/// Delete `path`, treating an already missing file as success.
pub async fn remove(path: &Path) -> Result<(), JsonFileError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(JsonFileError::Write {
            path: path.to_path_buf(),
            source,
        }),
    }
}
