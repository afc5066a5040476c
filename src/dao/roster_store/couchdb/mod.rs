//! Roster kept in a CouchDB database and followed through its `_changes` feed.

mod config;
mod error;
mod models;
mod store;

pub use config::{CouchConfig, Credentials};
pub use error::{CouchDaoError, CouchResult};
pub use store::CouchRosterStore;
