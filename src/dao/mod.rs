/// JSON documents on disk shared by the local backends.
pub mod json_file;
/// Roster record definitions.
pub mod models;
/// Per-visitor preference storage.
pub mod preferences;
/// Real-time roster collections.
pub mod roster_store;
/// Storage error shared by every backend.
pub mod storage;
