//! Student records service: HTTP JSON API over an embedded SQLite store.

pub mod api;
pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod reports;
pub mod store;

pub use api::{create_router, AppState};
pub use backup::BackupStore;
pub use config::{Config, DbConfig};
pub use db::Db;
pub use error::StoreError;
