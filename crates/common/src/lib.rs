//! Common utilities and shared types for rapshare.
//!
//! This crate provides foundational components used across all rapshare crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Storage**: Object storage backends for uploaded audio (local, S3-compatible)
//!
//! # Example
//!
//! ```no_run
//! use rapshare_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} -> {}", config.server.url, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use storage::{
    LocalStorage, SharedStorage, StorageBackend, StorageConfig, UploadedFile,
    generate_storage_key,
};
