//! Common utilities and shared types for social-scrapper.
//!
//! This crate provides foundational components used across all scrapper crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//!
//! # Example
//!
//! ```no_run
//! use scrapper_common::{AppError, AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load().map_err(|e| AppError::Config(e.to_string()))?;
//!     println!("Listening on {}:{}", config.server.host, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;

pub use config::{Config, Credentials, ServerConfig, TwitterConfig};
pub use error::{AppError, AppResult};
