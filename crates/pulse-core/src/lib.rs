//! # pulse-core
//!
//! Core crate for the pulse node. Contains the configuration schema and
//! loader, the fixed timing constants, the browser header profile used for
//! every outbound request, and the unified error system.
//!
//! This crate has **no** internal dependencies on other pulse crates.

pub mod config;
pub mod error;
pub mod profile;
pub mod result;

pub use config::{AppConfig, NodeTimings};
pub use error::AppError;
pub use result::AppResult;
