//! Core types and shared functionality for go2web.
//!
//! This crate provides:
//! - URL-keyed response cache with SQLite persistence
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
