//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Band cache management (clear, stats)
//! - [`init`] - Configuration initialization
//! - [`mosaic`] - Build a mosaic for one tile
//! - [`scenes`] - List the scenes a mosaic would use

pub mod cache;
pub mod common;
pub mod init;
pub mod mosaic;
pub mod scenes;
