//! # Printer Module
//!
//! This module provides label-stock configurations.
//!
//! ## Modules
//!
//! - [`config`]: Physical label sizes and resolutions

pub mod config;

pub use config::LabelConfig;
