//! # ZPL Protocol Implementation
//!
//! This module provides command builders and the label encoder for the
//! ZPL command language understood by Zebra-compatible label printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Format delimiters, page setup, field commands
//! - [`barcode`]: Per-symbology barcode field commands
//! - [`label`]: The complete label encoder
//!
//! ## Usage Example
//!
//! ```
//! use etiqueta::protocol;
//!
//! let zpl = protocol::encode("CODE128", "12345.01", Some("GARCIA PEREZ"));
//!
//! // Send `zpl` to a printer via transport, or show it for debugging
//! let text = String::from_utf8_lossy(&zpl);
//! assert!(text.contains("GARCIA PEREZ"));
//! ```

pub mod barcode;
pub mod commands;
pub mod label;

pub use label::{LabelLayout, encode, encode_label, encode_with_date};
