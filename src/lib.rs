//! # Etiqueta - Barcode Label Library
//!
//! Etiqueta composes barcode labels and prints them on Zebra-compatible
//! label printers through the host OS print spooler. It provides:
//!
//! - **Symbology registry**: CODE128, CODE39, EAN13, EAN8, UPC-A and ITF,
//!   with per-format validation
//! - **Preview**: grayscale label bitmaps with captions, exportable as PNG
//! - **Protocol**: a fixed-layout ZPL command stream for 52×33mm labels
//! - **Transport**: raw print jobs through the Windows spooler or CUPS
//! - **Batch**: numbered labels from tabular rows, printing and export
//!
//! ## Quick Start
//!
//! ```no_run
//! use etiqueta::{
//!     preview::{ComposerConfig, LabelComposer},
//!     protocol,
//!     transport,
//! };
//!
//! // Preview for the operator
//! let composer = LabelComposer::new(ComposerConfig::default())?;
//! let label = composer.compose("CODE128", "12345.01", Some("GARCIA PEREZ"), None)?;
//! label.save_png("label.png".as_ref())?;
//!
//! // Command stream for the printer
//! let zpl = protocol::encode("CODE128", "12345.01", Some("GARCIA PEREZ"));
//!
//! // Two copies through the OS spooler
//! let spooler = transport::system_spooler();
//! let report = spooler.send_copies("Zebra ZD420", &zpl, 2);
//! println!("printed {}", report);
//!
//! # Ok::<(), etiqueta::EtiquetaError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`symbology`] | Format registry, validation, bar patterns |
//! | [`preview`] | Label composer and fonts |
//! | [`protocol`] | ZPL command builders and label encoder |
//! | [`transport`] | Spooler contract and OS backends |
//! | [`batch`] | Sessions, row selection, batch print and export |
//! | [`printer`] | Label stock configurations |
//! | [`request`] | Validated label requests |
//! | [`error`] | Error types |
//!
//! ## The Two Renderings
//!
//! The preview bitmap is for on-screen confirmation only. The printer
//! receives the ZPL stream, which re-expresses the same code and caption
//! at fixed physical coordinates. Both carry the same logical content.

pub mod batch;
pub mod error;
pub mod preview;
pub mod printer;
pub mod protocol;
pub mod request;
pub mod symbology;
pub mod transport;

// Re-exports for convenience
pub use error::EtiquetaError;
pub use printer::LabelConfig;
pub use request::LabelRequest;
pub use symbology::Symbology;
