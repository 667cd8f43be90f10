//! # Etiqueta CLI
//!
//! Command-line interface for barcode label printing.
//!
//! ## Usage
//!
//! ```bash
//! # List supported formats and installed printers
//! etiqueta formats
//! etiqueta printers
//!
//! # Preview a label as PNG
//! etiqueta preview 12345.01 --name "GARCIA PEREZ" --grau 3 --png label.png
//!
//! # Show the ZPL stream without printing
//! etiqueta zpl 12345.01 --name "GARCIA PEREZ"
//!
//! # Print two copies
//! etiqueta print 12345.01 --printer "Zebra ZD420" --name "GARCIA PEREZ" --double
//!
//! # Print rows 1-10 of a JSON file and keep PNG copies
//! etiqueta batch rows.json --rows 1-10 --printer "Zebra ZD420" --png-dir out/
//! ```
//!
//! Set `RUST_LOG=debug` for transport and encoder details.

use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;

use etiqueta::{
    EtiquetaError, LabelConfig, LabelRequest, Symbology,
    batch::{self, BatchRow, CodeTemplate, PrintSession},
    preview::{ComposerConfig, LabelComposer},
    protocol::{self, LabelLayout},
    transport::{self, MemoryTransport, Spooler},
};

/// Etiqueta - Barcode label printer utility
#[derive(Parser, Debug)]
#[command(name = "etiqueta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List supported barcode formats
    Formats,

    /// List printers known to the OS
    Printers,

    /// Check that a printer accepts jobs
    Test {
        /// Printer name
        #[arg(long)]
        printer: String,
    },

    /// Render a label preview to PNG
    Preview {
        #[command(flatten)]
        label: LabelArgs,

        /// Output PNG file
        #[arg(long, value_name = "FILE")]
        png: PathBuf,

        /// Preferred system font (file name or path)
        #[arg(long, default_value = "arial.ttf")]
        font: String,
    },

    /// Write the ZPL stream for a label to stdout
    Zpl {
        #[command(flatten)]
        label: LabelArgs,
    },

    /// Print a label
    Print {
        #[command(flatten)]
        label: LabelArgs,

        /// Printer name
        #[arg(long)]
        printer: String,

        /// Number of copies
        #[arg(long, default_value = "1")]
        copies: u32,

        /// Print each label twice (overrides --copies)
        #[arg(long)]
        double: bool,

        /// Capture the job in memory instead of printing
        #[arg(long)]
        dry_run: bool,
    },

    /// Preview, print and export labels from a JSON array of rows
    Batch {
        /// JSON file: `[{"name": "...", "grau": 123, "code": "..."}]`
        file: PathBuf,

        /// Rows to use, 1-based (e.g. "1,3,5-10"); all rows when omitted
        #[arg(long)]
        rows: Option<String>,

        /// Barcode format
        #[arg(long, default_value = "CODE128")]
        format: String,

        /// Code template, `{}` is replaced by grau or the row number
        #[arg(long, default_value = "{}.01")]
        template: String,

        /// Printer name (omit to only preview and export)
        #[arg(long)]
        printer: Option<String>,

        /// Print each label twice
        #[arg(long)]
        double: bool,

        /// Write PNG previews into this directory
        #[arg(long, value_name = "DIR")]
        png_dir: Option<PathBuf>,

        /// Write PNG previews into this ZIP file
        #[arg(long, value_name = "FILE")]
        zip: Option<PathBuf>,

        /// Capture print jobs in memory instead of printing
        #[arg(long)]
        dry_run: bool,

        /// Preferred system font (file name or path)
        #[arg(long, default_value = "arial.ttf")]
        font: String,
    },
}

/// The fields of a single label.
#[derive(clap::Args, Debug)]
struct LabelArgs {
    /// Code value
    code: String,

    /// Barcode format
    #[arg(long, default_value = "CODE128")]
    format: String,

    /// Primary caption (name)
    #[arg(long)]
    name: Option<String>,

    /// Secondary caption (grade), shown on the preview only
    #[arg(long)]
    grau: Option<String>,
}

impl LabelArgs {
    fn request(&self) -> Result<LabelRequest, EtiquetaError> {
        let format = Symbology::resolve(&self.format)?;
        let mut request = LabelRequest::new(format, &self.code)?;
        if let Some(name) = &self.name {
            request = request.with_caption_primary(name);
        }
        if let Some(grau) = &self.grau {
            request = request.with_caption_secondary(grau);
        }
        Ok(request)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), EtiquetaError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Formats => {
            for name in Symbology::list_supported() {
                println!("{}", name);
            }
        }

        Commands::Printers => {
            let targets = transport::system_spooler().enumerate_targets();
            if targets.is_empty() {
                eprintln!("No printers found.");
            }
            for target in targets {
                println!("{}", target);
            }
        }

        Commands::Test { printer } => {
            transport::system_spooler().probe(&printer)?;
            println!("{}: OK", printer);
        }

        Commands::Preview { label, png, font } => {
            let request = label.request()?;
            let composer = composer(font)?;
            let rendered = composer.compose_request(&request)?;
            rendered.save_png(&png)?;
            println!(
                "Saved {}x{} preview to {}",
                rendered.width(),
                rendered.height(),
                png.display()
            );
        }

        Commands::Zpl { label } => {
            let request = label.request()?;
            let zpl = encode_request(&request)?;
            let mut stdout = std::io::stdout();
            stdout.write_all(&zpl)?;
            stdout.write_all(b"\n")?;
        }

        Commands::Print {
            label,
            printer,
            copies,
            double,
            dry_run,
        } => {
            let copies = if double { 2 } else { copies };
            let request = label.request()?.with_copies(copies)?;
            let zpl = encode_request(&request)?;

            let report = if dry_run {
                let spooler = dry_run_spooler(&printer);
                let report = spooler.send_copies(&printer, &zpl, request.copies());
                println!("{}", String::from_utf8_lossy(&zpl));
                report
            } else {
                transport::system_spooler().send_copies(&printer, &zpl, request.copies())
            };

            println!("Printed {} copies on {}", report, printer);
            if !report.is_complete() {
                return Err(EtiquetaError::Spooler(format!(
                    "{} of {} copies failed",
                    report.failed(),
                    report.total
                )));
            }
        }

        Commands::Batch {
            file,
            rows,
            format,
            template,
            printer,
            double,
            png_dir,
            zip,
            dry_run,
            font,
        } => {
            let json = std::fs::read_to_string(&file)?;
            let all_rows = BatchRow::from_json(&json)?;
            let selection = match rows {
                Some(range) => batch::parse_range(&range, all_rows.len())?,
                None => (0..all_rows.len()).collect(),
            };

            let session = PrintSession {
                printer,
                symbology: Symbology::resolve(&format)?,
                template: CodeTemplate::new(template)?,
                print_double: double,
            };
            let composer = composer(font)?;
            let labels = batch::prepare_batch(&all_rows, &selection, &session, &composer);

            let rejected = labels.iter().filter(|l| l.preview.is_err()).count();
            info!(labels = labels.len(), rejected, "batch prepared");
            for label in labels.iter() {
                if let Err(e) = &label.preview {
                    eprintln!("Row {} ({}): {}", label.row + 1, label.code, e);
                }
            }

            if let Some(dir) = &png_dir {
                let written = batch::export_to_dir(&labels, session.copies(), dir)?;
                println!("Wrote {} PNG files to {}", written.len(), dir.display());
            }
            if let Some(path) = &zip {
                let archive = batch::export_zip(&labels, session.copies())?;
                std::fs::write(path, archive)?;
                println!("Wrote {}", path.display());
            }

            let Some(printer) = session.printer.clone() else {
                return Ok(());
            };
            let today = Local::now().date_naive();
            let report = if dry_run {
                batch::print_batch(labels, &session, &dry_run_spooler(&printer), today)?
            } else {
                batch::print_batch(labels, &session, &transport::system_spooler(), today)?
            };

            if report.is_complete() {
                println!(
                    "{} labels printed ({} codes x {})",
                    report.printed,
                    report.labels.len(),
                    session.copies()
                );
            } else {
                println!("Printed {} of {} labels", report.printed, report.total);
            }
        }
    }

    Ok(())
}

fn composer(font: String) -> Result<LabelComposer, EtiquetaError> {
    LabelComposer::new(ComposerConfig {
        font_name: font,
        ..Default::default()
    })
}

/// Validate the code and build today's ZPL stream for a request.
fn encode_request(request: &LabelRequest) -> Result<Vec<u8>, EtiquetaError> {
    let code = request.format().validate(request.code())?;
    Ok(protocol::encode_label(
        request.format(),
        &code,
        request.caption_primary(),
        Local::now().date_naive(),
        &LabelConfig::LABEL_52X33,
        &LabelLayout::LABEL_52X33,
    ))
}

fn dry_run_spooler(printer: &str) -> Spooler<MemoryTransport> {
    Spooler::new(MemoryTransport::with_printers(&[printer], &[]))
}
