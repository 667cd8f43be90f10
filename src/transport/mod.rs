//! # Printer Transport Layer
//!
//! Delivers encoded label streams to printers known to the host OS.
//!
//! The OS-specific part is the small [`PrintTransport`] trait (list, open,
//! write, close). [`Spooler`] builds the job contract on top of it, so the
//! same send/copies/enumerate logic runs against every backend.
//!
//! ## Available Transports
//!
//! | Transport | Platform | Mechanism |
//! |-----------|----------|-----------|
//! | [`win32::WindowsSpooler`] | Windows | Win32 print spooler, RAW datatype |
//! | [`cups::CupsSpooler`] | Unix | `lpstat` / `lp -o raw` |
//! | [`memory::MemoryTransport`] | any | In-memory fake with scripted failures |
//!
//! ## Job Transaction
//!
//! ```text
//! open(target) ──► write(payload) ──► close
//!      │                 │              ▲
//!      │                 └── error ─────┤  close runs on every path
//!      └── PrinterUnavailable
//! ```
//!
//! One transaction per copy. Transactions against the same target name are
//! serialized by the spooler; different targets may print in parallel from
//! separate threads.

#[cfg(unix)]
pub mod cups;
pub mod memory;
#[cfg(windows)]
pub mod win32;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::EtiquetaError;

#[cfg(unix)]
pub use cups::CupsSpooler;
pub use memory::MemoryTransport;
#[cfg(windows)]
pub use win32::WindowsSpooler;

/// Document name shown in the OS print queue.
pub const DOCUMENT_NAME: &str = "Barcode Label";

/// Spooler datatype for uninterpreted byte passthrough.
pub const RAW_DATATYPE: &str = "RAW";

// ============================================================================
// TYPES
// ============================================================================

/// Which printers to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrinterScope {
    /// Printers installed on this machine
    Local,
    /// Printers reached through an existing network connection
    Connections,
}

/// A printer known to the host OS, by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrinterTarget {
    pub name: String,
}

impl PrinterTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for PrinterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Job metadata passed to the OS when a transaction is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub document_name: String,
    pub datatype: String,
}

impl Default for JobInfo {
    fn default() -> Self {
        Self {
            document_name: DOCUMENT_NAME.to_string(),
            datatype: RAW_DATATYPE.to_string(),
        }
    }
}

/// One copy of a label on its way to a printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub target: PrinterTarget,
    pub payload: Vec<u8>,
    pub info: JobInfo,
}

impl PrintJob {
    pub fn new(target: PrinterTarget, payload: Vec<u8>) -> Self {
        Self {
            target,
            payload,
            info: JobInfo::default(),
        }
    }
}

/// Outcome of [`Spooler::send_copies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyReport {
    pub succeeded: u32,
    pub total: u32,
}

impl CopyReport {
    /// Every copy printed.
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }

    pub fn failed(&self) -> u32 {
        self.total - self.succeeded
    }
}

impl fmt::Display for CopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.succeeded, self.total)
    }
}

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// OS access needed to run a raw print job.
///
/// A handle is owned by exactly one transaction and is always passed back
/// to [`close`](Self::close), which must release it even after a failed
/// write.
pub trait PrintTransport: Send + Sync {
    type Handle;

    /// Printer names in OS order.
    fn list_printers(&self, scope: PrinterScope) -> Result<Vec<String>, EtiquetaError>;

    /// Open a job transaction on `target`.
    ///
    /// Fails with [`EtiquetaError::PrinterUnavailable`] when the name is
    /// not registered with the OS.
    fn open(&self, target: &PrinterTarget, info: &JobInfo) -> Result<Self::Handle, EtiquetaError>;

    /// Write `data` as one block.
    fn write(&self, handle: &mut Self::Handle, data: &[u8]) -> Result<(), EtiquetaError>;

    /// Finish the job and release the handle.
    fn close(&self, handle: Self::Handle) -> Result<(), EtiquetaError>;
}

// ============================================================================
// SPOOLER
// ============================================================================

/// # Spooler
///
/// Runs raw print jobs through a [`PrintTransport`].
///
/// ## Example
///
/// ```
/// use etiqueta::transport::{MemoryTransport, Spooler};
///
/// let spooler = Spooler::new(MemoryTransport::with_printers(&["Zebra"], &[]));
/// let report = spooler.send_copies("Zebra", b"^XA^XZ", 2);
/// assert_eq!((report.succeeded, report.total), (2, 2));
/// ```
pub struct Spooler<T: PrintTransport> {
    transport: T,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<T: PrintTransport> Spooler<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Lock for one printer name. Entries no caller holds are dropped
    /// first, so the map only grows with the printers in use.
    fn target_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(name.to_string()).or_default().clone()
    }

    /// # Send One Copy
    ///
    /// Opens a `"Barcode Label"` job with the `RAW` datatype on
    /// `target_name`, writes `payload` as one block and closes the job.
    ///
    /// ## Errors
    ///
    /// - [`EtiquetaError::PrinterUnavailable`] if the printer is unknown
    /// - [`EtiquetaError::Spooler`] if the write or close fails
    pub fn send(&self, target_name: &str, payload: &[u8]) -> Result<(), EtiquetaError> {
        let lock = self.target_lock(target_name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let job = PrintJob::new(PrinterTarget::new(target_name), payload.to_vec());
        self.run_job(&job)
    }

    /// # Send Several Copies
    ///
    /// Sends `copies` independent jobs one after another. A failed copy is
    /// logged and does not stop the remaining ones. The target stays locked
    /// for the whole run so copies are not interleaved with other callers.
    pub fn send_copies(&self, target_name: &str, payload: &[u8], copies: u32) -> CopyReport {
        let lock = self.target_lock(target_name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let job = PrintJob::new(PrinterTarget::new(target_name), payload.to_vec());

        let mut report = CopyReport {
            succeeded: 0,
            total: copies,
        };
        for copy in 1..=copies {
            match self.run_job(&job) {
                Ok(()) => report.succeeded += 1,
                Err(e) => warn!(printer = target_name, copy, copies, error = %e, "copy failed"),
            }
        }

        info!(printer = target_name, %report, "copies sent");
        report
    }

    fn run_job(&self, job: &PrintJob) -> Result<(), EtiquetaError> {
        let mut handle = self.transport.open(&job.target, &job.info)?;
        let written = self.transport.write(&mut handle, &job.payload);
        let closed = self.transport.close(handle);

        written?;
        closed?;
        debug!(printer = %job.target, bytes = job.payload.len(), "job sent");
        Ok(())
    }

    /// # List Printers
    ///
    /// Local printers first, then network connections, in OS order with
    /// duplicate names removed. A scope that cannot be listed is logged and
    /// skipped.
    pub fn enumerate_targets(&self) -> Vec<PrinterTarget> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        for scope in [PrinterScope::Local, PrinterScope::Connections] {
            let names = match self.transport.list_printers(scope) {
                Ok(names) => names,
                Err(e) => {
                    warn!(?scope, error = %e, "failed to list printers");
                    continue;
                }
            };
            for name in names {
                if seen.insert(name.clone()) {
                    targets.push(PrinterTarget { name });
                }
            }
        }

        targets
    }

    /// Test that `target_name` accepts a job: opens a transaction and
    /// closes it without writing.
    pub fn probe(&self, target_name: &str) -> Result<(), EtiquetaError> {
        let lock = self.target_lock(target_name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let handle = self
            .transport
            .open(&PrinterTarget::new(target_name), &JobInfo::default())?;
        self.transport.close(handle)?;
        info!(printer = target_name, "printer reachable");
        Ok(())
    }
}

/// The host OS spooler.
#[cfg(windows)]
pub type SystemTransport = WindowsSpooler;

/// The host OS spooler.
#[cfg(unix)]
pub type SystemTransport = CupsSpooler;

/// Spooler over the host OS print system.
#[cfg(any(windows, unix))]
pub fn system_spooler() -> Spooler<SystemTransport> {
    Spooler::new(SystemTransport::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::Event;

    fn spooler() -> Spooler<MemoryTransport> {
        Spooler::new(MemoryTransport::with_printers(&["Zebra ZD420"], &[]))
    }

    #[test]
    fn test_send_records_raw_job() {
        let spooler = spooler();
        spooler.send("Zebra ZD420", b"^XA^XZ").unwrap();

        let jobs = spooler.transport().jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target, "Zebra ZD420");
        assert_eq!(jobs[0].info.document_name, "Barcode Label");
        assert_eq!(jobs[0].info.datatype, "RAW");
        assert_eq!(jobs[0].payload, b"^XA^XZ");
    }

    #[test]
    fn test_unknown_printer_unavailable() {
        let err = spooler().send("Nope", b"^XA^XZ").unwrap_err();
        assert!(matches!(err, EtiquetaError::PrinterUnavailable(_)));
    }

    #[test]
    fn test_close_runs_after_failed_write() {
        let transport = MemoryTransport::with_printers(&["Zebra"], &[]).fail_write(0);
        let spooler = Spooler::new(transport);

        let err = spooler.send("Zebra", b"^XA^XZ").unwrap_err();
        assert!(matches!(err, EtiquetaError::Spooler(_)));
        assert_eq!(
            spooler.transport().events(),
            vec![
                Event::Open("Zebra".into()),
                Event::Write("Zebra".into()),
                Event::Close("Zebra".into()),
            ]
        );
        assert!(spooler.transport().jobs().is_empty());
    }

    #[test]
    fn test_copies_continue_after_failure() {
        let transport = MemoryTransport::with_printers(&["Zebra"], &[]).fail_write(1);
        let spooler = Spooler::new(transport);

        let report = spooler.send_copies("Zebra", b"^XA^XZ", 3);
        assert_eq!(report, CopyReport { succeeded: 2, total: 3 });
        assert!(!report.is_complete());
        assert_eq!(report.failed(), 1);
        assert_eq!(spooler.transport().jobs().len(), 2);
    }

    #[test]
    fn test_copies_on_missing_printer() {
        let report = spooler().send_copies("Nope", b"x", 2);
        assert_eq!(report, CopyReport { succeeded: 0, total: 2 });
    }

    #[test]
    fn test_enumerate_locals_first_without_duplicates() {
        let transport = MemoryTransport::with_printers(
            &["Zebra", "Office Laser"],
            &["\\\\srv\\Zebra2", "Zebra"],
        );
        let spooler = Spooler::new(transport);
        let names: Vec<String> = spooler
            .enumerate_targets()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Zebra", "Office Laser", "\\\\srv\\Zebra2"]);
    }

    #[test]
    fn test_send_empty_payload_records_job() {
        let spooler = spooler();
        spooler.send("Zebra ZD420", b"").unwrap();
        assert_eq!(spooler.transport().jobs().len(), 1);
    }

    #[test]
    fn test_idle_locks_are_released() {
        let spooler = spooler();
        for name in ["A", "B", "C", "Zebra ZD420"] {
            let _ = spooler.send(name, b"^XA^XZ");
        }
        let locks = spooler.locks.lock().unwrap();
        assert_eq!(locks.len(), 1);
        assert!(locks.contains_key("Zebra ZD420"));
    }

    #[test]
    fn test_probe_writes_nothing() {
        let spooler = spooler();
        spooler.probe("Zebra ZD420").unwrap();
        assert!(spooler.transport().jobs().is_empty());
        assert_eq!(
            spooler.transport().events(),
            vec![
                Event::Open("Zebra ZD420".into()),
                Event::Close("Zebra ZD420".into()),
            ]
        );
        assert!(spooler.probe("Nope").is_err());
    }

    #[test]
    fn test_parallel_sends_do_not_interleave() {
        let spooler = Arc::new(spooler());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let spooler = Arc::clone(&spooler);
                std::thread::spawn(move || spooler.send_copies("Zebra ZD420", b"^XA^XZ", 5))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_complete());
        }

        // Every open is followed by its own write and close.
        let events = spooler.transport().events();
        assert_eq!(events.len(), 4 * 5 * 3);
        for chunk in events.chunks(3) {
            assert!(matches!(chunk[0], Event::Open(_)));
            assert!(matches!(chunk[1], Event::Write(_)));
            assert!(matches!(chunk[2], Event::Close(_)));
        }
    }
}
