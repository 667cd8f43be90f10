//! # Windows Spooler Transport
//!
//! Raw jobs through the Win32 print spooler.
//!
//! ## Call Sequence
//!
//! | Step | Win32 call |
//! |------|------------|
//! | open | `OpenPrinterW`, `StartDocPrinterW` (`DOC_INFO_1W`, datatype `RAW`), `StartPagePrinter` |
//! | write | `WritePrinter` |
//! | close | `EndPagePrinter`, `EndDocPrinter`, `ClosePrinter` |
//!
//! [`SpoolJob`] owns the printer handle and ends whatever was started when
//! dropped, so an early return never leaks a spooler handle.

use core::ffi::c_void;

use ::windows::Win32::Graphics::Printing::{
    ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, EnumPrintersW, OpenPrinterW,
    PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL, PRINTER_HANDLE, PRINTER_INFO_5W,
    StartDocPrinterW, StartPagePrinter, WritePrinter,
};
use ::windows::core::{PCWSTR, PWSTR};
use tracing::{debug, warn};

use super::{JobInfo, PrintTransport, PrinterScope, PrinterTarget};
use crate::error::EtiquetaError;

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Win32 print spooler.
#[derive(Debug, Clone, Default)]
pub struct WindowsSpooler {
    _private: (),
}

/// An open spooler document.
pub struct SpoolJob {
    name: String,
    handle: PRINTER_HANDLE,
    doc_started: bool,
    page_started: bool,
    closed: bool,
}

impl SpoolJob {
    /// End the page and document, then release the handle. Every step runs
    /// even if an earlier one fails; the first failure is reported.
    fn finish(&mut self) -> Result<(), EtiquetaError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut failure = None;

        unsafe {
            if self.page_started && !EndPagePrinter(self.handle).as_bool() {
                failure.get_or_insert("EndPagePrinter failed");
            }
            if self.doc_started && !EndDocPrinter(self.handle).as_bool() {
                failure.get_or_insert("EndDocPrinter failed");
            }
            if ClosePrinter(self.handle).is_err() {
                failure.get_or_insert("ClosePrinter failed");
            }
        }

        match failure {
            Some(step) => Err(EtiquetaError::Spooler(format!("{}: {}", self.name, step))),
            None => Ok(()),
        }
    }
}

impl Drop for SpoolJob {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(error = %e, "releasing spooler handle");
        }
    }
}

impl PrintTransport for WindowsSpooler {
    type Handle = SpoolJob;

    fn list_printers(&self, scope: PrinterScope) -> Result<Vec<String>, EtiquetaError> {
        let flags = match scope {
            PrinterScope::Local => PRINTER_ENUM_LOCAL,
            PrinterScope::Connections => PRINTER_ENUM_CONNECTIONS,
        };

        unsafe {
            let mut needed: u32 = 0;
            let mut returned: u32 = 0;

            let _ = EnumPrintersW(flags, None, 5, None, &mut needed, &mut returned);
            if needed == 0 {
                return Ok(Vec::new());
            }

            let mut buf: Vec<u8> = vec![0; needed as usize];
            EnumPrintersW(
                flags,
                None,
                5,
                Some(buf.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
            .map_err(|e| EtiquetaError::Spooler(format!("EnumPrintersW failed: {}", e)))?;

            let ptr = buf.as_ptr() as *const PRINTER_INFO_5W;
            let infos = std::slice::from_raw_parts(ptr, returned as usize);

            Ok(infos
                .iter()
                .filter(|info| !info.pPrinterName.is_null())
                .filter_map(|info| PWSTR(info.pPrinterName.0).to_string().ok())
                .collect())
        }
    }

    fn open(&self, target: &PrinterTarget, info: &JobInfo) -> Result<SpoolJob, EtiquetaError> {
        let name_w = to_wide(&target.name);
        let mut handle = PRINTER_HANDLE::default();

        unsafe {
            OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut handle, None)
                .map_err(|_| EtiquetaError::PrinterUnavailable(target.name.clone()))?;
        }

        let mut job = SpoolJob {
            name: target.name.clone(),
            handle,
            doc_started: false,
            page_started: false,
            closed: false,
        };

        let doc_name_w = to_wide(&info.document_name);
        let datatype_w = to_wide(&info.datatype);
        let doc_info = DOC_INFO_1W {
            pDocName: PWSTR(doc_name_w.as_ptr() as *mut _),
            pOutputFile: PWSTR::null(),
            pDatatype: PWSTR(datatype_w.as_ptr() as *mut _),
        };

        unsafe {
            if StartDocPrinterW(job.handle, 1, &doc_info as *const DOC_INFO_1W) == 0 {
                return Err(EtiquetaError::Spooler(format!(
                    "{}: StartDocPrinter failed",
                    target.name
                )));
            }
            job.doc_started = true;

            if !StartPagePrinter(job.handle).as_bool() {
                return Err(EtiquetaError::Spooler(format!(
                    "{}: StartPagePrinter failed",
                    target.name
                )));
            }
            job.page_started = true;
        }

        debug!(printer = %target.name, "spooler document started");
        Ok(job)
    }

    fn write(&self, handle: &mut SpoolJob, data: &[u8]) -> Result<(), EtiquetaError> {
        let mut written: u32 = 0;
        let ok = unsafe {
            WritePrinter(
                handle.handle,
                data.as_ptr() as *const c_void,
                data.len() as u32,
                &mut written,
            )
        };

        if !ok.as_bool() {
            return Err(EtiquetaError::Spooler(format!(
                "{}: WritePrinter failed",
                handle.name
            )));
        }
        if written != data.len() as u32 {
            return Err(EtiquetaError::Spooler(format!(
                "{}: incomplete write ({} of {} bytes)",
                handle.name,
                written,
                data.len()
            )));
        }
        Ok(())
    }

    fn close(&self, mut handle: SpoolJob) -> Result<(), EtiquetaError> {
        handle.finish()
    }
}
