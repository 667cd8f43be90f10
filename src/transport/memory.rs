//! In-memory transport.
//!
//! Records every transaction instead of printing, and can be scripted to
//! fail specific writes. Backs the tests and the CLI's `--dry-run`.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use super::{JobInfo, PrintTransport, PrinterScope, PrinterTarget};
use crate::error::EtiquetaError;

/// A transaction step, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(String),
    Write(String),
    Close(String),
}

/// A job that was written without error and closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedJob {
    pub target: String,
    pub info: JobInfo,
    pub payload: Vec<u8>,
}

/// Open transaction on a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryHandle {
    target: String,
    info: JobInfo,
    payload: Vec<u8>,
    written: bool,
    failed: bool,
}

#[derive(Debug, Default)]
struct State {
    writes: usize,
    events: Vec<Event>,
    jobs: Vec<RecordedJob>,
}

/// Fake printer system.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    local: Vec<String>,
    connections: Vec<String>,
    failing_writes: HashSet<usize>,
    state: Mutex<State>,
}

impl MemoryTransport {
    /// A transport that knows the given local and network printers.
    pub fn with_printers(local: &[&str], connections: &[&str]) -> Self {
        Self {
            local: local.iter().map(|s| s.to_string()).collect(),
            connections: connections.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Make the `index`-th write (0-based, counted across all jobs) fail.
    pub fn fail_write(mut self, index: usize) -> Self {
        self.failing_writes.insert(index);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Completed jobs.
    pub fn jobs(&self) -> Vec<RecordedJob> {
        self.state().jobs.clone()
    }

    /// Every open, write and close seen so far.
    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    fn knows(&self, name: &str) -> bool {
        self.local.iter().chain(&self.connections).any(|p| p == name)
    }
}

impl PrintTransport for MemoryTransport {
    type Handle = MemoryHandle;

    fn list_printers(&self, scope: PrinterScope) -> Result<Vec<String>, EtiquetaError> {
        Ok(match scope {
            PrinterScope::Local => self.local.clone(),
            PrinterScope::Connections => self.connections.clone(),
        })
    }

    fn open(&self, target: &PrinterTarget, info: &JobInfo) -> Result<MemoryHandle, EtiquetaError> {
        if !self.knows(&target.name) {
            return Err(EtiquetaError::PrinterUnavailable(target.name.clone()));
        }
        self.state().events.push(Event::Open(target.name.clone()));
        Ok(MemoryHandle {
            target: target.name.clone(),
            info: info.clone(),
            payload: Vec::new(),
            written: false,
            failed: false,
        })
    }

    fn write(&self, handle: &mut MemoryHandle, data: &[u8]) -> Result<(), EtiquetaError> {
        let mut state = self.state();
        state.events.push(Event::Write(handle.target.clone()));
        let index = state.writes;
        state.writes += 1;

        if self.failing_writes.contains(&index) {
            handle.failed = true;
            return Err(EtiquetaError::Spooler(format!(
                "write {} to {} failed",
                index, handle.target
            )));
        }
        handle.payload.extend_from_slice(data);
        handle.written = true;
        Ok(())
    }

    fn close(&self, handle: MemoryHandle) -> Result<(), EtiquetaError> {
        let mut state = self.state();
        state.events.push(Event::Close(handle.target.clone()));
        // A bare open and close (a reachability check) is not a job
        if handle.written && !handle.failed {
            info!(
                printer = %handle.target,
                bytes = handle.payload.len(),
                "dry run: job captured"
            );
            state.jobs.push(RecordedJob {
                target: handle.target,
                info: handle.info,
                payload: handle.payload,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_recorded() {
        let transport = MemoryTransport::with_printers(&["Zebra"], &[]);
        let mut handle = transport
            .open(&PrinterTarget::new("Zebra"), &JobInfo::default())
            .unwrap();
        transport.write(&mut handle, b"").unwrap();
        transport.close(handle).unwrap();

        let jobs = transport.jobs();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].payload.is_empty());
    }

    #[test]
    fn test_failed_write_is_not_recorded() {
        let transport = MemoryTransport::with_printers(&["Zebra"], &[]).fail_write(0);
        let mut handle = transport
            .open(&PrinterTarget::new("Zebra"), &JobInfo::default())
            .unwrap();
        assert!(transport.write(&mut handle, b"^XA^XZ").is_err());
        transport.close(handle).unwrap();
        assert!(transport.jobs().is_empty());
        assert_eq!(transport.events().len(), 3);
    }
}
