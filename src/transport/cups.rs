//! # CUPS Transport
//!
//! Sends raw jobs through the CUPS command-line tools.
//!
//! | Operation | Command |
//! |-----------|---------|
//! | Local queues | `lpstat -e` |
//! | Network-backed queues | `lpstat -v` (device URI is `ipp://`, `socket://`, ...) |
//! | Submit | `lp -d NAME -t "Barcode Label" -o raw`, payload on stdin |
//!
//! `-o raw` stops the filters from touching the payload, so the printer
//! receives the ZPL bytes unchanged.
//!
//! ## Printer Setup
//!
//! ```bash
//! # Raw queue for a Zebra on USB
//! $ sudo lpadmin -p Zebra -E -v usb://Zebra%20Technologies/ZTC%20ZD420-203dpi -m raw
//!
//! # Raw queue for a networked Zebra
//! $ sudo lpadmin -p ZebraNet -E -v socket://192.168.1.50:9100 -m raw
//! ```

use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, warn};

use super::{JobInfo, PrintTransport, PrinterScope, PrinterTarget};
use crate::error::EtiquetaError;

/// Device URI schemes that reach a printer over the network.
const NETWORK_SCHEMES: &[&str] = &[
    "ipp://", "ipps://", "http://", "https://", "socket://", "lpd://", "dnssd://", "smb://",
];

/// CUPS print system.
#[derive(Debug, Clone)]
pub struct CupsSpooler {
    lpstat: String,
    lp: String,
}

impl Default for CupsSpooler {
    fn default() -> Self {
        Self {
            lpstat: "lpstat".to_string(),
            lp: "lp".to_string(),
        }
    }
}

impl CupsSpooler {
    /// Use explicit paths for `lpstat` and `lp`.
    pub fn with_commands(lpstat: impl Into<String>, lp: impl Into<String>) -> Self {
        Self {
            lpstat: lpstat.into(),
            lp: lp.into(),
        }
    }

    fn lpstat(&self, flag: &str) -> Result<String, EtiquetaError> {
        let output = Command::new(&self.lpstat)
            .arg(flag)
            .output()
            .map_err(|e| {
                EtiquetaError::Spooler(format!("Failed to run '{} {}': {}", self.lpstat, flag, e))
            })?;

        // lpstat exits non-zero when no destinations exist
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(flag, stderr = %stderr.trim(), "lpstat reported no destinations");
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse `lpstat -e` output: one destination per line.
fn parse_destinations(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `lpstat -v` output (`device for NAME: URI`) into the names of
/// network-backed queues.
fn parse_network_devices(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("device for "))
        .filter_map(|rest| rest.split_once(": "))
        .filter(|(_, uri)| {
            let uri = uri.trim().to_lowercase();
            NETWORK_SCHEMES.iter().any(|scheme| uri.starts_with(scheme))
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

/// A running `lp` process.
///
/// Dropping a job that was never closed kills and reaps the child, so no
/// half-written job is left behind.
#[derive(Debug)]
pub struct CupsJob {
    target: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl Drop for CupsJob {
    fn drop(&mut self) {
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            warn!(printer = %self.target, "killing unfinished lp job");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl PrintTransport for CupsSpooler {
    type Handle = CupsJob;

    fn list_printers(&self, scope: PrinterScope) -> Result<Vec<String>, EtiquetaError> {
        match scope {
            PrinterScope::Local => Ok(parse_destinations(&self.lpstat("-e")?)),
            PrinterScope::Connections => Ok(parse_network_devices(&self.lpstat("-v")?)),
        }
    }

    fn open(&self, target: &PrinterTarget, info: &JobInfo) -> Result<CupsJob, EtiquetaError> {
        let known = parse_destinations(&self.lpstat("-e")?);
        if !known.iter().any(|name| *name == target.name) {
            return Err(EtiquetaError::PrinterUnavailable(target.name.clone()));
        }

        let mut child = Command::new(&self.lp)
            .arg("-d")
            .arg(&target.name)
            .arg("-t")
            .arg(&info.document_name)
            .arg("-o")
            .arg(info.datatype.to_lowercase())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EtiquetaError::Spooler(format!("Failed to run '{}': {}", self.lp, e)))?;

        let stdin = child.stdin.take();
        Ok(CupsJob {
            target: target.name.clone(),
            child: Some(child),
            stdin,
        })
    }

    fn write(&self, handle: &mut CupsJob, data: &[u8]) -> Result<(), EtiquetaError> {
        let stdin = handle
            .stdin
            .as_mut()
            .ok_or_else(|| EtiquetaError::Spooler("lp stdin is closed".into()))?;
        stdin
            .write_all(data)
            .and_then(|()| stdin.flush())
            .map_err(|e| EtiquetaError::Spooler(format!("Write to lp failed: {}", e)))
    }

    fn close(&self, mut handle: CupsJob) -> Result<(), EtiquetaError> {
        // EOF on stdin submits the job
        handle.stdin.take();
        let Some(child) = handle.child.take() else {
            return Ok(());
        };

        let output = child
            .wait_with_output()
            .map_err(|e| EtiquetaError::Spooler(format!("Waiting for lp failed: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EtiquetaError::Spooler(format!(
                "lp failed for {}: {}",
                handle.target,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_destinations() {
        let out = "Zebra_ZD420\nOffice\n\n";
        assert_eq!(parse_destinations(out), vec!["Zebra_ZD420", "Office"]);
    }

    #[test]
    fn test_parse_network_devices() {
        let out = "device for Zebra_ZD420: usb://Zebra%20Technologies/ZTC%20ZD420\n\
                   device for ZebraNet: socket://192.168.1.50:9100\n\
                   device for Office: ipp://printer.local/ipp/print\n";
        assert_eq!(parse_network_devices(out), vec!["ZebraNet", "Office"]);
    }

    #[test]
    fn test_missing_lpstat_is_spooler_error() {
        let cups = CupsSpooler::with_commands("/nonexistent/lpstat", "/nonexistent/lp");
        let err = cups.list_printers(PrinterScope::Local).unwrap_err();
        assert!(matches!(err, EtiquetaError::Spooler(_)));
    }

    fn script(dir: &std::path::Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_job_through_fake_tools() {
        let dir = tempfile::tempdir().unwrap();
        let captured = dir.path().join("job.zpl");
        let args = dir.path().join("args.txt");
        let lpstat = script(dir.path(), "lpstat", "echo Zebra");
        let lp = script(
            dir.path(),
            "lp",
            &format!(
                "echo \"$@\" > {}\ncat > {}",
                args.display(),
                captured.display()
            ),
        );
        let cups = CupsSpooler::with_commands(lpstat, lp);

        assert_eq!(cups.list_printers(PrinterScope::Local).unwrap(), vec!["Zebra"]);

        let mut job = cups
            .open(&PrinterTarget::new("Zebra"), &JobInfo::default())
            .unwrap();
        cups.write(&mut job, b"^XA^XZ").unwrap();
        cups.close(job).unwrap();

        assert_eq!(std::fs::read(&captured).unwrap(), b"^XA^XZ");
        assert_eq!(
            std::fs::read_to_string(&args).unwrap().trim(),
            "-d Zebra -t Barcode Label -o raw"
        );

        let err = cups
            .open(&PrinterTarget::new("Missing"), &JobInfo::default())
            .unwrap_err();
        assert!(matches!(err, EtiquetaError::PrinterUnavailable(_)));
    }

    #[test]
    fn test_unknown_queue_spawns_no_lp() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("lp-ran");
        let lpstat = script(dir.path(), "lpstat", "echo Zebra");
        let lp = script(dir.path(), "lp", &format!("touch {}", marker.display()));
        let cups = CupsSpooler::with_commands(lpstat, lp);

        let result = cups.open(&PrinterTarget::new("Office"), &JobInfo::default());
        assert!(matches!(result, Err(EtiquetaError::PrinterUnavailable(ref name)) if name == "Office"));
        assert!(!marker.exists());
    }

    #[test]
    fn test_failing_lp_is_spooler_error() {
        let dir = tempfile::tempdir().unwrap();
        let lpstat = script(dir.path(), "lpstat", "echo Zebra");
        let lp = script(dir.path(), "lp", "cat > /dev/null\necho 'lp: printer offline' >&2\nexit 1");
        let cups = CupsSpooler::with_commands(lpstat, lp);

        let mut job = cups
            .open(&PrinterTarget::new("Zebra"), &JobInfo::default())
            .unwrap();
        cups.write(&mut job, b"^XA^XZ").unwrap();
        let err = cups.close(job).unwrap_err();
        assert!(matches!(err, EtiquetaError::Spooler(ref msg) if msg.contains("printer offline")));
    }
}
