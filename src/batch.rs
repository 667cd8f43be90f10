//! # Batch Labels
//!
//! Turns a table of rows (name, grade, optional explicit code) into
//! labels: previews for every selected row, then printing and export.
//!
//! ## Code Numbering
//!
//! Each row's code comes from a [`CodeTemplate`]. The template is applied
//! to the row's `grau` value, or to the 1-based row number when `grau` is
//! empty:
//!
//! | Template | grau | Row | Code |
//! |----------|------|-----|------|
//! | `{}.01` | `123` | 1 | `123.01` |
//! | `{}.01` | | 4 | `4.01` |
//! | `{}` | | 4 | `4` |
//!
//! An explicit `code` in the row wins over the template.
//!
//! ## Failure Handling
//!
//! One bad row never stops a batch. A row whose code fails validation has
//! no preview, is not printed, and all of its copies count as failed.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::error::EtiquetaError;
use crate::preview::{LabelComposer, RenderedLabel};
use crate::printer::LabelConfig;
use crate::protocol::{LabelLayout, encode_label};
use crate::symbology::Symbology;
use crate::transport::{CopyReport, PrintTransport, Spooler};

/// Longest name fragment used in export file names.
const MAX_SAFE_NAME: usize = 50;

// ============================================================================
// SESSION
// ============================================================================

/// Code template with a single `{}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTemplate(String);

impl CodeTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, EtiquetaError> {
        let template = template.into();
        if template.matches("{}").count() != 1 {
            return Err(EtiquetaError::InvalidRequest(format!(
                "code template {:?} must contain exactly one {{}}",
                template
            )));
        }
        Ok(Self(template))
    }

    pub fn apply(&self, value: &str) -> String {
        self.0.replacen("{}", value, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CodeTemplate {
    fn default() -> Self {
        Self("{}.01".to_string())
    }
}

/// Caller-owned printing state.
#[derive(Debug, Clone, Default)]
pub struct PrintSession {
    /// Selected printer
    pub printer: Option<String>,
    pub symbology: Symbology,
    pub template: CodeTemplate,
    /// Print each label twice
    pub print_double: bool,
}

impl PrintSession {
    /// Copies per label.
    pub fn copies(&self) -> u32 {
        if self.print_double { 2 } else { 1 }
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// One input row. Numbers are accepted wherever text is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchRow {
    #[serde(default, deserialize_with = "text_or_number")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub grau: Option<String>,
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let text = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(D::Error::custom(format!(
                "expected text or number, got {}",
                other
            )));
        }
    };
    let text = text.trim().to_string();
    Ok(Some(text).filter(|t| !t.is_empty()))
}

impl BatchRow {
    /// Parse rows from a JSON array.
    pub fn from_json(json: &str) -> Result<Vec<Self>, EtiquetaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The code for this row at 0-based position `index`.
    pub fn code_for(&self, index: usize, template: &CodeTemplate) -> String {
        if let Some(code) = &self.code {
            return code.clone();
        }
        match &self.grau {
            Some(grau) => template.apply(grau),
            None => template.apply(&(index + 1).to_string()),
        }
    }
}

/// # Parse a Row Selection
///
/// Parses 1-based row numbers and inclusive ranges (`"1,3,5-10"`) into
/// sorted, de-duplicated 0-based indices. Rows past `max` are dropped.
///
/// ## Errors
///
/// [`EtiquetaError::InvalidRange`] for an empty selection, a part that is
/// not a number, row 0, or a backwards range.
pub fn parse_range(selection: &str, max: usize) -> Result<Vec<usize>, EtiquetaError> {
    if selection.trim().is_empty() {
        return Err(EtiquetaError::InvalidRange("empty selection".into()));
    }

    let mut indices = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (row_number(start)?, row_number(end)?),
            None => {
                let n = row_number(part)?;
                (n, n)
            }
        };
        if start > end {
            return Err(EtiquetaError::InvalidRange(format!(
                "range {} runs backwards",
                part
            )));
        }
        indices.extend((start..=end.min(max)).map(|n| n - 1));
    }

    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

fn row_number(text: &str) -> Result<usize, EtiquetaError> {
    let text = text.trim();
    match text.parse::<usize>() {
        Ok(0) => Err(EtiquetaError::InvalidRange("rows start at 1".into())),
        Ok(n) => Ok(n),
        Err(_) => Err(EtiquetaError::InvalidRange(format!(
            "{:?} is not a row number",
            text
        ))),
    }
}

// ============================================================================
// PROCESSING
// ============================================================================

/// A row ready for printing: its code, captions and preview.
#[derive(Debug)]
pub struct BatchLabel {
    /// 0-based row index
    pub row: usize,
    pub code: String,
    pub name: Option<String>,
    pub grau: Option<String>,
    pub preview: Result<RenderedLabel, EtiquetaError>,
}

/// What happened to one label.
#[derive(Debug)]
pub struct LabelOutcome {
    pub label: BatchLabel,
    pub printed: CopyReport,
}

/// Result of printing a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub labels: Vec<LabelOutcome>,
    /// Copies printed across all labels
    pub printed: u32,
    /// Copies attempted across all labels
    pub total: u32,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.printed == self.total
    }
}

/// # Compose Previews for Selected Rows
///
/// `selection` holds 0-based indices into `rows` (see [`parse_range`]);
/// indices past the end are skipped.
pub fn prepare_batch(
    rows: &[BatchRow],
    selection: &[usize],
    session: &PrintSession,
    composer: &LabelComposer,
) -> Vec<BatchLabel> {
    selection
        .iter()
        .filter_map(|&row| rows.get(row).map(|r| (row, r)))
        .map(|(row, r)| {
            let code = r.code_for(row, &session.template);
            let preview = composer.compose_symbology(
                session.symbology,
                &code,
                r.name.as_deref(),
                r.grau.as_deref(),
            );
            if let Err(e) = &preview {
                warn!(row = row + 1, code = %code, error = %e, "label rejected");
            }
            BatchLabel {
                row,
                code,
                name: r.name.clone(),
                grau: r.grau.clone(),
                preview,
            }
        })
        .collect()
}

/// # Print Prepared Labels
///
/// Sends [`PrintSession::copies`] copies of every label with a valid
/// preview to the session's printer, stamping each label with `date`.
///
/// ## Errors
///
/// [`EtiquetaError::InvalidRequest`] when the session has no printer.
pub fn print_batch<T: PrintTransport>(
    labels: Vec<BatchLabel>,
    session: &PrintSession,
    spooler: &Spooler<T>,
    date: NaiveDate,
) -> Result<BatchReport, EtiquetaError> {
    let printer = session
        .printer
        .as_deref()
        .ok_or_else(|| EtiquetaError::InvalidRequest("no printer selected".into()))?;
    let copies = session.copies();
    let mut report = BatchReport::default();

    for label in labels {
        let printed = match (&label.preview, session.symbology.validate(&label.code)) {
            (Ok(_), Ok(code)) => {
                let zpl = encode_label(
                    session.symbology,
                    &code,
                    label.name.as_deref(),
                    date,
                    &LabelConfig::LABEL_52X33,
                    &LabelLayout::LABEL_52X33,
                );
                spooler.send_copies(printer, &zpl, copies)
            }
            _ => CopyReport {
                succeeded: 0,
                total: copies,
            },
        };

        report.printed += printed.succeeded;
        report.total += printed.total;
        report.labels.push(LabelOutcome { label, printed });
    }

    info!(
        printer,
        labels = report.labels.len(),
        printed = report.printed,
        total = report.total,
        "batch printed"
    );
    Ok(report)
}

/// [`prepare_batch`] then [`print_batch`], stamped with today's date.
pub fn process_batch<T: PrintTransport>(
    rows: &[BatchRow],
    selection: &[usize],
    session: &PrintSession,
    composer: &LabelComposer,
    spooler: &Spooler<T>,
) -> Result<BatchReport, EtiquetaError> {
    let labels = prepare_batch(rows, selection, session, composer);
    print_batch(labels, session, spooler, Local::now().date_naive())
}

// ============================================================================
// EXPORT
// ============================================================================

/// # Export File Name
///
/// `barcode_{name}_{code}.png`, with `_copiaN` appended when more than one
/// copy is exported. Spaces and slashes in the name become underscores
/// and the name is cut to 50 characters; a missing name becomes
/// `orden_{row}` (1-based).
pub fn export_file_name(
    name: Option<&str>,
    row: usize,
    code: &str,
    copy: u32,
    copies: u32,
) -> String {
    let safe_name = match name.filter(|n| !n.is_empty()) {
        Some(name) => name
            .chars()
            .map(|c| if c == ' ' || c == '/' { '_' } else { c })
            .take(MAX_SAFE_NAME)
            .collect(),
        None => format!("orden_{}", row + 1),
    };
    let safe_code = code.replace('/', "_");
    let suffix = if copies > 1 {
        format!("_copia{}", copy)
    } else {
        String::new()
    };
    format!("barcode_{}_{}{}.png", safe_name, safe_code, suffix)
}

/// PNG previews to export, one per copy, with names unique in the set.
///
/// A name that is already taken gains `_fila{row}` (1-based) before the
/// extension, then a counter if it still collides.
fn export_entries(
    labels: &[BatchLabel],
    copies: u32,
) -> Result<Vec<(String, Vec<u8>)>, EtiquetaError> {
    let mut used = HashSet::new();
    let mut entries = Vec::new();

    for label in labels {
        let Ok(preview) = &label.preview else {
            continue;
        };
        let png = preview.to_png()?;
        for copy in 1..=copies {
            let name =
                export_file_name(label.name.as_deref(), label.row, &label.code, copy, copies);
            let name = unique_name(&mut used, name, label.row);
            entries.push((name, png.clone()));
        }
    }
    Ok(entries)
}

fn unique_name(used: &mut HashSet<String>, name: String, row: usize) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let stem = name.strip_suffix(".png").unwrap_or(&name);
    let with_row = format!("{}_fila{}", stem, row + 1);
    let mut candidate = format!("{}.png", with_row);
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}_{}.png", with_row, n);
        n += 1;
    }
    candidate
}

/// Write each valid preview as PNG into `dir`, once per copy. Returns the
/// written paths, one distinct file each.
pub fn export_to_dir(
    labels: &[BatchLabel],
    copies: u32,
    dir: &Path,
) -> Result<Vec<PathBuf>, EtiquetaError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for (name, png) in export_entries(labels, copies)? {
        let path = dir.join(name);
        std::fs::write(&path, &png)?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = written.len(), "previews exported");
    Ok(written)
}

/// Pack each valid preview as PNG into an in-memory ZIP archive, once per
/// copy.
pub fn export_zip(labels: &[BatchLabel], copies: u32) -> Result<Vec<u8>, EtiquetaError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buf);
        let options: FileOptions<()> =
            FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, png) in export_entries(labels, copies)? {
            zip.start_file(name, options)
                .map_err(|e| EtiquetaError::Export(e.to_string()))?;
            zip.write_all(&png)?;
        }
        zip.finish()
            .map_err(|e| EtiquetaError::Export(e.to_string()))?;
    }
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::{BuiltinFont, ComposerConfig};
    use crate::transport::MemoryTransport;
    use pretty_assertions::assert_eq;

    fn composer() -> LabelComposer {
        LabelComposer::with_font(
            ComposerConfig::default(),
            Box::new(BuiltinFont::new().unwrap()),
        )
    }

    fn rows() -> Vec<BatchRow> {
        BatchRow::from_json(
            r#"[
                {"name": "GARCIA PEREZ", "grau": 123},
                {"name": "LOPEZ / RUIZ", "grau": ""},
                {"code": "ABC-1", "name": null}
            ]"#,
        )
        .unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_template() {
        let template = CodeTemplate::default();
        assert_eq!(template.apply("7"), "7.01");
        assert!(CodeTemplate::new("{}").is_ok());
        assert!(CodeTemplate::new("no placeholder").is_err());
        assert!(CodeTemplate::new("{}{}").is_err());
    }

    #[test]
    fn test_session_copies() {
        let mut session = PrintSession::default();
        assert_eq!(session.copies(), 1);
        session.print_double = true;
        assert_eq!(session.copies(), 2);
    }

    #[test]
    fn test_row_codes() {
        let rows = rows();
        let template = CodeTemplate::default();
        assert_eq!(rows[0].grau.as_deref(), Some("123"));
        assert_eq!(rows[0].code_for(0, &template), "123.01");
        assert_eq!(rows[1].grau, None);
        assert_eq!(rows[1].code_for(1, &template), "2.01");
        assert_eq!(rows[2].code_for(2, &template), "ABC-1");
    }

    #[test]
    fn test_rows_reject_objects() {
        let result = BatchRow::from_json(r#"[{"grau": {"x": 1}}]"#);
        assert!(matches!(result, Err(EtiquetaError::Json(_))));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("1,3,5-7", 10).unwrap(), vec![0, 2, 4, 5, 6]);
        assert_eq!(parse_range("3, 1-3 ,", 10).unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_range("8-20", 10).unwrap(), vec![7, 8, 9]);
        assert_eq!(parse_range("11", 10).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_parse_range_errors() {
        for bad in ["", "  ", "a", "0", "5-2", "1-x", "-3"] {
            assert!(
                matches!(parse_range(bad, 10), Err(EtiquetaError::InvalidRange(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(Some("GARCIA PEREZ"), 0, "123.01", 1, 1),
            "barcode_GARCIA_PEREZ_123.01.png"
        );
        assert_eq!(
            export_file_name(Some("A/B"), 0, "1.01", 2, 2),
            "barcode_A_B_1.01_copia2.png"
        );
        assert_eq!(
            export_file_name(None, 4, "5.01", 1, 1),
            "barcode_orden_5_5.01.png"
        );
        let long = "X".repeat(80);
        let name = export_file_name(Some(&long), 0, "1", 1, 1);
        assert_eq!(name, format!("barcode_{}_1.png", "X".repeat(50)));
    }

    #[test]
    fn test_prepare_skips_out_of_range_rows() {
        let labels = prepare_batch(&rows(), &[0, 2, 9], &PrintSession::default(), &composer());
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].code, "123.01");
        assert_eq!(labels[1].code, "ABC-1");
        assert!(labels.iter().all(|l| l.preview.is_ok()));
    }

    #[test]
    fn test_print_batch_counts_copies() {
        let spooler = Spooler::new(MemoryTransport::with_printers(&["Zebra"], &[]).fail_write(1));
        let session = PrintSession {
            printer: Some("Zebra".into()),
            print_double: true,
            ..Default::default()
        };
        let labels = prepare_batch(&rows(), &[0, 1], &session, &composer());
        let report = print_batch(labels, &session, &spooler, date()).unwrap();

        assert_eq!((report.printed, report.total), (3, 4));
        assert_eq!(report.labels[0].printed, CopyReport { succeeded: 1, total: 2 });
        assert_eq!(report.labels[1].printed, CopyReport { succeeded: 2, total: 2 });

        let jobs = spooler.transport().jobs();
        let first = String::from_utf8(jobs[0].payload.clone()).unwrap();
        assert!(first.contains("^FD123.01^FS"));
        assert!(first.contains("^FDGARCIA PEREZ^FS"));
        assert!(first.contains("^FD16/10/2026^FS"));
    }

    #[test]
    fn test_invalid_label_is_not_printed() {
        let spooler = Spooler::new(MemoryTransport::with_printers(&["Zebra"], &[]));
        let session = PrintSession {
            printer: Some("Zebra".into()),
            symbology: Symbology::Ean13,
            ..Default::default()
        };
        let labels = prepare_batch(&rows(), &[0], &session, &composer());
        assert!(matches!(
            labels[0].preview,
            Err(EtiquetaError::InvalidCodeValue { .. })
        ));

        let report = print_batch(labels, &session, &spooler, date()).unwrap();
        assert_eq!((report.printed, report.total), (0, 1));
        assert!(spooler.transport().jobs().is_empty());
    }

    #[test]
    fn test_print_needs_printer() {
        let spooler = Spooler::new(MemoryTransport::default());
        let result = print_batch(Vec::new(), &PrintSession::default(), &spooler, date());
        assert!(matches!(result, Err(EtiquetaError::InvalidRequest(_))));
    }

    #[test]
    fn test_export_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let session = PrintSession::default();
        let labels = prepare_batch(&rows(), &[0, 1], &session, &composer());
        let written = export_to_dir(&labels, 2, dir.path()).unwrap();

        assert_eq!(written.len(), 4);
        assert!(dir.path().join("barcode_GARCIA_PEREZ_123.01_copia1.png").exists());
        assert!(dir.path().join("barcode_LOPEZ___RUIZ_2.01_copia2.png").exists());
    }

    #[test]
    fn test_export_zip() {
        let labels = prepare_batch(&rows(), &[0], &PrintSession::default(), &composer());
        let archive = export_zip(&labels, 1).unwrap();
        assert_eq!(&archive[..2], b"PK");
    }

    fn twin_rows() -> Vec<BatchRow> {
        BatchRow::from_json(
            r#"[
                {"name": "ANA", "grau": 7},
                {"name": "ANA", "grau": 7},
                {"name": "LUIS", "grau": 8}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_identical_rows_export_to_distinct_files() {
        let labels = prepare_batch(&twin_rows(), &[0, 1, 2], &PrintSession::default(), &composer());

        let dir = tempfile::tempdir().unwrap();
        let written = export_to_dir(&labels, 1, dir.path()).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "barcode_ANA_7.01.png",
                "barcode_ANA_7.01_fila2.png",
                "barcode_LUIS_8.01.png"
            ]
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);

        let archive = export_zip(&labels, 2).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut entries: Vec<&str> = zip.file_names().collect();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                "barcode_ANA_7.01_copia1.png",
                "barcode_ANA_7.01_copia1_fila2.png",
                "barcode_ANA_7.01_copia2.png",
                "barcode_ANA_7.01_copia2_fila2.png",
                "barcode_LUIS_8.01_copia1.png",
                "barcode_LUIS_8.01_copia2.png"
            ]
        );
    }

    #[test]
    fn test_repeated_selection_gets_counter() {
        let mut used = HashSet::new();
        assert_eq!(unique_name(&mut used, "a.png".into(), 0), "a.png");
        assert_eq!(unique_name(&mut used, "a.png".into(), 0), "a_fila1.png");
        assert_eq!(unique_name(&mut used, "a.png".into(), 0), "a_fila1_2.png");
    }
}
