//! # Label Command Encoder
//!
//! Re-expresses a label as a ZPL command stream with fixed physical
//! coordinates. This stream, not the preview bitmap, is what the printer
//! receives.
//!
//! ## Stream Layout
//!
//! ```text
//! ^XA                                   start of label
//! ^PW415                                page width (dots)
//! ^LL264                                label length (dots)
//! ^FO280,10^A0N,24,24^FD16/10/2026^FS   date stamp
//! ^FO30,50                              barcode origin
//! ^BCN,80,N,N,N,A                       barcode, 80 dots tall
//! ^FD12345.01^FS
//! ^FO30,140^A0N,35,35^FD12345.01^FS     code restated, large
//! ^FO30,185^A0N,20,18^FDGARCIA^FS       caption (optional)
//! ^XZ                                   end of label
//! ```
//!
//! EAN-13, EAN-8 and UPC-A restate the code with its check digit, the
//! same text the preview shows under the bars.
//!
//! `^CI28` is added after `^LL` only when some field contains non-ASCII
//! text, so plain ASCII labels keep exactly the layout above.
//!
//! ## Format Leniency
//!
//! [`encode`] takes a format *name* and falls back to CODE128 when the
//! name is not in the registry. Callers that need strict validation
//! resolve the name with [`Symbology::resolve`] first and call
//! [`encode_label`].

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use super::barcode::{barcode_command, barcode_data};
use super::commands;
use crate::printer::LabelConfig;
use crate::symbology::Symbology;

/// Field positions and font sizes for a label, in dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
    /// Date stamp origin
    pub date_origin: (u16, u16),
    /// Date stamp character height and width
    pub date_font: (u16, u16),
    /// Barcode field origin
    pub barcode_origin: (u16, u16),
    /// Bar height
    pub barcode_height: u16,
    /// Gap between the bars and the restated code
    pub code_gap: u16,
    /// Restated code character height and width
    pub code_font: (u16, u16),
    /// Distance from the restated code to the caption
    pub caption_gap: u16,
    /// Caption character height and width
    pub caption_font: (u16, u16),
}

impl LabelLayout {
    /// Layout for [`LabelConfig::LABEL_52X33`].
    pub const LABEL_52X33: Self = Self {
        date_origin: (280, 10),
        date_font: (24, 24),
        barcode_origin: (30, 50),
        barcode_height: 80,
        code_gap: 10,
        code_font: (35, 35),
        caption_gap: 45,
        caption_font: (20, 18),
    };

    /// Y coordinate of the restated code.
    pub fn code_y(&self) -> u16 {
        self.barcode_origin.1 + self.barcode_height + self.code_gap
    }

    /// Y coordinate of the caption.
    pub fn caption_y(&self) -> u16 {
        self.code_y() + self.caption_gap
    }
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self::LABEL_52X33
    }
}

/// Date stamp format (`DD/MM/YYYY`).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// # Encode a Label
///
/// Builds the command stream for the default 52×33mm label, stamped with
/// today's local date. The date is sampled once per call.
///
/// Unknown format names fall back to CODE128 (see module docs).
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::encode;
///
/// let zpl = encode("CODE128", "12345.01", Some("GARCIA PEREZ"));
/// let text = String::from_utf8(zpl).unwrap();
/// assert!(text.starts_with("^XA"));
/// assert!(text.ends_with("^XZ"));
/// ```
pub fn encode(format: &str, code: &str, caption_primary: Option<&str>) -> Vec<u8> {
    let today = Local::now().date_naive();
    encode_with_date(format, code, caption_primary, today)
}

/// [`encode`] with an explicit date stamp.
///
/// Identical inputs always produce byte-identical output.
pub fn encode_with_date(
    format: &str,
    code: &str,
    caption_primary: Option<&str>,
    date: NaiveDate,
) -> Vec<u8> {
    let symbology = Symbology::resolve(format).unwrap_or_else(|_| {
        warn!(format, "unknown format, falling back to CODE128");
        Symbology::Code128
    });
    encode_label(
        symbology,
        code,
        caption_primary,
        date,
        &LabelConfig::LABEL_52X33,
        &LabelLayout::LABEL_52X33,
    )
}

/// # Encode with an Explicit Symbology and Geometry
///
/// The strictly-typed encoder behind [`encode`]. `code` is emitted as
/// given (CODE39 upper-cased); validate it with [`Symbology::validate`]
/// first if the printer must never receive an unscannable value.
pub fn encode_label(
    symbology: Symbology,
    code: &str,
    caption_primary: Option<&str>,
    date: NaiveDate,
    config: &LabelConfig,
    layout: &LabelLayout,
) -> Vec<u8> {
    let caption = caption_primary.filter(|c| !c.is_empty());
    let data = barcode_data(symbology, code);
    let restated = restated_code(symbology, &data);
    let stamp = date.format(DATE_FORMAT).to_string();

    let mut lines = vec![
        commands::start_format(),
        commands::print_width(config.width_dots),
        commands::label_length(config.height_dots),
    ];

    if !data.is_ascii() || caption.is_some_and(|c| !c.is_ascii()) {
        lines.push(commands::utf8_encoding());
    }

    // Date stamp
    lines.push(format!(
        "{}{}{}",
        commands::field_origin(layout.date_origin.0, layout.date_origin.1),
        commands::scalable_font(layout.date_font.0, layout.date_font.1),
        commands::field_data(&stamp)
    ));

    // Barcode
    lines.push(commands::field_origin(
        layout.barcode_origin.0,
        layout.barcode_origin.1,
    ));
    lines.push(barcode_command(symbology, layout.barcode_height));
    lines.push(commands::field_data(&data));

    // Code restated in a large font, as read under the preview bars
    lines.push(format!(
        "{}{}{}",
        commands::field_origin(layout.barcode_origin.0, layout.code_y()),
        commands::scalable_font(layout.code_font.0, layout.code_font.1),
        commands::field_data(&restated)
    ));

    if let Some(caption) = caption {
        lines.push(format!(
            "{}{}{}",
            commands::field_origin(layout.barcode_origin.0, layout.caption_y()),
            commands::scalable_font(layout.caption_font.0, layout.caption_font.1),
            commands::field_data(caption)
        ));
    }

    lines.push(commands::end_format());

    let stream = lines.join("\n");
    debug!(
        format = symbology.name(),
        bytes = stream.len(),
        "encoded label"
    );
    stream.into_bytes()
}

/// Text of the restated code field.
///
/// GS1 payloads with exactly their data digits gain the check digit, so
/// the printed text matches [`Symbology::human_readable`]. Anything else,
/// including unvalidated input, is restated as given.
fn restated_code(symbology: Symbology, data: &str) -> String {
    match symbology.data_digits() {
        Some(digits) if data.len() == digits && data.bytes().all(|b| b.is_ascii_digit()) => {
            symbology.human_readable(data)
        }
        _ => data.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn encode_str(format: &str, code: &str, caption: Option<&str>) -> String {
        String::from_utf8(encode_with_date(format, code, caption, date())).unwrap()
    }

    #[test]
    fn test_full_stream_with_caption() {
        let expected = "^XA\n\
                        ^PW415\n\
                        ^LL264\n\
                        ^FO280,10^A0N,24,24^FD16/10/2026^FS\n\
                        ^FO30,50\n\
                        ^BCN,80,N,N,N,A\n\
                        ^FD12345.01^FS\n\
                        ^FO30,140^A0N,35,35^FD12345.01^FS\n\
                        ^FO30,185^A0N,20,18^FDGARCIA PEREZ^FS\n\
                        ^XZ";
        assert_eq!(encode_str("CODE128", "12345.01", Some("GARCIA PEREZ")), expected);
    }

    #[test]
    fn test_stream_without_caption() {
        let zpl = encode_str("CODE128", "777", None);
        assert!(!zpl.contains("^FO30,185"));
        assert!(zpl.ends_with("^FO30,140^A0N,35,35^FD777^FS\n^XZ"));
    }

    #[test]
    fn test_empty_caption_is_absent() {
        assert_eq!(
            encode_str("CODE128", "777", Some("")),
            encode_str("CODE128", "777", None)
        );
    }

    #[test]
    fn test_deterministic() {
        let a = encode_with_date("EAN13", "123456789012", Some("X"), date());
        let b = encode_with_date("EAN13", "123456789012", Some("X"), date());
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_format_falls_back_to_code128() {
        let zpl = encode_str("PDF417", "ABC", None);
        assert!(zpl.contains("\n^BCN,80,N,N,N,A\n"));
    }

    #[test]
    fn test_symbology_prefix_used() {
        let zpl = encode_str("ean8", "9638507", None);
        assert!(zpl.contains("\n^B8N,80,N,N\n"));
    }

    #[test]
    fn test_non_ascii_caption_declares_utf8() {
        let zpl = encode_str("CODE128", "1.01", Some("GARCÍA"));
        assert!(zpl.starts_with("^XA\n^PW415\n^LL264\n^CI28\n"));
        assert!(zpl.contains("^FDGARCÍA^FS"));
    }

    #[test]
    fn test_caret_in_code_is_escaped() {
        let zpl = encode_str("CODE128", "A^B", None);
        assert!(zpl.contains("^FH_^FDA_5EB^FS"));
        assert!(!zpl.contains("^FDA^B"));
    }

    #[test]
    fn test_gs1_restated_code_carries_check_digit() {
        let zpl = encode_str("EAN13", "123456789012", None);
        assert!(zpl.contains("^FO30,50\n^BEN,80,N,N\n^FD123456789012^FS"));
        assert!(zpl.contains("^FO30,140^A0N,35,35^FD1234567890128^FS"));

        let zpl = encode_str("UPC_A", "03600029145", None);
        assert!(zpl.contains("^FD036000291452^FS"));
    }

    #[test]
    fn test_unvalidated_gs1_code_is_restated_as_given() {
        let zpl = encode_str("EAN8", "12A", None);
        assert!(zpl.contains("^FO30,140^A0N,35,35^FD12A^FS"));
    }

    #[test]
    fn test_layout_coordinates() {
        let layout = LabelLayout::default();
        assert_eq!(layout.code_y(), 140);
        assert_eq!(layout.caption_y(), 185);
    }
}
