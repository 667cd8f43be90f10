//! # ZPL Format Commands
//!
//! This module implements the label-format commands used by the encoder.
//!
//! ## Command Structure
//!
//! ZPL is a plain-text language. Every command starts with the caret
//! (`^`) prefix followed by a two-letter mnemonic and comma-separated
//! parameters:
//!
//! ```text
//! ^XA                     start of label format
//! ^FO30,50                field origin (x, y in dots)
//! ^A0N,35,35              scalable font, normal orientation, height, width
//! ^FD12345.01^FS          field data, field separator
//! ^XZ                     end of label format
//! ```
//!
//! ## Field Data Escaping
//!
//! Field data runs until the next `^FS`, so a literal `^` or `~` in the
//! payload would be parsed as a command. Such data is written with
//! `^FH_` and every unsafe byte becomes `_XX` (hex).

// ============================================================================
// FORMAT DELIMITERS
// ============================================================================

/// # Start Format (^XA)
///
/// Opens a label format. Everything up to `^XZ` describes one label.
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::commands;
///
/// assert_eq!(commands::start_format(), "^XA");
/// ```
#[inline]
pub fn start_format() -> String {
    "^XA".to_string()
}

/// # End Format (^XZ)
///
/// Closes the label format and prints one label.
#[inline]
pub fn end_format() -> String {
    "^XZ".to_string()
}

// ============================================================================
// PAGE SETUP
// ============================================================================

/// # Print Width (^PW)
///
/// Sets the printable width in dots.
#[inline]
pub fn print_width(dots: u16) -> String {
    format!("^PW{}", dots)
}

/// # Label Length (^LL)
///
/// Sets the label length in dots.
#[inline]
pub fn label_length(dots: u16) -> String {
    format!("^LL{}", dots)
}

/// # Change International Encoding to UTF-8 (^CI28)
///
/// Required before field data containing non-ASCII characters (accented
/// names, for instance).
#[inline]
pub fn utf8_encoding() -> String {
    "^CI28".to_string()
}

// ============================================================================
// FIELDS
// ============================================================================

/// # Field Origin (^FO)
///
/// Positions the upper-left corner of the next field, in dots from the
/// label's home position.
#[inline]
pub fn field_origin(x: u16, y: u16) -> String {
    format!("^FO{},{}", x, y)
}

/// # Scalable Font (^A0)
///
/// Selects font 0 in normal orientation with the given character height
/// and width in dots.
#[inline]
pub fn scalable_font(height: u16, width: u16) -> String {
    format!("^A0N,{},{}", height, width)
}

/// # Field Data (^FD ... ^FS)
///
/// Emits `data` as field data, followed by the field separator. Data that
/// could be misread as commands is hex-escaped behind `^FH_`.
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::commands::field_data;
///
/// assert_eq!(field_data("12345.01"), "^FD12345.01^FS");
/// assert_eq!(field_data("A^B"), "^FH_^FDA_5EB^FS");
/// ```
pub fn field_data(data: &str) -> String {
    if needs_hex_escape(data) {
        format!("^FH_^FD{}^FS", hex_escape(data))
    } else {
        format!("^FD{}^FS", data)
    }
}

/// Whether field data contains a caret, tilde or control character.
pub fn needs_hex_escape(data: &str) -> bool {
    data.chars().any(|c| c == '^' || c == '~' || c.is_ascii_control())
}

/// Hex-escape command characters, the `_` indicator itself and control
/// characters. Other characters (including non-ASCII) pass through.
fn hex_escape(data: &str) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for c in data.chars() {
        if c == '^' || c == '~' || c == '_' || c.is_ascii_control() {
            out.push_str(&format!("_{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}
