//! # Symbology Registry
//!
//! Maps a format name to a 1-D barcode encoding and to the ZPL command
//! prefix that prints the same symbology on the device.
//!
//! ## Supported Symbologies
//!
//! | Name | Data | ZPL |
//! |------|------|-----|
//! | CODE128 | printable ASCII, any length | `^BC` |
//! | CODE39 | `0-9 A-Z space - . $ / + %` | `^B3` |
//! | EAN13 | 12 digits (+ check digit) | `^BE` |
//! | EAN8 | 7 digits (+ check digit) | `^B8` |
//! | UPC_A | 11 digits (+ check digit) | `^BU` |
//! | ITF | even number of digits | `^B2` |
//!
//! ## Usage
//!
//! ```
//! use etiqueta::symbology::Symbology;
//!
//! let ean = Symbology::resolve("ean13")?;
//! let code = ean.validate("123456789012")?;
//! assert_eq!(ean.human_readable(&code), "1234567890128");
//! assert_eq!(ean.zpl_prefix(), "^BE");
//!
//! # Ok::<(), etiqueta::EtiquetaError>(())
//! ```

pub mod bars;

use std::fmt;

use crate::error::EtiquetaError;

/// Format names in selector order.
const SUPPORTED: &[&str] = &["CODE128", "CODE39", "EAN13", "EAN8", "UPC_A", "ITF"];

/// Characters accepted by Code 39 (after upper-casing).
const CODE39_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ -.$/+%";

/// A 1-D barcode standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Symbology {
    #[default]
    Code128,
    Code39,
    Ean13,
    Ean8,
    UpcA,
    Itf,
}

impl Symbology {
    /// All symbologies, in the same order as [`Symbology::list_supported`].
    pub const ALL: [Symbology; 6] = [
        Symbology::Code128,
        Symbology::Code39,
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::Itf,
    ];

    /// Look up a symbology by format name (case-insensitive).
    ///
    /// `UPCA` is accepted as an alias of `UPC_A`.
    pub fn resolve(name: &str) -> Result<Self, EtiquetaError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CODE128" => Ok(Self::Code128),
            "CODE39" => Ok(Self::Code39),
            "EAN13" => Ok(Self::Ean13),
            "EAN8" => Ok(Self::Ean8),
            "UPC_A" | "UPCA" => Ok(Self::UpcA),
            "ITF" => Ok(Self::Itf),
            _ => Err(EtiquetaError::UnsupportedFormat(name.to_string())),
        }
    }

    /// Format names for populating selectors. The order is stable.
    pub fn list_supported() -> &'static [&'static str] {
        SUPPORTED
    }

    /// Canonical format name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Code128 => "CODE128",
            Self::Code39 => "CODE39",
            Self::Ean13 => "EAN13",
            Self::Ean8 => "EAN8",
            Self::UpcA => "UPC_A",
            Self::Itf => "ITF",
        }
    }

    /// ZPL barcode command for this symbology.
    pub fn zpl_prefix(self) -> &'static str {
        match self {
            Self::Code128 => "^BC",
            Self::Code39 => "^B3",
            Self::Ean13 => "^BE",
            Self::Ean8 => "^B8",
            Self::UpcA => "^BU",
            Self::Itf => "^B2",
        }
    }

    /// Number of data digits for GS1 codes (check digit excluded).
    pub(crate) fn data_digits(self) -> Option<usize> {
        match self {
            Self::Ean13 => Some(12),
            Self::Ean8 => Some(7),
            Self::UpcA => Some(11),
            _ => None,
        }
    }

    /// # Validate a Payload
    ///
    /// Checks `code` against this symbology's length and charset rule and
    /// returns the normalized payload that the encoders consume.
    ///
    /// ## Normalization
    ///
    /// - CODE39 is upper-cased before the charset check
    /// - EAN13/EAN8/UPC_A drop a supplied check digit once it is verified
    ///
    /// ## Errors
    ///
    /// [`EtiquetaError::InvalidCodeValue`] naming the violated rule.
    pub fn validate(self, code: &str) -> Result<String, EtiquetaError> {
        let name = self.name();
        if code.is_empty() {
            return Err(EtiquetaError::invalid_code(name, "code value is empty"));
        }

        match self {
            Self::Code128 => {
                if let Some(bad) = code.chars().find(|c| !(' '..='~').contains(c)) {
                    return Err(EtiquetaError::invalid_code(
                        name,
                        format!("character {bad:?} is not printable ASCII"),
                    ));
                }
                Ok(code.to_string())
            }
            Self::Code39 => {
                let upper = code.to_ascii_uppercase();
                if let Some(bad) = upper.chars().find(|c| !CODE39_CHARSET.contains(*c)) {
                    return Err(EtiquetaError::invalid_code(
                        name,
                        format!("character {bad:?} is outside 0-9 A-Z space - . $ / + %"),
                    ));
                }
                Ok(upper)
            }
            Self::Itf => {
                require_digits(name, code)?;
                if code.len() % 2 != 0 {
                    return Err(EtiquetaError::invalid_code(
                        name,
                        format!("needs an even number of digits, got {}", code.len()),
                    ));
                }
                Ok(code.to_string())
            }
            Self::Ean13 | Self::Ean8 | Self::UpcA => {
                require_digits(name, code)?;
                let digits = self.data_digits().unwrap_or_default();
                if code.len() == digits {
                    return Ok(code.to_string());
                }
                if code.len() == digits + 1 {
                    let (data, check) = code.split_at(digits);
                    let expected = check_digit(data);
                    if check.as_bytes()[0] - b'0' != expected {
                        return Err(EtiquetaError::invalid_code(
                            name,
                            format!("check digit {check} does not match computed {expected}"),
                        ));
                    }
                    return Ok(data.to_string());
                }
                Err(EtiquetaError::invalid_code(
                    name,
                    format!(
                        "needs {} digits (or {} with check digit), got {}",
                        digits,
                        digits + 1,
                        code.len()
                    ),
                ))
            }
        }
    }

    /// Human-readable text printed under the bars for a normalized payload.
    ///
    /// GS1 codes show the complete number including the check digit.
    pub fn human_readable(self, normalized: &str) -> String {
        match self {
            Self::Ean13 | Self::Ean8 | Self::UpcA => {
                format!("{}{}", normalized, check_digit(normalized))
            }
            _ => normalized.to_string(),
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn require_digits(name: &'static str, code: &str) -> Result<(), EtiquetaError> {
    match code.chars().find(|c| !c.is_ascii_digit()) {
        Some(bad) => Err(EtiquetaError::invalid_code(
            name,
            format!("character {bad:?} is not a digit"),
        )),
        None => Ok(()),
    }
}

/// GS1 mod-10 check digit.
///
/// Weights alternate 3,1 starting from the rightmost data digit, which
/// makes the same routine valid for EAN-13, EAN-8 and UPC-A.
///
/// ```
/// use etiqueta::symbology::check_digit;
///
/// assert_eq!(check_digit("400638133393"), 1);
/// assert_eq!(check_digit("9638507"), 4);
/// ```
pub fn check_digit(data: &str) -> u8 {
    let sum: u32 = data
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = (b - b'0') as u32;
            if i % 2 == 0 { d * 3 } else { d }
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}
