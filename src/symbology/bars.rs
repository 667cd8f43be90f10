//! Bar pattern encoding.
//!
//! Uses the barcoders crate to turn a validated payload into modules,
//! where `true` = bar (black) and `false` = space (white). Quiet zones are
//! not included; the composer adds them.

use barcoders::sym::code39::Code39;
use barcoders::sym::code128::Code128;
use barcoders::sym::ean8::EAN8;
use barcoders::sym::ean13::EAN13;
use barcoders::sym::tf::TF;

use super::Symbology;
use crate::error::EtiquetaError;

/// Encode a payload as one module per entry.
///
/// `code` must already be normalized by [`Symbology::validate`]; the
/// barcoders error is still mapped in case its rules are stricter.
pub fn encode(symbology: Symbology, code: &str) -> Result<Vec<bool>, EtiquetaError> {
    let encoded = match symbology {
        // Code128 requires a character set prefix. Set B (Ɓ) covers every
        // printable ASCII character the registry accepts.
        Symbology::Code128 => {
            Code128::new(format!("\u{0181}{}", code)).map(|b| b.encode())
        }
        Symbology::Code39 => Code39::new(code).map(|b| b.encode()),
        Symbology::Ean13 => EAN13::new(code).map(|b| b.encode()),
        Symbology::Ean8 => EAN8::new(code).map(|b| b.encode()),
        // UPC-A is EAN-13 with a leading zero; the bar pattern is identical.
        Symbology::UpcA => EAN13::new(format!("0{}", code)).map(|b| b.encode()),
        Symbology::Itf => TF::interleaved(code).map(|b| b.encode()),
    }
    .map_err(|e| EtiquetaError::invalid_code(symbology.name(), e.to_string()))?;

    Ok(encoded.into_iter().map(|module| module == 1).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_valid(symbology: Symbology, code: &str) -> Vec<bool> {
        let normalized = symbology.validate(code).unwrap();
        encode(symbology, &normalized).unwrap()
    }

    #[test]
    fn test_code128_encoding() {
        let bars = encode_valid(Symbology::Code128, "12345.01");
        assert!(!bars.is_empty());
        // Starts with a bar, ends with the stop pattern's final bar
        assert!(bars[0]);
        assert!(*bars.last().unwrap());
    }

    #[test]
    fn test_code39_encoding() {
        let bars = encode_valid(Symbology::Code39, "HELLO-1");
        assert!(bars.iter().any(|&b| b));
    }

    #[test]
    fn test_ean13_has_95_modules() {
        let bars = encode_valid(Symbology::Ean13, "123456789012");
        assert_eq!(bars.len(), 95);
    }

    #[test]
    fn test_ean8_has_67_modules() {
        let bars = encode_valid(Symbology::Ean8, "9638507");
        assert_eq!(bars.len(), 67);
    }

    #[test]
    fn test_upca_matches_zero_prefixed_ean13() {
        let upc = encode_valid(Symbology::UpcA, "03600029145");
        let ean = encode_valid(Symbology::Ean13, "003600029145");
        assert_eq!(upc, ean);
    }

    #[test]
    fn test_itf_encoding() {
        let bars = encode_valid(Symbology::Itf, "123456");
        assert!(bars.iter().any(|&b| b));
    }
}
