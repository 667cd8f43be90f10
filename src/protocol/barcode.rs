//! # ZPL Barcode Field Commands
//!
//! Each symbology has its own ZPL command with its own parameter order.
//! All fields are emitted in normal orientation without the printer's
//! interpretation line, since the label restates the code in a larger
//! font.
//!
//! | Symbology | Command | Parameters |
//! |-----------|---------|------------|
//! | CODE128 | `^BC` | o, h, f, g, e, m |
//! | CODE39 | `^B3` | o, e, h, f, g |
//! | EAN13 | `^BE` | o, h, f, g |
//! | EAN8 | `^B8` | o, h, f, g |
//! | UPC_A | `^BU` | o, h, f, g, e |
//! | ITF | `^B2` | o, h, f, g, e |

use crate::symbology::Symbology;

/// # Barcode Field Command
///
/// Builds the barcode command line for `symbology` with a bar height in
/// dots. The field data follows on its own `^FD` line.
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::barcode::barcode_command;
/// use etiqueta::symbology::Symbology;
///
/// assert_eq!(barcode_command(Symbology::Code128, 80), "^BCN,80,N,N,N,A");
/// assert_eq!(barcode_command(Symbology::Code39, 80), "^B3N,N,80,N,N");
/// ```
pub fn barcode_command(symbology: Symbology, height: u16) -> String {
    let prefix = symbology.zpl_prefix();
    match symbology {
        // Automatic subset switching
        Symbology::Code128 => format!("{}N,{},N,N,N,A", prefix, height),
        // No mod-43 check digit
        Symbology::Code39 => format!("{}N,N,{},N,N", prefix, height),
        Symbology::Ean13 | Symbology::Ean8 => format!("{}N,{},N,N", prefix, height),
        // Print the check digit
        Symbology::UpcA => format!("{}N,{},N,N,Y", prefix, height),
        Symbology::Itf => format!("{}N,{},N,N,N", prefix, height),
    }
}

/// Barcode field data as the printer should receive it.
///
/// CODE39 is upper-cased, matching the preview. Everything else passes
/// through unchanged; the printer computes GS1 check digits itself.
pub fn barcode_data(symbology: Symbology, code: &str) -> String {
    match symbology {
        Symbology::Code39 => code.to_ascii_uppercase(),
        _ => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_command_uses_registry_prefix() {
        for symbology in Symbology::ALL {
            let cmd = barcode_command(symbology, 80);
            assert!(cmd.starts_with(symbology.zpl_prefix()), "{cmd}");
            assert!(cmd.contains(",80,") || cmd.contains("N,80"), "{cmd}");
        }
    }

    #[test]
    fn test_specific_parameter_orders() {
        assert_eq!(barcode_command(Symbology::Ean13, 80), "^BEN,80,N,N");
        assert_eq!(barcode_command(Symbology::UpcA, 100), "^BUN,100,N,N,Y");
        assert_eq!(barcode_command(Symbology::Itf, 60), "^B2N,60,N,N,N");
    }

    #[test]
    fn test_code39_data_uppercased() {
        assert_eq!(barcode_data(Symbology::Code39, "abc"), "ABC");
        assert_eq!(barcode_data(Symbology::Code128, "abc"), "abc");
    }
}
