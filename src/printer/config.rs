//! # Label Configuration
//!
//! This module defines the physical label stock the command encoder lays
//! out against.
//!
//! ## Supported Labels
//!
//! | Label | Size | Resolution | Canvas (dots) |
//! |-------|------|------------|---------------|
//! | 52×33 | 52mm × 33mm | 203 DPI | 415 × 264 |
//!
//! ## Usage
//!
//! ```
//! use etiqueta::printer::LabelConfig;
//!
//! let config = LabelConfig::LABEL_52X33;
//! println!("Canvas: {} x {} dots", config.width_dots, config.height_dots);
//! ```

/// # Label Configuration
///
/// Describes one label size as the printer sees it.
///
/// ## Physical Properties
///
/// - **width_mm / height_mm**: Die-cut label size
/// - **dpi**: Print head resolution in dots per inch
/// - **width_dots / height_dots**: Values sent as `^PW` / `^LL`
///
/// ## Calculations
///
/// ```text
/// dots_per_mm = dpi / 25.4
///
/// For 52×33 at 203 DPI:
///   dots_per_mm = 203 / 25.4 ≈ 8
///   52mm → 415 dots, 33mm → 264 dots
/// ```
///
/// The dot counts are stored rather than derived so the emitted page size
/// never drifts with rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelConfig {
    /// Label stock name
    pub name: &'static str,

    /// Label width in millimeters
    pub width_mm: f32,

    /// Label height in millimeters
    pub height_mm: f32,

    /// Resolution in dots per inch
    pub dpi: u16,

    /// Page width in dots (`^PW`)
    pub width_dots: u16,

    /// Label length in dots (`^LL`)
    pub height_dots: u16,
}

impl LabelConfig {
    /// # 52mm × 33mm Label at 203 DPI
    ///
    /// The default label stock. The command encoder's field coordinates
    /// are laid out for this canvas.
    ///
    /// ```text
    /// ┌──────────────────────── 415 dots ────────────────────────┐
    /// │                                         DD/MM/YYYY       │
    /// │   ║│║║│║│║║│║║│║  barcode (80 dots)                      │ 264
    /// │   12345.01                                               │ dots
    /// │   NAME                                                   │
    /// └──────────────────────────────────────────────────────────┘
    /// ```
    pub const LABEL_52X33: Self = Self {
        name: "52x33mm",
        width_mm: 52.0,
        height_mm: 33.0,
        dpi: 203,
        width_dots: 415,
        height_dots: 264,
    };

    /// Calculate dots per millimeter
    ///
    /// ## Example
    ///
    /// ```
    /// use etiqueta::printer::LabelConfig;
    ///
    /// let config = LabelConfig::LABEL_52X33;
    /// assert!((config.dots_per_mm() - 8.0).abs() < 0.1);
    /// ```
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Convert millimeters to dots
    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u16 {
        (mm * self.dots_per_mm()).round() as u16
    }

    /// Convert dots to millimeters
    #[inline]
    pub fn dots_to_mm(&self, dots: u16) -> f32 {
        dots as f32 / self.dots_per_mm()
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self::LABEL_52X33
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_52x33_canvas() {
        let config = LabelConfig::LABEL_52X33;
        assert_eq!(config.width_dots, 415);
        assert_eq!(config.height_dots, 264);
        assert_eq!(config.dpi, 203);
    }

    #[test]
    fn test_stored_dots_match_physical_size() {
        let config = LabelConfig::LABEL_52X33;
        assert!((config.mm_to_dots(config.width_mm) as i32 - config.width_dots as i32).abs() <= 1);
        assert!((config.mm_to_dots(config.height_mm) as i32 - config.height_dots as i32).abs() <= 1);
    }

    #[test]
    fn test_dots_to_mm() {
        let config = LabelConfig::LABEL_52X33;
        // 80 dots ≈ 10mm
        let mm = config.dots_to_mm(80);
        assert!((mm - 10.0).abs() < 0.5);
    }

    #[test]
    fn test_default_is_52x33() {
        assert_eq!(LabelConfig::default(), LabelConfig::LABEL_52X33);
    }
}
