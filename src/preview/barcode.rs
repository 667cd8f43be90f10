//! Barcode rasterization for previews.
//!
//! Draws the bar pattern at a physical module geometry with quiet zones,
//! then burns the human-readable text beneath the bars.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ quiet ║│║║│║│║║│║║│║║│║│║║│║║│║│ quiet │  module height
//! │                                         │  text distance
//! │              12345.01                   │  HRI text
//! └─────────────────────────────────────────┘
//! ```

use image::{GrayImage, Luma};

use super::font::FontProvider;
use crate::error::EtiquetaError;
use crate::symbology::{Symbology, bars};

/// Physical barcode geometry, in millimeters at a raster resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarcodeGeometry {
    /// Bar width setting; the module width is `width / 10` mm
    pub width: f32,
    /// Bar height in millimeters
    pub module_height_mm: f32,
    /// Blank margin left and right of the bars
    pub quiet_zone_mm: f32,
    /// Margin above the bars and below the text
    pub margin_mm: f32,
    /// Human-readable text size in points
    pub font_size_pt: f32,
    /// Gap between the bars and the human-readable text
    pub text_distance_mm: f32,
    /// Raster resolution
    pub dpi: f32,
}

impl Default for BarcodeGeometry {
    fn default() -> Self {
        Self {
            width: 2.0,
            module_height_mm: 15.0,
            quiet_zone_mm: 6.5,
            margin_mm: 1.0,
            font_size_pt: 10.0,
            text_distance_mm: 5.0,
            dpi: 300.0,
        }
    }
}

impl BarcodeGeometry {
    /// Module (narrowest bar) width in millimeters.
    pub fn module_width_mm(&self) -> f32 {
        self.width / 10.0
    }

    /// Convert millimeters to whole pixels at this resolution.
    pub fn mm_to_px(&self, mm: f32) -> u32 {
        (mm * self.dpi / 25.4).round().max(0.0) as u32
    }

    /// Module width in pixels (at least one).
    pub fn module_px(&self) -> u32 {
        self.mm_to_px(self.module_width_mm()).max(1)
    }

    /// Human-readable text size in pixels.
    pub fn font_px(&self) -> f32 {
        self.font_size_pt * self.dpi / 72.0
    }
}

/// # Render a Bare Barcode
///
/// `code` must be normalized by [`Symbology::validate`]. Returns a white
/// grayscale raster with black bars and the symbology's human-readable
/// text.
pub fn render_barcode(
    symbology: Symbology,
    code: &str,
    geometry: &BarcodeGeometry,
    font: &dyn FontProvider,
) -> Result<GrayImage, EtiquetaError> {
    let modules = bars::encode(symbology, code)?;
    if modules.is_empty() {
        return Err(EtiquetaError::Render(format!(
            "{} produced no bars for {:?}",
            symbology, code
        )));
    }

    let module_px = geometry.module_px();
    let quiet_px = geometry.mm_to_px(geometry.quiet_zone_mm);
    let margin_px = geometry.mm_to_px(geometry.margin_mm);
    let bar_height = geometry.mm_to_px(geometry.module_height_mm).max(1);
    let text_gap = geometry.mm_to_px(geometry.text_distance_mm);

    let text = symbology.human_readable(code);
    let font_px = geometry.font_px();
    let (text_w, text_h) = font.measure(&text, font_px);

    let bars_width = modules.len() as u32 * module_px;
    let width = (bars_width + 2 * quiet_px).max(text_w);
    let height = margin_px + bar_height + text_gap + text_h + margin_px;

    let mut img = GrayImage::from_pixel(width, height, Luma([255]));

    let start_x = (width - bars_width) / 2;
    for (i, _) in modules.iter().enumerate().filter(|(_, bar)| **bar) {
        let x0 = start_x + i as u32 * module_px;
        for x in x0..x0 + module_px {
            for y in margin_px..margin_px + bar_height {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }

    let text_x = (width as i64 - text_w as i64) / 2;
    let text_y = (margin_px + bar_height + text_gap) as i64;
    font.draw(&mut img, text_x, text_y, &text, font_px)?;

    Ok(img)
}
