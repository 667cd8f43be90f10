//! # Label Composer
//!
//! Renders a label preview: the barcode raster plus optional caption
//! lines, composited into one grayscale bitmap. The preview is for on-screen
//! confirmation only; the printer receives the command stream from
//! [`crate::protocol`].
//!
//! ## Layout
//!
//! ```text
//! ┌───────────────────────────┐
//! │  ║│║║│║│║║│║║│║║│║│║║│║   │  barcode raster (pasted at 0,0)
//! │         12345.01          │
//! ├───────────────────────────┤  +5px
//! │   Nombre: GARCIA PEREZ    │  +30px when a primary caption is set
//! │        Grau: 3            │  +25px when a secondary caption is set
//! └───────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use etiqueta::preview::{ComposerConfig, LabelComposer};
//!
//! let composer = LabelComposer::new(ComposerConfig::default())?;
//! let label = composer.compose("CODE128", "12345.01", Some("GARCIA PEREZ"), Some("3"))?;
//! std::fs::write("label.png", label.to_png()?)?;
//!
//! # Ok::<(), etiqueta::EtiquetaError>(())
//! ```

pub mod barcode;
pub mod font;
pub mod ttf_font;

use std::path::Path;

use image::{GrayImage, Luma};
use tracing::debug;

use crate::error::EtiquetaError;
use crate::request::LabelRequest;
use crate::symbology::Symbology;

pub use barcode::{BarcodeGeometry, render_barcode};
pub use font::{BuiltinFont, FontProvider, FontSource};
pub use ttf_font::SystemFont;

/// Extra canvas height for a primary caption.
pub const PRIMARY_CAPTION_SPACE: u32 = 30;

/// Extra canvas height for a secondary caption.
pub const SECONDARY_CAPTION_SPACE: u32 = 25;

/// Gap between the barcode raster and the first caption.
pub const CAPTION_GAP: u32 = 5;

/// Distance from the primary caption to the secondary caption.
pub const CAPTION_LINE_STEP: u32 = 25;

/// Composer settings.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Preferred system font, by file name
    pub font_name: String,
    /// Primary caption size in pixels
    pub primary_px: f32,
    /// Secondary caption size in pixels
    pub secondary_px: f32,
    /// Text before the primary caption
    pub primary_label: String,
    /// Text before the secondary caption
    pub secondary_label: String,
    /// Barcode raster geometry
    pub geometry: BarcodeGeometry,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            font_name: "arial.ttf".to_string(),
            primary_px: 14.0,
            secondary_px: 12.0,
            primary_label: "Nombre".to_string(),
            secondary_label: "Grau".to_string(),
            geometry: BarcodeGeometry::default(),
        }
    }
}

/// A composed label bitmap.
#[derive(Debug, Clone)]
pub struct RenderedLabel {
    pub bitmap: GrayImage,
}

impl RenderedLabel {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// Convert the bitmap to PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>, EtiquetaError> {
        use image::ImageEncoder;

        let mut png_bytes = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(
                self.bitmap.as_raw(),
                self.width(),
                self.height(),
                image::ExtendedColorType::L8,
            )
            .map_err(|e: image::ImageError| EtiquetaError::Image(e.to_string()))?;

        Ok(png_bytes)
    }

    /// Save as a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<(), EtiquetaError> {
        std::fs::write(path, self.to_png()?)?;
        Ok(())
    }
}

/// Composes preview bitmaps.
pub struct LabelComposer {
    config: ComposerConfig,
    font: Box<dyn FontProvider>,
}

impl LabelComposer {
    /// Create a composer, loading the configured system font or falling
    /// back to the builtin font.
    pub fn new(config: ComposerConfig) -> Result<Self, EtiquetaError> {
        let font = FontSource::system(config.font_name.clone()).load()?;
        Ok(Self { config, font })
    }

    /// Create a composer with an explicit font.
    pub fn with_font(config: ComposerConfig, font: Box<dyn FontProvider>) -> Self {
        Self { config, font }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Name of the font in use.
    pub fn font_name(&self) -> &str {
        self.font.name()
    }

    /// # Compose a Label
    ///
    /// Resolves `format`, validates `code`, renders the barcode and adds
    /// the captions. Empty captions count as absent.
    ///
    /// ## Errors
    ///
    /// - [`EtiquetaError::UnsupportedFormat`] for an unknown format name
    /// - [`EtiquetaError::InvalidCodeValue`] when `code` breaks the
    ///   symbology's rule (checked before any encoding)
    /// - [`EtiquetaError::Render`] if rasterization fails
    pub fn compose(
        &self,
        format: &str,
        code: &str,
        caption_primary: Option<&str>,
        caption_secondary: Option<&str>,
    ) -> Result<RenderedLabel, EtiquetaError> {
        let symbology = Symbology::resolve(format)?;
        self.compose_symbology(symbology, code, caption_primary, caption_secondary)
    }

    /// Compose the preview for a request.
    pub fn compose_request(&self, request: &LabelRequest) -> Result<RenderedLabel, EtiquetaError> {
        self.compose_symbology(
            request.format(),
            request.code(),
            request.caption_primary(),
            request.caption_secondary(),
        )
    }

    /// [`compose`](Self::compose) with an already-resolved symbology.
    pub fn compose_symbology(
        &self,
        symbology: Symbology,
        code: &str,
        caption_primary: Option<&str>,
        caption_secondary: Option<&str>,
    ) -> Result<RenderedLabel, EtiquetaError> {
        let normalized = symbology.validate(code)?;
        let bare = render_barcode(
            symbology,
            &normalized,
            &self.config.geometry,
            self.font.as_ref(),
        )?;

        let primary = caption_primary.filter(|c| !c.is_empty());
        let secondary = caption_secondary.filter(|c| !c.is_empty());

        if primary.is_none() && secondary.is_none() {
            return Ok(RenderedLabel { bitmap: bare });
        }

        let (width, height) = bare.dimensions();
        let mut extra = 0;
        if primary.is_some() {
            extra += PRIMARY_CAPTION_SPACE;
        }
        if secondary.is_some() {
            extra += SECONDARY_CAPTION_SPACE;
        }

        let mut canvas = GrayImage::from_pixel(width, height + extra, Luma([255]));
        image::imageops::replace(&mut canvas, &bare, 0, 0);

        let mut y = (height + CAPTION_GAP) as i64;

        if let Some(text) = primary {
            let line = format!("{}: {}", self.config.primary_label, text);
            self.draw_centered(&mut canvas, &line, y, self.config.primary_px)?;
            y += CAPTION_LINE_STEP as i64;
        }

        if let Some(text) = secondary {
            let line = format!("{}: {}", self.config.secondary_label, text);
            self.draw_centered(&mut canvas, &line, y, self.config.secondary_px)?;
        }

        debug!(
            format = symbology.name(),
            width,
            height = height + extra,
            "composed label"
        );
        Ok(RenderedLabel { bitmap: canvas })
    }

    fn draw_centered(
        &self,
        canvas: &mut GrayImage,
        text: &str,
        y: i64,
        px: f32,
    ) -> Result<(), EtiquetaError> {
        let (text_w, _) = self.font.measure(text, px);
        let x = (canvas.width() as i64 - text_w as i64) / 2;
        self.font.draw(canvas, x, y, text, px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> LabelComposer {
        LabelComposer::with_font(
            ComposerConfig::default(),
            Box::new(BuiltinFont::new().unwrap()),
        )
    }

    fn has_black_in_rows(img: &GrayImage, rows: std::ops::Range<u32>) -> bool {
        rows.flat_map(|y| (0..img.width()).map(move |x| (x, y)))
            .any(|(x, y)| img.get_pixel(x, y).0[0] < 128)
    }

    #[test]
    fn test_bare_barcode_without_captions() {
        let composer = composer();
        let label = composer.compose("CODE128", "12345.01", None, None).unwrap();
        let bare = render_barcode(
            Symbology::Code128,
            "12345.01",
            &BarcodeGeometry::default(),
            composer.font.as_ref(),
        )
        .unwrap();
        assert_eq!(label.bitmap, bare);
    }

    #[test]
    fn test_caption_space_is_additive() {
        let composer = composer();
        let bare = composer.compose("CODE128", "1.01", None, None).unwrap();
        let primary = composer.compose("CODE128", "1.01", Some("ANA"), None).unwrap();
        let secondary = composer.compose("CODE128", "1.01", None, Some("3")).unwrap();
        let both = composer
            .compose("CODE128", "1.01", Some("ANA"), Some("3"))
            .unwrap();

        assert_eq!(primary.height(), bare.height() + 30);
        assert_eq!(secondary.height(), bare.height() + 25);
        assert_eq!(both.height(), bare.height() + 55);
        assert_eq!(both.width(), bare.width());
    }

    #[test]
    fn test_barcode_pasted_at_origin() {
        let composer = composer();
        let bare = composer.compose("EAN8", "9638507", None, None).unwrap();
        let both = composer
            .compose("EAN8", "9638507", Some("X"), Some("Y"))
            .unwrap();
        for y in 0..bare.height() {
            for x in 0..bare.width() {
                assert_eq!(both.bitmap.get_pixel(x, y), bare.bitmap.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_captions_are_drawn_below_barcode() {
        let composer = composer();
        let bare = composer.compose("CODE128", "1.01", None, None).unwrap();
        let both = composer
            .compose("CODE128", "1.01", Some("ANA"), Some("3"))
            .unwrap();
        let h = bare.height();
        assert!(has_black_in_rows(&both.bitmap, h + 5..h + 30));
        assert!(has_black_in_rows(&both.bitmap, h + 30..h + 55));
    }

    #[test]
    fn test_empty_caption_is_absent() {
        let composer = composer();
        let bare = composer.compose("CODE128", "1.01", None, None).unwrap();
        let empty = composer.compose("CODE128", "1.01", Some(""), Some("")).unwrap();
        assert_eq!(bare.height(), empty.height());
    }

    #[test]
    fn test_invalid_code_rejected_before_encoding() {
        let composer = composer();
        let err = composer.compose("EAN13", "123", None, None).unwrap_err();
        assert!(matches!(err, EtiquetaError::InvalidCodeValue { format: "EAN13", .. }));
        assert!(composer.compose("EAN13", "123456789012", None, None).is_ok());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = composer().compose("QR", "1", None, None).unwrap_err();
        assert!(matches!(err, EtiquetaError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_png_encoding() {
        let label = composer().compose("ITF", "1234", None, None).unwrap();
        let png = label.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
