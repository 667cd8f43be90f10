//! Font providers for label text.
//!
//! Text is drawn through the [`FontProvider`] trait, which has two
//! implementations:
//!
//! - [`SystemFont`](super::ttf_font::SystemFont): a TrueType file from the
//!   host's font directories, rendered with anti-aliasing
//! - [`BuiltinFont`]: the Spleen bitmap font embedded in the binary
//!
//! [`FontSource::load`] prefers the system font and falls back to the
//! builtin one, so a missing font file never fails a render.

use std::path::PathBuf;

use image::{GrayImage, Luma};
use spleen_font::{FONT_6X12, FONT_12X24, PSF2Font};
use tracing::{debug, warn};

use super::ttf_font::SystemFont;
use crate::error::EtiquetaError;

/// A font that can measure and draw a single line of text.
pub trait FontProvider: Send + Sync {
    /// Human-readable font name, for logs.
    fn name(&self) -> &str;

    /// Width and height in pixels of `text` at a nominal pixel size.
    fn measure(&self, text: &str, px: f32) -> (u32, u32);

    /// Draw `text` in black with its top-left corner at `(x, y)`.
    /// Pixels falling outside the canvas are clipped.
    fn draw(
        &self,
        canvas: &mut GrayImage,
        x: i64,
        y: i64,
        text: &str,
        px: f32,
    ) -> Result<(), EtiquetaError>;
}

/// Darken a pixel by `coverage` (0.0 = untouched, 1.0 = black).
/// Overlapping draws never lighten a pixel.
pub(crate) fn blend_black(canvas: &mut GrayImage, x: i64, y: i64, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let shade = (255.0 * (1.0 - coverage.clamp(0.0, 1.0))).round() as u8;
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    if shade < pixel.0[0] {
        *pixel = Luma([shade]);
    }
}

// ============================================================================
// BUILTIN BITMAP FONT
// ============================================================================

/// Spleen face and cell size.
#[derive(Debug, Clone, Copy)]
struct Face {
    data: &'static [u8],
    width: u32,
    height: u32,
}

const SPLEEN_6X12: Face = Face {
    data: FONT_6X12,
    width: 6,
    height: 12,
};

const SPLEEN_12X24: Face = Face {
    data: FONT_12X24,
    width: 12,
    height: 24,
};

/// The Spleen bitmap font, embedded in the binary.
///
/// Requested sizes map to the 6×12 face up to 18px and to the 12×24 face
/// above, scaled by a whole factor with nearest neighbor.
#[derive(Debug, Clone)]
pub struct BuiltinFont {
    _private: (),
}

impl BuiltinFont {
    /// Check that the embedded faces parse.
    pub fn new() -> Result<Self, EtiquetaError> {
        for face in [SPLEEN_6X12, SPLEEN_12X24] {
            PSF2Font::new(face.data).map_err(|_| {
                EtiquetaError::Render(format!(
                    "embedded Spleen {}x{} font is unreadable",
                    face.width, face.height
                ))
            })?;
        }
        Ok(Self { _private: () })
    }

    fn face_and_scale(px: f32) -> (Face, u32) {
        let face = if px <= 18.0 { SPLEEN_6X12 } else { SPLEEN_12X24 };
        let scale = (px / face.height as f32).round().max(1.0) as u32;
        (face, scale)
    }
}

impl FontProvider for BuiltinFont {
    fn name(&self) -> &str {
        "spleen"
    }

    fn measure(&self, text: &str, px: f32) -> (u32, u32) {
        let (face, scale) = Self::face_and_scale(px);
        let chars = text.chars().count() as u32;
        (chars * face.width * scale, face.height * scale)
    }

    fn draw(
        &self,
        canvas: &mut GrayImage,
        x: i64,
        y: i64,
        text: &str,
        px: f32,
    ) -> Result<(), EtiquetaError> {
        let (face, scale) = Self::face_and_scale(px);
        let mut font = PSF2Font::new(face.data)
            .map_err(|_| EtiquetaError::Render("embedded Spleen font is unreadable".into()))?;

        let cell_w = (face.width * scale) as i64;
        let scale = scale as i64;
        let mut cursor_x = x;

        for ch in text.chars() {
            let utf8 = ch.to_string();
            if let Some(glyph) = font.glyph_for_utf8(utf8.as_bytes()) {
                for (row_y, row) in glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        if !on {
                            continue;
                        }
                        for sy in 0..scale {
                            for sx in 0..scale {
                                blend_black(
                                    canvas,
                                    cursor_x + col_x as i64 * scale + sx,
                                    y + row_y as i64 * scale + sy,
                                    1.0,
                                );
                            }
                        }
                    }
                }
            } else {
                draw_box(canvas, cursor_x, y, cell_w, face.height as i64 * scale);
            }
            cursor_x += cell_w;
        }

        Ok(())
    }
}

/// Box outline for characters missing from the font.
fn draw_box(canvas: &mut GrayImage, x: i64, y: i64, w: i64, h: i64) {
    for dx in 0..w {
        blend_black(canvas, x + dx, y, 1.0);
        blend_black(canvas, x + dx, y + h - 1, 1.0);
    }
    for dy in 0..h {
        blend_black(canvas, x, y + dy, 1.0);
        blend_black(canvas, x + w - 1, y + dy, 1.0);
    }
}

// ============================================================================
// FONT SELECTION
// ============================================================================

/// Where to look for the preferred system font.
#[derive(Debug, Clone)]
pub struct FontSource {
    /// File name (e.g. `arial.ttf`) or a path to a font file
    pub name: String,
    /// Directories searched recursively for `name`
    pub search_dirs: Vec<PathBuf>,
}

impl FontSource {
    /// Look for `name` in the usual OS font directories.
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            search_dirs: default_font_dirs(),
        }
    }

    /// # Load with Fallback
    ///
    /// Returns the system font if it can be found and parsed, otherwise
    /// the builtin bitmap font. Only an unreadable builtin font is an
    /// error.
    pub fn load(&self) -> Result<Box<dyn FontProvider>, EtiquetaError> {
        match SystemFont::find(&self.name, &self.search_dirs) {
            Ok(font) => {
                debug!(font = font.name(), "using system font");
                Ok(Box::new(font))
            }
            Err(e) => {
                warn!(font = %self.name, error = %e, "system font unavailable, using builtin");
                Ok(Box::new(BuiltinFont::new()?))
            }
        }
    }
}

/// Font directories for the current platform. Missing directories are
/// skipped during the search.
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if cfg!(windows) {
        let windir = std::env::var("WINDIR").unwrap_or_else(|_| "C:\\Windows".to_string());
        dirs.push(PathBuf::from(windir).join("Fonts"));
    } else if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join("Library/Fonts"));
    }

    dirs
}
