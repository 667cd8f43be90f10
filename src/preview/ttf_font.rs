//! TTF font rendering for system fonts (Arial and friends).
//!
//! Renders anti-aliased text straight onto the label canvas using
//! ab_glyph. Fonts are located by file name in the OS font directories.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, ScaleFont};
use image::GrayImage;

use super::font::{FontProvider, blend_black};
use crate::error::EtiquetaError;

/// How deep to descend into font directories (`/usr/share/fonts/truetype/msttcorefonts/...`).
const MAX_SEARCH_DEPTH: usize = 4;

/// A TrueType/OpenType font loaded from disk.
pub struct SystemFont {
    name: String,
    font: FontVec,
}

impl SystemFont {
    /// Parse font bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, EtiquetaError> {
        let name = name.into();
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| EtiquetaError::Render(format!("{}: {}", name, e)))?;
        Ok(Self { name, font })
    }

    /// Load a font file.
    pub fn open(path: &Path) -> Result<Self, EtiquetaError> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, bytes)
    }

    /// # Find a Font by Name
    ///
    /// `name` is either a path to an existing file or a file name that is
    /// matched case-insensitively (so `arial.ttf` finds `Arial.ttf`)
    /// while searching `dirs` recursively.
    ///
    /// ## Errors
    ///
    /// [`EtiquetaError::Render`] if no file matches or the match does not
    /// parse as a font.
    pub fn find(name: &str, dirs: &[PathBuf]) -> Result<Self, EtiquetaError> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Self::open(direct);
        }

        let wanted = name.to_lowercase();
        dirs.iter()
            .find_map(|dir| search_dir(dir, &wanted, MAX_SEARCH_DEPTH))
            .ok_or_else(|| EtiquetaError::Render(format!("font '{}' not found", name)))
            .and_then(|path| Self::open(&path))
    }
}

fn search_dir(dir: &Path, wanted: &str, depth: usize) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry.file_name().to_string_lossy().to_lowercase() == wanted {
            return Some(path);
        }
    }

    if depth == 0 {
        return None;
    }
    subdirs
        .iter()
        .find_map(|sub| search_dir(sub, wanted, depth - 1))
}

impl FontProvider for SystemFont {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, text: &str, px: f32) -> (u32, u32) {
        let scaled = self.font.as_scaled(px);
        let width: f32 = text
            .chars()
            .map(|ch| scaled.h_advance(self.font.glyph_id(ch)))
            .sum();
        let height = scaled.ascent() - scaled.descent();
        (width.ceil() as u32, height.ceil().max(1.0) as u32)
    }

    fn draw(
        &self,
        canvas: &mut GrayImage,
        x: i64,
        y: i64,
        text: &str,
        px: f32,
    ) -> Result<(), EtiquetaError> {
        let scaled = self.font.as_scaled(px);
        let baseline_y = y as f32 + scaled.ascent();
        let mut caret_x = x as f32;

        for ch in text.chars() {
            let glyph_id = self.font.glyph_id(ch);
            let glyph =
                glyph_id.with_scale_and_position(px, ab_glyph::point(caret_x, baseline_y));
            caret_x += scaled.h_advance(glyph_id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    blend_black(
                        canvas,
                        gx as i64 + bounds.min.x as i64,
                        gy as i64 + bounds.min.y as i64,
                        coverage,
                    );
                });
            }
        }

        Ok(())
    }
}
