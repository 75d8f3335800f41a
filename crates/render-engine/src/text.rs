//! Text layers: font lookup, color parsing, and glyph rendering.

use std::collections::HashSet;
use std::sync::Mutex;

use ab_glyph::{Font, FontArc, PxScale};
use canvasreel_common::FontConfig;
use canvasreel_processing_core::ResolvedText;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

struct Face {
    family: String,
    bold: bool,
    italic: bool,
    font: FontArc,
}

/// Fonts available to text layers, keyed by family and style.
#[derive(Default)]
pub struct FontBook {
    faces: Vec<Face>,
    fallback_family: Option<String>,
    warned: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families())
            .field("fallback_family", &self.fallback_family)
            .finish()
    }
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured face. Unreadable or invalid files are logged
    /// and skipped.
    pub fn load(config: &FontConfig) -> Self {
        let mut book = Self {
            fallback_family: config.fallback_family.clone(),
            ..Self::default()
        };

        for face in &config.faces {
            let bytes = match std::fs::read(&face.path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(path = %face.path.display(), error = %e, "Failed to read font file");
                    continue;
                }
            };
            match FontArc::try_from_vec(bytes) {
                Ok(font) => book.add_face(&face.family, face.bold, face.italic, font),
                Err(e) => {
                    tracing::warn!(path = %face.path.display(), error = %e, "Invalid font file")
                }
            }
        }

        tracing::debug!(faces = book.faces.len(), "Font book loaded");
        book
    }

    pub fn add_face(&mut self, family: &str, bold: bool, italic: bool, font: FontArc) {
        self.faces.push(Face {
            family: family.to_ascii_lowercase(),
            bold,
            italic,
            font,
        });
    }

    pub fn set_fallback_family(&mut self, family: Option<String>) {
        self.fallback_family = family;
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Distinct family names, in load order.
    pub fn families(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for face in &self.faces {
            if !seen.contains(&face.family) {
                seen.push(face.family.clone());
            }
        }
        seen
    }

    /// Best face for `family`: exact style first, then any style of the
    /// family, then the fallback family.
    pub fn resolve(&self, family: &str, bold: bool, italic: bool) -> Option<&FontArc> {
        self.lookup(family, bold, italic).or_else(|| {
            self.fallback_family
                .as_deref()
                .and_then(|fallback| self.lookup(fallback, bold, italic))
        })
    }

    fn lookup(&self, family: &str, bold: bool, italic: bool) -> Option<&FontArc> {
        let family = family.to_ascii_lowercase();
        let faces = &self.faces;
        faces
            .iter()
            .find(|f| f.family == family && f.bold == bold && f.italic == italic)
            .or_else(|| faces.iter().find(|f| f.family == family && f.bold == bold))
            .or_else(|| faces.iter().find(|f| f.family == family))
            .map(|f| &f.font)
    }

    /// Log a missing family once.
    fn warn_missing(&self, family: &str) {
        let Ok(mut warned) = self.warned.lock() else {
            return;
        };
        if warned.insert(family.to_string()) {
            tracing::warn!(family, "No font available for text layer; skipping");
        }
    }
}

/// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `transparent`, or a basic
/// color name.
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return match hex.len() {
            3 | 4 => {
                let a = if hex.len() == 4 { digit(3)? * 17 } else { 255 };
                Some(Rgba([digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, a]))
            }
            6 | 8 => {
                let a = if hex.len() == 8 { pair(6)? } else { 255 };
                Some(Rgba([pair(0)?, pair(2)?, pair(4)?, a]))
            }
            _ => None,
        };
    }

    let rgba = match value.to_ascii_lowercase().as_str() {
        "transparent" => [0, 0, 0, 0],
        "black" => [0, 0, 0, 255],
        "white" => [255, 255, 255, 255],
        "red" => [255, 0, 0, 255],
        "green" => [0, 128, 0, 255],
        "blue" => [0, 0, 255, 255],
        "yellow" => [255, 255, 0, 255],
        "gray" | "grey" => [128, 128, 128, 255],
        _ => return None,
    };
    Some(Rgba(rgba))
}

/// Scale that renders `font` with an em size of `size_px`.
fn em_scale(font: &FontArc, size_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(upem) if upem > 0.0 => PxScale::from(size_px * font.height_unscaled() / upem),
        _ => PxScale::from(size_px),
    }
}

/// Render a text layer into its own transparent image, text centered.
///
/// Font size, shadow extent and the resulting image are capped at
/// `max_side` pixels; glyphs beyond the cap are cut off.
///
/// Returns `None` when no font is available for the layer's family.
pub fn render_text(fonts: &FontBook, text: &ResolvedText, max_side: u32) -> Option<RgbaImage> {
    let Some(font) = fonts.resolve(&text.font_family, text.bold, text.italic) else {
        fonts.warn_missing(&text.font_family);
        return None;
    };

    let max_side = max_side.max(1);
    let limit = max_side as f64;
    let size = text.font_size.max(1.0).min(limit) as f32;
    let scale = em_scale(font, size);
    let (text_w, text_h) = text_size(scale, font, &text.content);
    let fill = parse_color(&text.color).unwrap_or(Rgba([255, 255, 255, 255]));

    let shadow = text.shadow.as_ref().filter(|s| {
        parse_color(&s.color).map(|c| c[3] > 0).unwrap_or(false)
    });
    let pad = shadow
        .map(|s| {
            let blur = s.blur.max(0.0).min(limit / 4.0);
            let offset = s.offset_x.abs().max(s.offset_y.abs()).min(limit / 4.0);
            (blur * 2.0 + offset).ceil() as u32
        })
        .unwrap_or(0)
        + 2;

    let width = text_w.saturating_add(pad * 2).min(max_side);
    let height = text_h
        .max(size.ceil() as u32)
        .saturating_add(pad * 2)
        .min(max_side);
    let origin_x = pad as i32;
    let origin_y = (height.saturating_sub(text_h) / 2) as i32;

    let mut layer = RgbaImage::new(width, height);

    if let Some(shadow) = shadow {
        let color = parse_color(&shadow.color).unwrap_or(Rgba([0, 0, 0, 255]));
        let mut shade = RgbaImage::new(width, height);
        draw_text_mut(
            &mut shade,
            color,
            origin_x + shadow.offset_x.round() as i32,
            origin_y + shadow.offset_y.round() as i32,
            scale,
            font,
            &text.content,
        );
        // Canvas shadow blur is twice the gaussian sigma.
        let sigma = (shadow.blur.max(0.0).min(limit / 4.0) / 2.0) as f32;
        if sigma > 0.0 {
            shade = imageproc::filter::gaussian_blur_f32(&shade, sigma);
        }
        image::imageops::overlay(&mut layer, &shade, 0, 0);
    }

    let mut glyphs = RgbaImage::new(width, height);
    draw_text_mut(
        &mut glyphs,
        fill,
        origin_x,
        origin_y,
        scale,
        font,
        &text.content,
    );
    image::imageops::overlay(&mut layer, &glyphs, 0, 0);

    Some(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvasreel_processing_core::ResolvedShadow;

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    fn text(family: &str) -> ResolvedText {
        ResolvedText {
            content: "Hi".to_string(),
            font_size: 40.0,
            font_family: family.to_string(),
            color: "#ffcc00".to_string(),
            bold: false,
            italic: false,
            shadow: Some(ResolvedShadow {
                color: "#000000".to_string(),
                blur: 4.0,
                offset_x: 2.0,
                offset_y: 2.0,
            }),
        }
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("#eab308"), Some(Rgba([0xea, 0xb3, 0x08, 255])));
        assert_eq!(parse_color("#00000080"), Some(Rgba([0, 0, 0, 0x80])));
        assert_eq!(parse_color("transparent"), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(parse_color("White"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
        assert_eq!(parse_color("chartreuse-ish"), None);
    }

    #[test]
    fn test_missing_family_skips_layer() {
        let book = FontBook::new();
        assert!(book.is_empty());
        assert!(render_text(&book, &text("Inter"), 4096).is_none());
    }

    #[test]
    fn test_family_and_fallback_resolution() {
        let Ok(bytes) = std::fs::read(SYSTEM_FONT) else {
            return;
        };
        let font = FontArc::try_from_vec(bytes).unwrap();
        let mut book = FontBook::new();
        book.add_face("DejaVu Sans", false, false, font);

        assert!(book.resolve("dejavu sans", true, false).is_some());
        assert!(book.resolve("Inter", false, false).is_none());
        book.set_fallback_family(Some("DejaVu Sans".to_string()));
        assert!(book.resolve("Inter", false, false).is_some());
        assert_eq!(book.families(), vec!["dejavu sans".to_string()]);
    }

    #[test]
    fn test_render_text_draws_fill_and_shadow() {
        let Ok(bytes) = std::fs::read(SYSTEM_FONT) else {
            return;
        };
        let mut book = FontBook::new();
        book.add_face("Inter", false, false, FontArc::try_from_vec(bytes).unwrap());

        let layer = render_text(&book, &text("Inter"), 4096).unwrap();
        assert!(layer.width() > 20 && layer.height() >= 40);
        let has_fill = layer
            .pixels()
            .any(|p| p[3] > 200 && p[0] > 200 && p[1] > 150 && p[2] < 80);
        assert!(has_fill);
        let has_shadow = layer.pixels().any(|p| p[3] > 0 && p[0] < 40 && p[1] < 40);
        assert!(has_shadow);
    }

    #[test]
    fn test_huge_font_size_is_capped() {
        let Ok(bytes) = std::fs::read(SYSTEM_FONT) else {
            return;
        };
        let mut book = FontBook::new();
        book.add_face("Inter", false, false, FontArc::try_from_vec(bytes).unwrap());

        let mut huge = text("Inter");
        huge.font_size = 10_000.0;
        if let Some(shadow) = huge.shadow.as_mut() {
            shadow.blur = 5_000.0;
            shadow.offset_x = -9_000.0;
        }
        let layer = render_text(&book, &huge, 256).unwrap();
        assert!(layer.width() <= 256 && layer.height() <= 256);
    }
}
