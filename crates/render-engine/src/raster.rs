//! Rasterizer: turns a [`FrameComposition`] into pixels.
//!
//! Each layer is an image placed in its own local space (origin at the
//! layer center) and mapped onto the canvas by
//! `center + rotate(θ) · scale(s) · flip · local`. Canvas pixels are
//! inverse-mapped into that space and sampled bilinearly, so rotation,
//! flips, and wipe clipping all share one code path.

use std::collections::HashMap;
use std::sync::Arc;

use canvasreel_common::{ReelError, ReelResult};
use canvasreel_playback_engine::MediaPool;
use canvasreel_processing_core::{ResolvedTransform, WipeRect};
use canvasreel_project_model::AssetId;
use image::{Rgba, RgbaImage};

use crate::compositor::{FrameComposition, LayerContent, LayerDesc};
use crate::filters::apply_filters;
use crate::text::{render_text, FontBook};

/// Background of every frame.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Largest canvas side the rasterizer accepts, in pixels.
pub const MAX_CANVAS_SIDE: u32 = 16_384;

/// Text layers are rasterized at most this many canvas sides wide.
const TEXT_CANVAS_MULTIPLE: u32 = 2;

/// Where the rasterizer gets media frames from.
pub trait FrameLookup {
    fn frame(&self, asset: &AssetId) -> Option<Arc<RgbaImage>>;
}

impl FrameLookup for MediaPool {
    fn frame(&self, asset: &AssetId) -> Option<Arc<RgbaImage>> {
        MediaPool::frame(self, asset)
    }
}

impl FrameLookup for HashMap<AssetId, Arc<RgbaImage>> {
    fn frame(&self, asset: &AssetId) -> Option<Arc<RgbaImage>> {
        self.get(asset).cloned()
    }
}

/// Canvas-space placement of one layer image.
#[derive(Debug, Clone, Copy)]
struct Placement {
    center: (f64, f64),
    cos: f64,
    sin: f64,
    scale: f64,
    flip_x: f64,
    flip_y: f64,
    /// Half extents of the drawn rect in local units.
    half_w: f64,
    half_h: f64,
}

impl Placement {
    fn new(layer: &LayerDesc, canvas: (u32, u32), half_w: f64, half_h: f64) -> Self {
        let t: &ResolvedTransform = &layer.transform;
        let theta = t.rotation.to_radians();
        Self {
            center: layer.center(canvas.0, canvas.1),
            cos: theta.cos(),
            sin: theta.sin(),
            scale: t.scale,
            flip_x: if t.flip_horizontal { -1.0 } else { 1.0 },
            flip_y: if t.flip_vertical { -1.0 } else { 1.0 },
            half_w,
            half_h,
        }
    }

    fn to_canvas(&self, x: f64, y: f64) -> (f64, f64) {
        let (x, y) = (x * self.flip_x * self.scale, y * self.flip_y * self.scale);
        (
            self.center.0 + x * self.cos - y * self.sin,
            self.center.1 + x * self.sin + y * self.cos,
        )
    }

    fn to_local(&self, px: f64, py: f64) -> (f64, f64) {
        let (dx, dy) = (px - self.center.0, py - self.center.1);
        let x = dx * self.cos + dy * self.sin;
        let y = -dx * self.sin + dy * self.cos;
        (
            x / self.scale * self.flip_x,
            y / self.scale * self.flip_y,
        )
    }

    /// Canvas pixel bounds `[x0, x1) × [y0, y1)` covering the layer.
    fn bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let corners = [
            self.to_canvas(-self.half_w, -self.half_h),
            self.to_canvas(self.half_w, -self.half_h),
            self.to_canvas(self.half_w, self.half_h),
            self.to_canvas(-self.half_w, self.half_h),
        ];
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let x0 = min_x.floor().max(0.0);
        let y0 = min_y.floor().max(0.0);
        let x1 = max_x.ceil().min(width as f64);
        let y1 = max_y.ceil().min(height as f64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Draws compositions onto an RGBA canvas.
#[derive(Debug)]
pub struct Rasterizer {
    width: u32,
    height: u32,
    fonts: FontBook,
}

impl Rasterizer {
    pub fn new(width: u32, height: u32, fonts: FontBook) -> ReelResult<Self> {
        let side_ok = |side: u32| (1..=MAX_CANVAS_SIDE).contains(&side);
        if !side_ok(width) || !side_ok(height) {
            return Err(ReelError::render(format!(
                "canvas {width}x{height} outside 1..={MAX_CANVAS_SIDE} pixels per side"
            )));
        }
        Ok(Self {
            width,
            height,
            fonts,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// A black canvas of the configured size.
    pub fn blank(&self) -> RgbaImage {
        RgbaImage::from_pixel(self.width, self.height, BACKGROUND)
    }

    /// Render `composition` onto a fresh black canvas.
    pub fn render(&self, composition: &FrameComposition, frames: &dyn FrameLookup) -> RgbaImage {
        let mut canvas = self.blank();
        for layer in &composition.layers {
            self.draw_layer(&mut canvas, layer, frames);
        }
        canvas
    }

    fn draw_layer(&self, canvas: &mut RgbaImage, layer: &LayerDesc, frames: &dyn FrameLookup) {
        let opacity = layer.transform.opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 || layer.transform.scale == 0.0 {
            return;
        }

        match &layer.content {
            LayerContent::Media { asset_id, filters } => {
                // Not ready (or never loaded): skip for this frame.
                let Some(frame) = frames.frame(asset_id) else {
                    return;
                };
                let (src_w, src_h) = frame.dimensions();
                if src_w == 0 || src_h == 0 {
                    return;
                }
                let fit = (self.width as f64 / src_w as f64).min(self.height as f64 / src_h as f64);
                let blur_scale = 1.0 / (fit * layer.transform.scale.abs());
                let filtered = apply_filters(&frame, filters, blur_scale);
                self.blit(canvas, layer, &filtered, fit, opacity);
            }
            LayerContent::Text(text) => {
                let max_side =
                    (self.width.max(self.height) * TEXT_CANVAS_MULTIPLE).min(MAX_CANVAS_SIDE);
                if let Some(image) = render_text(&self.fonts, text, max_side) {
                    self.blit(canvas, layer, &image, 1.0, opacity);
                }
            }
        }
    }

    /// Draw `image` centered on the layer origin at `fit` local units per
    /// source pixel.
    fn blit(
        &self,
        canvas: &mut RgbaImage,
        layer: &LayerDesc,
        image: &RgbaImage,
        fit: f64,
        opacity: f64,
    ) {
        let half_w = image.width() as f64 * fit / 2.0;
        let half_h = image.height() as f64 * fit / 2.0;
        let placement = Placement::new(layer, (self.width, self.height), half_w, half_h);
        let Some((x0, y0, x1, y1)) = placement.bounds(self.width, self.height) else {
            return;
        };

        for py in y0..y1 {
            for px in x0..x1 {
                let (lx, ly) = placement.to_local(px as f64 + 0.5, py as f64 + 0.5);
                if lx < -half_w || lx >= half_w || ly < -half_h || ly >= half_h {
                    continue;
                }
                if !inside_wipe(layer.wipe.as_ref(), lx, ly) {
                    continue;
                }
                let src = sample_bilinear(image, (lx + half_w) / fit, (ly + half_h) / fit);
                blend(canvas.get_pixel_mut(px, py), src, opacity);
            }
        }
    }
}

fn inside_wipe(wipe: Option<&WipeRect>, x: f64, y: f64) -> bool {
    wipe.map(|w| w.contains(x, y)).unwrap_or(true)
}

/// Sample at continuous source coordinates (pixel centers at `i + 0.5`).
fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> [f64; 4] {
    let max_x = image.width() as f64 - 1.0;
    let max_y = image.height() as f64 - 1.0;
    let fx = (x - 0.5).clamp(0.0, max_x);
    let fy = (y - 0.5).clamp(0.0, max_y);
    let (x0, y0) = (fx.floor(), fy.floor());
    let (x1, y1) = ((x0 + 1.0).min(max_x), (y0 + 1.0).min(max_y));
    let (tx, ty) = (fx - x0, fy - y0);

    let p = |x: f64, y: f64| image.get_pixel(x as u32, y as u32).0;
    let (a, b, c, d) = (p(x0, y0), p(x1, y0), p(x0, y1), p(x1, y1));

    let mut out = [0.0; 4];
    for i in 0..4 {
        let top = a[i] as f64 * (1.0 - tx) + b[i] as f64 * tx;
        let bottom = c[i] as f64 * (1.0 - tx) + d[i] as f64 * tx;
        out[i] = top * (1.0 - ty) + bottom * ty;
    }
    out
}

/// Source-over blend onto an opaque destination.
fn blend(dst: &mut Rgba<u8>, src: [f64; 4], opacity: f64) {
    let alpha = (src[3] / 255.0) * opacity;
    if alpha <= 0.0 {
        return;
    }
    for i in 0..3 {
        let value = src[i] * alpha + dst[i] as f64 * (1.0 - alpha);
        dst[i] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvasreel_processing_core::ResolvedFilters;
    use canvasreel_project_model::{ClipId, TrackId};

    const W: u32 = 40;
    const H: u32 = 20;

    fn layer(transform: ResolvedTransform) -> LayerDesc {
        LayerDesc {
            clip_id: ClipId::new("c"),
            track_id: TrackId::new("t"),
            relative_time: 0.0,
            transform,
            offset_x: 0.0,
            offset_y: 0.0,
            wipe: None,
            content: LayerContent::Media {
                asset_id: AssetId::new("a"),
                filters: ResolvedFilters::default(),
            },
        }
    }

    fn identity() -> ResolvedTransform {
        ResolvedTransform {
            position_x: 0.0,
            position_y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            opacity: 1.0,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }

    /// Left half red, right half blue.
    fn frames() -> HashMap<AssetId, Arc<RgbaImage>> {
        let mut img = RgbaImage::new(20, 10);
        for (x, _, p) in img.enumerate_pixels_mut() {
            *p = if x < 10 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            };
        }
        HashMap::from([(AssetId::new("a"), Arc::new(img))])
    }

    fn render(layer: LayerDesc) -> RgbaImage {
        let raster = Rasterizer::new(W, H, FontBook::new()).unwrap();
        let composition = FrameComposition {
            time: 0.0,
            width: W,
            height: H,
            layers: vec![layer],
        };
        raster.render(&composition, &frames())
    }

    #[test]
    fn test_rejects_empty_or_oversized_canvas() {
        for (w, h) in [(0, 720), (1280, 0), (MAX_CANVAS_SIDE + 1, 720)] {
            let err = Rasterizer::new(w, h, FontBook::new()).unwrap_err();
            assert!(matches!(err, ReelError::Render { .. }), "{w}x{h}");
        }
        let raster = Rasterizer::new(1, 1, FontBook::new()).unwrap();
        assert_eq!(raster.blank().dimensions(), (1, 1));
    }

    #[test]
    fn test_fit_to_frame_fills_matching_aspect() {
        let out = render(layer(identity()));
        assert_eq!(out.get_pixel(2, 10).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(37, 10).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_missing_frame_leaves_black() {
        let mut l = layer(identity());
        l.content = LayerContent::Media {
            asset_id: AssetId::new("nope"),
            filters: ResolvedFilters::default(),
        };
        assert!(render(l).pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_horizontal_flip_mirrors() {
        let mut t = identity();
        t.flip_horizontal = true;
        let out = render(layer(t));
        assert_eq!(out.get_pixel(2, 10).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(37, 10).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_rotation_by_180_matches_double_flip() {
        let mut rotated = identity();
        rotated.rotation = 180.0;
        let mut flipped = identity();
        flipped.flip_horizontal = true;
        flipped.flip_vertical = true;
        let a = render(layer(rotated));
        let b = render(layer(flipped));
        assert_eq!(a.get_pixel(5, 5), b.get_pixel(5, 5));
        assert_eq!(a.get_pixel(35, 15), b.get_pixel(35, 15));
    }

    #[test]
    fn test_opacity_blends_over_black() {
        let mut t = identity();
        t.opacity = 0.5;
        let out = render(layer(t));
        assert_eq!(out.get_pixel(2, 10).0, [128, 0, 0, 255]);
    }

    #[test]
    fn test_half_scale_and_offset() {
        let mut t = identity();
        t.scale = 0.5;
        t.position_x = 5.0;
        let out = render(layer(t));
        // Drawn rect spans x in [15, 35) around center 25.
        assert_eq!(*out.get_pixel(12, 10), BACKGROUND);
        assert_eq!(out.get_pixel(17, 10).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(33, 10).0, [0, 0, 255, 255]);
        assert_eq!(*out.get_pixel(2, 2), BACKGROUND);
    }

    #[test]
    fn test_wipe_clips_local_region() {
        let mut l = layer(identity());
        // Reveal only the left quarter.
        l.wipe = Some(WipeRect {
            x: -20.0,
            y: -10.0,
            width: 10.0,
            height: 20.0,
        });
        let out = render(l);
        assert_eq!(out.get_pixel(5, 10).0, [255, 0, 0, 255]);
        assert_eq!(*out.get_pixel(15, 10), BACKGROUND);
    }
}
