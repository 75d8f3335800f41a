//! Color filter chain.
//!
//! Implements the CSS filter functions the compositor resolves per frame,
//! applied in chain order: brightness, contrast, saturate, grayscale,
//! sepia, then blur. Channels are clamped to `[0, 1]` after every step.

use std::borrow::Cow;

use canvasreel_processing_core::ResolvedFilters;
use image::RgbaImage;

type Matrix = [[f32; 3]; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColorOp {
    Linear { slope: f32, intercept: f32 },
    Matrix(Matrix),
}

impl ColorOp {
    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = match self {
            ColorOp::Linear { slope, intercept } => rgb.map(|c| c * slope + intercept),
            ColorOp::Matrix(m) => [
                m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
                m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
                m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
            ],
        };
        out.map(|c| c.clamp(0.0, 1.0))
    }
}

fn saturate_matrix(s: f32) -> Matrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn grayscale_matrix(amount: f32) -> Matrix {
    let s = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * s, 0.7152 - 0.7152 * s, 0.0722 - 0.0722 * s],
        [0.2126 - 0.2126 * s, 0.7152 + 0.2848 * s, 0.0722 - 0.0722 * s],
        [0.2126 - 0.2126 * s, 0.7152 - 0.7152 * s, 0.0722 + 0.9278 * s],
    ]
}

fn sepia_matrix(amount: f32) -> Matrix {
    let s = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s],
        [0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s],
        [0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s],
    ]
}

fn color_ops(filters: &ResolvedFilters) -> Vec<ColorOp> {
    let mut ops = Vec::new();
    if filters.brightness != 1.0 {
        ops.push(ColorOp::Linear {
            slope: filters.brightness.max(0.0) as f32,
            intercept: 0.0,
        });
    }
    if filters.contrast != 1.0 {
        let c = filters.contrast.max(0.0) as f32;
        ops.push(ColorOp::Linear {
            slope: c,
            intercept: 0.5 - 0.5 * c,
        });
    }
    if filters.saturation != 1.0 {
        ops.push(ColorOp::Matrix(saturate_matrix(
            filters.saturation.max(0.0) as f32,
        )));
    }
    if filters.grayscale > 0.0 {
        ops.push(ColorOp::Matrix(grayscale_matrix(filters.grayscale as f32)));
    }
    if filters.sepia > 0.0 {
        ops.push(ColorOp::Matrix(sepia_matrix(filters.sepia as f32)));
    }
    ops
}

/// Apply `filters` to `image`.
///
/// `blur_scale` converts the blur radius from canvas pixels into `image`
/// pixels (the image is usually drawn scaled). Returns the input untouched
/// when the chain is the identity.
pub fn apply_filters<'a>(
    image: &'a RgbaImage,
    filters: &ResolvedFilters,
    blur_scale: f64,
) -> Cow<'a, RgbaImage> {
    let ops = color_ops(filters);
    let sigma = (filters.blur * blur_scale) as f32;
    if ops.is_empty() && sigma <= 0.0 {
        return Cow::Borrowed(image);
    }

    let mut out = image.clone();
    if !ops.is_empty() {
        for pixel in out.pixels_mut() {
            let mut rgb = [
                pixel[0] as f32 / 255.0,
                pixel[1] as f32 / 255.0,
                pixel[2] as f32 / 255.0,
            ];
            for op in &ops {
                rgb = op.apply(rgb);
            }
            pixel[0] = (rgb[0] * 255.0).round() as u8;
            pixel[1] = (rgb[1] * 255.0).round() as u8;
            pixel[2] = (rgb[2] * 255.0).round() as u8;
        }
    }

    if sigma > 0.0 && sigma.is_finite() {
        out = imageproc::filter::gaussian_blur_f32(&out, sigma);
    }

    Cow::Owned(out)
}
