//! The rendering surface the player draws into every tick.

use canvasreel_playback_engine::{FramePresenter, MediaPool};
use canvasreel_project_model::TimelineSnapshot;
use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::compositor::{compose, FrameComposition};
use crate::raster::Rasterizer;

/// Composes and rasterizes each presented instant onto an RGBA surface.
#[derive(Debug)]
pub struct CanvasPresenter {
    rasterizer: Rasterizer,
    surface: RgbaImage,
    composition: Option<FrameComposition>,
    presented: u64,
}

impl CanvasPresenter {
    pub fn new(rasterizer: Rasterizer) -> Self {
        let surface = rasterizer.blank();
        Self {
            rasterizer,
            surface,
            composition: None,
            presented: 0,
        }
    }

    /// The most recently drawn frame.
    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Layer list behind [`CanvasPresenter::surface`].
    pub fn composition(&self) -> Option<&FrameComposition> {
        self.composition.as_ref()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    /// Put an already rendered frame on the surface, stretched to the
    /// canvas if its size differs.
    pub fn show_frame(&mut self, frame: &RgbaImage) {
        let (width, height) = (self.rasterizer.width(), self.rasterizer.height());
        if frame.dimensions() == (width, height) {
            self.surface.clone_from(frame);
        } else {
            self.surface = imageops::resize(frame, width, height, FilterType::Triangle);
        }
        self.composition = None;
    }
}

impl FramePresenter for CanvasPresenter {
    fn present(&mut self, snapshot: &TimelineSnapshot, time: f64, pool: &MediaPool) {
        let composition = compose(
            snapshot,
            time,
            self.rasterizer.width(),
            self.rasterizer.height(),
        );
        self.surface = self.rasterizer.render(&composition, pool);
        self.composition = Some(composition);
        self.presented += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::FontBook;
    use image::Rgba;

    #[test]
    fn test_show_frame_replaces_surface() {
        let mut presenter = CanvasPresenter::new(Rasterizer::new(8, 6, FontBook::new()).unwrap());
        let green = Rgba([0, 200, 0, 255]);

        presenter.show_frame(&RgbaImage::from_pixel(8, 6, green));
        assert!(presenter.surface().pixels().all(|p| *p == green));
        assert!(presenter.composition().is_none());

        presenter.show_frame(&RgbaImage::from_pixel(2, 2, green));
        assert_eq!(presenter.surface().dimensions(), (8, 6));
        assert_eq!(presenter.surface().get_pixel(4, 3), &green);
        assert_eq!(presenter.presented(), 0);
    }
}
