//! Coverage masks that restrict where fills and gradients land.

use crate::{ImageEffectResult, check_dimensions};
use image::{ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Per-pixel coverage in [0, 1].
pub type Coverage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Feather radius to Gaussian sigma, as GIMP's feather does it.
const FEATHER_RADIUS_TO_SIGMA: f32 = 3.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    coverage: Coverage,
}

impl Selection {
    pub fn all(width: u32, height: u32) -> Self {
        Self {
            coverage: Coverage::from_pixel(width, height, Luma([1.0])),
        }
    }

    pub fn none(width: u32, height: u32) -> Self {
        Self {
            coverage: Coverage::new(width, height),
        }
    }

    /// Hard-edged ellipse inscribed in the box at (`x`, `y`) of size
    /// `ellipse_width` × `ellipse_height`. The box may reach outside the
    /// canvas. A pixel is covered when its centre lies inside the ellipse.
    pub fn ellipse(
        width: u32,
        height: u32,
        x: f32,
        y: f32,
        ellipse_width: f32,
        ellipse_height: f32,
    ) -> Self {
        if ellipse_width <= 0.0 || ellipse_height <= 0.0 {
            return Self::none(width, height);
        }

        let rx = ellipse_width / 2.0;
        let ry = ellipse_height / 2.0;
        let cx = x + rx;
        let cy = y + ry;

        let coverage = Coverage::from_fn(width, height, |px, py| {
            let dx = (px as f32 + 0.5 - cx) / rx;
            let dy = (py as f32 + 0.5 - cy) / ry;
            Luma([if dx * dx + dy * dy <= 1.0 { 1.0 } else { 0.0 }])
        });

        Self { coverage }
    }

    pub fn from_coverage(coverage: Coverage) -> Self {
        Self { coverage }
    }

    pub fn invert(&mut self) {
        for p in self.coverage.pixels_mut() {
            p[0] = 1.0 - p[0];
        }
    }

    /// Keep only what both selections cover.
    pub fn intersect(&mut self, other: &Selection) -> ImageEffectResult<()> {
        check_dimensions(self.dimensions(), other.dimensions())?;

        for (a, b) in self.coverage.pixels_mut().zip(other.coverage.pixels()) {
            a[0] = a[0].min(b[0]);
        }

        Ok(())
    }

    /// Soften the edge with a Gaussian of sigma `radius / 3.5`.
    pub fn feather(&mut self, radius: f32) {
        let sigma = radius / FEATHER_RADIUS_TO_SIGMA;
        if sigma <= 0.0 || self.coverage.width() == 0 || self.coverage.height() == 0 {
            return;
        }

        let mut blurred = gaussian_blur_f32(&self.coverage, sigma);
        for p in blurred.pixels_mut() {
            p[0] = p[0].clamp(0.0, 1.0);
        }
        self.coverage = blurred;
    }

    /// `(x, y, width, height)` of the covered area, `None` when empty.
    pub fn bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0, 0);
        let mut found = false;

        for (x, y, p) in self.coverage.enumerate_pixels() {
            if p[0] > 0.0 {
                found = true;
                min = (min.0.min(x), min.1.min(y));
                max = (max.0.max(x), max.1.max(y));
            }
        }

        found.then(|| (min.0, min.1, max.0 - min.0 + 1, max.1 - min.1 + 1))
    }

    pub fn is_empty(&self) -> bool {
        self.coverage.pixels().all(|p| p[0] <= 0.0)
    }

    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.coverage.get_pixel(x, y)[0]
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.coverage.dimensions()
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inscribed_ellipse_hard_edge() {
        let sel = Selection::ellipse(100, 60, 0.0, 0.0, 100.0, 60.0);

        assert_eq!(sel.value(50, 30), 1.0);
        assert_eq!(sel.value(0, 0), 0.0);
        assert_eq!(sel.value(99, 59), 0.0);
        assert_eq!(sel.value(0, 30), 1.0);
        assert_eq!(sel.bounds(), Some((0, 0, 100, 60)));
    }

    #[test]
    fn test_degenerate_ellipse_is_empty() {
        assert!(Selection::ellipse(10, 10, 0.0, 0.0, 0.0, 10.0).is_empty());
        assert!(Selection::ellipse(10, 10, 20.0, 20.0, 5.0, 5.0).is_empty());
        assert_eq!(Selection::none(4, 4).bounds(), None);
    }

    #[test]
    fn test_invert_and_intersect() {
        let mut outer = Selection::ellipse(20, 20, 0.0, 0.0, 20.0, 20.0);
        outer.invert();
        assert_eq!(outer.value(10, 10), 0.0);
        assert_eq!(outer.value(0, 0), 1.0);

        let mut all = Selection::all(20, 20);
        all.intersect(&outer).unwrap();
        assert_eq!(all, outer);

        assert!(all.intersect(&Selection::all(5, 5)).is_err());
    }

    #[test]
    fn test_feather_softens_edge_and_stays_in_range() {
        let mut sel = Selection::ellipse(64, 64, 0.0, 0.0, 64.0, 64.0);
        sel.feather(0.20 * 64.0);

        let centre = sel.value(32, 32);
        let edge = sel.value(1, 32);
        let corner = sel.value(0, 0);

        assert!(centre > 0.9);
        assert!(edge > 0.0 && edge < 1.0);
        assert!(corner < edge);
        assert!(sel.coverage().pixels().all(|p| (0.0..=1.0).contains(&p[0])));
    }

    #[test]
    fn test_zero_feather_is_noop() {
        let mut sel = Selection::ellipse(8, 8, 0.0, 0.0, 8.0, 8.0);
        let before = sel.clone();
        sel.feather(0.0);
        assert_eq!(sel, before);
    }
}
