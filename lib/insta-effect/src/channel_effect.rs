//! Per-channel tone adjustments: levels, explicit curves and spline curves.
//!
//! Spline curves use cubic Bézier segments between consecutive control
//! points. The inner handles of each segment are placed so the tangent at an
//! endpoint is parallel to the line joining its neighbours, which keeps the
//! curve smooth without overshooting between sparse points. Because x(t) is
//! linear in t, every input maps to exactly one output.

use crate::{
    Effect, ImageEffectError, ImageEffectResult,
    colour_lut::{Lut, SrgbLuts, DEFAULT_SAMPLES},
};
use derivative::Derivative;
use derive_setters::Setters;
use image::Rgba32FImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// R, G and B together.
    Value,
    Red,
    Green,
    Blue,
}

impl Channel {
    fn indices(self) -> &'static [usize] {
        match self {
            Channel::Value => &[0, 1, 2],
            Channel::Red => &[0],
            Channel::Green => &[1],
            Channel::Blue => &[2],
        }
    }
}

/// Map the selected channel(s) of every pixel through `f`. Alpha is left alone.
pub fn map_channel(image: &mut Rgba32FImage, channel: Channel, f: impl Fn(f32) -> f32) {
    let indices = channel.indices();
    for pixel in image.pixels_mut() {
        for &i in indices {
            pixel[i] = f(pixel[i]).clamp(0.0, 1.0);
        }
    }
}

pub fn apply_lut(image: &mut Rgba32FImage, channel: Channel, lut: &Lut) {
    map_channel(image, channel, |v| lut.lookup(v));
}

/// Evaluates a smooth curve through sorted control points.
#[derive(Debug, Clone)]
pub struct CurveEvaluator {
    points: Vec<[f32; 2]>,
}

impl CurveEvaluator {
    /// Build from a flat `[x0, y0, x1, y1, ...]` list.
    ///
    /// Points are sorted by input; when two points share an input the one
    /// given later wins.
    pub fn from_flat(control_points: &[f32]) -> ImageEffectResult<Self> {
        if control_points.len() % 2 != 0 {
            return Err(ImageEffectError::InvalidParameter(format!(
                "control points must come in (input, output) pairs, got {} values",
                control_points.len()
            )));
        }

        if control_points.len() < 4 {
            return Err(ImageEffectError::InvalidParameter(
                "a spline needs at least two control points".to_string(),
            ));
        }

        let mut points: Vec<[f32; 2]> = Vec::with_capacity(control_points.len() / 2);
        for pair in control_points.chunks_exact(2) {
            let point = [pair[0].clamp(0.0, 1.0), pair[1].clamp(0.0, 1.0)];
            match points.iter_mut().find(|p| p[0] == point[0]) {
                Some(existing) => *existing = point,
                None => points.push(point),
            }
        }

        // Stable, so ties (already merged above) cannot reorder.
        points.sort_by(|a, b| a[0].total_cmp(&b[0]));

        Ok(Self { points })
    }

    pub fn points(&self) -> &[[f32; 2]] {
        &self.points
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let pts = &self.points;
        let last = pts.len() - 1;

        if pts.len() == 1 || x <= pts[0][0] {
            return pts[0][1];
        }
        if x >= pts[last][0] {
            return pts[last][1];
        }

        // Segment [lo, lo + 1] containing x.
        let lo = match pts.iter().rposition(|p| p[0] <= x) {
            Some(i) => i.min(last - 1),
            None => 0,
        };
        let hi = lo + 1;

        let p1 = if lo > 0 { lo - 1 } else { lo };
        let p4 = if hi < last { hi + 1 } else { hi };

        let [x0, y0] = pts[lo];
        let [x3, y3] = pts[hi];
        let dx = x3 - x0;
        let dy = y3 - y0;

        let (y1, y2) = if p1 == lo && p4 == hi {
            (y0 + dy / 3.0, y0 + dy * 2.0 / 3.0)
        } else if p1 == lo {
            let slope = (pts[p4][1] - y0) / (pts[p4][0] - x0);
            let y2 = y3 - slope * dx / 3.0;
            (y0 + (y2 - y0) / 2.0, y2)
        } else if p4 == hi {
            let slope = (y3 - pts[p1][1]) / (x3 - pts[p1][0]);
            let y1 = y0 + slope * dx / 3.0;
            (y1, y3 + (y1 - y3) / 2.0)
        } else {
            let slope_in = (y3 - pts[p1][1]) / (x3 - pts[p1][0]);
            let slope_out = (pts[p4][1] - y0) / (pts[p4][0] - x0);
            (y0 + slope_in * dx / 3.0, y3 - slope_out * dx / 3.0)
        };

        let t = (x - x0) / dx;
        let mt = 1.0 - t;
        let y = y0 * mt * mt * mt + 3.0 * y1 * mt * mt * t + 3.0 * y2 * mt * t * t + y3 * t * t * t;
        y.clamp(0.0, 1.0)
    }

    pub fn bake(&self, sample_count: usize) -> ImageEffectResult<Lut> {
        Lut::from_fn(sample_count, |x| self.evaluate(x))
    }
}

/// Levels for one channel, all values normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub low_input: f32,
    pub high_input: f32,
    pub clamp_input: bool,
    pub gamma: f32,
    pub low_output: f32,
    pub high_output: f32,
    pub clamp_output: bool,
}

impl Levels {
    pub const IDENTITY: Levels = Levels {
        low_input: 0.0,
        high_input: 1.0,
        clamp_input: true,
        gamma: 1.0,
        low_output: 0.0,
        high_output: 1.0,
        clamp_output: true,
    };

    pub const fn new(high_input: f32, gamma: f32, low_output: f32) -> Self {
        Levels {
            high_input,
            gamma,
            low_output,
            ..Self::IDENTITY
        }
    }

    pub fn map(&self, value: f32) -> f32 {
        let mut v = if self.high_input != self.low_input {
            (value - self.low_input) / (self.high_input - self.low_input)
        } else {
            value - self.low_input
        };

        if self.clamp_input {
            v = v.clamp(0.0, 1.0);
        }

        let inv_gamma = 1.0 / self.gamma;
        if inv_gamma != 1.0 && v > 0.0 {
            v = v.powf(inv_gamma);
        }

        v = if self.high_output >= self.low_output {
            v * (self.high_output - self.low_output) + self.low_output
        } else {
            self.low_output - v * (self.low_output - self.high_output)
        };

        if self.clamp_output {
            v = v.clamp(0.0, 1.0);
        }

        v
    }
}

/// Levels adjustment configuration
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct LevelsConfig {
    #[derivative(Default(value = "Channel::Value"))]
    channel: Channel,

    #[derivative(Default(value = "Levels::IDENTITY"))]
    levels: Levels,
}

impl LevelsConfig {
    pub fn new(channel: Channel, levels: Levels) -> Self {
        Self::default().with_channel(channel).with_levels(levels)
    }
}

impl Effect for LevelsConfig {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        if self.levels.gamma <= 0.0 {
            return Err(ImageEffectError::InvalidParameter(format!(
                "levels gamma must be positive, got {}",
                self.levels.gamma
            )));
        }

        let levels = self.levels;
        map_channel(image, self.channel, |v| levels.map(v));
        Ok(())
    }
}

/// Explicit curve: the channel is remapped through a caller-supplied table.
#[derive(Debug, Clone)]
pub struct CurvesConfig {
    channel: Channel,
    lut: Lut,
}

impl CurvesConfig {
    pub fn new(channel: Channel, lut: Lut) -> Self {
        Self { channel, lut }
    }
}

impl Effect for CurvesConfig {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        apply_lut(image, self.channel, &self.lut);
        Ok(())
    }
}

/// Spline curve applied directly to the stored values.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct SplineCurveConfig {
    #[derivative(Default(value = "Channel::Value"))]
    channel: Channel,

    #[derivative(Default(value = "vec![0.0, 0.0, 1.0, 1.0]"))]
    points: Vec<f32>,

    #[derivative(Default(value = "DEFAULT_SAMPLES"))]
    samples: usize,
}

impl SplineCurveConfig {
    pub fn new(channel: Channel, points: &[f32]) -> Self {
        Self::default()
            .with_channel(channel)
            .with_points(points.to_vec())
    }
}

impl Effect for SplineCurveConfig {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        let lut = CurveEvaluator::from_flat(&self.points)?.bake(self.samples)?;
        apply_lut(image, self.channel, &lut);
        Ok(())
    }
}

/// Spline curve evaluated in linear light: `to_linear` table, spline,
/// then `to_srgb` table, in that order.
#[derive(Debug, Clone)]
pub struct SrgbCurveSplineConfig<'a> {
    channel: Channel,
    points: &'a [f32],
    luts: &'a SrgbLuts,
}

impl<'a> SrgbCurveSplineConfig<'a> {
    pub fn new(channel: Channel, points: &'a [f32], luts: &'a SrgbLuts) -> Self {
        Self {
            channel,
            points,
            luts,
        }
    }
}

impl Effect for SrgbCurveSplineConfig<'_> {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        // Validate before touching pixels so a bad point list leaves the layer intact.
        let spline = CurveEvaluator::from_flat(self.points)?.bake(self.luts.to_linear.len())?;

        apply_lut(image, self.channel, &self.luts.to_linear);
        apply_lut(image, self.channel, &spline);
        apply_lut(image, self.channel, &self.luts.to_srgb);
        Ok(())
    }
}

pub fn apply_srgb_curve_spline(
    image: &mut Rgba32FImage,
    channel: Channel,
    control_points: &[f32],
    luts: &SrgbLuts,
) -> ImageEffectResult<()> {
    SrgbCurveSplineConfig::new(channel, control_points, luts).apply(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gray_ramp() -> Rgba32FImage {
        Rgba32FImage::from_fn(256, 1, |x, _| {
            let v = x as f32 / 255.0;
            Rgba([v, v, v, 1.0])
        })
    }

    #[test]
    fn test_two_point_spline_is_straight_line() {
        let curve = CurveEvaluator::from_flat(&[0.0, 0.0, 1.0, 1.0]).unwrap();
        for i in 0..=10 {
            let x = i as f32 / 10.0;
            assert!((curve.evaluate(x) - x).abs() < 1e-5);
        }
    }

    #[test]
    fn test_spline_passes_through_points_and_holds_ends() {
        let points = [10.0 / 255.0, 0.0, 0.5, 0.6, 1.0, 1.0];
        let curve = CurveEvaluator::from_flat(&points).unwrap();

        assert_eq!(curve.evaluate(0.0), 0.0);
        assert_eq!(curve.evaluate(5.0 / 255.0), 0.0);
        assert!((curve.evaluate(0.5) - 0.6).abs() < 1e-5);
        assert!((curve.evaluate(1.0) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_unsorted_points_and_duplicates() {
        // Later (0.5, 0.8) replaces (0.5, 0.2); order of input does not matter.
        let curve = CurveEvaluator::from_flat(&[1.0, 1.0, 0.5, 0.2, 0.0, 0.0, 0.5, 0.8]).unwrap();
        assert_eq!(curve.points(), &[[0.0, 0.0], [0.5, 0.8], [1.0, 1.0]]);
        assert!((curve.evaluate(0.5) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_monotonic_points_give_monotonic_curve() {
        let points = [0.0, 0.0, 0.051, 0.0, 0.325, 0.490, 0.698, 0.859, 1.0, 1.0];
        let lut = CurveEvaluator::from_flat(&points).unwrap().bake(1024).unwrap();
        for pair in lut.samples().windows(2) {
            assert!(pair[1] >= pair[0] - 1e-6);
        }
    }

    #[test]
    fn test_malformed_points_rejected() {
        assert!(CurveEvaluator::from_flat(&[0.0, 0.0, 1.0]).is_err());
        assert!(CurveEvaluator::from_flat(&[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_levels_output_floor() {
        let levels = Levels::new(1.0, 1.0, 9.0 / 255.0);
        assert!((levels.map(0.0) - 9.0 / 255.0).abs() < 1e-6);
        assert!((levels.map(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_levels_input_white_point_and_gamma() {
        let levels = Levels::new(0.5, 2.0, 0.0);
        assert_eq!(levels.map(0.75), 1.0);
        assert!((levels.map(0.125) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_levels_only_touch_selected_channel() {
        let mut img = Rgba32FImage::from_pixel(2, 2, Rgba([0.0, 0.0, 0.0, 0.5]));
        LevelsConfig::new(Channel::Red, Levels::new(1.0, 1.0, 0.5))
            .apply(&mut img)
            .unwrap();

        let p = img.get_pixel(0, 0);
        assert!((p[0] - 0.5).abs() < 1e-6);
        assert_eq!(p[1], 0.0);
        assert_eq!(p[2], 0.0);
        assert_eq!(p[3], 0.5);
    }

    #[test]
    fn test_identity_srgb_spline_is_near_identity() {
        let luts = SrgbLuts::build(DEFAULT_SAMPLES).unwrap();
        let mut img = gray_ramp();
        let before = img.clone();

        SrgbCurveSplineConfig::new(Channel::Value, &[0.0, 0.0, 1.0, 1.0], &luts)
            .apply(&mut img)
            .unwrap();

        for (a, b) in img.pixels().zip(before.pixels()) {
            assert!((a[0] - b[0]).abs() <= 6.0 / 1023.0);
        }
    }

    #[test]
    fn test_srgb_spline_bad_points_leave_pixels() {
        let luts = SrgbLuts::build(64).unwrap();
        let mut img = gray_ramp();
        let before = img.clone();

        assert!(SrgbCurveSplineConfig::new(Channel::Blue, &[0.0], &luts)
            .apply(&mut img)
            .is_err());
        assert_eq!(img, before);
    }

    #[test]
    fn test_direct_spline_inverts() {
        let mut img = gray_ramp();
        SplineCurveConfig::new(Channel::Green, &[0.0, 1.0, 1.0, 0.0])
            .apply(&mut img)
            .unwrap();

        assert!((img.get_pixel(0, 0)[1] - 1.0).abs() < 1e-5);
        assert!(img.get_pixel(255, 0)[1] < 2.0 / 1023.0);
        assert_eq!(img.get_pixel(0, 0)[0], 0.0);
    }

    #[test]
    fn test_srgb_spline_only_touches_channel() {
        let luts = SrgbLuts::build(DEFAULT_SAMPLES).unwrap();
        let mut img = Rgba32FImage::from_pixel(4, 4, Rgba([0.5, 0.5, 0.5, 0.25]));

        apply_srgb_curve_spline(&mut img, Channel::Red, &[0.0, 0.0, 0.5, 1.0, 1.0, 1.0], &luts)
            .unwrap();

        let p = img.get_pixel(1, 1);
        assert!(p[0] > 0.9);
        assert_eq!(p[1], 0.5);
        assert_eq!(p[3], 0.25);
    }

    #[test]
    fn test_curves_explicit_blue_only() {
        let lut = Lut::from_samples(vec![1.0, 1.0]).unwrap();
        let mut img = Rgba32FImage::from_pixel(1, 1, Rgba([0.2, 0.3, 0.4, 1.0]));
        CurvesConfig::new(Channel::Blue, lut).apply(&mut img).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0.2, 0.3, 1.0, 1.0]);
    }
}
