//! Solid and gradient fills driven by an immutable paint context.

use crate::{
    ImageEffectResult,
    blend::{BlendMode, composite_pixel},
    check_dimensions,
    colour_lut::{decode_gamma, encode_gamma},
    selection::{Coverage, Selection},
};
use derive_setters::Setters;
use image::{Rgba, Rgba32FImage};

/// How a gradient turns its parameter `t` into a colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientColors {
    /// Foreground colour, alpha fading from 1 to 0.
    #[default]
    FgTransparent,
    /// Opaque blend from foreground to background in linear light.
    FgToBg,
}

/// Painting state shared by fills and gradients.
#[derive(Debug, Clone, Copy, PartialEq, Setters)]
#[setters(prefix = "with_")]
pub struct PaintContext {
    pub mode: BlendMode,
    /// 0..=100
    pub opacity: f32,
    pub foreground: [f32; 3],
    pub background: [f32; 3],
    pub reverse: bool,
    pub colors: GradientColors,
}

impl PaintContext {
    pub const DEFAULT: PaintContext = PaintContext {
        mode: BlendMode::Normal,
        opacity: 100.0,
        foreground: [0.0, 0.0, 0.0],
        background: [1.0, 1.0, 1.0],
        reverse: false,
        colors: GradientColors::FgTransparent,
    };

    fn weight(&self) -> f32 {
        self.opacity.clamp(0.0, 100.0) / 100.0
    }

    fn gradient_colour(&self, t: f32) -> Rgba<f32> {
        let t = if self.reverse { 1.0 - t } else { t };
        let fg = self.foreground;

        match self.colors {
            GradientColors::FgTransparent => Rgba([fg[0], fg[1], fg[2], 1.0 - t]),
            GradientColors::FgToBg => {
                let bg = self.background;
                let mut out = [0.0, 0.0, 0.0, 1.0];
                for c in 0..3 {
                    let a = decode_gamma(fg[c]);
                    let b = decode_gamma(bg[c]);
                    out[c] = encode_gamma(a + (b - a) * t).clamp(0.0, 1.0);
                }
                Rgba(out)
            }
        }
    }
}

impl Default for PaintContext {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    /// Ramps along the start→end direction.
    Linear,
    /// Like linear but mirrored around the start point.
    Bilinear,
    /// Ramps with distance from the start point; end sets the radius.
    Radial,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    pub start: (f32, f32),
    pub end: (f32, f32),
}

impl Gradient {
    pub fn new(kind: GradientKind, start: (f32, f32), end: (f32, f32)) -> Self {
        Self { kind, start, end }
    }

    /// Gradient parameter at a point, clamped to [0, 1]. A zero-length
    /// gradient yields 1 everywhere.
    pub fn t_at(&self, x: f32, y: f32) -> f32 {
        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        let len_sq = dx * dx + dy * dy;
        if len_sq <= 0.0 {
            return 1.0;
        }

        let (px, py) = (x - self.start.0, y - self.start.1);
        let t = match self.kind {
            GradientKind::Linear => (px * dx + py * dy) / len_sq,
            GradientKind::Bilinear => ((px * dx + py * dy) / len_sq).abs(),
            GradientKind::Radial => ((px * px + py * py) / len_sq).sqrt(),
        };

        t.clamp(0.0, 1.0)
    }
}

fn coverage_at(selection: Option<&Selection>, x: u32, y: u32) -> f32 {
    selection.map_or(1.0, |s| s.value(x, y))
}

fn check_selection(pixels: (u32, u32), selection: Option<&Selection>) -> ImageEffectResult<()> {
    match selection {
        Some(sel) => check_dimensions(pixels, sel.dimensions()),
        None => Ok(()),
    }
}

/// Paint the foreground colour with the context mode and opacity.
pub fn fill(
    pixels: &mut Rgba32FImage,
    ctx: &PaintContext,
    selection: Option<&Selection>,
) -> ImageEffectResult<()> {
    check_selection(pixels.dimensions(), selection)?;

    let fg = ctx.foreground;
    let top = Rgba([fg[0], fg[1], fg[2], 1.0]);
    let weight = ctx.weight();

    for (x, y, pixel) in pixels.enumerate_pixels_mut() {
        let coverage = coverage_at(selection, x, y);
        if coverage > 0.0 {
            *pixel = composite_pixel(*pixel, top, ctx.mode, weight * coverage);
        }
    }

    Ok(())
}

/// Move mask values toward `gray` by selection coverage.
pub fn fill_mask(
    mask: &mut Coverage,
    gray: f32,
    selection: Option<&Selection>,
) -> ImageEffectResult<()> {
    check_selection(mask.dimensions(), selection)?;

    let gray = gray.clamp(0.0, 1.0);
    for (x, y, p) in mask.enumerate_pixels_mut() {
        let coverage = coverage_at(selection, x, y);
        p[0] += (gray - p[0]) * coverage;
    }

    Ok(())
}

/// Paint `gradient` through the context, sampled at pixel centres.
pub fn gradient_fill(
    pixels: &mut Rgba32FImage,
    ctx: &PaintContext,
    gradient: &Gradient,
    selection: Option<&Selection>,
) -> ImageEffectResult<()> {
    check_selection(pixels.dimensions(), selection)?;

    let weight = ctx.weight();
    for (x, y, pixel) in pixels.enumerate_pixels_mut() {
        let coverage = coverage_at(selection, x, y);
        if coverage <= 0.0 {
            continue;
        }

        let t = gradient.t_at(x as f32 + 0.5, y as f32 + 0.5);
        let top = ctx.gradient_colour(t);
        *pixel = composite_pixel(*pixel, top, ctx.mode, weight * coverage);
    }

    Ok(())
}
