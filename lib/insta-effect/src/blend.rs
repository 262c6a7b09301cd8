//! Blend modes and the per-pixel compositing formula.

use crate::{ImageEffectError, ImageEffectResult, check_dimensions, selection::Coverage};
use image::{Rgba, Rgba32FImage};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Normal = 0,
    Multiply = 1,
    Screen = 2,
    Overlay = 3,
    SoftLight = 4,
    HardLight = 5,
    Dodge = 6,
    Replace = 7,
}

impl BlendMode {
    pub const ALL: [BlendMode; 8] = [
        Self::Normal,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::SoftLight,
        Self::HardLight,
        Self::Dodge,
        Self::Replace,
    ];

    pub fn from_raw(value: u8) -> ImageEffectResult<Self> {
        Self::try_from(value).map_err(|e| ImageEffectError::UnsupportedBlendMode(e.number))
    }

    /// Blend one colour channel. `b` is the backdrop, `s` the layer on top.
    pub fn blend_channel(self, b: f32, s: f32) -> f32 {
        match self {
            BlendMode::Normal | BlendMode::Replace => s,
            BlendMode::Multiply => b * s,
            BlendMode::Screen => screen(b, s),
            BlendMode::Overlay => overlay(b, s),
            BlendMode::SoftLight => (1.0 - b) * b * s + b * screen(b, s),
            BlendMode::HardLight => overlay(s, b),
            BlendMode::Dodge => {
                if s >= 1.0 {
                    1.0
                } else {
                    (b / (1.0 - s)).min(1.0)
                }
            }
        }
    }
}

fn screen(b: f32, s: f32) -> f32 {
    1.0 - (1.0 - b) * (1.0 - s)
}

fn overlay(b: f32, s: f32) -> f32 {
    if b <= 0.5 {
        2.0 * b * s
    } else {
        1.0 - 2.0 * (1.0 - b) * (1.0 - s)
    }
}

/// Composite `top` over `base`. `weight` is opacity (0..1) times mask coverage.
pub fn composite_pixel(base: Rgba<f32>, top: Rgba<f32>, mode: BlendMode, weight: f32) -> Rgba<f32> {
    let weight = weight.clamp(0.0, 1.0);
    let base_a = base[3].clamp(0.0, 1.0);

    if mode == BlendMode::Replace {
        let out_a = base_a + (top[3] - base_a) * weight;
        if out_a <= 0.0 {
            return Rgba([0.0, 0.0, 0.0, 0.0]);
        }

        let wb = base_a * (1.0 - weight);
        let wt = top[3] * weight;
        let mut out = [0.0; 4];
        for c in 0..3 {
            out[c] = ((base[c] * wb + top[c] * wt) / out_a).clamp(0.0, 1.0);
        }
        out[3] = out_a.clamp(0.0, 1.0);
        return Rgba(out);
    }

    let a = top[3].clamp(0.0, 1.0) * weight;
    if a <= 0.0 {
        return base;
    }

    let out_a = a + base_a * (1.0 - a);
    let mut out = [0.0; 4];
    for c in 0..3 {
        let blended = mode.blend_channel(base[c], top[c]);
        let v = a * (1.0 - base_a) * top[c] + a * base_a * blended + (1.0 - a) * base_a * base[c];
        out[c] = (v / out_a).clamp(0.0, 1.0);
    }
    out[3] = out_a.clamp(0.0, 1.0);
    Rgba(out)
}

/// Composite a whole buffer onto `base` in place.
pub fn composite(
    base: &mut Rgba32FImage,
    top: &Rgba32FImage,
    mode: BlendMode,
    opacity: f32,
    mask: Option<&Coverage>,
) -> ImageEffectResult<()> {
    check_dimensions(base.dimensions(), top.dimensions())?;
    if let Some(mask) = mask {
        check_dimensions(base.dimensions(), mask.dimensions())?;
    }

    let opacity = opacity.clamp(0.0, 1.0);
    for (x, y, pixel) in base.enumerate_pixels_mut() {
        let coverage = mask.map_or(1.0, |m| m.get_pixel(x, y)[0]);
        *pixel = composite_pixel(*pixel, *top.get_pixel(x, y), mode, opacity * coverage);
    }

    Ok(())
}
