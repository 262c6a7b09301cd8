use crate::{Effect, ImageEffectError, ImageEffectResult};
use derivative::Derivative;
use derive_setters::Setters;
use image::Rgba32FImage;
use std::f32::consts::FRAC_PI_4;

const EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesaturateMode {
    /// `(max + min) / 2`
    Lightness,
    /// `max`
    Value,
    /// Rec. 709 weights.
    Luma,
    Average,
}

impl DesaturateMode {
    fn gray(self, r: f32, g: f32, b: f32) -> f32 {
        match self {
            DesaturateMode::Lightness => (r.max(g).max(b) + r.min(g).min(b)) / 2.0,
            DesaturateMode::Value => r.max(g).max(b),
            DesaturateMode::Luma => 0.2126 * r + 0.7152 * g + 0.0722 * b,
            DesaturateMode::Average => (r + g + b) / 3.0,
        }
    }
}

/// Desaturate effect configuration
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct DesaturateConfig {
    #[derivative(Default(value = "DesaturateMode::Lightness"))]
    mode: DesaturateMode,
}

impl DesaturateConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for DesaturateConfig {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        for pixel in image.pixels_mut() {
            let gray = self.mode.gray(pixel[0], pixel[1], pixel[2]).clamp(0.0, 1.0);
            pixel[0] = gray;
            pixel[1] = gray;
            pixel[2] = gray;
        }

        Ok(())
    }
}

/// Hue/saturation over the whole hue range.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct HueSaturationConfig {
    /// Degrees, -180..=180.
    hue: f32,

    /// -100..=100
    lightness: f32,

    /// -100..=100
    saturation: f32,
}

impl HueSaturationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_pixel(&self, r: f32, g: f32, b: f32) -> [f32; 3] {
        let (mut h, mut s, mut l) = rgb_to_hsl(r, g, b);

        h = (h + self.hue / 360.0).rem_euclid(1.0);

        let sat = (self.saturation / 100.0).clamp(-1.0, 1.0);
        s = (s * (1.0 + sat)).clamp(0.0, 1.0);

        let v = (self.lightness / 100.0).clamp(-1.0, 1.0) / 2.0;
        l = if v < 0.0 { l * (v + 1.0) } else { l + v * (1.0 - l) };

        hsl_to_rgb(h, s, l)
    }
}

impl Effect for HueSaturationConfig {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        for pixel in image.pixels_mut() {
            let [r, g, b] = self.map_pixel(pixel[0], pixel[1], pixel[2]);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        }

        Ok(())
    }
}

/// Brightness/contrast, both in -1..=1.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct BrightnessContrastConfig {
    brightness: f32,
    contrast: f32,
}

impl BrightnessContrastConfig {
    pub fn new(brightness: f32, contrast: f32) -> Self {
        Self::default()
            .with_brightness(brightness)
            .with_contrast(contrast)
    }

    pub fn map(&self, value: f32) -> f32 {
        let brightness = self.brightness.clamp(-1.0, 1.0) / 2.0;
        let slant = ((self.contrast.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4).tan();

        let mut v = if brightness < 0.0 {
            value * (1.0 + brightness)
        } else {
            value + (1.0 - value) * brightness
        };
        v = (v - 0.5) * slant + 0.5;
        v.clamp(0.0, 1.0)
    }
}

impl Effect for BrightnessContrastConfig {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        for pixel in image.pixels_mut() {
            for c in 0..3 {
                pixel[c] = self.map(pixel[c]);
            }
        }

        Ok(())
    }
}

/// Turn pixels close to `color` transparent, restoring the remaining colour
/// so that compositing over `color` gives the original back.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ColorToAlphaConfig {
    #[derivative(Default(value = "[1.0, 1.0, 1.0]"))]
    color: [f32; 3],

    #[derivative(Default(value = "0.0"))]
    transparency_threshold: f32,

    #[derivative(Default(value = "1.0"))]
    opacity_threshold: f32,
}

impl ColorToAlphaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_pixel(&self, src: [f32; 4]) -> [f32; 4] {
        let color = self.color;
        let (tt, ot) = (self.transparency_threshold, self.opacity_threshold);
        let mut dst = src;
        let mut alpha = 0.0f32;
        let mut dist = 0.0f32;

        for i in 0..3 {
            let d = (dst[i] - color[i]).abs();
            let a = if d < tt + EPSILON {
                0.0
            } else if d > ot - EPSILON {
                1.0
            } else if dst[i] < color[i] {
                (d - tt) / (ot.min(color[i]) - tt)
            } else {
                (d - tt) / (ot.min(1.0 - color[i]) - tt)
            };

            if a > alpha {
                alpha = a;
                dist = d;
            }
        }

        if alpha > EPSILON {
            let ratio = tt / dist;
            for i in 0..3 {
                let c = color[i] + (dst[i] - color[i]) * ratio;
                dst[i] = (c + (dst[i] - c) / alpha).clamp(0.0, 1.0);
            }
        }

        dst[3] *= alpha.clamp(0.0, 1.0);
        dst
    }
}

impl Effect for ColorToAlphaConfig {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        if self.opacity_threshold <= self.transparency_threshold {
            return Err(ImageEffectError::InvalidParameter(format!(
                "opacity threshold {} must exceed transparency threshold {}",
                self.opacity_threshold, self.transparency_threshold
            )));
        }

        for pixel in image.pixels_mut() {
            pixel.0 = self.map_pixel(pixel.0);
        }

        Ok(())
    }
}

pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let delta = max - min;
    let s = if l <= 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let h = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    (h / 6.0, s, l)
}

pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s == 0.0 {
        return [l, l, l];
    }

    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    let v = if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    };
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_desaturate_modes() {
        assert!(approx(DesaturateMode::Lightness.gray(0.8, 0.4, 0.2), 0.5));
        assert!(approx(DesaturateMode::Value.gray(0.8, 0.4, 0.2), 0.8));
        assert!(approx(DesaturateMode::Average.gray(0.9, 0.3, 0.0), 0.4));

        let mut img = Rgba32FImage::from_pixel(1, 1, Rgba([0.8, 0.4, 0.2, 0.5]));
        DesaturateConfig::new().apply(&mut img).unwrap();
        let p = img.get_pixel(0, 0);
        assert!(approx(p[0], 0.5) && p[0] == p[1] && p[1] == p[2]);
        assert_eq!(p[3], 0.5);
    }

    #[test]
    fn test_luma_and_average_weigh_channels() {
        let green = Rgba([0.0, 1.0, 0.0, 1.0]);

        let mut img = Rgba32FImage::from_pixel(1, 1, green);
        DesaturateConfig::new()
            .with_mode(DesaturateMode::Luma)
            .apply(&mut img)
            .unwrap();
        assert!(approx(img.get_pixel(0, 0)[0], 0.7152));

        let mut img = Rgba32FImage::from_pixel(1, 1, green);
        DesaturateConfig::new()
            .with_mode(DesaturateMode::Average)
            .apply(&mut img)
            .unwrap();
        assert!(approx(img.get_pixel(0, 0)[1], 1.0 / 3.0));
    }

    #[test]
    fn test_hsl_round_trip() {
        for rgb in [[0.8, 0.4, 0.2], [0.1, 0.9, 0.5], [0.3, 0.3, 0.7], [0.5, 0.5, 0.5]] {
            let (h, s, l) = rgb_to_hsl(rgb[0], rgb[1], rgb[2]);
            let back = hsl_to_rgb(h, s, l);
            for c in 0..3 {
                assert!(approx(back[c], rgb[c]), "{rgb:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn test_hue_shift_rotates_primaries() {
        let config = HueSaturationConfig::new().with_hue(120.0);
        let [r, g, b] = config.map_pixel(1.0, 0.0, 0.0);
        assert!(approx(r, 0.0) && approx(g, 1.0) && approx(b, 0.0));
    }

    #[test]
    fn test_saturation_and_lightness() {
        let gray = HueSaturationConfig::new().with_saturation(-100.0);
        let [r, g, b] = gray.map_pixel(0.8, 0.4, 0.2);
        assert!(approx(r, 0.5) && approx(g, 0.5) && approx(b, 0.5));

        let darker = HueSaturationConfig::new().with_lightness(-100.0);
        let [r, _, _] = darker.map_pixel(0.6, 0.6, 0.6);
        assert!(approx(r, 0.3));

        let lighter = HueSaturationConfig::new().with_lightness(100.0);
        let [r, _, _] = lighter.map_pixel(0.6, 0.6, 0.6);
        assert!(approx(r, 0.8));
    }

    #[test]
    fn test_brightness_contrast_darkens_and_stretches() {
        let config = BrightnessContrastConfig::new(-0.15, 0.15);
        assert!(approx(config.map(0.5), 0.4525));
        assert!(config.map(0.5) < 0.5);

        // Stretch: spacing around mid gray grows.
        let spread = config.map(0.6) - config.map(0.4);
        assert!(spread > 0.2 * 0.925);
        assert_eq!(config.map(1.0), 1.0);

        let neutral = BrightnessContrastConfig::new(0.0, 0.0);
        assert!(approx(neutral.map(0.37), 0.37));
    }

    #[test]
    fn test_color_to_alpha_white() {
        let config = ColorToAlphaConfig::new().with_opacity_threshold(0.78);

        assert_eq!(config.map_pixel([1.0, 1.0, 1.0, 1.0])[3], 0.0);
        assert_eq!(config.map_pixel([0.0, 0.0, 0.0, 1.0]), [0.0, 0.0, 0.0, 1.0]);

        // Half way to the threshold: alpha 0.5 and colour pushed away from white.
        let out = config.map_pixel([0.61, 0.61, 0.61, 1.0]);
        assert!(approx(out[3], 0.5));
        assert!(approx(out[0], 0.22));
    }

    #[test]
    fn test_color_to_alpha_rejects_bad_thresholds() {
        let config = ColorToAlphaConfig::new()
            .with_transparency_threshold(0.5)
            .with_opacity_threshold(0.5);
        let mut img = Rgba32FImage::new(1, 1);
        assert!(config.apply(&mut img).is_err());
    }
}
