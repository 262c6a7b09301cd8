use crate::{
    Effect, ImageEffectError, ImageEffectResult,
    colour_lut::{decode_gamma, encode_gamma},
};
use derivative::Derivative;
use derive_setters::Setters;
use image::{Rgba, Rgba32FImage};

/// Linear motion blur configuration
///
/// Samples are spread evenly along a line of `length` pixels centred on each
/// pixel and averaged in premultiplied linear light. Reads past the border
/// repeat the edge pixels.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct MotionBlurConfig {
    #[derivative(Default(value = "256.0"))]
    length: f32,

    /// Degrees.
    #[derivative(Default(value = "0.0"))]
    angle: f32,
}

impl MotionBlurConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for MotionBlurConfig {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()> {
        if !self.length.is_finite() || self.length < 0.0 {
            return Err(ImageEffectError::InvalidParameter(format!(
                "motion blur length must be non-negative, got {}",
                self.length
            )));
        }

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || self.length == 0.0 {
            return Ok(());
        }

        let premultiplied = Rgba32FImage::from_fn(width, height, |x, y| {
            let p = image.get_pixel(x, y);
            let a = p[3];
            Rgba([
                decode_gamma(p[0]) * a,
                decode_gamma(p[1]) * a,
                decode_gamma(p[2]) * a,
                a,
            ])
        });

        let angle = self.angle.to_radians();
        let offset_x = self.length * angle.cos();
        let offset_y = self.length * angle.sin();
        let num_steps = self.length.ceil() as usize + 1;

        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let mut sum = [0.0f32; 4];

            for step in 0..num_steps {
                let t = if num_steps == 1 {
                    0.0
                } else {
                    step as f32 / (num_steps - 1) as f32 - 0.5
                };

                let sample = sample_bilinear(
                    &premultiplied,
                    x as f32 + t * offset_x,
                    y as f32 + t * offset_y,
                );
                for c in 0..4 {
                    sum[c] += sample[c];
                }
            }

            let n = num_steps as f32;
            let a = sum[3] / n;
            *pixel = if a > 0.0 {
                Rgba([
                    encode_gamma(sum[0] / n / a).clamp(0.0, 1.0),
                    encode_gamma(sum[1] / n / a).clamp(0.0, 1.0),
                    encode_gamma(sum[2] / n / a).clamp(0.0, 1.0),
                    a.clamp(0.0, 1.0),
                ])
            } else {
                Rgba([0.0, 0.0, 0.0, 0.0])
            };
        }

        Ok(())
    }
}

fn sample_bilinear(image: &Rgba32FImage, x: f32, y: f32) -> [f32; 4] {
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let ix = x0 as i64;
    let iy = y0 as i64;
    let get = |px: i64, py: i64| {
        image.get_pixel(px.clamp(0, max_x) as u32, py.clamp(0, max_y) as u32)
    };

    let p00 = get(ix, iy);
    let p10 = get(ix + 1, iy);
    let p01 = get(ix, iy + 1);
    let p11 = get(ix + 1, iy + 1);

    let mut out = [0.0; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * fx;
        let bottom = p01[c] + (p11[c] - p01[c]) * fx;
        out[c] = top + (bottom - top) * fy;
    }
    out
}
