//! sRGB / linear lookup tables used to route curve adjustments through
//! linear light.
//!
//! The table names follow the curve pipeline they were tuned for:
//! `to_linear` holds the piecewise gamma *encoding* and `to_srgb` holds the
//! *decoding*. Downstream presets depend on this exact pairing, so the
//! formulas are kept as they are.

use crate::{ImageEffectError, ImageEffectResult};

pub const DEFAULT_SAMPLES: usize = 1024;

/// `x < 0.0031308 → 12.92·x`, else `1.055·x^(1/2.4) − 0.055`.
pub fn encode_gamma(x: f32) -> f32 {
    if x < 0.0031308 {
        x * 12.92
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

/// `x < 0.04045 → x / 12.92`, else `((x + 0.055) / 1.055)^2.4`.
pub fn decode_gamma(x: f32) -> f32 {
    if x < 0.04045 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

/// A 1D table sampled uniformly over [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    samples: Vec<f32>,
}

impl Lut {
    pub fn from_fn(sample_count: usize, f: impl Fn(f32) -> f32) -> ImageEffectResult<Self> {
        if sample_count < 2 {
            return Err(ImageEffectError::InvalidParameter(format!(
                "LUT needs at least 2 samples, got {sample_count}"
            )));
        }

        let sc = (sample_count - 1) as f32;
        let samples = (0..sample_count).map(|i| f(i as f32 / sc)).collect();
        Ok(Self { samples })
    }

    pub fn from_samples(samples: Vec<f32>) -> ImageEffectResult<Self> {
        if samples.len() < 2 {
            return Err(ImageEffectError::InvalidParameter(format!(
                "LUT needs at least 2 samples, got {}",
                samples.len()
            )));
        }

        Ok(Self { samples })
    }

    /// Nearest-below lookup: `lut[floor(v * (N - 1))]`, index clamped.
    pub fn lookup(&self, value: f32) -> f32 {
        let last = self.samples.len() - 1;
        let index = (value.clamp(0.0, 1.0) * last as f32) as usize;
        self.samples[index.min(last)]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

#[derive(Debug, Clone)]
pub struct SrgbLuts {
    pub to_linear: Lut,
    pub to_srgb: Lut,
}

impl SrgbLuts {
    pub fn build(sample_count: usize) -> ImageEffectResult<Self> {
        Ok(Self {
            to_linear: Lut::from_fn(sample_count, encode_gamma)?,
            to_srgb: Lut::from_fn(sample_count, decode_gamma)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_endpoints() {
        let luts = SrgbLuts::build(DEFAULT_SAMPLES).unwrap();
        assert_eq!(luts.to_linear.len(), 1024);
        assert_eq!(luts.to_srgb.len(), 1024);

        assert_eq!(luts.to_linear.samples()[0], 0.0);
        assert_eq!(luts.to_srgb.samples()[0], 0.0);
        assert!((luts.to_linear.samples()[1023] - 1.0).abs() < 1e-5);
        assert!((luts.to_srgb.samples()[1023] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_formulas_match_branches() {
        // Linear segment of each branch.
        assert!((encode_gamma(0.001) - 0.01292).abs() < 1e-7);
        assert!((decode_gamma(0.02) - 0.02 / 12.92).abs() < 1e-7);

        // Power segment: mid gray.
        assert!((encode_gamma(0.5) - 0.735_356_6).abs() < 1e-4);
        assert!((decode_gamma(0.5) - 0.214_041_1).abs() < 1e-4);
    }

    #[test]
    fn test_round_trip_within_quantization() {
        for sample_count in [2usize, 16, 256, 1024, 4096] {
            let luts = SrgbLuts::build(sample_count).unwrap();
            let step = 1.0 / (sample_count - 1) as f32;

            for i in 0..=200 {
                let x = i as f32 / 200.0;
                let back = luts.to_srgb.lookup(luts.to_linear.lookup(x));
                // Two nearest-below lookups drift by at most ~3.04 steps (N=256..1024).
                assert!(
                    (back - x).abs() <= 4.0 * step + 1e-6,
                    "n={sample_count} x={x} back={back}"
                );
            }
        }
    }

    #[test]
    fn test_lookup_is_nearest_below_and_idempotent() {
        let lut = Lut::from_samples(vec![0.0, 0.25, 0.5, 1.0]).unwrap();
        assert_eq!(lut.lookup(0.0), 0.0);
        assert_eq!(lut.lookup(0.3), 0.0);
        assert_eq!(lut.lookup(0.34), 0.25);
        assert_eq!(lut.lookup(0.99), 0.5);
        assert_eq!(lut.lookup(1.0), 1.0);
        assert_eq!(lut.lookup(7.0), 1.0);
        assert_eq!(lut.lookup(-1.0), 0.0);
        assert_eq!(lut.lookup(0.6), lut.lookup(0.6));
    }

    #[test]
    fn test_rejects_degenerate_size() {
        assert!(matches!(
            SrgbLuts::build(1),
            Err(ImageEffectError::InvalidParameter(_))
        ));
        assert!(Lut::from_samples(vec![0.5]).is_err());
    }
}
