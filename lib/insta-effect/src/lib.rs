pub mod base_effect;
pub mod blend;
pub mod blur_effect;
pub mod channel_effect;
pub mod colour_lut;
pub mod document;
pub mod layer;
pub mod noise_effect;
pub mod paint;
pub mod preset_filter;
pub mod preset_filter_effect;
pub mod selection;
pub mod vignette;

use image::{Rgba, Rgba32FImage, RgbaImage};

pub use blend::BlendMode;
pub use document::Document;
pub use layer::{LayerId, MaskFill};
pub use paint::{Gradient, GradientColors, GradientKind, PaintContext};
pub use preset_filter::Preset;
pub use preset_filter_effect::PresetFilterConfig;
pub use selection::Selection;
pub use vignette::VignetteShape;

pub type ImageEffectResult<T> = Result<T, ImageEffectError>;

#[derive(thiserror::Error, Debug)]
pub enum ImageEffectError {
    #[error("Unknown preset: {0}")]
    InvalidPreset(String),
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Unsupported blend mode: {0}")]
    UnsupportedBlendMode(u8),
    #[error("Layer not found: {0}")]
    LayerNotFound(LayerId),
    #[error("Nothing to merge below layer {0}")]
    NothingToMerge(LayerId),
    #[error("Not a layer group: {0}")]
    NotAGroup(LayerId),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// A per-pixel or spatial transform applied to one layer's buffer.
pub trait Effect {
    fn apply(&self, image: &mut Rgba32FImage) -> ImageEffectResult<()>;
}

/// Apply the preset named `name` (identifier or label, case-insensitive).
///
/// The source image is never touched; the flattened result is returned.
pub fn apply_effect(image: &RgbaImage, name: &str) -> ImageEffectResult<RgbaImage> {
    let preset: Preset = name.parse()?;
    apply_preset(image, preset)
}

pub fn apply_preset(image: &RgbaImage, preset: Preset) -> ImageEffectResult<RgbaImage> {
    PresetFilterConfig::new().with_preset(preset).apply(image)
}

/// Apply a preset and replace `image` only if every step succeeded.
pub fn apply_effect_in_place(image: &mut RgbaImage, name: &str) -> ImageEffectResult<()> {
    let output = apply_effect(image, name)?;
    *image = output;
    Ok(())
}

pub fn to_rgba32f(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Rgba([
            p[0] as f32 / 255.0,
            p[1] as f32 / 255.0,
            p[2] as f32 / 255.0,
            p[3] as f32 / 255.0,
        ])
    })
}

pub fn to_rgba8(image: &Rgba32FImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Rgba([
            quantize(p[0]),
            quantize(p[1]),
            quantize(p[2]),
            quantize(p[3]),
        ])
    })
}

fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn check_dimensions(expected: (u32, u32), actual: (u32, u32)) -> ImageEffectResult<()> {
    if expected != actual {
        return Err(ImageEffectError::DimensionMismatch { expected, actual });
    }

    Ok(())
}
