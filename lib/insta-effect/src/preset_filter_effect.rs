//! Recipe tables for every preset and the interpreter that runs them.
//!
//! Each preset is a fixed list of [`Step`]s. Running a preset builds a scratch
//! [`Document`] whose background is the input image, adds a "<Label> Group"
//! on top of it, snapshots the visible image into that group as "Layer 1",
//! executes the steps in order and flattens the result.

use crate::{
    ImageEffectError, ImageEffectResult,
    base_effect::{
        BrightnessContrastConfig, ColorToAlphaConfig, DesaturateConfig, DesaturateMode,
        HueSaturationConfig,
    },
    blend::BlendMode,
    blur_effect::MotionBlurConfig,
    channel_effect::{Channel, Levels, LevelsConfig, SrgbCurveSplineConfig},
    colour_lut::{DEFAULT_SAMPLES, SrgbLuts},
    document::Document,
    layer::{LayerId, MaskFill},
    noise_effect::RgbNoiseConfig,
    paint::{Gradient, GradientColors, GradientKind, PaintContext},
    preset_filter::{LayerRole, Preset},
    to_rgba8,
    vignette::{DEFAULT_FEATHER_RATIO, VignetteShape, create_vignette_layer, select_ellipse},
};
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;
use std::collections::HashMap;

/// A point given as fractions of the canvas width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor(pub f32, pub f32);

impl Anchor {
    pub const ORIGIN: Anchor = Anchor(0.0, 0.0);
    pub const CENTER: Anchor = Anchor(0.5, 0.5);
    pub const INSIDE: Anchor = Anchor(0.95, 0.5);
    pub const OUTSIDE: Anchor = Anchor(1.5, 0.5);
    pub const LEFT_CENTER: Anchor = Anchor(0.0, 0.5);
    pub const EDGE: Anchor = Anchor(1.0, 0.5);

    pub fn resolve(self, width: u32, height: u32) -> (f32, f32) {
        (self.0 * width as f32, self.1 * height as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Spline curve evaluated in linear light.
    Curve {
        target: LayerRole,
        channel: Channel,
        points: &'static [f32],
    },
    Levels {
        target: LayerRole,
        channel: Channel,
        levels: Levels,
    },
    BrightnessContrast {
        target: LayerRole,
        brightness: f32,
        contrast: f32,
    },
    HueSaturation {
        target: LayerRole,
        hue: f32,
        lightness: f32,
        saturation: f32,
    },
    Desaturate {
        target: LayerRole,
        mode: DesaturateMode,
    },
    /// White to alpha with the given opacity threshold.
    ColorToAlpha {
        target: LayerRole,
        opacity_threshold: f32,
    },
    MotionBlur {
        target: LayerRole,
    },
    Noise {
        target: LayerRole,
        amount: f32,
    },
    /// Copy of the source image, optionally desaturated by value.
    Duplicate {
        role: LayerRole,
        mode: BlendMode,
        desaturate: bool,
        opacity: f32,
    },
    /// New layer filled with a solid colour.
    ColorLayer {
        role: LayerRole,
        opacity: f32,
        mode: BlendMode,
        colour: [f32; 3],
    },
    EmptyLayer {
        role: LayerRole,
        opacity: f32,
        mode: BlendMode,
    },
    Vignette {
        shape: VignetteShape,
        opacity: f32,
        mode: BlendMode,
        colour: [f32; 3],
    },
    Gradient {
        target: LayerRole,
        paint: PaintContext,
        kind: GradientKind,
        start: Anchor,
        end: Anchor,
    },
    AddMask {
        target: LayerRole,
        fill: MaskFill,
    },
    /// Paint `gray` into the target's mask inside a feathered ellipse.
    MaskEllipse {
        target: LayerRole,
        shape: VignetteShape,
        gray: f32,
    },
    /// Merge the target down; the surviving layer takes the `Merged` role.
    MergeDown {
        target: LayerRole,
        rename: bool,
    },
    SetOpacity {
        target: LayerRole,
        opacity: f32,
    },
}

const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

const AMARO: &[Step] = &[
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Red,
        points: &[0.0, 30.0 / 255.0, 156.0 / 255.0, 196.0 / 255.0, 205.0 / 255.0, 203.0 / 255.0, 1.0, 1.0],
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Green,
        points: &[
            0.0, 0.0, 61.0 / 255.0, 67.0 / 255.0, 139.0 / 255.0, 184.0 / 255.0, 200.0 / 255.0, 206.0 / 255.0, 1.0, 1.0,
        ],
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Blue,
        points: &[0.0, 20.0 / 255.0, 146.0 / 255.0, 184.0 / 255.0, 220.0 / 255.0, 222.0 / 255.0, 1.0, 1.0],
    },
    Step::ColorToAlpha {
        target: LayerRole::Layer1,
        opacity_threshold: 0.78,
    },
    Step::Vignette {
        shape: VignetteShape::Standard,
        opacity: 60.0,
        mode: BlendMode::Normal,
        colour: BLACK,
    },
];

const APOLLO: &[Step] = &[
    Step::Duplicate {
        role: LayerRole::BlackAndWhite,
        mode: BlendMode::Normal,
        desaturate: true,
        opacity: 50.0,
    },
    Step::Vignette {
        shape: VignetteShape::Large,
        opacity: 40.0,
        mode: BlendMode::Normal,
        colour: BLACK,
    },
    Step::ColorLayer {
        role: LayerRole::Color,
        opacity: 50.0,
        mode: BlendMode::Overlay,
        colour: [0.243, 0.804, 0.165],
    },
];

const BRANNAN: &[Step] = &[
    Step::Duplicate {
        role: LayerRole::Layer2,
        mode: BlendMode::Overlay,
        desaturate: true,
        opacity: 37.0,
    },
    Step::HueSaturation {
        target: LayerRole::Layer2,
        hue: 0.0,
        lightness: 0.0,
        saturation: -30.0,
    },
    Step::MergeDown {
        target: LayerRole::Layer2,
        rename: true,
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Value,
        levels: Levels::new(1.0, 1.0, 9.0 / 255.0),
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Red,
        levels: Levels::new(228.0 / 255.0, 1.0, 23.0 / 255.0),
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Green,
        levels: Levels::new(1.0, 1.0, 3.0 / 255.0),
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Blue,
        levels: Levels::new(239.0 / 255.0, 1.0, 12.0 / 255.0),
    },
    Step::BrightnessContrast {
        target: LayerRole::Merged,
        brightness: -0.08,
        contrast: 0.25,
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Value,
        levels: Levels::new(1.0, 0.91, 7.0 / 255.0),
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Red,
        levels: Levels::new(1.0, 1.0, 9.0 / 255.0),
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Green,
        levels: Levels::new(224.0 / 255.0, 1.0, 3.0 / 255.0),
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Blue,
        levels: Levels::new(1.0, 0.94, 18.0 / 255.0),
    },
    Step::BrightnessContrast {
        target: LayerRole::Merged,
        brightness: -0.04,
        contrast: -0.15,
    },
    Step::SetOpacity {
        target: LayerRole::Merged,
        opacity: 40.0,
    },
    Step::ColorLayer {
        role: LayerRole::Color,
        opacity: 35.0,
        mode: BlendMode::Multiply,
        colour: [0.99, 0.830, 0.480],
    },
];

const EARLYBIRD: &[Step] = &[
    Step::HueSaturation {
        target: LayerRole::Layer1,
        hue: 0.0,
        lightness: 1.0,
        saturation: -30.0,
    },
    Step::Levels {
        target: LayerRole::Layer1,
        channel: Channel::Value,
        levels: Levels::new(1.0, 1.2, 0.0),
    },
    Step::Levels {
        target: LayerRole::Layer1,
        channel: Channel::Red,
        levels: Levels::new(1.0, 1.0, 25.0 / 255.0),
    },
    Step::BrightnessContrast {
        target: LayerRole::Layer1,
        brightness: 0.08,
        contrast: 0.20,
    },
    Step::HueSaturation {
        target: LayerRole::Layer1,
        hue: 0.0,
        lightness: 0.0,
        saturation: -15.0,
    },
    Step::Levels {
        target: LayerRole::Layer1,
        channel: Channel::Value,
        levels: Levels::new(235.0 / 255.0, 0.9, 0.0),
    },
    Step::ColorLayer {
        role: LayerRole::Color,
        opacity: 100.0,
        mode: BlendMode::Multiply,
        colour: [1.0, 240.0 / 255.0, 205.0 / 255.0],
    },
    Step::Vignette {
        shape: VignetteShape::Standard,
        opacity: 6.0,
        mode: BlendMode::Normal,
        colour: [0.722, 0.722, 0.722],
    },
];

const GOTHAM: &[Step] = &[
    Step::Desaturate {
        target: LayerRole::Layer1,
        mode: DesaturateMode::Lightness,
    },
    Step::Duplicate {
        role: LayerRole::Layer2,
        mode: BlendMode::HardLight,
        desaturate: false,
        opacity: 100.0,
    },
    Step::Curve {
        target: LayerRole::Layer2,
        channel: Channel::Blue,
        points: &[
            0.0, 0.0, 63.0 / 255.0, 98.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 189.0 / 255.0, 159.0 / 255.0, 1.0, 1.0,
        ],
    },
    Step::Duplicate {
        role: LayerRole::Layer3,
        mode: BlendMode::Screen,
        desaturate: false,
        opacity: 75.0,
    },
    Step::MotionBlur {
        target: LayerRole::Layer3,
    },
    Step::Noise {
        target: LayerRole::Layer3,
        amount: 0.10,
    },
];

const INKWELL: &[Step] = &[
    Step::Desaturate {
        target: LayerRole::Layer1,
        mode: DesaturateMode::Lightness,
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Value,
        points: &[0.0, 0.0, 0.051, 0.0, 0.325, 0.490, 0.698, 0.859, 1.0, 1.0],
    },
    Step::BrightnessContrast {
        target: LayerRole::Layer1,
        brightness: -0.15,
        contrast: 0.15,
    },
];

const LORDKELVIN: &[Step] = &[
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Value,
        points: &[10.0 / 255.0, 0.0, 1.0, 1.0],
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Red,
        points: &[0.0, 63.0 / 255.0, 100.0 / 255.0, 200.0 / 255.0, 1.0, 1.0],
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Green,
        points: &[0.0, 30.0 / 255.0, 180.0 / 255.0, 190.0 / 255.0, 1.0, 210.0 / 255.0],
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Blue,
        points: &[0.0, 90.0 / 255.0, 177.0 / 255.0, 114.0 / 255.0, 1.0, 188.0 / 255.0],
    },
];

const POPROCKET: &[Step] = &[
    Step::Vignette {
        shape: VignetteShape::None,
        opacity: 100.0,
        mode: BlendMode::Screen,
        colour: BLACK,
    },
    Step::Gradient {
        target: LayerRole::Vignette,
        paint: PaintContext {
            foreground: [0.900, 0.153, 0.274],
            ..PaintContext::DEFAULT
        },
        kind: GradientKind::Radial,
        start: Anchor::CENTER,
        end: Anchor::INSIDE,
    },
    Step::ColorToAlpha {
        target: LayerRole::Vignette,
        opacity_threshold: 1.0,
    },
    Step::Vignette {
        shape: VignetteShape::None,
        opacity: 100.0,
        mode: BlendMode::SoftLight,
        colour: BLACK,
    },
    Step::Gradient {
        target: LayerRole::Vignette,
        paint: PaintContext {
            mode: BlendMode::Overlay,
            reverse: true,
            foreground: [0.059, 0.019, 0.180],
            ..PaintContext::DEFAULT
        },
        kind: GradientKind::Radial,
        start: Anchor::CENTER,
        end: Anchor::OUTSIDE,
    },
];

const RISE: &[Step] = &[
    Step::HueSaturation {
        target: LayerRole::Layer1,
        hue: 20.0,
        lightness: 0.0,
        saturation: -50.0,
    },
    Step::Levels {
        target: LayerRole::Layer1,
        channel: Channel::Value,
        levels: Levels::new(1.0, 1.23, 0.0),
    },
    Step::Vignette {
        shape: VignetteShape::Oblate,
        opacity: 100.0,
        mode: BlendMode::Overlay,
        colour: BLACK,
    },
    Step::Gradient {
        target: LayerRole::Vignette,
        paint: PaintContext {
            mode: BlendMode::Overlay,
            ..PaintContext::DEFAULT
        },
        kind: GradientKind::Radial,
        start: Anchor::CENTER,
        end: Anchor::OUTSIDE,
    },
    Step::ColorLayer {
        role: LayerRole::Noise,
        opacity: 20.0,
        mode: BlendMode::Screen,
        colour: BLACK,
    },
    Step::Noise {
        target: LayerRole::Noise,
        amount: 0.50,
    },
    Step::ColorLayer {
        role: LayerRole::Color,
        opacity: 50.0,
        mode: BlendMode::Overlay,
        colour: [0.929, 0.541, 0.0],
    },
];

const TOASTER: &[Step] = &[
    Step::Duplicate {
        role: LayerRole::Layer2,
        mode: BlendMode::Normal,
        desaturate: false,
        opacity: 100.0,
    },
    Step::Curve {
        target: LayerRole::Layer2,
        channel: Channel::Value,
        points: &[25.0 / 255.0, 0.0, 1.0, 1.0],
    },
    Step::AddMask {
        target: LayerRole::Layer2,
        fill: MaskFill::White,
    },
    Step::MaskEllipse {
        target: LayerRole::Layer2,
        shape: VignetteShape::Standard,
        gray: 0.0,
    },
    Step::Duplicate {
        role: LayerRole::Gradient,
        mode: BlendMode::Normal,
        desaturate: false,
        opacity: 70.0,
    },
    Step::Gradient {
        target: LayerRole::Gradient,
        paint: PaintContext {
            opacity: 30.0,
            foreground: [0.227, 0.040, 0.349],
            background: [0.995, 0.663, 0.341],
            colors: GradientColors::FgToBg,
            ..PaintContext::DEFAULT
        },
        kind: GradientKind::Bilinear,
        start: Anchor::LEFT_CENTER,
        end: Anchor::EDGE,
    },
    Step::ColorLayer {
        role: LayerRole::Layer3,
        opacity: 35.0,
        mode: BlendMode::Screen,
        colour: [0.114, 0.114, 0.114],
    },
    Step::AddMask {
        target: LayerRole::Layer3,
        fill: MaskFill::Black,
    },
    Step::MaskEllipse {
        target: LayerRole::Layer3,
        shape: VignetteShape::Large,
        gray: 1.0,
    },
    Step::ColorLayer {
        role: LayerRole::Color,
        opacity: 1.0,
        mode: BlendMode::Dodge,
        colour: [0.823, 0.6, 0.003],
    },
    Step::AddMask {
        target: LayerRole::Color,
        fill: MaskFill::Black,
    },
    Step::MaskEllipse {
        target: LayerRole::Color,
        shape: VignetteShape::Large,
        gray: 1.0,
    },
];

const VALENCIA: &[Step] = &[
    Step::ColorLayer {
        role: LayerRole::Color,
        opacity: 100.0,
        mode: BlendMode::Multiply,
        colour: [0.965, 0.867, 0.678],
    },
    Step::MergeDown {
        target: LayerRole::Color,
        rename: false,
    },
    Step::Curve {
        target: LayerRole::Merged,
        channel: Channel::Value,
        points: &[0.0, 50.0 / 255.0, 75.0 / 255.0, 110.0 / 255.0, 175.0 / 255.0, 220.0 / 255.0, 1.0, 1.0],
    },
    Step::Levels {
        target: LayerRole::Merged,
        channel: Channel::Blue,
        levels: Levels::new(1.0, 1.0, 126.0 / 255.0),
    },
    Step::ColorToAlpha {
        target: LayerRole::Merged,
        opacity_threshold: 0.78,
    },
];

const WALDEN: &[Step] = &[
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Value,
        points: &[12.0 / 255.0, 0.0, 1.0, 1.0],
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Red,
        points: &[10.0 / 255.0, 0.0, 247.0 / 255.0, 1.0],
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Blue,
        points: &[0.0, 38.0 / 255.0, 1.0, 203.0 / 255.0],
    },
    Step::Levels {
        target: LayerRole::Layer1,
        channel: Channel::Value,
        levels: Levels::new(235.0 / 255.0, 1.17, 55.0 / 255.0),
    },
    Step::Curve {
        target: LayerRole::Layer1,
        channel: Channel::Value,
        points: &[41.0 / 255.0, 0.0, 125.0 / 255.0, 124.0 / 255.0, 1.0, 1.0],
    },
    Step::EmptyLayer {
        role: LayerRole::Gradient,
        opacity: 80.0,
        mode: BlendMode::SoftLight,
    },
    Step::Gradient {
        target: LayerRole::Gradient,
        paint: PaintContext {
            mode: BlendMode::SoftLight,
            foreground: [1.0, 1.0, 1.0],
            ..PaintContext::DEFAULT
        },
        kind: GradientKind::Radial,
        start: Anchor::ORIGIN,
        end: Anchor::CENTER,
    },
];

pub fn recipe(preset: Preset) -> &'static [Step] {
    match preset {
        Preset::Amaro => AMARO,
        Preset::Apollo => APOLLO,
        Preset::Brannan => BRANNAN,
        Preset::Earlybird => EARLYBIRD,
        Preset::Gotham => GOTHAM,
        Preset::Inkwell => INKWELL,
        Preset::LordKelvin => LORDKELVIN,
        Preset::Poprocket => POPROCKET,
        Preset::Rise => RISE,
        Preset::Toaster => TOASTER,
        Preset::Valencia => VALENCIA,
        Preset::Walden => WALDEN,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    BaseLayerCreated,
    Step(usize),
    Flattened,
    Done,
}

/// Preset filter configuration
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct PresetFilterConfig {
    #[derivative(Default(value = "Preset::Amaro"))]
    preset: Preset,

    #[derivative(Default(value = "DEFAULT_SAMPLES"))]
    lut_samples: usize,

    #[derivative(Default(value = "DEFAULT_FEATHER_RATIO"))]
    feather_ratio: f32,

    #[derivative(Default(value = "0"))]
    noise_seed: u64,
}

impl PresetFilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn lut_samples(&self) -> usize {
        self.lut_samples
    }

    pub fn feather_ratio(&self) -> f32 {
        self.feather_ratio
    }

    pub fn noise_seed(&self) -> u64 {
        self.noise_seed
    }

    /// Run the recipe and return the layer stack before flattening.
    pub fn build_document(&self, image: &RgbaImage) -> ImageEffectResult<Document> {
        let preset = self.preset;
        log::debug!("{preset}: {:?}", Stage::Init);

        let luts = SrgbLuts::build(self.lut_samples)?;
        let mut doc = Document::from_image(image)?;
        let source = doc.background();

        let group = doc.insert_group(doc.root_id(), &format!("{} Group", preset.label()))?;
        let base = doc.snapshot_visible(group, LayerRole::Layer1.label())?;
        log::debug!("{preset}: {:?}", Stage::BaseLayerCreated);

        let mut run = RecipeRun {
            config: self,
            doc,
            group,
            source,
            luts,
            roles: HashMap::from([(LayerRole::Layer1, base)]),
        };

        for (index, step) in recipe(preset).iter().enumerate() {
            log::debug!("{preset}: {:?} {step:?}", Stage::Step(index));
            run.execute(step)?;
        }

        Ok(run.doc)
    }

    /// Run the recipe and flatten. The input is never modified.
    pub fn apply(&self, image: &RgbaImage) -> ImageEffectResult<RgbaImage> {
        log::info!(
            "applying {} to {}x{} image",
            self.preset.label(),
            image.width(),
            image.height()
        );

        let mut doc = self.build_document(image)?;
        let flattened = doc.flatten()?;
        log::debug!("{}: {:?}", self.preset, Stage::Flattened);

        let output = to_rgba8(doc.layer(flattened)?.pixels());
        log::debug!("{}: {:?}", self.preset, Stage::Done);
        Ok(output)
    }
}

struct RecipeRun<'a> {
    config: &'a PresetFilterConfig,
    doc: Document,
    group: LayerId,
    source: LayerId,
    luts: SrgbLuts,
    roles: HashMap<LayerRole, LayerId>,
}

impl RecipeRun<'_> {
    fn layer(&self, role: LayerRole) -> ImageEffectResult<LayerId> {
        self.roles.get(&role).copied().ok_or_else(|| {
            ImageEffectError::InvalidParameter(format!("no layer with role {}", role.label()))
        })
    }

    fn execute(&mut self, step: &Step) -> ImageEffectResult<()> {
        match *step {
            Step::Curve {
                target,
                channel,
                points,
            } => {
                let id = self.layer(target)?;
                let curve = SrgbCurveSplineConfig::new(channel, points, &self.luts);
                self.doc.apply_effect(id, &curve)?;
            }
            Step::Levels {
                target,
                channel,
                levels,
            } => {
                let id = self.layer(target)?;
                self.doc.apply_effect(id, &LevelsConfig::new(channel, levels))?;
            }
            Step::BrightnessContrast {
                target,
                brightness,
                contrast,
            } => {
                let id = self.layer(target)?;
                let effect = BrightnessContrastConfig::new(brightness, contrast);
                self.doc.apply_effect(id, &effect)?;
            }
            Step::HueSaturation {
                target,
                hue,
                lightness,
                saturation,
            } => {
                let id = self.layer(target)?;
                let effect = HueSaturationConfig::new()
                    .with_hue(hue)
                    .with_lightness(lightness)
                    .with_saturation(saturation);
                self.doc.apply_effect(id, &effect)?;
            }
            Step::Desaturate { target, mode } => {
                let id = self.layer(target)?;
                let effect = DesaturateConfig::new().with_mode(mode);
                self.doc.apply_effect(id, &effect)?;
            }
            Step::ColorToAlpha {
                target,
                opacity_threshold,
            } => {
                let id = self.layer(target)?;
                let effect = ColorToAlphaConfig::new().with_opacity_threshold(opacity_threshold);
                self.doc.apply_effect(id, &effect)?;
            }
            Step::MotionBlur { target } => {
                let id = self.layer(target)?;
                self.doc.apply_effect(id, &MotionBlurConfig::new())?;
            }
            Step::Noise { target, amount } => {
                let id = self.layer(target)?;
                let effect = RgbNoiseConfig::new()
                    .with_amount(amount)
                    .with_seed(self.config.noise_seed);
                self.doc.apply_effect(id, &effect)?;
            }
            Step::Duplicate {
                role,
                mode,
                desaturate,
                opacity,
            } => {
                let id = self.doc.duplicate_from_source(
                    self.source,
                    self.group,
                    role.label(),
                    mode,
                    desaturate.then_some(DesaturateMode::Value),
                    opacity,
                )?;
                self.roles.insert(role, id);
            }
            Step::ColorLayer {
                role,
                opacity,
                mode,
                colour,
            } => {
                let id = self.doc.create_layer(self.group, role.label(), opacity, mode)?;
                let ctx = PaintContext::DEFAULT.with_mode(mode).with_foreground(colour);
                self.doc.fill(id, &ctx, None)?;
                self.roles.insert(role, id);
            }
            Step::EmptyLayer {
                role,
                opacity,
                mode,
            } => {
                let id = self.doc.create_layer(self.group, role.label(), opacity, mode)?;
                self.roles.insert(role, id);
            }
            Step::Vignette {
                shape,
                opacity,
                mode,
                colour,
            } => {
                let id = create_vignette_layer(
                    &mut self.doc,
                    self.group,
                    shape,
                    opacity,
                    mode,
                    colour,
                    self.config.feather_ratio,
                )?;
                self.roles.insert(LayerRole::Vignette, id);
            }
            Step::Gradient {
                target,
                paint,
                kind,
                start,
                end,
            } => {
                let id = self.layer(target)?;
                let (w, h) = self.doc.dimensions();
                let gradient = Gradient::new(kind, start.resolve(w, h), end.resolve(w, h));
                self.doc.gradient_fill(id, &paint, &gradient, None)?;
            }
            Step::AddMask { target, fill } => {
                let id = self.layer(target)?;
                self.doc.create_mask(id, fill)?;
            }
            Step::MaskEllipse {
                target,
                shape,
                gray,
            } => {
                let id = self.layer(target)?;
                let (w, h) = self.doc.dimensions();
                if let Some(selection) = select_ellipse(w, h, shape, self.config.feather_ratio) {
                    self.doc.fill_mask(id, gray, Some(&selection))?;
                }
            }
            Step::MergeDown { target, rename } => {
                let id = self.layer(target)?;
                let merged = self.doc.merge_down(id)?;
                if rename {
                    self.doc.set_name(merged, LayerRole::Merged.label())?;
                }
                self.roles.remove(&target);
                self.roles.insert(LayerRole::Merged, merged);
            }
            Step::SetOpacity { target, opacity } => {
                let id = self.layer(target)?;
                self.doc.set_opacity(id, opacity)?;
            }
        }

        Ok(())
    }
}
