//! An image with an ordered stack of layers and groups.

use crate::{
    Effect, ImageEffectError, ImageEffectResult,
    base_effect::{DesaturateConfig, DesaturateMode},
    blend::BlendMode,
    check_dimensions,
    layer::{Layer, LayerGroup, LayerId, MaskFill, Node},
    paint::{self, Gradient, PaintContext},
    selection::Selection,
    to_rgba32f, to_rgba8,
};
use image::{Rgba32FImage, RgbaImage};

pub const BACKGROUND_NAME: &str = "Background";

#[derive(Debug, Clone)]
pub struct Document {
    width: u32,
    height: u32,
    root: LayerGroup,
    background: LayerId,
    next_id: u32,
}

impl Document {
    pub fn from_image(image: &RgbaImage) -> ImageEffectResult<Self> {
        Self::from_buffer(to_rgba32f(image))
    }

    pub fn from_buffer(pixels: Rgba32FImage) -> ImageEffectResult<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageEffectError::InvalidParameter(format!(
                "empty image {width}x{height}"
            )));
        }

        let mut root = LayerGroup::new(LayerId(0), "root");
        let background = LayerId(1);
        root.children
            .push(Node::Layer(Layer::new(background, BACKGROUND_NAME, pixels)));

        Ok(Self {
            width,
            height,
            root,
            background,
            next_id: 2,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The top-level group holding every other node.
    pub fn root(&self) -> &LayerGroup {
        &self.root
    }

    pub fn root_id(&self) -> LayerId {
        self.root.id
    }

    pub fn background(&self) -> LayerId {
        self.background
    }

    pub fn layer(&self, id: LayerId) -> ImageEffectResult<&Layer> {
        self.root.layer(id).ok_or(ImageEffectError::LayerNotFound(id))
    }

    pub fn layer_mut(&mut self, id: LayerId) -> ImageEffectResult<&mut Layer> {
        self.root.require_layer_mut(id)
    }

    pub fn layer_count(&self) -> usize {
        self.root.layer_count()
    }

    fn alloc_id(&mut self) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn group_mut(&mut self, id: LayerId) -> ImageEffectResult<&mut LayerGroup> {
        if self.root.is_group(id) {
            return self.root.group_mut(id).ok_or(ImageEffectError::NotAGroup(id));
        }

        if self.root.contains(id) {
            Err(ImageEffectError::NotAGroup(id))
        } else {
            Err(ImageEffectError::LayerNotFound(id))
        }
    }

    fn push_layer(&mut self, group: LayerId, layer: Layer) -> ImageEffectResult<LayerId> {
        check_dimensions(self.dimensions(), layer.pixels.dimensions())?;

        let id = layer.id;
        self.group_mut(group)?.children.push(Node::Layer(layer));
        log::debug!("added layer {id} to group {group}");
        Ok(id)
    }

    /// New empty group at the top of `parent`.
    pub fn insert_group(&mut self, parent: LayerId, name: &str) -> ImageEffectResult<LayerId> {
        let id = self.alloc_id();
        self.group_mut(parent)?
            .children
            .push(Node::Group(LayerGroup::new(id, name)));
        Ok(id)
    }

    /// Transparent layer at the top of `group`.
    pub fn create_layer(
        &mut self,
        group: LayerId,
        name: &str,
        opacity: f32,
        mode: BlendMode,
    ) -> ImageEffectResult<LayerId> {
        let id = self.alloc_id();
        let mut layer = Layer::new(id, name, Rgba32FImage::new(self.width, self.height));
        layer.mode = mode;
        layer.set_opacity(opacity);
        self.push_layer(group, layer)
    }

    /// Copy of `source`'s pixels, optionally desaturated, at the top of `group`.
    pub fn duplicate_from_source(
        &mut self,
        source: LayerId,
        group: LayerId,
        name: &str,
        mode: BlendMode,
        desaturate: Option<DesaturateMode>,
        opacity: f32,
    ) -> ImageEffectResult<LayerId> {
        let mut pixels = self.layer(source)?.pixels.clone();
        if let Some(desaturate) = desaturate {
            DesaturateConfig::new()
                .with_mode(desaturate)
                .apply(&mut pixels)?;
        }

        let id = self.alloc_id();
        let mut layer = Layer::new(id, name, pixels);
        layer.mode = mode;
        layer.set_opacity(opacity);
        self.push_layer(group, layer)
    }

    /// New layer at the top of `group` holding the current visible image.
    pub fn snapshot_visible(&mut self, group: LayerId, name: &str) -> ImageEffectResult<LayerId> {
        let pixels = self.composite()?;
        let id = self.alloc_id();
        self.push_layer(group, Layer::new(id, name, pixels))
    }

    pub fn fill(
        &mut self,
        layer: LayerId,
        ctx: &PaintContext,
        selection: Option<&Selection>,
    ) -> ImageEffectResult<()> {
        paint::fill(&mut self.layer_mut(layer)?.pixels, ctx, selection)
    }

    /// Paint `gray` into the layer's mask.
    pub fn fill_mask(
        &mut self,
        layer: LayerId,
        gray: f32,
        selection: Option<&Selection>,
    ) -> ImageEffectResult<()> {
        match self.layer_mut(layer)?.mask.as_mut() {
            Some(mask) => paint::fill_mask(mask, gray, selection),
            None => Err(ImageEffectError::InvalidParameter(format!(
                "layer {layer} has no mask"
            ))),
        }
    }

    pub fn gradient_fill(
        &mut self,
        layer: LayerId,
        ctx: &PaintContext,
        gradient: &Gradient,
        selection: Option<&Selection>,
    ) -> ImageEffectResult<()> {
        paint::gradient_fill(&mut self.layer_mut(layer)?.pixels, ctx, gradient, selection)
    }

    /// Composite `top` onto the layer directly beneath it and remove `top`.
    /// The lower layer keeps its own mode, opacity and mask.
    pub fn merge_down(&mut self, top: LayerId) -> ImageEffectResult<LayerId> {
        let (parent, index) = self
            .root
            .parent_of_mut(top)
            .ok_or(ImageEffectError::LayerNotFound(top))?;

        if index == 0 {
            return Err(ImageEffectError::NothingToMerge(top));
        }

        let (below, above) = parent.children.split_at_mut(index);
        let lower_id = match (&mut below[index - 1], &above[0]) {
            (Node::Layer(lower), Node::Layer(upper)) => {
                upper.composite_onto(&mut lower.pixels)?;
                lower.id
            }
            _ => return Err(ImageEffectError::NothingToMerge(top)),
        };

        parent.children.remove(index);
        log::debug!("merged layer {top} down into {lower_id}");
        Ok(lower_id)
    }

    pub fn create_mask(&mut self, layer: LayerId, fill: MaskFill) -> ImageEffectResult<()> {
        self.layer_mut(layer)?.add_mask(fill);
        Ok(())
    }

    pub fn set_opacity(&mut self, layer: LayerId, opacity: f32) -> ImageEffectResult<()> {
        self.layer_mut(layer)?.set_opacity(opacity);
        Ok(())
    }

    pub fn set_mode(&mut self, layer: LayerId, mode: BlendMode) -> ImageEffectResult<()> {
        self.layer_mut(layer)?.mode = mode;
        Ok(())
    }

    pub fn set_name(&mut self, layer: LayerId, name: &str) -> ImageEffectResult<()> {
        self.layer_mut(layer)?.name = name.to_string();
        Ok(())
    }

    pub fn apply_effect(&mut self, layer: LayerId, effect: &dyn Effect) -> ImageEffectResult<()> {
        effect.apply(&mut self.layer_mut(layer)?.pixels)
    }

    /// The visible image. The stack is left untouched.
    pub fn composite(&self) -> ImageEffectResult<Rgba32FImage> {
        self.root.render(self.width, self.height)
    }

    pub fn composite_rgba8(&self) -> ImageEffectResult<RgbaImage> {
        Ok(to_rgba8(&self.composite()?))
    }

    /// Replace the whole stack with a single layer holding the visible image.
    pub fn flatten(&mut self) -> ImageEffectResult<LayerId> {
        let pixels = self.composite()?;
        let id = self.alloc_id();

        self.root.children.clear();
        self.root
            .children
            .push(Node::Layer(Layer::new(id, BACKGROUND_NAME, pixels)));
        self.background = id;

        log::debug!("flattened document into layer {id}");
        Ok(id)
    }
}
