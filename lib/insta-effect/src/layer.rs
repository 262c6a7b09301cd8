use crate::{
    ImageEffectError, ImageEffectResult,
    blend::{self, BlendMode},
    check_dimensions,
    selection::Coverage,
};
use image::{Luma, Rgba32FImage};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Initial content of a new layer mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MaskFill {
    /// Fully visible.
    White = 0,
    /// Fully hidden.
    Black = 1,
}

impl MaskFill {
    fn level(self) -> f32 {
        match self {
            MaskFill::White => 1.0,
            MaskFill::Black => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) name: String,
    pub(crate) pixels: Rgba32FImage,
    pub(crate) mode: BlendMode,
    /// 0..=100
    pub(crate) opacity: f32,
    pub(crate) mask: Option<Coverage>,
}

impl Layer {
    pub(crate) fn new(id: LayerId, name: &str, pixels: Rgba32FImage) -> Self {
        Self {
            id,
            name: name.to_string(),
            pixels,
            mode: BlendMode::Normal,
            opacity: 100.0,
            mask: None,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pixels(&self) -> &Rgba32FImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut Rgba32FImage {
        &mut self.pixels
    }

    pub fn mode(&self) -> BlendMode {
        self.mode
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn mask(&self) -> Option<&Coverage> {
        self.mask.as_ref()
    }

    pub fn mask_mut(&mut self) -> Option<&mut Coverage> {
        self.mask.as_mut()
    }

    pub(crate) fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 100.0);
    }

    pub(crate) fn add_mask(&mut self, fill: MaskFill) {
        let (w, h) = self.pixels.dimensions();
        self.mask = Some(Coverage::from_pixel(w, h, Luma([fill.level()])));
    }

    /// Composite this layer onto `base` with its own mode, opacity and mask.
    pub(crate) fn composite_onto(&self, base: &mut Rgba32FImage) -> ImageEffectResult<()> {
        blend::composite(
            base,
            &self.pixels,
            self.mode,
            self.opacity / 100.0,
            self.mask.as_ref(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct LayerGroup {
    pub(crate) id: LayerId,
    pub(crate) name: String,
    /// Bottom to top.
    pub(crate) children: Vec<Node>,
}

#[derive(Debug, Clone)]
pub enum Node {
    Layer(Layer),
    Group(LayerGroup),
}

impl Node {
    pub fn id(&self) -> LayerId {
        match self {
            Node::Layer(layer) => layer.id,
            Node::Group(group) => group.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Layer(layer) => &layer.name,
            Node::Group(group) => &group.name,
        }
    }
}

impl LayerGroup {
    pub(crate) fn new(id: LayerId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Composite the children in isolation onto a transparent canvas.
    pub fn render(&self, width: u32, height: u32) -> ImageEffectResult<Rgba32FImage> {
        let mut canvas = Rgba32FImage::new(width, height);

        for child in &self.children {
            match child {
                Node::Layer(layer) => {
                    check_dimensions((width, height), layer.pixels.dimensions())?;
                    layer.composite_onto(&mut canvas)?;
                }
                Node::Group(group) => {
                    let rendered = group.render(width, height)?;
                    blend::composite(&mut canvas, &rendered, BlendMode::Normal, 1.0, None)?;
                }
            }
        }

        Ok(canvas)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        for child in &self.children {
            match child {
                Node::Layer(layer) if layer.id == id => return Some(layer),
                Node::Group(group) => {
                    if let Some(layer) = group.layer(id) {
                        return Some(layer);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        for child in &mut self.children {
            match child {
                Node::Layer(layer) if layer.id == id => return Some(layer),
                Node::Group(group) => {
                    if let Some(layer) = group.layer_mut(id) {
                        return Some(layer);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub fn group_mut(&mut self, id: LayerId) -> Option<&mut LayerGroup> {
        if self.id == id {
            return Some(self);
        }

        for child in &mut self.children {
            if let Node::Group(group) = child {
                if let Some(found) = group.group_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// The group directly holding `id`, with the child's index in it.
    pub fn parent_of_mut(&mut self, id: LayerId) -> Option<(&mut LayerGroup, usize)> {
        if let Some(index) = self.children.iter().position(|n| n.id() == id) {
            return Some((self, index));
        }

        for child in &mut self.children {
            if let Node::Group(group) = child {
                if let Some(found) = group.parent_of_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn is_group(&self, id: LayerId) -> bool {
        self.id == id
            || self.children.iter().any(|child| match child {
                Node::Group(group) => group.is_group(id),
                Node::Layer(_) => false,
            })
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.children.iter().any(|child| match child {
            Node::Layer(layer) => layer.id == id,
            Node::Group(group) => group.id == id || group.contains(id),
        })
    }

    /// Number of layers, nested groups included, not counting groups themselves.
    pub fn layer_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Node::Layer(_) => 1,
                Node::Group(group) => group.layer_count(),
            })
            .sum()
    }

    pub(crate) fn require_layer_mut(&mut self, id: LayerId) -> ImageEffectResult<&mut Layer> {
        self.layer_mut(id).ok_or(ImageEffectError::LayerNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(id: u32, colour: [f32; 4]) -> Layer {
        Layer::new(LayerId(id), "solid", Rgba32FImage::from_pixel(2, 2, Rgba(colour)))
    }

    #[test]
    fn test_nested_lookup() {
        let mut inner = LayerGroup::new(LayerId(2), "inner");
        inner.children.push(Node::Layer(solid(3, [1.0, 0.0, 0.0, 1.0])));

        let mut root = LayerGroup::new(LayerId(0), "root");
        root.children.push(Node::Layer(solid(1, [0.0; 4])));
        root.children.push(Node::Group(inner));

        assert!(root.layer(LayerId(3)).is_some());
        assert!(root.contains(LayerId(2)));
        assert_eq!(root.layer_count(), 2);

        let (parent, index) = root.parent_of_mut(LayerId(3)).unwrap();
        assert_eq!(parent.id, LayerId(2));
        assert_eq!(index, 0);

        assert!(root.group_mut(LayerId(2)).is_some());
        assert!(root.group_mut(LayerId(9)).is_none());
        assert!(matches!(
            root.require_layer_mut(LayerId(9)),
            Err(ImageEffectError::LayerNotFound(LayerId(9)))
        ));
    }

    #[test]
    fn test_group_is_isolated() {
        // A multiply layer inside a group sees only the group's transparent
        // backdrop, so it lands with its own colour.
        let mut layer = solid(2, [0.5, 0.5, 0.5, 1.0]);
        layer.mode = BlendMode::Multiply;

        let mut group = LayerGroup::new(LayerId(1), "group");
        group.children.push(Node::Layer(layer));

        let mut root = LayerGroup::new(LayerId(0), "root");
        root.children.push(Node::Layer(solid(3, [1.0, 1.0, 1.0, 1.0])));
        root.children.push(Node::Group(group));

        let out = root.render(2, 2).unwrap();
        assert!((out.get_pixel(0, 0)[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_black_mask_hides_layer() {
        let mut layer = solid(1, [1.0, 1.0, 1.0, 1.0]);
        layer.add_mask(MaskFill::Black);

        let mut root = LayerGroup::new(LayerId(0), "root");
        root.children.push(Node::Layer(layer));

        let out = root.render(2, 2).unwrap();
        assert_eq!(out.get_pixel(1, 1)[3], 0.0);
        assert_eq!(MaskFill::try_from(1u8).unwrap(), MaskFill::Black);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut layer = solid(1, [0.0; 4]);
        layer.set_opacity(140.0);
        assert_eq!(layer.opacity(), 100.0);
        layer.set_opacity(-3.0);
        assert_eq!(layer.opacity(), 0.0);
    }
}
