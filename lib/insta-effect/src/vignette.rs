use crate::{
    ImageEffectResult,
    blend::BlendMode,
    document::Document,
    layer::LayerId,
    paint::PaintContext,
    selection::Selection,
};

/// Feather radius as a fraction of the longer canvas side.
pub const DEFAULT_FEATHER_RATIO: f32 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VignetteShape {
    Standard,
    Large,
    Oblate,
    None,
}

impl VignetteShape {
    pub fn label(self) -> &'static str {
        match self {
            VignetteShape::Standard => "Fits inside the image",
            VignetteShape::Large => "Extends outside the image",
            VignetteShape::Oblate => "Flattened",
            VignetteShape::None => "Defaults to an empty layer",
        }
    }

    /// Bounding box `(x, y, width, height)` of the ellipse on a `w` × `h` canvas.
    pub fn ellipse_box(self, w: f32, h: f32) -> Option<(f32, f32, f32, f32)> {
        match self {
            VignetteShape::Standard => Some((0.0, 0.0, w, h)),
            VignetteShape::Large => {
                let delta = 0.05 * w;
                Some((-delta, -delta, w + delta * 2.0, h + delta * 2.0))
            }
            VignetteShape::Oblate => {
                let delta = w / 6.0;
                let epsilon = 0.05 * h;
                Some((-delta, epsilon, w + delta * 2.0, h - epsilon * 2.0))
            }
            VignetteShape::None => None,
        }
    }
}

/// Feathered ellipse selection for `shape`, or `None` for `VignetteShape::None`
/// and for ellipses that cover no pixel.
pub fn select_ellipse(
    width: u32,
    height: u32,
    shape: VignetteShape,
    feather_ratio: f32,
) -> Option<Selection> {
    let (x, y, ew, eh) = shape.ellipse_box(width as f32, height as f32)?;

    let mut selection = Selection::ellipse(width, height, x, y, ew, eh);
    let Some(bounds) = selection.bounds() else {
        log::warn!("empty {shape:?} ellipse on {width}x{height} canvas, skipping");
        return None;
    };
    log::debug!("{shape:?} ellipse covers {bounds:?}");

    selection.feather(feather_ratio * width.max(height) as f32);
    Some(selection)
}

/// Add a layer named "Vignette" to `group` and paint `colour` outside the
/// shape's ellipse with the layer's own mode. `VignetteShape::None` leaves
/// the layer empty.
pub fn create_vignette_layer(
    doc: &mut Document,
    group: LayerId,
    shape: VignetteShape,
    opacity: f32,
    mode: BlendMode,
    colour: [f32; 3],
    feather_ratio: f32,
) -> ImageEffectResult<LayerId> {
    let layer = doc.create_layer(group, "Vignette", opacity, mode)?;

    let Some(mut selection) = select_ellipse(doc.width(), doc.height(), shape, feather_ratio)
    else {
        return Ok(layer);
    };

    selection.invert();
    let ctx = PaintContext::DEFAULT.with_mode(mode).with_foreground(colour);
    doc.fill(layer, &ctx, Some(&selection))?;

    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_shape_boxes() {
        assert_eq!(
            VignetteShape::Large.ellipse_box(200.0, 100.0),
            Some((-10.0, -10.0, 220.0, 120.0))
        );

        let (x, y, w, h) = VignetteShape::Oblate.ellipse_box(120.0, 100.0).unwrap();
        assert_eq!((x, y), (-20.0, 5.0));
        assert_eq!((w, h), (160.0, 90.0));
        assert_eq!(VignetteShape::None.ellipse_box(10.0, 10.0), None);
    }

    #[test]
    fn test_standard_selection_is_feathered() {
        let sel = select_ellipse(100, 80, VignetteShape::Standard, DEFAULT_FEATHER_RATIO).unwrap();
        assert!(sel.value(50, 40) > 0.95);

        // Values fall off monotonically from the centre along the row.
        let row: Vec<f32> = (0..50).map(|x| sel.value(x, 40)).collect();
        assert!(row.windows(2).all(|w| w[1] >= w[0] - 1e-5));
        assert!(row[0] < row[49]);
        assert!(sel.value(0, 0) < 0.1);
    }

    #[test]
    fn test_none_shape_has_no_selection() {
        assert!(select_ellipse(10, 10, VignetteShape::None, 0.2).is_none());
    }

    #[test]
    fn test_vignette_darkens_edges_only() -> anyhow::Result<()> {
        let img = RgbaImage::from_pixel(60, 60, Rgba([255, 255, 255, 255]));
        let mut doc = Document::from_image(&img)?;
        let group = doc.root_id();

        create_vignette_layer(
            &mut doc,
            group,
            VignetteShape::Standard,
            100.0,
            BlendMode::Normal,
            [0.0, 0.0, 0.0],
            DEFAULT_FEATHER_RATIO,
        )?;

        let out = doc.composite()?;
        assert!(out.get_pixel(30, 30)[0] > 0.95);
        assert!(out.get_pixel(0, 0)[0] < 0.2);
        Ok(())
    }

    #[test]
    fn test_none_vignette_is_empty_layer() -> anyhow::Result<()> {
        let mut doc = Document::from_image(&RgbaImage::new(8, 8))?;
        let group = doc.root_id();
        let layer = create_vignette_layer(
            &mut doc,
            group,
            VignetteShape::None,
            100.0,
            BlendMode::Screen,
            [0.0; 3],
            DEFAULT_FEATHER_RATIO,
        )?;

        let vignette = doc.layer(layer)?;
        assert_eq!(vignette.mode(), BlendMode::Screen);
        assert!(vignette.pixels().pixels().all(|p| p[3] == 0.0));
        Ok(())
    }
}
