/// Layer stack demo
/// Prints the layers a preset builds before they are flattened

use image::ImageReader;
use insta_effect::{
    Preset, PresetFilterConfig, VignetteShape,
    layer::Node,
    vignette::{DEFAULT_FEATHER_RATIO, select_ellipse},
};
use std::path::Path;

fn print_node(node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Layer(layer) => println!(
            "{indent}{} {} mode={:?} opacity={} mask={}",
            layer.id(),
            layer.name(),
            layer.mode(),
            layer.opacity(),
            layer.mask().is_some()
        ),
        Node::Group(group) => {
            println!("{indent}{} {}", group.id(), group.name());
            for child in group.children() {
                print_node(child, depth + 1);
            }
        }
    }
}

fn print_vignette_shapes(width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
    let shapes = [
        VignetteShape::Standard,
        VignetteShape::Large,
        VignetteShape::Oblate,
        VignetteShape::None,
    ];

    println!("\nVignette shapes on {width}x{height}:");
    for shape in shapes {
        let bounds = select_ellipse(width, height, shape, DEFAULT_FEATHER_RATIO)
            .and_then(|sel| sel.bounds());
        println!("  {shape:?} ({}) bounds={bounds:?}", shape.label());
    }

    let standard = select_ellipse(width, height, VignetteShape::Standard, 0.0);
    let oblate = select_ellipse(width, height, VignetteShape::Oblate, 0.0);
    if let (Some(mut overlap), Some(oblate)) = (standard, oblate) {
        overlap.intersect(&oblate)?;
        println!("  Standard ∩ Oblate bounds={:?}", overlap.bounds());
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let name = std::env::args().nth(1).unwrap_or_else(|| "TOASTER".to_string());
    let preset: Preset = name.parse()?;

    let output_dir = Path::new("tmp");
    std::fs::create_dir_all(output_dir)?;

    let img = ImageReader::open(Path::new("data/test.png"))?.decode()?.to_rgba8();
    let doc = PresetFilterConfig::new().with_preset(preset).build_document(&img)?;

    println!("{} ({} layers)", preset.description(), doc.layer_count());
    for child in doc.root().children() {
        print_node(child, 1);
    }

    print_vignette_shapes(img.width(), img.height())?;

    // Same pixels the flattened output would have, taken before flattening.
    let filename = format!("layers_{}.png", preset.identifier()).to_lowercase();
    doc.composite_rgba8()?.save(output_dir.join(&filename))?;
    println!("\n✓ Composite saved to tmp/{filename}");

    Ok(())
}
