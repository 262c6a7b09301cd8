/// Preset filters demo
/// Applies every preset in the catalog to data/test.png

use image::ImageReader;
use insta_effect::{Preset, PresetFilterConfig};
use std::{path::Path, time::Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let output_dir = Path::new("tmp");
    std::fs::create_dir_all(output_dir)?;

    // Run create_test_image first if this is missing
    let img_path = Path::new("data/test.png");
    let img = ImageReader::open(img_path)?.decode()?.to_rgba8();

    for preset in Preset::all() {
        let start = Instant::now();
        let output = PresetFilterConfig::new().with_preset(preset).apply(&img)?;

        let filename = format!("preset_{}.png", preset.identifier()).to_lowercase();
        output.save(output_dir.join(&filename))?;
        println!("✓ Generated {} in {:.2?}", filename, start.elapsed());
    }

    println!("\n✓ All preset filters applied successfully!");
    println!("  Images saved to: tmp/");

    Ok(())
}
