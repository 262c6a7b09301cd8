use image::{Rgba, RgbaImage};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 800x600 colourful gradient used by the other demos
    let img = RgbaImage::from_fn(800, 600, |x, y| {
        let r = (x * 255 / 800) as u8;
        let g = (y * 255 / 600) as u8;
        let b = ((x + y) * 255 / 1400) as u8;
        Rgba([r, g, b, 255])
    });

    std::fs::create_dir_all("data")?;
    img.save("data/test.png")?;
    println!("Created data/test.png");

    Ok(())
}
