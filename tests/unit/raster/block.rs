use super::*;

fn gradient(width: u32, height: u32) -> ImageBlock {
    let mut data = Vec::new();
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[x as u8, y as u8, 7, 200]);
        }
    }
    ImageBlock::new(width, height, PixelLayout::Rgba, data).unwrap()
}

#[test]
fn new_rejects_wrong_length() {
    assert!(ImageBlock::new(2, 2, PixelLayout::Rgb, vec![0; 11]).is_err());
    assert!(ImageBlock::new(0, 2, PixelLayout::Rgb, vec![]).is_err());
}

#[test]
fn crop_copies_inclusive_region() {
    let img = gradient(8, 6);
    let c = img.crop(BoundingBox::new(2, 1, 4, 3).unwrap()).unwrap();
    assert_eq!(c.shape(), (3, 3, 4));
    assert_eq!(c.pixel(0, 0), &[2, 1, 7, 200]);
    assert_eq!(c.pixel(2, 2), &[4, 3, 7, 200]);
}

#[test]
fn crop_outside_block_is_out_of_bounds() {
    let img = gradient(8, 6);
    let err = img.crop(BoundingBox::new(5, 0, 8, 2).unwrap()).unwrap_err();
    assert!(matches!(err, StrokeFxError::RegionOutOfBounds(_)));
}

#[test]
fn rgb_rgba_conversions_keep_color() {
    let img = gradient(3, 2);
    let rgb = img.to_rgb();
    assert_eq!(rgb.shape(), (3, 2, 3));
    assert_eq!(rgb.pixel(2, 1), &[2, 1, 7]);
    let back = rgb.to_rgba();
    assert_eq!(back.pixel(2, 1), &[2, 1, 7, 255]);
}

#[test]
fn png_roundtrip_preserves_pixels() {
    let dir = std::env::temp_dir().join(format!("strokefx_block_png_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("g.png");
    let img = gradient(5, 4);
    img.save_png(&path).unwrap();
    let loaded = ImageBlock::load(&path).unwrap();
    assert_eq!(loaded, img);
    std::fs::remove_dir_all(&dir).ok();
}
