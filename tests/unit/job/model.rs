use super::*;
use crate::foundation::core::CanvasSize;
use crate::geometry::mask::rasterize_mask;
use crate::geometry::path::{PointerPath, densify};
use crate::raster::block::PixelLayout;
use crate::registry::params::ParamValue;

#[test]
fn job_id_display_parses_back() {
    let id = JobId::generate();
    let text = id.to_string();
    assert_eq!(text.len(), 32);
    assert!(!text.contains('-'));
    assert_eq!(JobId::parse(&text).unwrap(), id);
    assert_ne!(JobId::generate(), id);
    assert!(JobId::parse("not-a-uuid").is_err());
}

#[test]
fn from_stroke_crops_and_translates() {
    let canvas = ImageBlock::filled(32, 32, PixelLayout::Rgba, &[9, 8, 7, 255]).unwrap();
    let path = PointerPath::from_points([Point::new(10, 10), Point::new(10, 20)]);
    let dense = densify(&path);
    let (mask, bbox) =
        rasterize_mask(&dense, 3, CanvasSize::new(32, 32).unwrap()).unwrap();

    let mut params = ParamMap::new();
    params.insert("Radius".into(), ParamValue::Number(3.0));
    let job = Job::from_stroke(&canvas, &mask, bbox, path.points(), params, false).unwrap();

    assert_eq!(job.bbox(), bbox);
    assert_eq!(job.image().shape(), (7, 17, 4));
    assert_eq!(job.expected_dims(), (7, 17));
    assert_eq!((job.mask().width(), job.mask().height()), (7, 17));
    assert_eq!(job.points(), &[Point::new(3, 3), Point::new(3, 13)]);
    assert_eq!(job.params().len(), 1);
    assert!(!job.writes_alpha());
}

#[test]
fn new_rejects_mismatched_parts() {
    let bbox = BoundingBox::new(0, 0, 3, 3).unwrap();
    let image = ImageBlock::filled(4, 3, PixelLayout::Rgb, &[0, 0, 0]).unwrap();
    let mask = StrokeMask::empty(4, 4);
    let err = Job::new(
        JobId::generate(),
        bbox,
        image,
        mask,
        vec![],
        ParamMap::new(),
        false,
    )
    .unwrap_err();
    assert!(matches!(err, StrokeFxError::ShapeMismatch { .. }));
}
