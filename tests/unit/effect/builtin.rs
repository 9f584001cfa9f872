use super::*;
use crate::foundation::core::BoundingBox;
use crate::geometry::mask::StrokeMask;
use crate::job::model::JobId;
use crate::raster::block::PixelLayout;
use crate::registry::params::ParamMap;

fn job_with(params: ParamMap) -> Job {
    let image = ImageBlock::new(
        2,
        1,
        PixelLayout::Rgba,
        vec![0, 100, 200, 255, 255, 255, 255, 128],
    )
    .unwrap();
    Job::new(
        JobId::generate(),
        BoundingBox::new(0, 0, 1, 0).unwrap(),
        image,
        StrokeMask::from_bits(2, 1, vec![true, true]).unwrap(),
        vec![],
        params,
        false,
    )
    .unwrap()
}

fn fill_params(color: [u8; 4], strength: f64) -> ParamMap {
    let mut p = ParamMap::new();
    p.insert("Color".into(), ParamValue::Color(color));
    p.insert("Strength".into(), ParamValue::Number(strength));
    p
}

#[test]
fn fill_full_strength_replaces_rgb_and_keeps_alpha() {
    let out = Fill.apply(&job_with(fill_params([10, 20, 30, 255], 1.0))).unwrap();
    assert_eq!(out.pixel(0, 0), &[10, 20, 30, 255]);
    assert_eq!(out.pixel(1, 0), &[10, 20, 30, 128]);
}

#[test]
fn fill_zero_strength_is_noop_and_half_mixes() {
    let job = job_with(fill_params([255, 255, 255, 255], 0.0));
    assert_eq!(&Fill.apply(&job).unwrap(), job.image());

    let out = Fill.apply(&job_with(fill_params([0, 0, 0, 255], 0.5))).unwrap();
    assert_eq!(out.pixel(1, 0), &[127, 127, 127, 128]);
}

#[test]
fn fill_rejects_out_of_range_strength() {
    let err = Fill
        .apply(&job_with(fill_params([0, 0, 0, 255], 1.5)))
        .unwrap_err();
    assert!(matches!(err, StrokeFxError::InvalidParameter(_)));
    assert!(Fill.apply(&job_with(ParamMap::new())).is_err());
}

#[test]
fn clear_alpha_zeroes_alpha_only() {
    let out = ClearAlpha.apply(&job_with(ParamMap::new())).unwrap();
    assert_eq!(out.pixel(0, 0), &[0, 100, 200, 0]);
    assert_eq!(out.pixel(1, 0), &[255, 255, 255, 0]);
    assert!(ClearAlpha.writes_alpha());
    assert!(!Fill.writes_alpha());
}

#[test]
fn identity_returns_input() {
    let job = job_with(ParamMap::new());
    assert_eq!(&Identity.apply(&job).unwrap(), job.image());
}

#[test]
fn lookup_finds_every_builtin() {
    for fx in all() {
        assert_eq!(lookup(fx.id()).map(|f| f.id()), Some(fx.id()));
    }
    assert!(lookup("quantum_blur").is_none());
}
