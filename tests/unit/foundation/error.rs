use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StrokeFxError::invalid_parameter("x")
            .to_string()
            .contains("invalid parameter:")
    );
    assert!(
        StrokeFxError::missing_parameter("Radius")
            .to_string()
            .contains("missing parameter: Radius")
    );
    assert!(
        StrokeFxError::out_of_bounds("x")
            .to_string()
            .contains("region out of bounds:")
    );
    assert!(
        StrokeFxError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert_eq!(StrokeFxError::NothingToUndo.to_string(), "nothing to undo");
}

#[test]
fn shape_mismatch_formats_both_shapes() {
    let err = StrokeFxError::shape_mismatch((7, 17, 4), (6, 17, 4));
    assert_eq!(
        err.to_string(),
        "shape mismatch: expected 7x17x4, got 6x17x4"
    );
    assert!(err.is_stroke_abort());
    assert!(!StrokeFxError::NothingToUndo.is_stroke_abort());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StrokeFxError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
