use super::*;

#[test]
fn bounding_box_dimensions_are_inclusive() {
    let b = BoundingBox::new(7, 7, 13, 23).unwrap();
    assert_eq!(b.width(), 7);
    assert_eq!(b.height(), 17);
    assert!(b.contains(Point::new(7, 23)));
    assert!(!b.contains(Point::new(14, 10)));
    assert_eq!(b.to_local(Point::new(10, 15)), Point::new(3, 8));
}

#[test]
fn inverted_box_is_rejected() {
    assert!(BoundingBox::new(5, 0, 4, 0).is_err());
    assert!(BoundingBox::new(0, 5, 0, 4).is_err());
}

#[test]
fn canvas_bounds() {
    let c = CanvasSize::new(4, 3).unwrap();
    assert!(c.contains(Point::new(3, 2)));
    assert!(!c.contains(Point::new(4, 0)));
    assert!(!c.contains(Point::new(-1, 0)));
    assert!(c.full_box().fits_within(c));
    assert!(!BoundingBox::new(0, 0, 4, 2).unwrap().fits_within(c));
    assert!(CanvasSize::new(0, 3).is_err());
}

#[test]
fn chebyshev_distance() {
    assert_eq!(Point::new(0, 0).chebyshev(Point::new(1, -1)), 1);
    assert_eq!(Point::new(0, 0).chebyshev(Point::new(3, 1)), 3);
}
