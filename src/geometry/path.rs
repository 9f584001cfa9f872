use crate::foundation::core::{CanvasSize, Point};

/// Pointer samples of the stroke in progress, in insertion order.
///
/// Samples may be arbitrarily far apart and may repeat; [`densify`] handles both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointerPath {
    points: Vec<Point>,
}

impl PointerPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    pub fn add_point(&mut self, p: Point) {
        self.points.push(p);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Samples with consecutive duplicates collapsed.
    pub fn deduped(&self) -> Vec<Point> {
        let mut out = self.points.clone();
        out.dedup();
        out
    }
}

/// Gap-free pixel path produced by [`densify`]. Consecutive pixels are 8-connected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DensePath {
    pixels: Vec<Point>,
}

impl DensePath {
    pub fn pixels(&self) -> &[Point] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// `(min_x, min_y, max_x, max_y)` over all pixels, `None` when empty.
    pub fn extrema(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.pixels.first()?;
        let init = (first.x, first.y, first.x, first.y);
        Some(self.pixels.iter().fold(init, |(x0, y0, x1, y1), p| {
            (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y))
        }))
    }
}

/// Fill the gaps between pointer samples with the integer pixels of each connecting segment.
///
/// Walks every pixel between samples however far apart they are; strokes headed for a mask
/// should use [`densify_clipped`].
pub fn densify(path: &PointerPath) -> DensePath {
    densify_within(path, None)
}

/// Like [`densify`], but keeps only pixels within `margin` of the canvas along each axis.
///
/// Dilating the result by a radius `<= margin` covers exactly the canvas cells the full path
/// would. Work and memory are bounded by the canvas size, not by the sample spacing. The
/// path is gap-free inside the window; segments that leave it resume where they re-enter.
pub fn densify_clipped(path: &PointerPath, canvas: CanvasSize, margin: u32) -> DensePath {
    let m = i64::from(margin);
    let window = Window {
        left: -m,
        top: -m,
        right: i64::from(canvas.width) - 1 + m,
        bottom: i64::from(canvas.height) - 1 + m,
    };
    densify_within(path, Some(window))
}

/// Integer pixels on the segment `a..=b`, both endpoints included.
///
/// Steps along the dominant axis and advances the minor axis whenever the accumulated
/// error crosses zero. All arithmetic is doubled so the half-step start stays integral.
pub fn line_pixels(a: Point, b: Point) -> Vec<Point> {
    let mut out = vec![a];
    walk_segment(a, b, None, &mut out);
    out
}

/// Inclusive pixel rectangle in wide coordinates.
#[derive(Clone, Copy, Debug)]
struct Window {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl Window {
    fn contains(&self, p: Point) -> bool {
        let (x, y) = (i64::from(p.x), i64::from(p.y));
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }
}

fn densify_within(path: &PointerPath, window: Option<Window>) -> DensePath {
    let samples = path.deduped();
    let Some(&first) = samples.first() else {
        return DensePath::default();
    };

    let mut pixels = Vec::new();
    if window.is_none_or(|w| w.contains(first)) {
        pixels.push(first);
    }
    for pair in samples.windows(2) {
        walk_segment(pair[0], pair[1], window, &mut pixels);
    }

    tracing::debug!(
        samples = samples.len(),
        pixels = pixels.len(),
        clipped = window.is_some(),
        "densified pointer path"
    );
    DensePath { pixels }
}

/// Append the pixels of `a..=b` after `a` itself that fall inside `window`.
///
/// Pixel `k` lies `k` steps from `a` on the dominant axis and `n_k` on the minor one, where
/// `n_k` counts the error wraps so far. Both follow in closed form from `k`, so the walk can
/// start at the first step inside the window.
fn walk_segment(a: Point, b: Point, window: Option<Window>, out: &mut Vec<Point>) {
    let (ax, ay) = (i64::from(a.x), i64::from(a.y));
    let (bx, by) = (i64::from(b.x), i64::from(b.y));
    let steep = (by - ay).abs() >= (bx - ax).abs();
    let (major_at, major_step, major, minor_at, minor_step, minor) = if steep {
        (ay, (by - ay).signum(), (by - ay).abs(), ax, (bx - ax).signum(), (bx - ax).abs())
    } else {
        (ax, (bx - ax).signum(), (bx - ax).abs(), ay, (by - ay).signum(), (by - ay).abs())
    };

    let (mut first, mut last) = (1, major);
    if let Some(w) = window {
        let (lo, hi) = if steep { (w.top, w.bottom) } else { (w.left, w.right) };
        let (k_lo, k_hi) = if major_step > 0 {
            (lo - major_at, hi - major_at)
        } else {
            (major_at - hi, major_at - lo)
        };
        first = first.max(k_lo);
        last = last.min(k_hi);
    }
    if first > last {
        return;
    }

    let wrap = 2 * i128::from(major);
    let t = i128::from(major) - 2 * i128::from(minor) * i128::from(first);
    // Both stay within the segment's span, which fits in i64.
    let mut n = (-t.div_euclid(wrap)) as i64;
    let mut err = t.rem_euclid(wrap) as i64;
    let mut along = major_at + major_step * first;

    for _ in first..=last {
        let across = minor_at + minor_step * n;
        // Pixels between two i32 samples are themselves in i32 range.
        let (x, y) = if steep { (across, along) } else { (along, across) };
        let p = Point::new(x as i32, y as i32);
        if window.is_none_or(|w| w.contains(p)) {
            out.push(p);
        }
        err -= 2 * minor;
        if err < 0 {
            n += 1;
            err += 2 * major;
        }
        along += major_step;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/path.rs"]
mod tests;
