use crate::foundation::core::{BoundingBox, CanvasSize, Point};
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::geometry::path::DensePath;

/// Boolean coverage grid, row-major.
///
/// Full-canvas sized when produced by [`rasterize_mask`]; box sized after [`StrokeMask::crop`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrokeMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl StrokeMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> StrokeFxResult<Self> {
        if bits.len() != width as usize * height as usize {
            return Err(StrokeFxError::invalid_parameter(format!(
                "mask has {} cells, expected {width}x{height}",
                bits.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn row(&self, y: u32) -> &[bool] {
        let w = self.width as usize;
        let o = y as usize * w;
        &self.bits[o..o + w]
    }

    pub fn covered_count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Copy of the cells inside `bbox`.
    pub fn crop(&self, bbox: BoundingBox) -> StrokeFxResult<StrokeMask> {
        let size = CanvasSize {
            width: self.width,
            height: self.height,
        };
        if !bbox.fits_within(size) {
            return Err(StrokeFxError::out_of_bounds(format!(
                "mask crop {bbox:?} exceeds {}x{} mask",
                self.width, self.height
            )));
        }
        let mut bits = Vec::with_capacity(bbox.width() as usize * bbox.height() as usize);
        for y in bbox.top..=bbox.bottom {
            let row = self.row(y);
            bits.extend_from_slice(&row[bbox.left as usize..=bbox.right as usize]);
        }
        StrokeMask::from_bits(bbox.width(), bbox.height(), bits)
    }

    fn fill_span(&mut self, y: u32, x0: u32, x1: u32) {
        let o = y as usize * self.width as usize;
        self.bits[o + x0 as usize..=o + x1 as usize].fill(true);
    }
}

/// Horizontal half-extent of the radius-`r` disk for each row offset `-r..=r`.
///
/// `spans[dy + r]` is the largest `dx` with `dx*dx + dy*dy <= r*r`.
fn disk_spans(radius: u32) -> Vec<i64> {
    let r = i64::from(radius);
    let r2 = r * r;
    let mut spans = Vec::with_capacity(2 * radius as usize + 1);
    let mut dx = 0i64;
    // Walk dy from -r to 0 growing dx, then mirror.
    for dy in -r..=0 {
        while (dx + 1) * (dx + 1) + dy * dy <= r2 {
            dx += 1;
        }
        spans.push(dx);
    }
    for i in (0..radius as usize).rev() {
        spans.push(spans[i]);
    }
    spans
}

/// Dilate `path` by `radius` into a canvas-sized mask and its tight bounding box.
///
/// Every cell within Euclidean distance `<= radius` of a path pixel is covered. Cells outside
/// the canvas are dropped, and the box is tight around the covered cells. Returns `None` when
/// nothing lands on the canvas.
pub fn rasterize_mask(
    path: &DensePath,
    radius: u32,
    canvas: CanvasSize,
) -> Option<(StrokeMask, BoundingBox)> {
    if path.is_empty() {
        return None;
    }

    let spans = disk_spans(radius);
    let r = i64::from(radius);
    let w = i64::from(canvas.width);
    let h = i64::from(canvas.height);

    let mut mask = StrokeMask::empty(canvas.width, canvas.height);
    let mut bounds: Option<(u32, u32, u32, u32)> = None;

    for &Point { x, y } in path.pixels() {
        let (cx, cy) = (i64::from(x), i64::from(y));
        for (i, &half) in spans.iter().enumerate() {
            let py = cy - r + i as i64;
            if py < 0 || py >= h {
                continue;
            }
            let x0 = (cx - half).max(0);
            let x1 = (cx + half).min(w - 1);
            if x0 > x1 {
                continue;
            }
            let (x0, x1, py) = (x0 as u32, x1 as u32, py as u32);
            mask.fill_span(py, x0, x1);
            bounds = Some(match bounds {
                None => (x0, py, x1, py),
                Some((l, t, rr, b)) => (l.min(x0), t.min(py), rr.max(x1), b.max(py)),
            });
        }
    }

    let (left, top, right, bottom) = bounds?;
    let bbox = BoundingBox {
        left,
        top,
        right,
        bottom,
    };
    tracing::debug!(
        radius,
        covered = mask.covered_count(),
        ?bbox,
        "rasterized stroke mask"
    );
    Some((mask, bbox))
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/mask.rs"]
mod tests;
