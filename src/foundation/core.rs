use crate::foundation::error::{StrokeFxError, StrokeFxResult};

/// Integer pixel coordinate. Pointer samples may lie outside the canvas.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance; two pixels are 8-connected when this is <= 1.
    pub fn chebyshev(self, other: Point) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> StrokeFxResult<Self> {
        if width == 0 || height == 0 {
            return Err(StrokeFxError::invalid_parameter(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn contains(self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width && (p.y as u32) < self.height
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Box covering the whole canvas.
    pub fn full_box(self) -> BoundingBox {
        BoundingBox {
            left: 0,
            top: 0,
            right: self.width - 1,
            bottom: self.height - 1,
        }
    }
}

/// Inclusive axis-aligned pixel rectangle in canvas coordinates.
///
/// `right >= left` and `bottom >= top` always hold, so a box is never empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> StrokeFxResult<Self> {
        if right < left || bottom < top {
            return Err(StrokeFxError::invalid_parameter(format!(
                "bounding box ({left},{top},{right},{bottom}) is inverted"
            )));
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn width(self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(self) -> u32 {
        self.bottom - self.top + 1
    }

    pub fn origin(self) -> Point {
        Point::new(self.left as i32, self.top as i32)
    }

    pub fn contains(self, p: Point) -> bool {
        p.x >= self.left as i32
            && p.x <= self.right as i32
            && p.y >= self.top as i32
            && p.y <= self.bottom as i32
    }

    pub fn fits_within(self, canvas: CanvasSize) -> bool {
        self.right < canvas.width && self.bottom < canvas.height
    }

    /// Translate a canvas coordinate into box-local coordinates.
    pub fn to_local(self, p: Point) -> Point {
        Point::new(p.x - self.left as i32, p.y - self.top as i32)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
