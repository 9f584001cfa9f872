//! In-progress brush state: the pointer path being drawn and the one-job-in-flight lock.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::foundation::core::Point;
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::geometry::path::PointerPath;
use crate::registry::catalog::RADIUS;
use crate::registry::params::{ParamMap, ParamValue};

/// Largest accepted brush radius, in pixels.
pub const MAX_RADIUS: u32 = 4096;

#[derive(Debug)]
pub struct Brush {
    id: String,
    path: PointerPath,
    busy: Arc<AtomicBool>,
}

/// Held while a stroke taken from a [`Brush`] is being processed. Dropping it unlocks the brush.
#[derive(Debug)]
pub struct BrushLock {
    busy: Arc<AtomicBool>,
}

impl Drop for BrushLock {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Brush {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: PointerPath::new(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &PointerPath {
        &self.path
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Record a pointer sample. Samples are refused while a job is in flight.
    pub fn add_point(&mut self, p: Point) -> StrokeFxResult<()> {
        if self.is_busy() {
            return Err(StrokeFxError::brush_busy(format!(
                "brush '{}' is waiting for an effect",
                self.id
            )));
        }
        self.path.add_point(p);
        Ok(())
    }

    /// Finish the stroke: hand out its path and lock the brush until the lock is dropped.
    ///
    /// The brush path is cleared so a fresh stroke can start once the job completes.
    pub fn take_stroke(&mut self) -> StrokeFxResult<(PointerPath, BrushLock)> {
        if self.path.is_empty() {
            return Err(StrokeFxError::empty_stroke(format!(
                "brush '{}' has no points",
                self.id
            )));
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(StrokeFxError::brush_busy(format!(
                "brush '{}' already has a job in flight",
                self.id
            )));
        }
        let path = std::mem::take(&mut self.path);
        let lock = BrushLock {
            busy: Arc::clone(&self.busy),
        };
        Ok((path, lock))
    }

    /// Drop the stroke in progress.
    pub fn reset(&mut self) {
        self.path.clear();
    }
}

/// Read and check the brush radius from a parameter map.
pub fn radius_from(params: &ParamMap) -> StrokeFxResult<u32> {
    let r = match params.get(RADIUS) {
        Some(ParamValue::Number(r)) => *r,
        Some(other) => {
            return Err(StrokeFxError::invalid_parameter(format!(
                "'{RADIUS}' must be a number, got {:?}",
                other.kind()
            )));
        }
        None => return Err(StrokeFxError::missing_parameter(RADIUS)),
    };
    if !r.is_finite() || r <= 0.0 {
        return Err(StrokeFxError::invalid_parameter(format!(
            "'{RADIUS}' must be positive, got {r}"
        )));
    }
    let r = r.round();
    if r > f64::from(MAX_RADIUS) {
        return Err(StrokeFxError::invalid_parameter(format!(
            "'{RADIUS}' must be at most {MAX_RADIUS}, got {r}"
        )));
    }
    Ok(r as u32)
}

#[cfg(test)]
#[path = "../../tests/unit/stroke/brush.rs"]
mod tests;
