use crate::foundation::core::{BoundingBox, Point};
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::geometry::mask::StrokeMask;
use crate::raster::block::ImageBlock;
use crate::registry::params::ParamMap;

/// Unique identifier of one effect invocation. Keys the job and result artifacts.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct JobId(uuid::Uuid);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn parse(s: &str) -> StrokeFxResult<Self> {
        uuid::Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| StrokeFxError::invalid_parameter(format!("bad job id '{s}': {e}")))
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

/// Self-contained unit of work for one effect run. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    id: JobId,
    bbox: BoundingBox,
    image: ImageBlock,
    mask: StrokeMask,
    points: Vec<Point>,
    params: ParamMap,
    writes_alpha: bool,
}

impl Job {
    /// Assemble a job from already-cropped parts. Image and mask must both match `bbox`.
    pub fn new(
        id: JobId,
        bbox: BoundingBox,
        image: ImageBlock,
        mask: StrokeMask,
        points: Vec<Point>,
        params: ParamMap,
        writes_alpha: bool,
    ) -> StrokeFxResult<Self> {
        if (image.width(), image.height()) != (bbox.width(), bbox.height()) {
            return Err(StrokeFxError::shape_mismatch(
                (bbox.width(), bbox.height(), image.channels()),
                image.shape(),
            ));
        }
        if (mask.width(), mask.height()) != (bbox.width(), bbox.height()) {
            return Err(StrokeFxError::shape_mismatch(
                (bbox.width(), bbox.height(), 1),
                (mask.width(), mask.height(), 1),
            ));
        }
        Ok(Self {
            id,
            bbox,
            image,
            mask,
            points,
            params,
            writes_alpha,
        })
    }

    /// Crop `canvas` and the full-canvas `mask` to `bbox` and translate `path` into box-local
    /// coordinates.
    pub fn from_stroke(
        canvas: &ImageBlock,
        mask: &StrokeMask,
        bbox: BoundingBox,
        path: &[Point],
        params: ParamMap,
        writes_alpha: bool,
    ) -> StrokeFxResult<Self> {
        let image = canvas.crop(bbox)?;
        let mask = mask.crop(bbox)?;
        let points = path.iter().map(|p| bbox.to_local(*p)).collect();
        Self::new(
            JobId::generate(),
            bbox,
            image,
            mask,
            points,
            params,
            writes_alpha,
        )
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Crop rectangle in canvas coordinates.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn image(&self) -> &ImageBlock {
        &self.image
    }

    /// Box-local coverage mask.
    pub fn mask(&self) -> &StrokeMask {
        &self.mask
    }

    /// Pointer samples in box-local coordinates.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn writes_alpha(&self) -> bool {
        self.writes_alpha
    }

    /// `(width, height)` every result for this job must have.
    pub fn expected_dims(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/model.rs"]
mod tests;
