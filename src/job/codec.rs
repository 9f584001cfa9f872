//! Job Codec: the boundary format shared by the editor and effect processes.
//!
//! Jobs and results are JSON documents stored as `job_<id>.json` and `result_<id>.json` in a
//! job directory. Pixel grids are nested `H x W x C` integer arrays and masks are `H x W`
//! boolean arrays, so effects in any language can read them without a custom decoder.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{BoundingBox, Point};
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::geometry::mask::StrokeMask;
use crate::job::model::{Job, JobId};
use crate::raster::block::{ImageBlock, PixelLayout};
use crate::registry::params::ParamMap;

/// Locations of the artifacts of every job, derived from the job id alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobPaths {
    dir: PathBuf,
}

impl JobPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn job_file(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("job_{id}.json"))
    }

    pub fn result_file(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("result_{id}.json"))
    }

    pub fn ensure_dir(&self) -> StrokeFxResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create job directory '{}'", self.dir.display()))?;
        Ok(())
    }

    /// Remove both artifacts of `id`, ignoring files that do not exist.
    pub fn remove(&self, id: JobId) {
        for p in [self.job_file(id), self.result_file(id)] {
            if let Err(e) = std::fs::remove_file(&p)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %p.display(), error = %e, "failed to remove job artifact");
            }
        }
    }
}

#[derive(serde::Serialize)]
struct JobWireOut<'a> {
    job_id: JobId,
    #[serde(rename = "box")]
    bbox: [u32; 4],
    width: u32,
    height: u32,
    channels: u8,
    writes_alpha: bool,
    image: Vec<Vec<&'a [u8]>>,
    mask: Vec<&'a [bool]>,
    points: Vec<[i32; 2]>,
    params: &'a ParamMap,
}

#[derive(serde::Deserialize)]
struct JobWireIn {
    job_id: JobId,
    #[serde(rename = "box")]
    bbox: [u32; 4],
    #[serde(default)]
    writes_alpha: bool,
    image: Vec<Vec<Vec<u8>>>,
    mask: Vec<Vec<bool>>,
    points: Vec<[i32; 2]>,
    #[serde(default)]
    params: ParamMap,
}

#[derive(serde::Serialize)]
struct ResultWireOut<'a> {
    width: u32,
    height: u32,
    channels: u8,
    image: Vec<Vec<&'a [u8]>>,
}

#[derive(serde::Deserialize)]
struct ResultWireIn {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    channels: Option<u8>,
    image: Vec<Vec<Vec<u8>>>,
}

fn grid_rows(block: &ImageBlock) -> Vec<Vec<&[u8]>> {
    let c = usize::from(block.channels());
    block
        .data()
        .chunks_exact(block.row_stride())
        .map(|row| row.chunks_exact(c).collect())
        .collect()
}

/// Flatten a nested pixel grid, checking it is rectangular with 3 or 4 channels.
fn grid_to_block(grid: Vec<Vec<Vec<u8>>>) -> StrokeFxResult<ImageBlock> {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    let channels = grid
        .first()
        .and_then(|row| row.first())
        .map_or(0, Vec::len);
    if height == 0 || width == 0 {
        return Err(StrokeFxError::serde("pixel grid is empty"));
    }
    let layout = u8::try_from(channels)
        .map_err(|_| StrokeFxError::serde(format!("pixel grid has {channels} channels")))
        .and_then(PixelLayout::from_channels)?;

    let mut data = Vec::with_capacity(height * width * channels);
    for (y, row) in grid.into_iter().enumerate() {
        if row.len() != width {
            return Err(StrokeFxError::serde(format!(
                "pixel grid row {y} has {} pixels, expected {width}",
                row.len()
            )));
        }
        for (x, px) in row.into_iter().enumerate() {
            if px.len() != channels {
                return Err(StrokeFxError::serde(format!(
                    "pixel ({x},{y}) has {} channels, expected {channels}",
                    px.len()
                )));
            }
            data.extend_from_slice(&px);
        }
    }
    ImageBlock::new(width as u32, height as u32, layout, data)
}

fn grid_to_mask(grid: Vec<Vec<bool>>) -> StrokeFxResult<StrokeMask> {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    let mut bits = Vec::with_capacity(height * width);
    for (y, row) in grid.into_iter().enumerate() {
        if row.len() != width {
            return Err(StrokeFxError::serde(format!(
                "mask row {y} has {} cells, expected {width}",
                row.len()
            )));
        }
        bits.extend(row);
    }
    StrokeMask::from_bits(width as u32, height as u32, bits)
}

/// Serialize a job for the effect process.
pub fn encode_job(job: &Job) -> StrokeFxResult<Vec<u8>> {
    let b = job.bbox();
    let mask = job.mask();
    let wire = JobWireOut {
        job_id: job.id(),
        bbox: [b.left, b.top, b.right, b.bottom],
        width: job.image().width(),
        height: job.image().height(),
        channels: job.image().channels(),
        writes_alpha: job.writes_alpha(),
        image: grid_rows(job.image()),
        mask: (0..mask.height()).map(|y| mask.row(y)).collect(),
        points: job.points().iter().map(|p| [p.x, p.y]).collect(),
        params: job.params(),
    };
    serde_json::to_vec(&wire).map_err(|e| StrokeFxError::serde(format!("encode job: {e}")))
}

/// Inverse of [`encode_job`]; used on the effect side of the boundary.
pub fn decode_job(bytes: &[u8]) -> StrokeFxResult<Job> {
    let wire: JobWireIn =
        serde_json::from_slice(bytes).map_err(|e| StrokeFxError::serde(format!("decode job: {e}")))?;
    let [left, top, right, bottom] = wire.bbox;
    let bbox = BoundingBox::new(left, top, right, bottom)?;
    let image = grid_to_block(wire.image)?;
    let mask = grid_to_mask(wire.mask)?;
    let points = wire.points.into_iter().map(|[x, y]| Point::new(x, y)).collect();
    Job::new(
        wire.job_id,
        bbox,
        image,
        mask,
        points,
        wire.params,
        wire.writes_alpha,
    )
}

/// Serialize an effect's output block.
pub fn encode_result(block: &ImageBlock) -> StrokeFxResult<Vec<u8>> {
    let wire = ResultWireOut {
        width: block.width(),
        height: block.height(),
        channels: block.channels(),
        image: grid_rows(block),
    };
    serde_json::to_vec(&wire).map_err(|e| StrokeFxError::serde(format!("encode result: {e}")))
}

/// Decode an effect's output block and check it has the job's `(width, height)`.
///
/// Header fields are optional; when present they must agree with the grid itself.
pub fn decode_result(bytes: &[u8], expected: (u32, u32)) -> StrokeFxResult<ImageBlock> {
    let wire: ResultWireIn = serde_json::from_slice(bytes)
        .map_err(|e| StrokeFxError::serde(format!("decode result: {e}")))?;
    let declared = (wire.width, wire.height, wire.channels);
    let block = grid_to_block(wire.image)?;

    let (w, h, c) = block.shape();
    if declared.0.is_some_and(|v| v != w)
        || declared.1.is_some_and(|v| v != h)
        || declared.2.is_some_and(|v| v != c)
    {
        return Err(StrokeFxError::serde(format!(
            "result header {declared:?} disagrees with its {w}x{h}x{c} grid"
        )));
    }
    if (w, h) != expected {
        return Err(StrokeFxError::shape_mismatch(
            (expected.0, expected.1, c),
            (w, h, c),
        ));
    }
    Ok(block)
}

pub fn write_job(paths: &JobPaths, job: &Job) -> StrokeFxResult<PathBuf> {
    paths.ensure_dir()?;
    let path = paths.job_file(job.id());
    let bytes = encode_job(job)?;
    std::fs::write(&path, bytes).with_context(|| format!("write job '{}'", path.display()))?;
    Ok(path)
}

pub fn read_job(paths: &JobPaths, id: JobId) -> StrokeFxResult<Job> {
    let path = paths.job_file(id);
    let bytes = std::fs::read(&path).with_context(|| format!("read job '{}'", path.display()))?;
    let job = decode_job(&bytes)?;
    if job.id() != id {
        return Err(StrokeFxError::serde(format!(
            "job file '{}' carries id {}",
            path.display(),
            job.id()
        )));
    }
    Ok(job)
}

pub fn write_result(paths: &JobPaths, id: JobId, block: &ImageBlock) -> StrokeFxResult<PathBuf> {
    paths.ensure_dir()?;
    let path = paths.result_file(id);
    let bytes = encode_result(block)?;
    std::fs::write(&path, bytes).with_context(|| format!("write result '{}'", path.display()))?;
    Ok(path)
}

pub fn read_result(paths: &JobPaths, id: JobId, expected: (u32, u32)) -> StrokeFxResult<ImageBlock> {
    let path = paths.result_file(id);
    let bytes =
        std::fs::read(&path).with_context(|| format!("read result '{}'", path.display()))?;
    decode_result(&bytes, expected)
}

#[cfg(test)]
#[path = "../../tests/unit/job/codec.rs"]
mod tests;
