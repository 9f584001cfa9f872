//! strokefx turns freehand brush strokes into localized image edits.
//!
//! A stroke is a list of pointer samples. The pipeline turns it into a committed canvas
//! version in five steps:
//!
//! 1. **Rasterize**: densify the samples into a gap-free pixel path, dilate it by the brush
//!    radius into a coverage mask, and take the mask's tight bounding box.
//! 2. **Package**: crop the canvas and mask to the box and build a [`Job`] with the box-local
//!    path and the parameter map.
//! 3. **Run**: hand the job to an effect running as a separate process ([`EffectRunner`]). Jobs
//!    and results travel as JSON files named after the job id.
//! 4. **Merge**: copy the result into a full-canvas copy wherever the mask is set
//!    ([`merge`]).
//! 5. **Commit**: store the merged buffer as a new immutable version ([`CanvasHistory`]).
//!
//! Effects never touch the canvas. A crashing, hanging or misbehaving effect ends as an
//! [`EffectFailure`] and the canvas stays at its last committed version.
#![forbid(unsafe_code)]

mod compose;
mod config;
mod effect;
mod foundation;
mod geometry;
mod history;
mod job;
mod raster;
mod registry;
mod stroke;

pub use compose::compositor::merge;
pub use config::StrokeFxConfig;
pub use effect::builtin::{ClearAlpha, Fill, Identity};
pub use effect::host::{Effect, job_dir_from_env, run_job};
pub use effect::runner::{
    CancelToken, EffectFailure, EffectRunner, FailureKind, JOB_DIR_ENV, RunnerConfig,
};
pub use foundation::core::{BoundingBox, CanvasSize, Point};
pub use foundation::error::{StrokeFxError, StrokeFxResult};
pub use geometry::mask::{StrokeMask, rasterize_mask};
pub use geometry::path::{DensePath, PointerPath, densify, densify_clipped, line_pixels};
pub use history::store::{CanvasHistory, HistoryState, VersionId};
pub use job::codec::{
    JobPaths, decode_job, decode_result, encode_job, encode_result, read_job, read_result,
    write_job, write_result,
};
pub use job::model::{Job, JobId};
pub use raster::block::{ImageBlock, PixelLayout};
pub use registry::catalog::{
    BrushDescriptor, EffectDescriptor, EffectLauncher, EffectManifest, RADIUS, Registry,
};
pub use registry::params::{ParamDecl, ParamKind, ParamMap, ParamValue, parse_hex_color};
pub use registry::properties::{PropertyDiff, PropertySet};
pub use stroke::brush::{Brush, BrushLock, MAX_RADIUS, radius_from};
pub use stroke::pipeline::{JobStatus, StrokeOutcome, StrokePipeline, StrokeTicket};

/// Built-in effects hosted by the `strokefx` binary.
pub mod builtins {
    pub use crate::effect::builtin::{all, lookup};
}
