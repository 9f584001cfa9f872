//! Effect side of the process boundary: read a job, run one effect, write its result.

use std::path::PathBuf;

use crate::effect::runner::JOB_DIR_ENV;
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::job::codec::{self, JobPaths};
use crate::job::model::{Job, JobId};
use crate::raster::block::ImageBlock;
use crate::registry::params::ParamDecl;

/// A pixel transformation applied to one job.
///
/// Implementations only see the job; they run inside the effect process and never touch the
/// editor's canvas.
pub trait Effect: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn requirements(&self) -> Vec<ParamDecl>;

    /// Whether the output alpha plane should replace the canvas alpha.
    fn writes_alpha(&self) -> bool {
        false
    }

    /// Produce a block with the same width and height as `job.image()`.
    fn apply(&self, job: &Job) -> StrokeFxResult<ImageBlock>;
}

/// Job directory for an effect process: [`JOB_DIR_ENV`] or `temp`.
pub fn job_dir_from_env() -> PathBuf {
    std::env::var_os(JOB_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("temp"))
}

/// Run `effect` on the job stored under `id` and write its result next to it.
pub fn run_job(effect: &dyn Effect, paths: &JobPaths, id: JobId) -> StrokeFxResult<()> {
    let job = codec::read_job(paths, id)?;

    for decl in effect.requirements() {
        let Some(value) = job.params().get(&decl.name) else {
            return Err(StrokeFxError::missing_parameter(format!(
                "'{}' was not provided to '{}'",
                decl.name,
                effect.id()
            )));
        };
        decl.check(value)?;
    }

    let out = effect.apply(&job)?;
    let (w, h) = job.expected_dims();
    if (out.width(), out.height()) != (w, h) {
        return Err(StrokeFxError::shape_mismatch(
            (w, h, out.channels()),
            out.shape(),
        ));
    }

    codec::write_result(paths, id, &out)?;
    tracing::info!(effect = effect.id(), job = %id, "wrote effect result");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effect/host.rs"]
mod tests;
