//! End-to-end stroke orchestration: validate, rasterize, run the effect, merge, commit.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread::JoinHandle,
    time::Duration,
};

use crate::compose::compositor;
use crate::effect::runner::{CancelToken, EffectFailure, EffectRunner, FailureKind};
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::geometry::mask::rasterize_mask;
use crate::geometry::path::{PointerPath, densify_clipped};
use crate::history::store::{CanvasHistory, VersionId};
use crate::job::model::Job;
use crate::registry::catalog::Registry;
use crate::registry::params::ParamMap;
use crate::stroke::brush::{self, Brush};

/// How a stroke ended when nothing went wrong locally.
#[derive(Clone, Debug, PartialEq)]
pub enum StrokeOutcome {
    /// The merged canvas was committed as this version.
    Committed(VersionId),
    /// Nothing to do: no points, or the stroke never touched the canvas.
    Skipped,
    /// The effect produced no usable result. The canvas is unchanged.
    Failed(EffectFailure),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Handle on a stroke running in the background.
#[derive(Debug)]
pub struct StrokeTicket {
    status: Arc<Mutex<JobStatus>>,
    cancel: CancelToken,
    handle: JoinHandle<StrokeFxResult<StrokeOutcome>>,
}

impl StrokeTicket {
    pub fn status(&self) -> JobStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ask the running effect to stop. The canvas is left unchanged.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the stroke finishes.
    pub fn wait(self) -> StrokeFxResult<StrokeOutcome> {
        self.handle
            .join()
            .map_err(|_| StrokeFxError::Other(anyhow::anyhow!("stroke worker panicked")))?
    }
}

/// Everything needed to turn a finished stroke into a committed canvas version.
pub struct StrokePipeline {
    registry: Arc<Registry>,
    runner: EffectRunner,
    history: Arc<Mutex<CanvasHistory>>,
    timeout: Duration,
}

impl StrokePipeline {
    pub fn new(
        registry: Arc<Registry>,
        runner: EffectRunner,
        history: Arc<Mutex<CanvasHistory>>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            runner,
            history,
            timeout,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Shared handle on the canvas history. Commit, undo and export serialize on it.
    pub fn history(&self) -> Arc<Mutex<CanvasHistory>> {
        Arc::clone(&self.history)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock_history(&self) -> StrokeFxResult<MutexGuard<'_, CanvasHistory>> {
        self.history
            .lock()
            .map_err(|_| StrokeFxError::Other(anyhow::anyhow!("canvas history lock poisoned")))
    }

    /// Check the parameter map against the brush and the effect. No process is started.
    pub fn validate(
        &self,
        brush_id: &str,
        effect_id: &str,
        params: &ParamMap,
    ) -> StrokeFxResult<()> {
        self.registry.validate(brush_id, params)?;
        self.registry.validate(effect_id, params)?;
        brush::radius_from(params)?;
        Ok(())
    }

    pub fn apply_stroke(
        &self,
        brush_id: &str,
        effect_id: &str,
        path: &PointerPath,
        params: &ParamMap,
    ) -> StrokeFxResult<StrokeOutcome> {
        self.apply_stroke_cancellable(brush_id, effect_id, path, params, &CancelToken::new())
    }

    /// Run one stroke to completion on the calling thread.
    ///
    /// Parameter problems are returned as errors before any process starts. Effect failures
    /// come back as [`StrokeOutcome::Failed`] with the canvas untouched.
    #[tracing::instrument(skip_all, fields(brush = brush_id, effect = effect_id))]
    pub fn apply_stroke_cancellable(
        &self,
        brush_id: &str,
        effect_id: &str,
        path: &PointerPath,
        params: &ParamMap,
        cancel: &CancelToken,
    ) -> StrokeFxResult<StrokeOutcome> {
        self.validate(brush_id, effect_id, params)?;
        let effect = self.registry.effect(effect_id)?;
        let radius = brush::radius_from(params)?;

        if path.is_empty() {
            tracing::info!("empty stroke, nothing to do");
            return Ok(StrokeOutcome::Skipped);
        }

        let (base_version, canvas) = {
            let history = self.lock_history()?;
            (history.current_version(), history.current()?)
        };

        let dense = densify_clipped(path, canvas.size(), radius);
        let Some((full_mask, bbox)) = rasterize_mask(&dense, radius, canvas.size()) else {
            tracing::info!("stroke does not touch the canvas, nothing to do");
            return Ok(StrokeOutcome::Skipped);
        };

        let job = Job::from_stroke(
            &canvas,
            &full_mask,
            bbox,
            &path.deduped(),
            params.clone(),
            effect.writes_alpha,
        )?;
        tracing::info!(job = %job.id(), ?bbox, "job created");

        let result = match self
            .runner
            .run_effect_cancellable(effect, &job, self.timeout, cancel)
        {
            Ok(block) => block,
            Err(failure) => return Ok(StrokeOutcome::Failed(failure)),
        };

        let mut history = self.lock_history()?;
        // The pointer moved while the effect ran; merge onto what is current now.
        let canvas = if history.current_version() == base_version {
            canvas
        } else {
            tracing::debug!("canvas changed during effect run, reloading");
            history.current()?
        };
        let merged = compositor::merge(&canvas, &result, job.mask(), bbox, job.writes_alpha())?;
        let version = history.commit(&merged)?;
        Ok(StrokeOutcome::Committed(version))
    }

    /// Take the finished stroke from `brush` and run it on the calling thread.
    ///
    /// The brush stays locked for the duration. An empty brush yields [`StrokeOutcome::Skipped`].
    pub fn run_stroke(
        &self,
        brush: &mut Brush,
        effect_id: &str,
        params: &ParamMap,
    ) -> StrokeFxResult<StrokeOutcome> {
        self.validate(brush.id(), effect_id, params)?;
        let (path, _lock) = match brush.take_stroke() {
            Ok(taken) => taken,
            Err(StrokeFxError::EmptyStroke(_)) => return Ok(StrokeOutcome::Skipped),
            Err(e) => return Err(e),
        };
        self.apply_stroke(brush.id(), effect_id, &path, params)
    }

    /// Take the finished stroke from `brush` and run it on a worker thread.
    ///
    /// Parameters are validated before the worker starts. The brush refuses new strokes with
    /// `BrushBusy` until the returned ticket's stroke has finished.
    pub fn spawn_stroke(
        self: &Arc<Self>,
        brush: &mut Brush,
        effect_id: &str,
        params: ParamMap,
    ) -> StrokeFxResult<StrokeTicket> {
        self.validate(brush.id(), effect_id, &params)?;
        let (path, lock) = brush.take_stroke()?;

        let status = Arc::new(Mutex::new(JobStatus::Pending));
        let cancel = CancelToken::new();
        let pipeline = Arc::clone(self);
        let brush_id = brush.id().to_owned();
        let effect_id = effect_id.to_owned();
        let worker_status = Arc::clone(&status);
        let worker_cancel = cancel.clone();

        let handle = std::thread::Builder::new()
            .name(format!("strokefx-{brush_id}"))
            .spawn(move || {
                set_status(&worker_status, JobStatus::Running);
                let out = pipeline.apply_stroke_cancellable(
                    &brush_id,
                    &effect_id,
                    &path,
                    &params,
                    &worker_cancel,
                );
                let end = match &out {
                    Ok(StrokeOutcome::Committed(_) | StrokeOutcome::Skipped) => JobStatus::Completed,
                    Ok(StrokeOutcome::Failed(f)) if f.kind == FailureKind::Cancelled => {
                        JobStatus::Cancelled
                    }
                    Ok(StrokeOutcome::Failed(_)) | Err(_) => JobStatus::Failed,
                };
                drop(lock);
                set_status(&worker_status, end);
                out
            })
            .map_err(|e| StrokeFxError::Other(anyhow::anyhow!("spawn stroke worker: {e}")))?;

        Ok(StrokeTicket {
            status,
            cancel,
            handle,
        })
    }
}

fn set_status(status: &Mutex<JobStatus>, value: JobStatus) {
    *status.lock().unwrap_or_else(|e| e.into_inner()) = value;
}

#[cfg(test)]
#[path = "../../tests/unit/stroke/pipeline.rs"]
mod tests;
