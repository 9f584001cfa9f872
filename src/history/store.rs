//! Canvas History: immutable, numbered canvas versions on disk with a movable current pointer.
//!
//! Each version is a standalone PNG named `{name}_v{id:06}.png`. The ordered version list and
//! the pointer live in `{name}.history.json` next to them, so a history can be reopened by a
//! later process.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::raster::block::ImageBlock;

/// Identifier of one committed canvas version. Strictly increasing, never reused.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct VersionId(pub u64);

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{:06}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryState {
    /// Nothing committed yet.
    Empty,
    /// The pointer is at the oldest version.
    Loaded,
    /// At least one edit lies behind the pointer.
    Modified,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Manifest {
    name: String,
    versions: Vec<VersionId>,
    current: Option<usize>,
    next_id: u64,
}

#[derive(Debug)]
pub struct CanvasHistory {
    dir: PathBuf,
    name: String,
    versions: Vec<VersionId>,
    current: Option<usize>,
    next_id: u64,
}

impl CanvasHistory {
    /// Empty history for canvas `name` stored under `dir`.
    ///
    /// Fails when `dir` already holds a history for `name`; use [`CanvasHistory::open`] to
    /// continue it.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> StrokeFxResult<Self> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(StrokeFxError::invalid_parameter(format!(
                "invalid canvas name '{name}'"
            )));
        }
        let dir = dir.into();
        let existing = manifest_path(&dir, &name);
        if existing.exists() {
            return Err(StrokeFxError::invalid_parameter(format!(
                "canvas '{name}' already has a history at '{}'",
                existing.display()
            )));
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create canvas store '{}'", dir.display()))?;
        Ok(Self {
            dir,
            name,
            versions: Vec::new(),
            current: None,
            next_id: 0,
        })
    }

    /// History whose first version is `initial`.
    pub fn create(
        dir: impl Into<PathBuf>,
        name: impl Into<String>,
        initial: &ImageBlock,
    ) -> StrokeFxResult<Self> {
        let mut h = Self::new(dir, name)?;
        h.commit(initial)?;
        Ok(h)
    }

    /// Resume the history previously persisted for `name` in `dir`.
    pub fn open(dir: impl Into<PathBuf>, name: &str) -> StrokeFxResult<Self> {
        let dir = dir.into();
        let path = manifest_path(&dir, name);
        let bytes =
            std::fs::read(&path).with_context(|| format!("read history '{}'", path.display()))?;
        let m: Manifest = serde_json::from_slice(&bytes).map_err(|e| {
            StrokeFxError::serde(format!("parse history '{}': {e}", path.display()))
        })?;

        let ordered = m.versions.windows(2).all(|w| w[0] < w[1]);
        let below_next = m.versions.last().is_none_or(|v| v.0 < m.next_id);
        let pointer_ok = match m.current {
            None => m.versions.is_empty(),
            Some(i) => i < m.versions.len(),
        };
        if m.name != name || !ordered || !below_next || !pointer_ok {
            return Err(StrokeFxError::serde(format!(
                "history '{}' is inconsistent",
                path.display()
            )));
        }

        Ok(Self {
            dir,
            name: m.name,
            versions: m.versions,
            current: m.current,
            next_id: m.next_id,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> HistoryState {
        match self.current {
            None => HistoryState::Empty,
            Some(0) => HistoryState::Loaded,
            Some(_) => HistoryState::Modified,
        }
    }

    /// Versions still reachable through undo and redo, oldest first.
    pub fn versions(&self) -> &[VersionId] {
        &self.versions
    }

    pub fn current_version(&self) -> Option<VersionId> {
        self.current.map(|i| self.versions[i])
    }

    pub fn version_path(&self, version: VersionId) -> PathBuf {
        self.dir.join(format!("{}_v{:06}.png", self.name, version.0))
    }

    /// Pixels of the current version.
    pub fn current(&self) -> StrokeFxResult<ImageBlock> {
        let version = self
            .current_version()
            .ok_or_else(|| StrokeFxError::invalid_parameter("canvas history is empty"))?;
        self.load(version)
    }

    pub fn load(&self, version: VersionId) -> StrokeFxResult<ImageBlock> {
        self.ensure_known(version)?;
        ImageBlock::load(&self.version_path(version))
    }

    /// Persist `buffer` as a new version and make it current.
    ///
    /// Versions ahead of the pointer (left behind by undo) are discarded. Nothing changes,
    /// in memory or on disk, unless both the image and the manifest are written.
    pub fn commit(&mut self, buffer: &ImageBlock) -> StrokeFxResult<VersionId> {
        let id = VersionId(self.next_id);
        let keep = self.current.map_or(0, |i| i + 1);
        let mut versions = self.versions[..keep].to_vec();
        versions.push(id);
        let next = Manifest {
            name: self.name.clone(),
            current: Some(versions.len() - 1),
            versions,
            next_id: self.next_id + 1,
        };

        let png = self.version_path(id);
        if let Err(e) = buffer
            .save_png(&png)
            .and_then(|()| self.write_manifest(&next))
        {
            remove_quietly(&png);
            return Err(e);
        }

        let discarded = self.versions.split_off(keep);
        self.adopt(next);
        for v in discarded {
            remove_quietly(&self.version_path(v));
        }
        tracing::info!(canvas = %self.name, version = %id, "committed canvas version");
        Ok(id)
    }

    /// Move the pointer to the previous version.
    pub fn undo(&mut self) -> StrokeFxResult<VersionId> {
        match self.current {
            Some(i) if i > 0 => {
                let v = self.move_pointer(i - 1)?;
                tracing::info!(canvas = %self.name, version = %v, "undo");
                Ok(v)
            }
            _ => Err(StrokeFxError::NothingToUndo),
        }
    }

    /// Move the pointer forward over a version left by [`CanvasHistory::undo`].
    pub fn redo(&mut self) -> StrokeFxResult<VersionId> {
        match self.current {
            Some(i) if i + 1 < self.versions.len() => {
                let v = self.move_pointer(i + 1)?;
                tracing::info!(canvas = %self.name, version = %v, "redo");
                Ok(v)
            }
            _ => Err(StrokeFxError::NothingToRedo),
        }
    }

    /// Copy the stored bytes of `version` to `dest`. History is not touched.
    pub fn export(&self, version: VersionId, dest: &Path) -> StrokeFxResult<()> {
        self.ensure_known(version)?;
        let src = self.version_path(version);
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create export directory '{}'", parent.display()))?;
        }
        std::fs::copy(&src, dest).with_context(|| {
            format!("export '{}' to '{}'", src.display(), dest.display())
        })?;
        Ok(())
    }

    fn ensure_known(&self, version: VersionId) -> StrokeFxResult<()> {
        if self.versions.contains(&version) {
            Ok(())
        } else {
            Err(StrokeFxError::invalid_parameter(format!(
                "canvas '{}' has no version {version}",
                self.name
            )))
        }
    }

    fn move_pointer(&mut self, index: usize) -> StrokeFxResult<VersionId> {
        let next = Manifest {
            name: self.name.clone(),
            versions: self.versions.clone(),
            current: Some(index),
            next_id: self.next_id,
        };
        self.write_manifest(&next)?;
        self.adopt(next);
        Ok(self.versions[index])
    }

    fn adopt(&mut self, m: Manifest) {
        self.versions = m.versions;
        self.current = m.current;
        self.next_id = m.next_id;
    }

    fn write_manifest(&self, m: &Manifest) -> StrokeFxResult<()> {
        let bytes = serde_json::to_vec_pretty(m)
            .map_err(|e| StrokeFxError::serde(format!("encode history: {e}")))?;
        let path = manifest_path(&self.dir, &self.name);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).with_context(|| format!("write '{}'", tmp.display()))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            remove_quietly(&tmp);
            return Err(anyhow::Error::new(e)
                .context(format!("replace history '{}'", path.display()))
                .into());
        }
        Ok(())
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
        }
    }
}

fn manifest_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.history.json"))
}

#[cfg(test)]
#[path = "../../tests/unit/history/store.rs"]
mod tests;
