use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;

use crate::effect::runner::RunnerConfig;
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::registry::catalog::Registry;

/// Pipeline settings, loadable from JSON. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrokeFxConfig {
    /// Where job and result files are exchanged with effect processes.
    pub job_dir: PathBuf,
    /// Where canvas versions and history manifests live.
    pub store_dir: PathBuf,
    pub timeout_ms: u64,
    pub keep_job_artifacts: bool,
    pub poll_interval_ms: u64,
    /// External effect manifests, relative to the config file.
    pub manifests: Vec<PathBuf>,
}

impl Default for StrokeFxConfig {
    fn default() -> Self {
        Self {
            job_dir: PathBuf::from("temp"),
            store_dir: PathBuf::from("images"),
            timeout_ms: 60_000,
            keep_job_artifacts: false,
            poll_interval_ms: 20,
            manifests: Vec::new(),
        }
    }
}

impl StrokeFxConfig {
    pub fn load(path: &Path) -> StrokeFxResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read config '{}'", path.display()))?;
        let mut cfg: Self = serde_json::from_slice(&bytes)
            .map_err(|e| StrokeFxError::serde(format!("parse config '{}': {e}", path.display())))?;
        if let Some(base) = path.parent() {
            for m in &mut cfg.manifests {
                if m.is_relative() {
                    *m = base.join(&*m);
                }
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> StrokeFxResult<()> {
        if self.timeout_ms == 0 {
            return Err(StrokeFxError::invalid_parameter("timeout_ms must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(StrokeFxError::invalid_parameter(
                "poll_interval_ms must be > 0",
            ));
        }
        if self.job_dir.as_os_str().is_empty() || self.store_dir.as_os_str().is_empty() {
            return Err(StrokeFxError::invalid_parameter(
                "job_dir and store_dir must be non-empty",
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn runner_config(&self) -> RunnerConfig {
        let mut cfg = RunnerConfig::new(&self.job_dir);
        cfg.poll_interval = Duration::from_millis(self.poll_interval_ms);
        cfg.keep_artifacts = self.keep_job_artifacts;
        cfg
    }

    /// Built-in registry plus every configured manifest.
    pub fn registry(&self) -> StrokeFxResult<Registry> {
        let mut reg = Registry::with_builtins();
        for m in &self.manifests {
            reg.load_manifest(m)?;
        }
        Ok(reg)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
