use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::effect::builtin;
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::registry::params::{ParamDecl, ParamMap, ParamValue};

/// Name of the radius requirement shared by every brush.
pub const RADIUS: &str = "Radius";

/// How the runner starts an effect's child process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectLauncher {
    /// Hosted by the `strokefx` binary: `<exe> effect <id> <job_id>`.
    Builtin,
    /// External program; the job id is appended as the final argument.
    Command { program: PathBuf, args: Vec<String> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrushDescriptor {
    pub id: String,
    pub label: String,
    pub requirements: Vec<ParamDecl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EffectDescriptor {
    pub id: String,
    pub name: String,
    pub requirements: Vec<ParamDecl>,
    pub launcher: EffectLauncher,
    /// The effect's output alpha plane is meaningful and should reach the canvas.
    pub writes_alpha: bool,
}

/// JSON declaration of an external effect.
///
/// ```json
/// { "id": "sepia", "command": ["python3", "effects/sepia.py"],
///   "requirements": [{ "name": "Strength", "kind": "number", "default": { "type": "number", "value": 0.5 } }] }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EffectManifest {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub command: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<ParamDecl>,
    #[serde(default)]
    pub writes_alpha: bool,
}

impl EffectManifest {
    pub fn load(path: &Path) -> StrokeFxResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read manifest '{}'", path.display()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            StrokeFxError::serde(format!("parse manifest '{}': {e}", path.display()))
        })
    }

    fn into_descriptor(self, base_dir: Option<&Path>) -> StrokeFxResult<EffectDescriptor> {
        let mut parts = self.command.into_iter();
        let Some(program) = parts.next() else {
            return Err(StrokeFxError::invalid_parameter(format!(
                "effect '{}' manifest has an empty command",
                self.id
            )));
        };
        let mut program = PathBuf::from(program);
        // Relative programs with a directory component resolve against the manifest.
        if let Some(base) = base_dir
            && program.is_relative()
            && program.components().count() > 1
        {
            program = base.join(program);
        }
        for decl in &self.requirements {
            decl.check(&decl.default)?;
        }
        Ok(EffectDescriptor {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            requirements: self.requirements,
            launcher: EffectLauncher::Command {
                program,
                args: parts.collect(),
            },
            writes_alpha: self.writes_alpha,
        })
    }
}

/// Static catalog of brushes and effects and the parameters each one requires.
///
/// Brush and effect ids share one namespace.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    brushes: BTreeMap<String, BrushDescriptor>,
    effects: BTreeMap<String, EffectDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the default brush and every built-in effect.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        let brush = BrushDescriptor {
            id: "smooth".to_owned(),
            label: "Smooth Brush".to_owned(),
            requirements: vec![ParamDecl::new(RADIUS, ParamValue::Number(5.0))],
        };
        // Fresh registry: ids cannot collide.
        reg.brushes.insert(brush.id.clone(), brush);
        for fx in builtin::all() {
            let desc = EffectDescriptor {
                id: fx.id().to_owned(),
                name: fx.name().to_owned(),
                requirements: fx.requirements(),
                launcher: EffectLauncher::Builtin,
                writes_alpha: fx.writes_alpha(),
            };
            reg.effects.insert(desc.id.clone(), desc);
        }
        reg
    }

    fn ensure_free(&self, id: &str) -> StrokeFxResult<()> {
        if id.trim().is_empty() {
            return Err(StrokeFxError::invalid_parameter("ids must be non-empty"));
        }
        if self.brushes.contains_key(id) || self.effects.contains_key(id) {
            return Err(StrokeFxError::invalid_parameter(format!(
                "'{id}' is already registered"
            )));
        }
        Ok(())
    }

    pub fn register_brush(&mut self, desc: BrushDescriptor) -> StrokeFxResult<()> {
        self.ensure_free(&desc.id)?;
        if !desc.requirements.iter().any(|d| d.name == RADIUS) {
            return Err(StrokeFxError::invalid_parameter(format!(
                "brush '{}' must declare '{RADIUS}'",
                desc.id
            )));
        }
        self.brushes.insert(desc.id.clone(), desc);
        Ok(())
    }

    pub fn register_effect(&mut self, desc: EffectDescriptor) -> StrokeFxResult<()> {
        self.ensure_free(&desc.id)?;
        tracing::debug!(effect = %desc.id, "registered effect");
        self.effects.insert(desc.id.clone(), desc);
        Ok(())
    }

    pub fn register_manifest(&mut self, manifest: EffectManifest) -> StrokeFxResult<()> {
        self.register_effect(manifest.into_descriptor(None)?)
    }

    /// Load and register an effect manifest; relative command paths resolve next to it.
    pub fn load_manifest(&mut self, path: &Path) -> StrokeFxResult<()> {
        let manifest = EffectManifest::load(path)?;
        self.register_effect(manifest.into_descriptor(path.parent())?)
    }

    pub fn brush(&self, id: &str) -> StrokeFxResult<&BrushDescriptor> {
        self.brushes
            .get(id)
            .ok_or_else(|| StrokeFxError::invalid_parameter(format!("unknown brush '{id}'")))
    }

    pub fn effect(&self, id: &str) -> StrokeFxResult<&EffectDescriptor> {
        self.effects
            .get(id)
            .ok_or_else(|| StrokeFxError::invalid_parameter(format!("unknown effect '{id}'")))
    }

    pub fn brush_ids(&self) -> impl Iterator<Item = &str> {
        self.brushes.keys().map(String::as_str)
    }

    pub fn effect_ids(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(String::as_str)
    }

    /// Ordered requirements of a brush or effect.
    pub fn requirements(&self, id: &str) -> StrokeFxResult<&[ParamDecl]> {
        if let Some(b) = self.brushes.get(id) {
            return Ok(&b.requirements);
        }
        if let Some(e) = self.effects.get(id) {
            return Ok(&e.requirements);
        }
        Err(StrokeFxError::invalid_parameter(format!(
            "unknown brush or effect '{id}'"
        )))
    }

    /// Union of the requirements of `ids`, in first-declared order, one entry per name.
    pub fn merged_requirements(&self, ids: &[&str]) -> StrokeFxResult<Vec<ParamDecl>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in ids {
            for decl in self.requirements(id)? {
                if seen.insert(decl.name.clone()) {
                    out.push(decl.clone());
                }
            }
        }
        Ok(out)
    }

    /// Check that `params` supplies every requirement of `id` with the declared type.
    pub fn validate(&self, id: &str, params: &ParamMap) -> StrokeFxResult<()> {
        for decl in self.requirements(id)? {
            let Some(value) = params.get(&decl.name) else {
                return Err(StrokeFxError::missing_parameter(format!(
                    "'{}' required by '{id}'",
                    decl.name
                )));
            };
            decl.check(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/registry/catalog.rs"]
mod tests;
