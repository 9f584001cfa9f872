//! Effects shipped with the `strokefx` binary.

use crate::effect::host::Effect;
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::job::model::Job;
use crate::raster::block::ImageBlock;
use crate::registry::params::{ParamDecl, ParamValue};

/// Paint the stroke with `Color`, mixed over the original by `Strength` in `[0, 1]`.
pub struct Fill;

/// Make the stroke fully transparent.
pub struct ClearAlpha;

/// Return the crop unchanged.
pub struct Identity;

static FILL: Fill = Fill;
static CLEAR_ALPHA: ClearAlpha = ClearAlpha;
static IDENTITY: Identity = Identity;

pub fn all() -> [&'static dyn Effect; 3] {
    [&FILL, &CLEAR_ALPHA, &IDENTITY]
}

pub fn lookup(id: &str) -> Option<&'static dyn Effect> {
    all().into_iter().find(|e| e.id() == id)
}

impl Effect for Fill {
    fn id(&self) -> &'static str {
        "fill"
    }

    fn name(&self) -> &'static str {
        "Fill"
    }

    fn requirements(&self) -> Vec<ParamDecl> {
        vec![
            ParamDecl::new("Color", ParamValue::Color([0, 0, 0, 255])),
            ParamDecl::new("Strength", ParamValue::Number(1.0)),
        ]
    }

    fn apply(&self, job: &Job) -> StrokeFxResult<ImageBlock> {
        let color = job
            .params()
            .get("Color")
            .and_then(ParamValue::as_color)
            .ok_or_else(|| StrokeFxError::missing_parameter("Color"))?;
        let strength = job
            .params()
            .get("Strength")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| StrokeFxError::missing_parameter("Strength"))?;
        if !(0.0..=1.0).contains(&strength) {
            return Err(StrokeFxError::invalid_parameter(format!(
                "Strength must be in [0, 1], got {strength}"
            )));
        }

        let t = (strength * 255.0).round() as u16;
        let mut out = job.image().clone();
        let c = usize::from(out.channels());
        for px in out.data_mut().chunks_exact_mut(c) {
            for (ch, &target) in px.iter_mut().zip(color.iter()).take(3) {
                *ch = mix_u8(*ch, target, t);
            }
        }
        Ok(out)
    }
}

impl Effect for ClearAlpha {
    fn id(&self) -> &'static str {
        "clear_alpha"
    }

    fn name(&self) -> &'static str {
        "Clear Alpha"
    }

    fn requirements(&self) -> Vec<ParamDecl> {
        Vec::new()
    }

    fn writes_alpha(&self) -> bool {
        true
    }

    fn apply(&self, job: &Job) -> StrokeFxResult<ImageBlock> {
        let mut out = job.image().to_rgba();
        for px in out.data_mut().chunks_exact_mut(4) {
            px[3] = 0;
        }
        Ok(out)
    }
}

impl Effect for Identity {
    fn id(&self) -> &'static str {
        "identity"
    }

    fn name(&self) -> &'static str {
        "Identity"
    }

    fn requirements(&self) -> Vec<ParamDecl> {
        Vec::new()
    }

    fn apply(&self, job: &Job) -> StrokeFxResult<ImageBlock> {
        Ok(job.image().clone())
    }
}

/// `a + (b - a) * t / 255`, rounded.
fn mix_u8(a: u8, b: u8, t: u16) -> u8 {
    let a = u32::from(a);
    let b = u32::from(b);
    let t = u32::from(t);
    ((a * (255 - t) + b * t + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effect/builtin.rs"]
mod tests;
