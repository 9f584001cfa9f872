use crate::effect::runner::EffectFailure;

/// Convenience result type used across strokefx.
pub type StrokeFxResult<T> = Result<T, StrokeFxError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum StrokeFxError {
    /// A parameter value is malformed, has the wrong type, or is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A declared requirement has no value in the job's parameter map.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// The stroke has no path to operate on.
    #[error("empty stroke: {0}")]
    EmptyStroke(String),

    /// The effect child process failed, crashed, timed out or was cancelled.
    #[error("effect failure: {0}")]
    EffectFailure(Box<EffectFailure>),

    /// A pixel grid did not have the dimensions the caller expected.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape, formatted `WxHxC`.
        expected: String,
        /// Actual shape, formatted `WxHxC`.
        actual: String,
    },

    /// A region extends past the canvas extent.
    #[error("region out of bounds: {0}")]
    RegionOutOfBounds(String),

    /// Undo requested while already at the oldest version.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Redo requested while already at the newest version.
    #[error("nothing to redo")]
    NothingToRedo,

    /// The brush already has a job in flight.
    #[error("brush busy: {0}")]
    BrushBusy(String),

    /// Errors when serializing or deserializing job, result or manifest data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrokeFxError {
    /// Build a [`StrokeFxError::InvalidParameter`] value.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Build a [`StrokeFxError::MissingParameter`] value.
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    /// Build a [`StrokeFxError::EmptyStroke`] value.
    pub fn empty_stroke(msg: impl Into<String>) -> Self {
        Self::EmptyStroke(msg.into())
    }

    /// Build a [`StrokeFxError::ShapeMismatch`] value from `(width, height, channels)` triples.
    pub fn shape_mismatch(expected: (u32, u32, u8), actual: (u32, u32, u8)) -> Self {
        Self::ShapeMismatch {
            expected: format!("{}x{}x{}", expected.0, expected.1, expected.2),
            actual: format!("{}x{}x{}", actual.0, actual.1, actual.2),
        }
    }

    /// Build a [`StrokeFxError::RegionOutOfBounds`] value.
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::RegionOutOfBounds(msg.into())
    }

    /// Build a [`StrokeFxError::BrushBusy`] value.
    pub fn brush_busy(msg: impl Into<String>) -> Self {
        Self::BrushBusy(msg.into())
    }

    /// Build a [`StrokeFxError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// True for failures that leave the canvas untouched and only abort the current stroke.
    pub fn is_stroke_abort(&self) -> bool {
        matches!(self, Self::EffectFailure(_) | Self::ShapeMismatch { .. })
    }
}

impl From<EffectFailure> for StrokeFxError {
    fn from(value: EffectFailure) -> Self {
        Self::EffectFailure(Box::new(value))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
