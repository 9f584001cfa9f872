use std::collections::BTreeMap;

use crate::foundation::error::{StrokeFxError, StrokeFxResult};

/// Open-ended parameter mapping carried by a job, keyed by requirement name.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Declared type of a requirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Number,
    Bool,
    Color,
    Path,
    Array,
}

/// Typed parameter value.
///
/// Serialized with an explicit `type` tag so values survive the job codec unchanged.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// Straight RGBA8.
    Color([u8; 4]),
    /// File system path, kept as text.
    Path(String),
    Array(Vec<ParamValue>),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::String(_) => ParamKind::String,
            Self::Number(_) => ParamKind::Number,
            Self::Bool(_) => ParamKind::Bool,
            Self::Color(_) => ParamKind::Color,
            Self::Path(_) => ParamKind::Path,
            Self::Array(_) => ParamKind::Array,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<[u8; 4]> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Path(s) => Some(s),
            _ => None,
        }
    }

    /// Parse user text (CLI flags, GUI text fields) as a value of `kind`.
    pub fn parse_as(kind: ParamKind, text: &str) -> StrokeFxResult<Self> {
        let t = text.trim();
        match kind {
            ParamKind::String => Ok(Self::String(text.to_owned())),
            ParamKind::Path => Ok(Self::Path(t.to_owned())),
            ParamKind::Number => {
                let n: f64 = t.parse().map_err(|_| {
                    StrokeFxError::invalid_parameter(format!("'{t}' is not a number"))
                })?;
                if !n.is_finite() {
                    return Err(StrokeFxError::invalid_parameter(format!(
                        "'{t}' must be finite"
                    )));
                }
                Ok(Self::Number(n))
            }
            ParamKind::Bool => match t.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Self::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Self::Bool(false)),
                _ => Err(StrokeFxError::invalid_parameter(format!(
                    "'{t}' is not a boolean"
                ))),
            },
            ParamKind::Color => parse_hex_color(t).map(Self::Color),
            ParamKind::Array => {
                let v: Vec<ParamValue> = serde_json::from_str(t).map_err(|e| {
                    StrokeFxError::invalid_parameter(format!("array value must be JSON: {e}"))
                })?;
                Ok(Self::Array(v))
            }
        }
    }
}

/// `#RRGGBB` or `#RRGGBBAA`, case-insensitive, leading `#` optional.
pub fn parse_hex_color(s: &str) -> StrokeFxResult<[u8; 4]> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> StrokeFxResult<u8> {
        u8::from_str_radix(pair, 16)
            .map_err(|_| StrokeFxError::invalid_parameter(format!("invalid hex byte \"{pair}\"")))
    }

    if !s.is_ascii() {
        return Err(StrokeFxError::invalid_parameter(
            "hex color must be #RRGGBB or #RRGGBBAA",
        ));
    }
    match s.len() {
        6 => Ok([
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        ]),
        8 => Ok([
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        ]),
        _ => Err(StrokeFxError::invalid_parameter(
            "hex color must be #RRGGBB or #RRGGBBAA",
        )),
    }
}

/// One named requirement of a brush or effect.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, default: ParamValue) -> Self {
        Self {
            name: name.into(),
            kind: default.kind(),
            default,
        }
    }

    /// Check that `value` has this declaration's type.
    pub fn check(&self, value: &ParamValue) -> StrokeFxResult<()> {
        if value.kind() != self.kind {
            return Err(StrokeFxError::invalid_parameter(format!(
                "'{}' expects {:?}, got {:?}",
                self.name,
                self.kind,
                value.kind()
            )));
        }
        if let ParamValue::Number(n) = value
            && !n.is_finite()
        {
            return Err(StrokeFxError::invalid_parameter(format!(
                "'{}' must be finite",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/registry/params.rs"]
mod tests;
