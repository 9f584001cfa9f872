use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::registry::catalog::Registry;
use crate::registry::params::{ParamDecl, ParamMap, ParamValue};

/// Outcome of [`PropertySet::sync`]: which controls the GUI must create and drop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
struct Property {
    decl: ParamDecl,
    value: ParamValue,
}

/// Live, user-editable values for the requirements of the active brush and effect.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertySet {
    props: Vec<Property>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with the requirements of `active`.
    ///
    /// Properties that are still required keep their current value; new names start at their
    /// declared default; names no longer required by anything active are dropped.
    pub fn sync(&mut self, registry: &Registry, active: &[&str]) -> StrokeFxResult<PropertyDiff> {
        let wanted = registry.merged_requirements(active)?;
        let mut diff = PropertyDiff::default();

        let mut next = Vec::with_capacity(wanted.len());
        for decl in wanted {
            match self.props.iter().position(|p| p.decl.name == decl.name) {
                Some(i) if self.props[i].decl.kind == decl.kind => {
                    let value = self.props[i].value.clone();
                    next.push(Property { decl, value });
                }
                _ => {
                    diff.added.push(decl.name.clone());
                    let value = decl.default.clone();
                    next.push(Property { decl, value });
                }
            }
        }
        for p in &self.props {
            if !next
                .iter()
                .any(|n| n.decl.name == p.decl.name && n.decl.kind == p.decl.kind)
            {
                diff.removed.push(p.decl.name.clone());
            }
        }

        self.props = next;
        Ok(diff)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.props.iter().map(|p| p.decl.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.props
            .iter()
            .find(|p| p.decl.name == name)
            .map(|p| &p.value)
    }

    pub fn set(&mut self, name: &str, value: ParamValue) -> StrokeFxResult<()> {
        let prop = self
            .props
            .iter_mut()
            .find(|p| p.decl.name == name)
            .ok_or_else(|| StrokeFxError::invalid_parameter(format!("no property '{name}'")))?;
        prop.decl.check(&value)?;
        prop.value = value;
        Ok(())
    }

    /// Set from user text, parsed as the property's declared kind.
    pub fn set_text(&mut self, name: &str, text: &str) -> StrokeFxResult<()> {
        let kind = self
            .props
            .iter()
            .find(|p| p.decl.name == name)
            .map(|p| p.decl.kind)
            .ok_or_else(|| StrokeFxError::invalid_parameter(format!("no property '{name}'")))?;
        self.set(name, ParamValue::parse_as(kind, text)?)
    }

    /// Snapshot of the current values as a job parameter map.
    pub fn to_params(&self) -> ParamMap {
        self.props
            .iter()
            .map(|p| (p.decl.name.clone(), p.value.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/registry/properties.rs"]
mod tests;
