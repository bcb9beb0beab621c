//! Declarative parameter schemas with inclusive bounds.
//!
//! A strategy declares its knobs as data; `ParamSchema::resolve` merges a
//! flat override map onto the defaults and either returns the fully merged
//! map or an error enumerating every failing field. There is no partially
//! applied state: a parameter set is valid in full or does not exist.

use std::collections::BTreeMap;
use std::fmt;

/// Flat override currency: field name -> numeric value.
pub type ParamMap = BTreeMap<String, f64>;

/// Whether a field takes whole numbers or reals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Float,
}

/// One declared knob with its inclusive range.
#[derive(Debug, Clone, Copy)]
pub struct ParamField {
    pub name: &'static str,
    pub description: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub kind: ParamKind,
}

impl ParamField {
    fn check(&self, value: f64) -> Option<ParamViolation> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Some(ParamViolation::OutOfRange {
                field: self.name,
                value,
                min: self.min,
                max: self.max,
            });
        }
        if self.kind == ParamKind::Integer && value.fract() != 0.0 {
            return Some(ParamViolation::NotAnInteger {
                field: self.name,
                value,
            });
        }
        None
    }
}

/// Ordered field list for one strategy.
#[derive(Debug, Clone, Copy)]
pub struct ParamSchema {
    fields: &'static [ParamField],
}

impl ParamSchema {
    pub const fn new(fields: &'static [ParamField]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [ParamField] {
        self.fields
    }

    /// Default value map.
    pub fn defaults(&self) -> ParamMap {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), f.default))
            .collect()
    }

    /// Merge `overrides` onto the defaults.
    ///
    /// Every violation is collected — unknown fields, out-of-range values
    /// (bounds are inclusive), non-integer values for integer fields — and
    /// a single error reports them all. Nothing is applied on failure.
    pub fn resolve(&self, overrides: &ParamMap) -> Result<ParamMap, ParamError> {
        let mut violations = Vec::new();
        let mut merged = self.defaults();

        for (name, &value) in overrides {
            match self.fields.iter().find(|f| f.name == name.as_str()) {
                None => violations.push(ParamViolation::UnknownField { name: name.clone() }),
                Some(field) => {
                    if let Some(v) = field.check(value) {
                        violations.push(v);
                    } else {
                        merged.insert(name.clone(), value);
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(merged)
        } else {
            Err(ParamError { violations })
        }
    }
}

/// One failed field.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamViolation {
    UnknownField {
        name: String,
    },
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    NotAnInteger {
        field: &'static str,
        value: f64,
    },
}

impl fmt::Display for ParamViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamViolation::UnknownField { name } => write!(f, "unknown field '{name}'"),
            ParamViolation::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "'{field}' = {value} outside [{min}, {max}]"),
            ParamViolation::NotAnInteger { field, value } => {
                write!(f, "'{field}' = {value} must be a whole number")
            }
        }
    }
}

/// Validation failure carrying every violation found.
#[derive(Debug, Clone)]
pub struct ParamError {
    pub violations: Vec<ParamViolation>,
}

impl std::error::Error for ParamError {}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid parameters: ")?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
