//! Typed extraction from decoded catalog values

use super::{BitField, Value};
use crate::TelemetryError;

/// Trait for Rust types that can be read out of a decoded [`Value`].
pub trait VarData: Sized {
    /// Convert one element, failing if its kind does not match.
    fn from_value(value: &Value) -> crate::Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> TelemetryError {
    TelemetryError::TypeConversion {
        details: format!("Expected {}, got {}", expected, value.kind()),
    }
}

impl VarData for i32 {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Int32(v) => Ok(*v),
            other => Err(mismatch("Int32", other)),
        }
    }
}

impl VarData for f32 {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Float32(v) => Ok(*v),
            other => Err(mismatch("Float32", other)),
        }
    }
}

impl VarData for f64 {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Float64(v) => Ok(*v),
            Value::Float32(v) => Ok(f64::from(*v)),
            other => Err(mismatch("Float64", other)),
        }
    }
}

impl VarData for bool {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => Err(mismatch("Bool", other)),
        }
    }
}

impl VarData for BitField {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::BitField(v) => Ok(*v),
            other => Err(mismatch("BitField", other)),
        }
    }
}

impl VarData for String {
    fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            other => Err(mismatch("Text", other)),
        }
    }
}
