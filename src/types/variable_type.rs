//! Telemetry variable type definitions

use serde::{Deserialize, Serialize};

use super::BitField;

/// Element types a variable descriptor can declare.
/// Maps to iRacing SDK's irsdk_VarType enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// 8-bit character (irsdk_char); arrays of these are fixed-length text
    Char,
    /// Boolean value (irsdk_bool)
    Bool,
    /// 32-bit signed integer (irsdk_int)
    Int32,
    /// 32-bit bitfield (irsdk_bitField)
    BitField,
    /// 32-bit floating point (irsdk_float)
    Float32,
    /// 64-bit floating point (irsdk_double)
    Float64,
}

impl VariableType {
    /// Returns the size in bytes of one element.
    /// Matches the irsdk_VarTypeBytes array from the iRacing SDK.
    pub const fn size(&self) -> usize {
        match self {
            VariableType::Char | VariableType::Bool => 1,
            VariableType::Int32 | VariableType::Float32 | VariableType::BitField => 4,
            VariableType::Float64 => 8,
        }
    }

    /// Map an irsdk_VarType code, `None` for codes this crate does not know.
    pub const fn from_irsdk(code: i32) -> Option<Self> {
        match code {
            0 => Some(VariableType::Char),
            1 => Some(VariableType::Bool),
            2 => Some(VariableType::Int32),
            3 => Some(VariableType::BitField),
            4 => Some(VariableType::Float32),
            5 => Some(VariableType::Float64),
            _ => None,
        }
    }
}

/// One decoded telemetry element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    BitField(BitField),
    Float32(f32),
    Float64(f64),
    Text(String),
}

impl Value {
    /// Name of the variant, for conversion diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Int32(_) => "Int32",
            Value::BitField(_) => "BitField",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Text(_) => "Text",
        }
    }
}

/// A variable's decoded payload: one element or an ordered run of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VarValue {
    Scalar(Value),
    Sequence(Vec<Value>),
}

impl VarValue {
    /// Borrow the scalar, `None` for sequences.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            VarValue::Scalar(value) => Some(value),
            VarValue::Sequence(_) => None,
        }
    }

    /// Elements in order; a scalar is a one-element slice.
    pub fn elements(&self) -> &[Value] {
        match self {
            VarValue::Scalar(value) => std::slice::from_ref(value),
            VarValue::Sequence(values) => values,
        }
    }
}
