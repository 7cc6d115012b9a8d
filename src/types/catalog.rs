//! Decoded variable catalog for one value-buffer pass

use std::collections::HashMap;

use super::{BitField, VarValue, Value, VariableInfo, VariableSchema, VariableType};
use crate::Result;
use crate::codec::{fixed_at, le_f32, le_f64, le_i32, le_u32, nul_trimmed, span_at};

/// A decoded telemetry variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub data_type: VariableType,
    pub value: VarValue,
}

/// Every variable decoded from one value buffer, tagged with the counters that
/// produced it. Immutable once built; the decoder publishes a new one per pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    variables: HashMap<String, Variable>,
    version: i32,
    tick: i32,
}

impl Catalog {
    /// Decode every variable in `schema` from one value buffer.
    pub fn decode(schema: &VariableSchema, buffer: &[u8], version: i32, tick: i32) -> Result<Self> {
        let mut variables = HashMap::with_capacity(schema.variables.len());

        for info in schema.variables.values() {
            let value = decode_value(info, buffer)?;
            variables.insert(
                info.name.clone(),
                Variable { name: info.name.clone(), data_type: info.data_type, value },
            );
        }

        Ok(Self { variables, version, tick })
    }

    /// Look up a variable by name.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Data-version counter the catalog was decoded under.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Tick count of the buffer the catalog was decoded from.
    pub fn tick(&self) -> i32 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate over the decoded variables in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }
}

fn decode_value(info: &VariableInfo, buffer: &[u8]) -> Result<VarValue> {
    if info.data_type == VariableType::Char {
        let bytes = span_at(buffer, info.offset, info.count)?;
        return Ok(VarValue::Scalar(Value::Text(nul_trimmed(bytes))));
    }

    let size = info.data_type.size();
    let mut elements = Vec::with_capacity(info.count);
    for index in 0..info.count {
        let offset = info.offset + index * size;
        elements.push(decode_element(info.data_type, buffer, offset)?);
    }

    if info.count == 1 {
        // count == 1 guarantees exactly one element
        Ok(VarValue::Scalar(elements.remove(0)))
    } else {
        Ok(VarValue::Sequence(elements))
    }
}

fn decode_element(data_type: VariableType, buffer: &[u8], offset: usize) -> Result<Value> {
    Ok(match data_type {
        VariableType::Bool => Value::Bool(fixed_at::<1>(buffer, offset)?[0] != 0),
        VariableType::Int32 => Value::Int32(le_i32(fixed_at(buffer, offset)?)),
        VariableType::BitField => Value::BitField(BitField(le_u32(fixed_at(buffer, offset)?))),
        VariableType::Float32 => Value::Float32(le_f32(fixed_at(buffer, offset)?)),
        VariableType::Float64 => Value::Float64(le_f64(fixed_at(buffer, offset)?)),
        VariableType::Char => Value::Text(nul_trimmed(&fixed_at::<1>(buffer, offset)?)),
    })
}
