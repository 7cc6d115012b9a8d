//! Core types for decoded telemetry.
//!
//! The type system maps directly to iRacing SDK structures:
//! - [`VariableType`] maps to iRacing's `irsdk_VarType` enum with size information
//! - [`VariableSchema`] is the descriptor table of one connection epoch
//! - [`Value`] / [`VarValue`] hold one decoded element or an ordered run of them
//! - [`Catalog`] is one complete decode pass over a value buffer
//! - [`VarData`] provides typed extraction from decoded values
//!
//! ## Usage Example
//!
//! ```rust
//! use livetiming::types::{Catalog, VarData, VariableInfo, VariableSchema, VariableType};
//! use std::collections::HashMap;
//!
//! let mut variables = HashMap::new();
//! variables.insert("RPM".to_string(), VariableInfo {
//!     name: "RPM".to_string(),
//!     data_type: VariableType::Float32,
//!     offset: 0,
//!     count: 1,
//!     count_as_time: false,
//!     units: "rev/min".to_string(),
//!     description: "Engine RPM".to_string(),
//! });
//!
//! let schema = VariableSchema::new(variables, 4).unwrap();
//! let buffer = 4500.0f32.to_le_bytes();
//! let catalog = Catalog::decode(&schema, &buffer, 1, 12345).unwrap();
//!
//! let rpm = catalog.get("RPM").and_then(|v| v.value.as_scalar()).unwrap();
//! assert_eq!(f32::from_value(rpm).unwrap(), 4500.0);
//! ```

mod bitfield;
mod catalog;
mod schema;
mod var_data;
mod variable_type;

pub use bitfield::BitField;
pub use catalog::{Catalog, Variable};
pub use schema::{VariableInfo, VariableSchema};
pub use var_data::VarData;
pub use variable_type::{Value, VarValue, VariableType};
