//! iRacing Variable Schema Parsing
//!
//! Parses the `irsdk_varHeader` descriptor table into a [`VariableSchema`].
//!
//! # iRacing Variable Header Layout
//!
//! ```c
//! typedef struct irsdk_varHeader
//! {
//!     int type;                           // irsdk_VarType enum value
//!     int offset;                         // offset in bytes from buffer start
//!     int count;                          // number of elements (1 for scalar)
//!     bool countAsTime;
//!     char pad[3];
//!     char name[IRSDK_MAX_STRING];        // variable name (32 bytes)
//!     char desc[IRSDK_MAX_DESC];          // description (64 bytes)
//!     char unit[IRSDK_MAX_STRING];        // units (32 bytes)
//! } irsdk_varHeader;
//! ```
//!
//! # Skipped Descriptors
//!
//! Slots with an empty name or a zero count are padding and are dropped
//! silently. Unknown type codes are dropped with a warning. Everything else
//! must fit inside one value buffer or the whole table is rejected.

use crate::codec::{fixed_at, i32_at, non_negative, nul_trimmed};
use crate::{Result, TelemetryError, VariableInfo, VariableSchema, VariableType};
use std::collections::HashMap;
use tracing::{debug, warn};

const IRSDK_MAX_STRING: usize = 32;
const IRSDK_MAX_DESC: usize = 64;

/// Size of one descriptor in bytes
pub const VAR_HEADER_SIZE: usize = 144;

const NAME_OFFSET: usize = 16;
const DESC_OFFSET: usize = NAME_OFFSET + IRSDK_MAX_STRING;
const UNIT_OFFSET: usize = DESC_OFFSET + IRSDK_MAX_DESC;

/// Parse a descriptor at `offset` within `table`.
///
/// Returns `Ok(None)` for padding slots and unknown types.
fn parse_descriptor(table: &[u8], offset: usize) -> Result<Option<VariableInfo>> {
    let type_code = i32_at(table, offset)?;
    let var_offset = i32_at(table, offset + 4)?;
    let count = i32_at(table, offset + 8)?;
    let count_as_time = fixed_at::<1>(table, offset + 12)?[0] != 0;
    let name = nul_trimmed(&fixed_at::<IRSDK_MAX_STRING>(table, offset + NAME_OFFSET)?);

    if name.is_empty() || count == 0 {
        return Ok(None);
    }

    let Some(data_type) = VariableType::from_irsdk(type_code) else {
        warn!(name = %name, type_code, "Unknown iRacing variable type, skipping");
        return Ok(None);
    };

    let context = format!("Variable '{}'", name);
    Ok(Some(VariableInfo {
        offset: non_negative(var_offset, &context, "offset")?,
        count: non_negative(count, &context, "count")?,
        data_type,
        count_as_time,
        description: nul_trimmed(&fixed_at::<IRSDK_MAX_DESC>(table, offset + DESC_OFFSET)?),
        units: nul_trimmed(&fixed_at::<IRSDK_MAX_STRING>(table, offset + UNIT_OFFSET)?),
        name,
    }))
}

/// Parse `num_vars` descriptors from `table` (the bytes starting at the
/// header's `varHeaderOffset`) into a schema for buffers of `buf_len` bytes.
pub fn parse_variable_schema(table: &[u8], num_vars: usize, buf_len: usize) -> Result<VariableSchema> {
    debug!(num_vars, buf_len, "Parsing variable schema");

    let needed = num_vars
        .checked_mul(VAR_HEADER_SIZE)
        .ok_or_else(|| TelemetryError::out_of_range(0, usize::MAX, table.len()))?;
    if needed > table.len() {
        return Err(TelemetryError::out_of_range(0, needed, table.len()));
    }

    let mut variables = HashMap::with_capacity(num_vars);
    for index in 0..num_vars {
        let Some(info) = parse_descriptor(table, index * VAR_HEADER_SIZE)? else {
            continue;
        };

        if variables.contains_key(&info.name) {
            warn!(name = %info.name, "Duplicate variable name found, keeping the last");
        }
        variables.insert(info.name.clone(), info);
    }

    debug!(variable_count = variables.len(), "Variable schema parsed");
    VariableSchema::new(variables, buf_len)
}
