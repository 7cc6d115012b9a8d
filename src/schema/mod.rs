//! Region layout parsing
//!
//! The telemetry region is laid out as a fixed header followed by blocks it
//! points at:
//! - [`header`] parses the `irsdk_header` and locates the other blocks
//! - [`variables`] turns the descriptor table into a [`crate::VariableSchema`]
//! - [`session`] parses the session YAML with a version-keyed cache
//!
//! Nothing outside this module and [`crate::region`] knows a byte offset.

pub mod header;
pub mod session;
pub mod variables;

pub use header::{BufferSlot, Header};
pub use session::{SessionInfo, SessionInfoParser};
pub use variables::parse_variable_schema;
