//! Service entry points
//!
//! Each command loads what it needs through the store, hands plain values to
//! the scheduling or substitution core, and writes back the result.

pub mod gym;
pub mod settings;
pub mod tasks;
