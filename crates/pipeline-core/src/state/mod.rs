//! Architectural register state model primitives.

/// Architectural register file types and storage model.
pub mod registers;

pub use registers::{Reg, RegisterFile, REGISTER_COUNT};
