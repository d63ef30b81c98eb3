//! Pipeline-cycle simulation core for the RISC-V teaching visualizer.
//!
//! Given a short program and a cycle index, the core answers which pipeline
//! stage every instruction occupies, where hazards force stalls or flushes,
//! and what each committing instruction does to architectural register
//! state. Stepping is replayable in both directions and fully deterministic
//! for a given program plus initial register file.

/// Architectural register state model primitives.
pub mod state;
pub use state::{Reg, RegisterFile, REGISTER_COUNT};

/// Deterministic mnemonic and operation classification tables.
pub mod isa;
pub use isa::{resolve_mnemonic, AluOp, BranchCond, Category, OpKind, MNEMONIC_TABLE};

/// Program text parsing into immutable instruction sequences.
pub mod parser;
pub use parser::{parse_program, Instruction, Operand, ParseError, ParseErrorKind, Program};

/// Pure instruction-semantics evaluation.
pub mod evaluate;
pub use evaluate::{evaluate, source_values, EvalError, EvalResult, SourceValues};

/// Hazard classification over adjacent instruction pairs.
pub mod hazard;
pub use hazard::{raw_dependency, HazardAnnotation, HazardKind};

/// Per-cycle stage occupancy derivation.
pub mod schedule;
pub use schedule::{CycleIndicators, Schedule, Stage, StageSlot};

/// Host-facing session façade: program lifecycle and cycle stepping.
pub mod session;
pub use session::{LoadError, Session, StepError, StepReport};

/// Immutable catalog of worked example programs.
pub mod preset;
pub use preset::{find_preset, Preset, PRESET_CATALOG};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
