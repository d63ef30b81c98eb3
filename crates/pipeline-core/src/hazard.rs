//! Hazard classification over adjacent instruction pairs.
//!
//! The model detects hazards but does not forward: a read-after-write
//! between neighbors costs one bubble, and a taken branch costs one flushed
//! fetch slot. Annotations are derived once per loaded program and cached
//! on its [`crate::schedule::Schedule`].

use crate::parser::Instruction;

/// Classification of the hazard between one adjacent instruction pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HazardKind {
    /// The pair executes back to back with no interference.
    None,
    /// The successor reads a register the predecessor has not yet written
    /// back; one stall bubble is inserted before the successor's Decode.
    DataHazardStall,
    /// The predecessor is a taken branch; the successor's wrong-path fetch
    /// is discarded and refetched after the branch resolves.
    ControlHazardFlush,
}

/// Hazard classification for the pair `(first, second)` with the cycles at
/// which it is detected and resolved.
///
/// The cycles are an attribute of the program-plus-timing pair, not of
/// either instruction alone, so they are populated by the schedule that
/// derives the timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct HazardAnnotation {
    /// Index of the earlier instruction of the pair.
    pub first: usize,
    /// Index of the later instruction of the pair.
    pub second: usize,
    /// Hazard classification.
    pub kind: HazardKind,
    /// Cycle at which the hazard bites (`None` for hazard-free pairs).
    pub detected_cycle: Option<u32>,
    /// Cycle at which the second instruction resumes normal progress.
    pub resolved_cycle: Option<u32>,
}

/// Returns `true` when `consumer` reads a register that `producer` writes.
#[must_use]
pub fn raw_dependency(producer: &Instruction, consumer: &Instruction) -> bool {
    producer.destination().is_some_and(|written| {
        consumer
            .source_registers()
            .iter()
            .flatten()
            .any(|&read| read == written)
    })
}

#[cfg(test)]
mod tests {
    use super::raw_dependency;
    use crate::parser::parse_program;

    fn pair(text: &str) -> bool {
        let program = parse_program(text).expect("well-formed pair");
        raw_dependency(&program.instructions()[0], &program.instructions()[1])
    }

    #[test]
    fn detects_read_after_write_between_neighbors() {
        assert!(pair("add x28, x29, x31\nsub x5, x28, x6"));
        assert!(pair("addi x3, x0, 7\nadd x4, x5, x3"));
        assert!(pair("add x2, x3, x4\nbeq x2, x0, 16"));
    }

    #[test]
    fn independent_neighbors_have_no_dependency() {
        assert!(!pair("add x5, x6, x7\nand x28, x29, x30"));
        // Branches write nothing, so nothing can depend on them.
        assert!(!pair("beq x1, x0, 8\nadd x1, x2, x3"));
    }

    #[test]
    fn destination_overlap_alone_is_not_a_hazard() {
        // Write-after-write is not modeled; only reads count.
        assert!(!pair("add x5, x6, x7\nadd x5, x8, x9"));
    }
}
