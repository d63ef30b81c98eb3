//! Immutable catalog of worked example programs.
//!
//! Each entry carries the lesson's hand-authored stage-highlight table; the
//! scheduler derives the general rule instead, and tests assert the derived
//! table reproduces these literals cell for cell.

use crate::state::{Reg, RegisterFile};

/// One worked example: program text plus its lesson metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    /// Stable lookup id.
    pub id: &'static str,
    /// Human-readable label shown in the preset picker.
    pub display_label: &'static str,
    /// Program source installed on selection.
    pub program_text: &'static str,
    /// Lesson note shown beside the diagram.
    pub explanatory_note: &'static str,
    /// Register values seeded before cycle 0, as `(index, value)` pairs.
    pub initial_registers: &'static [(u8, i32)],
    /// Expected per-cycle highlight rows; row `c` holds one tag per
    /// instruction at cycle `c`.
    pub stage_highlight_table: &'static [&'static [&'static str]],
}

impl Preset {
    /// Builds the seeded initial register file for this preset.
    #[must_use]
    pub fn initial_register_file(&self) -> RegisterFile {
        let assignments: Vec<_> = self
            .initial_registers
            .iter()
            .filter_map(|&(index, value)| Reg::new(index).map(|reg| (reg, value)))
            .collect();
        RegisterFile::with_assignments(&assignments)
    }
}

/// The full preset catalog, loaded once and never mutated.
pub const PRESET_CATALOG: &[Preset] = &[
    Preset {
        id: "no-hazard",
        display_label: "Independent instructions",
        program_text: "add x5, x6, x7\nand x28, x29, x30\nor x31, x1, x2",
        explanatory_note: "Three independent instructions flow through the pipeline \
                           one stage apart, with no stalls or flushes.",
        initial_registers: &[],
        stage_highlight_table: &[
            &["IF", "-", "-"],
            &["ID", "IF", "-"],
            &["EX", "ID", "IF"],
            &["MEM", "EX", "ID"],
            &["WB", "MEM", "EX"],
            &["DONE", "WB", "MEM"],
            &["DONE", "DONE", "WB"],
        ],
    },
    Preset {
        id: "data-hazard",
        display_label: "Data hazard (read after write)",
        program_text: "add x28, x29, x31\nsub x5, x28, x6",
        explanatory_note: "The sub reads x28 before the add has written it back, so \
                           one bubble holds the sub ahead of Decode.",
        initial_registers: &[(29, 5), (31, 1), (6, 4)],
        stage_highlight_table: &[
            &["IF", "-"],
            &["ID", "IF"],
            &["EX", "STALL"],
            &["MEM", "ID"],
            &["WB", "EX"],
            &["DONE", "MEM"],
            &["DONE", "WB"],
        ],
    },
    Preset {
        id: "control-hazard",
        display_label: "Control hazard (taken branch)",
        program_text: "add x30, x31, x5\nbeq x1, x0, 40\naddi x28, x0, 10",
        explanatory_note: "The branch resolves taken in Execute, so the instruction \
                           fetched behind it is flushed and refetched one cycle later.",
        initial_registers: &[],
        stage_highlight_table: &[
            &["IF", "-", "-"],
            &["ID", "IF", "-"],
            &["EX", "ID", "IF"],
            &["MEM", "EX", "FLUSH"],
            &["WB", "MEM", "IF"],
            &["DONE", "WB", "ID"],
            &["DONE", "DONE", "EX"],
            &["DONE", "DONE", "MEM"],
            &["DONE", "DONE", "WB"],
        ],
    },
];

/// Looks up a preset by id.
#[must_use]
pub fn find_preset(id: &str) -> Option<&'static Preset> {
    PRESET_CATALOG.iter().find(|preset| preset.id == id)
}
