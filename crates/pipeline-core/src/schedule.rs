//! Hazard/stage scheduling: deterministic per-cycle stage occupancy.
//!
//! Baseline timing is the ideal single-issue diagonal: instruction `i`
//! occupies stage `s` at cycle `i + s`. Two departures from the baseline
//! exist. A data hazard on an adjacent pair delays the successor's Decode
//! by exactly one bubble and shifts everything behind it. A taken branch
//! flushes the single wrong-path slot fetched before the branch resolves in
//! Execute and refetches it the cycle after.

use crate::evaluate::{evaluate, source_values, EvalResult};
use crate::hazard::{raw_dependency, HazardAnnotation, HazardKind};
use crate::isa::Category;
use crate::parser::{Instruction, Program};
use crate::state::RegisterFile;

/// One of the five fixed pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Stage {
    /// Instruction fetch.
    Fetch,
    /// Decode and register read.
    Decode,
    /// ALU / branch resolution.
    Execute,
    /// Memory access slot.
    Memory,
    /// Register write-back; the commit point.
    Writeback,
}

impl Stage {
    /// Number of pipeline stages.
    pub const COUNT: usize = 5;

    /// Stages in pipeline order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Fetch,
        Self::Decode,
        Self::Execute,
        Self::Memory,
        Self::Writeback,
    ];

    /// Conventional short tag used by the stage-highlight display.
    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::Fetch => "IF",
            Self::Decode => "ID",
            Self::Execute => "EX",
            Self::Memory => "MEM",
            Self::Writeback => "WB",
        }
    }
}

/// What one instruction occupies during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StageSlot {
    /// Not yet fetched at this cycle.
    NotIssued,
    /// Occupying a pipeline stage.
    Active(Stage),
    /// Held by a data-hazard bubble between Fetch and Decode.
    Stalled,
    /// Wrong-path progress discarded by a taken branch this cycle.
    Flushed,
    /// Completed write-back in an earlier cycle.
    Retired,
}

impl StageSlot {
    /// Display tag matching the hand-authored preset highlight tables.
    #[must_use]
    pub const fn highlight_tag(self) -> &'static str {
        match self {
            Self::NotIssued => "-",
            Self::Active(stage) => stage.abbreviation(),
            Self::Stalled => "STALL",
            Self::Flushed => "FLUSH",
            Self::Retired => "DONE",
        }
    }
}

/// Branch-taken and flush indicators for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CycleIndicators {
    /// Instruction index of a branch resolving taken this cycle.
    pub branch_taken: Option<usize>,
    /// Instruction index whose wrong-path fetch is flushed this cycle.
    pub flushed: Option<usize>,
}

/// A discarded wrong-path fetch attempt behind a taken branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WrongPath {
    /// Cycle of the discarded fetch.
    fetch_cycle: u32,
    /// Cycle the flush is applied (the branch's Execute cycle).
    flush_cycle: u32,
}

/// Derived timing for one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timeline {
    fetch_cycle: u32,
    stalled: bool,
    wrong_path: Option<WrongPath>,
    branch_taken: Option<bool>,
}

impl Timeline {
    const fn decode_cycle(self) -> u32 {
        self.fetch_cycle + 1 + self.stalled as u32
    }

    const fn execute_cycle(self) -> u32 {
        self.decode_cycle() + 1
    }

    const fn writeback_cycle(self) -> u32 {
        self.execute_cycle() + 2
    }
}

/// Deterministic stage table for one `(program, initial registers)` pair.
///
/// Built once at load time; every lookup afterwards is a pure read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    timelines: Vec<Timeline>,
    annotations: Vec<HazardAnnotation>,
    max_cycle: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::build(&Program::default(), &RegisterFile::new())
    }
}

impl Schedule {
    /// Derives the stage table for `program` starting from
    /// `initial_registers`.
    ///
    /// Branch outcomes are resolved during the build by replaying
    /// write-backs up to each branch's Execute cycle, so the result is a
    /// pure function of its two inputs.
    #[must_use]
    pub fn build(program: &Program, initial_registers: &RegisterFile) -> Self {
        let instructions = program.instructions();
        let mut timelines: Vec<Timeline> = Vec::with_capacity(instructions.len());
        let mut replay = initial_registers.clone();
        let mut committed = 0_usize;
        let mut cursor = 0_u32;

        for (index, instruction) in instructions.iter().enumerate() {
            let mut wrong_path = None;
            let mut fetch_cycle = cursor;
            if let Some(prev) = timelines.last() {
                if prev.branch_taken == Some(true) && fetch_cycle < prev.execute_cycle() {
                    wrong_path = Some(WrongPath {
                        fetch_cycle,
                        flush_cycle: prev.execute_cycle(),
                    });
                    fetch_cycle = prev.execute_cycle() + 1;
                }
            }

            // One bubble when the neighbor's write has not yet committed by
            // the cycle this instruction would read it in Decode.
            let stalled = index > 0
                && raw_dependency(&instructions[index - 1], instruction)
                && fetch_cycle + 1 < timelines[index - 1].writeback_cycle();

            let mut timeline = Timeline {
                fetch_cycle,
                stalled,
                wrong_path,
                branch_taken: None,
            };

            if instruction.category == Category::BType {
                commit_through(
                    &mut replay,
                    &mut committed,
                    &timelines,
                    instructions,
                    timeline.execute_cycle(),
                );
                let taken = matches!(
                    evaluate(instruction, source_values(instruction, &replay)),
                    Ok(EvalResult::Branch { taken: true })
                );
                timeline.branch_taken = Some(taken);
            }

            cursor = timeline.fetch_cycle + 1 + u32::from(timeline.stalled);
            timelines.push(timeline);
        }

        let annotations = annotate(&timelines);
        let max_cycle = timelines.last().map_or(0, |last| last.writeback_cycle());

        Self {
            timelines,
            annotations,
            max_cycle,
        }
    }

    /// What instruction `index` occupies at `cycle`.
    #[must_use]
    pub fn stage_at(&self, index: usize, cycle: u32) -> StageSlot {
        let Some(timeline) = self.timelines.get(index) else {
            return StageSlot::NotIssued;
        };

        if let Some(wrong_path) = timeline.wrong_path {
            if cycle < wrong_path.fetch_cycle {
                return StageSlot::NotIssued;
            }
            if cycle == wrong_path.fetch_cycle {
                return StageSlot::Active(Stage::Fetch);
            }
            if cycle >= wrong_path.flush_cycle && cycle < timeline.fetch_cycle {
                return StageSlot::Flushed;
            }
        }

        if cycle < timeline.fetch_cycle {
            return StageSlot::NotIssued;
        }
        if cycle == timeline.fetch_cycle {
            return StageSlot::Active(Stage::Fetch);
        }
        if timeline.stalled && cycle == timeline.fetch_cycle + 1 {
            return StageSlot::Stalled;
        }
        match cycle - timeline.decode_cycle() {
            0 => StageSlot::Active(Stage::Decode),
            1 => StageSlot::Active(Stage::Execute),
            2 => StageSlot::Active(Stage::Memory),
            3 => StageSlot::Active(Stage::Writeback),
            _ => StageSlot::Retired,
        }
    }

    /// The full per-instruction stage map for `cycle`.
    #[must_use]
    pub fn stage_map(&self, cycle: u32) -> Vec<StageSlot> {
        (0..self.timelines.len())
            .map(|index| self.stage_at(index, cycle))
            .collect()
    }

    /// Cycle at which the last instruction enters Writeback (0 when empty).
    #[must_use]
    pub const fn max_cycle(&self) -> u32 {
        self.max_cycle
    }

    /// Number of scheduled instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    /// Returns `true` when the schedule covers no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    /// Hazard annotations for every adjacent pair, in program order.
    #[must_use]
    pub fn annotations(&self) -> &[HazardAnnotation] {
        &self.annotations
    }

    /// Resolved branch outcome for instruction `index` (`None` for
    /// non-branches).
    #[must_use]
    pub fn branch_taken(&self, index: usize) -> Option<bool> {
        self.timelines.get(index).and_then(|t| t.branch_taken)
    }

    /// Instructions whose slot enters Writeback exactly at `cycle`, in
    /// program order.
    #[must_use]
    pub fn entering_writeback(&self, cycle: u32) -> Vec<usize> {
        self.timelines
            .iter()
            .enumerate()
            .filter(|(_, t)| t.writeback_cycle() == cycle)
            .map(|(index, _)| index)
            .collect()
    }

    /// Branch-taken and flush indicators for `cycle`.
    #[must_use]
    pub fn indicators(&self, cycle: u32) -> CycleIndicators {
        let branch_taken = self
            .timelines
            .iter()
            .position(|t| t.branch_taken == Some(true) && t.execute_cycle() == cycle);
        let flushed = self
            .timelines
            .iter()
            .position(|t| t.wrong_path.is_some_and(|wp| wp.flush_cycle == cycle));
        CycleIndicators {
            branch_taken,
            flushed,
        }
    }
}

fn annotate(timelines: &[Timeline]) -> Vec<HazardAnnotation> {
    timelines
        .windows(2)
        .enumerate()
        .map(|(first, window)| {
            let second_timeline = window[1];
            let (kind, detected_cycle, resolved_cycle) =
                if let Some(wrong_path) = second_timeline.wrong_path {
                    (
                        HazardKind::ControlHazardFlush,
                        Some(wrong_path.flush_cycle),
                        Some(second_timeline.fetch_cycle),
                    )
                } else if second_timeline.stalled {
                    (
                        HazardKind::DataHazardStall,
                        Some(second_timeline.fetch_cycle + 1),
                        Some(second_timeline.decode_cycle()),
                    )
                } else {
                    (HazardKind::None, None, None)
                };
            HazardAnnotation {
                first,
                second: first + 1,
                kind,
                detected_cycle,
                resolved_cycle,
            }
        })
        .collect()
}

/// Commits every not-yet-committed instruction whose Writeback entry is at
/// or before `cycle`, in program order. Evaluation failures commit nothing;
/// the session surfaces them on its own forward pass.
fn commit_through(
    replay: &mut RegisterFile,
    committed: &mut usize,
    timelines: &[Timeline],
    instructions: &[Instruction],
    cycle: u32,
) {
    while *committed < timelines.len() && timelines[*committed].writeback_cycle() <= cycle {
        let instruction = &instructions[*committed];
        if let Ok(EvalResult::Write { rd, value }) =
            evaluate(instruction, source_values(instruction, replay))
        {
            replay.write(rd, value);
        }
        *committed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{CycleIndicators, Schedule, Stage, StageSlot};
    use crate::hazard::HazardKind;
    use crate::parser::parse_program;
    use crate::state::{Reg, RegisterFile};

    fn schedule(text: &str, assignments: &[(u8, i32)]) -> Schedule {
        let program = parse_program(text).expect("well-formed program");
        let assignments: Vec<_> = assignments
            .iter()
            .map(|&(index, value)| (Reg::new(index).expect("valid index"), value))
            .collect();
        Schedule::build(&program, &RegisterFile::with_assignments(&assignments))
    }

    #[test]
    fn hazard_free_program_follows_the_diagonal_baseline() {
        let schedule = schedule("add x5, x6, x7\nand x28, x29, x30\nor x31, x1, x2", &[]);

        for (index, stage) in Stage::ALL.iter().enumerate() {
            for instruction in 0..3_usize {
                let cycle = (instruction + index) as u32;
                assert_eq!(
                    schedule.stage_at(instruction, cycle),
                    StageSlot::Active(*stage),
                    "instruction {instruction} at cycle {cycle}"
                );
            }
        }
        assert_eq!(schedule.max_cycle(), 6, "n + 3 for three instructions");
        assert_eq!(schedule.stage_at(2, 0), StageSlot::NotIssued);
        assert_eq!(schedule.stage_at(0, 5), StageSlot::Retired);
        assert!(schedule
            .annotations()
            .iter()
            .all(|a| a.kind == HazardKind::None));
    }

    #[test]
    fn adjacent_raw_dependency_inserts_exactly_one_bubble() {
        let schedule = schedule("add x28, x29, x31\nsub x5, x28, x6", &[(29, 5), (31, 1), (6, 4)]);

        assert_eq!(schedule.stage_at(1, 1), StageSlot::Active(Stage::Fetch));
        assert_eq!(schedule.stage_at(1, 2), StageSlot::Stalled);
        assert_eq!(schedule.stage_at(1, 3), StageSlot::Active(Stage::Decode));
        assert_eq!(schedule.stage_at(1, 6), StageSlot::Active(Stage::Writeback));
        assert_eq!(schedule.max_cycle(), 6);

        let annotation = schedule.annotations()[0];
        assert_eq!(annotation.kind, HazardKind::DataHazardStall);
        assert_eq!(annotation.detected_cycle, Some(2));
        assert_eq!(annotation.resolved_cycle, Some(3));
    }

    #[test]
    fn taken_branch_flushes_one_slot_and_refetches_it() {
        let schedule = schedule("add x30, x31, x5\nbeq x1, x0, 40\naddi x28, x0, 10", &[]);

        assert_eq!(schedule.branch_taken(1), Some(true));
        assert_eq!(schedule.branch_taken(0), None);

        // Wrong-path fetch at 2, flushed when the branch resolves at 3,
        // refetched at 4.
        assert_eq!(schedule.stage_at(2, 2), StageSlot::Active(Stage::Fetch));
        assert_eq!(schedule.stage_at(2, 3), StageSlot::Flushed);
        assert_eq!(schedule.stage_at(2, 4), StageSlot::Active(Stage::Fetch));
        assert_eq!(schedule.stage_at(2, 8), StageSlot::Active(Stage::Writeback));
        assert_eq!(schedule.max_cycle(), 8);

        assert_eq!(
            schedule.indicators(3),
            CycleIndicators {
                branch_taken: Some(1),
                flushed: Some(2),
            }
        );
        assert_eq!(schedule.indicators(2), CycleIndicators::default());

        let annotation = schedule.annotations()[1];
        assert_eq!(annotation.kind, HazardKind::ControlHazardFlush);
        assert_eq!(annotation.detected_cycle, Some(3));
        assert_eq!(annotation.resolved_cycle, Some(4));
    }

    #[test]
    fn not_taken_branch_causes_no_flush() {
        let schedule = schedule("bne x1, x1, 16\nadd x2, x3, x4", &[]);

        assert_eq!(schedule.branch_taken(0), Some(false));
        assert_eq!(schedule.stage_at(1, 1), StageSlot::Active(Stage::Fetch));
        assert_eq!(schedule.stage_at(1, 2), StageSlot::Active(Stage::Decode));
        assert_eq!(schedule.max_cycle(), 5);
        assert_eq!(schedule.annotations()[0].kind, HazardKind::None);
    }

    #[test]
    fn branch_outcome_sees_writebacks_committed_by_its_execute_cycle() {
        // addi writes x1 at cycle 4; with the stall the branch executes at
        // cycle 4 too, and same-cycle write-back commits first.
        let schedule = schedule("addi x1, x0, 1\nbne x1, x0, 8", &[]);

        assert_eq!(schedule.stage_at(1, 2), StageSlot::Stalled);
        assert_eq!(schedule.branch_taken(1), Some(true));
    }

    #[test]
    fn stall_shifts_everything_behind_the_bubble() {
        let schedule = schedule(
            "add x28, x29, x31\nsub x5, x28, x6\nor x7, x8, x9",
            &[(29, 5), (31, 1), (6, 4)],
        );

        // The third instruction inherits the one-cycle shift.
        assert_eq!(schedule.stage_at(2, 2), StageSlot::NotIssued);
        assert_eq!(schedule.stage_at(2, 3), StageSlot::Active(Stage::Fetch));
        assert_eq!(schedule.stage_at(2, 4), StageSlot::Active(Stage::Decode));
        assert_eq!(schedule.max_cycle(), 7);
    }

    #[test]
    fn entering_writeback_reports_the_commit_cycle_only() {
        let schedule = schedule("add x5, x6, x7\nand x28, x29, x30", &[]);

        assert_eq!(schedule.entering_writeback(4), vec![0]);
        assert_eq!(schedule.entering_writeback(5), vec![1]);
        assert!(schedule.entering_writeback(3).is_empty());
    }

    #[test]
    fn empty_program_schedules_nothing() {
        let schedule = schedule("", &[]);
        assert!(schedule.is_empty());
        assert_eq!(schedule.max_cycle(), 0);
        assert!(schedule.stage_map(0).is_empty());
        assert!(schedule.annotations().is_empty());
    }
}
