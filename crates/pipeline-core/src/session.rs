//! Host-facing session façade: program lifecycle and cycle stepping.
//!
//! A [`Session`] owns one program together with everything derived from it:
//! the hazard-annotated stage schedule, the live register file, the initial
//! register snapshot, and the current cycle index. `load` is the single
//! entry point that replaces all of them atomically; stepping is driven by
//! discrete `advance`/`retreat`/`reset` calls, never by timers.

use thiserror::Error;

use crate::evaluate::{evaluate, source_values, EvalError, EvalResult};
use crate::parser::{parse_program, ParseError, Program};
use crate::preset::{find_preset, Preset};
use crate::schedule::{CycleIndicators, Schedule, StageSlot};
use crate::state::RegisterFile;

/// Why a program could not be installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// No preset with the requested id exists in the catalog.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
    /// The program text contains a malformed line.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A commit failure surfaced by [`Session::advance`].
///
/// The cycle has already moved when this is returned, so the error carries
/// the step report; callers do not need to re-query the session to learn
/// that the stage display advanced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source}")]
pub struct StepError {
    /// The step that took effect before the commit failed.
    pub report: StepReport,
    /// The underlying evaluation failure.
    #[source]
    pub source: EvalError,
}

/// Outcome of one `advance` or `retreat` control event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepReport {
    /// Moved forward into `cycle`.
    Advanced {
        /// The new current cycle.
        cycle: u32,
    },
    /// `advance` past the final cycle; nothing changed.
    AlreadyComplete,
    /// Moved backward into `cycle`.
    SteppedBack {
        /// The new current cycle.
        cycle: u32,
    },
    /// `retreat` at cycle 0; nothing changed.
    AtStart,
}

/// One interactive simulation session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    program: Program,
    schedule: Schedule,
    registers: RegisterFile,
    initial_registers: RegisterFile,
    cycle: u32,
}

impl Session {
    /// Creates a session with an empty program and a zeroed register file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs new program text with all registers initially zero.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Parse`] for a malformed line; the previously
    /// loaded program and all derived state stay untouched.
    pub fn load(&mut self, text: &str) -> Result<(), LoadError> {
        self.load_with_registers(text, RegisterFile::new())
    }

    /// Installs new program text with the given initial register file.
    ///
    /// The program, hazard annotations, schedule, register snapshot, and
    /// cycle index are replaced together or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Parse`] for a malformed line; the previously
    /// loaded program and all derived state stay untouched.
    pub fn load_with_registers(
        &mut self,
        text: &str,
        initial: RegisterFile,
    ) -> Result<(), LoadError> {
        let program = parse_program(text)?;
        let schedule = Schedule::build(&program, &initial);
        self.registers = initial.clone();
        self.initial_registers = initial;
        self.program = program;
        self.schedule = schedule;
        self.cycle = 0;
        Ok(())
    }

    /// Installs a catalog preset by id.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnknownPreset`] when the id is not in the
    /// catalog.
    pub fn load_preset(&mut self, id: &str) -> Result<&'static Preset, LoadError> {
        let preset = find_preset(id).ok_or_else(|| LoadError::UnknownPreset(id.to_string()))?;
        self.load_with_registers(preset.program_text, preset.initial_register_file())?;
        Ok(preset)
    }

    /// Advances one cycle, committing any write-back entered by the new
    /// cycle.
    ///
    /// Advancing past the final cycle is a no-op reported as
    /// [`StepReport::AlreadyComplete`].
    ///
    /// # Errors
    ///
    /// Returns a [`StepError`] when the committing instruction is an
    /// unrecognized I-type form. The cycle still advances (the stage
    /// display moves on) but the register file is left unchanged for that
    /// cycle; the error carries the report for the step that took effect.
    pub fn advance(&mut self) -> Result<StepReport, StepError> {
        if self.cycle >= self.schedule.max_cycle() {
            return Ok(StepReport::AlreadyComplete);
        }
        self.cycle += 1;
        let report = StepReport::Advanced { cycle: self.cycle };
        match commit_cycle(&mut self.registers, &self.program, &self.schedule, self.cycle) {
            Ok(()) => Ok(report),
            Err(source) => Err(StepError { report, source }),
        }
    }

    /// Steps one cycle backward by replaying from cycle 0.
    ///
    /// Retreating below cycle 0 is a no-op reported as
    /// [`StepReport::AtStart`].
    pub fn retreat(&mut self) -> StepReport {
        if self.cycle == 0 {
            return StepReport::AtStart;
        }
        let target = self.cycle - 1;
        self.replay_to(target);
        StepReport::SteppedBack { cycle: target }
    }

    /// Returns to cycle 0 and the initial register snapshot.
    pub fn reset(&mut self) {
        self.replay_to(0);
    }

    /// Current cycle index.
    #[must_use]
    pub const fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Final cycle of the loaded program.
    #[must_use]
    pub const fn max_cycle(&self) -> u32 {
        self.schedule.max_cycle()
    }

    /// Returns `true` when the session sits at the final cycle.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.cycle >= self.schedule.max_cycle()
    }

    /// The loaded program.
    #[must_use]
    pub const fn program(&self) -> &Program {
        &self.program
    }

    /// The derived stage schedule and hazard annotations.
    #[must_use]
    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Current architectural register state.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Per-instruction stage map for the current cycle.
    #[must_use]
    pub fn stage_map(&self) -> Vec<StageSlot> {
        self.schedule.stage_map(self.cycle)
    }

    /// Branch-taken and flush indicators for the current cycle.
    #[must_use]
    pub fn indicators(&self) -> CycleIndicators {
        self.schedule.indicators(self.cycle)
    }

    /// Rebuilds register state for `target` from the initial snapshot.
    ///
    /// Commit errors are skipped here; they were already surfaced on the
    /// forward pass that first reached each cycle.
    fn replay_to(&mut self, target: u32) {
        let mut registers = self.initial_registers.clone();
        for cycle in 1..=target {
            let _ = commit_cycle(&mut registers, &self.program, &self.schedule, cycle);
        }
        self.registers = registers;
        self.cycle = target;
    }
}

/// Applies the commit rule for one cycle: every instruction entering
/// Writeback at `cycle` reads its sources from the register file as of the
/// start of the cycle's commit sequence and performs its single write (or
/// none for branches) before any later instruction commits.
fn commit_cycle(
    registers: &mut RegisterFile,
    program: &Program,
    schedule: &Schedule,
    cycle: u32,
) -> Result<(), EvalError> {
    for index in schedule.entering_writeback(cycle) {
        let instruction = &program.instructions()[index];
        match evaluate(instruction, source_values(instruction, registers))? {
            EvalResult::Write { rd, value } => registers.write(rd, value),
            EvalResult::NoEffect | EvalResult::Branch { .. } => {}
        }
    }
    Ok(())
}
