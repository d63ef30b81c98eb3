//! Program text parser for instructions and operand lists.
//!
//! Converts newline-separated source lines of the form
//! `mnemonic operand[, operand]*` into an immutable [`Program`]. A load is
//! atomic: the first malformed line aborts the whole parse and no partial
//! program is installed.

use thiserror::Error;

use crate::isa::{resolve_mnemonic, Category, OpKind};
use crate::state::Reg;

/// A parsed instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Operand {
    /// Register direct (`x0`–`x31`).
    Register(Reg),
    /// Decimal immediate, including branch byte offsets.
    Immediate(i32),
}

/// One immutable instruction parsed from a single source line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    /// The mnemonic as written in the source.
    pub mnemonic: String,
    /// Operands in source order.
    pub operands: Vec<Operand>,
    /// Operand-shape category.
    pub category: Category,
    /// Resolved operation descriptor, `None` for unrecognized mnemonics.
    pub op: Option<OpKind>,
}

impl Instruction {
    /// Destination register written at commit, if this shape has one.
    ///
    /// R-type and I-type instructions write their first operand; branches
    /// and uncategorized shapes write nothing.
    #[must_use]
    pub fn destination(&self) -> Option<Reg> {
        match (self.category, self.operands.first()) {
            (Category::RType | Category::IType, Some(&Operand::Register(reg))) => Some(reg),
            _ => None,
        }
    }

    /// Source registers read by this instruction, in operand order.
    #[must_use]
    pub fn source_registers(&self) -> [Option<Reg>; 2] {
        let reg_at = |index: usize| match self.operands.get(index) {
            Some(&Operand::Register(reg)) => Some(reg),
            _ => None,
        };
        match self.category {
            Category::RType => [reg_at(1), reg_at(2)],
            Category::IType => [reg_at(1), None],
            Category::BType => [reg_at(0), reg_at(1)],
            Category::Other => [None, None],
        }
    }
}

/// An ordered, immutable sequence of instructions.
///
/// Insertion order is fetch order is program-counter order; hazards cause
/// stalls and flushes, never reordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Instructions in fetch order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` when the program has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Classification of malformed program lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Register-shaped operand outside `x0`..`x31`.
    #[error("invalid register: {0}")]
    InvalidRegister(String),
    /// Immediate operand that is not a decimal 32-bit value.
    #[error("invalid immediate value: {0}")]
    InvalidImmediate(String),
    /// Operand that is neither a register nor an immediate.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),
    /// Operand list does not fit the mnemonic's shape.
    #[error("operands do not match the {mnemonic} form")]
    OperandMismatch {
        /// The mnemonic whose shape was violated.
        mnemonic: String,
    },
}

/// A malformed program line, reported with its 1-indexed line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line_number}: {kind}")]
pub struct ParseError {
    /// 1-indexed source line number of the failing line.
    pub line_number: usize,
    /// What made the line malformed.
    pub kind: ParseErrorKind,
}

/// Parses full program text into a [`Program`].
///
/// Blank lines and `#` comments are skipped. Parsing is atomic: the first
/// malformed line fails the whole load.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the first line that cannot be parsed
/// into a mnemonic plus well-formed operands.
pub fn parse_program(text: &str) -> Result<Program, ParseError> {
    let mut instructions = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if let Some(instruction) = parse_line(line, index + 1)? {
            instructions.push(instruction);
        }
    }
    Ok(Program { instructions })
}

fn parse_line(line: &str, line_number: usize) -> Result<Option<Instruction>, ParseError> {
    let stripped = strip_comment(line).trim();
    if stripped.is_empty() {
        return Ok(None);
    }

    let (mnemonic, rest) = stripped
        .split_once(char::is_whitespace)
        .unwrap_or((stripped, ""));
    let mut operands = Vec::new();
    let rest = rest.trim();
    if !rest.is_empty() {
        for token in rest.split(',') {
            operands.push(parse_operand(token.trim(), line_number)?);
        }
    }

    let op = resolve_mnemonic(mnemonic);
    let category = match op {
        Some(kind) => {
            check_shape(mnemonic, kind.category(), &operands, line_number)?;
            kind.category()
        }
        None => infer_category(mnemonic, &operands),
    };

    Ok(Some(Instruction {
        mnemonic: mnemonic.to_string(),
        operands,
        category,
        op,
    }))
}

fn strip_comment(line: &str) -> &str {
    line.find('#').map_or(line, |pos| &line[..pos])
}

fn parse_operand(token: &str, line_number: usize) -> Result<Operand, ParseError> {
    if token.is_empty() {
        return Err(ParseError {
            line_number,
            kind: ParseErrorKind::InvalidOperand(String::new()),
        });
    }
    if looks_like_register(token) {
        return Reg::parse(token)
            .map(Operand::Register)
            .ok_or_else(|| ParseError {
                line_number,
                kind: ParseErrorKind::InvalidRegister(token.to_string()),
            });
    }
    if token.starts_with(['-', '+']) || token.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
        return token
            .parse::<i32>()
            .map(Operand::Immediate)
            .map_err(|_| ParseError {
                line_number,
                kind: ParseErrorKind::InvalidImmediate(token.to_string()),
            });
    }
    Err(ParseError {
        line_number,
        kind: ParseErrorKind::InvalidOperand(token.to_string()),
    })
}

fn looks_like_register(token: &str) -> bool {
    let mut bytes = token.bytes();
    matches!(bytes.next(), Some(b'x' | b'X')) && bytes.all(|b| b.is_ascii_digit()) && token.len() > 1
}

fn check_shape(
    mnemonic: &str,
    category: Category,
    operands: &[Operand],
    line_number: usize,
) -> Result<(), ParseError> {
    let matches = match category {
        Category::RType => matches!(
            operands,
            [Operand::Register(_), Operand::Register(_), Operand::Register(_)]
        ),
        Category::IType | Category::BType => matches!(
            operands,
            [Operand::Register(_), Operand::Register(_), Operand::Immediate(_)]
        ),
        Category::Other => true,
    };
    if matches {
        Ok(())
    } else {
        Err(ParseError {
            line_number,
            kind: ParseErrorKind::OperandMismatch {
                mnemonic: mnemonic.to_string(),
            },
        })
    }
}

/// Shape-based category inference for mnemonics outside the table.
///
/// Unrecognized register-register forms stay R-type (silently inert at
/// evaluation) and unrecognized register-immediate forms split on the `b`
/// prefix between branches and I-type arithmetic, mirroring the evaluator's
/// per-category unsupported-mnemonic policy.
fn infer_category(mnemonic: &str, operands: &[Operand]) -> Category {
    match operands {
        [Operand::Register(_), Operand::Register(_), Operand::Register(_)] => Category::RType,
        [Operand::Register(_), Operand::Register(_), Operand::Immediate(_)] => {
            if mnemonic.starts_with(['b', 'B']) {
                Category::BType
            } else {
                Category::IType
            }
        }
        _ => Category::Other,
    }
}
