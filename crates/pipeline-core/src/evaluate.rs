//! Pure instruction-semantics evaluation.
//!
//! The evaluator computes the effect of one instruction from its operand
//! values and returns it as data; it never touches the register file. The
//! caller reads the sources, invokes [`evaluate`], and applies the result as
//! a single atomic commit (one register write, or none for branches).

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use thiserror::Error;

use crate::isa::{AluOp, BranchCond, Category, OpKind};
use crate::parser::{Instruction, Operand};
use crate::state::{Reg, RegisterFile};

/// The two source values feeding one instruction.
///
/// For R-type and B-type both come from registers; for I-type the second is
/// the literal immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceValues {
    /// First source operand value.
    pub first: i32,
    /// Second source operand value or immediate.
    pub second: i32,
}

/// The committed effect of one evaluated instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalResult {
    /// Write `value` to the destination register at commit.
    Write {
        /// Destination register.
        rd: Reg,
        /// Value to write.
        value: i32,
    },
    /// No architectural effect.
    NoEffect,
    /// Branch predicate outcome; branches never write registers.
    Branch {
        /// Whether the branch is taken.
        taken: bool,
    },
}

/// Evaluation failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Unrecognized I-type arithmetic mnemonic.
    ///
    /// Only the I-type path reports this: unrecognized R-type mnemonics are
    /// a silent no-op and unrecognized B-type mnemonics are branch-not-taken.
    /// The asymmetry matches the observed behavior this core is compatible
    /// with, even though it is likely accidental there.
    #[error("unsupported instruction: {mnemonic}")]
    UnsupportedInstruction {
        /// The mnemonic that failed to evaluate.
        mnemonic: String,
    },
}

/// Reads the source values for `instruction` from the register file.
///
/// This is the caller-side half of the evaluation contract: the evaluator
/// itself only ever sees the values.
#[must_use]
pub fn source_values(instruction: &Instruction, registers: &RegisterFile) -> SourceValues {
    let value_of = |operand: Option<&Operand>| match operand {
        Some(&Operand::Register(reg)) => registers.read(reg),
        Some(&Operand::Immediate(value)) => value,
        None => 0,
    };
    let (first, second) = match instruction.category {
        Category::RType | Category::IType => {
            (instruction.operands.get(1), instruction.operands.get(2))
        }
        Category::BType => (instruction.operands.first(), instruction.operands.get(1)),
        Category::Other => (None, None),
    };
    SourceValues {
        first: value_of(first),
        second: value_of(second),
    }
}

/// Evaluates one instruction against its source values.
///
/// # Errors
///
/// Returns [`EvalError::UnsupportedInstruction`] for an unrecognized I-type
/// mnemonic. Unrecognized R-type and B-type mnemonics do not error; see
/// [`EvalError::UnsupportedInstruction`].
pub fn evaluate(instruction: &Instruction, values: SourceValues) -> Result<EvalResult, EvalError> {
    match instruction.op {
        Some(OpKind::Register(op) | OpKind::Immediate(op)) => {
            Ok(match instruction.destination() {
                Some(rd) => EvalResult::Write {
                    rd,
                    value: alu(op, values.first, values.second),
                },
                None => EvalResult::NoEffect,
            })
        }
        Some(OpKind::Branch(cond)) => Ok(EvalResult::Branch {
            taken: branch_taken(cond, values.first, values.second),
        }),
        None => match instruction.category {
            Category::RType | Category::Other => Ok(EvalResult::NoEffect),
            Category::BType => Ok(EvalResult::Branch { taken: false }),
            Category::IType => Err(EvalError::UnsupportedInstruction {
                mnemonic: instruction.mnemonic.clone(),
            }),
        },
    }
}

const fn alu(op: AluOp, a: i32, b: i32) -> i32 {
    // Shift amounts use only the low 5 bits of the second operand.
    let shift = (b as u32) & 0x1F;
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Xor => a ^ b,
        AluOp::Shl => ((a as u32) << shift) as i32,
        AluOp::ShrLogical => ((a as u32) >> shift) as i32,
        AluOp::ShrArith => a >> shift,
        AluOp::SetLessSigned => (a < b) as i32,
        AluOp::SetLessUnsigned => ((a as u32) < (b as u32)) as i32,
    }
}

const fn branch_taken(cond: BranchCond, a: i32, b: i32) -> bool {
    match cond {
        BranchCond::Eq => a == b,
        BranchCond::Ne => a != b,
        BranchCond::LtSigned => a < b,
        BranchCond::GeSigned => a >= b,
        BranchCond::LtUnsigned => (a as u32) < (b as u32),
        BranchCond::GeUnsigned => (a as u32) >= (b as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::{evaluate, source_values, EvalError, EvalResult, SourceValues};
    use crate::parser::parse_program;
    use crate::state::{Reg, RegisterFile};

    fn reg(index: u8) -> Reg {
        Reg::new(index).expect("valid register index")
    }

    fn eval_line(line: &str, registers: &RegisterFile) -> Result<EvalResult, EvalError> {
        let program = parse_program(line).expect("well-formed line");
        let instruction = &program.instructions()[0];
        evaluate(instruction, source_values(instruction, registers))
    }

    fn values(first: i32, second: i32) -> SourceValues {
        SourceValues { first, second }
    }

    #[test]
    fn r_type_arithmetic_and_bitwise_results() {
        let mut registers = RegisterFile::new();
        registers.write(reg(2), 6);
        registers.write(reg(3), 3);

        let cases = [
            ("add x1, x2, x3", 9),
            ("sub x1, x2, x3", 3),
            ("and x1, x2, x3", 2),
            ("or x1, x2, x3", 7),
            ("xor x1, x2, x3", 5),
        ];
        for (line, expected) in cases {
            assert_eq!(
                eval_line(line, &registers),
                Ok(EvalResult::Write {
                    rd: reg(1),
                    value: expected
                }),
                "{line}"
            );
        }
    }

    #[test]
    fn add_wraps_on_overflow() {
        let mut registers = RegisterFile::new();
        registers.write(reg(2), i32::MAX);
        registers.write(reg(3), 1);
        assert_eq!(
            eval_line("add x1, x2, x3", &registers),
            Ok(EvalResult::Write {
                rd: reg(1),
                value: i32::MIN
            })
        );
    }

    #[test]
    fn shifts_mask_the_amount_to_five_bits() {
        let mut registers = RegisterFile::new();
        registers.write(reg(2), 1);
        registers.write(reg(3), 33); // masked to 1

        assert_eq!(
            eval_line("sll x1, x2, x3", &registers),
            Ok(EvalResult::Write {
                rd: reg(1),
                value: 2
            })
        );

        registers.write(reg(2), -8);
        registers.write(reg(3), 1);
        assert_eq!(
            eval_line("sra x1, x2, x3", &registers),
            Ok(EvalResult::Write {
                rd: reg(1),
                value: -4
            }),
            "arithmetic shift keeps the sign"
        );
        assert_eq!(
            eval_line("srl x1, x2, x3", &registers),
            Ok(EvalResult::Write {
                rd: reg(1),
                value: (-8_i32 as u32 >> 1) as i32
            }),
            "logical shift zero-extends"
        );
    }

    #[test]
    fn signed_and_unsigned_set_less_disagree_on_negative_bit_patterns() {
        let mut registers = RegisterFile::new();
        registers.write(reg(2), -1); // 0xFFFF_FFFF
        registers.write(reg(3), 1);

        assert_eq!(
            eval_line("slt x1, x2, x3", &registers),
            Ok(EvalResult::Write {
                rd: reg(1),
                value: 1
            })
        );
        assert_eq!(
            eval_line("sltu x1, x2, x3", &registers),
            Ok(EvalResult::Write {
                rd: reg(1),
                value: 0
            }),
            "0xFFFFFFFF is the larger unsigned value"
        );
    }

    #[test]
    fn i_type_forms_mirror_r_type_against_the_immediate() {
        let mut registers = RegisterFile::new();
        registers.write(reg(2), 12);

        let cases = [
            ("addi x1, x2, -2", 10),
            ("andi x1, x2, 10", 8),
            ("ori x1, x2, 1", 13),
            ("xori x1, x2, 6", 10),
            ("slti x1, x2, 13", 1),
            ("sltiu x1, x2, -1", 1), // immediate reinterpreted as 0xFFFFFFFF
            ("slli x1, x2, 2", 48),
            ("srli x1, x2, 2", 3),
            ("srai x1, x2, 2", 3),
        ];
        for (line, expected) in cases {
            assert_eq!(
                eval_line(line, &registers),
                Ok(EvalResult::Write {
                    rd: reg(1),
                    value: expected
                }),
                "{line}"
            );
        }
    }

    #[test]
    fn branch_conditions_split_signed_and_unsigned() {
        let mut registers = RegisterFile::new();
        registers.write(reg(1), -1);
        registers.write(reg(2), 1);

        let cases = [
            ("beq x1, x2, 8", false),
            ("bne x1, x2, 8", true),
            ("blt x1, x2, 8", true),
            ("bge x1, x2, 8", false),
            ("bltu x1, x2, 8", false), // 0xFFFFFFFF is not unsigned-less than 1
            ("bgeu x1, x2, 8", true),
        ];
        for (line, taken) in cases {
            assert_eq!(
                eval_line(line, &registers),
                Ok(EvalResult::Branch { taken }),
                "{line}"
            );
        }
    }

    #[test]
    fn unsupported_mnemonic_policy_is_asymmetric_by_category() {
        let registers = RegisterFile::new();

        assert_eq!(
            eval_line("mul x1, x2, x3", &registers),
            Ok(EvalResult::NoEffect),
            "unknown R-type mnemonics are silently inert"
        );
        assert_eq!(
            eval_line("bweird x1, x2, 8", &registers),
            Ok(EvalResult::Branch { taken: false }),
            "unknown B-type mnemonics fall back to not-taken"
        );
        assert_eq!(
            eval_line("muli x1, x2, 3", &registers),
            Err(EvalError::UnsupportedInstruction {
                mnemonic: "muli".to_string()
            }),
            "unknown I-type mnemonics are an error"
        );
        assert_eq!(eval_line("fence", &registers), Ok(EvalResult::NoEffect));
    }

    #[test]
    fn evaluation_is_pure_over_its_inputs() {
        let program = parse_program("add x1, x2, x3").expect("parses");
        let instruction = &program.instructions()[0];
        let a = evaluate(instruction, values(4, 5));
        let b = evaluate(instruction, values(4, 5));
        assert_eq!(a, b);
    }
}
