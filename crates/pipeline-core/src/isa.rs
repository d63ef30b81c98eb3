//! Deterministic mnemonic and operation classification tables.
//!
//! Mnemonic dispatch goes through one source-of-truth table mapping each
//! supported mnemonic to a tagged operation descriptor, so the evaluator can
//! match exhaustively instead of branching on strings.

/// Arithmetic/logic operation selector shared by R-type and I-type forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AluOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Logical left shift by the low 5 bits of the second operand.
    Shl,
    /// Logical right shift by the low 5 bits of the second operand.
    ShrLogical,
    /// Arithmetic right shift by the low 5 bits of the second operand.
    ShrArith,
    /// 1 if first operand is signed-less than second, else 0.
    SetLessSigned,
    /// 1 if first operand is unsigned-less than second, else 0.
    SetLessUnsigned,
}

/// Branch predicate selector for B-type instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BranchCond {
    /// Taken when the operands are equal.
    Eq,
    /// Taken when the operands differ.
    Ne,
    /// Taken when first < second as signed values.
    LtSigned,
    /// Taken when first >= second as signed values.
    GeSigned,
    /// Taken when first < second as unsigned (zero-extended) values.
    LtUnsigned,
    /// Taken when first >= second as unsigned (zero-extended) values.
    GeUnsigned,
}

/// Tagged operation descriptor resolved from a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OpKind {
    /// R-type: ALU operation over two source registers.
    Register(AluOp),
    /// I-type: ALU operation over one source register and an immediate.
    Immediate(AluOp),
    /// B-type: branch predicate over two source registers.
    Branch(BranchCond),
}

/// Instruction categories distinguished by operand shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Category {
    /// Register-register: `rd, rs1, rs2`.
    RType,
    /// Register-immediate: `rd, rs1, imm`.
    IType,
    /// Branch comparison: `rs1, rs2, offset`.
    BType,
    /// Anything that fits none of the above shapes.
    Other,
}

impl OpKind {
    /// Returns the operand-shape category for this operation.
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Register(_) => Category::RType,
            Self::Immediate(_) => Category::IType,
            Self::Branch(_) => Category::BType,
        }
    }
}

/// Single source-of-truth mnemonic table for the supported subset.
pub const MNEMONIC_TABLE: &[(&str, OpKind)] = &[
    ("add", OpKind::Register(AluOp::Add)),
    ("sub", OpKind::Register(AluOp::Sub)),
    ("and", OpKind::Register(AluOp::And)),
    ("or", OpKind::Register(AluOp::Or)),
    ("xor", OpKind::Register(AluOp::Xor)),
    ("sll", OpKind::Register(AluOp::Shl)),
    ("srl", OpKind::Register(AluOp::ShrLogical)),
    ("sra", OpKind::Register(AluOp::ShrArith)),
    ("slt", OpKind::Register(AluOp::SetLessSigned)),
    ("sltu", OpKind::Register(AluOp::SetLessUnsigned)),
    ("addi", OpKind::Immediate(AluOp::Add)),
    ("andi", OpKind::Immediate(AluOp::And)),
    ("ori", OpKind::Immediate(AluOp::Or)),
    ("xori", OpKind::Immediate(AluOp::Xor)),
    ("slti", OpKind::Immediate(AluOp::SetLessSigned)),
    ("sltiu", OpKind::Immediate(AluOp::SetLessUnsigned)),
    ("slli", OpKind::Immediate(AluOp::Shl)),
    ("srli", OpKind::Immediate(AluOp::ShrLogical)),
    ("srai", OpKind::Immediate(AluOp::ShrArith)),
    ("beq", OpKind::Branch(BranchCond::Eq)),
    ("bne", OpKind::Branch(BranchCond::Ne)),
    ("blt", OpKind::Branch(BranchCond::LtSigned)),
    ("bge", OpKind::Branch(BranchCond::GeSigned)),
    ("bltu", OpKind::Branch(BranchCond::LtUnsigned)),
    ("bgeu", OpKind::Branch(BranchCond::GeUnsigned)),
];

/// Resolves a mnemonic to its operation descriptor.
///
/// Matching is ASCII case-insensitive. Mnemonics outside the table resolve
/// to `None` and are classified by operand shape instead.
#[must_use]
pub fn resolve_mnemonic(name: &str) -> Option<OpKind> {
    MNEMONIC_TABLE
        .iter()
        .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
        .map(|&(_, kind)| kind)
}
