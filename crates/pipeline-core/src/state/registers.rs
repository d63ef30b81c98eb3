use std::fmt;

/// Number of architecturally visible general-purpose registers (`x0..x31`).
pub const REGISTER_COUNT: usize = 32;

/// Architecturally visible general-purpose register identifier (`x0`–`x31`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Reg(u8);

impl Reg {
    /// Builds a register from its numeric index (`0..=31`).
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < REGISTER_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Returns the array index for this register (`0..=31`).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Parses a register name of the form `x0`..`x31` (case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let digits = name.strip_prefix('x').or_else(|| name.strip_prefix('X'))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u8>().ok().and_then(Self::new)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Architectural register file: one signed 32-bit value per register.
///
/// Reads of never-written registers return 0; writes overwrite
/// unconditionally. Atomicity of a commit is the session's responsibility,
/// not the register file's.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    values: [i32; REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            values: [0; REGISTER_COUNT],
        }
    }
}

impl RegisterFile {
    /// Creates a register file with every register at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a register file from zero plus the given initial assignments.
    #[must_use]
    pub fn with_assignments(assignments: &[(Reg, i32)]) -> Self {
        let mut file = Self::default();
        for &(reg, value) in assignments {
            file.write(reg, value);
        }
        file
    }

    /// Reads a general-purpose register.
    #[must_use]
    pub const fn read(&self, reg: Reg) -> i32 {
        self.values[reg.index()]
    }

    /// Writes a general-purpose register, overwriting any previous value.
    pub const fn write(&mut self, reg: Reg, value: i32) {
        self.values[reg.index()] = value;
    }

    /// Iterates all registers in index order with their current values.
    pub fn iter(&self) -> impl Iterator<Item = (Reg, i32)> + '_ {
        (0_u8..)
            .zip(self.values.iter())
            .map(|(index, &value)| (Reg(index), value))
    }
}
