use std::fmt;

//===========================================================================//

const fn bitmask(bits: u32) -> u32 {
    (1 << bits) - 1
}

/// Register names and value masks, sorted by name.
const REGISTERS: &[(&str, u32)] = &[
    ("A0", bitmask(24)),
    ("A1", bitmask(24)),
    ("A2", bitmask(8)),
    ("B0", bitmask(24)),
    ("B1", bitmask(24)),
    ("B2", bitmask(8)),
    ("LA", bitmask(16)),
    ("LC", bitmask(16)),
    ("M0", bitmask(16)),
    ("M1", bitmask(16)),
    ("M2", bitmask(16)),
    ("M3", bitmask(16)),
    ("M4", bitmask(16)),
    ("M5", bitmask(16)),
    ("M6", bitmask(16)),
    ("M7", bitmask(16)),
    ("N0", bitmask(16)),
    ("N1", bitmask(16)),
    ("N2", bitmask(16)),
    ("N3", bitmask(16)),
    ("N4", bitmask(16)),
    ("N5", bitmask(16)),
    ("N6", bitmask(16)),
    ("N7", bitmask(16)),
    ("OMR", 0x5f),
    ("PC", bitmask(16)),
    ("R0", bitmask(16)),
    ("R1", bitmask(16)),
    ("R2", bitmask(16)),
    ("R3", bitmask(16)),
    ("R4", bitmask(16)),
    ("R5", bitmask(16)),
    ("R6", bitmask(16)),
    ("R7", bitmask(16)),
    ("SP", bitmask(6)),
    ("SR", 0xefff),
    ("SSH", bitmask(16)),
    ("SSL", bitmask(16)),
    ("X0", bitmask(24)),
    ("X1", bitmask(24)),
    ("Y0", bitmask(24)),
    ("Y1", bitmask(24)),
];

//===========================================================================//

/// A DSP56001 register that the debugger can name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DspRegister(u8);

impl DspRegister {
    /// The number of distinct DSP registers.
    pub const COUNT: usize = REGISTERS.len();

    /// The DSP program counter.
    pub const PC: DspRegister = DspRegister(25);

    /// Looks up a register by its case-insensitive name.
    pub fn from_name(name: &str) -> Option<DspRegister> {
        let upper = name.to_ascii_uppercase();
        REGISTERS
            .binary_search_by(|&(reg_name, _)| reg_name.cmp(upper.as_str()))
            .ok()
            .map(|index| DspRegister(index as u8))
    }

    /// Returns the register's upper-case name.
    pub fn name(self) -> &'static str {
        REGISTERS[self.0 as usize].0
    }

    /// Returns the mask of the bits that this register actually holds.
    pub fn mask(self) -> u32 {
        REGISTERS[self.0 as usize].1
    }

    /// Returns true for the `R0`..`R7` address registers, the only ones
    /// usable for indirect addressing.
    pub fn is_address(self) -> bool {
        self.name().starts_with('R')
    }

    /// Returns every DSP register, sorted by name.
    pub fn all() -> impl Iterator<Item = DspRegister> {
        (0..REGISTERS.len()).map(|index| DspRegister(index as u8))
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DspRegister {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

//===========================================================================//


//===========================================================================//
