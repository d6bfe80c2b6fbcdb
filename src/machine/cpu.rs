use std::fmt;

//===========================================================================//

/// A 68000-family CPU register that the debugger can name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CpuRegister {
    /// Data register `D0`..`D7`.
    Data(u8),
    /// Address register `A0`..`A7`.
    Address(u8),
    /// Debugger-only virtual register `V0`..`V7`.
    Virtual(u8),
    /// Program counter.
    Pc,
    /// Status register (16 bits).
    Sr,
    /// Interrupt stack pointer.
    Isp,
    /// User stack pointer.
    Usp,
    /// Cache address register (68020+).
    Caar,
    /// Cache control register (68020+).
    Cacr,
    /// Destination function code (68020+).
    Dfc,
    /// Master stack pointer (68020+).
    Msp,
    /// Source function code (68020+).
    Sfc,
    /// Vector base register (68020+).
    Vbr,
}

const CONTROL_REGISTERS: &[(&str, CpuRegister)] = &[
    ("CAAR", CpuRegister::Caar),
    ("CACR", CpuRegister::Cacr),
    ("DFC", CpuRegister::Dfc),
    ("MSP", CpuRegister::Msp),
    ("SFC", CpuRegister::Sfc),
    ("VBR", CpuRegister::Vbr),
];

impl CpuRegister {
    /// The number of distinct CPU registers.
    pub const COUNT: usize = 34;

    /// Looks up a register by its case-insensitive name.  The 68020 control
    /// registers are only recognized when `cpu_level` is at least 2.
    pub fn from_name(name: &str, cpu_level: u32) -> Option<CpuRegister> {
        let upper = name.to_ascii_uppercase();
        let bytes = upper.as_bytes();
        if bytes.len() == 2 {
            if let Some(digit) = (bytes[1] as char).to_digit(8) {
                let digit = digit as u8;
                match bytes[0] {
                    b'D' => return Some(CpuRegister::Data(digit)),
                    b'A' => return Some(CpuRegister::Address(digit)),
                    b'V' => return Some(CpuRegister::Virtual(digit)),
                    _ => {}
                }
            }
        }
        match upper.as_str() {
            "PC" => Some(CpuRegister::Pc),
            "SR" => Some(CpuRegister::Sr),
            "ISP" => Some(CpuRegister::Isp),
            "USP" => Some(CpuRegister::Usp),
            _ if cpu_level >= 2 => CONTROL_REGISTERS
                .iter()
                .find(|&&(control, _)| control == upper)
                .map(|&(_, reg)| reg),
            _ => None,
        }
    }

    /// Returns the number of significant bits in this register.
    pub fn bits(self) -> u32 {
        match self {
            CpuRegister::Sr => 16,
            _ => 32,
        }
    }

    /// Returns every register available at the given CPU level, in listing
    /// order.
    pub fn all(cpu_level: u32) -> Vec<CpuRegister> {
        let mut registers: Vec<CpuRegister> = (0..8)
            .map(CpuRegister::Data)
            .chain((0..8).map(CpuRegister::Address))
            .collect();
        registers.extend([
            CpuRegister::Pc,
            CpuRegister::Sr,
            CpuRegister::Isp,
            CpuRegister::Usp,
        ]);
        if cpu_level >= 2 {
            registers.extend(CONTROL_REGISTERS.iter().map(|&(_, reg)| reg));
        }
        registers
    }

    pub(crate) fn index(self) -> usize {
        match self {
            CpuRegister::Data(n) => n as usize,
            CpuRegister::Address(n) => 8 + n as usize,
            CpuRegister::Virtual(n) => 16 + n as usize,
            CpuRegister::Pc => 24,
            CpuRegister::Sr => 25,
            CpuRegister::Isp => 26,
            CpuRegister::Usp => 27,
            CpuRegister::Caar => 28,
            CpuRegister::Cacr => 29,
            CpuRegister::Dfc => 30,
            CpuRegister::Msp => 31,
            CpuRegister::Sfc => 32,
            CpuRegister::Vbr => 33,
        }
    }
}

impl fmt::Display for CpuRegister {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CpuRegister::Data(n) => write!(formatter, "D{n}"),
            CpuRegister::Address(n) => write!(formatter, "A{n}"),
            CpuRegister::Virtual(n) => write!(formatter, "V{n}"),
            CpuRegister::Pc => formatter.write_str("PC"),
            CpuRegister::Sr => formatter.write_str("SR"),
            CpuRegister::Isp => formatter.write_str("ISP"),
            CpuRegister::Usp => formatter.write_str("USP"),
            CpuRegister::Caar => formatter.write_str("CAAR"),
            CpuRegister::Cacr => formatter.write_str("CACR"),
            CpuRegister::Dfc => formatter.write_str("DFC"),
            CpuRegister::Msp => formatter.write_str("MSP"),
            CpuRegister::Sfc => formatter.write_str("SFC"),
            CpuRegister::Vbr => formatter.write_str("VBR"),
        }
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::CpuRegister;

    #[test]
    fn register_names() {
        assert_eq!(CpuRegister::from_name("d0", 0), Some(CpuRegister::Data(0)));
        assert_eq!(
            CpuRegister::from_name("A7", 0),
            Some(CpuRegister::Address(7))
        );
        assert_eq!(CpuRegister::from_name("pc", 0), Some(CpuRegister::Pc));
        assert_eq!(CpuRegister::from_name("Sr", 0), Some(CpuRegister::Sr));
        assert_eq!(CpuRegister::from_name("usp", 0), Some(CpuRegister::Usp));
        assert_eq!(CpuRegister::from_name("d8", 0), None);
        assert_eq!(CpuRegister::from_name("d10", 0), None);
        assert_eq!(CpuRegister::from_name("d", 0), None);
    }

    #[test]
    fn control_registers_need_68020() {
        assert_eq!(CpuRegister::from_name("vbr", 0), None);
        assert_eq!(CpuRegister::from_name("vbr", 2), Some(CpuRegister::Vbr));
        assert_eq!(CpuRegister::all(0).len(), 20);
        assert_eq!(CpuRegister::all(3).len(), 26);
    }

    #[test]
    fn display_and_bits() {
        assert_eq!(CpuRegister::Address(3).to_string(), "A3");
        assert_eq!(CpuRegister::Sr.bits(), 16);
        assert_eq!(CpuRegister::Data(1).bits(), 32);
    }

    #[test]
    fn indices_are_distinct() {
        let mut indices: Vec<usize> = CpuRegister::all(2)
            .into_iter()
            .chain((0..8).map(CpuRegister::Virtual))
            .map(CpuRegister::index)
            .collect();
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), CpuRegister::COUNT);
        assert!(indices.iter().all(|&index| index < CpuRegister::COUNT));
    }
}

//===========================================================================//
