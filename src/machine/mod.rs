//! Contracts for the emulated machine that breakpoint conditions inspect.

mod cpu;
mod dsp;
mod sim;

pub use cpu::CpuRegister;
pub use dsp::DspRegister;
pub use sim::{SimError, SimMachine};

use crate::symbols::SymbolTable;
use byteorder::{BigEndian, ByteOrder};
use std::fmt;

//===========================================================================//

/// Which of the emulated processors something belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Processor {
    /// The 68000-family main CPU.
    Cpu,
    /// The DSP56001 coprocessor.
    Dsp,
}

impl Processor {
    /// Returns the short upper-case name used in debugger messages.
    pub fn name(self) -> &'static str {
        match self {
            Processor::Cpu => "CPU",
            Processor::Dsp => "DSP",
        }
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

//===========================================================================//

/// A DSP56001 memory space.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DspSpace {
    /// Program memory.
    P,
    /// X data memory.
    X,
    /// Y data memory.
    Y,
}

impl DspSpace {
    /// Returns the space named by a lower-case address-space modifier
    /// letter, if any.
    pub fn from_modifier(letter: char) -> Option<DspSpace> {
        match letter {
            'p' => Some(DspSpace::P),
            'x' => Some(DspSpace::X),
            'y' => Some(DspSpace::Y),
            _ => None,
        }
    }

    /// Returns the lower-case modifier letter for this space.
    pub fn letter(self) -> char {
        match self {
            DspSpace::P => 'p',
            DspSpace::X => 'x',
            DspSpace::Y => 'y',
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            DspSpace::P => 0,
            DspSpace::X => 1,
            DspSpace::Y => 2,
        }
    }
}

//===========================================================================//

/// The width of a CPU memory access.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Width {
    /// 8 bits.
    Byte,
    /// 16 bits.
    Word,
    /// 32 bits.
    Long,
}

impl Width {
    /// Returns the width named by a lower-case `.b`/`.w`/`.l` modifier
    /// letter, if any.
    pub fn from_modifier(letter: char) -> Option<Width> {
        match letter {
            'b' => Some(Width::Byte),
            'w' => Some(Width::Word),
            'l' => Some(Width::Long),
            _ => None,
        }
    }

    /// Returns the access width with exactly the given number of bits.
    pub fn from_bits(bits: u32) -> Option<Width> {
        match bits {
            8 => Some(Width::Byte),
            16 => Some(Width::Word),
            32 => Some(Width::Long),
            _ => None,
        }
    }

    /// Returns the number of bits in an access of this width.
    pub fn bits(self) -> u32 {
        8 * self.size()
    }

    /// Returns the number of bytes in an access of this width.
    pub fn size(self) -> u32 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::Long => 4,
        }
    }
}

//===========================================================================//

/// A register of either processor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Register {
    /// A main CPU register.
    Cpu(CpuRegister),
    /// A DSP register.
    Dsp(DspRegister),
}

impl Register {
    /// Reads the current value of this register.
    pub fn read(self, machine: &dyn Machine) -> u32 {
        match self {
            Register::Cpu(reg) => machine.cpu_register(reg),
            Register::Dsp(reg) => machine.dsp_register(reg) & reg.mask(),
        }
    }

    /// Returns the register's name, in upper case.
    pub fn name(self) -> String {
        match self {
            Register::Cpu(reg) => reg.to_string(),
            Register::Dsp(reg) => reg.name().to_string(),
        }
    }
}

//===========================================================================//

/// An emulator event counter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Counter {
    /// Horizontal blank interrupts since boot.
    Hbl,
    /// Vertical blank interrupts since boot.
    Vbl,
}

/// Cycle and instruction counters of the running emulation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Timing {
    /// CPU cycles since the debugger was last entered.
    pub cycles: u64,
    /// CPU cycles since the start of the current video frame.
    pub frame_cycles: u32,
    /// CPU cycles since the start of the current scan line.
    pub line_cycles: u32,
    /// CPU instructions executed since the debugger was last entered.
    pub cpu_instructions: u32,
    /// DSP instructions executed since the debugger was last entered.
    pub dsp_instructions: u32,
}

/// Section addresses of the currently loaded program.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProgramSections {
    /// Address of the program's basepage.
    pub basepage: u32,
    /// Start of the TEXT section.
    pub text: u32,
    /// End of the TEXT section.
    pub text_end: u32,
    /// Start of the DATA section.
    pub data: u32,
    /// Start of the BSS section.
    pub bss: u32,
}

//===========================================================================//

/// Read-only view of an emulated machine, as seen by the debugger.
///
/// None of these methods may have side effects on the emulation; they are
/// called while evaluating breakpoint conditions after every instruction.
pub trait Machine {
    /// Returns the CPU family level (0 for a 68000, 2 for a 68020, ...).
    fn cpu_level(&self) -> u32 {
        0
    }

    /// Returns the current value of a CPU register.
    fn cpu_register(&self, reg: CpuRegister) -> u32;

    /// Returns the current raw value of a DSP register.
    fn dsp_register(&self, reg: DspRegister) -> u32;

    /// Reads a byte of CPU memory without side effects.  Addresses wrap to
    /// the width of the CPU address bus.
    fn peek_cpu_byte(&self, addr: u32) -> u8;

    /// Returns true if the `size` bytes starting at `addr` lie in valid CPU
    /// RAM, ROM or IO space.
    fn is_cpu_area_valid(&self, addr: u32, size: u32) -> bool;

    /// Reads a 24-bit word of DSP memory from the given space.
    fn peek_dsp_word(&self, space: DspSpace, addr: u16) -> u32;

    /// Returns one of the event counters.
    fn counter(&self, counter: Counter) -> u32;

    /// Returns the cycle and instruction counters.
    fn timing(&self) -> Timing;

    /// Returns the section addresses of the loaded program, if any.
    fn program_sections(&self) -> Option<ProgramSections> {
        None
    }

    /// Returns the symbol table loaded for the given processor, if any.
    fn symbols(&self, processor: Processor) -> Option<&SymbolTable> {
        let _ = processor;
        None
    }
}

/// An emulated machine whose state the debugger may also change.
pub trait MachineControl: Machine {
    /// Sets a CPU register.
    fn set_cpu_register(&mut self, reg: CpuRegister, value: u32);

    /// Sets a DSP register.  The value is truncated to the register's mask.
    fn set_dsp_register(&mut self, reg: DspRegister, value: u32);

    /// Writes a byte of CPU memory.  Writes outside valid memory are
    /// ignored.
    fn poke_cpu_byte(&mut self, addr: u32, value: u8);
}

//===========================================================================//

/// Reads a big-endian value of the given width from CPU memory.
pub fn read_cpu_memory(machine: &dyn Machine, addr: u32, width: Width) -> u32 {
    let mut buffer = [0u8; 4];
    let size = width.size() as usize;
    for (offset, byte) in buffer[..size].iter_mut().enumerate() {
        *byte = machine.peek_cpu_byte(addr.wrapping_add(offset as u32));
    }
    match width {
        Width::Byte => buffer[0] as u32,
        Width::Word => BigEndian::read_u16(&buffer[..2]) as u32,
        Width::Long => BigEndian::read_u32(&buffer),
    }
}

/// Reads a value from the memory of the given processor.  CPU reads use
/// `width`; DSP reads fetch the 24-bit word in `space`.
pub fn read_memory(
    machine: &dyn Machine,
    addr: u32,
    space: Option<DspSpace>,
    width: Width,
) -> u32 {
    match space {
        Some(space) => machine.peek_dsp_word(space, addr as u16),
        None => read_cpu_memory(machine, addr, width),
    }
}

//===========================================================================//


//===========================================================================//
