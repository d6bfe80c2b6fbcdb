use super::{
    Counter, CpuRegister, DspRegister, DspSpace, Machine, MachineControl,
    Processor, ProgramSections, Timing,
};
use crate::symbols::SymbolTable;
use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

//===========================================================================//

const ADDRESS_MASK: u32 = 0x00ff_ffff;
const IO_START: u32 = 0x00ff_8000;
const IO_END: u32 = 0x0100_0000;
const DSP_MEMORY_WORDS: usize = 0x1_0000;
const DSP_WORD_MASK: u32 = 0x00ff_ffff;

/// An error from setting up a [`SimMachine`].
#[derive(Debug, Error)]
pub enum SimError {
    /// The data to load does not fit into RAM at the requested address.
    #[error("{len} bytes at ${addr:x} don't fit into {ram_size} bytes of RAM")]
    LoadOutOfRange {
        /// The load address.
        addr: u32,
        /// The number of bytes to load.
        len: usize,
        /// The size of the machine's RAM.
        ram_size: usize,
    },
}

//===========================================================================//

/// An in-memory machine with 68000-style RAM and IO regions, both register
/// files, DSP P/X/Y memories, counters and symbol tables.  Nothing ever runs
/// on it; the debugger front-end and tests set its state directly.
pub struct SimMachine {
    ram: Box<[u8]>,
    io: Box<[u8]>,
    cpu_level: u32,
    cpu_registers: [u32; CpuRegister::COUNT],
    dsp_registers: [u32; DspRegister::COUNT],
    dsp_memory: [Box<[u32]>; 3],
    hbl: u32,
    vbl: u32,
    timing: Timing,
    sections: Option<ProgramSections>,
    cpu_symbols: Option<SymbolTable>,
    dsp_symbols: Option<SymbolTable>,
}

impl SimMachine {
    /// Returns a new machine with `ram_size` bytes of zeroed RAM, and
    /// everything else zeroed or empty.
    pub fn new(ram_size: usize) -> SimMachine {
        let ram_size = ram_size.min(IO_START as usize);
        let dsp_memory = || vec![0u32; DSP_MEMORY_WORDS].into_boxed_slice();
        SimMachine {
            ram: vec![0u8; ram_size].into_boxed_slice(),
            io: vec![0u8; (IO_END - IO_START) as usize].into_boxed_slice(),
            cpu_level: 0,
            cpu_registers: [0; CpuRegister::COUNT],
            dsp_registers: [0; DspRegister::COUNT],
            dsp_memory: [dsp_memory(), dsp_memory(), dsp_memory()],
            hbl: 0,
            vbl: 0,
            timing: Timing::default(),
            sections: None,
            cpu_symbols: None,
            dsp_symbols: None,
        }
    }

    /// Returns the size of this machine's RAM, in bytes.
    pub fn ram_size(&self) -> usize {
        self.ram.len()
    }

    /// Copies `data` into RAM starting at `addr`.
    pub fn load(&mut self, addr: u32, data: &[u8]) -> Result<(), SimError> {
        let start = addr as usize;
        let end = start.checked_add(data.len()).filter(|&end| end <= self.ram.len());
        match end {
            Some(end) => {
                self.ram[start..end].copy_from_slice(data);
                Ok(())
            }
            None => Err(SimError::LoadOutOfRange {
                addr,
                len: data.len(),
                ram_size: self.ram.len(),
            }),
        }
    }

    /// Sets the CPU family level (0 for a 68000, 2 for a 68020, ...).
    pub fn set_cpu_level(&mut self, level: u32) {
        self.cpu_level = level;
    }

    /// Writes a big-endian 16-bit word to CPU memory.
    pub fn write_cpu_word(&mut self, addr: u32, value: u16) {
        let mut buffer = [0u8; 2];
        BigEndian::write_u16(&mut buffer, value);
        self.write_cpu_bytes(addr, &buffer);
    }

    /// Writes a big-endian 32-bit long to CPU memory.
    pub fn write_cpu_long(&mut self, addr: u32, value: u32) {
        let mut buffer = [0u8; 4];
        BigEndian::write_u32(&mut buffer, value);
        self.write_cpu_bytes(addr, &buffer);
    }

    fn write_cpu_bytes(&mut self, addr: u32, bytes: &[u8]) {
        for (offset, &byte) in bytes.iter().enumerate() {
            self.poke_cpu_byte(addr.wrapping_add(offset as u32), byte);
        }
    }

    /// Writes a 24-bit word to DSP memory.
    pub fn write_dsp_word(&mut self, space: DspSpace, addr: u16, value: u32) {
        self.dsp_memory[space.index()][addr as usize] = value & DSP_WORD_MASK;
    }

    /// Sets one of the event counters.
    pub fn set_counter(&mut self, counter: Counter, value: u32) {
        match counter {
            Counter::Hbl => self.hbl = value,
            Counter::Vbl => self.vbl = value,
        }
    }

    /// Sets the cycle and instruction counters.
    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    /// Sets (or clears) the section addresses of the loaded program.
    pub fn set_program_sections(&mut self, sections: Option<ProgramSections>) {
        self.sections = sections;
    }

    /// Replaces the symbol table for the given processor.
    pub fn set_symbols(&mut self, processor: Processor, table: SymbolTable) {
        match processor {
            Processor::Cpu => self.cpu_symbols = Some(table),
            Processor::Dsp => self.dsp_symbols = Some(table),
        }
    }

    fn cpu_byte_mut(&mut self, addr: u32) -> Option<&mut u8> {
        let addr = addr & ADDRESS_MASK;
        if addr >= IO_START {
            self.io.get_mut((addr - IO_START) as usize)
        } else {
            self.ram.get_mut(addr as usize)
        }
    }
}

impl Machine for SimMachine {
    fn cpu_level(&self) -> u32 {
        self.cpu_level
    }

    fn cpu_register(&self, reg: CpuRegister) -> u32 {
        self.cpu_registers[reg.index()]
    }

    fn dsp_register(&self, reg: DspRegister) -> u32 {
        self.dsp_registers[reg.index()]
    }

    fn peek_cpu_byte(&self, addr: u32) -> u8 {
        let addr = addr & ADDRESS_MASK;
        let byte = if addr >= IO_START {
            self.io.get((addr - IO_START) as usize)
        } else {
            self.ram.get(addr as usize)
        };
        byte.copied().unwrap_or(0)
    }

    fn is_cpu_area_valid(&self, addr: u32, size: u32) -> bool {
        let start = addr & ADDRESS_MASK;
        let end = start as u64 + size.max(1) as u64;
        if start >= IO_START {
            end <= IO_END as u64
        } else {
            end <= self.ram.len() as u64
        }
    }

    fn peek_dsp_word(&self, space: DspSpace, addr: u16) -> u32 {
        self.dsp_memory[space.index()][addr as usize]
    }

    fn counter(&self, counter: Counter) -> u32 {
        match counter {
            Counter::Hbl => self.hbl,
            Counter::Vbl => self.vbl,
        }
    }

    fn timing(&self) -> Timing {
        self.timing
    }

    fn program_sections(&self) -> Option<ProgramSections> {
        self.sections
    }

    fn symbols(&self, processor: Processor) -> Option<&SymbolTable> {
        match processor {
            Processor::Cpu => self.cpu_symbols.as_ref(),
            Processor::Dsp => self.dsp_symbols.as_ref(),
        }
    }
}

impl MachineControl for SimMachine {
    fn set_cpu_register(&mut self, reg: CpuRegister, value: u32) {
        let value = if reg.bits() < 32 {
            value & ((1 << reg.bits()) - 1)
        } else {
            value
        };
        self.cpu_registers[reg.index()] = value;
    }

    fn set_dsp_register(&mut self, reg: DspRegister, value: u32) {
        self.dsp_registers[reg.index()] = value & reg.mask();
    }

    fn poke_cpu_byte(&mut self, addr: u32, value: u8) {
        if let Some(byte) = self.cpu_byte_mut(addr) {
            *byte = value;
        }
    }
}

//===========================================================================//


//===========================================================================//
