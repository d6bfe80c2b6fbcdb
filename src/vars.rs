//! Named pseudo-variables ("HBL", "GemdosOpcode", ...) that expressions and
//! breakpoint conditions can refer to.

use crate::machine::{
    Counter, CpuRegister, Machine, Processor, ProgramSections, Width,
    read_cpu_memory,
};
use crate::symbols::SymbolFilter;
use std::cmp::Ordering;
use std::fmt::Write;

//===========================================================================//

/// Returned by the OS call accessors when the CPU is not on a matching
/// call.
pub const INVALID_OPCODE: u32 = 0xffff;

/// Where a variable's value comes from.
#[derive(Clone, Copy, Debug)]
pub enum VariableSource {
    /// An emulator event counter, read directly.
    Counter(Counter),
    /// A value computed from the machine state.
    Accessor(fn(&dyn Machine) -> u32),
}

/// A debugger pseudo-variable.
#[derive(Debug)]
pub struct Variable {
    /// The variable's name, matched case-insensitively.
    pub name: &'static str,
    /// How to read the variable.
    pub source: VariableSource,
    /// The variable's width in bits, when it has a natural one.
    pub bits: Option<u32>,
    /// Description shown in the variable listing.
    pub info: &'static str,
}

impl Variable {
    /// Reads the current value of this variable.
    pub fn read(&self, machine: &dyn Machine) -> u32 {
        match self.source {
            VariableSource::Counter(counter) => machine.counter(counter),
            VariableSource::Accessor(accessor) => accessor(machine),
        }
    }
}

/// Identifies one of the entries of the variable table.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct VariableId(usize);

impl VariableId {
    /// Returns the variable this identifies.
    pub fn variable(self) -> &'static Variable {
        &VARIABLES[self.0]
    }
}

//===========================================================================//

macro_rules! accessor {
    ($name:expr, $func:expr, $bits:expr, $info:expr) => {
        Variable {
            name: $name,
            source: VariableSource::Accessor($func),
            bits: $bits,
            info: $info,
        }
    };
}

/// Sorted case-insensitively by name, so that it can be bisected.
static VARIABLES: [Variable; 21] = [
    accessor!("AesOpcode", aes_opcode, Some(16), "$FFFF when not on AES trap"),
    accessor!("Basepage", basepage, None, "invalid before a program is loaded"),
    accessor!("BiosOpcode", bios_opcode, Some(16), "$FFFF when not on BIOS trap"),
    accessor!("BSS", bss, None, "invalid before a program is loaded"),
    accessor!("CpuInstr", cpu_instructions, None, "CPU instructions count"),
    accessor!(
        "CycleCounter",
        cycle_counter,
        None,
        "global cycles counter (lower 32 bits)"
    ),
    accessor!("DATA", data, None, "invalid before a program is loaded"),
    accessor!("DspInstr", dsp_instructions, None, "DSP instructions count"),
    accessor!("FrameCycles", frame_cycles, None, "cycles since VBL"),
    accessor!(
        "GemdosOpcode",
        gemdos_opcode,
        Some(16),
        "$FFFF when not on GEMDOS trap"
    ),
    Variable {
        name: "HBL",
        source: VariableSource::Counter(Counter::Hbl),
        bits: Some(32),
        info: "number of HBL interrupts",
    },
    accessor!(
        "LineAOpcode",
        line_a_opcode,
        Some(16),
        "$FFFF when not on Line-A opcode"
    ),
    accessor!(
        "LineCycles",
        line_cycles,
        None,
        "cycles since HBL (divisible by 4)"
    ),
    accessor!(
        "LineFOpcode",
        line_f_opcode,
        Some(16),
        "$FFFF when not on Line-F opcode"
    ),
    accessor!(
        "OsCallParam",
        os_call_param,
        Some(16),
        "valid only on OS call opcode breakpoint"
    ),
    accessor!(
        "PConSymbol",
        pc_on_symbol,
        Some(16),
        "1 if PC on symbol, 0 otherwise"
    ),
    accessor!("TEXT", text, None, "invalid before a program is loaded"),
    accessor!("TEXTEnd", text_end, None, "invalid before a program is loaded"),
    Variable {
        name: "VBL",
        source: VariableSource::Counter(Counter::Vbl),
        bits: Some(32),
        info: "number of VBL interrupts",
    },
    accessor!("VdiOpcode", vdi_opcode, Some(16), "$FFFF when not on VDI trap"),
    accessor!(
        "XbiosOpcode",
        xbios_opcode,
        Some(16),
        "$FFFF when not on XBIOS trap"
    ),
];

//===========================================================================//

fn section(machine: &dyn Machine) -> ProgramSections {
    machine.program_sections().unwrap_or_default()
}

fn basepage(machine: &dyn Machine) -> u32 {
    section(machine).basepage
}

fn text(machine: &dyn Machine) -> u32 {
    section(machine).text
}

fn text_end(machine: &dyn Machine) -> u32 {
    section(machine).text_end
}

fn data(machine: &dyn Machine) -> u32 {
    section(machine).data
}

fn bss(machine: &dyn Machine) -> u32 {
    section(machine).bss
}

fn cpu_instructions(machine: &dyn Machine) -> u32 {
    machine.timing().cpu_instructions
}

fn dsp_instructions(machine: &dyn Machine) -> u32 {
    machine.timing().dsp_instructions
}

fn cycle_counter(machine: &dyn Machine) -> u32 {
    machine.timing().cycles as u32
}

fn frame_cycles(machine: &dyn Machine) -> u32 {
    machine.timing().frame_cycles
}

fn line_cycles(machine: &dyn Machine) -> u32 {
    machine.timing().line_cycles
}

fn read_word(machine: &dyn Machine, addr: u32) -> u32 {
    read_cpu_memory(machine, addr, Width::Word)
}

fn instruction_at_pc(machine: &dyn Machine) -> u32 {
    read_word(machine, machine.cpu_register(CpuRegister::Pc))
}

/// Line-A and Line-F opcodes are `$A00x` and `$F00x`.
fn line_opcode(machine: &dyn Machine, line: u32) -> u32 {
    let instruction = instruction_at_pc(machine);
    if instruction >> 12 == line {
        instruction & 0xff
    } else {
        INVALID_OPCODE
    }
}

fn line_a_opcode(machine: &dyn Machine) -> u32 {
    line_opcode(machine, 0xa)
}

fn line_f_opcode(machine: &dyn Machine) -> u32 {
    line_opcode(machine, 0xf)
}

fn is_trap(machine: &dyn Machine, trap: u32) -> bool {
    instruction_at_pc(machine) == 0x4e40 + trap
}

/// For GEMDOS, BIOS and XBIOS the opcode is the first word on the stack.
fn trap_opcode(machine: &dyn Machine, trap: u32) -> u32 {
    if is_trap(machine, trap) {
        read_word(machine, machine.cpu_register(CpuRegister::Address(7)))
    } else {
        INVALID_OPCODE
    }
}

fn gemdos_opcode(machine: &dyn Machine) -> u32 {
    trap_opcode(machine, 1)
}

fn bios_opcode(machine: &dyn Machine) -> u32 {
    trap_opcode(machine, 13)
}

fn xbios_opcode(machine: &dyn Machine) -> u32 {
    trap_opcode(machine, 14)
}

/// The first parameter word, following the opcode on the stack.
fn os_call_param(machine: &dyn Machine) -> u32 {
    let stack = machine.cpu_register(CpuRegister::Address(7));
    read_word(machine, stack.wrapping_add(2))
}

/// AES and VDI calls keep their opcode in `control[0]`, with the parameter
/// block address in D1.
fn control_opcode(machine: &dyn Machine) -> u32 {
    let block = machine.cpu_register(CpuRegister::Data(1));
    let control = read_cpu_memory(machine, block, Width::Long);
    read_word(machine, control)
}

fn aes_opcode(machine: &dyn Machine) -> u32 {
    if is_trap(machine, 2) {
        match machine.cpu_register(CpuRegister::Data(0)) & 0xffff {
            0xc8 => return control_opcode(machine),
            0xc9 => return 0x11,
            _ => {}
        }
    }
    INVALID_OPCODE
}

fn vdi_opcode(machine: &dyn Machine) -> u32 {
    if is_trap(machine, 2) {
        match machine.cpu_register(CpuRegister::Data(0)) & 0xffff {
            0x73 => return control_opcode(machine),
            0xfffe => return 0xfffe,
            _ => {}
        }
    }
    INVALID_OPCODE
}

fn pc_on_symbol(machine: &dyn Machine) -> u32 {
    let pc = machine.cpu_register(CpuRegister::Pc);
    let on_symbol = machine
        .symbols(Processor::Cpu)
        .and_then(|table| table.name_at(pc, SymbolFilter::TEXT))
        .is_some();
    on_symbol as u32
}

//===========================================================================//

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|byte| byte.to_ascii_lowercase())
        .cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()))
}

/// Looks up a variable by its case-insensitive name.
pub fn lookup(name: &str) -> Option<VariableId> {
    VARIABLES
        .binary_search_by(|variable| cmp_ignore_case(variable.name, name))
        .ok()
        .map(VariableId)
}

/// Returns every variable, sorted by name.
pub fn variables() -> impl Iterator<Item = &'static Variable> {
    VARIABLES.iter()
}

/// Formats the variable listing: every name with its current value, in
/// hex and decimal, and its description.
pub fn list(machine: &dyn Machine) -> String {
    let width = VARIABLES
        .iter()
        .map(|variable| variable.name.len())
        .max()
        .unwrap_or(0);
    let mut output =
        String::from("Debugger builtin symbols and their values are:\n");
    for variable in VARIABLES.iter() {
        let value = variable.read(machine);
        if variable.bits == Some(16) {
            let _ = write!(output, " {:>width$}:     ${:04X}", variable.name, value);
        } else {
            let _ = write!(output, " {:>width$}: ${:08X}", variable.name, value);
        }
        let decimal = format!("({})", value as i32);
        let _ = writeln!(output, " {decimal:<12} {}", variable.info);
    }
    output.push_str("Some of the variables are valid only in specific situations.\n");
    output
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{INVALID_OPCODE, VARIABLES, cmp_ignore_case, list, lookup};
    use crate::machine::{
        Counter, CpuRegister, MachineControl, ProgramSections, SimMachine,
    };
    use std::cmp::Ordering;

    fn read(machine: &SimMachine, name: &str) -> u32 {
        lookup(name).unwrap().variable().read(machine)
    }

    #[test]
    fn table_is_sorted() {
        for pair in VARIABLES.windows(2) {
            assert_eq!(
                cmp_ignore_case(pair[0].name, pair[1].name),
                Ordering::Less,
                "{} / {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(lookup("hbl").unwrap().variable().name, "HBL");
        assert_eq!(lookup("LINECYCLES").unwrap().variable().name, "LineCycles");
        assert_eq!(lookup("textend").unwrap().variable().name, "TEXTEnd");
        assert!(lookup("foo").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn counters_and_sections() {
        let mut machine = SimMachine::new(0x1000);
        machine.set_counter(Counter::Vbl, 42);
        assert_eq!(read(&machine, "vbl"), 42);
        assert_eq!(read(&machine, "TEXT"), 0);
        machine.set_program_sections(Some(ProgramSections {
            text: 0x1000,
            ..ProgramSections::default()
        }));
        assert_eq!(read(&machine, "TEXT"), 0x1000);
    }

    #[test]
    fn gemdos_opcode() {
        let mut machine = SimMachine::new(0x10000);
        machine.set_cpu_register(CpuRegister::Pc, 0x400);
        machine.set_cpu_register(CpuRegister::Address(7), 0x8000);
        machine.write_cpu_word(0x8000, 0x3d);
        machine.write_cpu_word(0x8002, 0x1234);
        assert_eq!(read(&machine, "GemdosOpcode"), INVALID_OPCODE);
        machine.write_cpu_word(0x400, 0x4e41);
        assert_eq!(read(&machine, "GemdosOpcode"), 0x3d);
        assert_eq!(read(&machine, "BiosOpcode"), INVALID_OPCODE);
        assert_eq!(read(&machine, "OsCallParam"), 0x1234);
    }

    #[test]
    fn aes_and_vdi_opcodes() {
        let mut machine = SimMachine::new(0x10000);
        machine.set_cpu_register(CpuRegister::Pc, 0x400);
        machine.write_cpu_word(0x400, 0x4e42);
        machine.set_cpu_register(CpuRegister::Data(1), 0x2000);
        machine.write_cpu_long(0x2000, 0x3000);
        machine.write_cpu_word(0x3000, 0x4d);
        machine.set_cpu_register(CpuRegister::Data(0), 0xc8);
        assert_eq!(read(&machine, "AesOpcode"), 0x4d);
        assert_eq!(read(&machine, "VdiOpcode"), INVALID_OPCODE);
        machine.set_cpu_register(CpuRegister::Data(0), 0xc9);
        assert_eq!(read(&machine, "AesOpcode"), 0x11);
        machine.set_cpu_register(CpuRegister::Data(0), 0x73);
        assert_eq!(read(&machine, "VdiOpcode"), 0x4d);
    }

    #[test]
    fn line_opcodes() {
        let mut machine = SimMachine::new(0x1000);
        machine.set_cpu_register(CpuRegister::Pc, 0x100);
        machine.write_cpu_word(0x100, 0xa00a);
        assert_eq!(read(&machine, "LineAOpcode"), 0x0a);
        assert_eq!(read(&machine, "LineFOpcode"), INVALID_OPCODE);
    }

    #[test]
    fn listing() {
        let machine = SimMachine::new(0x1000);
        let text = list(&machine);
        assert!(text.contains("    AesOpcode:     $FFFF (65535)"));
        assert!(text.contains("          HBL: $00000000 (0)"));
    }
}

//===========================================================================//
