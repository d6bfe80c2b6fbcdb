//! The debugger front-end: runs commands against a machine, and carries
//! out what fired breakpoints ask for.

use crate::breakpoint::{ADDRESS_USAGE, Breakpoints, HitHooks, InfoKind};
use crate::command::{COMMAND_HELP, Command, CommandError, parse_command};
use crate::config::Config;
use crate::eval::{AddressRange, EvalEnv, evaluate, evaluate_range};
use crate::machine::{
    CpuRegister, DspRegister, Machine, MachineControl, Processor,
};
use crate::vars;
use std::collections::VecDeque;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

//===========================================================================//

/// How deeply command files may run other command files.
pub const MAX_FILE_DEPTH: usize = 8;

/// How many breakpoint hits the history remembers.
pub const HISTORY_SIZE: usize = 16;

const MEMDUMP_LINE: u32 = 16;
const MEMDUMP_LINES: u32 = 4;

/// The last address of a default-sized dump, stopping at the top of the
/// address space.
fn memdump_end(start: u32) -> u32 {
    start.saturating_add(MEMDUMP_LINE * MEMDUMP_LINES - 1)
}

//===========================================================================//

/// Debugger state that outlives single commands.
#[derive(Debug)]
pub struct Session {
    history: VecDeque<(Processor, usize)>,
    locked_info: InfoKind,
    memdump_next: Option<u32>,
    file_depth: usize,
    output: String,
}

impl Default for Session {
    fn default() -> Session {
        Session {
            history: VecDeque::new(),
            locked_info: InfoKind::Registers,
            memdump_next: None,
            file_depth: 0,
            output: String::new(),
        }
    }
}

impl Session {
    /// Returns the most recent breakpoint hits, oldest first, as processor
    /// and 1-based breakpoint index.
    pub fn history(&self) -> impl Iterator<Item = &(Processor, usize)> {
        self.history.iter()
    }

    /// Returns the info shown for breakpoints with the `lock` option.
    pub fn locked_info(&self) -> InfoKind {
        self.locked_info
    }

    /// Sets the info shown for breakpoints with the `lock` option.
    pub fn set_locked_info(&mut self, info: InfoKind) {
        self.locked_info = info;
    }

    fn init(&mut self) {
        self.memdump_next = None;
    }

    fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

//===========================================================================//

/// Renders one of the infos a breakpoint can show.
pub fn info_text<M: Machine>(
    info: InfoKind,
    machine: &M,
    session: &Session,
) -> String {
    let mut text = String::new();
    match info {
        InfoKind::Registers => {
            let registers = CpuRegister::all(machine.cpu_level());
            for (index, reg) in registers.into_iter().enumerate() {
                let separator = if index % 4 == 3 { "\n" } else { "  " };
                let name = reg.to_string();
                let _ = write!(
                    text,
                    "{name:<4} ${:08x}{separator}",
                    machine.cpu_register(reg)
                );
            }
        }
        InfoKind::DspRegisters => {
            for (index, reg) in DspRegister::all().enumerate() {
                let separator = if index % 4 == 3 { "\n" } else { "  " };
                let value = machine.dsp_register(reg) & reg.mask();
                let _ = write!(text, "{:<3} ${value:06x}{separator}", reg.name());
            }
        }
        InfoKind::Variables => text = vars::list(machine),
        InfoKind::History => {
            if session.history.is_empty() {
                text.push_str("No breakpoint hits.\n");
            }
            for (processor, index) in session.history.iter() {
                let _ = writeln!(text, "{processor} breakpoint {index}");
            }
        }
    }
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

//===========================================================================//

/// Carries out breakpoint side effects against a debugger session.
pub struct HitRunner<'a> {
    config: &'a Config,
    session: &'a mut Session,
}

impl<'a> HitRunner<'a> {
    /// Returns hooks that record into the given session.
    pub fn new(config: &'a Config, session: &'a mut Session) -> Self {
        HitRunner { config, session }
    }
}

impl<'a, M: MachineControl> HitHooks<M> for HitRunner<'a> {
    fn mark_history(&mut self, processor: Processor, index: usize) {
        if self.session.history.len() >= HISTORY_SIZE {
            self.session.history.pop_front();
        }
        self.session.history.push_back((processor, index));
    }

    fn init_session(&mut self, _machine: &mut M) {
        self.session.init();
    }

    fn show_info(&mut self, info: InfoKind, machine: &M) {
        let text = info_text(info, machine, &*self.session);
        self.session.output.push_str(&text);
    }

    fn show_locked_info(&mut self, machine: &M) {
        let locked = self.session.locked_info;
        let text = info_text(locked, machine, &*self.session);
        self.session.output.push_str(&text);
    }

    fn run_command_file(
        &mut self,
        path: &Path,
        reinit: bool,
        breakpoints: &mut Breakpoints,
        machine: &mut M,
    ) {
        let mut executor = Executor {
            machine,
            breakpoints,
            config: self.config,
            session: &mut *self.session,
        };
        match executor.run_file(path) {
            Ok(output) => executor.session.output.push_str(&output),
            Err(error) => error!("{}", error.report().trim_end()),
        }
        if reinit {
            executor.session.init();
        }
    }
}

//===========================================================================//

/// Runs commands with borrowed debugger state.
pub struct Executor<'a, M: MachineControl> {
    machine: &'a mut M,
    breakpoints: &'a mut Breakpoints,
    config: &'a Config,
    session: &'a mut Session,
}

impl<'a, M: MachineControl> Executor<'a, M> {
    /// Parses and runs one line of input, returning what it prints.
    pub fn execute_line(&mut self, line: &str) -> Result<String, CommandError> {
        match parse_command(line)? {
            Some(command) => self.execute(command),
            None => Ok(String::new()),
        }
    }

    /// Runs a command, returning what it prints.
    pub fn execute(&mut self, command: Command) -> Result<String, CommandError> {
        debug!("executing {command:?}");
        match command {
            Command::Breakpoint { processor, args } => {
                Ok(self.breakpoints.command(
                    args.as_deref(),
                    processor,
                    &*self.machine,
                    self.config,
                )?)
            }
            Command::Address { args: None, .. } => Ok(ADDRESS_USAGE.to_string()),
            Command::Address { processor, args: Some(args) } => {
                let addr = self.breakpoints.address_command(
                    &args,
                    processor,
                    &*self.machine,
                    self.config,
                )?;
                Ok(format!("{processor} breakpoint at ${addr:x}\n"))
            }
            Command::Evaluate { processor, expression } => {
                let value = self.evaluate(processor, &expression)?;
                Ok(format!(
                    "= %{value:b} (bin), #{value} (dec), ${value:x} (hex)\n"
                ))
            }
            Command::Registers { processor, assignment: None } => {
                let info = match processor {
                    Processor::Cpu => InfoKind::Registers,
                    Processor::Dsp => InfoKind::DspRegisters,
                };
                Ok(info_text(info, &*self.machine, &*self.session))
            }
            Command::Registers { processor, assignment: Some((name, expr)) } => {
                self.set_register(processor, &name, &expr)?;
                Ok(String::new())
            }
            Command::Write { address, bytes } => {
                let addr = self.evaluate(Processor::Cpu, &address)?;
                let mut values = Vec::with_capacity(bytes.len());
                for byte in bytes.iter() {
                    let value = self.evaluate(Processor::Cpu, byte)?;
                    if value > 0xff {
                        return Err(CommandError::ByteValue(value));
                    }
                    values.push(value as u8);
                }
                for (offset, &value) in values.iter().enumerate() {
                    self.machine
                        .poke_cpu_byte(addr.wrapping_add(offset as u32), value);
                }
                Ok(String::new())
            }
            Command::Memory { range } => self.dump_memory(range.as_deref()),
            Command::Match => Ok(self.match_breakpoints()),
            Command::Save(path) => {
                self.breakpoints
                    .save(&path)
                    .map_err(|error| CommandError::Io { path, error })?;
                Ok(String::new())
            }
            Command::Variables => Ok(vars::list(&*self.machine)),
            Command::File(path) => self.run_file(&path),
            Command::Help => Ok(COMMAND_HELP.to_string()),
        }
    }

    fn evaluate(
        &self,
        processor: Processor,
        text: &str,
    ) -> Result<u32, CommandError> {
        let env = EvalEnv::new(&*self.machine, processor, self.config);
        evaluate(text, &env).map_err(|failure| CommandError::Expression {
            text: text.to_string(),
            failure,
        })
    }

    fn set_register(
        &mut self,
        processor: Processor,
        name: &str,
        expr: &str,
    ) -> Result<(), CommandError> {
        let unknown = || CommandError::UnknownRegister {
            processor,
            name: name.to_string(),
        };
        match processor {
            Processor::Cpu => {
                let level = self.machine.cpu_level();
                let reg = CpuRegister::from_name(name, level).ok_or_else(unknown)?;
                let value = self.evaluate(processor, expr)?;
                self.machine.set_cpu_register(reg, value);
            }
            Processor::Dsp => {
                let reg = DspRegister::from_name(name).ok_or_else(unknown)?;
                let value = self.evaluate(processor, expr)?;
                self.machine.set_dsp_register(reg, value);
            }
        }
        Ok(())
    }

    fn dump_memory(&mut self, range: Option<&str>) -> Result<String, CommandError> {
        let machine: &M = &*self.machine;
        let (start, end) = match range {
            Some(text) => {
                let env = EvalEnv::new(machine, Processor::Cpu, self.config);
                match evaluate_range(text, &env)? {
                    AddressRange::Single(addr) => (addr, memdump_end(addr)),
                    AddressRange::Span { lower, upper } => (lower, upper),
                }
            }
            None => {
                let addr = self
                    .session
                    .memdump_next
                    .unwrap_or_else(|| machine.cpu_register(CpuRegister::Pc));
                (addr, memdump_end(addr))
            }
        };
        let mut text = String::new();
        let mut addr = start;
        loop {
            let line_end = end.min(addr.saturating_add(MEMDUMP_LINE - 1));
            let _ = write!(text, "{addr:08x}:");
            let mut ascii = String::new();
            let mut next = addr;
            loop {
                let byte = machine.peek_cpu_byte(next);
                let _ = write!(text, " {byte:02x}");
                ascii.push(if byte.is_ascii_graphic() { byte as char } else { '.' });
                if next == line_end {
                    break;
                }
                next = next.wrapping_add(1);
            }
            let _ = writeln!(text, "  {ascii}");
            if line_end >= end {
                break;
            }
            addr = line_end + 1;
        }
        self.session.memdump_next = Some(end.wrapping_add(1));
        Ok(text)
    }

    /// Tests the CPU and then the DSP breakpoints once, returning what
    /// fired breakpoints printed and whether the debugger would stop.
    pub fn match_breakpoints(&mut self) -> String {
        let mut runner = HitRunner::new(self.config, &mut *self.session);
        let cpu = self.breakpoints.match_cpu(&mut *self.machine, &mut runner);
        let dsp = self.config.dsp_enabled
            && self.breakpoints.match_dsp(&mut *self.machine, &mut runner);
        let mut text = self.session.take_output();
        match (cpu, dsp) {
            (false, false) => text.push_str("No breakpoint hit.\n"),
            (true, false) => text.push_str("CPU breakpoint hit.\n"),
            (false, true) => text.push_str("DSP breakpoint hit.\n"),
            (true, true) => text.push_str("CPU and DSP breakpoints hit.\n"),
        }
        text
    }

    /// Runs every line of a command file.  A failing line is reported and
    /// the rest of the file still runs.
    pub fn run_file(&mut self, path: &Path) -> Result<String, CommandError> {
        if self.session.file_depth >= MAX_FILE_DEPTH {
            return Err(CommandError::FileDepth(MAX_FILE_DEPTH));
        }
        let contents = fs::read_to_string(path).map_err(|error| {
            CommandError::Io { path: path.to_path_buf(), error }
        })?;
        info!("Reading debugger commands from '{}'...", path.display());
        self.session.file_depth += 1;
        let mut output = String::new();
        for line in contents.lines() {
            debug!("> {line}");
            match self.execute_line(line) {
                Ok(text) => output.push_str(&text),
                Err(error) => error!("{}", error.report().trim_end()),
            }
        }
        self.session.file_depth -= 1;
        Ok(output)
    }
}

//===========================================================================//

/// A machine together with its breakpoints and debugger session.
pub struct Debugger<M: MachineControl> {
    machine: M,
    breakpoints: Breakpoints,
    config: Config,
    session: Session,
}

impl<M: MachineControl> Debugger<M> {
    /// Returns a debugger for the given machine, with no breakpoints.
    pub fn new(machine: M, config: Config) -> Debugger<M> {
        Debugger {
            machine,
            breakpoints: Breakpoints::new(),
            config,
            session: Session::default(),
        }
    }

    /// Returns the machine.
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Returns the machine, mutably.
    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// Returns the breakpoints.
    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the session state, mutably.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn executor(&mut self) -> Executor<'_, M> {
        Executor {
            machine: &mut self.machine,
            breakpoints: &mut self.breakpoints,
            config: &self.config,
            session: &mut self.session,
        }
    }

    /// Parses and runs one line of input, returning what it prints.
    pub fn execute_line(&mut self, line: &str) -> Result<String, CommandError> {
        self.executor().execute_line(line)
    }

    /// Runs every line of a command file.
    pub fn run_file(&mut self, path: &Path) -> Result<String, CommandError> {
        self.executor().run_file(path)
    }

    /// Tests all breakpoints once.
    pub fn match_breakpoints(&mut self) -> String {
        self.executor().match_breakpoints()
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::Debugger;
    use crate::config::Config;
    use crate::machine::{CpuRegister, DspRegister, Machine, SimMachine};

    fn debugger() -> Debugger<SimMachine> {
        Debugger::new(SimMachine::new(0x10000), Config::default())
    }

    #[test]
    fn evaluate() {
        let mut debugger = debugger();
        assert_eq!(
            debugger.execute_line("e 1+2*3").unwrap(),
            "= %111 (bin), #7 (dec), $7 (hex)\n"
        );
        let error = debugger.execute_line("e (1+2").unwrap_err();
        assert!(error.report().starts_with("ERROR in the expression:\n'(1+2'\n"));
    }

    #[test]
    fn registers_and_memory() {
        let mut debugger = debugger();
        debugger.execute_line("r d0 = $10*2").unwrap();
        debugger.execute_line("dr r1 = $123456").unwrap();
        let machine = debugger.machine();
        assert_eq!(machine.cpu_register(CpuRegister::Data(0)), 0x20);
        let r1 = DspRegister::from_name("R1").unwrap();
        assert_eq!(machine.dsp_register(r1), 0x3456);
        assert!(debugger.execute_line("r q9 = 1").is_err());
        debugger.execute_line("w $100 $41 $42 3").unwrap();
        assert_eq!(debugger.machine().peek_cpu_byte(0x101), 0x42);
        assert!(debugger.execute_line("w $100 $100").is_err());
        let dump = debugger.execute_line("m $100-$103").unwrap();
        assert_eq!(dump, "00000100: 41 42 03 00  AB..\n");
        let dump = debugger.execute_line("m").unwrap();
        assert!(dump.starts_with("00000104: 00"));
        assert_eq!(dump.lines().count(), 4);
    }

    #[test]
    fn memdump_stops_at_end_of_address_space() {
        let mut debugger = debugger();
        let dump = debugger.execute_line("m $fffffff8").unwrap();
        assert_eq!(dump, "fffffff8: 00 00 00 00 00 00 00 00  ........\n");
        let dump = debugger.execute_line("m $fffffff0-$ffffffff").unwrap();
        assert_eq!(dump.lines().count(), 1);
        let dump = debugger.execute_line("m").unwrap();
        assert!(dump.starts_with("00000000: "));
    }

    #[test]
    fn breakpoints_through_commands() {
        let mut debugger = debugger();
        debugger.execute_line("r d0 = 4").unwrap();
        debugger.execute_line("b d0 = 4 :info history").unwrap();
        debugger.execute_line("b d0 = 5").unwrap();
        assert_eq!(
            debugger.match_breakpoints(),
            "CPU breakpoint 1\nNo breakpoint hit.\n"
        );
        debugger.execute_line("b d0 ! d0").unwrap();
        assert_eq!(
            debugger.execute_line("match").unwrap().lines().last(),
            Some("No breakpoint hit.")
        );
        debugger.execute_line("r d0 = 3").unwrap();
        assert_eq!(
            debugger.execute_line("match").unwrap().lines().last(),
            Some("CPU breakpoint hit.")
        );
        assert_eq!(debugger.session().history().count(), 3);
    }
}

//===========================================================================//
