//! Conditional breakpoints for the CPU and the DSP.

mod options;

pub use options::{
    BreakOptions, InfoKind, OPTION_MARKER, OptionsError, parse_options,
    split_options,
};

use crate::config::Config;
use crate::cond::{Condition, ConditionError, check_tracking, parse_condition};
use crate::eval::{EvalEnv, EvalFailure, evaluate};
use crate::machine::{Machine, Processor};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

//===========================================================================//

/// How many breakpoints a list has room for before it first grows.
pub const INITIAL_CAPACITY: usize = 16;

/// The condition syntax, as shown by `b help`.
pub const CONDITION_HELP: &str = "\
  condition = <value>[.mode] [& <mask>] <comparison> <value>[.mode]

  where:
  \tvalue = [(] <register/symbol/variable name | number> [)]
  \tnumber/mask = [#|$|%]<digits>
  \tcomparison = '<' | '>' | '=' | '!'
  \taddressing mode (width) = 'b' | 'w' | 'l'
  \taddressing mode (space) = 'p' | 'x' | 'y'

  If the value is in parenthesis like in '($ff820)' or '(a0)', then
  the used value will be read from the memory address pointed by it.

  If the parsed value expressions on both sides of it are exactly
  the same, right side is replaced with its current value.  For
  inequality ('!') comparison, the breakpoint will additionally track
  all further changes for the given address/register expression value.
  (This is useful for tracking register and memory value changes.)

  M68k addresses can have byte (b), word (w) or long (l, default) width.
  DSP addresses belong to different address spaces: P, X or Y. Note that
  on DSP only R0-R7 registers can be used for memory addressing.

  Examples:
  \tpc = $64543  &&  ($ff820).w & 3 = (a0)  &&  d0 = %1100
  \t($ffff9202).w ! ($ffff9202).w :trace
  \t(r0).x = 1 && (r0).y = 2

  For breakpoint options, see 'help b'.
";

/// Usage of the breakpoint commands.
pub const BREAKPOINT_USAGE: &str = "\
<condition> [&& <condition> ...] [:<option>] | <index> | help | all

\tSet breakpoint with given <conditions>, remove breakpoint with
\tgiven <index>, remove all breakpoints with 'all' or output
\tbreakpoint condition syntax with 'help'.  Without arguments,
\tlists currently active breakpoints.

\tMultiple breakpoint action options can be specified after
\tthe breakpoint condition(s):
\t- 'trace', print the breakpoint match without stopping
\t- 'info <name>', call indicated info functionality (enables 'trace')
\t- 'lock', print the locked debugger entry info (enables 'trace')
\t- 'noinit', no debugger inits on hit, useful for stack tracing
\t- 'file <file>', execute debugger commands from given <file>
\t- 'once', delete the breakpoint after it's hit
\t- 'quiet', no output from setting & hitting breakpoint
\t- '<count>', break only on every <count> hit
";

/// Usage of the address breakpoint commands.
pub const ADDRESS_USAGE: &str = "\
<address> [:<option>]
\tCreate conditional breakpoint for given PC <address>.

\tBreakpoint action option alternatives:
\t- 'trace', print the breakpoint match without stopping
\t- 'lock', print the debugger entry info without stopping
\t- 'once', delete the breakpoint after it's hit
\t- 'quiet', no output from setting & hitting breakpoint
\t- '<count>', break only on every <count> hit

\tUse conditional breakpoint commands to manage the created
\tbreakpoints.
";

//===========================================================================//

/// An error from a breakpoint operation.
#[derive(Debug, Error)]
pub enum BreakpointError {
    /// Removal from an empty list.
    #[error("No (more) {0} breakpoints to remove.")]
    NoBreakpoints(Processor),
    /// Removal of an index that isn't in the list.
    #[error("No such {0} breakpoint.")]
    NoSuchBreakpoint(Processor),
    /// The condition doesn't parse.
    #[error(transparent)]
    Condition(#[from] ConditionError),
    /// An option is invalid.
    #[error(transparent)]
    Options(#[from] OptionsError),
    /// An address breakpoint's expression doesn't evaluate.
    #[error("{failure}")]
    Expression {
        /// The expression.
        text: String,
        /// Why it failed.
        failure: EvalFailure,
    },
    /// A DSP breakpoint command while the DSP is disabled.
    #[error("DSP not enabled!")]
    DspDisabled,
}

impl BreakpointError {
    /// Renders the error the way the debugger shows it, with a caret
    /// diagram for located errors.
    pub fn report(&self) -> String {
        match self {
            BreakpointError::Condition(error) => error.report(),
            BreakpointError::Expression { text, failure } => {
                failure.report("the address expression", text)
            }
            BreakpointError::NoBreakpoints(_) => format!("{self}\n"),
            _ => format!("ERROR: {self}\n"),
        }
    }
}

//===========================================================================//

/// A breakpoint: conditions that must all hold, and what to do when they
/// do.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Breakpoint {
    /// The normalized condition text.
    pub expression: String,
    /// What to do on a match.
    pub options: BreakOptions,
    /// The conditions, tested in order.
    pub conditions: Vec<Condition>,
    /// How many times all conditions have held.
    pub hits: u32,
    /// Set when removed during a scan; the breakpoint is dropped when the
    /// scan ends.
    pub deleted: bool,
}

impl Breakpoint {
    fn matches(&mut self, machine: &dyn Machine) -> bool {
        self.conditions.iter_mut().all(|condition| condition.evaluate(machine))
    }
}

/// Writes the breakpoint's listing line (without a newline).
impl fmt::Display for Breakpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "\t{}{}", self.expression, self.options)?;
        if self.deleted {
            formatter.write_str(" (deleted)")?;
        }
        Ok(())
    }
}

//===========================================================================//

/// The breakpoints of one processor.
#[derive(Debug)]
pub struct BreakpointList {
    processor: Processor,
    breakpoints: Vec<Breakpoint>,
    scanning: bool,
}

impl BreakpointList {
    /// Returns an empty list for the given processor.
    pub fn new(processor: Processor) -> BreakpointList {
        BreakpointList { processor, breakpoints: Vec::new(), scanning: false }
    }

    /// Returns the processor whose breakpoints these are.
    pub fn processor(&self) -> Processor {
        self.processor
    }

    /// Returns the number of breakpoints, including ones marked deleted
    /// during the current scan.
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Returns true if there are no breakpoints.
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Returns the breakpoints.
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.iter()
    }

    /// Returns the breakpoint at a 1-based index.
    pub fn get(&self, index: usize) -> Option<&Breakpoint> {
        index.checked_sub(1).and_then(|index| self.breakpoints.get(index))
    }

    /// Returns true while the list is being matched.
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Returns how many breakpoints the list has room for.
    pub fn capacity(&self) -> usize {
        self.breakpoints.capacity()
    }

    fn reserve_slot(&mut self) {
        let capacity = self.breakpoints.capacity();
        if self.breakpoints.len() + 1 >= capacity {
            let wanted = if capacity == 0 {
                INITIAL_CAPACITY
            } else {
                capacity * 2
            };
            self.breakpoints.reserve_exact(wanted - self.breakpoints.len());
        }
    }

    /// Parses `expression` and appends it as a new breakpoint.  Conditions
    /// comparing a value with itself pick up the value's current contents.
    /// On error the list is left unchanged.  Returns the breakpoint's 1-based
    /// index.
    pub fn add(
        &mut self,
        expression: &str,
        options: BreakOptions,
        machine: &dyn Machine,
        config: &Config,
    ) -> Result<usize, ConditionError> {
        let env = EvalEnv::new(machine, self.processor, config);
        let parsed = parse_condition(expression, &env)?;
        let mut conditions = parsed.conditions;
        self.reserve_slot();
        let index = self.breakpoints.len() + 1;
        if !options.quiet {
            info!(
                "{} condition breakpoint {} with {} condition(s) added:\n\t{}",
                self.processor,
                index,
                conditions.len(),
                parsed.normalized
            );
            for note in options.notes() {
                info!("{note}");
            }
        }
        check_tracking(&mut conditions, machine);
        self.breakpoints.push(Breakpoint {
            expression: parsed.normalized,
            options,
            conditions,
            hits: 0,
            deleted: false,
        });
        Ok(index)
    }

    /// Removes the breakpoint at a 1-based index.  During a scan the
    /// breakpoint is only marked deleted, and dropped when the scan ends.
    pub fn remove(&mut self, index: usize) -> Result<(), BreakpointError> {
        if self.breakpoints.is_empty() {
            return Err(BreakpointError::NoBreakpoints(self.processor));
        }
        if index < 1 || index > self.breakpoints.len() {
            return Err(BreakpointError::NoSuchBreakpoint(self.processor));
        }
        if self.scanning {
            self.breakpoints[index - 1].deleted = true;
            return Ok(());
        }
        let breakpoint = self.breakpoints.remove(index - 1);
        if !breakpoint.options.quiet {
            info!("Removed {} breakpoint {}:\n{}", self.processor, index, breakpoint);
        }
        Ok(())
    }

    /// Removes every breakpoint.
    pub fn remove_all(&mut self) {
        for index in (1..=self.breakpoints.len()).rev() {
            let _ = self.remove(index);
        }
        info!("{} breakpoints: {}", self.processor, self.breakpoints.len());
    }

    fn apply_deletions(&mut self) {
        for index in (1..=self.breakpoints.len()).rev() {
            if self.breakpoints[index - 1].deleted {
                self.breakpoints[index - 1].deleted = false;
                let _ = self.remove(index);
            }
        }
    }

    /// Returns the listing of this processor's breakpoints.
    pub fn list(&self) -> String {
        if self.breakpoints.is_empty() {
            return format!("No conditional {} breakpoints.\n", self.processor);
        }
        let mut listing = format!(
            "{} conditional {} breakpoints:\n",
            self.breakpoints.len(),
            self.processor
        );
        for (index, breakpoint) in self.breakpoints.iter().enumerate() {
            listing.push_str(&format!("{:4}:{}\n", index + 1, breakpoint));
        }
        listing
    }

    /// Returns true if the breakpoint at a 1-based index has the given
    /// normalized expression.
    pub fn has_expression(&self, index: usize, expression: &str) -> bool {
        self.get(index)
            .is_some_and(|breakpoint| breakpoint.expression == expression)
    }
}

//===========================================================================//

/// What the debugger does when a breakpoint fires.  Every method does
/// nothing by default.
pub trait HitHooks<M: Machine + ?Sized> {
    /// Records that a breakpoint fired.
    fn mark_history(&mut self, processor: Processor, index: usize) {
        let _ = (processor, index);
    }

    /// Resets the debugger session state before side effects run.
    fn init_session(&mut self, machine: &mut M) {
        let _ = machine;
    }

    /// Shows the given info.
    fn show_info(&mut self, info: InfoKind, machine: &M) {
        let _ = (info, machine);
    }

    /// Shows the locked info.
    fn show_locked_info(&mut self, machine: &M) {
        let _ = machine;
    }

    /// Runs a debugger command file.  The commands may add and remove
    /// breakpoints, including ones of the list being matched.
    fn run_command_file(
        &mut self,
        path: &Path,
        reinit: bool,
        breakpoints: &mut Breakpoints,
        machine: &mut M,
    ) {
        let _ = (path, reinit, breakpoints, machine);
    }
}

/// Hooks that do nothing.
pub struct NoHooks;

impl<M: Machine + ?Sized> HitHooks<M> for NoHooks {}

//===========================================================================//

/// The CPU and DSP breakpoint lists.
#[derive(Debug)]
pub struct Breakpoints {
    cpu: BreakpointList,
    dsp: BreakpointList,
}

impl Default for Breakpoints {
    fn default() -> Breakpoints {
        Breakpoints::new()
    }
}

impl Breakpoints {
    /// Returns empty lists.
    pub fn new() -> Breakpoints {
        Breakpoints {
            cpu: BreakpointList::new(Processor::Cpu),
            dsp: BreakpointList::new(Processor::Dsp),
        }
    }

    /// Returns the list of the given processor.
    pub fn list(&self, processor: Processor) -> &BreakpointList {
        match processor {
            Processor::Cpu => &self.cpu,
            Processor::Dsp => &self.dsp,
        }
    }

    /// Returns the list of the given processor, mutably.
    pub fn list_mut(&mut self, processor: Processor) -> &mut BreakpointList {
        match processor {
            Processor::Cpu => &mut self.cpu,
            Processor::Dsp => &mut self.dsp,
        }
    }

    /// Returns the number of breakpoints for the given processor.
    pub fn count(&self, processor: Processor) -> usize {
        self.list(processor).len()
    }

    /// Tests the CPU breakpoints.  Returns true if a breakpoint without the
    /// `trace` option fired.
    pub fn match_cpu<M, H>(&mut self, machine: &mut M, hooks: &mut H) -> bool
    where
        M: Machine,
        H: HitHooks<M> + ?Sized,
    {
        self.match_breakpoints(Processor::Cpu, machine, hooks)
    }

    /// Tests the DSP breakpoints.  Returns true if a breakpoint without the
    /// `trace` option fired.
    pub fn match_dsp<M, H>(&mut self, machine: &mut M, hooks: &mut H) -> bool
    where
        M: Machine,
        H: HitHooks<M> + ?Sized,
    {
        self.match_breakpoints(Processor::Dsp, machine, hooks)
    }

    fn match_breakpoints<M, H>(
        &mut self,
        processor: Processor,
        machine: &mut M,
        hooks: &mut H,
    ) -> bool
    where
        M: Machine,
        H: HitHooks<M> + ?Sized,
    {
        if self.list(processor).scanning {
            warn!("{processor} breakpoints are already being matched");
            return false;
        }
        let list = self.list_mut(processor);
        list.scanning = true;
        // Breakpoints added by side effects take part from the next scan.
        let count = list.breakpoints.len();
        let mut hit = false;
        for index in 0..count {
            let list = self.list_mut(processor);
            let breakpoint = &mut list.breakpoints[index];
            if breakpoint.deleted || !breakpoint.matches(&*machine) {
                continue;
            }
            breakpoint.hits += 1;
            let hits = breakpoint.hits;
            let options = breakpoint.options.clone();
            if options.skip != 0 && hits % options.skip != 0 {
                continue;
            }
            if !options.quiet {
                info!(
                    "{}. {} breakpoint condition(s) matched {} times.\n{}",
                    index + 1,
                    processor,
                    hits,
                    breakpoint
                );
            }
            hooks.mark_history(processor, index + 1);
            if options.has_side_effects() {
                let reinit = !options.noinit;
                if reinit {
                    hooks.init_session(machine);
                }
                if let Some(info) = options.info {
                    hooks.show_info(info, machine);
                }
                if options.lock {
                    hooks.show_locked_info(machine);
                }
                if let Some(ref path) = options.file {
                    hooks.run_command_file(path, reinit, self, machine);
                }
            }
            if options.once {
                let _ = self.list_mut(processor).remove(index + 1);
            }
            if !options.trace {
                hit = true;
            }
        }
        let list = self.list_mut(processor);
        list.scanning = false;
        list.apply_deletions();
        hit
    }

    /// Runs a breakpoint command: list without arguments, `help`, `all`,
    /// an index to remove, or a condition with options to add.
    pub fn command(
        &mut self,
        args: Option<&str>,
        processor: Processor,
        machine: &dyn Machine,
        config: &Config,
    ) -> Result<String, BreakpointError> {
        let Some(args) = args else {
            return Ok(self.list(processor).list());
        };
        let args = args.trim();
        if args.starts_with("help") {
            return Ok(CONDITION_HELP.to_string());
        }
        if args == "all" {
            self.list_mut(processor).remove_all();
            return Ok(String::new());
        }
        if processor == Processor::Dsp && !config.dsp_enabled {
            return Err(BreakpointError::DspDisabled);
        }
        let (expression, tail) = split_options(args);
        let options = match tail {
            Some(tail) => parse_options(tail)?,
            None => BreakOptions::default(),
        };
        let expression = expression.trim();
        if !expression.is_empty()
            && expression.bytes().all(|byte| byte.is_ascii_digit())
        {
            let index = expression.parse::<usize>().unwrap_or(usize::MAX);
            self.list_mut(processor).remove(index)?;
        } else {
            self.list_mut(processor).add(expression, options, machine, config)?;
        }
        Ok(String::new())
    }

    /// Adds a breakpoint on the program counter reaching the address that
    /// `args` (`<expression> [:<option>]`) evaluates to.  Only the first
    /// five characters of the option are kept.
    pub fn address_command(
        &mut self,
        args: &str,
        processor: Processor,
        machine: &dyn Machine,
        config: &Config,
    ) -> Result<u32, BreakpointError> {
        let (expression, option) = match args.split_once(OPTION_MARKER) {
            Some((expression, option)) => {
                let option: String = option.trim().chars().take(5).collect();
                (expression, Some(option))
            }
            None => (args, None),
        };
        let env = EvalEnv::new(machine, processor, config);
        let addr = evaluate(expression, &env).map_err(|failure| {
            BreakpointError::Expression {
                text: expression.to_string(),
                failure,
            }
        })?;
        let command = match option {
            Some(option) => format!("pc=${addr:x} :{option}"),
            None => format!("pc=${addr:x}"),
        };
        self.command(Some(&command), processor, machine, config)?;
        Ok(addr)
    }

    /// Returns the breakpoints as debugger commands that recreate them.
    pub fn dump(&self) -> String {
        let mut text = String::new();
        for breakpoint in self.cpu.iter() {
            text.push_str(&format!("b {}\n", breakpoint.expression));
        }
        for breakpoint in self.dsp.iter() {
            text.push_str(&format!("db {}\n", breakpoint.expression));
        }
        text
    }

    /// Writes the breakpoints to a debugger command file.  With no
    /// breakpoints at all, an existing file is removed instead.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if self.cpu.is_empty() && self.dsp.is_empty() {
            if path.exists() {
                fs::remove_file(path)?;
            }
            return Ok(());
        }
        info!("Saving breakpoints to '{}'...", path.display());
        fs::write(path, self.dump())
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        BreakOptions, BreakpointError, Breakpoints, HitHooks, INITIAL_CAPACITY,
        InfoKind, NoHooks,
    };
    use crate::config::Config;
    use crate::machine::{CpuRegister, MachineControl, Processor, SimMachine};
    use std::path::Path;

    fn machine() -> SimMachine {
        let mut machine = SimMachine::new(0x10000);
        machine.set_cpu_register(CpuRegister::Data(0), 4);
        machine
    }

    fn add(breakpoints: &mut Breakpoints, machine: &SimMachine, text: &str) {
        breakpoints
            .command(Some(text), Processor::Cpu, machine, &Config::default())
            .unwrap();
    }

    #[test]
    fn add_list_remove() {
        let machine = machine();
        let config = Config::default();
        let mut breakpoints = Breakpoints::new();
        assert_eq!(
            breakpoints.command(None, Processor::Cpu, &machine, &config).unwrap(),
            "No conditional CPU breakpoints.\n"
        );
        add(&mut breakpoints, &machine, "d0=4 :once :3");
        add(&mut breakpoints, &machine, "pc > $100");
        assert_eq!(
            breakpoints.list(Processor::Cpu).list(),
            "2 conditional CPU breakpoints:\n   1:\td0 = 4 :3 :once\n   \
             2:\tpc > $100\n"
        );
        add(&mut breakpoints, &machine, "1");
        assert_eq!(breakpoints.count(Processor::Cpu), 1);
        assert!(breakpoints.list(Processor::Cpu).has_expression(1, "pc > $100"));
        let error = breakpoints
            .command(Some("5"), Processor::Cpu, &machine, &config)
            .unwrap_err();
        assert!(matches!(error, BreakpointError::NoSuchBreakpoint(Processor::Cpu)));
        add(&mut breakpoints, &machine, "all");
        assert_eq!(breakpoints.count(Processor::Cpu), 0);
        let error = breakpoints
            .command(Some("1"), Processor::Cpu, &machine, &config)
            .unwrap_err();
        assert_eq!(error.report(), "No (more) CPU breakpoints to remove.\n");
    }

    #[test]
    fn failed_add_leaves_list_unchanged() {
        let machine = machine();
        let config = Config::default();
        let mut breakpoints = Breakpoints::new();
        add(&mut breakpoints, &machine, "d0 = 4");
        for text in ["", "d0 = ", "pc = foo", "d0 = 1 :bogus", "(d0 = 1"] {
            assert!(
                breakpoints
                    .command(Some(text), Processor::Cpu, &machine, &config)
                    .is_err(),
                "{text:?} should fail"
            );
        }
        assert_eq!(breakpoints.count(Processor::Cpu), 1);
    }

    #[test]
    fn dsp_disabled() {
        let machine = machine();
        let config = Config { dsp_enabled: false, ..Config::default() };
        let mut breakpoints = Breakpoints::new();
        let error = breakpoints
            .command(Some("pc = 0"), Processor::Dsp, &machine, &config)
            .unwrap_err();
        assert!(matches!(error, BreakpointError::DspDisabled));
        assert_eq!(error.report(), "ERROR: DSP not enabled!\n");
    }

    #[test]
    fn capacity_doubles() {
        let machine = machine();
        let mut breakpoints = Breakpoints::new();
        add(&mut breakpoints, &machine, "d0 = 1");
        assert!(breakpoints.list(Processor::Cpu).capacity() >= INITIAL_CAPACITY);
        for _ in 0..INITIAL_CAPACITY {
            add(&mut breakpoints, &machine, "d0 = 2 :quiet");
        }
        let list = breakpoints.list(Processor::Cpu);
        assert!(list.capacity() >= 2 * INITIAL_CAPACITY);
        assert!(list.capacity() > list.len());
    }

    #[test]
    fn skip_and_once() {
        let mut machine = machine();
        let mut breakpoints = Breakpoints::new();
        add(&mut breakpoints, &machine, "d0 = 4 :2");
        assert!(!breakpoints.match_cpu(&mut machine, &mut NoHooks));
        assert!(breakpoints.match_cpu(&mut machine, &mut NoHooks));
        assert_eq!(breakpoints.list(Processor::Cpu).get(1).unwrap().hits, 2);
        add(&mut breakpoints, &machine, "d0 = 4 :once :trace");
        assert!(!breakpoints.match_cpu(&mut machine, &mut NoHooks));
        assert_eq!(breakpoints.count(Processor::Cpu), 1);
    }

    struct Recorder {
        history: Vec<(Processor, usize)>,
        infos: Vec<InfoKind>,
        inits: usize,
        locks: usize,
    }

    impl HitHooks<SimMachine> for Recorder {
        fn mark_history(&mut self, processor: Processor, index: usize) {
            self.history.push((processor, index));
        }

        fn init_session(&mut self, _machine: &mut SimMachine) {
            self.inits += 1;
        }

        fn show_info(&mut self, info: InfoKind, _machine: &SimMachine) {
            self.infos.push(info);
        }

        fn show_locked_info(&mut self, _machine: &SimMachine) {
            self.locks += 1;
        }

        fn run_command_file(
            &mut self,
            _path: &Path,
            _reinit: bool,
            breakpoints: &mut Breakpoints,
            machine: &mut SimMachine,
        ) {
            let list = breakpoints.list_mut(Processor::Cpu);
            list.add("d0 = 4", BreakOptions::default(), &*machine, &Config::default())
                .unwrap();
            list.remove(1).unwrap();
        }
    }

    #[test]
    fn side_effects() {
        let mut machine = machine();
        let mut breakpoints = Breakpoints::new();
        add(&mut breakpoints, &machine, "d0 = 4 :info regs");
        add(&mut breakpoints, &machine, "d0 = 5");
        add(&mut breakpoints, &machine, "d0 > 1 :lock :noinit");
        let mut recorder =
            Recorder { history: Vec::new(), infos: Vec::new(), inits: 0, locks: 0 };
        assert!(!breakpoints.match_cpu(&mut machine, &mut recorder));
        assert_eq!(
            recorder.history,
            vec![(Processor::Cpu, 1), (Processor::Cpu, 3)]
        );
        assert_eq!(recorder.infos, vec![InfoKind::Registers]);
        assert_eq!(recorder.inits, 1);
        assert_eq!(recorder.locks, 1);
    }

    #[test]
    fn reentrant_changes_are_deferred() {
        let mut machine = machine();
        let mut breakpoints = Breakpoints::new();
        let path = std::env::temp_dir().join("breakcond-reentrant-test.txt");
        std::fs::write(&path, "").unwrap();
        add(
            &mut breakpoints,
            &machine,
            &format!("d0 = 4 :file {}", path.display()),
        );
        add(&mut breakpoints, &machine, "d0 = 4");
        let mut recorder =
            Recorder { history: Vec::new(), infos: Vec::new(), inits: 0, locks: 0 };
        assert!(breakpoints.match_cpu(&mut machine, &mut recorder));
        // Both original breakpoints were tested; the new one wasn't.
        assert_eq!(
            recorder.history,
            vec![(Processor::Cpu, 1), (Processor::Cpu, 2)]
        );
        let list = breakpoints.list(Processor::Cpu);
        assert!(!list.is_scanning());
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).unwrap().hits, 1);
        assert_eq!(list.get(2).unwrap().hits, 0);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn address_breakpoints() {
        let machine = machine();
        let config = Config::default();
        let mut breakpoints = Breakpoints::new();
        let addr = breakpoints
            .address_command("$100+d0 :tracefoo", Processor::Cpu, &machine, &config)
            .unwrap();
        assert_eq!(addr, 0x104);
        assert_eq!(
            breakpoints.list(Processor::Cpu).list(),
            "1 conditional CPU breakpoints:\n   1:\tpc = $104 :trace\n"
        );
        let error = breakpoints
            .address_command("1+", Processor::Cpu, &machine, &config)
            .unwrap_err();
        assert!(error.report().starts_with("ERROR in the address expression:\n'1+'\n"));
    }

    #[test]
    fn dump_and_save() {
        let machine = machine();
        let mut breakpoints = Breakpoints::new();
        add(&mut breakpoints, &machine, "d0=1");
        breakpoints
            .command(Some("(r0).x=1"), Processor::Dsp, &machine, &Config::default())
            .unwrap();
        assert_eq!(breakpoints.dump(), "b d0 = 1\ndb ( r0 ) . x = 1\n");
        let path = std::env::temp_dir().join("breakcond-save-test.txt");
        breakpoints.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), breakpoints.dump());
        Breakpoints::new().save(&path).unwrap();
        assert!(!path.exists());
    }
}

//===========================================================================//
