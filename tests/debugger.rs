use breakcond::config::Config;
use breakcond::debugger::Debugger;
use breakcond::machine::{CpuRegister, Machine, Processor, SimMachine};
use std::path::PathBuf;

//===========================================================================//

fn debugger() -> Debugger<SimMachine> {
    Debugger::new(SimMachine::new(0x80000), Config::default())
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

//===========================================================================//

#[test]
fn script_sets_up_and_matches() {
    let script = temp_file(
        "breakcond-script.txt",
        "# set up the machine\n\
         r pc = $58000\n\
         r a0 = pc\n\
         w $200 100\n\
         \n\
         b pc = a0 :trace\n\
         b ($200).b > 200\n\
         bogus command\n\
         e a0 >> 12\n\
         match\n",
    );
    let mut debugger = debugger();
    let output = debugger.run_file(&script).unwrap();
    assert_eq!(
        output,
        "= %1011000 (bin), #88 (dec), $58 (hex)\nNo breakpoint hit.\n"
    );
    assert_eq!(debugger.machine().cpu_register(CpuRegister::Address(0)), 0x58000);
    assert_eq!(debugger.breakpoints().count(Processor::Cpu), 2);
    assert_eq!(
        debugger.session().history().collect::<Vec<_>>(),
        vec![&(Processor::Cpu, 1)]
    );
    std::fs::remove_file(&script).unwrap();
}

#[test]
fn breakpoint_file_runs_commands() {
    let commands = temp_file(
        "breakcond-hit-commands.txt",
        "r d1 = d1+1\nb d1 = 3 :quiet\n",
    );
    let mut debugger = debugger();
    debugger
        .execute_line(&format!("b d0 = 0 :trace :file {}", commands.display()))
        .unwrap();
    assert_eq!(debugger.match_breakpoints(), "No breakpoint hit.\n");
    assert_eq!(debugger.machine().cpu_register(CpuRegister::Data(1)), 1);
    assert_eq!(debugger.match_breakpoints(), "No breakpoint hit.\n");
    // The third run of the file makes d1 = 3 before the breakpoint added by
    // the first run gets its turn.
    assert_eq!(debugger.match_breakpoints(), "CPU breakpoint hit.\n");
    assert_eq!(debugger.breakpoints().count(Processor::Cpu), 4);
    assert_eq!(debugger.match_breakpoints(), "No breakpoint hit.\n");
    assert_eq!(debugger.breakpoints().count(Processor::Cpu), 5);
    std::fs::remove_file(&commands).unwrap();
}

#[test]
fn nested_files_are_limited() {
    let path = std::env::temp_dir().join("breakcond-recursive.txt");
    std::fs::write(&path, format!("f {}\ne 1\n", path.display())).unwrap();
    let mut debugger = debugger();
    let output = debugger.run_file(&path).unwrap();
    let expected = "= %1 (bin), #1 (dec), $1 (hex)\n".repeat(8);
    assert_eq!(output, expected);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn save_and_restore() {
    let saved = std::env::temp_dir().join("breakcond-saved.txt");
    let mut original = debugger();
    original.execute_line("b d0 = 1 && d1 = 2").unwrap();
    original.execute_line("a $400").unwrap();
    original.execute_line("db (r0).x = 1").unwrap();
    original.execute_line(&format!("save {}", saved.display())).unwrap();
    assert_eq!(
        std::fs::read_to_string(&saved).unwrap(),
        "b d0 = 1 && d1 = 2\nb pc = $400\ndb ( r0 ) . x = 1\n"
    );
    let mut restored = debugger();
    restored.run_file(&saved).unwrap();
    assert_eq!(restored.breakpoints().dump(), original.breakpoints().dump());
    original.execute_line("b all").unwrap();
    original.execute_line("db all").unwrap();
    original.execute_line(&format!("save {}", saved.display())).unwrap();
    assert!(!saved.exists());
}

#[test]
fn dsp_can_be_disabled() {
    let config = Config { dsp_enabled: false, ..Config::default() };
    let mut debugger = Debugger::new(SimMachine::new(0x1000), config);
    let error = debugger.execute_line("db pc = 0").unwrap_err();
    assert_eq!(error.report(), "ERROR: DSP not enabled!\n");
    assert_eq!(debugger.execute_line("db").unwrap(), "No conditional DSP breakpoints.\n");
}

//===========================================================================//
