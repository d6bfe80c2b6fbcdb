use breakcond::config::Config;
use breakcond::debugger::Debugger;
use breakcond::machine::{Processor, SimMachine};
use breakcond::number::parse_number;
use breakcond::symbols::SymbolTable;
use clap::Parser;
use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

//===========================================================================//

#[derive(Parser)]
#[clap(author, about, long_about = None, version)]
struct Cli {
    /// Radix of numbers written without a prefix (2, 8, 10 or 16).
    #[clap(long, default_value_t = 10)]
    base: u32,
    /// Disables the DSP, and with it DSP breakpoints.
    #[clap(long)]
    no_dsp: bool,
    /// Size of the simulated RAM, in KiB.
    #[clap(long, value_name = "KIB", default_value_t = 4096)]
    ram: usize,
    /// Loads a file into RAM, at address 0 unless `@ADDR` is given.
    #[clap(long, value_name = "FILE[@ADDR]")]
    load: Vec<String>,
    /// CPU symbols, in `nm` format.
    #[clap(long, value_name = "FILE")]
    symbols: Option<PathBuf>,
    /// DSP symbols, in `nm` format.
    #[clap(long, value_name = "FILE")]
    dsp_symbols: Option<PathBuf>,
    /// Logs more (repeat for even more).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// The debugger script to run, or none to read commands from stdin.
    script: Option<PathBuf>,
}

//===========================================================================//

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(filter)
        .init();

    let config = Config { dsp_enabled: !cli.no_dsp, ..Config::default() }
        .with_number_base(cli.base)
        .map_err(invalid_input)?;
    let mut machine = SimMachine::new(cli.ram.saturating_mul(1024));
    for load in &cli.load {
        let (path, addr) = match load.rsplit_once('@') {
            Some((path, addr)) => (
                path,
                parse_number(addr, config.number_base).map_err(invalid_input)?,
            ),
            None => (load.as_str(), 0),
        };
        let data = fs::read(path)?;
        machine.load(addr, &data).map_err(invalid_input)?;
    }
    if let Some(ref path) = cli.symbols {
        let table = SymbolTable::from_nm(&fs::read_to_string(path)?);
        machine.set_symbols(Processor::Cpu, table);
    }
    if let Some(ref path) = cli.dsp_symbols {
        let table = SymbolTable::from_nm(&fs::read_to_string(path)?);
        machine.set_symbols(Processor::Dsp, table);
    }

    let mut debugger = Debugger::new(machine, config);
    match cli.script {
        Some(path) => match debugger.run_file(&path) {
            Ok(output) => print!("{output}"),
            Err(error) => eprint!("{}", error.report()),
        },
        None => {
            for line in io::stdin().lock().lines() {
                match debugger.execute_line(&line?) {
                    Ok(output) => print!("{output}"),
                    Err(error) => eprint!("{}", error.report()),
                }
            }
        }
    }
    Ok(())
}

fn invalid_input<E: std::error::Error + Send + Sync + 'static>(
    error: E,
) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, error)
}

//===========================================================================//
