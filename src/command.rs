//! The debugger command line.

use crate::breakpoint::BreakpointError;
use crate::eval::{EvalFailure, RangeError};
use crate::machine::Processor;
use chumsky::{self, Parser};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

//===========================================================================//

type PError<'a> = chumsky::extra::Err<chumsky::error::Rich<'a, char>>;

/// The commands and what they do, as shown by `help`.
pub const COMMAND_HELP: &str = "\
Commands:
  b [<condition> [:<option>...] | <index> | all | help]
                      set, remove or list CPU condition breakpoints
  db [...]            same for DSP breakpoints
  a <address> [:<option>]
                      set a CPU breakpoint on the PC reaching <address>
  da <address> [:<option>]
                      same for the DSP
  e <expression>      evaluate an expression for the CPU
  de <expression>     evaluate an expression for the DSP
  r [<reg>=<expr>]    show or set CPU registers
  dr [<reg>=<expr>]   show or set DSP registers
  w <address> <byte>...
                      write bytes to CPU memory
  m [<address>[-<address>]]
                      dump CPU memory
  match               test all breakpoints once
  save <file>         save breakpoints as a command file
  vars                list builtin variables and their values
  f <file>            run debugger commands from a file
  help                show this help
";

//===========================================================================//

/// A parsed debugger command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// `b` / `db`: manage condition breakpoints.
    Breakpoint {
        /// Whose breakpoints.
        processor: Processor,
        /// Everything after the command name, if anything.
        args: Option<String>,
    },
    /// `a` / `da`: add a program counter breakpoint.
    Address {
        /// Whose program counter.
        processor: Processor,
        /// Everything after the command name, if anything.
        args: Option<String>,
    },
    /// `e` / `de`: evaluate an expression.
    Evaluate {
        /// Whose registers and symbols the expression uses.
        processor: Processor,
        /// The expression.
        expression: String,
    },
    /// `r` / `dr`: show the registers, or set one.
    Registers {
        /// Whose registers.
        processor: Processor,
        /// The register name and the expression to set it to.
        assignment: Option<(String, String)>,
    },
    /// `w`: write bytes to CPU memory.
    Write {
        /// The address expression.
        address: String,
        /// The byte expressions.
        bytes: Vec<String>,
    },
    /// `m`: dump CPU memory.
    Memory {
        /// The address or address range, or none to continue the last dump.
        range: Option<String>,
    },
    /// `match`: test the breakpoints once.
    Match,
    /// `save`: write the breakpoints to a command file.
    Save(PathBuf),
    /// `vars`: list the pseudo-variables.
    Variables,
    /// `f`: run a command file.
    File(PathBuf),
    /// `help`: list the commands.
    Help,
}

//===========================================================================//

/// An error from parsing or running a debugger command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command name is not known.
    #[error("unknown command '{0}'")]
    Unknown(String),
    /// The command needs arguments it wasn't given.
    #[error("command '{0}' needs an argument")]
    MissingArgument(String),
    /// A register assignment isn't `<reg>=<expr>`.
    #[error("invalid register assignment '{0}'")]
    Assignment(String),
    /// A register name that the processor doesn't have.
    #[error("unknown {processor} register '{name}'")]
    UnknownRegister {
        /// Whose register it should have been.
        processor: Processor,
        /// The name.
        name: String,
    },
    /// A byte to write is larger than 255.
    #[error("value ${0:x} doesn't fit into a byte")]
    ByteValue(u32),
    /// An expression doesn't evaluate.
    #[error("{failure}")]
    Expression {
        /// The expression.
        text: String,
        /// Why it failed.
        failure: EvalFailure,
    },
    /// An address range is invalid.
    #[error(transparent)]
    Range(#[from] RangeError),
    /// A breakpoint operation failed.
    #[error(transparent)]
    Breakpoint(#[from] BreakpointError),
    /// Command files nest too deeply.
    #[error("command files nested more than {0} deep")]
    FileDepth(usize),
    /// A file can't be read or written.
    #[error("{}: {error}", .path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// What went wrong.
        error: io::Error,
    },
}

impl CommandError {
    /// Renders the error the way the debugger shows it.
    pub fn report(&self) -> String {
        match self {
            CommandError::Breakpoint(error) => error.report(),
            CommandError::Expression { text, failure } => {
                failure.report("the expression", text)
            }
            _ => format!("ERROR: {self}\n"),
        }
    }
}

//===========================================================================//

fn line_parser<'a>()
-> impl Parser<'a, &'a str, Option<(&'a str, &'a str)>, PError<'a>> {
    let word = chumsky::prelude::any()
        .filter(|ch: &char| !ch.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice();
    let rest = chumsky::prelude::any()
        .repeated()
        .to_slice()
        .map(|text: &'a str| text.trim());
    let comment = chumsky::prelude::just('#')
        .then(chumsky::prelude::any().repeated())
        .to(None::<(&'a str, &'a str)>);
    let blank = chumsky::prelude::end().to(None::<(&'a str, &'a str)>);
    chumsky::text::whitespace().ignore_then(chumsky::prelude::choice((
        comment,
        blank,
        word.then(rest).map(Some),
    )))
}

fn assignment_parser<'a>()
-> impl Parser<'a, &'a str, (&'a str, &'a str), PError<'a>> {
    chumsky::text::ident()
        .padded()
        .then_ignore(chumsky::prelude::just('='))
        .then(
            chumsky::prelude::any()
                .repeated()
                .at_least(1)
                .to_slice()
                .map(|text: &'a str| text.trim()),
        )
}

/// Parses one line of debugger input.  Blank lines and lines starting with
/// `#` hold no command.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let Ok(parsed) = line_parser().parse(line).into_result() else {
        return Err(CommandError::Unknown(line.trim().to_string()));
    };
    let Some((name, rest)) = parsed else {
        return Ok(None);
    };
    let args = if rest.is_empty() { None } else { Some(rest.to_string()) };
    let required = |args: Option<String>| {
        args.ok_or_else(|| CommandError::MissingArgument(name.to_string()))
    };
    let command = match name {
        "b" | "breakpoint" => {
            Command::Breakpoint { processor: Processor::Cpu, args }
        }
        "db" | "dspbreak" => {
            Command::Breakpoint { processor: Processor::Dsp, args }
        }
        "a" | "address" => Command::Address { processor: Processor::Cpu, args },
        "da" | "dspaddress" => {
            Command::Address { processor: Processor::Dsp, args }
        }
        "e" | "evaluate" => Command::Evaluate {
            processor: Processor::Cpu,
            expression: required(args)?,
        },
        "de" => Command::Evaluate {
            processor: Processor::Dsp,
            expression: required(args)?,
        },
        "r" | "cpureg" => Command::Registers {
            processor: Processor::Cpu,
            assignment: parse_assignment(args)?,
        },
        "dr" | "dspreg" => Command::Registers {
            processor: Processor::Dsp,
            assignment: parse_assignment(args)?,
        },
        "w" | "memwrite" => {
            let args = required(args)?;
            let mut words = args.split_whitespace().map(str::to_string);
            let address = words.next().unwrap_or_default();
            let bytes: Vec<String> = words.collect();
            if bytes.is_empty() {
                return Err(CommandError::MissingArgument(name.to_string()));
            }
            Command::Write { address, bytes }
        }
        "m" | "memdump" => Command::Memory { range: args },
        "match" => Command::Match,
        "save" => Command::Save(PathBuf::from(required(args)?)),
        "vars" => Command::Variables,
        "f" | "file" => Command::File(PathBuf::from(required(args)?)),
        "h" | "help" | "?" => Command::Help,
        _ => return Err(CommandError::Unknown(name.to_string())),
    };
    Ok(Some(command))
}

fn parse_assignment(
    args: Option<String>,
) -> Result<Option<(String, String)>, CommandError> {
    let Some(args) = args else {
        return Ok(None);
    };
    let parsed = assignment_parser()
        .parse(args.as_str())
        .into_result()
        .ok()
        .map(|(name, expression)| (name.to_string(), expression.to_string()));
    match parsed {
        Some(assignment) => Ok(Some(assignment)),
        None => Err(CommandError::Assignment(args)),
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{Command, CommandError, parse_command};
    use crate::machine::Processor;
    use std::path::PathBuf;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn nothing() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("  # b pc = 0").unwrap(), None);
    }

    #[test]
    fn breakpoints() {
        assert_eq!(
            parse("b"),
            Command::Breakpoint { processor: Processor::Cpu, args: None }
        );
        assert_eq!(
            parse("  db (r0).x = 1 :once "),
            Command::Breakpoint {
                processor: Processor::Dsp,
                args: Some("(r0).x = 1 :once".to_string()),
            }
        );
        assert_eq!(
            parse("a main+4"),
            Command::Address {
                processor: Processor::Cpu,
                args: Some("main+4".to_string()),
            }
        );
    }

    #[test]
    fn registers() {
        assert_eq!(
            parse("r"),
            Command::Registers { processor: Processor::Cpu, assignment: None }
        );
        assert_eq!(
            parse("dr r0 = $20+1"),
            Command::Registers {
                processor: Processor::Dsp,
                assignment: Some(("r0".to_string(), "$20+1".to_string())),
            }
        );
        assert!(matches!(
            parse_command("r d0"),
            Err(CommandError::Assignment(_))
        ));
    }

    #[test]
    fn other_commands() {
        assert_eq!(
            parse("w $100 1 $ff"),
            Command::Write {
                address: "$100".to_string(),
                bytes: vec!["1".to_string(), "$ff".to_string()],
            }
        );
        assert_eq!(parse("m"), Command::Memory { range: None });
        assert_eq!(parse("save bps.ini"), Command::Save(PathBuf::from("bps.ini")));
        assert_eq!(parse("f cmds.txt"), Command::File(PathBuf::from("cmds.txt")));
        assert_eq!(parse("match"), Command::Match);
        assert_eq!(parse("vars"), Command::Variables);
        assert_eq!(parse("help"), Command::Help);
        assert_eq!(
            parse("e 1+2*3"),
            Command::Evaluate {
                processor: Processor::Cpu,
                expression: "1+2*3".to_string(),
            }
        );
    }

    #[test]
    fn errors() {
        assert!(matches!(
            parse_command("frobnicate"),
            Err(CommandError::Unknown(name)) if name == "frobnicate"
        ));
        assert!(matches!(
            parse_command("e"),
            Err(CommandError::MissingArgument(name)) if name == "e"
        ));
        assert!(matches!(
            parse_command("w $100"),
            Err(CommandError::MissingArgument(_))
        ));
    }
}

//===========================================================================//
