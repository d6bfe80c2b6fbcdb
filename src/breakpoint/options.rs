use chumsky::{self, IterParser, Parser};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

//===========================================================================//

type PError<'a> = chumsky::extra::Err<chumsky::error::Rich<'a, char>>;

/// Separates the condition from the options, and the options from each
/// other (preceded by a space).
pub const OPTION_MARKER: char = ':';

//===========================================================================//

/// Extra debugger information that a breakpoint can show when hit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InfoKind {
    /// The CPU registers.
    Registers,
    /// The DSP registers.
    DspRegisters,
    /// The pseudo-variables and their values.
    Variables,
    /// The most recent debugger events.
    History,
}

impl InfoKind {
    const ALL: [InfoKind; 4] = [
        InfoKind::Registers,
        InfoKind::DspRegisters,
        InfoKind::Variables,
        InfoKind::History,
    ];

    /// Looks up an info by the name used in `:info <name>`.
    pub fn from_name(name: &str) -> Option<InfoKind> {
        InfoKind::ALL.into_iter().find(|info| info.name() == name)
    }

    /// Returns the name used in `:info <name>`.
    pub fn name(self) -> &'static str {
        match self {
            InfoKind::Registers => "regs",
            InfoKind::DspRegisters => "dspregs",
            InfoKind::Variables => "vars",
            InfoKind::History => "history",
        }
    }
}

impl fmt::Display for InfoKind {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

//===========================================================================//

/// An invalid breakpoint option.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum OptionsError {
    /// `:info` with a name no info is known by.
    #[error("no info for '{0}'")]
    UnknownInfo(String),
    /// `:file` with a path that doesn't exist.
    #[error("given file '{}' doesn't exist", .0.display())]
    MissingFile(PathBuf),
    /// A skip count below 2.
    #[error("invalid breakpoint skip count '{0}'")]
    InvalidSkip(String),
    /// Anything else.
    #[error("unrecognized breakpoint option '{0}'")]
    Unrecognized(String),
}

/// What a breakpoint does when its conditions match.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BreakOptions {
    /// Fire only on every `skip`th match (0 = on every match).
    pub skip: u32,
    /// Remove the breakpoint after it fires.
    pub once: bool,
    /// Don't log anything when the breakpoint is set, fires or is removed.
    pub quiet: bool,
    /// Only report the match, don't stop.
    pub trace: bool,
    /// Show the locked info when fired.
    pub lock: bool,
    /// Don't reinitialize the debugger session before running side effects.
    pub noinit: bool,
    /// Info to show when fired.
    pub info: Option<InfoKind>,
    /// Debugger command file to run when fired.
    pub file: Option<PathBuf>,
}

impl BreakOptions {
    /// Returns true if firing the breakpoint runs any debugger side effect.
    pub fn has_side_effects(&self) -> bool {
        self.info.is_some() || self.lock || self.file.is_some()
    }

    /// Returns the lines describing these options when a breakpoint is set.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if self.skip != 0 {
            notes.push(format!("-> Break only on every {} hit.", self.skip));
        }
        if self.once {
            notes.push(
                "-> Break only once, and delete breakpoint afterwards."
                    .to_string(),
            );
        }
        if self.trace {
            notes.push(
                "-> Trace (just show breakpoint info, instead of dropping to \
                 debugger)."
                    .to_string(),
            );
            if self.info.is_some() {
                notes.push("-> Call selected info command.".to_string());
            }
            if self.lock {
                notes.push("-> Call locked info command.".to_string());
            }
            if self.noinit {
                notes.push("-> Skip debugger initialization on hit.".to_string());
            }
        }
        if let Some(ref path) = self.file {
            notes.push(format!(
                "-> Execute debugger commands from '{}' file on hit.",
                path.display()
            ));
        }
        notes
    }
}

/// Writes the options the way they are listed: ` :once :trace ...`.
impl fmt::Display for BreakOptions {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        if self.skip != 0 {
            write!(formatter, " :{}", self.skip)?;
        }
        if self.once {
            formatter.write_str(" :once")?;
        }
        if self.quiet {
            formatter.write_str(" :quiet")?;
        }
        if self.trace {
            formatter.write_str(" :trace")?;
            if self.info.is_some() {
                formatter.write_str(" :info")?;
            }
            if self.lock {
                formatter.write_str(" :lock")?;
            }
            if self.noinit {
                formatter.write_str(" :noinit")?;
            }
        }
        if let Some(ref path) = self.file {
            write!(formatter, " :file {}", path.display())?;
        }
        Ok(())
    }
}

//===========================================================================//

#[derive(Clone, Debug, Eq, PartialEq)]
enum BreakOption {
    Once,
    Quiet,
    Trace,
    Lock,
    NoInit,
    Info(String),
    File(String),
    Skip(String),
}

impl BreakOption {
    fn parser<'a>() -> impl Parser<'a, &'a str, BreakOption, PError<'a>> {
        chumsky::prelude::choice((
            keyword("once", BreakOption::Once),
            keyword("quiet", BreakOption::Quiet),
            keyword("trace", BreakOption::Trace),
            keyword("lock", BreakOption::Lock),
            keyword("noinit", BreakOption::NoInit),
            chumsky::prelude::just("info ")
                .ignore_then(argument())
                .map(BreakOption::Info),
            chumsky::prelude::just("file ")
                .ignore_then(argument())
                .map(BreakOption::File),
            chumsky::text::digits(10)
                .to_slice()
                .then_ignore(chumsky::prelude::any().repeated())
                .map(|digits: &str| BreakOption::Skip(digits.to_string())),
        ))
    }
}

fn keyword<'a>(
    word: &'static str,
    option: BreakOption,
) -> impl Parser<'a, &'a str, BreakOption, PError<'a>> + Clone {
    chumsky::prelude::just(word)
        .then(chumsky::prelude::end())
        .to(option)
}

fn argument<'a>() -> impl Parser<'a, &'a str, String, PError<'a>> + Clone {
    chumsky::prelude::any()
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(|text| text.trim().to_string())
}

/// Splits `<condition> :<option> ...` at the first option marker,
/// returning the condition and the options text after the marker.
pub fn split_options(args: &str) -> (&str, Option<&str>) {
    match args.split_once(OPTION_MARKER) {
        Some((condition, options)) => (condition, Some(options)),
        None => (args, None),
    }
}

/// Parses the options text after the first option marker, e.g.
/// `"once :file cmds.txt"`.  A `:file` must name an existing file.
pub fn parse_options(text: &str) -> Result<BreakOptions, OptionsError> {
    let mut options = BreakOptions::default();
    let separator = format!(" {OPTION_MARKER}");
    for item in text.split(separator.as_str()) {
        let item = item.trim();
        let option = BreakOption::parser()
            .parse(item)
            .into_result()
            .map_err(|_| OptionsError::Unrecognized(item.to_string()))?;
        match option {
            BreakOption::Once => options.once = true,
            BreakOption::Quiet => options.quiet = true,
            BreakOption::Trace => options.trace = true,
            BreakOption::Lock => {
                options.trace = true;
                options.lock = true;
            }
            BreakOption::NoInit => {
                options.trace = true;
                options.noinit = true;
            }
            BreakOption::Info(name) => {
                options.trace = true;
                options.info = Some(
                    InfoKind::from_name(&name)
                        .ok_or(OptionsError::UnknownInfo(name))?,
                );
            }
            BreakOption::File(path) => {
                let path = Path::new(&path);
                if !path.exists() {
                    return Err(OptionsError::MissingFile(path.to_path_buf()));
                }
                options.file = Some(path.to_path_buf());
            }
            BreakOption::Skip(digits) => match digits.parse::<u32>() {
                Ok(skip) if skip >= 2 => options.skip = skip,
                _ => return Err(OptionsError::InvalidSkip(item.to_string())),
            },
        }
    }
    Ok(options)
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        BreakOptions, InfoKind, OptionsError, parse_options, split_options,
    };
    use std::path::PathBuf;

    #[test]
    fn split() {
        assert_eq!(split_options("pc = 1 :once"), ("pc = 1 ", Some("once")));
        assert_eq!(split_options("pc = 1"), ("pc = 1", None));
    }

    #[test]
    fn flags() {
        let options = parse_options("once :quiet").unwrap();
        assert!(options.once);
        assert!(options.quiet);
        assert!(!options.trace);
        let options = parse_options(" lock :noinit ").unwrap();
        assert!(options.trace);
        assert!(options.lock);
        assert!(options.noinit);
        let options = parse_options("info vars").unwrap();
        assert!(options.trace);
        assert_eq!(options.info, Some(InfoKind::Variables));
    }

    #[test]
    fn skip_count() {
        assert_eq!(parse_options("3").unwrap().skip, 3);
        assert_eq!(parse_options("10x").unwrap().skip, 10);
        assert_eq!(
            parse_options("1"),
            Err(OptionsError::InvalidSkip("1".to_string()))
        );
    }

    #[test]
    fn rejected() {
        assert_eq!(
            parse_options("oncee"),
            Err(OptionsError::Unrecognized("oncee".to_string()))
        );
        assert_eq!(
            parse_options("once :bogus"),
            Err(OptionsError::Unrecognized("bogus".to_string()))
        );
        assert_eq!(
            parse_options("info nothing"),
            Err(OptionsError::UnknownInfo("nothing".to_string()))
        );
        assert_eq!(
            parse_options("file /no/such/breakcond/file"),
            Err(OptionsError::MissingFile(PathBuf::from(
                "/no/such/breakcond/file"
            )))
        );
        assert!(parse_options("").is_err());
    }

    #[test]
    fn existing_file() {
        let path = std::env::temp_dir().join("breakcond-options-test.txt");
        std::fs::write(&path, "vars\n").unwrap();
        let options = parse_options(&format!("file {}", path.display()));
        assert_eq!(options.unwrap().file, Some(path.clone()));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn display_and_notes() {
        let options = BreakOptions {
            skip: 4,
            once: true,
            trace: true,
            lock: true,
            ..BreakOptions::default()
        };
        assert_eq!(options.to_string(), " :4 :once :trace :lock");
        assert_eq!(
            options.notes(),
            vec![
                "-> Break only on every 4 hit.".to_string(),
                "-> Break only once, and delete breakpoint afterwards."
                    .to_string(),
                "-> Trace (just show breakpoint info, instead of dropping to \
                 debugger)."
                    .to_string(),
                "-> Call locked info command.".to_string(),
            ]
        );
        assert!(options.has_side_effects());
        assert!(!BreakOptions::default().has_side_effects());
    }
}

//===========================================================================//
