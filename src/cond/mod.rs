//! Breakpoint conditions: `<value>[.mode] [& <mask>] <cmp> <value>[.mode]
//! [& <mask>] [&& <condition>]...`.
//!
//! A value is a number, a pseudo-variable, a register or a symbol.  Wrapping
//! it in parentheses reads memory at that address instead; `.b`, `.w` and
//! `.l` pick the CPU access width and `.p`, `.x` and `.y` the DSP memory
//! space.  A condition comparing a value with itself tracks that value: it
//! matches when the value changes, and then remembers the new value.

mod error;
mod lex;
mod parse;
mod value;

pub use error::{ConditionError, ConditionErrorKind, ErrorStage};
pub use lex::{Token, TokenizedCondition, tokenize};
pub use parse::{ConditionParser, DEFAULT_DSP_SPACE, ParseFailure};
pub use value::{Comparison, Condition, Value, ValueSource};

use crate::eval::EvalEnv;
use crate::machine::Machine;
use tracing::info;

//===========================================================================//

/// A successfully parsed breakpoint condition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedCondition {
    /// The condition text with its tokens separated by single spaces.
    pub normalized: String,
    /// The conditions, all of which must hold for a match.
    pub conditions: Vec<Condition>,
}

/// Tokenizes and parses a breakpoint condition for the environment's
/// processor.
pub fn parse_condition(
    text: &str,
    env: &EvalEnv,
) -> Result<ParsedCondition, ConditionError> {
    let tokenized = tokenize(text)?;
    match ConditionParser::new(env, &tokenized.tokens).parse() {
        Ok(conditions) => Ok(ParsedCondition {
            normalized: tokenized.normalized,
            conditions,
        }),
        Err(failure) => Err(ConditionError {
            kind: failure.kind,
            offset: tokenized.offset_of(failure.index),
            text: tokenized.normalized,
            stage: ErrorStage::Parse,
        }),
    }
}

/// Finds conditions that compare a value with itself and replaces their
/// right side with the value's current contents.  Such conditions with a
/// comparison other than `=` are set to track changes.  Returns true if any
/// condition tracks.
pub fn check_tracking(
    conditions: &mut [Condition],
    machine: &dyn Machine,
) -> bool {
    let mut track = false;
    for (index, condition) in conditions.iter_mut().enumerate() {
        if condition.lvalue != condition.rvalue {
            continue;
        }
        let current = condition.rvalue.read(machine);
        condition.rvalue.source = ValueSource::Literal(current);
        condition.rvalue.indirect = false;
        if condition.comparison == Comparison::Equal {
            info!(
                "\t{}. condition: {} ${current:x}",
                index + 1,
                condition.comparison
            );
        } else {
            condition.track = true;
            track = true;
        }
    }
    if track {
        info!("-> Track value changes, show value(s) when matched.");
    }
    track
}

//===========================================================================//


//===========================================================================//
