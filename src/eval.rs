//! Evaluation of debugger arithmetic expressions such as
//! `pc + ($200*16/2 & 0xffff)`.
//!
//! Operands are numbers, registers, pseudo-variables or symbols.  Operators
//! are `| & ^` (lowest precedence), `>> <<`, `+ -` and `* /` (highest),
//! with `-` and `~` as prefixes.  A parenthesized subexpression is evaluated
//! and then replaced by the 32-bit big-endian long stored in CPU memory at
//! that address.

use crate::config::Config;
use crate::machine::{
    CpuRegister, DspRegister, Machine, Processor, Width, read_cpu_memory,
};
use crate::number::{NumberError, ParsedNumber, parse_number_prefix};
use crate::symbols::SymbolFilter;
use crate::vars;
use thiserror::Error;
use tracing::{debug, info};

//===========================================================================//

/// Maximum nesting depth of parentheses.
pub const MAX_PAREN_DEPTH: usize = 16;
/// Maximum number of pending operators.
pub const MAX_OPERATORS: usize = 64;
/// Maximum number of pending values.
pub const MAX_VALUES: usize = 64;

const MAX_NAME_LEN: usize = 64;

/// What went wrong while evaluating an expression.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum EvalError {
    /// The expression was empty.
    #[error("No expression given")]
    Empty,
    /// Misplaced operator, operand or parenthesis.
    #[error("Syntax error")]
    Syntax,
    /// Unclosed or unopened parenthesis.
    #[error("Mismatched parenthesis")]
    Parenthesis,
    /// Division by zero, or a negative shift.
    #[error("Undefined result (1/0)")]
    Undefined,
    /// Too many pending operators, values or parentheses.
    #[error("Operation/value stack full")]
    StackFull,
    /// The evaluator reached a state it should never be in.
    #[error("Internal program error")]
    Internal,
}

/// An evaluation error, with the byte offset in the expression where it was
/// detected.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("{error}")]
pub struct EvalFailure {
    /// The error.
    pub error: EvalError,
    /// Byte offset into the expression.
    pub offset: usize,
}

impl EvalFailure {
    /// Renders the error with a caret under the offending character of
    /// `text`, the expression that failed.
    pub fn report(&self, heading: &str, text: &str) -> String {
        format!(
            "ERROR in {heading}:\n'{text}'\n{:>width$}-{}\n",
            '^',
            self.error,
            width = self.offset + 2
        )
    }
}

//===========================================================================//

/// What a symbolic name in an expression is resolved against.
#[derive(Clone, Copy)]
pub struct EvalEnv<'a> {
    /// The machine whose registers, variables, symbols and memory are read.
    pub machine: &'a dyn Machine,
    /// Whose registers and symbols names refer to.
    pub processor: Processor,
    /// The radix of numbers written without a prefix.
    pub number_base: u32,
}

impl<'a> EvalEnv<'a> {
    /// Returns an environment for the given processor.
    pub fn new(
        machine: &'a dyn Machine,
        processor: Processor,
        config: &Config,
    ) -> EvalEnv<'a> {
        EvalEnv { machine, processor, number_base: config.number_base }
    }
}

/// Resolves the value at the start of `text`.  A leading name made of
/// letters, digits and underscores is looked up as a pseudo-variable, then
/// as a register and then as a symbol of the environment's processor;
/// otherwise `text` must start with a number.  The returned `base` is 0 when
/// the value came from a name.
pub fn resolve_value(
    env: &EvalEnv,
    text: &str,
) -> Result<ParsedNumber, NumberError> {
    let len = text
        .bytes()
        .take_while(|&byte| byte == b'_' || byte.is_ascii_alphanumeric())
        .count();
    if len >= MAX_NAME_LEN {
        return Err(NumberError::NameTooLong(text[..len].to_string()));
    }
    let name = &text[..len];
    if len > 0 {
        if let Some(value) = resolve_name(env, name) {
            return Ok(ParsedNumber { value, consumed: len, base: 0 });
        }
    }
    parse_number_prefix(text, env.number_base)
}

fn resolve_name(env: &EvalEnv, name: &str) -> Option<u32> {
    if let Some(id) = vars::lookup(name) {
        return Some(id.variable().read(env.machine));
    }
    let machine = env.machine;
    match env.processor {
        Processor::Dsp => {
            if let Some(reg) = DspRegister::from_name(name) {
                return Some(machine.dsp_register(reg) & reg.mask());
            }
        }
        Processor::Cpu => {
            if let Some(reg) = CpuRegister::from_name(name, machine.cpu_level())
            {
                return Some(machine.cpu_register(reg));
            }
        }
    }
    machine
        .symbols(env.processor)
        .and_then(|table| table.address_of(name, SymbolFilter::ALL))
}

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Operator {
    Or,
    And,
    Xor,
    ShiftRight,
    ShiftLeft,
    Add,
    Sub,
    Mul,
    Div,
    Negate,
    Complement,
}

impl Operator {
    fn from_byte(byte: u8) -> Option<Operator> {
        match byte {
            b'|' => Some(Operator::Or),
            b'&' => Some(Operator::And),
            b'^' => Some(Operator::Xor),
            b'+' => Some(Operator::Add),
            b'-' => Some(Operator::Sub),
            b'*' => Some(Operator::Mul),
            b'/' => Some(Operator::Div),
            _ => None,
        }
    }

    fn level(self) -> Result<u32, EvalError> {
        match self {
            Operator::Or | Operator::And | Operator::Xor => Ok(0),
            Operator::ShiftRight | Operator::ShiftLeft => Ok(1),
            Operator::Add | Operator::Sub => Ok(2),
            Operator::Mul | Operator::Div => Ok(3),
            Operator::Negate | Operator::Complement => Err(EvalError::Internal),
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> Result<i64, EvalError> {
        match self {
            Operator::Or => Ok(lhs | rhs),
            Operator::And => Ok(lhs & rhs),
            Operator::Xor => Ok(lhs ^ rhs),
            Operator::ShiftRight => {
                let amount = shift_amount(rhs)?;
                Ok(lhs.checked_shr(amount).unwrap_or(if lhs < 0 { -1 } else { 0 }))
            }
            Operator::ShiftLeft => {
                let amount = shift_amount(rhs)?;
                Ok(lhs.checked_shl(amount).unwrap_or(0))
            }
            Operator::Add => Ok(lhs.wrapping_add(rhs)),
            Operator::Sub => Ok(lhs.wrapping_sub(rhs)),
            Operator::Mul => Ok(lhs.wrapping_mul(rhs)),
            Operator::Div if rhs == 0 => Err(EvalError::Undefined),
            Operator::Div => Ok(lhs.wrapping_div(rhs)),
            Operator::Negate | Operator::Complement => Err(EvalError::Internal),
        }
    }
}

fn shift_amount(rhs: i64) -> Result<u32, EvalError> {
    if rhs < 0 {
        return Err(EvalError::Undefined);
    }
    Ok(u32::try_from(rhs).unwrap_or(u32::MAX))
}

/// Stack heights at the opening of a parenthesis.
#[derive(Clone, Copy)]
struct Mark {
    operators: usize,
    values: usize,
}

//===========================================================================//

struct Evaluator<'a> {
    env: &'a EvalEnv<'a>,
    operators: Vec<Operator>,
    values: Vec<i64>,
    // Invariant: never empty; the first mark is the outermost level.
    marks: Vec<Mark>,
    // True when `value` holds an operand that no operator has consumed yet.
    valid: bool,
    value: i64,
}

impl<'a> Evaluator<'a> {
    fn new(env: &'a EvalEnv<'a>) -> Evaluator<'a> {
        Evaluator {
            env,
            operators: Vec::with_capacity(MAX_OPERATORS),
            values: Vec::with_capacity(MAX_VALUES),
            marks: vec![Mark { operators: 0, values: 0 }],
            valid: false,
            value: 0,
        }
    }

    fn mark(&self) -> Mark {
        match self.marks.last() {
            Some(&mark) => mark,
            None => panic!("evaluator lost its outermost parenthesis mark"),
        }
    }

    fn evaluate(mut self, text: &str) -> Result<i64, EvalFailure> {
        let bytes = text.as_bytes();
        let mut offset = 0;
        while offset < bytes.len() {
            let at = offset;
            let fail = |error| EvalFailure { error, offset: at };
            match bytes[offset] {
                b' ' | b'\t' => offset += 1,
                b'~' => {
                    self.prefix(b'~').map_err(fail)?;
                    offset += 1;
                }
                mark @ (b'>' | b'<') => {
                    if bytes.get(offset + 1) != Some(&mark) {
                        return Err(fail(EvalError::Syntax));
                    }
                    let operator = if mark == b'>' {
                        Operator::ShiftRight
                    } else {
                        Operator::ShiftLeft
                    };
                    self.operation(operator, mark).map_err(fail)?;
                    offset += 2;
                }
                b'(' => {
                    self.open_paren().map_err(fail)?;
                    offset += 1;
                }
                b')' => {
                    self.close_paren().map_err(fail)?;
                    offset += 1;
                }
                byte => {
                    if let Some(operator) = Operator::from_byte(byte) {
                        self.operation(operator, byte).map_err(fail)?;
                        offset += 1;
                        continue;
                    }
                    if self.valid {
                        return Err(fail(EvalError::Syntax));
                    }
                    let number = resolve_value(self.env, &text[offset..])
                        .map_err(|error| {
                            debug!("invalid operand: {error}");
                            fail(EvalError::Syntax)
                        })?;
                    self.value = number.value as i64;
                    self.valid = true;
                    offset += number.consumed;
                }
            }
        }
        let fail = |error| EvalFailure { error, offset: bytes.len() };
        if !self.valid {
            if self.values.is_empty() && self.operators.is_empty() {
                return Err(fail(EvalError::Empty));
            }
            return Err(fail(EvalError::Syntax));
        }
        self.operation(Operator::Or, b'|').map_err(fail)?;
        if self.marks.len() > 1 {
            return Err(fail(EvalError::Parenthesis));
        }
        self.values.last().copied().ok_or(fail(EvalError::Internal))
    }

    /// Handles an operator character.  After an operand it is a binary
    /// operator; otherwise it can only be a prefix.
    fn operation(&mut self, operator: Operator, byte: u8) -> Result<(), EvalError> {
        if !self.valid {
            return self.prefix(byte);
        }
        self.push_operator(operator)?;
        self.push_value(self.value)?;
        let mark = self.mark();
        if self.operators.len() > mark.operators + 1 {
            if self.values.len() == mark.values + 1 {
                self.apply_prefix()?;
            } else {
                self.eval_stack()?;
            }
        }
        self.valid = false;
        Ok(())
    }

    /// Prefixes are only allowed before the first operand of a
    /// (parenthesized) level.
    fn prefix(&mut self, byte: u8) -> Result<(), EvalError> {
        if self.valid || self.operators.len() > self.mark().operators {
            return Err(EvalError::Syntax);
        }
        match byte {
            b'+' => Ok(()),
            b'-' => self.push_operator(Operator::Negate),
            b'~' => self.push_operator(Operator::Complement),
            _ => Err(EvalError::Syntax),
        }
    }

    /// Replaces `prefix, operator` on top of the operator stack with just
    /// `operator`, applying the prefix to the only value of the level.
    fn apply_prefix(&mut self) -> Result<(), EvalError> {
        let (Some(operator), Some(prefix), Some(value)) =
            (self.operators.pop(), self.operators.pop(), self.values.last_mut())
        else {
            return Err(EvalError::Internal);
        };
        *value = match prefix {
            Operator::Negate => value.wrapping_neg(),
            Operator::Complement => !*value,
            _ => return Err(EvalError::Internal),
        };
        self.operators.push(operator);
        Ok(())
    }

    /// Folds operators of the current level for as long as the one below
    /// the top binds at least as tightly as the top one.
    fn eval_stack(&mut self) -> Result<(), EvalError> {
        let mark = self.mark();
        while self.operators.len() > mark.operators + 1 {
            let top = self.operators.len() - 1;
            let (below, current) = (self.operators[top - 1], self.operators[top]);
            if below.level()? < current.level()? {
                break;
            }
            let (Some(rhs), Some(lhs)) = (self.values.pop(), self.values.pop())
            else {
                return Err(EvalError::Internal);
            };
            self.values.push(below.apply(lhs, rhs)?);
            self.operators.remove(top - 1);
        }
        Ok(())
    }

    fn open_paren(&mut self) -> Result<(), EvalError> {
        if self.valid {
            return Err(EvalError::Syntax);
        }
        if self.marks.len() > MAX_PAREN_DEPTH {
            return Err(EvalError::StackFull);
        }
        self.marks.push(Mark {
            operators: self.operators.len(),
            values: self.values.len(),
        });
        Ok(())
    }

    fn close_paren(&mut self) -> Result<(), EvalError> {
        if !self.valid {
            return Err(EvalError::Syntax);
        }
        if self.marks.len() < 2 {
            return Err(EvalError::Parenthesis);
        }
        self.operation(Operator::Or, b'|')?;
        let addr = self.values.last().copied().ok_or(EvalError::Internal)? as u32;
        let value = read_cpu_memory(self.env.machine, addr, Width::Long);
        info!("  value in RAM at (${addr:x}).l = ${value:x}");
        let mark = self.mark();
        self.operators.truncate(mark.operators);
        self.values.truncate(mark.values);
        self.marks.pop();
        self.value = value as i64;
        self.valid = true;
        Ok(())
    }

    fn push_operator(&mut self, operator: Operator) -> Result<(), EvalError> {
        if self.operators.len() >= MAX_OPERATORS {
            return Err(EvalError::StackFull);
        }
        self.operators.push(operator);
        Ok(())
    }

    fn push_value(&mut self, value: i64) -> Result<(), EvalError> {
        if self.values.len() >= MAX_VALUES {
            return Err(EvalError::StackFull);
        }
        self.values.push(value);
        Ok(())
    }
}

//===========================================================================//

/// Evaluates an arithmetic expression, returning its value truncated to 32
/// bits.
pub fn evaluate(text: &str, env: &EvalEnv) -> Result<u32, EvalFailure> {
    let value = Evaluator::new(env).evaluate(text)?;
    Ok(value as u32)
}

/// A single address, or an inclusive range of addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressRange {
    /// Just one address.
    Single(u32),
    /// From `lower` up to and including `upper`.
    Span {
        /// The first address.
        lower: u32,
        /// The last address.
        upper: u32,
    },
}

/// An error from [`evaluate_range`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RangeError {
    /// One end of the range is not a valid value.
    #[error("Invalid address value '{text}': {error}")]
    Value {
        /// The offending end of the range.
        text: String,
        /// Why it is invalid.
        error: NumberError,
    },
    /// The lower end is above the upper one.
    #[error("Invalid range (${lower:x} > ${upper:x})")]
    Inverted {
        /// The lower end.
        lower: u32,
        /// The upper end.
        upper: u32,
    },
}

/// Parses `<value>` or `<value>-<value>`, where each value is a single
/// register, variable, symbol or number.
pub fn evaluate_range(
    text: &str,
    env: &EvalEnv,
) -> Result<AddressRange, RangeError> {
    let single = |part: &str| {
        resolve_whole_value(env, part).map_err(|error| RangeError::Value {
            text: part.to_string(),
            error,
        })
    };
    match text.split_once('-') {
        None => Ok(AddressRange::Single(single(text)?)),
        Some((lower, upper)) => {
            let lower = single(lower)?;
            let upper = single(upper)?;
            if lower > upper {
                return Err(RangeError::Inverted { lower, upper });
            }
            Ok(AddressRange::Span { lower, upper })
        }
    }
}

fn resolve_whole_value(env: &EvalEnv, text: &str) -> Result<u32, NumberError> {
    let number = resolve_value(env, text)?;
    if number.consumed < text.len() {
        return Err(match number.base {
            0 => NumberError::InvalidName(text.to_string()),
            base => NumberError::ExtraCharacters {
                base: crate::number::base_name(base),
                text: text.to_string(),
            },
        });
    }
    Ok(number.value)
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        AddressRange, EvalEnv, EvalError, EvalFailure, RangeError, evaluate,
        evaluate_range,
    };
    use crate::config::Config;
    use crate::machine::{
        CpuRegister, DspRegister, MachineControl, Processor, SimMachine,
    };
    use crate::symbols::SymbolTable;

    fn machine() -> SimMachine {
        let mut machine = SimMachine::new(0x10000);
        machine.set_cpu_register(CpuRegister::Data(0), 10);
        machine.set_cpu_register(CpuRegister::Pc, 0x1000);
        machine.write_cpu_long(0x7, 3);
        machine.set_symbols(
            Processor::Cpu,
            SymbolTable::from_nm("00002000 D table\n"),
        );
        machine
    }

    fn eval(machine: &SimMachine, text: &str) -> Result<u32, EvalFailure> {
        let env = EvalEnv::new(machine, Processor::Cpu, &Config::default());
        evaluate(text, &env)
    }

    fn error(machine: &SimMachine, text: &str) -> (EvalError, usize) {
        let failure = eval(machine, text).unwrap_err();
        (failure.error, failure.offset)
    }

    #[test]
    fn precedence() {
        let machine = machine();
        assert_eq!(eval(&machine, "1+2*3"), Ok(7));
        assert_eq!(eval(&machine, "2*3+1"), Ok(7));
        assert_eq!(eval(&machine, "10-4-3"), Ok(3));
        assert_eq!(eval(&machine, "100/10/5"), Ok(2));
        assert_eq!(eval(&machine, "1+2|8"), Ok(11));
        assert_eq!(eval(&machine, "1<<4+1"), Ok(32));
        assert_eq!(eval(&machine, "$100>>4"), Ok(0x10));
        assert_eq!(eval(&machine, "~%101 & $f0f0f ^ 0x21 * 0x200"), Ok(0xf4d0a));
    }

    #[test]
    fn prefixes() {
        let machine = machine();
        assert_eq!(eval(&machine, "-1"), Ok(0xffff_ffff));
        assert_eq!(eval(&machine, "-2*3"), Ok((-6i32) as u32));
        assert_eq!(eval(&machine, "+5"), Ok(5));
        assert_eq!(eval(&machine, "~0"), Ok(0xffff_ffff));
        assert_eq!(eval(&machine, "-(7)"), Ok((-3i32) as u32));
    }

    #[test]
    fn parentheses_read_memory() {
        let machine = machine();
        assert_eq!(eval(&machine, "(2+5)*3"), Ok(9));
        assert_eq!(eval(&machine, "((7))"), Ok(0));
        assert_eq!(eval(&machine, " ( 7 ) + 1 "), Ok(4));
    }

    #[test]
    fn names() {
        let machine = machine();
        assert_eq!(eval(&machine, "d0 + 2"), Ok(12));
        assert_eq!(eval(&machine, "pc+table"), Ok(0x3000));
        assert_eq!(eval(&machine, "VBL+10"), Ok(10));
    }

    #[test]
    fn dsp_names() {
        let mut machine = machine();
        let r1 = DspRegister::from_name("r1").unwrap();
        machine.set_dsp_register(r1, 0x1234);
        let env = EvalEnv::new(&machine, Processor::Dsp, &Config::default());
        assert_eq!(evaluate("r1+1", &env), Ok(0x1235));
        assert!(evaluate("d0", &env).is_err());
    }

    #[test]
    fn default_base() {
        let machine = machine();
        let config = Config::default().with_number_base(16).unwrap();
        let env = EvalEnv::new(&machine, Processor::Cpu, &config);
        assert_eq!(evaluate("10+#10", &env), Ok(26));
    }

    #[test]
    fn errors() {
        let machine = machine();
        assert_eq!(error(&machine, ""), (EvalError::Empty, 0));
        assert_eq!(error(&machine, "  "), (EvalError::Empty, 2));
        assert_eq!(error(&machine, "1+2*"), (EvalError::Syntax, 4));
        assert_eq!(error(&machine, "*1+2"), (EvalError::Syntax, 0));
        assert_eq!(error(&machine, "1+(2"), (EvalError::Parenthesis, 4));
        assert_eq!(error(&machine, "1)+2"), (EvalError::Parenthesis, 1));
        assert_eq!(error(&machine, "foo+1+bar"), (EvalError::Syntax, 0));
        assert_eq!(error(&machine, "1 2"), (EvalError::Syntax, 2));
        assert_eq!(error(&machine, "1>2"), (EvalError::Syntax, 1));
        assert_eq!(error(&machine, "5/0"), (EvalError::Undefined, 3));
        assert_eq!(error(&machine, "1<<0-1"), (EvalError::Undefined, 6));
        assert_eq!(error(&machine, "1+-2"), (EvalError::Syntax, 2));
        assert_eq!(error(&machine, "()"), (EvalError::Syntax, 1));
        assert_eq!(error(&machine, "2(3)"), (EvalError::Syntax, 1));
    }

    #[test]
    fn paren_depth_limit() {
        let machine = machine();
        let deep = format!("{}7{}", "(".repeat(16), ")".repeat(16));
        assert_eq!(eval(&machine, &deep), Ok(0));
        let too_deep = format!("{}7{}", "(".repeat(17), ")".repeat(17));
        assert_eq!(error(&machine, &too_deep), (EvalError::StackFull, 16));
    }

    #[test]
    fn operator_stack_limit() {
        let machine = machine();
        // Each level leaves four pending operators of rising precedence.
        let level = "1|1<<1+1*(";
        let nested = format!("{}1{}", level.repeat(15), ")".repeat(15));
        assert!(eval(&machine, &nested).is_ok());
        let overflow = format!("{}1|1", level.repeat(16));
        let offset = level.len() * 16 + 1;
        assert_eq!(error(&machine, &overflow), (EvalError::StackFull, offset));
    }

    #[test]
    fn caret_report() {
        let failure = EvalFailure { error: EvalError::Syntax, offset: 2 };
        assert_eq!(
            failure.report("the expression", "1+*"),
            "ERROR in the expression:\n'1+*'\n   ^-Syntax error\n"
        );
    }

    #[test]
    fn ranges() {
        let machine = machine();
        let env = EvalEnv::new(&machine, Processor::Cpu, &Config::default());
        assert_eq!(evaluate_range("$100", &env), Ok(AddressRange::Single(0x100)));
        assert_eq!(
            evaluate_range("d0-$20", &env),
            Ok(AddressRange::Span { lower: 10, upper: 0x20 })
        );
        assert_eq!(
            evaluate_range("$20-d0", &env),
            Err(RangeError::Inverted { lower: 0x20, upper: 10 })
        );
        assert!(evaluate_range("d0+1", &env).is_err());
        assert!(evaluate_range("12x", &env).is_err());
    }
}

//===========================================================================//
