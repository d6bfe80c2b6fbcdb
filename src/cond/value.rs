use crate::machine::{DspSpace, Machine, Register, Width, read_memory};
use crate::vars::VariableId;
use std::fmt;
use tracing::info;

//===========================================================================//

/// How the two sides of a condition are compared.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Comparison {
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `=`
    Equal,
    /// `!`
    NotEqual,
}

impl Comparison {
    /// Returns the comparison written as `ch`, if any.
    pub fn from_char(ch: char) -> Option<Comparison> {
        match ch {
            '<' => Some(Comparison::Less),
            '>' => Some(Comparison::Greater),
            '=' => Some(Comparison::Equal),
            '!' => Some(Comparison::NotEqual),
            _ => None,
        }
    }

    /// Returns the character this comparison is written as.
    pub fn symbol(self) -> char {
        match self {
            Comparison::Less => '<',
            Comparison::Greater => '>',
            Comparison::Equal => '=',
            Comparison::NotEqual => '!',
        }
    }

    /// Applies the comparison (unsigned).
    pub fn holds(self, lhs: u32, rhs: u32) -> bool {
        match self {
            Comparison::Less => lhs < rhs,
            Comparison::Greater => lhs > rhs,
            Comparison::Equal => lhs == rhs,
            Comparison::NotEqual => lhs != rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.symbol())
    }
}

//===========================================================================//

/// Where one side of a condition gets its raw value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueSource {
    /// A number (or a symbol's address).
    Literal(u32),
    /// A CPU or DSP register.
    Register(Register),
    /// A debugger pseudo-variable.
    Variable(VariableId),
}

impl ValueSource {
    /// Reads the raw value, before any indirection or masking.
    pub fn read(self, machine: &dyn Machine) -> u32 {
        match self {
            ValueSource::Literal(number) => number,
            ValueSource::Register(reg) => reg.read(machine),
            ValueSource::Variable(id) => id.variable().read(machine),
        }
    }
}

/// One side of a breakpoint condition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Value {
    /// The raw value, or the address when `indirect` is set.
    pub source: ValueSource,
    /// Whether the raw value is an address to read memory from.
    pub indirect: bool,
    /// The DSP memory space; `None` for CPU values.
    pub space: Option<DspSpace>,
    /// Width of the value in bits: 8, 16 or 32 for CPU memory, 24 for DSP.
    pub bits: u32,
    /// Mask applied to the value before comparing.
    pub mask: u32,
}

impl Value {
    /// Reads the current, masked value.
    pub fn read(&self, machine: &dyn Machine) -> u32 {
        let raw = self.source.read(machine);
        let value = if self.indirect {
            let width = match (self.space, Width::from_bits(self.bits)) {
                (Some(_), _) => Width::Long,
                (None, Some(width)) => width,
                (None, None) => panic!(
                    "unknown width of {} bits for CPU memory access",
                    self.bits
                ),
            };
            read_memory(machine, raw, self.space, width)
        } else {
            raw
        };
        value & self.mask
    }

    /// Returns the number of a plain (non-indirect) literal.
    pub fn plain_number(&self) -> Option<u32> {
        match (self.source, self.indirect) {
            (ValueSource::Literal(number), false) => Some(number),
            _ => None,
        }
    }

    /// Returns the address of an indirect read from a literal address.
    pub fn literal_address(&self) -> Option<u32> {
        match (self.source, self.indirect) {
            (ValueSource::Literal(address), true) => Some(address),
            _ => None,
        }
    }
}

//===========================================================================//

/// A single `<value> <comparison> <value>` test.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Condition {
    /// Left side.
    pub lvalue: Value,
    /// How the sides are compared.
    pub comparison: Comparison,
    /// Right side.
    pub rvalue: Value,
    /// When set, a match copies the left side's value into the right side,
    /// so the next match needs another change.
    pub track: bool,
}

impl Condition {
    /// Tests the condition against the machine, updating the tracked value
    /// when it holds.
    pub fn evaluate(&mut self, machine: &dyn Machine) -> bool {
        let lhs = self.lvalue.read(machine);
        let rhs = self.rvalue.read(machine);
        if !self.comparison.holds(lhs, rhs) {
            return false;
        }
        if self.track {
            self.rvalue.source = ValueSource::Literal(lhs);
            match self.lvalue.literal_address() {
                Some(addr) => info!("  ${addr:x} = ${lhs:x}"),
                None => info!("  ${lhs:x}"),
            }
        }
        true
    }
}

//===========================================================================//


//===========================================================================//
