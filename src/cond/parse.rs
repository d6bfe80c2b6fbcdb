use super::error::ConditionErrorKind;
use super::lex::Token;
use super::value::{Comparison, Condition, Value, ValueSource};
use crate::eval::EvalEnv;
use crate::machine::{
    CpuRegister, DspRegister, DspSpace, Processor, Register, Width,
};
use crate::number::parse_number;
use crate::symbols::SymbolFilter;
use crate::vars;
use tracing::{debug, warn};

//===========================================================================//

/// The DSP memory space a DSP condition value starts out in.
pub const DEFAULT_DSP_SPACE: DspSpace = DspSpace::P;

/// A parse error located at a token index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseFailure {
    /// What went wrong.
    pub kind: ConditionErrorKind,
    /// Index of the token the parser was looking at.
    pub index: usize,
}

/// A condition value as written, before its width and mask have been
/// settled against the other side.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ValueSpec {
    source: ValueSource,
    indirect: bool,
    space: Option<DspSpace>,
    bits: Option<u32>,
    mask: Option<u32>,
}

impl ValueSpec {
    fn is_plain_number(&self) -> bool {
        !self.indirect && matches!(self.source, ValueSource::Literal(_))
    }
}

fn bitmask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

//===========================================================================//

/// Parses the tokens of a breakpoint condition into a list of conditions.
pub struct ConditionParser<'a> {
    env: &'a EvalEnv<'a>,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ConditionParser<'a> {
    /// Returns a parser for the given tokens.  Names are resolved against
    /// the environment's machine and processor.
    pub fn new(env: &'a EvalEnv<'a>, tokens: &'a [Token]) -> Self {
        ConditionParser { env, tokens, pos: 0 }
    }

    /// Parses `condition (&& condition)*` up to the end of the tokens.
    pub fn parse(mut self) -> Result<Vec<Condition>, ParseFailure> {
        let mut conditions = Vec::new();
        loop {
            conditions.push(self.parse_condition()?);
            if self.pos == self.tokens.len() {
                debug!("parsed {} condition(s)", conditions.len());
                return Ok(conditions);
            }
            if self.tokens[self.pos] != Token::And {
                return Err(self.fail(ConditionErrorKind::TrailingContent));
            }
            self.pos += 1;
        }
    }

    fn fail(&self, kind: ConditionErrorKind) -> ParseFailure {
        ParseFailure { kind, index: self.pos }
    }

    fn is_dsp(&self) -> bool {
        self.env.processor == Processor::Dsp
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseFailure> {
        let lhs = self.parse_value()?;
        let comparison = self.parse_comparison()?;
        let rhs = self.parse_value()?;
        let (lvalue, rvalue) = self.cross_check(lhs, rhs)?;
        Ok(Condition { lvalue, comparison, rvalue, track: false })
    }

    fn parse_value(&mut self) -> Result<ValueSpec, ParseFailure> {
        if self.pos >= self.tokens.len() {
            return Err(self.fail(ConditionErrorKind::ValueMissing));
        }
        let mut spec = ValueSpec {
            source: ValueSource::Literal(0),
            indirect: false,
            space: if self.is_dsp() { Some(DEFAULT_DSP_SPACE) } else { None },
            bits: None,
            mask: None,
        };
        let mut skip = 1;
        if self.pos + 3 <= self.tokens.len()
            && self.tokens[self.pos] == Token::ParenOpen
            && self.tokens[self.pos + 2] == Token::ParenClose
        {
            spec.indirect = true;
            self.pos += 1;
            skip = 2;
        }
        match &self.tokens[self.pos] {
            Token::Word(word)
                if word.starts_with(|ch: char| {
                    ch.is_ascii_alphabetic() || ch == '_'
                }) =>
            {
                let found = if spec.indirect {
                    self.parse_register(word, &mut spec)
                        || self.parse_symbol(word, &mut spec)
                } else {
                    self.parse_variable(word, &mut spec)
                        || self.parse_register(word, &mut spec)
                        || self.parse_symbol(word, &mut spec)
                };
                if !found {
                    return Err(self.fail(if spec.indirect {
                        ConditionErrorKind::InvalidIndirectName
                    } else {
                        ConditionErrorKind::InvalidName
                    }));
                }
            }
            Token::Word(word) => match parse_number(word, self.env.number_base)
            {
                Ok(number) => spec.source = ValueSource::Literal(number),
                Err(error) => {
                    debug!("{error}");
                    return Err(self.fail(ConditionErrorKind::InvalidNumber));
                }
            },
            _ => return Err(self.fail(ConditionErrorKind::InvalidNumber)),
        }
        if let (true, ValueSource::Literal(addr)) = (spec.indirect, spec.source)
        {
            if !self.is_valid_address(addr) {
                return Err(self.fail(ConditionErrorKind::InvalidAddress));
            }
        }
        self.pos += skip;
        self.parse_address_modifier(&mut spec)?;
        self.parse_mask_modifier(&mut spec)?;
        debug!("parsed value {spec:?}");
        Ok(spec)
    }

    fn parse_variable(&self, name: &str, spec: &mut ValueSpec) -> bool {
        match vars::lookup(name) {
            Some(id) => {
                spec.source = ValueSource::Variable(id);
                spec.bits = id.variable().bits;
                true
            }
            None => false,
        }
    }

    fn parse_register(&self, name: &str, spec: &mut ValueSpec) -> bool {
        match self.env.processor {
            Processor::Dsp => {
                let Some(reg) = DspRegister::from_name(name) else {
                    return false;
                };
                if spec.indirect && !reg.is_address() {
                    warn!(
                        "only R0-R7 DSP registers can be used for indirect \
                         addressing"
                    );
                    return false;
                }
                spec.source = ValueSource::Register(Register::Dsp(reg));
                spec.bits = Some(24);
                if !spec.indirect {
                    spec.mask = Some(reg.mask());
                }
                true
            }
            Processor::Cpu => {
                let level = self.env.machine.cpu_level();
                let Some(reg) = CpuRegister::from_name(name, level) else {
                    return false;
                };
                spec.source = ValueSource::Register(Register::Cpu(reg));
                spec.bits = Some(reg.bits());
                true
            }
        }
    }

    fn parse_symbol(&self, name: &str, spec: &mut ValueSpec) -> bool {
        let filter = if spec.indirect {
            SymbolFilter::DATA
        } else {
            SymbolFilter::ALL
        };
        let processor = self.env.processor;
        let Some(addr) = self
            .env
            .machine
            .symbols(processor)
            .and_then(|table| table.address_of(name, filter))
        else {
            return false;
        };
        spec.source = ValueSource::Literal(addr);
        spec.bits = Some(match processor {
            Processor::Dsp => 24,
            Processor::Cpu if addr & 1 != 0 => 8,
            Processor::Cpu => 32,
        });
        true
    }

    fn is_valid_address(&self, addr: u32) -> bool {
        match self.env.processor {
            Processor::Dsp => addr <= 0xffff,
            Processor::Cpu => self.env.machine.is_cpu_area_valid(addr, 1),
        }
    }

    fn parse_address_modifier(
        &mut self,
        spec: &mut ValueSpec,
    ) -> Result<(), ParseFailure> {
        if self.pos + 2 > self.tokens.len() || self.tokens[self.pos] != Token::Dot
        {
            if spec.space.is_some() && spec.indirect {
                return Err(self.fail(ConditionErrorKind::SpaceRequired));
            }
            return Ok(());
        }
        if !spec.indirect {
            return Err(self.fail(ConditionErrorKind::ModifierNeedsAddress));
        }
        self.pos += 1;
        let invalid = if spec.space.is_some() {
            ConditionErrorKind::InvalidSpace
        } else {
            ConditionErrorKind::InvalidWidth
        };
        let Token::Word(word) = &self.tokens[self.pos] else {
            return Err(self.fail(invalid));
        };
        let mut chars = word.chars();
        let letter = chars.next().unwrap_or(' ');
        if spec.space.is_some() {
            // Only lower case letters are accepted for spaces.
            match DspSpace::from_modifier(letter) {
                Some(space) if letter.is_ascii_lowercase() => {
                    spec.space = Some(space)
                }
                _ => return Err(self.fail(invalid)),
            }
        } else {
            match Width::from_modifier(letter) {
                Some(width) => spec.bits = Some(width.bits()),
                None => return Err(self.fail(invalid)),
            }
        }
        if chars.next().is_some() {
            return Err(self.fail(ConditionErrorKind::InvalidModifier));
        }
        self.pos += 1;
        Ok(())
    }

    fn parse_mask_modifier(
        &mut self,
        spec: &mut ValueSpec,
    ) -> Result<(), ParseFailure> {
        if self.pos + 2 > self.tokens.len() || self.tokens[self.pos] != Token::Mask
        {
            return Ok(());
        }
        if spec.is_plain_number() {
            warn!("plain numbers shouldn't need masks");
        }
        self.pos += 1;
        let mask = match &self.tokens[self.pos] {
            Token::Word(word) => parse_number(word, self.env.number_base).ok(),
            _ => None,
        };
        let Some(mask) = mask else {
            return Err(self.fail(ConditionErrorKind::InvalidNumber));
        };
        let zeroed = match (spec.is_plain_number(), spec.source) {
            (true, ValueSource::Literal(number)) => {
                number != 0 && number & mask == 0
            }
            _ => false,
        };
        if mask == 0 || zeroed {
            return Err(self.fail(ConditionErrorKind::MaskZeroesValue));
        }
        spec.mask = Some(mask);
        self.pos += 1;
        Ok(())
    }

    fn parse_comparison(&mut self) -> Result<Comparison, ParseFailure> {
        let Some(token) = self.tokens.get(self.pos) else {
            return Err(
                self.fail(ConditionErrorKind::BreakpointComparisonMissing)
            );
        };
        let Token::Compare(comparison) = *token else {
            return Err(self.fail(ConditionErrorKind::InvalidComparison));
        };
        self.pos += 1;
        if self.pos >= self.tokens.len() {
            return Err(self.fail(ConditionErrorKind::RightSideMissing));
        }
        Ok(comparison)
    }

    /// Settles the widths and masks of both sides, each side inheriting
    /// what the other one specified, and checks that they can ever be
    /// equal.
    fn cross_check(
        &self,
        lhs: ValueSpec,
        rhs: ValueSpec,
    ) -> Result<(Value, Value), ParseFailure> {
        let default_bits = if lhs.space.is_some() { 24 } else { 32 };
        let lbits = lhs.bits.or(rhs.bits).unwrap_or(default_bits);
        let rbits = rhs.bits.unwrap_or(lbits);
        let lmask = lhs.mask.or(rhs.mask).unwrap_or(bitmask(lbits));
        let rmask = rhs.mask.unwrap_or(lmask);
        let lvalue = Value {
            source: lhs.source,
            indirect: lhs.indirect,
            space: lhs.space,
            bits: lbits,
            mask: lmask,
        };
        let rvalue = Value {
            source: rhs.source,
            indirect: rhs.indirect,
            space: rhs.space,
            bits: rbits,
            mask: rmask,
        };
        self.check_sides(&lvalue, &rvalue)?;
        self.check_sides(&rvalue, &lvalue)?;
        Ok((lvalue, rvalue))
    }

    fn check_sides(&self, first: &Value, second: &Value) -> Result<(), ParseFailure> {
        let mask1 = bitmask(first.bits) & first.mask;
        if mask1 != first.mask {
            warn!(
                "mask 0x{:x} doesn't fit into {} address/register bits",
                first.mask, first.bits
            );
        }
        if let (None, Some(addr)) = (first.space, first.literal_address()) {
            if addr & 1 != 0 && first.bits > 8 {
                warn!(
                    "odd CPU address 0x{addr:x} given without using byte \
                     (.b) width"
                );
            }
        }
        let mask2 = bitmask(second.bits) & second.mask;
        if mask1 & mask2 == 0 {
            return Err(self.fail(ConditionErrorKind::MasksCancel));
        }
        match second.plain_number() {
            Some(number) if number != 0 && number & mask1 != number => {
                Err(self.fail(ConditionErrorKind::NumberDoesNotFit))
            }
            _ => Ok(()),
        }
    }
}

//===========================================================================//


//===========================================================================//
