use thiserror::Error;

//===========================================================================//

/// What is wrong with a breakpoint condition.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ConditionErrorKind {
    /// A character that can't appear in a condition.
    #[error("invalid character")]
    InvalidCharacter,
    /// The text has no `=`, `!`, `<` or `>` at all.
    #[error("condition comparison missing")]
    ComparisonMissing,
    /// A value was expected but the input ended.
    #[error("value missing")]
    ValueMissing,
    /// Something in value position is not a valid number.
    #[error("invalid dec/hex/bin value")]
    InvalidNumber,
    /// A name that is neither a variable, a register nor a symbol.
    #[error("invalid variable/register/symbol name")]
    InvalidName,
    /// A name that can't be used inside `( )`.
    #[error("invalid register/symbol name for indirection")]
    InvalidIndirectName,
    /// A literal `(address)` outside valid memory.
    #[error("invalid address")]
    InvalidAddress,
    /// A DSP `(address)` without a `.p`, `.x` or `.y` modifier.
    #[error("DSP memory addresses need to specify address space")]
    SpaceRequired,
    /// A `.modifier` after something that isn't an `(address)`.
    #[error("space/width modifier can be used only with an (address) expression")]
    ModifierNeedsAddress,
    /// A DSP modifier other than `p`, `x` or `y`.
    #[error("invalid address space modifier")]
    InvalidSpace,
    /// A CPU modifier other than `b`, `w` or `l`.
    #[error("invalid address width modifier")]
    InvalidWidth,
    /// A modifier longer than one letter.
    #[error("invalid address space/width modifier")]
    InvalidModifier,
    /// A mask that leaves nothing of the value.
    #[error("mask zeroes value")]
    MaskZeroesValue,
    /// The input ended where a comparison was expected.
    #[error("breakpoint comparison missing")]
    BreakpointComparisonMissing,
    /// Something other than a comparison after the left side.
    #[error("invalid comparison character")]
    InvalidComparison,
    /// The input ended after the comparison.
    #[error("right side missing")]
    RightSideMissing,
    /// The masks of the two sides have no bits in common.
    #[error("values masks cancel each other")]
    MasksCancel,
    /// A number that the other side can never be equal to.
    #[error("number doesn't fit the other side address width&mask")]
    NumberDoesNotFit,
    /// Something other than `&&` after a complete condition.
    #[error("trailing content for breakpoint condition")]
    TrailingContent,
}

/// Which text an error offset refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorStage {
    /// The offset is into the condition text as given.
    Tokenize,
    /// The offset is into the normalized, space-separated token string.
    Parse,
}

/// A condition error, located in the text it was found in.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{kind}")]
pub struct ConditionError {
    /// What went wrong.
    pub kind: ConditionErrorKind,
    /// Byte offset of the problem in `text`.
    pub offset: usize,
    /// The text that `offset` refers to.
    pub text: String,
    /// Whether `text` is the original or the normalized condition.
    pub stage: ErrorStage,
}

impl ConditionError {
    /// Renders the error with a caret under the offending position.
    pub fn report(&self) -> String {
        let heading = match self.stage {
            ErrorStage::Tokenize => "parsed",
            ErrorStage::Parse => "tokenized",
        };
        format!(
            "ERROR in {heading} string:\n'{}'\n{:>width$}-{}\n",
            self.text,
            '^',
            self.kind,
            width = self.offset + 2
        )
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{ConditionError, ConditionErrorKind, ErrorStage};

    #[test]
    fn caret_under_offset() {
        let error = ConditionError {
            kind: ConditionErrorKind::InvalidName,
            offset: 5,
            text: "pc = foo".to_string(),
            stage: ErrorStage::Parse,
        };
        assert_eq!(
            error.report(),
            "ERROR in tokenized string:\n'pc = foo'\n      ^-invalid \
             variable/register/symbol name\n"
        );
    }

    #[test]
    fn tokenizer_heading() {
        let error = ConditionError {
            kind: ConditionErrorKind::InvalidCharacter,
            offset: 0,
            text: "|".to_string(),
            stage: ErrorStage::Tokenize,
        };
        assert_eq!(error.report(), "ERROR in parsed string:\n'|'\n ^-invalid character\n");
        assert_eq!(error.to_string(), "invalid character");
    }
}

//===========================================================================//
