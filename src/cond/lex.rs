use super::error::{ConditionError, ConditionErrorKind, ErrorStage};
use super::value::Comparison;
use logos::Logos;
use std::fmt;
use tracing::debug;

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, Logos, PartialEq)]
#[logos(skip r"[ \t\r\n\f\x0b]+")]
enum RawToken {
    #[regex(r"&+")]
    Ampersands,
    #[token("=")]
    #[token("!")]
    #[token("<")]
    #[token(">")]
    Comparison,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(".")]
    Dot,
    #[regex(r"[A-Za-z0-9_$#%]+")]
    Word,
}

//===========================================================================//

/// A single token of a breakpoint condition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// A name or a number; whitespace inside it has been removed.
    Word(String),
    /// One of `=`, `!`, `<` or `>`.
    Compare(Comparison),
    /// `(`
    ParenOpen,
    /// `)`
    ParenClose,
    /// `.`, introducing a space or width modifier.
    Dot,
    /// `&`, introducing a mask.
    Mask,
    /// `&&`, joining two conditions.
    And,
    /// Three or more `&` in a row.
    Ampersands(usize),
}

impl fmt::Display for Token {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Word(word) => formatter.write_str(word),
            Token::Compare(comparison) => write!(formatter, "{comparison}"),
            Token::ParenOpen => formatter.write_str("("),
            Token::ParenClose => formatter.write_str(")"),
            Token::Dot => formatter.write_str("."),
            Token::Mask => formatter.write_str("&"),
            Token::And => formatter.write_str("&&"),
            Token::Ampersands(count) => {
                formatter.write_str(&"&".repeat(*count))
            }
        }
    }
}

/// A condition split into tokens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenizedCondition {
    /// The tokens joined by single spaces.  This is how a breakpoint's
    /// condition is stored and shown.
    pub normalized: String,
    /// The tokens.
    pub tokens: Vec<Token>,
}

impl TokenizedCondition {
    /// Returns the offset in `normalized` at which the given token starts,
    /// or the length of `normalized` for an index past the last token.
    pub fn offset_of(&self, index: usize) -> usize {
        let offset: usize = self.tokens[..index.min(self.tokens.len())]
            .iter()
            .map(|token| token.to_string().len() + 1)
            .sum();
        offset.min(self.normalized.len())
    }
}

//===========================================================================//

/// Splits a breakpoint condition into tokens.  Whitespace separates tokens
/// only around separator characters (`=!<>().&`); within a name or number
/// it is dropped, so `" ( a 0 ) . w"` becomes `"( a0 ) . w"`.
pub fn tokenize(text: &str) -> Result<TokenizedCondition, ConditionError> {
    let error = |kind, offset| ConditionError {
        kind,
        offset,
        text: text.to_string(),
        stage: ErrorStage::Tokenize,
    };
    let mut tokens: Vec<Token> = Vec::new();
    let mut lexer = RawToken::lexer(text);
    while let Some(raw) = lexer.next() {
        let Ok(raw) = raw else {
            return Err(error(
                ConditionErrorKind::InvalidCharacter,
                lexer.span().start,
            ));
        };
        let slice = lexer.slice();
        let token = match raw {
            RawToken::Ampersands => match slice.len() {
                1 => Token::Mask,
                2 => Token::And,
                count => Token::Ampersands(count),
            },
            RawToken::Comparison => {
                let comparison = slice.chars().next().and_then(Comparison::from_char);
                match comparison {
                    Some(comparison) => Token::Compare(comparison),
                    None => {
                        return Err(error(
                            ConditionErrorKind::InvalidCharacter,
                            lexer.span().start,
                        ));
                    }
                }
            }
            RawToken::ParenOpen => Token::ParenOpen,
            RawToken::ParenClose => Token::ParenClose,
            RawToken::Dot => Token::Dot,
            RawToken::Word => {
                if let Some(Token::Word(word)) = tokens.last_mut() {
                    word.push_str(slice);
                    continue;
                }
                Token::Word(slice.to_string())
            }
        };
        tokens.push(token);
    }
    if !tokens.iter().any(|token| matches!(token, Token::Compare(_))) {
        return Err(error(ConditionErrorKind::ComparisonMissing, text.len() / 2));
    }
    let normalized = tokens
        .iter()
        .map(Token::to_string)
        .collect::<Vec<String>>()
        .join(" ");
    debug!("tokenized '{text}' as '{normalized}'");
    Ok(TokenizedCondition { normalized, tokens })
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{Token, tokenize};
    use crate::cond::error::{ConditionErrorKind, ErrorStage};
    use crate::cond::value::Comparison;

    fn normalize(text: &str) -> String {
        tokenize(text).unwrap().normalized
    }

    #[test]
    fn whitespace_joins_words() {
        assert_eq!(
            normalize(" ( a 0 ) . w  &  1 = ( d 0 ) & 1 &&  d 0 = 3 "),
            "( a0 ) . w & 1 = ( d0 ) & 1 && d0 = 3"
        );
        assert_eq!(normalize("pc>$200"), "pc > $200");
        assert_eq!(normalize("d0=d1"), "d0 = d1");
    }

    #[test]
    fn vertical_tab_is_whitespace() {
        assert_eq!(normalize("d0\x0b=\x0b1"), "d0 = 1");
        assert_eq!(normalize("d\x0b0 = 1\x0b"), "d0 = 1");
    }

    #[test]
    fn ampersands() {
        let tokenized = tokenize("d0&1=1&&d1&&&2=2").unwrap();
        assert_eq!(tokenized.tokens[1], Token::Mask);
        assert_eq!(tokenized.tokens[5], Token::And);
        assert_eq!(tokenized.tokens[7], Token::Ampersands(3));
        assert_eq!(tokenized.normalized, "d0 & 1 = 1 && d1 &&& 2 = 2");
    }

    #[test]
    fn token_kinds() {
        let tokenized = tokenize("(a0).w!%101").unwrap();
        assert_eq!(
            tokenized.tokens,
            vec![
                Token::ParenOpen,
                Token::Word("a0".to_string()),
                Token::ParenClose,
                Token::Dot,
                Token::Word("w".to_string()),
                Token::Compare(Comparison::NotEqual),
                Token::Word("%101".to_string()),
            ]
        );
    }

    #[test]
    fn token_offsets() {
        let tokenized = tokenize("(a0).w = #12").unwrap();
        assert_eq!(tokenized.normalized, "( a0 ) . w = #12");
        assert_eq!(tokenized.offset_of(0), 0);
        assert_eq!(tokenized.offset_of(1), 2);
        assert_eq!(tokenized.offset_of(5), 11);
        assert_eq!(tokenized.offset_of(7), 16);
    }

    #[test]
    fn invalid_characters() {
        let error = tokenize("a0=d || 0=20").unwrap_err();
        assert_eq!(error.kind, ConditionErrorKind::InvalidCharacter);
        assert_eq!(error.offset, 5);
        assert_eq!(error.stage, ErrorStage::Tokenize);
        let error = tokenize("d0 = \"ICE!BAR").unwrap_err();
        assert_eq!(error.offset, 5);
    }

    #[test]
    fn comparison_missing() {
        let error = tokenize(" a0 d0 ").unwrap_err();
        assert_eq!(error.kind, ConditionErrorKind::ComparisonMissing);
        assert_eq!(error.offset, 3);
        assert!(tokenize("").is_err());
    }
}

//===========================================================================//
