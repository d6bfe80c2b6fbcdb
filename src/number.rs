//! Parsing of numeric literals with optional radix prefixes.

use thiserror::Error;

//===========================================================================//

/// An error from parsing a numeric literal.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum NumberError {
    /// The input was empty.
    #[error("value missing")]
    Missing,
    /// The input started with a character that is neither a digit nor a
    /// known radix prefix.
    #[error("unrecognized number prefix in '{0}'")]
    UnknownPrefix(String),
    /// No digits valid for the radix followed the prefix.
    #[error("invalid value '{0}'")]
    Invalid(String),
    /// The digits don't fit into 32 bits.
    #[error("overflow with value '{0}'")]
    Overflow(String),
    /// Something other than digits followed the number.
    #[error("extra characters in {base} based number '{text}'")]
    ExtraCharacters {
        /// Name of the radix the number was parsed in.
        base: &'static str,
        /// The whole input.
        text: String,
    },
    /// A symbolic name was too long to be a register, variable or symbol.
    #[error("name '{0}' is too long")]
    NameTooLong(String),
    /// A symbolic name contained characters a number would not.
    #[error("name '{0}' contains non-alphanumeric characters")]
    InvalidName(String),
}

/// A number parsed from the start of some text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParsedNumber {
    /// The number's value.
    pub value: u32,
    /// How many bytes of the input the number (with its prefix) took up.
    pub consumed: usize,
    /// The radix the number was read in.
    pub base: u32,
}

/// Returns the adjective used for a radix in messages.
pub fn base_name(base: u32) -> &'static str {
    match base {
        2 => "binary",
        8 => "octal",
        10 => "decimal",
        16 => "hexadecimal",
        _ => "unknown",
    }
}

//===========================================================================//

/// Parses the number at the start of `text`.
///
/// The radix comes from a `0b`/`0o`/`0d`/`0h`/`0x` prefix, from a `%`
/// (binary), `#` (decimal) or `$` (hexadecimal) prefix, or else is
/// `default_base`.  Parsing stops at the first character that isn't a digit
/// of that radix.
pub fn parse_number_prefix(
    text: &str,
    default_base: u32,
) -> Result<ParsedNumber, NumberError> {
    let bytes = text.as_bytes();
    let Some(&first) = bytes.first() else {
        return Err(NumberError::Missing);
    };
    let (base, start) = if first == b'0' {
        match bytes.get(1) {
            Some(b'b') => (2, 2),
            Some(b'o') => (8, 2),
            Some(b'd') => (10, 2),
            Some(b'h' | b'x') => (16, 2),
            _ => (default_base, 0),
        }
    } else if !first.is_ascii_hexdigit() {
        match first {
            b'%' => (2, 1),
            b'#' => (10, 1),
            b'$' => (16, 1),
            _ => return Err(NumberError::UnknownPrefix(text.to_string())),
        }
    } else {
        (default_base, 0)
    };
    let digits = text[start..]
        .chars()
        .take_while(|ch| ch.is_digit(base))
        .count();
    if digits == 0 {
        return Err(NumberError::Invalid(text.to_string()));
    }
    let end = start + digits;
    let value = u32::from_str_radix(&text[start..end], base)
        .map_err(|_| NumberError::Overflow(text.to_string()))?;
    Ok(ParsedNumber { value, consumed: end, base })
}

/// Parses `text` as a single number, rejecting anything after it.
pub fn parse_number(text: &str, default_base: u32) -> Result<u32, NumberError> {
    let number = parse_number_prefix(text, default_base)?;
    if number.consumed < text.len() {
        return Err(NumberError::ExtraCharacters {
            base: base_name(number.base),
            text: text.to_string(),
        });
    }
    Ok(number.value)
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{NumberError, ParsedNumber, parse_number, parse_number_prefix};

    #[test]
    fn prefixes() {
        assert_eq!(parse_number("$ff", 10), Ok(0xff));
        assert_eq!(parse_number("0xff", 10), Ok(0xff));
        assert_eq!(parse_number("0hff", 10), Ok(0xff));
        assert_eq!(parse_number("%101", 10), Ok(5));
        assert_eq!(parse_number("0b101", 10), Ok(5));
        assert_eq!(parse_number("0o17", 10), Ok(15));
        assert_eq!(parse_number("#99", 16), Ok(99));
        assert_eq!(parse_number("0d99", 16), Ok(99));
    }

    #[test]
    fn default_base() {
        assert_eq!(parse_number("10", 10), Ok(10));
        assert_eq!(parse_number("10", 16), Ok(16));
        assert_eq!(parse_number("10", 2), Ok(2));
        assert_eq!(parse_number("0", 10), Ok(0));
        assert_eq!(parse_number("ff", 16), Ok(0xff));
    }

    #[test]
    fn prefix_parse_stops_at_non_digit() {
        assert_eq!(
            parse_number_prefix("$1f+2", 10),
            Ok(ParsedNumber { value: 0x1f, consumed: 3, base: 16 })
        );
        assert_eq!(
            parse_number_prefix("12)", 10),
            Ok(ParsedNumber { value: 12, consumed: 2, base: 10 })
        );
    }

    #[test]
    fn errors() {
        assert_eq!(parse_number("", 10), Err(NumberError::Missing));
        assert_eq!(
            parse_number("@12", 10),
            Err(NumberError::UnknownPrefix("@12".to_string()))
        );
        assert_eq!(
            parse_number("%200", 10),
            Err(NumberError::Invalid("%200".to_string()))
        );
        assert_eq!(
            parse_number("$", 10),
            Err(NumberError::Invalid("$".to_string()))
        );
        assert_eq!(
            parse_number("12ab", 10),
            Err(NumberError::ExtraCharacters {
                base: "decimal",
                text: "12ab".to_string(),
            })
        );
        assert_eq!(
            parse_number("$ffff0000f", 10),
            Err(NumberError::Overflow("$ffff0000f".to_string()))
        );
    }

    #[test]
    fn error_messages() {
        let error = parse_number("%12", 10).unwrap_err();
        assert_eq!(
            error.to_string(),
            "extra characters in binary based number '%12'"
        );
    }
}

//===========================================================================//
