//! Debugger settings.

use thiserror::Error;

//===========================================================================//

/// An invalid debugger setting.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    /// Unprefixed numbers can only be binary, octal, decimal or hex.
    #[error("invalid number base {0} (should be 2, 8, 10 or 16)")]
    NumberBase(u32),
}

/// Settings that affect how expressions and breakpoints are handled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// The radix of numbers written without a prefix.
    pub number_base: u32,
    /// Whether the DSP is emulated, and DSP breakpoints allowed.
    pub dsp_enabled: bool,
}

impl Config {
    /// Returns a copy of this configuration with a different default number
    /// base.
    pub fn with_number_base(self, base: u32) -> Result<Config, ConfigError> {
        match base {
            2 | 8 | 10 | 16 => Ok(Config { number_base: base, ..self }),
            _ => Err(ConfigError::NumberBase(base)),
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config { number_base: 10, dsp_enabled: true }
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};

    #[test]
    fn number_base() {
        let config = Config::default().with_number_base(16).unwrap();
        assert_eq!(config.number_base, 16);
        assert!(config.dsp_enabled);
        assert_eq!(
            Config::default().with_number_base(7),
            Err(ConfigError::NumberBase(7))
        );
    }
}

//===========================================================================//
