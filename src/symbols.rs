//! Symbol tables for the CPU and DSP address spaces.

use std::cmp::Ordering;
use tracing::{debug, warn};

//===========================================================================//

/// The section a symbol lives in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SymbolKind {
    /// Code.
    Text,
    /// A weak code symbol.
    Weak,
    /// Initialized data.
    Data,
    /// Zero-initialized data.
    Bss,
    /// An absolute value.
    Abs,
}

impl SymbolKind {
    fn bit(self) -> u8 {
        match self {
            SymbolKind::Text => 1,
            SymbolKind::Weak => 2,
            SymbolKind::Data => 4,
            SymbolKind::Bss => 8,
            SymbolKind::Abs => 16,
        }
    }

    /// Returns the kind for an `nm` type letter (case-insensitive).
    pub fn from_nm_letter(letter: char) -> Option<SymbolKind> {
        match letter.to_ascii_uppercase() {
            'T' => Some(SymbolKind::Text),
            'W' | 'V' => Some(SymbolKind::Weak),
            'D' | 'O' | 'R' => Some(SymbolKind::Data),
            'B' => Some(SymbolKind::Bss),
            'A' => Some(SymbolKind::Abs),
            _ => None,
        }
    }
}

/// A set of symbol kinds to accept in a lookup.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SymbolFilter(u8);

impl SymbolFilter {
    /// TEXT symbols only.
    pub const TEXT: SymbolFilter = SymbolFilter(1);
    /// TEXT and WEAK symbols.
    pub const CODE: SymbolFilter = SymbolFilter(1 | 2);
    /// DATA and BSS symbols, the ones that make sense for indirection.
    pub const DATA: SymbolFilter = SymbolFilter(4 | 8);
    /// Every kind of symbol.
    pub const ALL: SymbolFilter = SymbolFilter(31);

    /// Returns true if this filter accepts the given kind.
    pub fn contains(self, kind: SymbolKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

//===========================================================================//

/// A named address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Symbol {
    /// The symbol's (case-sensitive) name.
    pub name: String,
    /// The address the symbol refers to.
    pub address: u32,
    /// The section the symbol lives in.
    pub kind: SymbolKind,
}

/// A set of symbols, searchable by name and by address.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    by_name: Vec<Symbol>,
    by_address: Vec<usize>,
}

impl SymbolTable {
    /// Builds a table from the given symbols.
    pub fn new(mut symbols: Vec<Symbol>) -> SymbolTable {
        symbols.sort_by(|a, b| a.name.cmp(&b.name));
        let mut by_address: Vec<usize> = (0..symbols.len()).collect();
        by_address.sort_by_key(|&index| symbols[index].address);
        SymbolTable { by_name: symbols, by_address }
    }

    /// Parses `nm`-style text, one `<hex address> <type letter> <name>`
    /// symbol per line.  Blank lines and lines starting with `#` or `*` are
    /// skipped; malformed lines and unknown types are skipped with a
    /// warning.
    pub fn from_nm(text: &str) -> SymbolTable {
        let mut symbols = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let number = index + 1;
            if line.starts_with('#') || line.starts_with('*') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (address, letter, name) =
                match (fields.next(), fields.next(), fields.next()) {
                    (None, _, _) => continue,
                    (Some(address), Some(letter), Some(name)) => {
                        (address, letter, name)
                    }
                    _ => {
                        warn!("syntax error on line {number}, skipping.");
                        continue;
                    }
                };
            let address = match u32::from_str_radix(address, 16) {
                Ok(address) => address,
                Err(_) => {
                    warn!("syntax error on line {number}, skipping.");
                    continue;
                }
            };
            let mut letters = letter.chars();
            let kind = match (letters.next(), letters.next()) {
                (Some(letter), None) => SymbolKind::from_nm_letter(letter),
                _ => None,
            };
            let Some(kind) = kind else {
                warn!(
                    "unrecognized symbol type '{letter}' on line {number}, \
                     skipping."
                );
                continue;
            };
            if !is_symbol_name(name) {
                warn!("invalid symbol name '{name}' on line {number}, skipping.");
                continue;
            }
            symbols.push(Symbol { name: name.to_string(), address, kind });
        }
        debug!("read {} symbols", symbols.len());
        SymbolTable::new(symbols)
    }

    /// Returns the number of symbols in the table.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true if the table holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Returns the address of the named symbol, if it exists with one of
    /// the kinds accepted by `filter`.
    pub fn address_of(&self, name: &str, filter: SymbolFilter) -> Option<u32> {
        let start =
            self.by_name.partition_point(|symbol| symbol.name.as_str() < name);
        self.by_name[start..]
            .iter()
            .take_while(|symbol| symbol.name == name)
            .find(|symbol| filter.contains(symbol.kind))
            .map(|symbol| symbol.address)
    }

    /// Returns the name of a symbol at exactly the given address, if one of
    /// the kinds accepted by `filter` exists.
    pub fn name_at(&self, address: u32, filter: SymbolFilter) -> Option<&str> {
        let start = self.by_address.partition_point(|&index| {
            self.by_name[index].address.cmp(&address) == Ordering::Less
        });
        self.by_address[start..]
            .iter()
            .map(|&index| &self.by_name[index])
            .take_while(|symbol| symbol.address == address)
            .find(|symbol| filter.contains(symbol.kind))
            .map(|symbol| symbol.name.as_str())
    }

    /// Returns the symbols sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.by_name.iter()
    }
}

fn is_symbol_name(name: &str) -> bool {
    name.len() <= 32
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
}

//===========================================================================//


//===========================================================================//
