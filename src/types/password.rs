use serde::{Deserialize, Serialize};

/// Shortest password the generator accepts.
pub const MIN_LENGTH: usize = 8;

/// Longest password the generator accepts.
pub const MAX_LENGTH: usize = 32;

pub const DEFAULT_LENGTH: usize = 16;

pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";

/// Symbols offered by the symbol picker, in display order.
pub const DEFAULT_SYMBOLS: [char; 27] = [
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '-', '_', '+', '=', '{', '}', '[', ']', '|',
    ':', ';', '<', '>', ',', '.', '?', '/',
];

/// Password generation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub length: usize,
    pub include_lowercase: bool,
    pub include_uppercase: bool,
    pub include_numbers: bool,
    pub include_symbols: bool,
    pub custom_symbols: Vec<char>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            include_lowercase: true,
            include_uppercase: true,
            include_numbers: true,
            include_symbols: false,
            custom_symbols: DEFAULT_SYMBOLS.to_vec(),
        }
    }
}

impl PasswordConfig {
    /// Sets the length, clamped to the supported range.
    pub fn set_length(&mut self, length: usize) {
        self.length = length.clamp(MIN_LENGTH, MAX_LENGTH);
    }

    /// Replaces the symbol set, dropping duplicates but keeping first-seen order.
    pub fn set_custom_symbols<I: IntoIterator<Item = char>>(&mut self, symbols: I) {
        self.custom_symbols = dedup_symbols(symbols);
    }

    /// Returns true if the length lies in `[MIN_LENGTH, MAX_LENGTH]`.
    pub fn length_in_range(&self) -> bool {
        (MIN_LENGTH..=MAX_LENGTH).contains(&self.length)
    }

    /// Builds the effective character set in fixed class order:
    /// lowercase, uppercase, digits, then the custom symbols.
    pub fn charset(&self) -> Vec<char> {
        let mut charset = Vec::new();
        if self.include_lowercase {
            charset.extend(LOWERCASE.chars());
        }
        if self.include_uppercase {
            charset.extend(UPPERCASE.chars());
        }
        if self.include_numbers {
            charset.extend(DIGITS.chars());
        }
        if self.include_symbols {
            charset.extend(dedup_symbols(self.custom_symbols.iter().copied()));
        }
        charset
    }

    /// Returns a copy with every `Some` field of `overrides` applied.
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Self {
        let mut resolved = Self {
            length: overrides.length.unwrap_or(self.length),
            include_lowercase: overrides.include_lowercase.unwrap_or(self.include_lowercase),
            include_uppercase: overrides.include_uppercase.unwrap_or(self.include_uppercase),
            include_numbers: overrides.include_numbers.unwrap_or(self.include_numbers),
            include_symbols: overrides.include_symbols.unwrap_or(self.include_symbols),
            custom_symbols: self.custom_symbols.clone(),
        };
        if let Some(symbols) = &overrides.custom_symbols {
            resolved.set_custom_symbols(symbols.iter().copied());
        }
        resolved
    }
}

/// Partial update of a [`PasswordConfig`].
///
/// Each field resolves as: override, then the current config value, then the
/// built-in default (the current config always starts from the default).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub length: Option<usize>,
    pub include_lowercase: Option<bool>,
    pub include_uppercase: Option<bool>,
    pub include_numbers: Option<bool>,
    pub include_symbols: Option<bool>,
    pub custom_symbols: Option<Vec<char>>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn dedup_symbols<I: IntoIterator<Item = char>>(symbols: I) -> Vec<char> {
    let mut out: Vec<char> = Vec::new();
    for c in symbols {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}
