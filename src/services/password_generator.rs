//! Password Generator for passforge.
//!
//! Draws every character independently and uniformly from the effective
//! charset of a [`PasswordConfig`], using the operating system CSPRNG
//! through `ring::rand::SystemRandom`.

use ring::rand::{SecureRandom, SystemRandom};

use crate::types::errors::GeneratorError;
use crate::types::password::{PasswordConfig, MAX_LENGTH, MIN_LENGTH};

/// Trait defining password generation operations.
pub trait PasswordGeneratorTrait {
    /// Generates a password of exactly `config.length` characters.
    fn generate(&self, config: &PasswordConfig) -> Result<String, GeneratorError>;

    /// Returns `length * log2(charset size)`, or 0 for an empty charset.
    fn entropy_bits(&self, config: &PasswordConfig) -> f64;
}

/// Generator backed by the system random source.
pub struct PasswordGenerator {
    rng: SystemRandom,
}

impl PasswordGenerator {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Returns a uniformly distributed index in `0..bound`.
    ///
    /// Rejection sampling over 32-bit draws: values at or above the largest
    /// multiple of `bound` are discarded, so no index is favored.
    fn uniform_index(&self, bound: usize) -> Result<usize, GeneratorError> {
        let bound = bound as u64;
        let span = 1u64 << 32;
        let limit = span - (span % bound);
        loop {
            let mut buf = [0u8; 4];
            self.rng
                .fill(&mut buf)
                .map_err(|_| GeneratorError::RandomSource("system RNG unavailable".to_string()))?;
            let value = u32::from_le_bytes(buf) as u64;
            if value < limit {
                return Ok((value % bound) as usize);
            }
        }
    }
}

impl Default for PasswordGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordGeneratorTrait for PasswordGenerator {
    fn generate(&self, config: &PasswordConfig) -> Result<String, GeneratorError> {
        if !config.length_in_range() {
            return Err(GeneratorError::LengthOutOfRange {
                length: config.length,
                min: MIN_LENGTH,
                max: MAX_LENGTH,
            });
        }

        let charset = config.charset();
        if charset.is_empty() {
            return Err(GeneratorError::InvalidConfiguration(
                "at least one character class must be enabled".to_string(),
            ));
        }

        let mut password = String::with_capacity(config.length);
        for _ in 0..config.length {
            password.push(charset[self.uniform_index(charset.len())?]);
        }
        Ok(password)
    }

    fn entropy_bits(&self, config: &PasswordConfig) -> f64 {
        let size = config.charset().len();
        if size == 0 {
            return 0.0;
        }
        config.length as f64 * (size as f64).log2()
    }
}
