use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::borrow::Borrow;
use std::fmt;

/// Opaque bearer credential handed to a player on join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Renders two 64-bit halves as fixed-width lowercase hex.
    fn from_halves(high: u64, low: u64) -> Self {
        Token(format!("{high:016x}{low:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produces 128-bit tokens from two independently seeded generators,
/// rendered as 32 lowercase hex characters.
pub struct TokenGenerator {
    first: StdRng,
    second: StdRng,
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self {
            first: StdRng::from_entropy(),
            second: StdRng::from_entropy(),
        }
    }

    pub fn from_seeds(first: u64, second: u64) -> Self {
        Self {
            first: StdRng::seed_from_u64(first),
            second: StdRng::seed_from_u64(second),
        }
    }

    pub fn generate(&mut self) -> Token {
        let high: u64 = self.first.gen();
        let low: u64 = self.second.gen();
        Token::from_halves(high, low)
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_format() {
        let mut generator = TokenGenerator::new();
        for _ in 0..100 {
            let token = generator.generate();
            assert_eq!(token.as_str().len(), shared::TOKEN_LEN);
            assert!(shared::is_well_formed_token(token.as_str()));
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let mut generator = TokenGenerator::new();
        let tokens: HashSet<Token> = (0..10_000).map(|_| generator.generate()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let mut a = TokenGenerator::from_seeds(1, 2);
        let mut b = TokenGenerator::from_seeds(1, 2);
        assert_eq!(a.generate(), b.generate());
    }

    #[test]
    fn test_small_values_are_zero_padded() {
        let token = Token::from_halves(1, 0xab);
        assert_eq!(token.as_str(), "000000000000000100000000000000ab");
        assert!(shared::is_well_formed_token(token.as_str()));

        let token = Token::from_halves(u64::MAX, 0);
        assert_eq!(token.as_str(), "ffffffffffffffff0000000000000000");
    }

    #[test]
    fn test_generated_token_matches_its_halves() {
        let mut generator = TokenGenerator::from_seeds(7, 8);
        let mut first = StdRng::seed_from_u64(7);
        let mut second = StdRng::seed_from_u64(8);

        let expected = Token::from_halves(first.gen(), second.gen());
        assert_eq!(generator.generate(), expected);
    }
}
