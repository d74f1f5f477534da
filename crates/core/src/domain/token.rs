//! Token Codec
//!
//! A token is the per-installation capability string. It doubles as the queue
//! partition key and as the bearer credential for both endpoints, so there is
//! no separate identity record anywhere in the system.
//!
//! Shape: `<prefix><MARKER><suffix>` where prefix and suffix are drawn from an
//! unambiguous alphabet, e.g. `A2B3C4D5OTL6E7F8`.

use crate::domain::error::{DomainError, Result};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TOKEN_LENGTH: usize = 16;
pub const DEFAULT_TOKEN_MARKER: &str = "OTL";
pub const DEFAULT_MARKER_OFFSET: usize = 8;
/// No 0/O, 1/I or lower case: tokens get read aloud and typed by hand
pub const DEFAULT_ALPHABET: &str = "23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// A token that passed validation against some [`TokenFormat`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Masked form for log lines (first four symbols only)
    pub fn hint(&self) -> String {
        let head: String = self.0.chars().take(4).collect();
        format!("{}…", head)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Token layout: total length, recognizable marker and its offset, alphabet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFormat {
    length: usize,
    marker: Vec<char>,
    marker_offset: usize,
    alphabet: Vec<char>,
}

impl Default for TokenFormat {
    fn default() -> Self {
        Self {
            length: DEFAULT_TOKEN_LENGTH,
            marker: DEFAULT_TOKEN_MARKER.chars().collect(),
            marker_offset: DEFAULT_MARKER_OFFSET,
            alphabet: DEFAULT_ALPHABET.chars().collect(),
        }
    }
}

impl TokenFormat {
    /// Build a format, rejecting layouts whose parts don't add up
    pub fn new(length: usize, marker: &str, marker_offset: usize, alphabet: &str) -> Result<Self> {
        let marker: Vec<char> = marker.chars().collect();
        let alphabet: Vec<char> = alphabet.chars().collect();

        if marker_offset + marker.len() > length {
            return Err(DomainError::InvalidTokenFormat(format!(
                "marker of {} chars at offset {} does not fit in length {}",
                marker.len(),
                marker_offset,
                length
            )));
        }
        if alphabet.is_empty() {
            return Err(DomainError::InvalidTokenFormat(
                "alphabet is empty".to_string(),
            ));
        }
        let mut sorted = alphabet.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != alphabet.len() {
            return Err(DomainError::InvalidTokenFormat(
                "alphabet contains duplicate symbols".to_string(),
            ));
        }

        Ok(Self {
            length,
            marker,
            marker_offset,
            alphabet,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn marker(&self) -> String {
        self.marker.iter().collect()
    }

    pub fn marker_offset(&self) -> usize {
        self.marker_offset
    }

    /// Generate a fresh token from the OS CSPRNG
    ///
    /// `gen_range` samples uniformly, so every alphabet symbol is equally
    /// likely regardless of the alphabet size.
    pub fn generate(&self) -> Token {
        let random_len = self.length - self.marker.len();
        let suffix_len = random_len - self.marker_offset;

        let mut rng = OsRng;
        let mut draw = |n: usize| -> String {
            (0..n)
                .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
                .collect()
        };

        let prefix = draw(self.marker_offset);
        let suffix = draw(suffix_len);
        let marker: String = self.marker.iter().collect();

        Token(format!("{}{}{}", prefix, marker, suffix))
    }

    /// Check the token invariant
    ///
    /// Only the length check returns early. Every position is inspected
    /// afterwards whatever the outcome of earlier positions.
    pub fn validate(&self, candidate: &str) -> bool {
        let chars: Vec<char> = candidate.chars().collect();
        if chars.len() != self.length {
            return false;
        }

        let marker_end = self.marker_offset + self.marker.len();
        let mut ok = true;
        for (i, c) in chars.iter().enumerate() {
            let valid = if i >= self.marker_offset && i < marker_end {
                *c == self.marker[i - self.marker_offset]
            } else {
                self.alphabet.contains(c)
            };
            ok &= valid;
        }
        ok
    }

    /// Validate and wrap
    pub fn parse(&self, candidate: &str) -> Option<Token> {
        if self.validate(candidate) {
            Some(Token(candidate.to_string()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_always_validates() {
        let format = TokenFormat::default();
        for _ in 0..10_000 {
            let token = format.generate();
            assert!(format.validate(token.as_str()), "rejected {}", token);
        }
    }

    #[test]
    fn test_generated_token_layout() {
        let format = TokenFormat::default();
        let token = format.generate();
        assert_eq!(token.as_str().len(), 16);
        assert_eq!(&token.as_str()[8..11], "OTL");
    }

    #[test]
    fn test_rejects_wrong_length() {
        let format = TokenFormat::default();
        assert!(!format.validate("A2B3C4D5OTL6E7F"));
        assert!(!format.validate("A2B3C4D5OTL6E7F89"));
        assert!(!format.validate(""));
    }

    #[test]
    fn test_rejects_shifted_marker() {
        let format = TokenFormat::default();
        assert!(format.validate("A2B3C4D5OTL6E7F8"));
        assert!(!format.validate("A2B3C4DOTL56E7F8"));
        assert!(!format.validate("A2B3C4D5EOTL7F8X"));
    }

    #[test]
    fn test_rejects_altered_marker_char() {
        let format = TokenFormat::default();
        assert!(!format.validate("A2B3C4D5OTX6E7F8"));
        assert!(!format.validate("A2B3C4D5otl6E7F8"));
    }

    #[test]
    fn test_rejects_symbol_outside_alphabet() {
        let format = TokenFormat::default();
        // 0, 1, O and I are excluded from the alphabet
        assert!(!format.validate("A2B3C4D0OTL6E7F8"));
        assert!(!format.validate("A2B3C4D5OTL6E7FI"));
        assert!(!format.validate("a2B3C4D5OTL6E7F8"));
    }

    #[test]
    fn test_rejects_non_ascii_symbols() {
        let format = TokenFormat::default();
        // 16 chars, 20 bytes
        assert!(!format.validate("ÄÄÄÄC4D5OTL6E7F8"));
    }

    #[test]
    fn test_format_rejects_marker_overflow() {
        let result = TokenFormat::new(10, "OTL", 8, DEFAULT_ALPHABET);
        assert!(result.is_err());
    }

    #[test]
    fn test_format_rejects_bad_alphabet() {
        assert!(TokenFormat::new(16, "OTL", 8, "").is_err());
        assert!(TokenFormat::new(16, "OTL", 8, "AAB").is_err());
    }

    #[test]
    fn test_custom_format_round_trip() {
        let format = TokenFormat::new(10, "XY", 0, "abc").unwrap();
        let token = format.generate();
        assert!(token.as_str().starts_with("XY"));
        assert!(format.validate(token.as_str()));
    }

    #[test]
    fn test_hint_masks_token() {
        let format = TokenFormat::default();
        let token = format.parse("A2B3C4D5OTL6E7F8").unwrap();
        assert_eq!(token.hint(), "A2B3…");
    }
}
