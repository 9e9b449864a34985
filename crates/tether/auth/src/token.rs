//! Human-typable one-time tokens
//!
//! A token is five characters from the upper-case base-36 alphabet
//! (`0-9`, `A-Z`), left-padded with `0`, drawn from the operating system's
//! cryptographically secure random source.

use chrono::{DateTime, Utc};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

/// Number of characters in a token.
pub const TOKEN_WIDTH: usize = 5;

/// Token alphabet, in digit order.
pub const TOKEN_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Number of distinct tokens (36^5).
pub const TOKEN_SPACE: u32 = 36 * 36 * 36 * 36 * 36;

/// A token handed to a human, valid until `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub(crate) fn new(value: String, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Draw a fresh token string.
pub fn generate<G: Rng + CryptoRng>(rng: &mut G) -> String {
    encode(rng.gen_range(0..TOKEN_SPACE))
}

/// Render `n` as a zero-padded token string. Values past the token space wrap.
pub fn encode(n: u32) -> String {
    let mut n = n % TOKEN_SPACE;
    let mut digits = [b'0'; TOKEN_WIDTH];
    for slot in digits.iter_mut().rev() {
        *slot = TOKEN_ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    digits.iter().map(|&b| b as char).collect()
}

/// Whether `s` has the shape of a token.
pub fn is_well_formed(s: &str) -> bool {
    s.len() == TOKEN_WIDTH && s.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_encode_pads_and_uppercases() {
        assert_eq!(encode(0), "00000");
        assert_eq!(encode(35), "0000Z");
        assert_eq!(encode(36), "00010");
        assert_eq!(encode(TOKEN_SPACE - 1), "ZZZZZ");
    }

    #[test]
    fn test_generated_tokens_are_well_formed() {
        let mut rng = OsRng;
        for _ in 0..1000 {
            let token = generate(&mut rng);
            assert!(is_well_formed(&token), "malformed token {token}");
        }
    }

    #[test]
    fn test_is_well_formed_rejects_other_shapes() {
        assert!(!is_well_formed("abcde"));
        assert!(!is_well_formed("ABCD"));
        assert!(!is_well_formed("ABCDEF"));
        assert!(!is_well_formed("AB-DE"));
    }

    proptest! {
        #[test]
        fn prop_every_value_encodes_to_a_token(n in 0u32..TOKEN_SPACE) {
            let token = encode(n);
            prop_assert!(is_well_formed(&token));
            prop_assert_eq!(u32::from_str_radix(&token, 36).unwrap(), n);
        }
    }
}
