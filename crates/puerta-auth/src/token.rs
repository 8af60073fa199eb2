//! Session token generation.
//!
//! Tokens are drawn from the OS CSPRNG six bits at a time. Each 64-bit draw
//! yields ten indices; indices past the end of the alphabet are discarded
//! rather than wrapped, so every symbol is equally likely.

use puerta_core::constants::{SESSION_TOKEN_ALPHABET, SESSION_TOKEN_LENGTH};
use rand::rngs::OsRng;
use rand::RngCore;

const INDEX_BITS: u32 = 6;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const INDICES_PER_DRAW: u32 = 64 / INDEX_BITS;

/// A fresh random session token.
pub fn new_token() -> String {
    new_token_from(&mut OsRng)
}

fn new_token_from<R: RngCore>(rng: &mut R) -> String {
    let mut token = String::with_capacity(SESSION_TOKEN_LENGTH);

    while token.len() < SESSION_TOKEN_LENGTH {
        let mut bits = rng.next_u64();
        for _ in 0..INDICES_PER_DRAW {
            if token.len() == SESSION_TOKEN_LENGTH {
                break;
            }
            let index = (bits & INDEX_MASK) as usize;
            if let Some(&symbol) = SESSION_TOKEN_ALPHABET.get(index) {
                token.push(symbol as char);
            }
            bits >>= INDEX_BITS;
        }
    }

    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use std::collections::HashSet;

    #[test]
    fn test_length_and_alphabet() {
        let token = new_token();

        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);
        assert!(token.bytes().all(|b| SESSION_TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_tokens_differ() {
        let tokens: HashSet<_> = (0..100).map(|_| new_token()).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        // The first draw is all ones, so every index in it is 63 and
        // none of it may be used.
        let mut rng = StepRng::new(u64::MAX, 1);
        let token = new_token_from(&mut rng);

        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);
        assert!(token.bytes().all(|b| SESSION_TOKEN_ALPHABET.contains(&b)));
    }
}
