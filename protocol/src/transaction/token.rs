//! Token symbol to token id encoding.
//!
//! The ledger identifies tokens by a `u64` derived from the symbol with a
//! base-36 positional code. Every digit left of the last one is offset by
//! one before scaling, so `"0"` and `"00"` map to different ids.

use thiserror::Error;

use crate::config::MAX_TOKEN_SYMBOL_LEN;

const TOKEN_BASE: u64 = 36;

/// Errors produced while encoding a token symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token symbol is empty")]
    Empty,

    #[error("token symbol {symbol:?} is {len} characters long (max {MAX_TOKEN_SYMBOL_LEN})")]
    TooLong { symbol: String, len: usize },

    #[error("token symbol {symbol:?} contains invalid character {ch:?}")]
    InvalidCharacter { symbol: String, ch: char },
}

/// Encodes a token symbol into its numeric id.
///
/// The symbol is upper-cased first, so `"qkc"` and `"QKC"` share an id.
///
/// # Errors
///
/// Fails when the symbol is empty, longer than twelve characters, or
/// contains anything outside `[A-Z0-9]`.
pub fn try_encode_token_id(symbol: &str) -> Result<u64, TokenError> {
    let upper = symbol.to_ascii_uppercase();
    let len = upper.chars().count();
    if len == 0 {
        return Err(TokenError::Empty);
    }
    if len > MAX_TOKEN_SYMBOL_LEN {
        return Err(TokenError::TooLong {
            symbol: symbol.to_string(),
            len,
        });
    }

    let digits = upper
        .chars()
        .map(|ch| {
            char_digit(ch).ok_or_else(|| TokenError::InvalidCharacter {
                symbol: symbol.to_string(),
                ch,
            })
        })
        .collect::<Result<Vec<u64>, _>>()?;

    let (last, rest) = digits.split_last().ok_or(TokenError::Empty)?;
    let mut id = *last;
    let mut base = TOKEN_BASE;
    for digit in rest.iter().rev() {
        id += base * (digit + 1);
        base *= TOKEN_BASE;
    }
    Ok(id)
}

/// Encodes a token symbol that is known to be valid.
///
/// Token symbols are constants in the calling code, so a bad one is a
/// programming error rather than something to recover from.
///
/// # Panics
///
/// Panics if [`try_encode_token_id`] rejects the symbol.
pub fn encode_token_id(symbol: &str) -> u64 {
    match try_encode_token_id(symbol) {
        Ok(id) => id,
        Err(e) => panic!("invalid token symbol: {e}"),
    }
}

fn char_digit(ch: char) -> Option<u64> {
    match ch {
        '0'..='9' => Some(ch as u64 - '0' as u64),
        'A'..='Z' => Some(10 + ch as u64 - 'A' as u64),
        _ => None,
    }
}
