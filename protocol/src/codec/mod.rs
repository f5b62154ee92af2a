//! # Binary Codecs
//!
//! Wire-level building blocks for transactions:
//!
//! ```text
//! rlp.rs         strict RLP list/string/integer encoder and reader
//! fixed_width.rs constant-width 5-byte encoding for 32-bit shard keys
//! ```

pub mod fixed_width;
pub mod rlp;

pub use fixed_width::{decode_fixed_u32, encode_fixed_u32, FixedWidthError};
pub use rlp::{RlpError, RlpItem, RlpStream};
