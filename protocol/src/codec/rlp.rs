//! Recursive Length Prefix encoding.
//!
//! Only the subset the transaction codec needs: byte strings, unsigned
//! integers, raw pre-encoded items and one level of lists. The reader is
//! strict and rejects anything a canonical encoder would not produce, so a
//! decoded transaction always re-encodes to the same bytes.

use num_bigint::BigUint;
use thiserror::Error;

const STRING_OFFSET: u8 = 0x80;
const LIST_OFFSET: u8 = 0xc0;
const SHORT_LIMIT: usize = 55;

/// Errors produced while reading RLP data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RlpError {
    #[error("unexpected end of input: need {needed} bytes, have {available}")]
    UnexpectedEnd { needed: usize, available: usize },

    #[error("non-canonical size prefix")]
    NonCanonicalSize,

    #[error("non-canonical integer (leading zero bytes)")]
    NonCanonicalInteger,

    #[error("integer does not fit in {bits} bits")]
    IntegerOverflow { bits: u32 },

    #[error("expected a list, found a string")]
    ExpectedList,

    #[error("expected a string, found a list")]
    ExpectedString,

    #[error("{count} trailing bytes after item")]
    TrailingBytes { count: usize },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Builder for a single RLP list.
///
/// Items are appended in order and [`RlpStream::out`] wraps them in the list
/// header.
#[derive(Debug, Default, Clone)]
pub struct RlpStream {
    payload: Vec<u8>,
}

impl RlpStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a byte string.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        write_string(&mut self.payload, bytes);
        self
    }

    /// Appends the empty string, the encoding of "nothing" and of zero.
    pub fn append_empty(&mut self) -> &mut Self {
        self.payload.push(STRING_OFFSET);
        self
    }

    /// Appends an unsigned integer as a minimal big-endian string.
    pub fn append_u64(&mut self, value: u64) -> &mut Self {
        let bytes = value.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        write_string(&mut self.payload, &bytes[first..]);
        self
    }

    pub fn append_u32(&mut self, value: u32) -> &mut Self {
        self.append_u64(u64::from(value))
    }

    /// Appends an arbitrary-precision unsigned integer.
    pub fn append_biguint(&mut self, value: &BigUint) -> &mut Self {
        if value.bits() == 0 {
            return self.append_empty();
        }
        write_string(&mut self.payload, &value.to_bytes_be());
        self
    }

    /// Appends bytes that already form a complete RLP item.
    pub fn append_raw(&mut self, item: &[u8]) -> &mut Self {
        self.payload.extend_from_slice(item);
        self
    }

    /// Finishes the list and returns its encoding.
    pub fn out(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 9);
        write_header(&mut out, LIST_OFFSET, self.payload.len());
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Encodes a standalone byte string.
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 9);
    write_string(&mut out, bytes);
    out
}

fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() == 1 && bytes[0] < STRING_OFFSET {
        out.push(bytes[0]);
        return;
    }
    write_header(out, STRING_OFFSET, bytes.len());
    out.extend_from_slice(bytes);
}

fn write_header(out: &mut Vec<u8>, offset: u8, len: usize) {
    if len <= SHORT_LIMIT {
        out.push(offset + len as u8);
        return;
    }
    let len_bytes = (len as u64).to_be_bytes();
    let first = len_bytes.iter().position(|b| *b != 0).unwrap_or(7);
    let len_of_len = len_bytes.len() - first;
    out.push(offset + SHORT_LIMIT as u8 + len_of_len as u8);
    out.extend_from_slice(&len_bytes[first..]);
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Header {
    is_list: bool,
    header_len: usize,
    payload_len: usize,
}

impl Header {
    fn total_len(&self) -> usize {
        self.header_len + self.payload_len
    }
}

fn read_header(data: &[u8]) -> Result<Header, RlpError> {
    let first = *data.first().ok_or(RlpError::UnexpectedEnd {
        needed: 1,
        available: 0,
    })?;

    let header = match first {
        0x00..=0x7f => Header {
            is_list: false,
            header_len: 0,
            payload_len: 1,
        },
        0x80..=0xb7 => {
            let payload_len = (first - STRING_OFFSET) as usize;
            if payload_len == 1 {
                match data.get(1) {
                    Some(b) if *b < STRING_OFFSET => return Err(RlpError::NonCanonicalSize),
                    _ => {}
                }
            }
            Header {
                is_list: false,
                header_len: 1,
                payload_len,
            }
        }
        0xb8..=0xbf => read_long_header(data, (first - 0xb7) as usize, false)?,
        0xc0..=0xf7 => Header {
            is_list: true,
            header_len: 1,
            payload_len: (first - LIST_OFFSET) as usize,
        },
        0xf8..=0xff => read_long_header(data, (first - 0xf7) as usize, true)?,
    };

    let needed = header.total_len();
    if data.len() < needed {
        return Err(RlpError::UnexpectedEnd {
            needed,
            available: data.len(),
        });
    }
    Ok(header)
}

fn read_long_header(data: &[u8], len_of_len: usize, is_list: bool) -> Result<Header, RlpError> {
    let len_bytes = data.get(1..1 + len_of_len).ok_or(RlpError::UnexpectedEnd {
        needed: 1 + len_of_len,
        available: data.len(),
    })?;
    if len_bytes[0] == 0 {
        return Err(RlpError::NonCanonicalSize);
    }
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(RlpError::IntegerOverflow {
            bits: usize::BITS,
        });
    }
    let payload_len = len_bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);
    if payload_len <= SHORT_LIMIT {
        return Err(RlpError::NonCanonicalSize);
    }
    let header_len = 1 + len_of_len;
    payload_len
        .checked_add(header_len)
        .ok_or(RlpError::IntegerOverflow { bits: usize::BITS })?;
    Ok(Header {
        is_list,
        header_len,
        payload_len,
    })
}

/// A view over exactly one encoded RLP item.
#[derive(Debug, Clone, Copy)]
pub struct RlpItem<'a> {
    raw: &'a [u8],
    header: Header,
}

impl<'a> RlpItem<'a> {
    /// Parses `data`, which must hold one item and nothing else.
    pub fn new(data: &'a [u8]) -> Result<Self, RlpError> {
        let header = read_header(data)?;
        let total = header.total_len();
        if data.len() != total {
            return Err(RlpError::TrailingBytes {
                count: data.len() - total,
            });
        }
        Ok(Self { raw: data, header })
    }

    pub fn is_list(&self) -> bool {
        self.header.is_list
    }

    /// The full encoding of this item, header included.
    pub fn as_raw(&self) -> &'a [u8] {
        self.raw
    }

    fn payload(&self) -> &'a [u8] {
        &self.raw[self.header.header_len..]
    }

    /// Splits a list into its items.
    pub fn items(&self) -> Result<Vec<RlpItem<'a>>, RlpError> {
        if !self.header.is_list {
            return Err(RlpError::ExpectedList);
        }
        let mut rest = self.payload();
        let mut items = Vec::new();
        while !rest.is_empty() {
            let header = read_header(rest)?;
            let (item, tail) = rest.split_at(header.total_len());
            items.push(RlpItem { raw: item, header });
            rest = tail;
        }
        Ok(items)
    }

    /// The payload of a string item.
    pub fn as_bytes(&self) -> Result<&'a [u8], RlpError> {
        if self.header.is_list {
            return Err(RlpError::ExpectedString);
        }
        Ok(self.payload())
    }

    fn as_integer_bytes(&self, bits: u32) -> Result<&'a [u8], RlpError> {
        let bytes = self.as_bytes()?;
        if bytes.first() == Some(&0) {
            return Err(RlpError::NonCanonicalInteger);
        }
        if bytes.len() * 8 > bits as usize {
            return Err(RlpError::IntegerOverflow { bits });
        }
        Ok(bytes)
    }

    pub fn as_u64(&self) -> Result<u64, RlpError> {
        let bytes = self.as_integer_bytes(64)?;
        Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    pub fn as_u32(&self) -> Result<u32, RlpError> {
        let bytes = self.as_integer_bytes(32)?;
        Ok(bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
    }

    pub fn as_biguint(&self) -> Result<BigUint, RlpError> {
        let bytes = self.as_integer_bytes(u32::MAX)?;
        Ok(BigUint::from_bytes_be(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_use_minimal_encoding() {
        let mut s = RlpStream::new();
        s.append_u64(0).append_u64(0x7f).append_u64(0x80).append_u64(0x0400);
        assert_eq!(s.out(), vec![0xc7, 0x80, 0x7f, 0x81, 0x80, 0x82, 0x04, 0x00]);
    }

    #[test]
    fn zero_biguint_is_empty_string() {
        let mut s = RlpStream::new();
        s.append_biguint(&BigUint::from(0u8));
        assert_eq!(s.out(), vec![0xc1, 0x80]);
    }

    #[test]
    fn well_known_vectors() {
        assert_eq!(encode_bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(encode_bytes(b""), vec![0x80]);
        assert_eq!(encode_bytes(&[0x00]), vec![0x00]);

        let mut s = RlpStream::new();
        s.append_bytes(b"cat").append_bytes(b"dog");
        assert_eq!(
            s.out(),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        assert_eq!(RlpStream::new().out(), vec![0xc0]);
    }

    #[test]
    fn long_string_header() {
        let data = vec![0xaa; 56];
        let enc = encode_bytes(&data);
        assert_eq!(&enc[..2], &[0xb8, 56]);
        let item = RlpItem::new(&enc).unwrap();
        assert_eq!(item.as_bytes().unwrap(), &data[..]);
    }

    #[test]
    fn long_list_header() {
        let mut s = RlpStream::new();
        s.append_bytes(&vec![0x01; 1024]);
        let enc = s.out();
        // payload = 3-byte string header + 1024 bytes = 1027 = 0x0403
        assert_eq!(&enc[..3], &[0xf9, 0x04, 0x03]);
        let items = RlpItem::new(&enc).unwrap().items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_bytes().unwrap().len(), 1024);
    }

    #[test]
    fn decodes_integers() {
        assert_eq!(RlpItem::new(&[0x80]).unwrap().as_u64().unwrap(), 0);
        assert_eq!(RlpItem::new(&[0x05]).unwrap().as_u64().unwrap(), 5);
        assert_eq!(RlpItem::new(&[0x82, 0x04, 0x00]).unwrap().as_u32().unwrap(), 1024);
        let big = RlpItem::new(&[0x89, 1, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(big.as_u64(), Err(RlpError::IntegerOverflow { bits: 64 }));
        assert_eq!(big.as_biguint().unwrap(), BigUint::from(1u8) << 64);
    }

    #[test]
    fn rejects_leading_zero_integer() {
        let item = RlpItem::new(&[0x82, 0x00, 0x01]).unwrap();
        assert_eq!(item.as_u64(), Err(RlpError::NonCanonicalInteger));
        let zero_byte = RlpItem::new(&[0x00]).unwrap();
        assert_eq!(zero_byte.as_u64(), Err(RlpError::NonCanonicalInteger));
    }

    #[test]
    fn rejects_non_canonical_single_byte() {
        assert_eq!(
            RlpItem::new(&[0x81, 0x05]).unwrap_err(),
            RlpError::NonCanonicalSize
        );
    }

    #[test]
    fn rejects_long_form_for_short_payload() {
        let mut data = vec![0xb8, 3];
        data.extend_from_slice(b"dog");
        assert_eq!(RlpItem::new(&data).unwrap_err(), RlpError::NonCanonicalSize);
    }

    #[test]
    fn rejects_truncated_and_trailing_input() {
        assert!(matches!(
            RlpItem::new(&[0x83, b'd', b'o']),
            Err(RlpError::UnexpectedEnd { needed: 4, available: 3 })
        ));
        assert_eq!(
            RlpItem::new(&[0x80, 0x80]).unwrap_err(),
            RlpError::TrailingBytes { count: 1 }
        );
        assert!(RlpItem::new(&[]).is_err());
    }

    #[test]
    fn type_mismatches() {
        assert_eq!(
            RlpItem::new(&[0xc0]).unwrap().as_bytes().unwrap_err(),
            RlpError::ExpectedString
        );
        assert_eq!(
            RlpItem::new(&[0x80]).unwrap().items().unwrap_err(),
            RlpError::ExpectedList
        );
    }

    #[test]
    fn raw_items_are_embedded_verbatim() {
        let raw = [0x84, 0x00, 0x04, 0x00, 0x01];
        let mut s = RlpStream::new();
        s.append_raw(&raw);
        let enc = s.out();
        let items = RlpItem::new(&enc).unwrap().items().unwrap();
        assert_eq!(items[0].as_raw(), &raw);
    }
}
