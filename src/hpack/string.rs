//! Length-prefixed byte strings, plain or Huffman-coded (RFC 7541 §5.2).

use super::{huffman, integer, HpackError};

/// High bit of the length byte: the string data is Huffman coded.
pub const HUFFMAN_FLAG: u8 = 0x80;

/// Strings shorter than this are Huffman-coded whenever that saves bytes,
/// regardless of the compression ratio.
const SHORT_STRING_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedString {
    pub value: Vec<u8>,
    pub used: usize,
}

/// Reads one string (length prefix plus data) from the front of `src`.
pub fn decode(src: &[u8]) -> Result<DecodedString, HpackError> {
    let first = *src.first().ok_or(HpackError::Truncated)?;
    let is_huffman = first & HUFFMAN_FLAG != 0;

    let length = integer::decode(7, src)?;
    let data_len = length.value as usize;
    let data = src
        .get(length.used..length.used + data_len)
        .ok_or(HpackError::Truncated)?;

    let value = if is_huffman {
        decode_huffman(data)?
    } else {
        data.to_vec()
    };

    Ok(DecodedString {
        value,
        used: length.used + data_len,
    })
}

/// Size and representation the encoder would pick for `src`.
///
/// Returns `(encoded_data_len, huffman)`. Huffman wins when it is strictly
/// shorter and either the string is short or the ratio clears
/// `min_huffman_rate` (percent).
#[must_use]
pub fn estimate(src: &[u8], min_huffman_rate: u32) -> (usize, bool) {
    let encoded_bytes = (huffman::encoded_len_bits(src) + 7) / 8;
    if encoded_bytes < src.len()
        && (src.len() < SHORT_STRING_LEN
            || (100 * encoded_bytes / src.len()) as u32 <= min_huffman_rate)
    {
        (encoded_bytes, true)
    } else {
        (src.len(), false)
    }
}

/// Appends the length prefix and string data in the representation chosen
/// by [`estimate`].
pub fn encode_into(src: &[u8], encoded_len: usize, use_huffman: bool, out: &mut Vec<u8>) {
    let flag = if use_huffman { HUFFMAN_FLAG } else { 0 };
    out.extend_from_slice(integer::encode(flag, 7, encoded_len as u32).as_slice());
    if use_huffman {
        encode_huffman(src, out);
    } else {
        out.extend_from_slice(src);
    }
}

/// Wire size of the string: length prefix plus data.
#[must_use]
pub fn encoded_size(encoded_len: usize) -> usize {
    integer::encode(0, 7, encoded_len as u32).len() + encoded_len
}

fn encode_huffman(src: &[u8], out: &mut Vec<u8>) {
    let mut acc: u64 = 0;
    let mut pending: u8 = 0;
    for &byte in src {
        let code = huffman::encode(u16::from(byte));
        acc = (acc << code.len) | u64::from(code.bits);
        pending += code.len;
        while pending >= 8 {
            pending -= 8;
            out.push((acc >> pending) as u8);
        }
    }
    if pending > 0 {
        // pad the final partial byte with the high bits of EOS (all ones)
        let pad = 8 - pending;
        out.push((((acc << pad) as u8) & (0xff << pad)) | ((1 << pad) - 1));
    }
}

fn decode_huffman(src: &[u8]) -> Result<Vec<u8>, HpackError> {
    let total_bits = src.len() * 8;
    let mut pos = 0usize;
    // Huffman output is usually a bit shorter than 8/5 of the input.
    let mut out = Vec::with_capacity(src.len() + src.len() / 2);

    'symbols: while pos < total_bits {
        let remaining = total_bits - pos;
        if remaining < 8 {
            // trailing padding must be all ones (a prefix of EOS)
            let mask = (1u8 << remaining) - 1;
            if src[src.len() - 1] & mask == mask {
                break;
            }
        }

        for &len in huffman::code_lengths() {
            if usize::from(len) > remaining {
                break;
            }
            let code = huffman::Code {
                bits: peek_bits(src, pos, len),
                len,
            };
            if let Some(symbol) = huffman::decode(code) {
                if symbol == huffman::EOS {
                    return Err(HpackError::InvalidHuffman);
                }
                out.push(symbol as u8);
                pos += usize::from(len);
                continue 'symbols;
            }
        }
        return Err(HpackError::InvalidHuffman);
    }

    Ok(out)
}

fn peek_bits(src: &[u8], pos: usize, len: u8) -> u32 {
    let mut bits = 0u32;
    for i in pos..pos + usize::from(len) {
        let bit = (src[i / 8] >> (7 - i % 8)) & 1;
        bits = (bits << 1) | u32::from(bit);
    }
    bits
}
