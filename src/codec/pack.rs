//! 15-bit text packing.
//!
//! Every 15 bits of input become one code point from a 32768-symbol
//! alphabet made of two contiguous blocks:
//!
//! - `U+3400..=U+9FFF` (CJK Extension A, Yijing symbols, CJK Unified)
//! - `U+AC00..=U+BFFF` (Hangul syllables)
//!
//! The final group is zero-padded and the packed text is terminated by a
//! single ASCII marker `0`-`e` giving the number of padding bits (base 15).

use super::CodecError;

const BITS_PER_SYMBOL: u32 = 15;
const SYMBOL_MASK: u32 = (1 << BITS_PER_SYMBOL) - 1;

const LOW_BLOCK_START: u32 = 0x3400;
const LOW_BLOCK_LEN: u32 = 0xA000 - LOW_BLOCK_START;
const HIGH_BLOCK_START: u32 = 0xAC00;
const HIGH_BLOCK_LEN: u32 = (1 << BITS_PER_SYMBOL) - LOW_BLOCK_LEN;

/// Pack bytes into alphabet symbols plus a trailing padding marker.
pub fn pack(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(packed_len(bytes.len()) * 3);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in bytes {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        if bits >= BITS_PER_SYMBOL {
            bits -= BITS_PER_SYMBOL;
            out.push(symbol((acc >> bits) & SYMBOL_MASK));
            acc &= (1 << bits) - 1;
        }
    }

    let padding = if bits > 0 {
        let padding = BITS_PER_SYMBOL - bits;
        out.push(symbol((acc << padding) & SYMBOL_MASK));
        padding
    } else {
        0
    };

    // `padding` is always below 15, so the digit exists.
    if let Some(marker) = char::from_digit(padding, BITS_PER_SYMBOL) {
        out.push(marker);
    }
    out
}

/// Reverse [`pack`], validating alphabet membership and padding.
pub fn unpack(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut chars = text.chars();
    let marker = chars.next_back().ok_or(CodecError::Truncated)?;
    let padding = marker
        .to_digit(BITS_PER_SYMBOL)
        .filter(|_| marker.is_ascii())
        .ok_or(CodecError::BadPadding {
            reason: format!("`{}` is not a padding marker", marker.escape_debug()),
        })?;

    let symbols: Vec<u32> = chars
        .enumerate()
        .map(|(position, c)| value(c).ok_or(CodecError::InvalidSymbol { position, found: c }))
        .collect::<Result<_, _>>()?;

    let total_bits = symbols.len() as u64 * u64::from(BITS_PER_SYMBOL);
    if symbols.is_empty() && padding != 0 {
        return Err(CodecError::BadPadding {
            reason: format!("{} padding bits on empty input", padding),
        });
    }
    let data_bits = total_bits - u64::from(padding);
    if data_bits % 8 != 0 {
        return Err(CodecError::BadPadding {
            reason: format!("{} data bits is not a whole number of bytes", data_bits),
        });
    }

    let byte_len = (data_bits / 8) as usize;
    let mut out = Vec::with_capacity(byte_len);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;

    for v in symbols {
        acc = (acc << BITS_PER_SYMBOL) | v;
        bits += BITS_PER_SYMBOL;
        while bits >= 8 && out.len() < byte_len {
            bits -= 8;
            out.push(((acc >> bits) & 0xFF) as u8);
        }
        acc &= (1 << bits) - 1;
    }

    // Whatever is left over is padding and must be zero.
    if acc != 0 {
        return Err(CodecError::BadPadding {
            reason: "padding bits are not zero".to_string(),
        });
    }

    Ok(out)
}

/// Number of code points `pack` produces for `byte_len` input bytes.
pub fn packed_len(byte_len: usize) -> usize {
    (byte_len * 8).div_ceil(BITS_PER_SYMBOL as usize) + 1
}

fn symbol(v: u32) -> char {
    let code = if v < LOW_BLOCK_LEN {
        LOW_BLOCK_START + v
    } else {
        HIGH_BLOCK_START + (v - LOW_BLOCK_LEN)
    };
    // Both blocks lie outside the surrogate range.
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn value(c: char) -> Option<u32> {
    let code = u32::from(c);
    if (LOW_BLOCK_START..LOW_BLOCK_START + LOW_BLOCK_LEN).contains(&code) {
        Some(code - LOW_BLOCK_START)
    } else if (HIGH_BLOCK_START..HIGH_BLOCK_START + HIGH_BLOCK_LEN).contains(&code) {
        Some(code - HIGH_BLOCK_START + LOW_BLOCK_LEN)
    } else {
        None
    }
}
