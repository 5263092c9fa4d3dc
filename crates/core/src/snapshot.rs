//! Snapshot container decoder
//!
//! Browsers persist session/tab state in a block-compressed container: an
//! 8-byte magic tag, a 4-byte little-endian uncompressed-size header, then
//! LZ4-style sequences (literal run + back-reference copy). The decoder here
//! is hand-rolled so day-to-day format drift can be observed and handled; if
//! it rejects a block, the reference implementation (`lz4_flex`) gets one
//! attempt before the error is reported.

use tempo_domain::{Result, TempoError};
use tracing::debug;

/// Magic tag prefixing a session snapshot container.
pub const CONTAINER_MAGIC: &[u8; 8] = b"mozLz40\0";

/// Minimum bytes a compressed block needs: the size header alone.
const SIZE_HEADER_LEN: usize = 4;

/// Decode a full snapshot container: verify the magic tag, then decompress
/// the remainder.
///
/// # Errors
///
/// `InvalidFormat` when the magic tag is missing, `CorruptData` when the
/// compressed payload cannot be decoded.
pub fn decode_container(data: &[u8]) -> Result<Vec<u8>> {
    let Some(payload) = data.strip_prefix(CONTAINER_MAGIC.as_slice()) else {
        return Err(TempoError::InvalidFormat(
            "snapshot container missing magic tag".to_string(),
        ));
    };

    decompress_with_fallback(payload)
}

/// Decompress a size-prefixed block, falling back to the reference decoder
/// when the hand-rolled one rejects the input.
pub fn decompress_with_fallback(block: &[u8]) -> Result<Vec<u8>> {
    match decompress_block(block) {
        Ok(out) => Ok(out),
        Err(primary) => match lz4_flex::block::decompress_size_prepended(block) {
            Ok(out) => {
                debug!(
                    error = %primary,
                    "hand-rolled snapshot decode failed; reference decoder succeeded"
                );
                Ok(out)
            }
            Err(_) => Err(primary),
        },
    }
}

/// Hand-rolled block decompressor.
///
/// Each sequence starts with a token byte: the high nibble is the literal
/// run length, the low nibble the match length, both extended by
/// continuation bytes (each adds up to 255, a value below 255 terminates).
/// After the literals comes a 2-byte little-endian back-reference offset and
/// `match length + 4` bytes copied from `output - offset`, byte by byte so
/// an overlapping source expands runs.
pub fn decompress_block(block: &[u8]) -> Result<Vec<u8>> {
    if block.len() < SIZE_HEADER_LEN {
        return Err(corrupt("missing uncompressed-size header"));
    }

    let expected =
        u32::from_le_bytes([block[0], block[1], block[2], block[3]]) as usize;
    let src = &block[SIZE_HEADER_LEN..];

    let mut out: Vec<u8> = Vec::with_capacity(expected);
    let mut pos = 0usize;

    while pos < src.len() {
        let token = src[pos];
        pos += 1;

        let literal_len = read_length(src, &mut pos, (token >> 4) as usize)?;
        let literal_end = pos
            .checked_add(literal_len)
            .filter(|end| *end <= src.len())
            .ok_or_else(|| corrupt("literal run exceeds input"))?;
        out.extend_from_slice(&src[pos..literal_end]);
        pos = literal_end;

        // The final sequence carries literals only.
        if pos >= src.len() {
            break;
        }

        if pos + 2 > src.len() {
            return Err(corrupt("truncated back-reference offset"));
        }
        let offset = u16::from_le_bytes([src[pos], src[pos + 1]]) as usize;
        pos += 2;

        if offset == 0 || offset > out.len() {
            return Err(corrupt("back-reference offset exceeds produced output"));
        }

        let match_len = read_length(src, &mut pos, (token & 0x0F) as usize)? + 4;

        // Byte-by-byte copy: the source region may overlap the bytes being
        // appended, which is how short seeds expand into long runs.
        let mut from = out.len() - offset;
        for _ in 0..match_len {
            let byte = out[from];
            out.push(byte);
            from += 1;
        }
    }

    Ok(out)
}

/// Extend a nibble-encoded length with continuation bytes.
fn read_length(src: &[u8], pos: &mut usize, nibble: usize) -> Result<usize> {
    let mut len = nibble;
    if nibble == 0x0F {
        loop {
            let byte = *src.get(*pos).ok_or_else(|| corrupt("truncated length run"))?;
            *pos += 1;
            len += byte as usize;
            if byte < 0xFF {
                break;
            }
        }
    }
    Ok(len)
}

fn corrupt(detail: &str) -> TempoError {
    TempoError::CorruptData(detail.to_string())
}
