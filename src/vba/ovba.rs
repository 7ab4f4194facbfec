//! MS-OVBA CompressedContainer decompression
//!
//! VBA source inside a project storage is stored in the run-length format
//! described by [MS-OVBA] 2.4.1: a signature byte followed by chunks of at most
//! 4096 decompressed bytes, each either raw or a sequence of flag-byte token groups.

use crate::types::{CodexError, Result};

const CONTAINER_SIGNATURE: u8 = 0x01;
const CHUNK_SIGNATURE: u16 = 0b011;
const RAW_CHUNK_SIZE: usize = 4096;

/// Number of offset bits in a copy token, given the decompressed length of the current chunk
fn copy_token_bit_count(decompressed_in_chunk: usize) -> u32 {
    let mut bit_count = 4;
    while (1usize << bit_count) < decompressed_in_chunk {
        bit_count += 1;
    }
    bit_count
}

/// Decompress a CompressedContainer.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let Some(&signature) = data.first() else {
        return Err(CodexError::decompression(0, "empty container"));
    };
    if signature != CONTAINER_SIGNATURE {
        return Err(CodexError::decompression(
            0,
            format!("invalid signature byte 0x{:02X}", signature),
        ));
    }

    let mut out = Vec::with_capacity(data.len() * 2);
    let mut pos = 1;

    while pos < data.len() {
        if pos + 2 > data.len() {
            return Err(CodexError::decompression(pos, "truncated chunk header"));
        }
        let header = u16::from_le_bytes([data[pos], data[pos + 1]]);
        let chunk_size = (header & 0x0FFF) as usize + 3;
        let chunk_signature = (header >> 12) & 0x07;
        let compressed = header & 0x8000 != 0;

        if chunk_signature != CHUNK_SIGNATURE {
            return Err(CodexError::decompression(
                pos,
                format!("invalid chunk signature 0b{:03b}", chunk_signature),
            ));
        }

        let chunk_end = (pos + chunk_size).min(data.len());
        pos += 2;

        if !compressed {
            let end = (pos + RAW_CHUNK_SIZE).min(data.len());
            out.extend_from_slice(&data[pos..end]);
            pos = end;
            continue;
        }

        let chunk_start = out.len();
        while pos < chunk_end {
            let flags = data[pos];
            pos += 1;

            for bit in 0..8 {
                if pos >= chunk_end {
                    break;
                }

                if flags & (1 << bit) == 0 {
                    out.push(data[pos]);
                    pos += 1;
                    continue;
                }

                if pos + 2 > chunk_end {
                    return Err(CodexError::decompression(pos, "truncated copy token"));
                }
                let token = u16::from_le_bytes([data[pos], data[pos + 1]]);

                let decompressed = out.len() - chunk_start;
                if decompressed == 0 {
                    return Err(CodexError::decompression(
                        pos,
                        "copy token at start of chunk",
                    ));
                }

                let bit_count = copy_token_bit_count(decompressed);
                let length_mask = 0xFFFFu16 >> bit_count;
                let length = (token & length_mask) as usize + 3;
                let offset = ((token & !length_mask) >> (16 - bit_count)) as usize + 1;

                if offset > decompressed {
                    return Err(CodexError::decompression(
                        pos,
                        format!(
                            "copy offset {} exceeds {} decompressed bytes",
                            offset, decompressed
                        ),
                    ));
                }

                // Byte by byte: source and destination may overlap
                let src = out.len() - offset;
                for i in 0..length {
                    let byte = out[src + i];
                    out.push(byte);
                }
                pos += 2;
            }
        }
        pos = chunk_end;
    }

    Ok(out)
}

/// Encode data as literal-only compressed chunks. Valid input for [`decompress`].
#[cfg(test)]
pub(crate) fn compress_literal(data: &[u8]) -> Vec<u8> {
    const CHUNK: usize = 3000;

    let mut out = vec![CONTAINER_SIGNATURE];
    for chunk in data.chunks(CHUNK) {
        let mut body = Vec::with_capacity(chunk.len() + chunk.len() / 8 + 1);
        for group in chunk.chunks(8) {
            body.push(0x00);
            body.extend_from_slice(group);
        }
        let size = body.len() + 2;
        let header = ((size - 3) as u16) | 0xB000;
        out.extend_from_slice(&header.to_le_bytes());
        out.extend_from_slice(&body);
    }
    out
}
