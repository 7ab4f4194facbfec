//! Binary file inspection: sniffing and hex previews.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::constants::binary::{NON_TEXT_THRESHOLD, SNIFF_SAMPLE_SIZE};
use crate::types::Result;

/// Whether a byte counts as text for sniffing purposes
fn is_text_byte(b: u8) -> bool {
    matches!(b, 7 | 8 | 9 | 10 | 12 | 13 | 27) || (b >= 0x20 && b != 0x7F)
}

/// Read up to `limit` bytes from the start of a file
fn read_head(path: &Path, limit: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit);
    File::open(path)?.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Whether a sample of bytes looks binary
pub fn looks_binary(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    let non_text = sample.iter().filter(|b| !is_text_byte(**b)).count();
    non_text as f64 / sample.len() as f64 > NON_TEXT_THRESHOLD
}

/// Check if a file is binary by examining its first bytes.
/// Unreadable files are reported as not binary.
pub fn is_binary_file(path: &Path) -> bool {
    match read_head(path, SNIFF_SAMPLE_SIZE) {
        Ok(sample) => looks_binary(&sample),
        Err(e) => {
            tracing::debug!("Cannot sniff {}: {}", path.display(), e);
            false
        }
    }
}

/// Space-separated lowercase hex of a byte slice
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formatted hexadecimal preview of the first `max_bytes` of a file.
pub fn hex_preview(path: &Path, max_bytes: usize) -> Result<String> {
    let data = read_head(path, max_bytes)?;
    if data.is_empty() {
        return Ok("Empty file".to_string());
    }

    let size = std::fs::metadata(path)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut lines = vec![
        format!("File: {}", name),
        format!("Size: {} bytes", size),
        format!("Preview: first {} bytes", data.len()),
        "=".repeat(75),
        String::new(),
        "Offset    00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  ASCII".to_string(),
        "-".repeat(75),
    ];

    for (row, chunk) in data.chunks(16).enumerate() {
        let left = chunk
            .iter()
            .take(8)
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let right = chunk
            .iter()
            .skip(8)
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if (32..127).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();

        lines.push(format!(
            "{:08X}  {:<23}  {:<23}  {}",
            row * 16,
            left,
            right,
            ascii
        ));
    }

    if data.len() == max_bytes {
        lines.push(String::new());
        lines.push(format!("... (truncated at {} bytes)", max_bytes));
    }

    Ok(lines.join("\n"))
}
