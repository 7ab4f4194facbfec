//! Hexdump Command
//!
//! Usage:
//!   codextract hexdump <file> [--bytes N]

use std::path::Path;

use crate::cli::CommandContext;
use crate::types::{CodexError, Result};
use crate::util::{hex_preview, is_binary_file};

pub fn run(ctx: &CommandContext, file: &Path, bytes: usize) -> Result<()> {
    if !file.is_file() {
        return Err(CodexError::not_found(file));
    }
    if bytes == 0 {
        return Err(CodexError::Config("--bytes must be greater than 0".to_string()));
    }
    if !is_binary_file(file) {
        ctx.output.info("File looks like text; showing raw bytes anyway");
    }
    ctx.output.block(&hex_preview(file, bytes)?);
    Ok(())
}
