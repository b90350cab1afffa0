//! Utilities (source input, unicode text helpers).

pub mod unicode;

pub use unicode::truncate_display;

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;

/// Source to run: an explicit file, else piped stdin, else nothing.
pub fn read_source(file: Option<&Path>) -> Result<Option<String>> {
    if let Some(path) = file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read source file '{}'", path.display()))?;
        return Ok(Some(text));
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(if buf.is_empty() { None } else { Some(buf) })
}
