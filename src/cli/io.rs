//! JSON I/O handling for CLI
//!
//! - Input: one JSON query on stdin
//! - Output: one line of text or one JSON object on stdout

use std::io::{self, Read, Write};

use super::errors::{CliError, CliResult};

/// Reads all of stdin as the query text
pub fn read_query() -> CliResult<String> {
    let mut raw = String::new();
    io::stdin().lock().read_to_string(&mut raw)?;
    if raw.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(raw)
}

/// Write a success response to stdout
pub fn write_response(data: serde_json::Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write plain text to stdout
pub fn write_text(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;

    Ok(())
}
