//! Shorthand assembler for raw frames.
//!
//! A line expands into one or more frame bodies (without checksum):
//!
//! | Input | Expansion |
//! |-------|-----------|
//! | `r05`, `read 05` | `aa05` |
//! | `w04 32`, `write 04 32` | `330432` |
//! | `w scene 0a` | `3305040a` |
//! | `w05 param` | `330504` |
//! | `restart01` | `330e01` |
//! | `r/01,04,05` | `aa01`, `aa04`, `aa05` |
//! | `ra5/00-02/` | `aaa500`, `aaa501`, `aaa502` |
//! | `w/04/32` | `330432` |
//!
//! With slashes the line is `prefix/items/suffix`; each comma-separated item
//! is placed between prefix and suffix, and an item `a-b` expands to every
//! single byte from `a` to `b` inclusive.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error("Too many assembly parts")]
    TooManyParts,

    #[error("Invalid hex: {0:?}")]
    InvalidHex(String),

    #[error("Invalid range: {0:?}")]
    InvalidRange(String),
}

/// Assemble one word: command mnemonics and keywords, then hex.
pub fn assemble_word(word: &str) -> Result<Vec<u8>, AsmError> {
    let word = word.trim().to_lowercase();
    let expanded = expand_command(&word);

    let text: String = expanded
        .split_whitespace()
        .map(|token| match token {
            "scene" => "0504",
            "param" => "04",
            other => other,
        })
        .collect();

    hex::decode(&text).map_err(|_| AsmError::InvalidHex(word.clone()))
}

fn expand_command(word: &str) -> String {
    for (mnemonic, byte) in [("read", "aa"), ("write", "33"), ("r", "aa"), ("w", "33")] {
        if let Some(rest) = word.strip_prefix(mnemonic) {
            return format!("{byte} {rest}");
        }
    }
    word.to_string()
}

/// Parse `a-b` into an inclusive byte range.
fn parse_range(item: &str) -> Result<Option<(u8, u8)>, AsmError> {
    let Some((start, end)) = item.split_once('-') else {
        return Ok(None);
    };
    let bound = |s: &str| {
        u8::from_str_radix(s.trim(), 16).map_err(|_| AsmError::InvalidRange(item.to_string()))
    };
    let (start, end) = (bound(start)?, bound(end)?);
    if start > end {
        return Err(AsmError::InvalidRange(item.to_string()));
    }
    Ok(Some((start, end)))
}

/// Assemble a line into frame bodies, in send order.
pub fn assemble(line: &str) -> Result<Vec<Vec<u8>>, AsmError> {
    let line = line.trim().to_lowercase();
    if let Some(rest) = line.strip_prefix("restart") {
        return Ok(vec![assemble_word(&format!("w0e{rest}"))?]);
    }

    let parts: Vec<&str> = line.split('/').collect();
    let (prefix, items, suffix) = match parts.as_slice() {
        [items] => (Vec::new(), *items, Vec::new()),
        [prefix, items] => (assemble_word(prefix)?, *items, Vec::new()),
        [prefix, items, suffix] => (assemble_word(prefix)?, *items, assemble_word(suffix)?),
        _ => return Err(AsmError::TooManyParts),
    };

    let mut frames = Vec::new();
    for item in items.split(',') {
        match parse_range(item)? {
            Some((start, end)) => {
                for byte in start..=end {
                    frames.push([prefix.as_slice(), &[byte], suffix.as_slice()].concat());
                }
            }
            None => {
                let body = assemble_word(item)?;
                frames.push([prefix.as_slice(), &body, suffix.as_slice()].concat());
            }
        }
    }
    Ok(frames)
}
