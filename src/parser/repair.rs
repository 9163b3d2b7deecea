//! Rewrites the page's JavaScript object literal into strict JSON.
//!
//! The payload is pretty-printed with one structural token or one
//! `key: value` pair per line, and this transform leans on that layout
//! entirely. Input that breaks the layout yields JSON the decoder rejects
//! (or, for apostrophes inside strings, silently different text).

/// Turns an extracted literal into text a strict JSON reader accepts.
pub trait Repair {
    fn repair(&self, raw: &str) -> String;
}

/// Line-oriented repair matching the techpays serialization style.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineRepair;

impl Repair for LineRepair {
    fn repair(&self, raw: &str) -> String {
        repair_lines(raw)
    }
}

fn is_structural(trimmed: &str) -> bool {
    trimmed.is_empty() || trimmed.starts_with(['{', '}', '[', ']'])
}

/// Quote the key of a `key: value` line. Only the first colon splits, so
/// values may contain colons.
fn quote_key(trimmed: &str) -> String {
    match trimmed.split_once(':') {
        Some((key, value)) => format!("\"{}\":{}", key, value),
        None => format!("\"{}\"", trimmed),
    }
}

pub fn repair_lines(raw: &str) -> String {
    // Single quotes become double quotes wholesale; an apostrophe inside a
    // string value is not distinguished from a delimiter.
    let text = raw.replace('\'', "\"");

    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let trimmed = line.trim();
            if is_structural(trimmed) {
                line.to_string()
            } else {
                quote_key(trimmed)
            }
        })
        .collect();

    // Last line is the tail of the assignment statement.
    lines.pop();

    let n = lines.len();
    if n >= 2 {
        lines[n - 2] = "}".to_string();
        lines[n - 1] = "]".to_string();
    }

    lines.join("\n")
}
