use crate::error::{Error, Result};

/// Assignment that introduces the compensation literal in the page script.
pub const START_MARKER: &str = "COMPENSATION_LIST = ";
pub const END_MARKER: &str = "</script>";

/// Slice the text between `start` and the first `</script>` after it.
pub fn extract_between<'a>(html: &'a str, start: &str) -> Result<&'a str> {
    let from = html
        .find(start)
        .map(|i| i + start.len())
        .ok_or_else(|| Error::Extraction(format!("start marker {:?} absent", start)))?;
    let len = html[from..].find(END_MARKER).ok_or_else(|| {
        Error::Extraction(format!("no {} after marker {:?}", END_MARKER, start))
    })?;
    Ok(&html[from..from + len])
}

/// Raw compensation literal embedded in a techpays page.
pub fn extract_payload(html: &str) -> Result<&str> {
    extract_between(html, START_MARKER)
}
