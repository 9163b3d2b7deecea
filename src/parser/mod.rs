pub mod decode;
pub mod extract;
pub mod repair;

use tracing::debug;

use crate::error::Result;
use crate::record::Dataset;
use repair::{LineRepair, Repair};

/// Three-stage pipeline: html → embedded literal → strict JSON → dataset.
pub fn parse_page(html: &str) -> Result<Dataset> {
    parse_page_with(html, &LineRepair)
}

pub fn parse_page_with<R: Repair + ?Sized>(html: &str, repairer: &R) -> Result<Dataset> {
    let raw = extract::extract_payload(html)?;
    debug!(bytes = raw.len(), "extracted payload");
    let json = repairer.repair(raw);
    let dataset = decode::decode(&json)?;
    debug!(records = dataset.len(), "decoded payload");
    Ok(dataset)
}

// ── Tests ──
