use anyhow::{Context, Result};
use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::derive::BASE_SALARY;

pub const DEFAULT_BASE_URL: &str = "https://techpays.eu/europe";

/// Run settings: built-in defaults, then `techpays.toml` if present, then
/// `TECHPAYS_*` environment variables. CLI flags override per invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub group_field: String,
    pub target_field: String,
    pub min_entries: usize,
    pub top_n: usize,
    pub descending: bool,
    pub histogram_bins: usize,
    pub out_dir: String,
    pub cache_path: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::builder()?
            .add_source(File::with_name("techpays").required(false))
            .add_source(Environment::with_prefix("TECHPAYS"))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("group_field", "companyName")?
            .set_default("target_field", BASE_SALARY)?
            .set_default("min_entries", 10)?
            .set_default("top_n", 40)?
            .set_default("descending", true)?
            .set_default("histogram_bins", 25)?
            .set_default("out_dir", ".")?
            .set_default("cache_path", "data/techpays.sqlite")?)
    }
}
