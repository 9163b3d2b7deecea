pub mod cache;
pub mod config;
pub mod derive;
pub mod error;
pub mod parser;
pub mod record;
pub mod report;
pub mod source;
pub mod stats;

pub use error::{Error, Result};
pub use record::{Dataset, Record, Scalar};
