//! Turn a documentation site into one printable document: load a seed page,
//! collect the links it points to, render each page to PDF and merge the
//! results behind an index page.

pub mod assemble;
pub mod browser;
pub mod config;
pub mod discover;
pub mod error;
pub mod filter;
pub mod limiter;
pub mod pipeline;
pub mod render;
pub mod sanitizer;
pub mod slug;
pub mod url_norm;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use assemble::AssembledDocument;
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use filter::LinkPattern;
pub use pipeline::{PipelineOptions, SeedRequest, run};
pub use url_norm::{DocumentList, normalize_url};
