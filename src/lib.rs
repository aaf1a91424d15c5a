//! Normalize go-zero `.api` documents into a stable JSON shape.
//!
//! ```text
//! .api source ──parser──▶ Document ──normalize──▶ NormalizedSpec ──serde_json──▶ JSON
//! ```

pub mod cli;
pub mod document;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod path_de;
pub mod spec;

pub use document::Document;
pub use error::{Error, Result};
pub use normalize::convert;
pub use parser::{parse_file, parse_source};
pub use spec::{JsonStyle, NormalizedSpec};
