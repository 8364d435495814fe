//! Upload ingestion: format detection, parsing and normalization
//!
//! Everything here is synchronous and in-memory; it runs once per upload
//! before any synthesis is dispatched.

pub mod format;
pub mod normalizer;
pub mod opml;
pub mod parser;
pub mod raw;

pub use format::SourceFormat;
pub use normalizer::{normalize, IMPLICIT_ROOT_TEXT};
pub use parser::{parse, ParseError, ParsedDocument};
pub use raw::RawNode;

use crate::models::IvrNode;

/// Parse and normalize one upload
///
/// Returns the canonical tree and the format it was read as.
pub fn ingest(bytes: &[u8], declared_extension: Option<&str>) -> Result<(IvrNode, SourceFormat), ParseError> {
    let document = parse(bytes, declared_extension)?;
    Ok((normalize(document.root), document.format))
}
