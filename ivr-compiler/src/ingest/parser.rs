//! Format parser: raw upload bytes → [`RawNode`]
//!
//! A declared, recognized extension is parsed with that format only: a
//! malformed `.yaml` file must fail rather than be mis-read as something
//! else. Unrecognized or missing extensions try every format in
//! [`SourceFormat::FALLBACK_ORDER`] and keep the first that parses cleanly.

use serde_json::Value;
use thiserror::Error;

use super::format::SourceFormat;
use super::opml::parse_opml;
use super::raw::RawNode;

/// Ingestion failure; no build is created
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Input is empty")]
    Empty,

    #[error("Input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Invalid {format} document: {message}")]
    Malformed { format: SourceFormat, message: String },

    #[error("Unrecognized input, no supported format matched ({})", .attempts.join("; "))]
    NoMatchingFormat { attempts: Vec<String> },
}

/// Successfully parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub format: SourceFormat,
    pub root: RawNode,
}

/// Parse `bytes`, using `declared_extension` to pick the format when recognized
pub fn parse(bytes: &[u8], declared_extension: Option<&str>) -> Result<ParsedDocument, ParseError> {
    let content = std::str::from_utf8(bytes)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if content.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(format) = declared_extension.and_then(SourceFormat::from_extension) {
        tracing::debug!(%format, "Parsing upload with declared format");
        let root = parse_as(format, content).map_err(|message| ParseError::Malformed { format, message })?;
        return Ok(ParsedDocument { format, root });
    }

    let mut attempts = Vec::with_capacity(SourceFormat::FALLBACK_ORDER.len());
    for format in SourceFormat::FALLBACK_ORDER {
        match parse_as(format, content) {
            Ok(root) => {
                tracing::debug!(%format, rejected = attempts.len(), "Detected upload format");
                return Ok(ParsedDocument { format, root });
            }
            Err(message) => attempts.push(format!("{}: {}", format, message)),
        }
    }

    Err(ParseError::NoMatchingFormat { attempts })
}

/// Parse with one format; the error string describes why it was rejected
fn parse_as(format: SourceFormat, content: &str) -> Result<RawNode, String> {
    let value = match format {
        SourceFormat::Opml => return parse_opml(content),
        SourceFormat::Json => serde_json::from_str::<Value>(content).map_err(|e| e.to_string())?,
        SourceFormat::Yaml => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string())?,
        SourceFormat::Toml => toml::from_str::<Value>(content).map_err(|e| e.to_string())?,
    };

    match value {
        Value::Array(_) | Value::Object(_) => Ok(RawNode::from_value(value)),
        _ => Err("document root must be a mapping or a sequence".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE_JSON: &str = r#"{"text": "Main menu", "children": [{"text": "A"}, {"text": "B"}]}"#;

    #[test]
    fn test_declared_format_is_used() {
        let doc = parse(TREE_JSON.as_bytes(), Some("json")).unwrap();
        assert_eq!(doc.format, SourceFormat::Json);
    }

    #[test]
    fn test_declared_format_never_falls_back() {
        // Valid YAML, but declared JSON
        let yaml = "text: Main menu\nchildren:\n  - text: A\n";
        let err = parse(yaml.as_bytes(), Some("json")).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { format: SourceFormat::Json, .. }));

        // Same bytes parse fine when undeclared
        assert_eq!(parse(yaml.as_bytes(), None).unwrap().format, SourceFormat::Yaml);
    }

    #[test]
    fn test_fallback_prefers_json_over_yaml() {
        let doc = parse(TREE_JSON.as_bytes(), Some("txt")).unwrap();
        assert_eq!(doc.format, SourceFormat::Json);
    }

    #[test]
    fn test_fallback_detects_opml_and_toml() {
        let opml = r#"<opml><body><outline text="Root"/></body></opml>"#;
        assert_eq!(parse(opml.as_bytes(), None).unwrap().format, SourceFormat::Opml);

        // A bare YAML scalar is rejected structurally, TOML then accepts it
        let toml = "text = \"Root\"\n\n[[options]]\ntext = \"A\"\n";
        assert_eq!(parse(toml.as_bytes(), None).unwrap().format, SourceFormat::Toml);
    }

    #[test]
    fn test_truncated_input_matches_nothing() {
        let err = parse(br#"{"text": "Main menu", "children": ["#, None).unwrap_err();
        match err {
            ParseError::NoMatchingFormat { attempts } => assert_eq!(attempts.len(), 4),
            other => panic!("expected NoMatchingFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_document_is_structural_error() {
        let err = parse(b"\"just a string\"", Some("json")).unwrap_err();
        assert!(err.to_string().contains("mapping or a sequence"));
    }

    #[test]
    fn test_empty_and_binary_input() {
        assert!(matches!(parse(b"  \n ", None), Err(ParseError::Empty)));
        assert!(matches!(parse(&[0xff, 0xfe, 0x00], None), Err(ParseError::Encoding(_))));
    }
}
