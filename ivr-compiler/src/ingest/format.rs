//! Supported input serialization formats

use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialization formats a menu tree can be uploaded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Json,
    Opml,
    Yaml,
    Toml,
}

impl SourceFormat {
    /// Order tried when the declared extension is not recognized
    ///
    /// Strict grammars come first: YAML accepts most JSON and a good deal of
    /// plain text, so it must not shadow them.
    pub const FALLBACK_ORDER: [SourceFormat; 4] = [
        SourceFormat::Json,
        SourceFormat::Opml,
        SourceFormat::Yaml,
        SourceFormat::Toml,
    ];

    /// Map a file extension or format hint ("json", ".YML", "opml") to a format
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(SourceFormat::Json),
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            "opml" | "xml" => Some(SourceFormat::Opml),
            "toml" => Some(SourceFormat::Toml),
            _ => None,
        }
    }

    /// Extension of a file name, if any (`menu.tree.yaml` → `yaml`)
    pub fn extension_of(file_name: &str) -> Option<&str> {
        std::path::Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Json => "json",
            SourceFormat::Opml => "opml",
            SourceFormat::Yaml => "yaml",
            SourceFormat::Toml => "toml",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
