//! OPML outline reader
//!
//! ```xml
//! <opml version="2.0">
//!   <body>
//!     <outline text="Main menu">
//!       <outline text="Press 1 for billing"/>
//!     </outline>
//!   </body>
//! </opml>
//! ```
//!
//! Each `<outline>` becomes a record whose label is its `text` attribute
//! (`title` as fallback) and whose children are its nested outlines. One
//! top-level outline is the root; several form an implicit-root sequence.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::raw::RawNode;

/// Deepest accepted outline nesting, the same bound serde_json applies
pub const MAX_OUTLINE_DEPTH: usize = 128;

/// Outline under construction
struct OpenOutline {
    text: Option<String>,
    children: Vec<RawNode>,
}

pub fn parse_opml(input: &str) -> Result<RawNode, String> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);

    let mut seen_opml = false;
    let mut closed_opml = false;
    let mut in_body = false;
    let mut open: Vec<OpenOutline> = Vec::new();
    let mut top_level: Vec<RawNode> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{} at byte {}", e, reader.buffer_position()))?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"opml" => seen_opml = true,
                b"body" if seen_opml => in_body = true,
                b"outline" if in_body => {
                    check_depth(open.len() + 1)?;
                    open.push(OpenOutline {
                        text: outline_text(&e)?,
                        children: Vec::new(),
                    });
                }
                _ => {}
            },
            Event::Empty(e) => {
                if in_body && e.local_name().as_ref() == b"outline" {
                    check_depth(open.len() + 1)?;
                    let leaf = RawNode::Record {
                        text: outline_text(&e)?,
                        children: None,
                        options: None,
                    };
                    attach(&mut open, &mut top_level, leaf);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"outline" if in_body => {
                    let outline = open
                        .pop()
                        .ok_or_else(|| "unbalanced </outline>".to_string())?;
                    let node = RawNode::Record {
                        text: outline.text,
                        children: (!outline.children.is_empty()).then_some(outline.children),
                        options: None,
                    };
                    attach(&mut open, &mut top_level, node);
                }
                b"body" => in_body = false,
                b"opml" => closed_opml = true,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_opml {
        return Err("missing <opml> root element".to_string());
    }
    if !open.is_empty() || !closed_opml {
        return Err("truncated document: unclosed elements at end of input".to_string());
    }

    match top_level.len() {
        0 => Err("no <outline> elements in <body>".to_string()),
        1 => Ok(top_level.remove(0)),
        _ => Ok(RawNode::Sequence(top_level)),
    }
}

fn check_depth(depth: usize) -> Result<(), String> {
    if depth > MAX_OUTLINE_DEPTH {
        return Err(format!("outline nesting exceeds {} levels", MAX_OUTLINE_DEPTH));
    }
    Ok(())
}

fn attach(open: &mut [OpenOutline], top_level: &mut Vec<RawNode>, node: RawNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top_level.push(node),
    }
}

fn outline_text(element: &BytesStart<'_>) -> Result<Option<String>, String> {
    for key in ["text", "title"] {
        if let Some(attr) = element.try_get_attribute(key).map_err(|e| e.to_string())? {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
