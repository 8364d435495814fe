//! Tree normalizer: [`RawNode`] → canonical [`IvrNode`]
//!
//! Rules, first match wins:
//! 1. A sequence becomes a synthesized node labelled "Start" whose children
//!    are the normalized elements.
//! 2. A record takes `text` (empty when missing) and its children from
//!    `children`, else `options`, else none.
//! 3. A scalar becomes a leaf labelled with its value.
//! 4. An empty entry becomes an unlabelled leaf.
//!
//! Normalization never fails. Ownership guarantees the result is a
//! single-rooted tree without shared or cyclic children.

use super::raw::RawNode;
use crate::models::IvrNode;

/// Label of the root synthesized for list-shaped documents
pub const IMPLICIT_ROOT_TEXT: &str = "Start";

pub fn normalize(raw: RawNode) -> IvrNode {
    match raw {
        RawNode::Sequence(items) => IvrNode::new(IMPLICIT_ROOT_TEXT, normalize_all(items)),
        RawNode::Record { text, children, options } => {
            let children = children.or(options).unwrap_or_default();
            IvrNode::new(text.unwrap_or_default(), normalize_all(children))
        }
        RawNode::Scalar(text) => IvrNode::leaf(text),
        RawNode::Empty => IvrNode::leaf(""),
    }
}

fn normalize_all(items: Vec<RawNode>) -> Vec<IvrNode> {
    items.into_iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: Option<&str>, children: Option<Vec<RawNode>>, options: Option<Vec<RawNode>>) -> RawNode {
        RawNode::Record {
            text: text.map(str::to_string),
            children,
            options,
        }
    }

    #[test]
    fn test_sequence_gets_start_root() {
        let tree = normalize(RawNode::Sequence(vec![
            record(Some("Billing"), None, None),
            RawNode::Scalar("Support".to_string()),
        ]));

        assert_eq!(tree.text, "Start");
        let labels: Vec<&str> = tree.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(labels, ["Billing", "Support"]);
    }

    #[test]
    fn test_children_take_priority_over_options() {
        let tree = normalize(record(
            Some("Root"),
            Some(vec![RawNode::Scalar("from children".to_string())]),
            Some(vec![RawNode::Scalar("from options".to_string())]),
        ));
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].text, "from children");
    }

    #[test]
    fn test_options_used_without_children() {
        let tree = normalize(record(
            Some("Root"),
            None,
            Some(vec![RawNode::Scalar("A".to_string()), RawNode::Scalar("B".to_string())]),
        ));
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn test_missing_text_defaults_to_empty() {
        let tree = normalize(record(None, None, None));
        assert_eq!(tree.text, "");
        assert!(tree.is_leaf());

        assert_eq!(normalize(RawNode::Empty).text, "");
    }

    #[test]
    fn test_nested_sequence_is_normalized_recursively() {
        let tree = normalize(record(
            Some("Root"),
            Some(vec![RawNode::Sequence(vec![RawNode::Scalar("Deep".to_string())])]),
            None,
        ));
        assert_eq!(tree.children[0].text, IMPLICIT_ROOT_TEXT);
        assert_eq!(tree.children[0].children[0].text, "Deep");
        assert_eq!(tree.node_count(), 3);
    }
}
