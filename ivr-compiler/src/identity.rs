//! Node identity and artifact path assignment
//!
//! One pre-order pass gives every node, root included, a fresh UUID and the
//! candidate artifact path `<build_id>/<node_id>.<ext>`. The compiler's work
//! list is built from the same pre-order so both agree on node count and
//! order.

use uuid::Uuid;

use crate::models::IvrNode;

/// Artifact path of a node, relative to the audio root
pub fn artifact_path(build_id: Uuid, node_id: &str, extension: &str) -> String {
    format!("{}/{}.{}", build_id, node_id, extension)
}

/// Assign ids and candidate paths to every node of `root`
///
/// Must run once per tree, before any synthesis. Returns the number of nodes
/// visited.
pub fn assign(root: &mut IvrNode, build_id: Uuid, extension: &str) -> usize {
    let mut visited = 0;
    root.visit_preorder_mut(&mut |_, node| {
        debug_assert!(node.node_id.is_empty(), "node identity assigned twice");
        let node_id = Uuid::new_v4().to_string();
        let artifact = artifact_path(build_id, &node_id, extension);
        node.set_identity(node_id, artifact);
        visited += 1;
    });

    tracing::debug!(%build_id, nodes = visited, "Assigned node identities");
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn menu() -> IvrNode {
        IvrNode::new(
            "Main menu",
            vec![
                IvrNode::new("Billing", vec![IvrNode::leaf("Card"), IvrNode::leaf("Invoice")]),
                IvrNode::new("Support", vec![IvrNode::leaf("Hours")]),
                IvrNode::leaf("Operator"),
            ],
        )
    }

    #[test]
    fn test_ids_are_unique_and_cover_every_node() {
        let mut tree = menu();
        let build_id = Uuid::new_v4();

        let visited = assign(&mut tree, build_id, "mp3");

        let nodes = tree.preorder();
        assert_eq!(visited, nodes.len());
        assert_eq!(visited, tree.node_count());

        let ids: HashSet<&str> = nodes.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(ids.len(), visited, "ids must be pairwise distinct");
        assert!(!ids.contains(""));
    }

    #[test]
    fn test_artifact_paths_are_scoped_to_build() {
        let mut tree = menu();
        let build_id = Uuid::new_v4();
        assign(&mut tree, build_id, "mp3");

        for node in tree.preorder() {
            assert_eq!(node.artifact(), artifact_path(build_id, &node.node_id, "mp3"));
            assert!(node.artifact().starts_with(&build_id.to_string()));
            assert!(node.audio_path.is_none(), "audio stays absent until synthesized");
        }
    }

    #[test]
    fn test_two_builds_of_same_tree_do_not_collide() {
        let mut first = menu();
        let mut second = menu();
        assign(&mut first, Uuid::new_v4(), "mp3");
        assign(&mut second, Uuid::new_v4(), "mp3");

        let first_ids: HashSet<String> = first.preorder().iter().map(|n| n.node_id.clone()).collect();
        assert!(second.preorder().iter().all(|n| !first_ids.contains(&n.node_id)));
    }
}
