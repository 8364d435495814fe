//! Per-node synthesis jobs and their outcomes

use std::path::PathBuf;
use thiserror::Error;

use crate::models::IvrNode;
use crate::services::SynthesisError;

/// One node's work item, detached from the tree so it can run concurrently
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    /// Pre-order position of the node; indexes the result slot
    pub index: usize,
    pub node_id: String,
    /// Whitespace-collapsed prompt
    pub text: String,
    /// Artifact path relative to the audio root
    pub artifact: String,
}

impl SynthesisJob {
    pub fn from_node(index: usize, node: &IvrNode) -> Self {
        Self {
            index,
            node_id: node.node_id.clone(),
            text: node.prompt_text(),
            artifact: node.artifact().to_string(),
        }
    }
}

/// Why a node was left without audio
#[derive(Debug, Error)]
pub enum NodeFailure {
    #[error("Prompt text is empty")]
    EmptyText,

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolved attempt: the artifact path on success
pub type NodeOutcome = Result<String, NodeFailure>;

/// Work list in dispatch order: the pre-order flattening of the assigned tree
pub fn work_list(root: &IvrNode) -> Vec<SynthesisJob> {
    root.preorder()
        .into_iter()
        .enumerate()
        .map(|(index, node)| SynthesisJob::from_node(index, node))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_list_follows_preorder() {
        let mut tree = IvrNode::new(
            "Root",
            vec![IvrNode::new("A", vec![IvrNode::leaf("A1")]), IvrNode::leaf("  B  ")],
        );
        crate::identity::assign(&mut tree, uuid::Uuid::new_v4(), "mp3");

        let jobs = work_list(&tree);
        let texts: Vec<&str> = jobs.iter().map(|j| j.text.as_str()).collect();
        assert_eq!(texts, ["Root", "A", "A1", "B"]);
        assert!(jobs.iter().enumerate().all(|(i, j)| j.index == i));
        assert_eq!(jobs[1].artifact, tree.children[0].artifact());
    }
}
