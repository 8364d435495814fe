//! Canonical IVR menu node

use serde::{Deserialize, Serialize};

/// One prompt of the IVR menu and its selectable follow-ups
///
/// Serialized with the external field names consumed by the front end:
/// `id`, `text`, `audio`, `error`, `children`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvrNode {
    /// Prompt content as authored
    pub text: String,

    /// Follow-up options in menu order (empty for a leaf)
    #[serde(default)]
    pub children: Vec<IvrNode>,

    /// Build-unique identifier, assigned once before synthesis
    #[serde(rename = "id", default)]
    pub node_id: String,

    /// Artifact path relative to the audio root, set only when synthesis succeeded
    #[serde(rename = "audio", default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,

    /// Failure recorded for this node's attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Candidate artifact path assigned with the id
    #[serde(skip)]
    artifact: String,
}

impl IvrNode {
    pub fn new(text: impl Into<String>, children: Vec<IvrNode>) -> Self {
        Self {
            text: text.into(),
            children,
            ..Self::default()
        }
    }

    pub fn leaf(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Text sent to the synthesizer: runs of whitespace collapsed to one space, trimmed
    pub fn prompt_text(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Candidate artifact path (`<build_id>/<node_id>.<ext>`), empty before assignment
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub(crate) fn set_identity(&mut self, node_id: String, artifact: String) {
        self.node_id = node_id;
        self.artifact = artifact;
    }

    /// Record a successful attempt
    pub fn mark_synthesized(&mut self, audio_path: String) {
        self.audio_path = Some(audio_path);
        self.error = None;
    }

    /// Record a failed attempt. A node that already has audio keeps it.
    pub fn mark_failed(&mut self, error: String) {
        if self.audio_path.is_none() {
            self.error = Some(error);
        }
    }

    /// Total number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(IvrNode::node_count).sum::<usize>()
    }

    /// Depth-first pre-order listing: parent before children, children in stored order
    pub fn preorder(&self) -> Vec<&IvrNode> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Mutable pre-order walk, same visitation order as [`IvrNode::preorder`]
    ///
    /// The closure receives the node's pre-order index.
    pub fn visit_preorder_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(usize, &mut IvrNode),
    {
        let mut index = 0;
        self.walk_mut(&mut index, f);
    }

    fn walk_mut<F>(&mut self, index: &mut usize, f: &mut F)
    where
        F: FnMut(usize, &mut IvrNode),
    {
        f(*index, self);
        *index += 1;
        for child in &mut self.children {
            child.walk_mut(index, f);
        }
    }
}
