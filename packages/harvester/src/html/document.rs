//! Pre-order index over the elements of a parsed document.
//!
//! Every element gets a position in document order. A node `a` is an ancestor
//! of `b` iff `a < b <= subtree_end(a)`, and `a` precedes `b` (XPath
//! `preceding::`) iff `subtree_end(a) < b`. The hierarchy classifier relies on
//! both properties to answer "nearest preceding heading" without rescanning the
//! document for every node.

use scraper::ElementRef;

use super::utils::{direct_text, element_children, is_skipped};

/// One element in document order.
#[derive(Debug, Clone)]
pub struct IndexedNode<'a> {
    pub element: ElementRef<'a>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Index of the last node inside this node's subtree (inclusive).
    pub subtree_end: usize,
    /// Node or one of its ancestors is hidden or a non-content tag.
    pub skipped: bool,
    /// Subtree carries visible, non-blank text.
    pub has_text: bool,
    /// Own text nodes carry non-blank text.
    pub has_direct_text: bool,
}

/// Elements of a document in pre-order.
#[derive(Debug, Clone)]
pub struct IndexedDocument<'a> {
    nodes: Vec<IndexedNode<'a>>,
}

impl<'a> IndexedDocument<'a> {
    /// Index the subtree rooted at `root` (usually `Html::root_element()`).
    pub fn build(root: ElementRef<'a>) -> Self {
        let mut nodes = Vec::new();
        Self::push(root, None, false, &mut nodes);
        Self { nodes }
    }

    fn push(
        element: ElementRef<'a>,
        parent: Option<usize>,
        parent_skipped: bool,
        nodes: &mut Vec<IndexedNode<'a>>,
    ) -> usize {
        let index = nodes.len();
        let skipped = parent_skipped || is_skipped(element);
        let has_direct_text = !skipped && !direct_text(element).is_empty();

        nodes.push(IndexedNode {
            element,
            parent,
            children: Vec::new(),
            subtree_end: index,
            skipped,
            has_text: has_direct_text,
            has_direct_text,
        });

        let mut children = Vec::new();
        let mut child_text = false;
        for child in element_children(element) {
            let child_index = Self::push(child, Some(index), skipped, nodes);
            child_text |= nodes[child_index].has_text;
            children.push(child_index);
        }

        let end = nodes.len() - 1;
        let node = &mut nodes[index];
        node.children = children;
        node.subtree_end = end;
        node.has_text |= child_text;
        index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &IndexedNode<'a> {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[IndexedNode<'a>] {
        &self.nodes
    }

    /// `ancestor` strictly contains `node`.
    pub fn is_ancestor(&self, ancestor: usize, node: usize) -> bool {
        ancestor < node && node <= self.nodes[ancestor].subtree_end
    }

    /// Indices of the ancestors of `index`, nearest first.
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.nodes[index].parent, move |&i| self.nodes[i].parent)
    }

    /// First node (in document order) matching the predicate.
    pub fn find(&self, mut predicate: impl FnMut(&IndexedNode<'a>) -> bool) -> Option<usize> {
        self.nodes.iter().position(|node| predicate(node))
    }

    /// Element siblings following `index`, in document order.
    pub fn following_siblings(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let siblings: &[usize] = match self.nodes[index].parent {
            Some(parent) => &self.nodes[parent].children,
            None => &[],
        };
        let start = siblings.iter().position(|&i| i == index).map_or(siblings.len(), |p| p + 1);
        siblings[start..].iter().copied()
    }
}
