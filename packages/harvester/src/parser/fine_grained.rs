//! Fine-grained-preferred selection.

use super::policy::{Selection, SelectionPolicy};
use crate::classify::HierarchyClassifier;
use crate::html::{is_phrasing_tag, tag_name, IndexedDocument, IndexedNode};

/// Persist the finest nodes that carry text.
///
/// A node is persisted when it has visible text and no block-level child
/// carries text of its own. Inline children (`em`, `a`, `span`, ...) belong to
/// their block, so `<p>Arbetsgivaren <em>ska</em></p>` is one element. A node
/// with text of its own next to text-bearing blocks (`<li>a<ul>..</ul></li>`)
/// is persisted whole. Descendants of a persisted node are never persisted, so
/// no text appears in two snippets.
pub struct FineGrainedPolicy;

impl SelectionPolicy for FineGrainedPolicy {
    fn name(&self) -> &'static str {
        "fine-grained"
    }

    fn select(&self, classifier: &HierarchyClassifier<'_, '_>, root: usize) -> Vec<Selection> {
        let mut selected = Vec::new();
        visit(classifier, root, false, &mut selected);
        selected
    }
}

fn visit(
    classifier: &HierarchyClassifier<'_, '_>,
    index: usize,
    covered: bool,
    selected: &mut Vec<Selection>,
) {
    let document = classifier.document();
    let node = document.node(index);
    if node.skipped {
        return;
    }

    let persist = !covered
        && node.has_text
        && (node.has_direct_text || !has_text_bearing_block(document, node));

    if persist {
        selected.push(Selection {
            node: index,
            hierarchy: classifier.classify(index),
        });
    }

    for &child in &node.children {
        visit(classifier, child, covered || persist, selected);
    }
}

fn has_text_bearing_block(document: &IndexedDocument<'_>, node: &IndexedNode<'_>) -> bool {
    node.children.iter().any(|&child| {
        let child = document.node(child);
        child.has_text && !is_phrasing_tag(tag_name(child.element))
    })
}
