//! Boundary-walk selection.

use super::policy::{Selection, SelectionPolicy};
use crate::classify::{Boundary, HierarchyClassifier};
use crate::config::{GENERAL_RECOMMENDATION_CLASS, PREAMBLE_CLASS, PROVISION_CLASS};
use crate::html::{has_class, is_heading_tag, tag_name, IndexedDocument};
use crate::types::{Hierarchy, Scope};

/// Div classes that only wrap other content.
const WRAPPER_CLASSES: &[&str] = &[
    "paragraph",
    PROVISION_CLASS,
    GENERAL_RECOMMENDATION_CLASS,
    PREAMBLE_CLASS,
];

/// Walk from each structural boundary to the next.
///
/// Boundaries are the section signs, the appendix headings and the
/// transitional heading. From each boundary the following siblings are
/// visited until the next section sign or boundary heading; every
/// content-bearing node in that span gets the boundary's hierarchy. The
/// preamble, if any, is emitted first as root-level content.
pub struct BoundaryWalkPolicy;

impl SelectionPolicy for BoundaryWalkPolicy {
    fn name(&self) -> &'static str {
        "boundary-walk"
    }

    fn select(&self, classifier: &HierarchyClassifier<'_, '_>, root: usize) -> Vec<Selection> {
        let document = classifier.document();
        let in_root = |index: usize| index == root || document.is_ancestor(root, index);
        let mut walk = Walk {
            classifier,
            selected: Vec::new(),
        };

        let preamble = (root..=document.node(root).subtree_end).find(|&i| {
            let node = document.node(i);
            !node.skipped && has_class(node.element, PREAMBLE_CLASS)
        });
        if let Some(preamble) = preamble {
            for &child in &document.node(preamble).children {
                walk.emit_tree(child, &Hierarchy::root());
            }
        }

        for &(sign, number) in classifier.section_signs() {
            if !in_root(sign) || document.node(sign).skipped {
                continue;
            }
            // Signs inside appendices or transitional provisions belong to those spans
            let Scope::Section { chapter, .. } = classifier.classify_position(sign).scope else {
                continue;
            };
            walk.section_span(sign, chapter, number);
        }

        for (heading, boundary) in classifier.boundaries() {
            if !in_root(*heading) {
                continue;
            }
            match boundary {
                Boundary::Appendix(appendix) => {
                    walk.heading_span(*heading, Hierarchy::appendix(appendix.clone()));
                }
                Boundary::Transitional => walk.heading_span(*heading, Hierarchy::transitional()),
                Boundary::Chapter(_) => {}
            }
        }

        walk.selected
    }
}

struct Walk<'c, 'd, 'a> {
    classifier: &'c HierarchyClassifier<'d, 'a>,
    selected: Vec<Selection>,
}

impl<'d, 'a> Walk<'_, 'd, 'a> {
    fn document(&self) -> &'d IndexedDocument<'a> {
        self.classifier.document()
    }

    fn section_span(&mut self, sign: usize, chapter: Option<i32>, number: i32) {
        let base = Hierarchy::section(chapter, Some(number));
        self.push(sign, &base);

        for sibling in self.document().following_siblings(sign) {
            if self.contains_section_sign(sibling) || self.classifier.boundary_at(sibling).is_some()
            {
                break;
            }
            let node = self.document().node(sibling);
            if node.skipped || !node.has_text {
                continue;
            }
            if is_heading_tag(tag_name(node.element)) {
                // A non-structural heading belongs to the chapter, not the section
                self.push(sibling, &Hierarchy::section(chapter, None));
                continue;
            }
            self.emit_tree(sibling, &base);
        }
    }

    fn heading_span(&mut self, heading: usize, base: Hierarchy) {
        self.push(heading, &base);

        for sibling in self.document().following_siblings(heading) {
            if self.classifier.boundary_at(sibling).is_some() {
                break;
            }
            self.emit_tree(sibling, &base);
        }
    }

    /// Emit every content-bearing node of a subtree, inheriting the advisory
    /// flag from general recommendation containers.
    fn emit_tree(&mut self, index: usize, base: &Hierarchy) {
        let node = self.document().node(index);
        if node.skipped || !node.has_text {
            return;
        }

        let advisory = base.is_general_recommendation
            || has_class(node.element, GENERAL_RECOMMENDATION_CLASS);
        let hierarchy = base.clone().with_general_recommendation(advisory);

        if is_content_bearing(self.document(), index) {
            self.selected.push(Selection {
                node: index,
                hierarchy: hierarchy.clone(),
            });
        }

        for &child in &node.children {
            self.emit_tree(child, &hierarchy);
        }
    }

    fn push(&mut self, index: usize, base: &Hierarchy) {
        let advisory = self.classifier.is_general_recommendation(index);
        self.selected.push(Selection {
            node: index,
            hierarchy: base.clone().with_general_recommendation(advisory),
        });
    }

    fn contains_section_sign(&self, index: usize) -> bool {
        let end = self.document().node(index).subtree_end;
        let signs = self.classifier.section_signs();
        let first = signs.partition_point(|(at, _)| *at < index);
        signs.get(first).is_some_and(|(at, _)| *at <= end)
    }
}

fn is_content_bearing(document: &IndexedDocument<'_>, index: usize) -> bool {
    let node = document.node(index);
    let element = node.element;
    match tag_name(element) {
        "p" | "td" | "th" | "dt" | "dd" | "blockquote" => true,
        "li" => !(index + 1..=node.subtree_end).any(|i| tag_name(document.node(i).element) == "p"),
        "div" => {
            element.value().classes().next().is_some()
                && !WRAPPER_CLASSES.iter().any(|class| has_class(element, class))
        }
        tag => is_heading_tag(tag),
    }
}
