//! Hierarchy classification over a pre-built boundary index.

use std::iter::once;

use super::markers::{
    appendix_identifier, chapter_number, is_appendix_heading, is_chapter_heading,
    is_transitional_heading, section_number,
};
use crate::config::{GENERAL_RECOMMENDATION_CLASS, SECTION_SIGN_CLASS};
use crate::html::{attribute, has_class, is_heading_tag, tag_name, visible_text, IndexedDocument};
use crate::types::Hierarchy;

/// Structural boundary announced by a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    Chapter(i32),
    Appendix(String),
    Transitional,
}

/// Classifies nodes of one document into chapter/section/appendix/transitional
/// scopes.
///
/// The document is scanned once on construction to collect every boundary
/// heading and section sign in document order. Classifying a node is then a
/// binary search for the nearest preceding entry.
pub struct HierarchyClassifier<'d, 'a> {
    document: &'d IndexedDocument<'a>,
    boundaries: Vec<(usize, Boundary)>,
    sections: Vec<(usize, i32)>,
    warnings: Vec<String>,
}

impl<'d, 'a> HierarchyClassifier<'d, 'a> {
    /// Build the boundary index for a document.
    pub fn build(document: &'d IndexedDocument<'a>) -> Self {
        let mut boundaries = Vec::new();
        let mut sections = Vec::new();
        let mut warnings = Vec::new();

        for (index, node) in document.nodes().iter().enumerate() {
            if node.skipped {
                continue;
            }
            let element = node.element;
            let tag = tag_name(element);

            if matches!(tag, "h2" | "h3") {
                let text = visible_text(element);
                let id = attribute(element, "id");
                match heading_boundary(&text, id) {
                    Ok(Some(boundary)) => boundaries.push((index, boundary)),
                    Ok(None) => {}
                    Err(message) => {
                        tracing::warn!(heading = %text, "{message}");
                        warnings.push(message);
                    }
                }
            } else if has_class(element, SECTION_SIGN_CLASS) {
                let text = visible_text(element);
                match section_number(&text, attribute(element, "id")) {
                    Some(number) => sections.push((index, number)),
                    None => {
                        let message = format!("section sign without a usable number: '{text}'");
                        tracing::warn!("{message}");
                        warnings.push(message);
                    }
                }
            }
        }

        tracing::debug!(
            boundaries = boundaries.len(),
            sections = sections.len(),
            "Built boundary index"
        );

        Self {
            document,
            boundaries,
            sections,
            warnings,
        }
    }

    /// The indexed document this classifier was built for.
    pub fn document(&self) -> &'d IndexedDocument<'a> {
        self.document
    }

    /// Boundary headings in document order.
    pub fn boundaries(&self) -> &[(usize, Boundary)] {
        &self.boundaries
    }

    /// Section signs in document order.
    pub fn section_signs(&self) -> &[(usize, i32)] {
        &self.sections
    }

    /// Boundary announced by the node at `index`, if it is a boundary heading.
    pub fn boundary_at(&self, index: usize) -> Option<&Boundary> {
        self.boundaries
            .binary_search_by_key(&index, |(at, _)| *at)
            .ok()
            .map(|pos| &self.boundaries[pos].1)
    }

    /// Section number announced by the node at `index`, if it is a section sign.
    pub fn section_sign_at(&self, index: usize) -> Option<i32> {
        self.sections
            .binary_search_by_key(&index, |(at, _)| *at)
            .ok()
            .map(|pos| self.sections[pos].1)
    }

    /// Problems found while indexing (malformed headings or section signs).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Classify the node at `index`.
    ///
    /// Headings (and nodes nested in them) take the hierarchy of the next
    /// content-bearing node: a heading announces the unit that follows it.
    pub fn classify(&self, index: usize) -> Hierarchy {
        let target = self
            .enclosing_heading(index)
            .and_then(|heading| self.next_content_after(heading))
            .unwrap_or(index);
        self.classify_position(target)
    }

    /// Classify the node at `index` by its own position, without the heading rule.
    pub fn classify_position(&self, index: usize) -> Hierarchy {
        let hierarchy = match self.nearest_boundary(index) {
            Some((_, Boundary::Transitional)) => Hierarchy::transitional(),
            Some((_, Boundary::Appendix(appendix))) => Hierarchy::appendix(appendix.clone()),
            Some((at, Boundary::Chapter(chapter))) => {
                Hierarchy::section(Some(*chapter), self.section_for(index, Some(at)))
            }
            None => Hierarchy::section(None, self.section_for(index, None)),
        };
        hierarchy.with_general_recommendation(self.is_general_recommendation(index))
    }

    /// Node is, or sits inside, a general recommendation container.
    pub fn is_general_recommendation(&self, index: usize) -> bool {
        once(index)
            .chain(self.document.ancestors(index))
            .any(|i| has_class(self.document.node(i).element, GENERAL_RECOMMENDATION_CLASS))
    }

    fn enclosing_heading(&self, index: usize) -> Option<usize> {
        once(index)
            .chain(self.document.ancestors(index))
            .find(|&i| is_heading_tag(tag_name(self.document.node(i).element)))
    }

    fn next_content_after(&self, heading: usize) -> Option<usize> {
        let start = self.document.node(heading).subtree_end + 1;
        (start..self.document.len()).find(|&i| {
            let node = self.document.node(i);
            !node.skipped && node.has_direct_text && self.enclosing_heading(i).is_none()
        })
    }

    fn nearest_boundary(&self, index: usize) -> Option<(usize, &Boundary)> {
        let upper = self.boundaries.partition_point(|(at, _)| *at < index);
        self.boundaries[..upper]
            .iter()
            .rev()
            .find(|(at, _)| !self.document.is_ancestor(*at, index))
            .map(|(at, boundary)| (*at, boundary))
    }

    /// Section of a node in chapter scope. A sign inside the node wins (the
    /// node opens that section); otherwise the nearest preceding sign, as long
    /// as it comes after the chapter heading.
    fn section_for(&self, index: usize, chapter_heading: Option<usize>) -> Option<i32> {
        let end = self.document.node(index).subtree_end;
        let lower = self.sections.partition_point(|(at, _)| *at < index);

        if let Some((_, number)) = self.sections.get(lower).filter(|(at, _)| *at <= end) {
            return Some(*number);
        }

        self.sections[..lower]
            .iter()
            .rev()
            .take_while(|(at, _)| chapter_heading.map_or(true, |heading| *at > heading))
            .find(|(at, _)| !self.document.is_ancestor(*at, index))
            .map(|(_, number)| *number)
    }
}

/// Decide which boundary, if any, a heading announces.
///
/// Transitional markers take precedence over appendix markers, which take
/// precedence over chapter numbers.
fn heading_boundary(text: &str, id: Option<&str>) -> Result<Option<Boundary>, String> {
    if is_transitional_heading(text, id) {
        return Ok(Some(Boundary::Transitional));
    }

    if is_appendix_heading(text, id) {
        return appendix_identifier(text, id)
            .map(|appendix| Some(Boundary::Appendix(appendix)))
            .ok_or_else(|| format!("appendix heading without identifier: '{text}'"));
    }

    if is_chapter_heading(text) {
        return chapter_number(text)
            .map(|chapter| Some(Boundary::Chapter(chapter)))
            .ok_or_else(|| format!("chapter number out of range: '{text}'"));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scope;
    use pretty_assertions::assert_eq;
    use scraper::Html;

    const DOC: &str = r#"
        <div class="provision">
          <div class="preamble"><p>Inledning</p></div>
          <h2 id="kap1">1&nbsp;kap. Allmänt</h2>
          <div class="paragraph">
            <span class="section-sign" id="K1P1">1 §</span>
            <p>Föreskrifterna gäller arbetsgivare.</p>
          </div>
          <h2 id="kap2">2 kap. Ansvar</h2>
          <div class="paragraph">
            <span class="section-sign" id="K2P5">5 §</span>
            <p>Arbetsgivaren ska undersöka riskerna.</p>
            <div class="general-recommendation">
              <h4>Allmänna råd</h4>
              <p>Undersökningen bör dokumenteras.</p>
            </div>
          </div>
          <h2 id="bilaga-2a">Bilaga 2A Gränsvärden</h2>
          <p>Tabell över gränsvärden.</p>
          <h2 id="overgangsbestammelser">Övergångsbestämmelser</h2>
          <p>Denna författning träder i kraft den 1 januari 2025.</p>
        </div>
    "#;

    fn index_of(doc: &IndexedDocument<'_>, text: &str) -> usize {
        doc.find(|n| visible_text(n.element) == text).unwrap()
    }

    #[test]
    fn test_boundary_index() {
        let html = Html::parse_document(DOC);
        let doc = IndexedDocument::build(html.root_element());
        let classifier = HierarchyClassifier::build(&doc);

        let boundaries: Vec<Boundary> =
            classifier.boundaries().iter().map(|(_, b)| b.clone()).collect();
        assert_eq!(
            boundaries,
            vec![
                Boundary::Chapter(1),
                Boundary::Chapter(2),
                Boundary::Appendix("2A".into()),
                Boundary::Transitional,
            ]
        );
        let sections: Vec<i32> = classifier.section_signs().iter().map(|(_, n)| *n).collect();
        assert_eq!(sections, vec![1, 5]);
        assert!(classifier.warnings().is_empty());
    }

    #[test]
    fn test_classify_section_content() {
        let html = Html::parse_document(DOC);
        let doc = IndexedDocument::build(html.root_element());
        let classifier = HierarchyClassifier::build(&doc);

        let p = index_of(&doc, "Arbetsgivaren ska undersöka riskerna.");
        assert_eq!(classifier.classify(p), Hierarchy::section(Some(2), Some(5)));

        let advice = index_of(&doc, "Undersökningen bör dokumenteras.");
        assert_eq!(
            classifier.classify(advice),
            Hierarchy::section(Some(2), Some(5)).with_general_recommendation(true)
        );
    }

    #[test]
    fn test_root_content_has_no_chapter() {
        let html = Html::parse_document(DOC);
        let doc = IndexedDocument::build(html.root_element());
        let classifier = HierarchyClassifier::build(&doc);

        let intro = index_of(&doc, "Inledning");
        assert_eq!(classifier.classify(intro), Hierarchy::root());
    }

    #[test]
    fn test_headings_take_next_content_hierarchy() {
        let html = Html::parse_document(DOC);
        let doc = IndexedDocument::build(html.root_element());
        let classifier = HierarchyClassifier::build(&doc);

        let chapter_heading = index_of(&doc, "2 kap. Ansvar");
        assert_eq!(
            classifier.classify(chapter_heading),
            Hierarchy::section(Some(2), Some(5))
        );

        let advice_heading = index_of(&doc, "Allmänna råd");
        assert!(classifier.classify(advice_heading).is_general_recommendation);

        let appendix_heading = index_of(&doc, "Bilaga 2A Gränsvärden");
        assert_eq!(classifier.classify(appendix_heading), Hierarchy::appendix("2A"));
    }

    #[test]
    fn test_appendix_and_transitional_exclude_chapter() {
        let html = Html::parse_document(DOC);
        let doc = IndexedDocument::build(html.root_element());
        let classifier = HierarchyClassifier::build(&doc);

        let table = classifier.classify(index_of(&doc, "Tabell över gränsvärden."));
        assert_eq!(table.scope, Scope::Appendix { appendix: "2A".into() });
        assert_eq!(table.chapter(), None);
        assert_eq!(table.section_number(), None);

        let transitional =
            classifier.classify(index_of(&doc, "Denna författning träder i kraft den 1 januari 2025."));
        assert!(transitional.is_transitional());
        assert_eq!(transitional.chapter(), None);
        assert_eq!(transitional.appendix_id(), None);
    }

    #[test]
    fn test_chapter_heading_closes_previous_section() {
        let html = Html::parse_document(
            r#"<div>
                 <h2>1 kap.</h2><span class="section-sign">4 §</span><p>Fyra</p>
                 <h2>2 kap.</h2><p>Inledning till kapitlet</p>
               </div>"#,
        );
        let doc = IndexedDocument::build(html.root_element());
        let classifier = HierarchyClassifier::build(&doc);

        let intro = index_of(&doc, "Inledning till kapitlet");
        assert_eq!(classifier.classify(intro), Hierarchy::section(Some(2), None));
    }

    #[test]
    fn test_section_sign_classifies_itself() {
        let html = Html::parse_document(
            r#"<div><span class="section-sign">1 §</span><p>Ett</p><p><span class="section-sign">2 §</span> Två</p></div>"#,
        );
        let doc = IndexedDocument::build(html.root_element());
        let classifier = HierarchyClassifier::build(&doc);

        let second = index_of(&doc, "2 § Två");
        assert_eq!(classifier.classify(second), Hierarchy::section(None, Some(2)));
        let sign = index_of(&doc, "2 §");
        assert_eq!(classifier.classify(sign), Hierarchy::section(None, Some(2)));
    }

    #[test]
    fn test_malformed_markers_become_warnings() {
        let html = Html::parse_document(
            r#"<div><h2>99999999999 kap.</h2><span class="section-sign">§</span><p>Text</p></div>"#,
        );
        let doc = IndexedDocument::build(html.root_element());
        let classifier = HierarchyClassifier::build(&doc);

        assert!(classifier.boundaries().is_empty());
        assert_eq!(classifier.warnings().len(), 2);
        let text = index_of(&doc, "Text");
        assert_eq!(classifier.classify(text), Hierarchy::root());
    }
}
