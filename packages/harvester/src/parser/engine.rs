//! Structural parser that turns one fetched page into element records.

use scraper::Html;

use super::boundary_walk::BoundaryWalkPolicy;
use super::fine_grained::FineGrainedPolicy;
use super::policy::{ParsePolicy, Selection, SelectionPolicy};
use crate::classify::HierarchyClassifier;
use crate::config::PROVISION_CLASS;
use crate::html::{
    attribute, class_attribute, has_class, selector_segment, tag_name, visible_text,
    IndexedDocument,
};
use crate::metadata::extract_title;
use crate::types::{ParseOutput, ParsedElement, RegulationCode};

/// Number of ancestors included in an element's css path.
const CSS_PATH_ANCESTORS: usize = 2;

/// Parser that classifies and selects the content elements of a document.
///
/// Parsing is deterministic: the same HTML always yields the same elements in
/// the same order with the same positions.
pub struct StructuralParser {
    policy: Box<dyn SelectionPolicy>,
}

impl StructuralParser {
    /// Create a parser using one of the built-in policies.
    #[must_use]
    pub fn new(policy: ParsePolicy) -> Self {
        match policy {
            ParsePolicy::FineGrained => Self::with_policy(FineGrainedPolicy),
            ParsePolicy::BoundaryWalk => Self::with_policy(BoundaryWalkPolicy),
        }
    }

    /// Create a parser with a custom selection policy.
    #[must_use]
    pub fn with_policy(policy: impl SelectionPolicy + 'static) -> Self {
        Self {
            policy: Box::new(policy),
        }
    }

    /// Name of the active selection policy.
    #[must_use]
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Parse a page fetched from `url`.
    ///
    /// # Arguments
    /// * `url` - Source URL, used to derive the regulation code
    /// * `html` - Raw HTML of the page
    ///
    /// # Returns
    /// `ParseOutput` with the elements in document order. Nodes that cannot be
    /// turned into an element are skipped and reported in `warnings`.
    pub fn parse(&self, url: &str, html: &str) -> ParseOutput {
        let document = Html::parse_document(html);
        let regulation = RegulationCode::from_url(url).or_else(|| {
            extract_title(&document).and_then(|title| RegulationCode::find_in(&title))
        });

        let index = IndexedDocument::build(document.root_element());
        let classifier = HierarchyClassifier::build(&index);
        let root = content_root(&index);
        let mut warnings = classifier.warnings().to_vec();

        let selections = self.policy.select(&classifier, root);
        let mut elements = Vec::with_capacity(selections.len());

        for selection in &selections {
            match materialize(&index, selection, regulation, elements.len()) {
                Ok(element) => elements.push(element),
                Err(message) => {
                    tracing::warn!(
                        node = %selector_segment(index.node(selection.node).element),
                        "{message}, skipping"
                    );
                    warnings.push(message);
                }
            }
        }

        tracing::debug!(
            url = %url,
            policy = self.policy.name(),
            elements = elements.len(),
            warnings = warnings.len(),
            "Parsed document"
        );

        ParseOutput {
            regulation,
            elements,
            warnings,
        }
    }
}

impl Default for StructuralParser {
    fn default() -> Self {
        Self::new(ParsePolicy::default())
    }
}

/// Index of the node holding the regulation text: the `.provision`
/// container, else `<body>`, else the document element.
pub fn content_root(index: &IndexedDocument<'_>) -> usize {
    index
        .find(|node| has_class(node.element, PROVISION_CLASS))
        .or_else(|| index.find(|node| tag_name(node.element) == "body"))
        .unwrap_or(0)
}

fn materialize(
    index: &IndexedDocument<'_>,
    selection: &Selection,
    regulation: Option<RegulationCode>,
    position: usize,
) -> Result<ParsedElement, String> {
    let element = index.node(selection.node).element;
    let tag = tag_name(element);

    let html_snippet = element.html();
    if html_snippet.trim().is_empty() {
        return Err(format!("empty snippet for <{tag}>"));
    }

    let text_content = visible_text(element);
    if text_content.is_empty() {
        return Err(format!("no visible text in <{tag}>"));
    }

    let position_in_parent = i32::try_from(position)
        .map_err(|_| format!("position {position} out of range for <{tag}>"))?;

    Ok(ParsedElement {
        tag_name: tag.to_string(),
        element_class: class_attribute(element),
        element_id: attribute(element, "id").map(str::to_string),
        text_content,
        html_snippet,
        regulation,
        hierarchy: selection.hierarchy.clone(),
        css_path: css_path(index, selection.node),
        position_in_parent,
    })
}

/// `grandparent > parent > node`, stopping at `body`.
fn css_path(index: &IndexedDocument<'_>, node: usize) -> String {
    let mut segments = vec![selector_segment(index.node(node).element)];
    for ancestor in index.ancestors(node).take(CSS_PATH_ANCESTORS) {
        let element = index.node(ancestor).element;
        if matches!(tag_name(element), "body" | "html") {
            break;
        }
        segments.push(selector_segment(element));
    }
    segments.reverse();
    segments.join(" > ")
}
