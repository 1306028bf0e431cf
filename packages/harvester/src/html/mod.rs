//! HTML helpers built on `scraper`: text extraction, element predicates and the
//! document-order index used by the classifier and parser.

mod document;
mod utils;

pub use document::{IndexedDocument, IndexedNode};
pub use utils::{
    attribute, class_attribute, direct_text, element_children, fragment_text, has_class,
    is_heading_tag, is_phrasing_tag, is_skipped, normalize_whitespace, selector_segment, tag_name,
    visible_text,
};
