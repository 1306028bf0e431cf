//! Hierarchy classification for AFS documents.
//!
//! Every content node is placed in exactly one scope: chapter/section,
//! appendix ("Bilaga"), or transitional provisions. Whether the node is a
//! general recommendation is decided independently.

mod classifier;
mod markers;

pub use classifier::{Boundary, HierarchyClassifier};
pub use markers::{
    appendix_identifier, chapter_number, is_appendix_heading, is_chapter_heading,
    is_transitional_heading, section_number,
};
