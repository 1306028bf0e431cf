//! AFS Harvester - Structural parsing of Swedish work-environment regulations.
//!
//! This crate turns the HTML of an AFS regulation page (Arbetsmiljöverkets
//! författningssamling) into a flat, ordered list of content elements, each
//! tagged with its place in the regulation: chapter, section, appendix,
//! transitional provisions, and whether it is a general recommendation.
//!
//! # Example
//!
//! ```
//! use afs_harvester::{Hierarchy, StructuralParser};
//!
//! let html = r#"<div class="provision">
//!   <h2>2 kap.</h2>
//!   <span class="section-sign">5 §</span>
//!   <p>Arbetsgivaren ska undersöka riskerna.</p>
//! </div>"#;
//!
//! let output = StructuralParser::default().parse("https://www.av.se/afs-20231/", html);
//! let paragraph = output.elements.last().unwrap();
//! assert_eq!(paragraph.hierarchy, Hierarchy::section(Some(2), Some(5)));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants and validation
//! - [`types`]: Core data types (RegulationCode, Hierarchy, ParsedElement)
//! - [`error`]: Error types and Result alias
//! - [`html`]: HTML utilities and the document-order index
//! - [`classify`]: Hierarchy classifier
//! - [`parser`]: Structural parser and node selection policies
//! - [`reference`]: Reference parsing and formatting
//! - [`metadata`]: Page title, plain text and statistics

pub mod classify;
pub mod config;
pub mod error;
pub mod html;
pub mod metadata;
pub mod parser;
pub mod reference;
pub mod types;

// Re-export commonly used items
pub use classify::HierarchyClassifier;
pub use error::{HarvesterError, Result};
pub use metadata::{regulation_subject, DocumentMetadata, DocumentStats};
pub use parser::{ParsePolicy, SelectionPolicy, StructuralParser};
pub use reference::{format_complete_reference, hierarchy_label, reference_path, ReferenceKey};
pub use types::{Hierarchy, ParseOutput, ParsedElement, RegulationCode, Scope};
