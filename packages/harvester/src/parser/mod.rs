//! Structural parser for AFS regulation pages.
//!
//! The parser indexes the document once, classifies nodes with the
//! [`HierarchyClassifier`](crate::classify::HierarchyClassifier) and lets a
//! [`SelectionPolicy`] decide which nodes become elements.

mod boundary_walk;
mod engine;
mod fine_grained;
mod policy;

pub use boundary_walk::BoundaryWalkPolicy;
pub use engine::{content_root, StructuralParser};
pub use fine_grained::FineGrainedPolicy;
pub use policy::{ParsePolicy, Selection, SelectionPolicy};
