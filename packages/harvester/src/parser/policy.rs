//! Node selection policies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::classify::HierarchyClassifier;
use crate::error::HarvesterError;
use crate::types::Hierarchy;

/// A node chosen for persistence, with its hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Index into the classifier's [`IndexedDocument`](crate::html::IndexedDocument).
    pub node: usize,
    pub hierarchy: Hierarchy,
}

/// Trait for configurable node selection.
///
/// Implementations decide which nodes of the content root become elements and
/// return them in emission order; the parser numbers them in that order.
pub trait SelectionPolicy: Send + Sync {
    /// Name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Select the nodes to persist below (and including) `root`.
    fn select(&self, classifier: &HierarchyClassifier<'_, '_>, root: usize) -> Vec<Selection>;
}

/// Built-in policies, selectable by name (`AFS_PARSE_POLICY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParsePolicy {
    /// Persist the finest text-bearing nodes; see [`FineGrainedPolicy`](super::FineGrainedPolicy).
    #[default]
    FineGrained,
    /// Walk from each structural boundary to the next; see [`BoundaryWalkPolicy`](super::BoundaryWalkPolicy).
    BoundaryWalk,
}

impl ParsePolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FineGrained => "fine-grained",
            Self::BoundaryWalk => "boundary-walk",
        }
    }
}

impl fmt::Display for ParsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParsePolicy {
    type Err = HarvesterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fine-grained" => Ok(Self::FineGrained),
            "boundary-walk" => Ok(Self::BoundaryWalk),
            _ => Err(HarvesterError::UnknownPolicy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_from_str() {
        assert_eq!("fine-grained".parse::<ParsePolicy>().unwrap(), ParsePolicy::FineGrained);
        assert_eq!("BOUNDARY_WALK".parse::<ParsePolicy>().unwrap(), ParsePolicy::BoundaryWalk);
        assert!("leaf".parse::<ParsePolicy>().is_err());
    }

    #[test]
    fn test_parse_policy_display_round_trips() {
        for policy in [ParsePolicy::FineGrained, ParsePolicy::BoundaryWalk] {
            assert_eq!(policy.to_string().parse::<ParsePolicy>().unwrap(), policy);
        }
    }
}
