//! Core data types for the harvester.
//!
//! These types describe AFS regulations and the hierarchy-tagged content
//! elements extracted from their HTML.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{
    validate_number, validate_year, REGULATION_CODE_PATTERN, REGULATION_URL_PATTERN,
};
use crate::error::{HarvesterError, Result};

/// Regulation identifier, displayed as "AFS <year>:<number>".
///
/// Ordering is numeric, so "AFS 2023:2" sorts before "AFS 2023:10".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegulationCode {
    pub year: i32,
    pub number: i32,
}

impl RegulationCode {
    /// Create a validated regulation code.
    ///
    /// # Examples
    /// ```
    /// use afs_harvester::RegulationCode;
    ///
    /// let code = RegulationCode::new(2023, 10).unwrap();
    /// assert_eq!(code.to_string(), "AFS 2023:10");
    /// assert!(RegulationCode::new(1999, 1).is_err());
    /// ```
    pub fn new(year: i32, number: i32) -> Result<Self> {
        validate_year(year)?;
        validate_number(number)?;
        Ok(Self { year, number })
    }

    /// Extract the code from an av.se source URL (`.../afs-202310/`).
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let caps = REGULATION_URL_PATTERN.captures(url)?;
        Some(Self {
            year: caps[1].parse().ok()?,
            number: caps[2].parse().ok()?,
        })
    }

    /// Find the first regulation code mentioned in a text, e.g. a page title.
    #[must_use]
    pub fn find_in(text: &str) -> Option<Self> {
        let caps = REGULATION_CODE_PATTERN.captures(text)?;
        Some(Self {
            year: caps[1].parse().ok()?,
            number: caps[2].parse().ok()?,
        })
    }
}

impl fmt::Display for RegulationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AFS {}:{}", self.year, self.number)
    }
}

impl FromStr for RegulationCode {
    type Err = HarvesterError;

    /// Parse a complete code such as "AFS 2023:1" (case-insensitive, optional space).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let caps = REGULATION_CODE_PATTERN
            .captures(trimmed)
            .filter(|caps| caps.get(0).is_some_and(|m| m.as_str() == trimmed))
            .ok_or_else(|| HarvesterError::InvalidRegulationCode(s.to_string()))?;

        let year = caps[1]
            .parse()
            .map_err(|_| HarvesterError::InvalidRegulationCode(s.to_string()))?;
        let number = caps[2]
            .parse()
            .map_err(|_| HarvesterError::InvalidRegulationCode(s.to_string()))?;
        Ok(Self { year, number })
    }
}

/// The structural unit an element belongs to.
///
/// Exactly one scope applies to every element; section scoping with both
/// fields empty is root-level content (preamble).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Chapter/section content. Either part may be absent.
    Section {
        chapter: Option<i32>,
        section: Option<i32>,
    },
    /// Appendix content ("Bilaga 2A").
    Appendix { appendix: String },
    /// Transitional provisions (övergångsbestämmelser).
    Transitional,
}

/// Hierarchy position of an element.
///
/// The advisory flag is orthogonal to the scope: general recommendations keep
/// the chapter/section (or appendix) they comment on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hierarchy {
    pub scope: Scope,
    pub is_general_recommendation: bool,
}

impl Hierarchy {
    /// Root-level, non-advisory content.
    #[must_use]
    pub fn root() -> Self {
        Self::section(None, None)
    }

    #[must_use]
    pub fn section(chapter: Option<i32>, section: Option<i32>) -> Self {
        Self {
            scope: Scope::Section { chapter, section },
            is_general_recommendation: false,
        }
    }

    #[must_use]
    pub fn appendix(appendix: impl Into<String>) -> Self {
        Self {
            scope: Scope::Appendix {
                appendix: appendix.into(),
            },
            is_general_recommendation: false,
        }
    }

    #[must_use]
    pub fn transitional() -> Self {
        Self {
            scope: Scope::Transitional,
            is_general_recommendation: false,
        }
    }

    /// Mark (or unmark) this position as a general recommendation.
    #[must_use]
    pub fn with_general_recommendation(mut self, advisory: bool) -> Self {
        self.is_general_recommendation = advisory;
        self
    }

    #[must_use]
    pub fn chapter(&self) -> Option<i32> {
        match self.scope {
            Scope::Section { chapter, .. } => chapter,
            _ => None,
        }
    }

    #[must_use]
    pub fn section_number(&self) -> Option<i32> {
        match self.scope {
            Scope::Section { section, .. } => section,
            _ => None,
        }
    }

    #[must_use]
    pub fn appendix_id(&self) -> Option<&str> {
        match &self.scope {
            Scope::Appendix { appendix } => Some(appendix),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_transitional(&self) -> bool {
        matches!(self.scope, Scope::Transitional)
    }

    /// Rebuild a hierarchy from the flat column layout used by storage.
    ///
    /// Transitional wins over appendix, appendix wins over chapter/section.
    #[must_use]
    pub fn from_columns(
        chapter: Option<i32>,
        section: Option<i32>,
        appendix: Option<String>,
        is_transitional: bool,
        is_general_recommendation: bool,
    ) -> Self {
        let scope = if is_transitional {
            Scope::Transitional
        } else if let Some(appendix) = appendix {
            Scope::Appendix { appendix }
        } else {
            Scope::Section { chapter, section }
        };
        Self {
            scope,
            is_general_recommendation,
        }
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::root()
    }
}

/// One element creation request produced by the structural parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedElement {
    pub tag_name: String,
    pub element_class: Option<String>,
    pub element_id: Option<String>,
    /// Whitespace-normalized visible text.
    pub text_content: String,
    /// Outer HTML of the node, verbatim.
    pub html_snippet: String,
    pub regulation: Option<RegulationCode>,
    pub hierarchy: Hierarchy,
    /// Short selector-like path (`div.paragraph > p`) for diagnostics.
    pub css_path: String,
    pub position_in_parent: i32,
}

/// Result of parsing one document.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub regulation: Option<RegulationCode>,
    pub elements: Vec<ParsedElement>,
    /// Nodes that were skipped or only partially classified.
    pub warnings: Vec<String>,
}
