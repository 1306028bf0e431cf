//! Regulation references: "AFS 2023:10, 13 kap., 10 §, AR".
//!
//! Parses references typed by users, formats the references shown next to
//! search hits, and builds the canonical API paths for addressable units.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::config::API_BASE_PATH;
use crate::error::{HarvesterError, Result};
use crate::types::{Hierarchy, RegulationCode, Scope};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CHAPTER_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s*kap\.?$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SECTION_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*§$").expect("valid regex"));

/// Structured form of a section reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceKey {
    pub regulation: RegulationCode,
    pub chapter: Option<i32>,
    pub section: Option<i32>,
    /// Only the general recommendations ("AR", allmänna råd) are requested.
    pub is_advisory: bool,
}

impl ReferenceKey {
    /// Reference to a (chapter-less) section.
    #[must_use]
    pub fn section(regulation: RegulationCode, chapter: Option<i32>, section: i32) -> Self {
        Self {
            regulation,
            chapter,
            section: Some(section),
            is_advisory: false,
        }
    }
}

impl FromStr for ReferenceKey {
    type Err = HarvesterError;

    /// Parse `AFS <year>:<number>[, <chapter> kap.][, <section> §][, AR]`.
    ///
    /// # Examples
    /// ```
    /// use afs_harvester::ReferenceKey;
    ///
    /// let key: ReferenceKey = "AFS 2023:10, 13 kap., 10 §, AR".parse().unwrap();
    /// assert_eq!(key.regulation.to_string(), "AFS 2023:10");
    /// assert_eq!(key.chapter, Some(13));
    /// assert_eq!(key.section, Some(10));
    /// assert!(key.is_advisory);
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || HarvesterError::InvalidReference(s.to_string());

        let mut parts = s.split(',').map(str::trim);
        let regulation: RegulationCode = parts
            .next()
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())?;

        let mut key = Self {
            regulation,
            chapter: None,
            section: None,
            is_advisory: false,
        };

        // Parts must appear in order: chapter, section, AR
        let mut stage = 0;
        for part in parts {
            if let Some(caps) = CHAPTER_PART.captures(part).filter(|_| stage < 1) {
                let chapter = caps[1].parse().map_err(|_| invalid())?;
                if chapter < 1 {
                    return Err(HarvesterError::InvalidChapter(chapter));
                }
                key.chapter = Some(chapter);
                stage = 1;
            } else if let Some(caps) = SECTION_PART.captures(part).filter(|_| stage < 2) {
                let section = caps[1].parse().map_err(|_| invalid())?;
                if section < 1 {
                    return Err(HarvesterError::InvalidSection(section));
                }
                key.section = Some(section);
                stage = 2;
            } else if part.eq_ignore_ascii_case("AR") && stage < 3 {
                key.is_advisory = true;
                stage = 3;
            } else {
                return Err(invalid());
            }
        }

        Ok(key)
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.regulation)?;
        if let Some(chapter) = self.chapter {
            write!(f, ", {chapter} kap.")?;
        }
        if let Some(section) = self.section {
            write!(f, ", {section} §")?;
        }
        if self.is_advisory {
            f.write_str(", AR")?;
        }
        Ok(())
    }
}

/// Full reference for an element, e.g. "AFS 2023:1, 3 kap., 5 §, AR".
///
/// Transitional provisions are shortened to "ÖB", appendices to "Bilaga X".
/// "AR" is only added for advisory text that belongs to a section.
pub fn format_complete_reference(regulation: &RegulationCode, hierarchy: &Hierarchy) -> String {
    let mut parts = vec![regulation.to_string()];

    match &hierarchy.scope {
        Scope::Transitional => parts.push("ÖB".to_string()),
        Scope::Appendix { appendix } => parts.push(format!("Bilaga {appendix}")),
        Scope::Section { chapter, section } => {
            if let Some(chapter) = chapter {
                parts.push(format!("{chapter} kap."));
            }
            if let Some(section) = section {
                parts.push(format!("{section} §"));
            }
        }
    }

    if hierarchy.is_general_recommendation && hierarchy.section_number().is_some() {
        parts.push("AR".to_string());
    }

    parts.join(", ")
}

/// Short label for the unit an element belongs to, e.g. "5 § · AR".
pub fn hierarchy_label(hierarchy: &Hierarchy) -> String {
    let mut parts = Vec::new();

    match &hierarchy.scope {
        Scope::Transitional => parts.push("Övergångsbestämmelser".to_string()),
        Scope::Appendix { appendix } => parts.push(format!("Bilaga {appendix}")),
        Scope::Section { section, .. } => {
            if let Some(section) = section {
                parts.push(format!("{section} §"));
            }
        }
    }

    if hierarchy.is_general_recommendation && hierarchy.section_number().is_some() {
        parts.push("AR".to_string());
    }

    parts.join(" · ")
}

/// Canonical API path of the unit an element belongs to.
///
/// Returns `None` for units that are not addressable on their own
/// (transitional provisions, content outside any section).
///
/// # Examples
/// ```
/// use afs_harvester::{reference_path, Hierarchy, RegulationCode};
///
/// let code = RegulationCode::new(2023, 1).unwrap();
/// assert_eq!(
///     reference_path(&code, &Hierarchy::section(Some(2), Some(5))).as_deref(),
///     Some("/api/v1/regulations/2023/1/chapters/2/sections/5")
/// );
/// assert_eq!(reference_path(&code, &Hierarchy::transitional()), None);
/// ```
pub fn reference_path(regulation: &RegulationCode, hierarchy: &Hierarchy) -> Option<String> {
    let base = format!("{API_BASE_PATH}/{}/{}", regulation.year, regulation.number);

    match &hierarchy.scope {
        Scope::Appendix { appendix } => Some(format!("{base}/appendices/{appendix}")),
        Scope::Section {
            chapter: Some(chapter),
            section: Some(section),
        } => Some(format!("{base}/chapters/{chapter}/sections/{section}")),
        Scope::Section {
            chapter: None,
            section: Some(section),
        } => Some(format!("{base}/sections/{section}")),
        _ => None,
    }
}
