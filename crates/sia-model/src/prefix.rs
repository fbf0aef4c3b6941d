//! Group suffix resolution from section ids

use crate::group::GroupSuffix;
use crate::section::SectionId;

/// Derives the group suffix of a section
///
/// Total and idempotent: every input yields exactly one suffix, and ids
/// without group information (or ids that do not parse) yield
/// [`GroupSuffix::NONE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixResolver;

impl PrefixResolver {
    /// Create resolver
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve the suffix of a raw section id string
    #[must_use]
    pub fn resolve(&self, section_id: &str) -> GroupSuffix {
        section_id
            .parse::<SectionId>()
            .map(|id| id.suffix())
            .unwrap_or_default()
    }

    /// Resolve the suffix of a parsed section id
    #[inline]
    #[must_use]
    pub fn resolve_section(&self, section: &SectionId) -> GroupSuffix {
        section.suffix()
    }
}
