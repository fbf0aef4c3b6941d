//! Hierarchical section identifiers
//!
//! Provides [`SectionId`] for questionnaire pages (`3.1.4.A.1.6`) and
//! [`SectionKey`], the `(root, group)` pair the structured store is keyed by.

use crate::group::{GroupKey, GroupLetter, GroupSuffix};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Literal bucket used by hosts without a section id
pub const GLOBAL_BUCKET: &str = "global";

/// Segment position of the group letter (`3.1.4.[A]`)
const GROUP_LETTER_SEGMENT: usize = 3;

/// Segment position of the group index (`3.1.4.A.[2]`)
const GROUP_INDEX_SEGMENT: usize = 4;

/// Identifier of one questionnaire page
///
/// Dotted segments. The fourth segment being `A` or `B` marks a grouped
/// section; the fifth segment, when it is a number of at least 1, is the
/// group instance index.
///
/// # Examples
/// - `3.1.4.A.1.6` → group A.1, root `3.1.4.6`
/// - `3.1.4.B.2` → group B.2, root `3.1.4`
/// - `3.1.4.A` → group A.1 (default instance), root `3.1.4`
/// - `3.1.2` → ungrouped
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionId(Vec<String>);

impl SectionId {
    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Group instance encoded in this id
    #[must_use]
    pub fn group(&self) -> Option<GroupKey> {
        let letter = self
            .0
            .get(GROUP_LETTER_SEGMENT)
            .and_then(|seg| GroupLetter::from_segment(seg))?;

        let index = self.explicit_index().unwrap_or(1);
        GroupKey::new(letter, index).ok()
    }

    /// Group suffix encoded in this id
    #[inline]
    #[must_use]
    pub fn suffix(&self) -> GroupSuffix {
        GroupSuffix::from(self.group())
    }

    /// Section id with the group segments removed
    ///
    /// All instances of the same page share a root.
    #[must_use]
    pub fn root(&self) -> Self {
        if self.group().is_none() {
            return self.clone();
        }

        let skip_index = self.index_segment().is_some();
        let segments = self
            .0
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                *i != GROUP_LETTER_SEGMENT && !(skip_index && *i == GROUP_INDEX_SEGMENT)
            })
            .map(|(_, seg)| seg.clone())
            .collect();
        Self(segments)
    }

    /// Check if this id is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Numeric index segment, valid or not (`0`, `007`, overflow)
    fn index_segment(&self) -> Option<&str> {
        self.0
            .get(GROUP_INDEX_SEGMENT)
            .map(String::as_str)
            .filter(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
    }

    fn explicit_index(&self) -> Option<u32> {
        self.index_segment()
            .and_then(|seg| seg.parse::<u32>().ok())
            .filter(|index| *index >= 1)
    }
}

impl Display for SectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for SectionId {
    type Err = SectionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SectionIdError::Empty);
        }

        let segments = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(SectionIdError::EmptySegment(s.to_string()))
                } else if seg.contains(|c: char| !c.is_alphanumeric() && c != '_' && c != '-') {
                    Err(SectionIdError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl TryFrom<String> for SectionId {
    type Error = SectionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SectionId> for String {
    fn from(id: SectionId) -> Self {
        id.to_string()
    }
}

/// Key of one structured-store entry: section root plus group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionKey {
    /// Section root (`3.1.4.6`) or [`GLOBAL_BUCKET`]
    pub root: String,
    /// Group instance
    pub group: GroupSuffix,
}

impl SectionKey {
    /// Create key from parts
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<String>, group: GroupSuffix) -> Self {
        Self {
            root: root.into(),
            group,
        }
    }

    /// The ungrouped global bucket
    #[inline]
    #[must_use]
    pub fn global() -> Self {
        Self::new(GLOBAL_BUCKET, GroupSuffix::NONE)
    }

    /// Key for a parsed section id
    #[must_use]
    pub fn for_section(section: &SectionId) -> Self {
        Self::new(section.root().to_string(), section.suffix())
    }

    /// Key for a raw section string
    ///
    /// Never fails: an unparsable id is used verbatim as an ungrouped root,
    /// and a blank one maps to the global bucket.
    #[must_use]
    pub fn from_section_str(section: &str) -> Self {
        match section.parse::<SectionId>() {
            Ok(id) => Self::for_section(&id),
            Err(SectionIdError::Empty) => Self::global(),
            Err(_) => Self::new(section.trim(), GroupSuffix::NONE),
        }
    }

    /// Same root with a different group
    #[inline]
    #[must_use]
    pub fn with_group(mut self, group: GroupSuffix) -> Self {
        self.group = group;
        self
    }

    /// True for the global bucket
    #[inline]
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.root == GLOBAL_BUCKET && !self.group.is_grouped()
    }
}

impl Display for SectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, self.group)
    }
}

/// Errors related to section ids
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionIdError {
    /// Blank id
    #[error("section id is empty")]
    Empty,

    /// Empty segment (`3..1`)
    #[error("section id '{0}' contains an empty segment")]
    EmptySegment(String),

    /// Invalid segment characters
    #[error("invalid section id segment: {0}")]
    InvalidSegment(String),
}
