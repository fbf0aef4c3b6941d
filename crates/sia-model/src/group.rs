//! Group instances of a social-influence area
//!
//! Provides [`GroupKey`] (typed letter + index) and [`GroupSuffix`], the
//! storage-boundary tag (`""`, `"_A1"`, `"_B2"`, ...) derived from it.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Area letter of a group instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupLetter {
    /// Directly affected area (AISD)
    A,
    /// Indirectly affected area (AISI)
    B,
}

impl GroupLetter {
    /// Letter as it appears in section ids and suffixes
    #[inline]
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
        }
    }

    /// Parse a section id segment (`"A"` or `"B"`)
    #[inline]
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        let mut chars = segment.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        }
    }

    /// Parse a single letter
    #[inline]
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            _ => None,
        }
    }

    /// Short area label used in documents
    #[inline]
    #[must_use]
    pub const fn area_label(self) -> &'static str {
        match self {
            Self::A => "AISD",
            Self::B => "AISI",
        }
    }
}

/// One numbered group instance (A.1, A.2, B.1, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    letter: GroupLetter,
    index: u32,
}

impl GroupKey {
    /// Create a group key
    ///
    /// # Errors
    /// Returns error if `index` is zero (indices are 1-based)
    pub fn new(letter: GroupLetter, index: u32) -> Result<Self, GroupKeyError> {
        if index == 0 {
            return Err(GroupKeyError::ZeroIndex);
        }
        Ok(Self { letter, index })
    }

    /// First instance of an area letter
    #[inline]
    #[must_use]
    pub const fn first(letter: GroupLetter) -> Self {
        Self { letter, index: 1 }
    }

    /// Area letter
    #[inline]
    #[must_use]
    pub const fn letter(&self) -> GroupLetter {
        self.letter
    }

    /// 1-based instance index
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Storage suffix (`_A1`)
    #[must_use]
    pub fn suffix(&self) -> String {
        format!("_{}{}", self.letter.as_char(), self.index)
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.letter.as_char(), self.index)
    }
}

/// Group tag of a field key
///
/// `GroupSuffix::NONE` is the ungrouped/global slot and renders as `""`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupSuffix(Option<GroupKey>);

impl GroupSuffix {
    /// Ungrouped suffix
    pub const NONE: Self = Self(None);

    /// Suffix for a group
    #[inline]
    #[must_use]
    pub const fn of(key: GroupKey) -> Self {
        Self(Some(key))
    }

    /// Underlying group, if any
    #[inline]
    #[must_use]
    pub const fn key(&self) -> Option<GroupKey> {
        self.0
    }

    /// True when this suffix names a group
    #[inline]
    #[must_use]
    pub const fn is_grouped(&self) -> bool {
        self.0.is_some()
    }

    /// Storage string (`""` or `"_A1"`)
    #[must_use]
    pub fn as_storage(&self) -> String {
        self.0.map(|k| k.suffix()).unwrap_or_default()
    }

    /// Split a concrete field key into base name and group suffix
    ///
    /// Only a trailing `_<A|B><index>` is recognised; anything else is an
    /// ungrouped key.
    #[must_use]
    pub fn split_key(key: &str) -> (&str, Self) {
        let Some(pos) = key.rfind('_') else {
            return (key, Self::NONE);
        };
        if pos == 0 {
            return (key, Self::NONE);
        }
        match key[pos..].parse::<Self>() {
            Ok(suffix) if suffix.is_grouped() => (&key[..pos], suffix),
            _ => (key, Self::NONE),
        }
    }
}

impl From<GroupKey> for GroupSuffix {
    fn from(key: GroupKey) -> Self {
        Self::of(key)
    }
}

impl From<Option<GroupKey>> for GroupSuffix {
    fn from(key: Option<GroupKey>) -> Self {
        Self(key)
    }
}

impl Display for GroupSuffix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(key) = self.0 {
            write!(f, "_{}{}", key.letter.as_char(), key.index)
        } else {
            Ok(())
        }
    }
}

impl FromStr for GroupSuffix {
    type Err = GroupKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::NONE);
        }

        let body = s
            .strip_prefix('_')
            .ok_or_else(|| GroupKeyError::Malformed(s.to_string()))?;
        let mut chars = body.chars();
        let letter = chars
            .next()
            .and_then(GroupLetter::from_char)
            .ok_or_else(|| GroupKeyError::Malformed(s.to_string()))?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GroupKeyError::Malformed(s.to_string()));
        }
        let index = digits
            .parse::<u32>()
            .map_err(|_| GroupKeyError::Malformed(s.to_string()))?;

        GroupKey::new(letter, index).map(Self::of)
    }
}

/// Errors related to group keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupKeyError {
    /// Index 0 is not a valid group instance
    #[error("group index must be 1 or greater")]
    ZeroIndex,

    /// Suffix string does not follow `_<A|B><index>`
    #[error("malformed group suffix: '{0}'")]
    Malformed(String),
}
