//! Identifier types.
//!
//! All three id spaces are plain `u64` newtypes so they cannot be mixed up at
//! call sites: entity ids ([`Uid`]), transaction timestamps ([`Timestamp`]),
//! and namespace ids ([`NamespaceId`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of a graph entity.
///
/// The value `0` means "not yet assigned". Entity ids are rendered in the
/// query language and in JSON results as lower-case hex (`0x2a`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Uid(u64);

impl Uid {
    /// The unassigned id.
    pub const UNASSIGNED: Self = Self(0);

    /// Creates a new entity id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true if this id has been assigned.
    #[inline]
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for Uid {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<Uid> for u64 {
    fn from(id: Uid) -> Self {
        id.0
    }
}

impl FromStr for Uid {
    type Err = std::num::ParseIntError;

    /// Parses either hex (`0x1f`) or decimal (`31`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16).map(Self)
        } else {
            s.parse::<u64>().map(Self)
        }
    }
}

/// Transaction timestamp.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The zero timestamp, before anything was committed.
    pub const ZERO: Self = Self(0);

    /// Creates a new timestamp.
    #[inline]
    #[must_use]
    pub const fn new(ts: u64) -> Self {
        Self(ts)
    }

    /// Returns the raw timestamp value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts:{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(ts: u64) -> Self {
        Self(ts)
    }
}

/// Identifier of a namespace. Namespace `0` is the default one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NamespaceId(u64);

impl NamespaceId {
    /// The default namespace.
    pub const DEFAULT: Self = Self(0);

    /// Creates a new namespace id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw namespace value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns:{}", self.0)
    }
}

impl From<u64> for NamespaceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
