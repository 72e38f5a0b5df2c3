//! Canonical attribute normalization
//!
//! Identity attributes reported by different banks must hash to the same field
//! element whenever they denote the same identity, regardless of casing,
//! punctuation or stray whitespace. Each kind has exactly one rule:
//!
//! | Kind          | Rule                                             |
//! |---------------|--------------------------------------------------|
//! | `email`       | lowercase, drop all whitespace                   |
//! | `phone`       | keep ASCII digits only                           |
//! | `national_id` | keep ASCII digits only                           |
//! | `name`        | lowercase, collapse whitespace runs to one space |
//!
//! The canonical value is prefixed with its kind tag (`"phone:5145550000"`)
//! before hashing, so identical digit strings under different kinds never
//! collide.
//!
//! Empty input normalizes to `None`. Callers must skip such attributes: hashing
//! an empty string would make every empty field match every other one.

use crate::crypto::{map_to_field, FieldElement};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of attribute kinds that may be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Email,
    Phone,
    NationalId,
    Name,
}

impl AttributeKind {
    /// All kinds, in report order.
    pub const ALL: [AttributeKind; 4] = [
        AttributeKind::Email,
        AttributeKind::Phone,
        AttributeKind::NationalId,
        AttributeKind::Name,
    ];

    /// Domain-separation tag used as the hashing prefix.
    pub fn tag(self) -> &'static str {
        match self {
            AttributeKind::Email => "email",
            AttributeKind::Phone => "phone",
            AttributeKind::NationalId => "national_id",
            AttributeKind::Name => "name",
        }
    }

    fn canonicalize(self, raw: &str) -> String {
        match self {
            AttributeKind::Email => raw
                .chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect(),
            AttributeKind::Phone | AttributeKind::NationalId => {
                raw.chars().filter(char::is_ascii_digit).collect()
            }
            AttributeKind::Name => raw
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A raw attribute value as it appears in a bank's own records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedAttribute {
    pub kind: AttributeKind,
    pub raw_value: String,
}

impl TypedAttribute {
    pub fn new(kind: AttributeKind, raw_value: impl Into<String>) -> Self {
        Self {
            kind,
            raw_value: raw_value.into(),
        }
    }

    pub fn normalize(&self) -> Option<NormalizedAttribute> {
        normalize(self.kind, &self.raw_value)
    }
}

/// Canonical, kind-tagged form of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedAttribute {
    kind: AttributeKind,
    canonical: String,
}

impl NormalizedAttribute {
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Canonical value without the kind prefix.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The exact string fed to the hash-to-field mapping.
    pub fn tagged(&self) -> String {
        format!("{}:{}", self.kind.tag(), self.canonical)
    }

    pub fn to_field(&self) -> FieldElement {
        map_to_field(&self.tagged())
    }
}

impl fmt::Display for NormalizedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.tag(), self.canonical)
    }
}

/// Normalize a raw value under the given kind.
///
/// Returns `None` when nothing identifying is left after normalization.
pub fn normalize(kind: AttributeKind, raw_value: &str) -> Option<NormalizedAttribute> {
    let canonical = kind.canonicalize(raw_value);
    if canonical.is_empty() {
        return None;
    }
    Some(NormalizedAttribute { kind, canonical })
}
