//! Domain newtypes for Herder.
//!
//! Manifest keys and herd identities are strongly typed; both serialize as
//! plain JSON strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Manifest key reserved for files written by the herd merge step.
pub const HERDS_TARGET: &str = "herds";

// ---------------------------------------------------------------------------
// TargetName
// ---------------------------------------------------------------------------

/// Stable identifier of a target, used as the manifest key and for selective
/// re-runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetName(pub String);

impl TargetName {
    /// Validate a name for use by a target implementation.
    ///
    /// Names must be non-empty lowercase ASCII alphanumerics or `-`, and must
    /// not collide with [`HERDS_TARGET`].
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        let well_formed = !name.is_empty()
            && !name.starts_with('-')
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !well_formed || name == HERDS_TARGET {
            return Err(CoreError::InvalidName {
                kind: "target",
                name: name.to_owned(),
            });
        }
        Ok(Self(name.to_owned()))
    }

    /// The reserved name the herd merge step records its output under.
    pub fn herds() -> Self {
        Self(HERDS_TARGET.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TargetName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TargetName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// HerdName
// ---------------------------------------------------------------------------

/// Identity of a content package, from `herd.json` or its directory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HerdName(pub String);

impl fmt::Display for HerdName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for HerdName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for HerdName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
