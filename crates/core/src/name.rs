//! Validated hook names
//!
//! Hook names end up in file names (`hooks__<name>.nu`) and in shell source,
//! so they are restricted to `[A-Za-z0-9_:-]+` and checked before any I/O.
//!
//! # Examples
//!
//! ```
//! use hooksmith_core::HookName;
//!
//! let name = HookName::new("starship")?;
//! assert_eq!(name.as_str(), "starship");
//! assert!(HookName::new("bad name").is_err());
//! # Ok::<(), hooksmith_core::Error>(())
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A hook name that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HookName(String);

impl HookName {
    /// Create a new `HookName`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHookName`] if the name is empty or contains a
    /// character outside `[A-Za-z0-9_:-]`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(Error::InvalidHookName { name })
        }
    }

    /// Get the name as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check a raw name against `[A-Za-z0-9_:-]+`
#[must_use]
pub fn is_valid(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-'))
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HookName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for HookName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HookName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for HookName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<HookName> for String {
    fn from(name: HookName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["greeter", "zoxide", "nu_plugin_gstat", "git:prompt", "a-b_c:1"] {
            assert!(HookName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "has space", "slash/name", "dot.name", "emoji✨", "../up"] {
            let err = HookName::new(name).unwrap_err();
            assert!(
                matches!(err, Error::InvalidHookName { .. }),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_error_message_names_the_hook() {
        let err = HookName::new("bad name").unwrap_err();
        assert!(err.to_string().contains("'bad name'"));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: HookName = serde_json::from_str("\"starship\"").unwrap();
        assert_eq!(ok.as_str(), "starship");

        let bad = serde_json::from_str::<HookName>("\"not ok\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_display_and_borrow() {
        let name = HookName::new("carapace").unwrap();
        assert_eq!(name.to_string(), "carapace");

        let mut set = std::collections::BTreeSet::new();
        set.insert(name);
        assert!(set.contains("carapace"));
    }
}
