// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Comparison keys for font names.

/// Ideographic space, common in CJK face names.
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// Prefix the platform uses for vertical writing variants of a face.
pub(crate) const VERTICAL_MARKER: char = '@';

/// Canonicalizes a font name into a comparison key.
///
/// The name is lowercased, ideographic spaces become ASCII spaces, the
/// result is trimmed, leading vertical writing markers are removed and
/// finally every character that is not alphanumeric is dropped. Letters from
/// any script survive, so `"Sandoll 아람"` becomes `"sandoll아람"`.
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase().replace(IDEOGRAPHIC_SPACE, " ");
    lowered
        .trim()
        .trim_start_matches(VERTICAL_MARKER)
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .collect()
}

/// Key for lookup of font names that ignores case, spacing and punctuation.
#[derive(Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameKey(String);

impl NameKey {
    /// Creates the key for the given name.
    pub fn new(name: &str) -> Self {
        Self(normalize(name))
    }

    /// Returns the normalized form of the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the name normalized to nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for NameKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl core::fmt::Display for NameKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
