// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Weight and slant from free-form name fragments.

use serde::{Deserialize, Serialize};

/// Visual weight class of a font, on a scale from 100 to 900.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Weight(u16);

impl Weight {
    /// Weight value of 100.
    pub const THIN: Self = Self(100);

    /// Weight value of 200.
    pub const EXTRA_LIGHT: Self = Self(200);

    /// Weight value of 300.
    pub const LIGHT: Self = Self(300);

    /// Weight value of 400. This is the default value.
    pub const NORMAL: Self = Self(400);

    /// Weight value of 500.
    pub const MEDIUM: Self = Self(500);

    /// Weight value of 600.
    pub const SEMI_BOLD: Self = Self(600);

    /// Weight value of 700.
    pub const BOLD: Self = Self(700);

    /// Weight value of 800.
    pub const EXTRA_BOLD: Self = Self(800);

    /// Weight value of 900.
    pub const BLACK: Self = Self(900);

    /// Creates a new weight, clamped to the range 100 to 900.
    pub fn new(weight: u16) -> Self {
        Self(weight.clamp(100, 900))
    }

    /// Returns the underlying weight value.
    pub fn value(self) -> u16 {
        self.0
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl core::fmt::Display for Weight {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weight and slant requested for a face.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct FaceStyle {
    /// Weight class.
    pub weight: Weight,
    /// True for italic or oblique faces.
    pub italic: bool,
}

impl FaceStyle {
    /// Creates a new style.
    pub fn new(weight: Weight, italic: bool) -> Self {
        Self { weight, italic }
    }
}

/// Keyword groups in the order they are tested. `semibold` has to be seen
/// before `bold` and `ultralight` before `light` since the shorter keywords
/// are substrings of the longer ones.
const WEIGHT_KEYWORDS: &[(Weight, &[&str])] = &[
    (Weight::BLACK, &["black", "heavy"]),
    (
        Weight::EXTRA_BOLD,
        &["extrabold", "extra-bold", "ultrabold", "ultra-bold"],
    ),
    (
        Weight::SEMI_BOLD,
        &["semibold", "semi-bold", "demibold", "demi-bold"],
    ),
    (Weight::BOLD, &["bold"]),
    (Weight::MEDIUM, &["medium"]),
    (
        Weight::EXTRA_LIGHT,
        &[
            "thin",
            "hairline",
            "ultralight",
            "ultra-light",
            "extralight",
            "extra-light",
        ],
    ),
];

const ITALIC_KEYWORDS: &[&str] = &["italic", "oblique", "slant", "kursiv", "cursive"];

/// Extracts a weight and italic flag from any combination of a display
/// name, an explicit style hint and a PostScript name.
///
/// The present inputs are joined and searched for keywords anywhere in the
/// text, so `"Arial-BoldItalic"` is as good as `"Bold Italic"`. `light` only
/// counts when the text does not also mention `bold`.
pub fn parse_style(
    display_name: Option<&str>,
    style_hint: Option<&str>,
    postscript_name: Option<&str>,
) -> FaceStyle {
    let text = [display_name, style_hint, postscript_name]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let has = |keyword: &&str| text.contains(*keyword);
    let weight = WEIGHT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(has))
        .map(|(weight, _)| *weight)
        .unwrap_or_else(|| {
            if text.contains("light") && !text.contains("bold") {
                Weight::LIGHT
            } else {
                Weight::NORMAL
            }
        });
    FaceStyle {
        weight,
        italic: ITALIC_KEYWORDS.iter().any(has),
    }
}
