// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selection of the face name handed to the platform.

use serde::{Deserialize, Serialize};

use crate::style::{parse_style, FaceStyle};

/// Face used when a request names nothing at all.
pub const DEFAULT_FACE: &str = "Arial";

/// Trailing words that describe a style rather than a family. Multi-word
/// forms come before their single-word tails.
const STYLE_SUFFIXES: &[&str] = &[
    "extra light",
    "ultra light",
    "semi light",
    "demi light",
    "semi bold",
    "demi bold",
    "extra bold",
    "ultra bold",
    "thin",
    "hairline",
    "extralight",
    "ultralight",
    "semilight",
    "demilight",
    "light",
    "book",
    "regular",
    "normal",
    "medium",
    "roman",
    "semibold",
    "demibold",
    "extrabold",
    "ultrabold",
    "bold",
    "heavy",
    "black",
    "italic",
    "oblique",
    "slanted",
    "inclined",
    "condensed",
    "compressed",
    "narrow",
    "extended",
    "expanded",
    "wide",
];

const SUFFIX_SEPARATORS: &[char] = &[' ', '-', '_'];

/// The names a caller supplied for a face.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceQuery {
    /// User facing name such as `"210 Santorini Bold"`.
    pub display_name: Option<String>,
    /// PostScript name such as `"TTSantoriniB"`.
    pub postscript_name: Option<String>,
    /// Family name such as `"210 Santorini"`.
    pub family_name: Option<String>,
    /// Explicit style such as `"Bold Italic"`.
    pub style: Option<String>,
}

impl FaceQuery {
    /// Creates a query with only a display name.
    pub fn display(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Which of the supplied names decided the face.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameSource {
    /// A PostScript name was present.
    PostScript,
    /// The display name was used verbatim.
    Display,
    /// The family name was used verbatim.
    Family,
    /// Nothing usable was supplied.
    Fallback,
}

/// Face name and style to request from the platform.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ResolvedRequest {
    /// Name to hand to the platform font matcher.
    pub face_name: String,
    /// Weight and slant to request.
    pub style: FaceStyle,
    /// Which input produced `face_name`.
    pub source: NameSource,
}

/// Picks the face name for a query.
///
/// A PostScript name is taken as a sign of intent rather than used directly,
/// since platform matchers rarely index it. The face is then the display name
/// with its style words removed, or the family name, and only as a last resort
/// the PostScript name itself. Without a PostScript name, the display name and
/// then the family name are used verbatim. An empty query resolves to
/// [`DEFAULT_FACE`].
pub fn resolve(query: &FaceQuery) -> ResolvedRequest {
    let display = non_empty(&query.display_name);
    let postscript = non_empty(&query.postscript_name);
    let family = non_empty(&query.family_name);
    let hint = query.style.as_deref();

    if let Some(postscript) = postscript {
        let face_name = display
            .map(strip_style_suffix)
            .or(family)
            .unwrap_or(postscript);
        return ResolvedRequest {
            face_name: face_name.to_owned(),
            style: parse_style(display, hint, Some(postscript)),
            source: NameSource::PostScript,
        };
    }
    if let Some(display) = display {
        return ResolvedRequest {
            face_name: display.to_owned(),
            style: parse_style(Some(display), hint, None),
            source: NameSource::Display,
        };
    }
    if let Some(family) = family {
        return ResolvedRequest {
            face_name: family.to_owned(),
            style: parse_style(Some(family), hint, None),
            source: NameSource::Family,
        };
    }
    ResolvedRequest {
        face_name: DEFAULT_FACE.to_owned(),
        style: FaceStyle::default(),
        source: NameSource::Fallback,
    }
}

/// Removes trailing style words from a face name.
///
/// Words are matched case-insensitively after a space, hyphen or underscore
/// and removed repeatedly, so `"Foo Bold Italic"` becomes `"Foo"`. If nothing
/// would remain, the trimmed name is returned unchanged.
pub fn strip_style_suffix(name: &str) -> &str {
    let trimmed = name.trim();
    let mut rest = trimmed;
    while let Some(shorter) = strip_one_suffix(rest) {
        rest = shorter.trim();
    }
    if rest.is_empty() {
        trimmed
    } else {
        rest
    }
}

fn strip_one_suffix(name: &str) -> Option<&str> {
    STYLE_SUFFIXES.iter().find_map(|suffix| {
        let split = name.len().checked_sub(suffix.len() + 1)?;
        let (head, tail) = (name.get(..split)?, name.get(split..)?);
        let mut chars = tail.chars();
        let separator = chars.next()?;
        (SUFFIX_SEPARATORS.contains(&separator) && chars.as_str().eq_ignore_ascii_case(suffix))
            .then_some(head)
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Weight;

    fn query(
        display: Option<&str>,
        postscript: Option<&str>,
        family: Option<&str>,
        style: Option<&str>,
    ) -> FaceQuery {
        FaceQuery {
            display_name: display.map(Into::into),
            postscript_name: postscript.map(Into::into),
            family_name: family.map(Into::into),
            style: style.map(Into::into),
        }
    }

    #[test]
    fn postscript_uses_stripped_display_name() {
        let resolved = resolve(&query(
            Some("210 Santorini Bold"),
            Some("TTSantoriniB"),
            None,
            None,
        ));
        assert_eq!(resolved.face_name, "210 Santorini");
        assert_eq!(resolved.style.weight, Weight::BOLD);
        assert_eq!(resolved.source, NameSource::PostScript);
    }

    #[test]
    fn postscript_falls_back_to_family_then_itself() {
        let resolved = resolve(&query(None, Some("Arial-BoldMT"), Some(" Arial "), None));
        assert_eq!(resolved.face_name, "Arial");
        assert_eq!(resolved.style.weight, Weight::BOLD);
        let resolved = resolve(&query(None, Some(" NanumGothic "), None, None));
        assert_eq!(resolved.face_name, "NanumGothic");
        assert_eq!(resolved.source, NameSource::PostScript);
    }

    #[test]
    fn display_then_family_then_fallback() {
        let resolved = resolve(&query(Some(" Arial Bold Italic "), None, Some("Arial"), None));
        assert_eq!(resolved.face_name, "Arial Bold Italic");
        assert_eq!(resolved.style, FaceStyle::new(Weight::BOLD, true));
        assert_eq!(resolved.source, NameSource::Display);

        let resolved = resolve(&query(Some("  "), Some(""), Some("Gulim"), Some("Light")));
        assert_eq!(resolved.face_name, "Gulim");
        assert_eq!(resolved.style.weight, Weight::LIGHT);
        assert_eq!(resolved.source, NameSource::Family);

        let resolved = resolve(&FaceQuery::default());
        assert_eq!(resolved.face_name, DEFAULT_FACE);
        assert_eq!(resolved.style, FaceStyle::default());
        assert_eq!(resolved.source, NameSource::Fallback);
    }

    #[test]
    fn strips_repeated_suffixes() {
        assert_eq!(strip_style_suffix("Foo Bold Italic"), "Foo");
        assert_eq!(strip_style_suffix("Foo-SemiBold"), "Foo");
        assert_eq!(strip_style_suffix("Foo_extra light"), "Foo");
        assert_eq!(strip_style_suffix("Foo Semi Bold Condensed"), "Foo");
        assert_eq!(strip_style_suffix("Noto Sans KR Black"), "Noto Sans KR");
    }

    #[test]
    fn strip_keeps_names_without_suffixes() {
        assert_eq!(strip_style_suffix("Boldface"), "Boldface");
        assert_eq!(strip_style_suffix("Arial"), "Arial");
        // Needs a separator in front of the keyword.
        assert_eq!(strip_style_suffix("Bold"), "Bold");
        assert_eq!(strip_style_suffix(" Regular Bold "), "Regular");
        // Stripping everything returns the name itself.
        assert_eq!(strip_style_suffix("-Bold"), "-Bold");
        assert_eq!(strip_style_suffix("맑은 고딕 Bold"), "맑은 고딕");
    }
}
