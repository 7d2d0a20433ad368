// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Heuristic comparison of font family names across scripts.
//!
//! A face can be reported under its English name, a localized name or a
//! vendor's catalog code. These checks decide whether two such names refer
//! to the same family by comparing the Latin letters and digits they share.
//! They favor false positives: two unrelated families that both start with
//! the same catalog number compare equal.

use smallvec::SmallVec;

/// Keys shorter than this carry too little information to compare.
const MIN_KEY_LEN: usize = 3;

/// Shortest numeric prefix that identifies a family on its own.
const MIN_NUMERIC_PREFIX: usize = 2;

/// Faces the platform falls back to when it cannot honor a request.
const PLATFORM_DEFAULT_FACES: &[&str] = &[
    "arial",
    "times new roman",
    "courier new",
    "calibri",
    "segoe ui",
    "tahoma",
    "verdana",
    "ms gothic",
    "ms mincho",
    "굴림",
    "돋움",
    "바탕",
    "궁서",
];

/// Returns true if `a` and `b` appear to name the same font family.
///
/// The checks run in order and stop at the first match:
///
/// 1. Equal ignoring case and surrounding whitespace.
/// 2. Both [alphanumeric keys](alphanumeric_key) must have at least three
///    characters, otherwise the names are considered different.
/// 3. One key contains the other, or the Latin words of one name appear in
///    order among the Latin words of the other (`"Sandoll 아람 05"` and
///    `"Sandoll Aram 05"`).
/// 4. Both keys start with the same run of at least two digits.
pub fn is_same_family(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.to_lowercase() == b.to_lowercase() {
        return true;
    }
    let (key_a, key_b) = (alphanumeric_key(a), alphanumeric_key(b));
    if key_a.len() < MIN_KEY_LEN || key_b.len() < MIN_KEY_LEN {
        return false;
    }
    if key_a.contains(&key_b) || key_b.contains(&key_a) {
        return true;
    }
    if words_in_order(a, b) {
        return true;
    }
    let (prefix_a, prefix_b) = (numeric_prefix(&key_a), numeric_prefix(&key_b));
    prefix_a.len() >= MIN_NUMERIC_PREFIX && prefix_a == prefix_b
}

/// Keeps only ASCII letters and digits, lowercased.
///
/// Non-Latin scripts are dropped entirely, so `"210 수퍼사이즈 Black"` becomes
/// `"210black"`.
pub fn alphanumeric_key(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Returns the leading run of ASCII digits in `key`.
pub fn numeric_prefix(key: &str) -> &str {
    let end = key
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(key.len());
    &key[..end]
}

/// Returns true if `name` is one of the faces the platform substitutes by
/// default.
pub fn is_platform_default_face(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    PLATFORM_DEFAULT_FACES.contains(&name.as_str())
}

/// Decides whether a render that produced `actual` when `requested` was
/// asked for must be treated as a substitution.
///
/// Same-family names are accepted. A platform default face is always a
/// substitution, as is anything else that does not match.
pub fn treat_as_substitution(requested: &str, actual: &str) -> bool {
    if is_same_family(requested, actual) {
        return false;
    }
    if is_platform_default_face(actual) {
        log::debug!("'{requested}' fell back to platform default '{actual}'");
    }
    true
}

/// Runs of ASCII letters and digits, lowercased.
fn latin_words(name: &str) -> SmallVec<[String; 6]> {
    name.split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Returns true if the Latin words of the shorter name form an ordered
/// subsequence of the words of the longer one.
///
/// A single shared word is not enough, it is usually just a foundry name.
fn words_in_order(a: &str, b: &str) -> bool {
    let (words_a, words_b) = (latin_words(a), latin_words(b));
    let (short, long) = if words_a.len() <= words_b.len() {
        (words_a, words_b)
    } else {
        (words_b, words_a)
    };
    if short.len() < 2 {
        return false;
    }
    let mut long = long.iter();
    short.iter().all(|word| long.any(|candidate| candidate == word))
}
