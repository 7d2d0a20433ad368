// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Localized family names from the OpenType `name` table.
//!
//! The table bytes come straight from the platform (see
//! [`FaceSource::name_table`](crate::FaceSource::name_table)), so they may
//! belong to a face that has no file on disk. Parsing is lenient: malformed
//! records are skipped one at a time and the rest of the table is still used.

use std::collections::BTreeMap;

use read_fonts::FontData;

use crate::{backend::FaceSource, Error};

/// Upper bound on the size of a `name` table we are willing to parse.
pub const MAX_NAME_TABLE_SIZE: usize = 1 << 20;

/// Name identifier of the font family name.
const FAMILY_NAME_ID: u16 = 1;

const HEADER_LEN: usize = 6;
const RECORD_LEN: usize = 12;

const PLATFORM_MACINTOSH: u16 = 1;
const PLATFORM_WINDOWS: u16 = 3;

/// Windows language identifiers with a well known tag.
const WINDOWS_LANGUAGES: &[(u16, &str)] = &[
    (0x0409, "en"),
    (0x0412, "ko"),
    (0x0411, "ja"),
    (0x0804, "zh-Hans"),
    (0x0c0a, "es"),
    (0x0404, "zh-Hant"),
];

/// Localized family names keyed by language tag.
pub type LanguageNames = BTreeMap<String, String>;

/// Reads the `name` table of `face` through `source` and returns its
/// localized family names.
///
/// A face without a readable table yields an empty map. That is a normal
/// outcome for simple faces and is only logged at debug level.
pub fn extract_names(source: &dyn FaceSource, face: &str) -> LanguageNames {
    match source.name_table(face) {
        Some(table) => parse_family_names(&table),
        None => {
            log::debug!("no name table for '{face}'");
            LanguageNames::new()
        }
    }
}

/// Parses raw `name` table bytes and collects every family name record.
///
/// An unreadable table yields no names. Later records for the same language
/// tag replace earlier ones.
pub fn parse_family_names(table: &[u8]) -> LanguageNames {
    read_family_names(table).unwrap_or_else(|err| {
        log::debug!("{err}");
        LanguageNames::new()
    })
}

/// Like [`parse_family_names`], but reports a table that is too short or
/// too large to be parsed.
pub fn read_family_names(table: &[u8]) -> Result<LanguageNames, Error> {
    if table.len() < HEADER_LEN {
        return Err(Error::name_table(format!("{} byte table", table.len())));
    }
    if table.len() > MAX_NAME_TABLE_SIZE {
        return Err(Error::name_table(format!(
            "{} byte table exceeds {MAX_NAME_TABLE_SIZE}",
            table.len()
        )));
    }
    let mut names = LanguageNames::new();
    let data = FontData::new(table);
    let (Ok(count), Ok(storage)) = (data.read_at::<u16>(2), data.read_at::<u16>(4)) else {
        return Ok(names);
    };
    for index in 0..usize::from(count) {
        let Some(record) = NameRecord::read(data, HEADER_LEN + index * RECORD_LEN) else {
            // Record array runs past the end of the table.
            break;
        };
        if record.name_id != FAMILY_NAME_ID {
            continue;
        }
        let start = usize::from(storage) + usize::from(record.offset);
        let Some(bytes) = table.get(start..start + usize::from(record.length)) else {
            continue;
        };
        let Some(text) = decode(record.platform_id, bytes) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        names.insert(language_tag(record.platform_id, record.language_id), text);
    }
    Ok(names)
}

/// Returns the tag under which a record's name is stored.
///
/// Windows records with a known language get a short tag, other Windows
/// records use `win-xxxx`, Macintosh records use `mac-xxxx` and every other
/// platform is kept as `p{platform}-xxxx`.
pub fn language_tag(platform_id: u16, language_id: u16) -> String {
    match platform_id {
        PLATFORM_WINDOWS => WINDOWS_LANGUAGES
            .iter()
            .find(|(id, _)| *id == language_id)
            .map(|(_, tag)| (*tag).to_owned())
            .unwrap_or_else(|| format!("win-{language_id:04x}")),
        PLATFORM_MACINTOSH => format!("mac-{language_id:04x}"),
        _ => format!("p{platform_id}-{language_id:04x}"),
    }
}

#[derive(Copy, Clone, Debug)]
struct NameRecord {
    platform_id: u16,
    language_id: u16,
    name_id: u16,
    length: u16,
    offset: u16,
}

impl NameRecord {
    fn read(data: FontData<'_>, at: usize) -> Option<Self> {
        if at + RECORD_LEN > data.len() {
            return None;
        }
        Some(Self {
            platform_id: data.read_at(at).ok()?,
            // Encoding id at `at + 2` does not influence decoding.
            language_id: data.read_at(at + 4).ok()?,
            name_id: data.read_at(at + 6).ok()?,
            length: data.read_at(at + 8).ok()?,
            offset: data.read_at(at + 10).ok()?,
        })
    }
}

fn decode(platform_id: u16, bytes: &[u8]) -> Option<String> {
    match platform_id {
        PLATFORM_MACINTOSH => decode_mac_roman(bytes)
            .or_else(|| decode_latin1(bytes))
            .or_else(|| core::str::from_utf8(bytes).ok().map(str::to_owned)),
        // Windows, Unicode and the rarely seen others are UTF-16.
        _ => decode_utf16_be(bytes),
    }
}

fn decode_utf16_be(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Mac Roman has no NUL in any real family name, so a NUL byte means the
/// record is in some other single byte encoding.
fn decode_mac_roman(bytes: &[u8]) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    Some(
        bytes
            .iter()
            .map(|&b| match b {
                0..=0x7f => char::from(b),
                _ => MAC_ROMAN_HIGH[usize::from(b - 0x80)],
            })
            .collect(),
    )
}

fn decode_latin1(bytes: &[u8]) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    Some(bytes.iter().copied().map(char::from).collect())
}

/// Mac Roman code points 0x80 through 0xFF.
#[rustfmt::skip]
const MAC_ROMAN_HIGH: [char; 128] = [
    'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è',
    'ê', 'ë', 'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü',
    '†', '°', '¢', '£', '§', '•', '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ', 'Ø',
    '∞', '±', '≤', '≥', '¥', 'µ', '∂', '∑', '∏', 'π', '∫', 'ª', 'º', 'Ω', 'æ', 'ø',
    '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«', '»', '…', '\u{a0}', 'À', 'Ã', 'Õ', 'Œ', 'œ',
    '–', '—', '“', '”', '‘', '’', '÷', '◊', 'ÿ', 'Ÿ', '⁄', '€', '‹', '›', 'ﬁ', 'ﬂ',
    '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë', 'È', 'Í', 'Î', 'Ï', 'Ì', 'Ó', 'Ô',
    '\u{f8ff}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙', '˚', '¸', '˝', '˛', 'ˇ',
];
