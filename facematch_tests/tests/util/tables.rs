// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synthetic `name` tables and font files.

/// One `name` table record.
#[derive(Clone, Debug)]
pub(crate) struct NameRecord {
    pub(crate) platform_id: u16,
    pub(crate) encoding_id: u16,
    pub(crate) language_id: u16,
    pub(crate) name_id: u16,
    pub(crate) bytes: Vec<u8>,
}

impl NameRecord {
    /// A Windows Unicode record.
    pub(crate) fn windows(language_id: u16, name_id: u16, text: &str) -> Self {
        Self {
            platform_id: 3,
            encoding_id: 1,
            language_id,
            name_id,
            bytes: utf16_be(text),
        }
    }
}

pub(crate) fn utf16_be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// Builds a format 0 `name` table.
pub(crate) fn name_table(records: &[NameRecord]) -> Vec<u8> {
    let storage = 6 + 12 * records.len();
    let mut out = Vec::new();
    out.extend_from_slice(&0_u16.to_be_bytes());
    out.extend_from_slice(&(records.len() as u16).to_be_bytes());
    out.extend_from_slice(&(storage as u16).to_be_bytes());
    let mut strings = Vec::new();
    for record in records {
        for value in [
            record.platform_id,
            record.encoding_id,
            record.language_id,
            record.name_id,
            record.bytes.len() as u16,
            strings.len() as u16,
        ] {
            out.extend_from_slice(&value.to_be_bytes());
        }
        strings.extend_from_slice(&record.bytes);
    }
    out.extend_from_slice(&strings);
    out
}

/// Tables of one face.
pub(crate) type Tables = Vec<([u8; 4], Vec<u8>)>;

/// A face with nothing but a `name` table holding the given Windows English
/// names, keyed by name id.
pub(crate) fn named_face(names: &[(u16, &str)]) -> Tables {
    let records: Vec<NameRecord> = names
        .iter()
        .map(|(id, text)| NameRecord::windows(0x0409, *id, text))
        .collect();
    vec![(*b"name", name_table(&records))]
}

/// Adds one-glyph horizontal metrics to a face so it can be rasterized.
///
/// The glyph advance is half an em and the extent is exactly one em.
pub(crate) fn with_metrics(mut tables: Tables) -> Tables {
    let mut head = vec![0_u8; 54];
    head[0..4].copy_from_slice(&0x0001_0000_u32.to_be_bytes());
    head[12..16].copy_from_slice(&0x5F0F_3CF5_u32.to_be_bytes());
    head[18..20].copy_from_slice(&1024_u16.to_be_bytes());
    let mut hhea = vec![0_u8; 36];
    hhea[0..4].copy_from_slice(&0x0001_0000_u32.to_be_bytes());
    hhea[4..6].copy_from_slice(&768_i16.to_be_bytes());
    hhea[6..8].copy_from_slice(&(-256_i16).to_be_bytes());
    hhea[10..12].copy_from_slice(&512_u16.to_be_bytes());
    hhea[34..36].copy_from_slice(&1_u16.to_be_bytes());
    let hmtx = [512_u16.to_be_bytes(), 0_u16.to_be_bytes()].concat();
    let maxp = [0x0000_5000_u32.to_be_bytes().as_slice(), &1_u16.to_be_bytes()].concat();
    tables.extend([
        (*b"head", head),
        (*b"hhea", hhea),
        (*b"hmtx", hmtx),
        (*b"maxp", maxp),
    ]);
    // Table directories are searched by tag.
    tables.sort_by(|a, b| a.0.cmp(&b.0));
    tables
}

/// Builds a single face font file.
pub(crate) fn sfnt(tables: &Tables) -> Vec<u8> {
    let mut out = Vec::new();
    write_directory(&mut out, tables, 12 + 16 * tables.len());
    for (_, data) in tables {
        append_padded(&mut out, data);
    }
    out
}

/// Builds a `ttcf` collection holding every face.
pub(crate) fn collection(faces: &[Tables]) -> Vec<u8> {
    let header_len = 12 + 4 * faces.len();
    let directories_len: usize = faces.iter().map(|tables| 12 + 16 * tables.len()).sum();
    let mut out = Vec::new();
    out.extend_from_slice(b"ttcf");
    out.extend_from_slice(&0x0001_0000_u32.to_be_bytes());
    out.extend_from_slice(&(faces.len() as u32).to_be_bytes());
    let mut directory = header_len;
    for tables in faces {
        out.extend_from_slice(&(directory as u32).to_be_bytes());
        directory += 12 + 16 * tables.len();
    }
    let mut data_offset = header_len + directories_len;
    for tables in faces {
        write_directory(&mut out, tables, data_offset);
        data_offset += tables.iter().map(|(_, data)| padded_len(data)).sum::<usize>();
    }
    for tables in faces {
        for (_, data) in tables {
            append_padded(&mut out, data);
        }
    }
    out
}

fn write_directory(out: &mut Vec<u8>, tables: &Tables, mut offset: usize) {
    out.extend_from_slice(&0x0001_0000_u32.to_be_bytes());
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0; 6]);
    for (tag, data) in tables {
        out.extend_from_slice(tag);
        out.extend_from_slice(&0_u32.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += padded_len(data);
    }
}

fn padded_len(data: &[u8]) -> usize {
    data.len().next_multiple_of(4)
}

fn append_padded(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
    out.resize(out.len() + padded_len(data) - data.len(), 0);
}
