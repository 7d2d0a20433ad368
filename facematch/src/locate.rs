// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index of font files on disk by the names they contain.
//!
//! Faces selected by name through the platform do not need a file, but the
//! file rasterizer does. This index maps every naming record of every face
//! in the scanned directories to the file holding it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use hashbrown::{HashMap, HashSet};
use read_fonts::{types::NameId, FileRef, FontRef, TableProvider};

use crate::normalize::NameKey;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "otc"];

const INDEXED_NAMES: &[NameId] = &[
    NameId::FAMILY_NAME,
    NameId::FULL_NAME,
    NameId::POSTSCRIPT_NAME,
    NameId::TYPOGRAPHIC_FAMILY_NAME,
    NameId::WWS_FAMILY_NAME,
];

/// Maps normalized face names to font files.
#[derive(Clone, Default, Debug)]
pub struct FontFileIndex {
    paths: HashMap<NameKey, PathBuf>,
    files: usize,
}

impl FontFileIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `dirs` recursively.
    ///
    /// Directories are visited in order and files within a directory in
    /// sorted order. The first file found for a name keeps it.
    pub fn scan<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let mut index = Self::new();
        index.add_dirs(dirs);
        index
    }

    /// Indexes `extra_dirs`, then the fonts registered with the platform,
    /// then [`default_font_dirs`].
    pub fn system<P: AsRef<Path>>(extra_dirs: &[P]) -> Self {
        let mut index = Self::new();
        index.add_dirs(extra_dirs);
        for (name, path) in crate::backend::registered_font_files() {
            index.add_registered(&name, &path);
        }
        index.add_dirs(&default_font_dirs());
        index
    }

    /// Scans `dirs` recursively and adds what they hold.
    ///
    /// Names already in the index keep their file.
    pub fn add_dirs<P: AsRef<Path>>(&mut self, dirs: &[P]) {
        let mut visited = HashSet::new();
        for dir in dirs {
            self.scan_dir(dir.as_ref(), &mut visited);
        }
        log::info!(
            "indexed {} font files under {} names",
            self.files,
            self.paths.len()
        );
    }

    /// Adds a font registration as the platform lists it.
    ///
    /// Registration names look like `Gulim & GulimChe (TrueType)`: each
    /// face before the format suffix is added, as is the whole name.
    /// Registrations whose file does not exist are skipped.
    ///
    /// Returns the number of names that were new to the index.
    pub fn add_registered(&mut self, name: &str, path: &Path) -> usize {
        if !path.is_file() {
            log::debug!("registered font {name:?} is missing at {}", path.display());
            return 0;
        }
        let mut added = usize::from(self.insert(name, path));
        let faces = match name.trim_end().strip_suffix(')') {
            Some(rest) => rest.rsplit_once(" (").map_or(name, |(faces, _)| faces),
            None => name,
        };
        for face in faces.split(" & ") {
            if self.insert(face.trim(), path) {
                added += 1;
            }
        }
        added
    }

    /// Adds every name found in the font data of `path`.
    ///
    /// Returns the number of names that were new to the index.
    pub fn add_font_data(&mut self, path: &Path, data: &[u8]) -> usize {
        let file = match FileRef::new(data) {
            Ok(file) => file,
            Err(err) => {
                log::debug!("skipping {}: {err}", path.display());
                return 0;
            }
        };
        let mut added = 0;
        for font in file.fonts().flatten() {
            for name in face_names(&font) {
                if self.insert(&name, path) {
                    added += 1;
                }
            }
        }
        self.files += 1;
        added
    }

    /// Maps `name` to `path` unless the name is already taken.
    pub fn insert(&mut self, name: &str, path: &Path) -> bool {
        let key = NameKey::new(name);
        if key.is_empty() || self.paths.contains_key(&key) {
            return false;
        }
        self.paths.insert(key, path.to_path_buf());
        true
    }

    /// Returns the file containing the face known as `alias`.
    pub fn resolve_path(&self, alias: &str) -> Option<&Path> {
        self.paths.get(&NameKey::new(alias)).map(PathBuf::as_path)
    }

    /// Returns the number of indexed names.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if no names are indexed.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn scan_dir(&mut self, dir: &Path, visited: &mut HashSet<PathBuf>) {
        let Ok(dir) = dir.canonicalize() else {
            return;
        };
        if !visited.insert(dir.clone()) {
            return;
        }
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("cannot scan {}: {err}", dir.display());
                return;
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        paths.sort();
        for path in paths {
            if path.is_dir() {
                self.scan_dir(&path, visited);
            } else if is_font_file(&path) {
                match fs::read(&path) {
                    Ok(data) => {
                        self.add_font_data(&path, &data);
                    }
                    Err(err) => log::debug!("cannot read {}: {err}", path.display()),
                }
            }
        }
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FONT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn face_names(font: &FontRef<'_>) -> Vec<String> {
    let Ok(name) = font.name() else {
        return Vec::new();
    };
    name.name_record()
        .iter()
        .filter(|record| INDEXED_NAMES.contains(&record.name_id()))
        .filter_map(|record| {
            let string = record.string(name.string_data()).ok()?;
            let value: String = string.chars().collect();
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_owned())
        })
        .collect()
}

/// Directory name font subscription clients keep their private fonts under.
const CLOUD_FONT_CLIENTS: &[&str] = &["SandollCloud"];

/// Returns the directories fonts are usually installed in on this platform,
/// including per-user directories. Directories that do not exist are
/// included and skipped by [`FontFileIndex::scan`].
///
/// On Windows this includes the private font folders of font subscription
/// clients, whose faces are activated per process and never registered.
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let env = |key: &str| std::env::var_os(key).map(PathBuf::from);
    if cfg!(target_os = "windows") {
        let windir = env("WINDIR").unwrap_or_else(|| PathBuf::from("C:\\Windows"));
        dirs.push(windir.join("Fonts"));
        let local = env("LOCALAPPDATA");
        if let Some(local) = &local {
            dirs.push(local.join("Microsoft").join("Windows").join("Fonts"));
        }
        let local_low = env("USERPROFILE").map(|home| home.join("AppData").join("LocalLow"));
        let roaming = env("APPDATA");
        for client in CLOUD_FONT_CLIENTS {
            dirs.extend(cloud_font_dirs(
                client,
                local.as_deref(),
                roaming.as_deref(),
                local_low.as_deref(),
            ));
        }
    } else if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = env("HOME") {
            dirs.push(home.join("Library").join("Fonts"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(data) = env("XDG_DATA_HOME") {
            dirs.push(data.join("fonts"));
        } else if let Some(home) = env("HOME") {
            dirs.push(home.join(".local").join("share").join("fonts"));
        }
        if let Some(home) = env("HOME") {
            dirs.push(home.join(".fonts"));
        }
    }
    dirs
}

/// Returns the font folders a subscription client may use, in the order
/// they are searched.
fn cloud_font_dirs(
    client: &str,
    local: Option<&Path>,
    roaming: Option<&Path>,
    local_low: Option<&Path>,
) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(local) = local {
        dirs.push(local.join(client).join("fonts"));
        dirs.push(local.join("Programs").join(client).join("fonts"));
    }
    for base in [roaming, local_low].into_iter().flatten() {
        dirs.push(base.join(client).join("fonts"));
    }
    dirs
}
