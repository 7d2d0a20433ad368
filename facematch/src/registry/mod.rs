// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index of installed faces under all of their names.

mod cache;
mod shared;

pub use cache::RegistryCache;
pub use shared::SharedRegistry;

use core::hash::{BuildHasher, Hasher};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::collections::BTreeSet;
use std::path::PathBuf;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    backend::FaceSource,
    name_table::{extract_names, LanguageNames},
    normalize::{NameKey, VERTICAL_MARKER},
};

/// Options for a registry.
#[derive(Clone, Debug)]
pub struct RegistryOptions {
    /// Directory for cached registry snapshots.
    ///
    /// The default value is `None`, which disables caching.
    pub cache_dir: Option<PathBuf>,

    /// If false, a cache directory is still written but never read.
    ///
    /// The default value is true.
    pub use_cache: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            use_cache: true,
        }
    }
}

/// One face as the platform enumerates it, with every name it is known by.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FaceRecord {
    raw_name: String,
    language_names: LanguageNames,
    aliases: BTreeSet<String>,
}

impl FaceRecord {
    /// Creates a record for `raw_name` with the given localized names.
    pub fn new(raw_name: impl Into<String>, language_names: LanguageNames) -> Self {
        let raw_name = raw_name.into();
        let mut record = Self {
            aliases: BTreeSet::from([raw_name.clone()]),
            raw_name,
            language_names,
        };
        let names: Vec<String> = record.language_names.values().cloned().collect();
        for name in names {
            record.add_alias(&name);
        }
        record
    }

    /// Returns the exact name the platform enumerated. This is the only name
    /// guaranteed to select the face again.
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Returns localized family names keyed by language tag.
    pub fn language_names(&self) -> &LanguageNames {
        &self.language_names
    }

    /// Returns every name of the face, including the raw name.
    pub fn aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    /// Adds an alias. Blank names are ignored and aliases are never removed.
    pub fn add_alias(&mut self, alias: &str) -> bool {
        let alias = alias.trim();
        !alias.is_empty() && self.aliases.insert(alias.to_owned())
    }

    fn ensure_raw_alias(&mut self) {
        if !self.aliases.contains(&self.raw_name) {
            self.aliases.insert(self.raw_name.clone());
        }
    }
}

/// Catalog entry describing one face.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Raw face name.
    pub primary_name: String,
    /// All names of the face.
    pub aliases: Vec<String>,
    /// Localized family names keyed by language tag.
    pub language_names: LanguageNames,
}

/// Content hash of the sorted list of enumerated face names.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    const SEED: u64 = 0x6661_6365_6d61_7463;

    /// Computes the fingerprint of a sorted list of face names.
    pub fn of<S: AsRef<str>>(names: &[S]) -> Self {
        let mut hasher = foldhash::fast::FixedState::with_seed(Self::SEED).build_hasher();
        hasher.write_usize(names.len());
        for name in names {
            hasher.write(name.as_ref().as_bytes());
            hasher.write_u8(0xff);
        }
        Self(hasher.finish())
    }

    /// Returns the raw hash value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Progress of a registry build.
#[derive(Default, Debug)]
pub struct BuildProgress {
    done: AtomicUsize,
    total: AtomicUsize,
    /// Set while the faces are still being enumerated.
    pending: AtomicBool,
}

impl BuildProgress {
    /// Returns the completed fraction between 0 and 1.
    ///
    /// The fraction never decreases while a build is running. It is 0 while
    /// the faces are still being enumerated.
    pub fn fraction(&self) -> f32 {
        if self.pending.load(Ordering::Acquire) {
            return 0.0;
        }
        let total = self.total.load(Ordering::Acquire);
        let done = self.done.load(Ordering::Acquire);
        if total == 0 {
            1.0
        } else {
            done.min(total) as f32 / total as f32
        }
    }

    /// Marks a build whose face count is not known yet.
    pub(crate) fn begin(&self) {
        self.pending.store(true, Ordering::Release);
        self.done.store(0, Ordering::Release);
        self.total.store(0, Ordering::Release);
    }

    pub(crate) fn start(&self, total: usize) {
        self.done.store(0, Ordering::Release);
        self.total.store(total, Ordering::Release);
        self.pending.store(false, Ordering::Release);
    }

    pub(crate) fn advance(&self) {
        self.done.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn finish(&self) {
        let total = self.total.load(Ordering::Acquire);
        self.done.store(total, Ordering::Release);
        self.pending.store(false, Ordering::Release);
    }
}

/// Maps every normalized face name to a single record.
///
/// A key is owned by the first record that claims it. Later records whose
/// raw name collides are rejected and later aliases that collide are
/// dropped, so a name never moves to a different face once indexed.
#[derive(Clone, Default, Debug)]
pub struct Registry {
    records: Vec<FaceRecord>,
    keys: HashMap<NameKey, usize>,
    fingerprint: Fingerprint,
}

impl Registry {
    /// Creates an empty registry with the given fingerprint.
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            ..Self::default()
        }
    }

    /// Enumerates `source` and indexes every face with its localized names.
    pub fn build(source: &dyn FaceSource, progress: &BuildProgress) -> Self {
        let faces = enumerate(source);
        Self::build_from(source, &faces, progress)
    }

    /// Indexes the given faces, which should come from [`enumerate`].
    pub fn build_from(
        source: &dyn FaceSource,
        faces: &[String],
        progress: &BuildProgress,
    ) -> Self {
        progress.start(faces.len());
        let mut registry = Self::new(Fingerprint::of(faces));
        for face in faces {
            let names = extract_names(source, face);
            registry.insert(FaceRecord::new(face.clone(), names));
            progress.advance();
        }
        progress.finish();
        log::info!(
            "indexed {} faces under {} names",
            registry.records.len(),
            registry.keys.len()
        );
        registry
    }

    /// Rebuilds a registry from records, for example ones read from a cache.
    pub fn from_records(
        fingerprint: Fingerprint,
        records: impl IntoIterator<Item = FaceRecord>,
    ) -> Self {
        let mut registry = Self::new(fingerprint);
        for mut record in records {
            record.ensure_raw_alias();
            registry.insert(record);
        }
        registry
    }

    /// Adds a record under its raw name and all of its aliases.
    ///
    /// Returns false, leaving the registry unchanged, if the raw name is
    /// blank or already indexed.
    pub fn insert(&mut self, record: FaceRecord) -> bool {
        let primary = NameKey::new(record.raw_name());
        if primary.is_empty() {
            return false;
        }
        if let Some(&existing) = self.keys.get(&primary) {
            log::debug!(
                "'{}' collides with '{}', keeping the existing face",
                record.raw_name(),
                self.records[existing].raw_name()
            );
            return false;
        }
        let index = self.records.len();
        self.keys.insert(primary, index);
        for alias in record.aliases() {
            let key = NameKey::new(alias);
            if key.is_empty() {
                continue;
            }
            match self.keys.get(&key) {
                None => {
                    self.keys.insert(key, index);
                }
                Some(&owner) if owner != index => log::debug!(
                    "alias '{alias}' of '{}' already belongs to '{}'",
                    record.raw_name(),
                    self.records[owner].raw_name()
                ),
                Some(_) => {}
            }
        }
        self.records.push(record);
        true
    }

    /// Returns the record known under `name` in any language.
    pub fn find(&self, name: &str) -> Option<&FaceRecord> {
        let index = *self.keys.get(&NameKey::new(name))?;
        self.records.get(index)
    }

    /// Returns every alias of the face known as `name`, or just `name` if
    /// the face is unknown.
    pub fn aliases_for(&self, name: &str) -> BTreeSet<String> {
        match self.find(name) {
            Some(record) => record.aliases().clone(),
            None => BTreeSet::from([name.to_owned()]),
        }
    }

    /// Returns all records in insertion order.
    pub fn records(&self) -> &[FaceRecord] {
        &self.records
    }

    /// Returns the number of faces.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no faces are indexed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the fingerprint of the face list this registry was built from.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Returns one catalog entry per face.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.records
            .iter()
            .map(|record| CatalogEntry {
                primary_name: record.raw_name.clone(),
                aliases: record.aliases.iter().cloned().collect(),
                language_names: record.language_names.clone(),
            })
            .collect()
    }
}

/// Returns the sorted, deduplicated face names of `source` without vertical
/// writing variants.
///
/// An unavailable enumerator is logged and treated as having no faces.
pub fn enumerate(source: &dyn FaceSource) -> Vec<String> {
    let mut faces = match source.enumerate_faces() {
        Ok(faces) => faces,
        Err(err) => {
            log::warn!("{err}; continuing without faces");
            return Vec::new();
        }
    };
    faces.retain(|face| !face.is_empty() && !face.starts_with(VERTICAL_MARKER));
    faces.sort_unstable();
    faces.dedup();
    faces
}
