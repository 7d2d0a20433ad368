// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! On-disk snapshots of a registry.

use std::{
    fs,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::{FaceRecord, Fingerprint, Registry};
use crate::Error;

/// Bumped whenever the file layout or record semantics change.
const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct CacheFileRef<'a> {
    schema: u32,
    fingerprint: Fingerprint,
    records: &'a [FaceRecord],
}

#[derive(Deserialize)]
struct CacheFile {
    schema: u32,
    fingerprint: Fingerprint,
    records: Vec<FaceRecord>,
}

/// Content-addressed store of registry snapshots.
///
/// Each snapshot lives in its own file named after the fingerprint of the
/// face list it was built from, so a changed installation simply misses.
#[derive(Clone, Debug)]
pub struct RegistryCache {
    dir: PathBuf,
}

impl RegistryCache {
    /// Creates a cache rooted at `dir`. The directory is created on first
    /// store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a snapshot with `fingerprint` is stored in.
    pub fn path_for(&self, fingerprint: Fingerprint) -> PathBuf {
        self.dir.join(format!("registry-{fingerprint}.json"))
    }

    /// Loads the snapshot for `fingerprint`.
    ///
    /// Missing, unreadable, truncated or mismatched files all yield `None`.
    pub fn load(&self, fingerprint: Fingerprint) -> Option<Registry> {
        let path = self.path_for(fingerprint);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) => {
                log::debug!("no registry cache at {}: {err}", path.display());
                return None;
            }
        };
        let cached: CacheFile = match serde_json::from_reader(BufReader::new(file)) {
            Ok(cached) => cached,
            Err(err) => {
                log::debug!("ignoring registry cache {}: {err}", path.display());
                return None;
            }
        };
        if cached.schema != SCHEMA_VERSION || cached.fingerprint != fingerprint {
            log::debug!("ignoring stale registry cache {}", path.display());
            return None;
        }
        Some(Registry::from_records(fingerprint, cached.records))
    }

    /// Writes `registry` to its snapshot file.
    ///
    /// The file is written next to its final location and renamed into place
    /// so readers never see a partial snapshot.
    pub fn store(&self, registry: &Registry) -> Result<PathBuf, Error> {
        let path = self.path_for(registry.fingerprint());
        self.write(&path, registry)
            .map_err(|err| Error::cache(&err))?;
        Ok(path)
    }

    fn write(&self, path: &Path, registry: &Registry) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let staging = path.with_extension("json.tmp");
        let mut writer = BufWriter::new(fs::File::create(&staging)?);
        let file = CacheFileRef {
            schema: SCHEMA_VERSION,
            fingerprint: registry.fingerprint(),
            records: registry.records(),
        };
        serde_json::to_writer(&mut writer, &file)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&staging, path)
    }
}
