// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry shared between request threads and a background builder.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex, RwLock};

use super::{enumerate, BuildProgress, Fingerprint, Registry, RegistryCache, RegistryOptions};
use crate::backend::FaceSource;

/// Why a build was started.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum BuildMode {
    /// First build. A cached snapshot may be used.
    Startup,
    /// Rebuild only if the face list changed.
    Refresh,
    /// Rebuild from scratch, ignoring any cached snapshot.
    Invalidate,
}

/// Registry that is rebuilt in the background and swapped in atomically.
///
/// Readers take a [snapshot](Self::snapshot) and keep using it for as long
/// as they like. A build never blocks readers and readers never observe a
/// partially built registry: the new registry is published in one step
/// once it is complete. At most one build runs at a time.
#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn FaceSource>,
    cache: Option<RegistryCache>,
    read_cache: bool,
    snapshot: RwLock<Arc<Registry>>,
    progress: BuildProgress,
    version: AtomicU64,
    ready: AtomicBool,
    building: AtomicBool,
    idle: (Mutex<()>, Condvar),
}

impl SharedRegistry {
    /// Creates an empty registry without starting a build.
    pub fn new(source: Arc<dyn FaceSource>, options: RegistryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                cache: options.cache_dir.map(RegistryCache::new),
                read_cache: options.use_cache,
                snapshot: RwLock::new(Arc::new(Registry::default())),
                progress: BuildProgress::default(),
                version: AtomicU64::new(0),
                ready: AtomicBool::new(false),
                building: AtomicBool::new(false),
                idle: (Mutex::new(()), Condvar::new()),
            }),
        }
    }

    /// Creates a registry and starts building it on a background thread.
    pub fn spawn(source: Arc<dyn FaceSource>, options: RegistryOptions) -> Self {
        let registry = Self::new(source, options);
        registry.start(BuildMode::Startup);
        registry
    }

    /// Returns the latest complete registry.
    ///
    /// Before the first build finishes this is an empty registry.
    pub fn snapshot(&self) -> Arc<Registry> {
        match self.inner.snapshot.read() {
            Ok(snapshot) => snapshot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns true once a complete registry has been published.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Returns true while a build is running.
    pub fn is_building(&self) -> bool {
        self.inner.building.load(Ordering::Acquire)
    }

    /// Returns the progress of the current or last build between 0 and 1.
    pub fn progress(&self) -> f32 {
        if self.is_ready() && !self.is_building() {
            1.0
        } else {
            self.inner.progress.fraction()
        }
    }

    /// Returns a counter that increases every time a registry is published.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Rebuilds from scratch in the background, bypassing the cache.
    ///
    /// Returns false if a build is already running.
    pub fn invalidate(&self) -> bool {
        self.start(BuildMode::Invalidate)
    }

    /// Rebuilds in the background if the installed faces changed.
    ///
    /// Returns false if a build is already running.
    pub fn refresh(&self) -> bool {
        self.start(BuildMode::Refresh)
    }

    /// Blocks until no build is running or `timeout` elapses.
    ///
    /// Returns true if the registry is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let (lock, idle) = &self.inner.idle;
        let Ok(guard) = lock.lock() else {
            return false;
        };
        match idle.wait_timeout_while(guard, timeout, |_| self.is_building()) {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => false,
        }
    }

    /// Blocks until a registry has been published and no build is running,
    /// or `timeout` elapses.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        self.wait_idle(timeout) && self.is_ready()
    }

    fn start(&self, mode: BuildMode) -> bool {
        if self
            .inner
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("registry build already running, ignoring {mode:?}");
            return false;
        }
        // Reset before the thread starts so readers never see the last
        // build's completion while the faces are being enumerated.
        self.inner.progress.begin();
        let inner = self.inner.clone();
        let spawned = std::thread::Builder::new()
            .name("facematch-registry".into())
            .spawn(move || inner.run(mode));
        if let Err(err) = spawned {
            log::warn!("could not spawn registry thread ({err}), building inline");
            self.inner.run(mode);
        }
        true
    }
}

impl Inner {
    fn run(&self, mode: BuildMode) {
        let faces = enumerate(&*self.source);
        let fingerprint = Fingerprint::of(&faces);
        let current = self.current_fingerprint();
        let unchanged = self.ready.load(Ordering::Acquire) && current == fingerprint;
        if mode == BuildMode::Refresh && unchanged {
            log::info!("installed faces unchanged ({fingerprint})");
            self.progress.finish();
        } else if let Some(registry) = self.cached(mode, fingerprint) {
            log::info!("loaded {} faces from registry cache", registry.len());
            self.progress.finish();
            self.publish(registry);
        } else {
            log::info!("building registry for {} faces", faces.len());
            let registry = Registry::build_from(&*self.source, &faces, &self.progress);
            if let Some(cache) = &self.cache {
                if let Err(err) = cache.store(&registry) {
                    log::warn!("{err}");
                }
            }
            self.publish(registry);
        }
        self.finish();
    }

    fn cached(&self, mode: BuildMode, fingerprint: Fingerprint) -> Option<Registry> {
        if mode == BuildMode::Invalidate || !self.read_cache {
            return None;
        }
        self.cache.as_ref()?.load(fingerprint)
    }

    fn current_fingerprint(&self) -> Fingerprint {
        match self.snapshot.read() {
            Ok(snapshot) => snapshot.fingerprint(),
            Err(poisoned) => poisoned.into_inner().fingerprint(),
        }
    }

    fn publish(&self, registry: Registry) {
        let registry = Arc::new(registry);
        match self.snapshot.write() {
            Ok(mut snapshot) => *snapshot = registry,
            Err(poisoned) => *poisoned.into_inner() = registry,
        }
        self.version.fetch_add(1, Ordering::AcqRel);
        self.ready.store(true, Ordering::Release);
    }

    fn finish(&self) {
        let (lock, idle) = &self.idle;
        // Clear the flag under the lock so waiters cannot miss the wakeup.
        let guard = lock.lock();
        self.building.store(false, Ordering::Release);
        drop(guard);
        idle.notify_all();
    }
}

impl core::fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedRegistry")
            .field("ready", &self.is_ready())
            .field("building", &self.is_building())
            .field("version", &self.version())
            .field("faces", &self.snapshot().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::super::test_util::sample_source;
    use super::*;
    use crate::Error;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn background_build_publishes_snapshot() {
        let registry = SharedRegistry::spawn(Arc::new(sample_source()), RegistryOptions::default());
        assert!(registry.wait_ready(TIMEOUT), "build did not finish");
        assert!(!registry.is_building());
        assert_eq!(registry.progress(), 1.0);
        assert_eq!(registry.snapshot().len(), 4);
        assert_eq!(registry.version(), 1);
    }

    #[test]
    fn refresh_without_changes_keeps_snapshot() {
        let registry = SharedRegistry::spawn(Arc::new(sample_source()), RegistryOptions::default());
        assert!(registry.wait_idle(TIMEOUT), "build did not finish");
        let before = registry.snapshot();
        assert!(registry.refresh());
        assert!(registry.wait_idle(TIMEOUT), "refresh did not finish");
        assert!(Arc::ptr_eq(&before, &registry.snapshot()));
        assert_eq!(registry.version(), 1);

        assert!(registry.invalidate());
        assert!(registry.wait_idle(TIMEOUT), "rebuild did not finish");
        assert!(!Arc::ptr_eq(&before, &registry.snapshot()));
        assert_eq!(registry.version(), 2);
        // Old snapshots stay usable.
        assert_eq!(before.len(), 4);
    }

    /// Holds every enumeration until the test lets it through.
    struct GatedSource {
        inner: super::super::test_util::ListSource,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl FaceSource for GatedSource {
        fn enumerate_faces(&self) -> Result<Vec<String>, Error> {
            if let Ok(gate) = self.gate.lock() {
                let _ = gate.recv();
            }
            self.inner.enumerate_faces()
        }

        fn name_table(&self, face: &str) -> Option<Vec<u8>> {
            self.inner.name_table(face)
        }
    }

    #[test]
    fn progress_stays_at_zero_while_enumerating() {
        let (open, gate) = mpsc::channel();
        let source = GatedSource {
            inner: sample_source(),
            gate: Mutex::new(gate),
        };
        let registry = SharedRegistry::spawn(Arc::new(source), RegistryOptions::default());
        assert!(registry.is_building());
        assert_eq!(registry.progress(), 0.0);
        assert!(!registry.is_ready());
        open.send(()).unwrap();
        assert!(registry.wait_ready(TIMEOUT), "build did not finish");
        assert_eq!(registry.progress(), 1.0);

        // A refresh that finds nothing new still starts from zero.
        assert!(registry.refresh());
        assert_eq!(registry.progress(), 0.0);
        open.send(()).unwrap();
        assert!(registry.wait_idle(TIMEOUT), "refresh did not finish");
        assert_eq!(registry.progress(), 1.0);
        assert_eq!(registry.version(), 1);
    }

    #[test]
    fn not_ready_before_build() {
        let registry = SharedRegistry::new(Arc::new(sample_source()), RegistryOptions::default());
        assert!(!registry.is_ready());
        assert!(registry.snapshot().is_empty());
        assert!(registry.wait_idle(Duration::ZERO));
        assert!(!registry.wait_ready(Duration::ZERO));
    }

    #[test]
    fn cached_snapshot_is_used_at_startup() {
        let dir = std::env::temp_dir().join(format!("facematch-shared-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let options = RegistryOptions {
            cache_dir: Some(dir.clone()),
            ..RegistryOptions::default()
        };
        let first = SharedRegistry::spawn(Arc::new(sample_source()), options.clone());
        assert!(first.wait_ready(TIMEOUT), "build did not finish");
        let cache = RegistryCache::new(&dir);
        assert!(cache.path_for(first.snapshot().fingerprint()).exists());

        let second = SharedRegistry::spawn(Arc::new(sample_source()), options);
        assert!(second.wait_ready(TIMEOUT), "cache load did not finish");
        assert_eq!(second.snapshot().catalog(), first.snapshot().catalog());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
