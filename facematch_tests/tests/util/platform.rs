// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scripted native font subsystem.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;

use facematch::backend::{Bitmap, Extent, FontDescriptor, Wrap};
use facematch::normalize::normalize;
use facematch::{Error, ErrorKind, FaceSource, SelectedFace, TextBackend};

use super::tables::{name_table, NameRecord};

/// Face the fake matcher falls back to, like a real platform would.
const FALLBACK_FACE: &str = "Arial";

#[derive(Clone, Debug)]
struct Installed {
    raw_name: String,
    names: Vec<(u16, String)>,
}

/// Fake platform implementing both the face source and the text backend.
///
/// Font selection mimics a platform matcher: a request matching any name of
/// an installed face selects that face and reports its raw name. Anything
/// else silently selects [`FALLBACK_FACE`].
#[derive(Debug, Default)]
pub(crate) struct FakePlatform {
    installed: RwLock<Vec<Installed>>,
    substitutions: Vec<(String, String)>,
    fail_create: Vec<String>,
    fail_actual: Vec<String>,
    fail_draw: Vec<String>,
    enumeration_fails: AtomicBool,
    live: AtomicUsize,
    created: AtomicUsize,
    last_height: AtomicU32,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A platform with a few Latin and Korean faces.
    pub(crate) fn sample() -> Self {
        Self::new()
            .face("Arial", &[(0x0409, "Arial")])
            .face("굴림", &[(0x0409, "Gulim"), (0x0412, "굴림")])
            .face(
                "Sandoll 아람 05",
                &[(0x0409, "Sandoll Aram 05"), (0x0412, "Sandoll 아람 05")],
            )
            .face("210 Santorini", &[(0x0409, "210 Santorini")])
            .face("@굴림", &[])
    }

    /// Installs a face. `names` are family names keyed by Windows language.
    pub(crate) fn face(self, raw_name: &str, names: &[(u16, &str)]) -> Self {
        self.install(raw_name, names);
        self
    }

    /// Installs a face after construction, e.g. while a registry is live.
    pub(crate) fn install(&self, raw_name: &str, names: &[(u16, &str)]) {
        let face = Installed {
            raw_name: raw_name.to_owned(),
            names: names
                .iter()
                .map(|(lang, name)| (*lang, (*name).to_owned()))
                .collect(),
        };
        let mut installed = self.installed.write().unwrap();
        installed.push(face);
    }

    /// Makes requests for `requested` report `actual`.
    pub(crate) fn substitute(mut self, requested: &str, actual: &str) -> Self {
        self.substitutions.push((normalize(requested), actual.to_owned()));
        self
    }

    pub(crate) fn fail_create(mut self, face: &str) -> Self {
        self.fail_create.push(normalize(face));
        self
    }

    pub(crate) fn fail_actual(mut self, face: &str) -> Self {
        self.fail_actual.push(normalize(face));
        self
    }

    pub(crate) fn fail_draw(mut self, face: &str) -> Self {
        self.fail_draw.push(normalize(face));
        self
    }

    pub(crate) fn fail_enumeration(&self, fail: bool) {
        self.enumeration_fails.store(fail, Ordering::SeqCst);
    }

    /// Fonts that are currently selected and not yet released.
    pub(crate) fn live_fonts(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Fonts created so far.
    pub(crate) fn created_fonts(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Em height of the most recently created font.
    pub(crate) fn last_height(&self) -> u32 {
        self.last_height.load(Ordering::SeqCst)
    }

    fn select(&self, requested: &str) -> String {
        let key = normalize(requested);
        if let Some((_, actual)) = self.substitutions.iter().find(|(from, _)| *from == key) {
            return actual.clone();
        }
        let installed = self.installed.read().unwrap();
        installed
            .iter()
            .find(|face| {
                normalize(&face.raw_name) == key
                    || face.names.iter().any(|(_, name)| normalize(name) == key)
            })
            .map_or_else(|| FALLBACK_FACE.to_owned(), |face| face.raw_name.clone())
    }
}

impl FaceSource for FakePlatform {
    fn enumerate_faces(&self) -> Result<Vec<String>, Error> {
        if self.enumeration_fails.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::EnumerationFailure, "scripted"));
        }
        let installed = self.installed.read().unwrap();
        Ok(installed.iter().map(|face| face.raw_name.clone()).collect())
    }

    fn name_table(&self, face: &str) -> Option<Vec<u8>> {
        let installed = self.installed.read().unwrap();
        let face = installed.iter().find(|installed| installed.raw_name == face)?;
        if face.names.is_empty() {
            return None;
        }
        let records: Vec<NameRecord> = face
            .names
            .iter()
            .map(|(lang, name)| NameRecord::windows(*lang, 1, name))
            .collect();
        Some(name_table(&records))
    }
}

impl TextBackend for FakePlatform {
    fn create_font(
        &self,
        descriptor: &FontDescriptor,
    ) -> Result<Box<dyn SelectedFace + '_>, Error> {
        let key = normalize(descriptor.face_name());
        if self.fail_create.contains(&key) {
            return Err(Error::new(ErrorKind::FontCreation, "scripted"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        self.last_height.store(descriptor.height, Ordering::SeqCst);
        Ok(Box::new(FakeSelection {
            platform: self,
            actual: self.select(descriptor.face_name()),
            height: descriptor.height,
            fail_actual: self.fail_actual.contains(&key),
            fail_draw: self.fail_draw.contains(&key),
        }))
    }
}

struct FakeSelection<'a> {
    platform: &'a FakePlatform,
    actual: String,
    height: u32,
    fail_actual: bool,
    fail_draw: bool,
}

impl SelectedFace for FakeSelection<'_> {
    fn actual_face(&self) -> Result<String, Error> {
        if self.fail_actual {
            return Err(Error::new(ErrorKind::MeasurementOrDraw, "scripted"));
        }
        Ok(self.actual.clone())
    }

    fn measure(&mut self, text: &str, wrap: Wrap) -> Result<Extent, Error> {
        let advance = (self.height / 2).max(1);
        let width = advance * text.chars().count() as u32;
        let (width, lines) = match wrap {
            Wrap::Width(limit) if width > limit => (limit, width.div_ceil(limit.max(1))),
            _ => (width, 1),
        };
        Ok(Extent {
            width,
            height: self.height * lines,
        })
    }

    fn draw(&mut self, _text: &str, extent: Extent, _wrap: Wrap) -> Result<Bitmap, Error> {
        if self.fail_draw {
            return Err(Error::new(ErrorKind::MeasurementOrDraw, "scripted"));
        }
        // White text on black: the top half of the image is covered.
        let row = extent.width as usize * 4;
        let mut pixels = vec![0; row * extent.height as usize];
        let covered = row * (extent.height as usize).div_ceil(2);
        pixels[..covered].fill(255);
        Ok(Bitmap {
            width: extent.width,
            height: extent.height,
            pixels,
        })
    }
}

impl Drop for FakeSelection<'_> {
    fn drop(&mut self) {
        self.platform.live.fetch_sub(1, Ordering::SeqCst);
    }
}
