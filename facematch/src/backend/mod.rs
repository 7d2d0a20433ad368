// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform backends.
//!
//! A backend provides two things: the list of faces the platform can select
//! (including faces loaded privately into the process, which have no file on
//! disk) and a text drawing primitive that reports which face it actually
//! used.

#[cfg(all(feature = "system", target_os = "windows"))]
#[path = "gdi.rs"]
mod system;

#[cfg(all(feature = "system", target_os = "windows"))]
mod fonts_key;

use std::path::PathBuf;

use crate::{style::FaceStyle, Error};

#[cfg(all(feature = "system", target_os = "windows"))]
pub use system::GdiBackend;

/// Backend for the current platform.
#[cfg(all(feature = "system", target_os = "windows"))]
pub type SystemBackend = GdiBackend;

/// Backend for the current platform.
#[cfg(not(all(feature = "system", target_os = "windows")))]
pub type SystemBackend = NullBackend;

/// Returns the font files registered with the platform, keyed by the name
/// they are registered under.
///
/// Only Windows keeps such a list. Elsewhere this is empty.
pub fn registered_font_files() -> Vec<(String, PathBuf)> {
    #[cfg(all(feature = "system", target_os = "windows"))]
    {
        fonts_key::registered_font_files()
    }
    #[cfg(not(all(feature = "system", target_os = "windows")))]
    {
        Vec::new()
    }
}

/// Longest face name, in UTF-16 code units, a native font descriptor holds.
pub const MAX_FACE_NAME_UNITS: usize = 31;

/// Source of installed face names and their metadata.
pub trait FaceSource: Send + Sync {
    /// Returns the name of every face the platform can currently select.
    fn enumerate_faces(&self) -> Result<Vec<String>, Error>;

    /// Returns the raw `name` table of the given face, if the platform can
    /// provide one.
    fn name_table(&self, face: &str) -> Option<Vec<u8>>;
}

/// Native text drawing.
pub trait TextBackend: Send + Sync {
    /// Creates a font for `descriptor` and selects it into a fresh drawing
    /// context.
    ///
    /// Native resources are owned by the returned face and released when it
    /// is dropped.
    fn create_font(&self, descriptor: &FontDescriptor) -> Result<Box<dyn SelectedFace + '_>, Error>;
}

/// A font selected into a native drawing context.
pub trait SelectedFace {
    /// Returns the name of the face the platform actually activated.
    fn actual_face(&self) -> Result<String, Error>;

    /// Measures `text` with the given wrapping mode.
    fn measure(&mut self, text: &str, wrap: Wrap) -> Result<Extent, Error>;

    /// Draws `text` in white on black into a fresh bitmap of the given size.
    fn draw(&mut self, text: &str, extent: Extent, wrap: Wrap) -> Result<Bitmap, Error>;
}

/// Everything the platform needs to create a font.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FontDescriptor {
    face_name: String,
    /// Em height in pixels.
    pub height: u32,
    /// Requested weight and slant.
    pub style: FaceStyle,
}

impl FontDescriptor {
    /// Creates a descriptor, truncating the face name to what the platform
    /// can hold.
    pub fn new(face_name: &str, height: u32, style: FaceStyle) -> Self {
        let mut units = 0;
        let face_name = face_name
            .chars()
            .take_while(|ch| {
                units += ch.len_utf16();
                units <= MAX_FACE_NAME_UNITS
            })
            .collect();
        Self {
            face_name,
            height,
            style,
        }
    }

    /// Returns the face name, possibly truncated.
    pub fn face_name(&self) -> &str {
        &self.face_name
    }
}

/// How text is laid out into lines.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Wrap {
    /// Everything on one line.
    #[default]
    SingleLine,
    /// Break between words so no line exceeds the given width in pixels.
    Width(u32),
}

impl Wrap {
    /// Word wraps at `width` if it is present and non-zero.
    pub fn from_width(width: Option<u32>) -> Self {
        match width {
            Some(width) if width > 0 => Self::Width(width),
            _ => Self::SingleLine,
        }
    }
}

/// Size of a block of text in pixels.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Top-down 32 bit BGRA pixels as produced by the native drawing context.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Four bytes per pixel, rows packed without padding.
    pub pixels: Vec<u8>,
}

impl core::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}

/// Backend for platforms without a native text subsystem.
///
/// Enumerates no faces and refuses to create fonts, so every render falls
/// through to the file rasterizer.
#[derive(Copy, Clone, Default, Debug)]
pub struct NullBackend;

impl FaceSource for NullBackend {
    fn enumerate_faces(&self) -> Result<Vec<String>, Error> {
        Ok(Vec::new())
    }

    fn name_table(&self, _face: &str) -> Option<Vec<u8>> {
        None
    }
}

impl TextBackend for NullBackend {
    fn create_font(
        &self,
        _descriptor: &FontDescriptor,
    ) -> Result<Box<dyn SelectedFace + '_>, Error> {
        Err(Error::unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn descriptor_truncates_in_utf16_units() {
        let long = "A".repeat(40);
        assert_eq!(FontDescriptor::new(&long, 16, FaceStyle::default()).face_name().len(), 31);
        // Each of these takes two UTF-16 units.
        let astral = "𝔘".repeat(20);
        let descriptor = FontDescriptor::new(&astral, 16, FaceStyle::default());
        assert_eq!(descriptor.face_name().chars().count(), 15);
        assert_eq!(FontDescriptor::new("Arial", 16, FaceStyle::default()).face_name(), "Arial");
    }

    #[test]
    fn wrap_from_width() {
        assert_eq!(Wrap::from_width(None), Wrap::SingleLine);
        assert_eq!(Wrap::from_width(Some(0)), Wrap::SingleLine);
        assert_eq!(Wrap::from_width(Some(120)), Wrap::Width(120));
    }

    #[test]
    fn null_backend_has_nothing() {
        assert_eq!(NullBackend.enumerate_faces(), Ok(Vec::new()));
        let descriptor = FontDescriptor::new("Arial", 16, FaceStyle::default());
        let err = NullBackend.create_font(&descriptor).err().map(|err| err.kind());
        assert_eq!(err, Some(ErrorKind::UnsupportedPlatform));
    }
}
