// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;

/// Error type for face resolution and rendering.
///
/// Carries a non-exhaustive [`ErrorKind`] plus a short description of the
/// operation that failed. None of these errors are fatal: callers are expected
/// to move on to the next candidate face or a fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The non-exhaustive category describing this error.
    kind: ErrorKind,

    /// Human readable context, usually the face name or native call involved.
    detail: Cow<'static, str>,
}

impl Error {
    /// Creates a new error of the given kind.
    pub fn new(kind: ErrorKind, detail: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// The machine-readable category for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Context for the failure.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Returns true if a caller may retry the request through a different
    /// rendering path.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind, ErrorKind::FaceSubstituted)
    }

    pub(crate) fn enumeration(detail: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::EnumerationFailure, detail)
    }

    pub(crate) fn name_table(detail: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NameTableUnreadable, detail)
    }

    pub(crate) fn font_file(path: &std::path::Path, detail: &str) -> Self {
        Self::new(ErrorKind::FontFile, format!("{}: {detail}", path.display()))
    }

    pub(crate) fn font_creation(face: &str) -> Self {
        Self::new(ErrorKind::FontCreation, format!("could not create '{face}'"))
    }

    pub(crate) fn substituted(requested: &str, actual: &str) -> Self {
        Self::new(
            ErrorKind::FaceSubstituted,
            format!("requested '{requested}' but got '{actual}'"),
        )
    }

    pub(crate) fn draw(detail: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::MeasurementOrDraw, detail)
    }

    pub(crate) fn encode(err: &png::EncodingError) -> Self {
        Self::new(ErrorKind::Encode, err.to_string())
    }

    pub(crate) fn cache(err: &dyn core::error::Error) -> Self {
        Self::new(ErrorKind::Cache, err.to_string())
    }

    pub(crate) fn unsupported() -> Self {
        Self::new(
            ErrorKind::UnsupportedPlatform,
            "no native text backend on this platform",
        )
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let what = match self.kind {
            ErrorKind::EnumerationFailure => "face enumeration failed",
            ErrorKind::NameTableUnreadable => "name table unreadable",
            ErrorKind::FontCreation => "font creation failed",
            ErrorKind::FaceSubstituted => "face substituted",
            ErrorKind::MeasurementOrDraw => "text measurement or drawing failed",
            ErrorKind::Encode => "image encoding failed",
            ErrorKind::Cache => "registry cache error",
            ErrorKind::FontFile => "font file unusable",
            ErrorKind::UnsupportedPlatform => "unsupported platform",
        };
        if self.detail.is_empty() {
            f.write_str(what)
        } else {
            write!(f, "{what}: {}", self.detail)
        }
    }
}

impl core::error::Error for Error {}

/// The non-exhaustive category of an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The face enumerator was unavailable.
    EnumerationFailure,

    /// A face's `name` table could not be read.
    NameTableUnreadable,

    /// The native font descriptor was rejected.
    FontCreation,

    /// The platform selected a different face than the one requested.
    FaceSubstituted,

    /// A native measurement or drawing call failed.
    MeasurementOrDraw,

    /// The rendered bitmap could not be encoded.
    Encode,

    /// Reading or writing the registry cache failed.
    Cache,

    /// A font file on disk could not be loaded or rasterized.
    FontFile,

    /// No native text backend exists for the current platform.
    UnsupportedPlatform,
}
