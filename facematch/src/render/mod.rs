// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering with verification of the selected face.
//!
//! A platform font matcher never fails: if it cannot find the requested face
//! it quietly picks another one. Every render therefore goes through an
//! explicit verification step between creating the font and drawing with it:
//!
//! ```text
//! FontCreated --verify--> Verified --measure--> Measured --rasterize--> Rasterized --encode--> image
//!                   \---> Substituted
//! ```
//!
//! Each state owns the native resources it needs, and dropping a state
//! releases them, so no path can leak a font or a context.

pub mod mask;

use hashbrown::HashSet;

use crate::{
    backend::{Bitmap, Extent, FontDescriptor, SelectedFace, TextBackend, Wrap},
    family_match::treat_as_substitution,
    normalize::NameKey,
    resolve::ResolvedRequest,
    Error,
};

/// How strictly the reported face must match the request.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum SubstitutionPolicy {
    /// The reported face must be one of the known aliases.
    #[default]
    Strict,
    /// Also accept faces that the family heuristic considers the same
    /// family as the request.
    FamilyHeuristic,
}

/// Options for a render engine.
#[derive(Copy, Clone, Default, Debug)]
pub struct RenderOptions {
    /// Verification policy.
    ///
    /// The default value is [`SubstitutionPolicy::Strict`].
    pub policy: SubstitutionPolicy,
}

/// Names that count as the requested face for one request.
///
/// Built per request from the requested face, any alternates the caller
/// supplied and the registry aliases for the face. It is never written back
/// to the registry.
#[derive(Clone, Debug)]
pub struct AliasSet {
    requested: String,
    keys: HashSet<NameKey>,
}

impl AliasSet {
    /// Creates a set containing only `requested`.
    pub fn new(requested: &str) -> Self {
        let mut keys = HashSet::new();
        let key = NameKey::new(requested);
        if !key.is_empty() {
            keys.insert(key);
        }
        Self {
            requested: requested.to_owned(),
            keys,
        }
    }

    /// Adds one more name.
    pub fn insert(&mut self, name: &str) {
        let key = NameKey::new(name);
        if !key.is_empty() {
            self.keys.insert(key);
        }
    }

    /// Returns the face name the set was created for.
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Returns true if `name` normalizes to one of the aliases.
    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains(&NameKey::new(name))
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no name produced a usable key.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: AsRef<str>> Extend<S> for AliasSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name.as_ref());
        }
    }
}

/// Encoded result of a verified render.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// PNG bytes.
    pub png: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Face that drew the image, as reported by the platform.
    pub actual_face: String,
}

impl core::fmt::Debug for RenderedImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderedImage")
            .field("png", &self.png.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("actual_face", &self.actual_face)
            .finish()
    }
}

/// Result of a render request.
#[derive(Clone, PartialEq, Debug)]
pub enum RenderOutcome {
    /// The requested face drew the text.
    Rendered(RenderedImage),
    /// The platform picked a different face. No pixels were produced.
    Substituted {
        /// Face that was asked for.
        requested: String,
        /// Face the platform used instead.
        actual: String,
    },
    /// A native call failed.
    Failed(Error),
}

impl RenderOutcome {
    /// Returns the image if the render succeeded.
    pub fn image(&self) -> Option<&RenderedImage> {
        match self {
            Self::Rendered(image) => Some(image),
            _ => None,
        }
    }

    /// Returns true for [`RenderOutcome::Rendered`].
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    /// Returns a short name for the outcome class.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Rendered(_) => "rendered",
            Self::Substituted { .. } => "substituted",
            Self::Failed(_) => "failed",
        }
    }

    /// Converts the outcome into a `Result`, mapping substitution to
    /// [`ErrorKind::FaceSubstituted`](crate::ErrorKind::FaceSubstituted).
    pub fn into_result(self) -> Result<RenderedImage, Error> {
        match self {
            Self::Rendered(image) => Ok(image),
            Self::Substituted { requested, actual } => Err(Error::substituted(&requested, &actual)),
            Self::Failed(err) => Err(err),
        }
    }
}

impl From<Result<RenderedImage, Error>> for RenderOutcome {
    fn from(result: Result<RenderedImage, Error>) -> Self {
        match result {
            Ok(image) => Self::Rendered(image),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Parameters of one render.
#[derive(Clone, Copy, Debug)]
pub struct TextRun<'a> {
    /// Text to draw. Empty text is drawn as a single space.
    pub text: &'a str,
    /// Em height in pixels.
    pub size: u32,
    /// Wrap width in pixels. The image is at least this wide.
    pub width: Option<u32>,
}

/// Renders text through a native backend and refuses substituted faces.
#[derive(Debug)]
pub struct RenderEngine<'a, B: ?Sized> {
    backend: &'a B,
    options: RenderOptions,
}

impl<'a, B: TextBackend + ?Sized> RenderEngine<'a, B> {
    /// Creates an engine drawing through `backend`.
    pub fn new(backend: &'a B, options: RenderOptions) -> Self {
        Self { backend, options }
    }

    /// Creates a font for `request` and selects it.
    pub fn create_font(
        &self,
        request: &ResolvedRequest,
        size: u32,
    ) -> Result<FontCreated<'a>, Error> {
        let descriptor = FontDescriptor::new(&request.face_name, size, request.style);
        let face = self.backend.create_font(&descriptor)?;
        Ok(FontCreated {
            face,
            requested: request.face_name.clone(),
            policy: self.options.policy,
        })
    }

    /// Runs the whole pipeline for one request.
    pub fn render(
        &self,
        request: &ResolvedRequest,
        run: TextRun<'_>,
        aliases: &AliasSet,
    ) -> RenderOutcome {
        let font = match self.create_font(request, run.size) {
            Ok(font) => font,
            Err(err) => return RenderOutcome::Failed(err),
        };
        let verified = match font.verify(aliases) {
            Ok(Verification::Verified(verified)) => verified,
            Ok(Verification::Substituted { requested, actual }) => {
                log::warn!("'{requested}' was substituted by '{actual}'");
                return RenderOutcome::Substituted { requested, actual };
            }
            Err(err) => return RenderOutcome::Failed(err),
        };
        verified
            .measure(run)
            .and_then(Measured::rasterize)
            .and_then(Rasterized::encode)
            .into()
    }
}

/// A font that has been created but not yet checked.
pub struct FontCreated<'a> {
    face: Box<dyn SelectedFace + 'a>,
    requested: String,
    policy: SubstitutionPolicy,
}

impl<'a> FontCreated<'a> {
    /// Asks the platform which face it activated and compares it against
    /// `aliases`.
    ///
    /// A failed query is an error: a face that cannot be verified is never
    /// drawn.
    pub fn verify(self, aliases: &AliasSet) -> Result<Verification<'a>, Error> {
        let actual = self.face.actual_face()?;
        let accepted = aliases.contains(&actual)
            || (self.policy == SubstitutionPolicy::FamilyHeuristic
                && !treat_as_substitution(&self.requested, &actual));
        if accepted {
            Ok(Verification::Verified(Verified {
                face: self.face,
                actual,
            }))
        } else {
            Ok(Verification::Substituted {
                requested: self.requested,
                actual,
            })
        }
    }
}

impl core::fmt::Debug for FontCreated<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FontCreated")
            .field("requested", &self.requested)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Result of checking the selected face.
#[derive(Debug)]
pub enum Verification<'a> {
    /// The platform activated one of the aliases.
    Verified(Verified<'a>),
    /// The platform activated something else. The font has been released.
    Substituted {
        /// Face that was asked for.
        requested: String,
        /// Face the platform used instead.
        actual: String,
    },
}

/// A face that is known to be the one requested.
pub struct Verified<'a> {
    face: Box<dyn SelectedFace + 'a>,
    actual: String,
}

impl<'a> Verified<'a> {
    /// Returns the face name the platform reported.
    pub fn actual_face(&self) -> &str {
        &self.actual
    }

    /// Measures the text.
    ///
    /// The image is as wide as the wrap width or the text, whichever is
    /// larger, and at least as tall as the em height.
    pub fn measure(mut self, run: TextRun<'_>) -> Result<Measured<'a>, Error> {
        let text = if run.text.is_empty() { " " } else { run.text };
        let wrap = Wrap::from_width(run.width);
        let measured = self.face.measure(text, wrap)?;
        let width = measured.width.max(1);
        let extent = Extent {
            width: run.width.unwrap_or(width).max(width),
            height: measured.height.max(run.size).max(1),
        };
        Ok(Measured {
            face: self.face,
            actual: self.actual,
            text: text.to_owned(),
            wrap,
            extent,
        })
    }
}

impl core::fmt::Debug for Verified<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Verified")
            .field("actual", &self.actual)
            .finish_non_exhaustive()
    }
}

/// A verified face with a known image size.
pub struct Measured<'a> {
    face: Box<dyn SelectedFace + 'a>,
    actual: String,
    text: String,
    wrap: Wrap,
    extent: Extent,
}

impl Measured<'_> {
    /// Returns the size of the image that will be drawn.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Draws the text and releases the native font.
    pub fn rasterize(mut self) -> Result<Rasterized, Error> {
        let bitmap = self.face.draw(&self.text, self.extent, self.wrap)?;
        drop(self.face);
        let expected = self.extent.width as usize * self.extent.height as usize * 4;
        if bitmap.pixels.len() != expected {
            return Err(Error::draw(format!(
                "bitmap holds {} bytes, expected {expected}",
                bitmap.pixels.len()
            )));
        }
        Ok(Rasterized {
            bitmap,
            actual: self.actual,
        })
    }
}

impl core::fmt::Debug for Measured<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Measured")
            .field("actual", &self.actual)
            .field("extent", &self.extent)
            .finish_non_exhaustive()
    }
}

/// Drawn pixels, independent of any native resources.
#[derive(Debug)]
pub struct Rasterized {
    bitmap: Bitmap,
    actual: String,
}

impl Rasterized {
    /// Converts the coverage mask to RGBA and encodes it as PNG.
    pub fn encode(self) -> Result<RenderedImage, Error> {
        let rgba = mask::coverage_to_rgba(&self.bitmap.pixels);
        let png = mask::encode_png(self.bitmap.width, self.bitmap.height, &rgba)?;
        Ok(RenderedImage {
            png,
            width: self.bitmap.width,
            height: self.bitmap.height,
            actual_face: self.actual,
        })
    }
}
