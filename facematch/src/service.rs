// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Preview requests from a front end, end to end.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    backend::{SystemBackend, TextBackend},
    locate::FontFileIndex,
    registry::{CatalogEntry, RegistryOptions, SharedRegistry},
    render::{AliasSet, RenderEngine, RenderOptions, RenderOutcome, RenderedImage, TextRun},
    resolve::{resolve, FaceQuery, ResolvedRequest},
};

/// Options for a preview service.
#[derive(Clone, Debug)]
pub struct PreviewOptions {
    /// Smallest requested size accepted, in pixels.
    ///
    /// The default value is 8.
    pub min_size: u32,

    /// Largest requested size accepted, in pixels.
    ///
    /// The default value is 160.
    pub max_size: u32,

    /// Factor from the requested size to the em height that is drawn.
    ///
    /// The default value is 1.1.
    pub size_scale: f32,

    /// Largest em height that is drawn, in pixels.
    ///
    /// The default value is 220.
    pub max_effective_size: u32,

    /// Widest wrap width accepted, in pixels.
    ///
    /// The default value is 4096.
    pub max_width: u32,

    /// If true, faces rejected by the native path are drawn from their font
    /// file when one can be found.
    ///
    /// The default value is true.
    pub file_fallback: bool,

    /// Options for the native render engine.
    pub render: RenderOptions,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            min_size: 8,
            max_size: 160,
            size_scale: 1.1,
            max_effective_size: 220,
            max_width: 4096,
            file_fallback: true,
            render: RenderOptions::default(),
        }
    }
}

impl PreviewOptions {
    /// Clamps a requested size and scales it to the em height that is drawn.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "The scaled size is rounded and clamped before the cast."
    )]
    pub fn effective_size(&self, size: u32) -> u32 {
        let size = size.clamp(self.min_size, self.max_size.max(self.min_size));
        let scaled = (size as f32 * self.size_scale).round();
        let scaled = scaled.clamp(0.0, u32::MAX as f32) as u32;
        scaled.clamp(self.min_size, self.max_effective_size.max(self.min_size))
    }

    /// Drops a zero wrap width and limits the rest to `max_width`.
    pub fn effective_width(&self, width: Option<u32>) -> Option<u32> {
        width
            .filter(|&width| width > 0)
            .map(|width| width.min(self.max_width.max(1)))
    }
}

/// One preview as a front end sends it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewRequest {
    /// Name the user picked.
    pub name: String,
    /// PostScript name, if the front end knows it.
    pub postscript_name: Option<String>,
    /// Family name, if the front end knows it.
    pub family_name: Option<String>,
    /// Style name such as `"Bold Italic"`.
    pub style: Option<String>,
    /// Text to draw.
    pub text: String,
    /// Requested size in pixels, before clamping.
    pub size: u32,
    /// Wrap width in pixels.
    pub width: Option<u32>,
    /// Other names the caller knows this face by.
    pub aliases: Vec<String>,
    /// Caller token echoed back in the [`Preview`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Default for PreviewRequest {
    fn default() -> Self {
        Self {
            name: String::new(),
            postscript_name: None,
            family_name: None,
            style: None,
            text: "Sample".to_owned(),
            size: 24,
            width: None,
            aliases: Vec::new(),
            request_id: None,
        }
    }
}

impl PreviewRequest {
    /// Creates a request for `name` with the default text and size.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the names of the request as a resolver query.
    pub fn query(&self) -> FaceQuery {
        FaceQuery {
            display_name: Some(self.name.clone()),
            postscript_name: self.postscript_name.clone(),
            family_name: self.family_name.clone(),
            style: self.style.clone(),
        }
    }
}

/// Which path produced a preview.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewOrigin {
    /// The platform drew the verified face.
    Native,
    /// The face was drawn from its font file.
    File,
}

/// Result of a preview request.
#[derive(Clone, PartialEq, Debug)]
pub struct Preview {
    /// Name from the request.
    pub font_name: String,
    /// Token from the request.
    pub request_id: Option<String>,
    /// What happened.
    pub outcome: RenderOutcome,
    /// Which path produced `outcome`.
    pub origin: PreviewOrigin,
}

impl Preview {
    fn new(request: &PreviewRequest, outcome: RenderOutcome, origin: PreviewOrigin) -> Self {
        Self {
            font_name: request.name.clone(),
            request_id: request.request_id.clone(),
            outcome,
            origin,
        }
    }
}

/// Resolves, verifies and renders preview requests against a shared
/// registry.
///
/// Every request is tried natively for each candidate name first. Only if
/// all of them are substituted or fail is the font file rasterized.
pub struct PreviewService<B> {
    backend: Arc<B>,
    registry: SharedRegistry,
    files: Option<FontFileIndex>,
    #[cfg(feature = "raster")]
    rasterizer: std::sync::Mutex<crate::raster::FileRasterizer>,
    options: PreviewOptions,
}

impl PreviewService<SystemBackend> {
    /// Creates a service for the platform backend and starts building its
    /// registry in the background.
    pub fn system(registry: RegistryOptions, options: PreviewOptions) -> Self {
        let backend = Arc::new(SystemBackend::default());
        let registry = SharedRegistry::spawn(backend.clone(), registry);
        Self::new(backend, registry, options)
    }
}

impl<B: TextBackend> PreviewService<B> {
    /// Creates a service drawing through `backend`.
    pub fn new(backend: Arc<B>, registry: SharedRegistry, options: PreviewOptions) -> Self {
        Self {
            backend,
            registry,
            files: None,
            #[cfg(feature = "raster")]
            rasterizer: std::sync::Mutex::default(),
            options,
        }
    }

    /// Uses `files` to find font files for the file fallback.
    pub fn with_file_index(mut self, files: FontFileIndex) -> Self {
        self.files = Some(files);
        self
    }

    /// Returns the shared registry.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Returns the options.
    pub fn options(&self) -> &PreviewOptions {
        &self.options
    }

    /// Returns one entry per face in the current registry snapshot.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.registry.snapshot().catalog()
    }

    /// Returns the face name and style a request resolves to.
    pub fn resolve(&self, request: &PreviewRequest) -> ResolvedRequest {
        resolve(&request.query())
    }

    /// Renders a preview.
    ///
    /// Identical requests against an unchanged registry snapshot produce the
    /// same outcome class.
    pub fn preview(&self, request: &PreviewRequest) -> Preview {
        let resolved = self.resolve(request);
        let snapshot = self.registry.snapshot();

        let mut candidates = vec![resolved.face_name.clone()];
        if let Some(record) = snapshot.find(&resolved.face_name) {
            if record.raw_name() != resolved.face_name {
                candidates.push(record.raw_name().to_owned());
            }
        }

        let mut names = candidates.clone();
        names.extend(request.aliases.iter().cloned());
        for candidate in &candidates {
            names.extend(snapshot.aliases_for(candidate));
        }
        let mut aliases = AliasSet::new(&resolved.face_name);
        aliases.extend(&names);

        let text = if request.text.is_empty() {
            " "
        } else {
            request.text.as_str()
        };
        let run = TextRun {
            text,
            size: self.options.effective_size(request.size),
            width: self.options.effective_width(request.width),
        };

        let engine = RenderEngine::new(&*self.backend, self.options.render);
        let mut outcome = RenderOutcome::Failed(crate::Error::font_creation(&resolved.face_name));
        for candidate in &candidates {
            let attempt = ResolvedRequest {
                face_name: candidate.clone(),
                ..resolved.clone()
            };
            outcome = engine.render(&attempt, run, &aliases);
            if outcome.is_rendered() {
                return Preview::new(request, outcome, PreviewOrigin::Native);
            }
        }

        if self.options.file_fallback {
            if let Some(image) = self.render_file(&names, run) {
                let outcome = RenderOutcome::Rendered(image);
                return Preview::new(request, outcome, PreviewOrigin::File);
            }
        }
        Preview::new(request, outcome, PreviewOrigin::Native)
    }

    /// Renders every request in order.
    ///
    /// Each request gets exactly one preview, carrying its request id, so
    /// callers can match results even when names repeat.
    pub fn preview_batch(&self, requests: &[PreviewRequest]) -> Vec<Preview> {
        requests.iter().map(|request| self.preview(request)).collect()
    }

    #[cfg(feature = "raster")]
    fn render_file(&self, names: &[String], run: TextRun<'_>) -> Option<RenderedImage> {
        let files = self.files.as_ref()?;
        let path = names.iter().find_map(|name| files.resolve_path(name))?;
        let mut rasterizer = match self.rasterizer.lock() {
            Ok(rasterizer) => rasterizer,
            Err(poisoned) => poisoned.into_inner(),
        };
        match rasterizer.render(path, run.text, run.size, run.width) {
            Ok(image) => {
                log::info!("drew preview from {}", path.display());
                Some(image)
            }
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }

    #[cfg(not(feature = "raster"))]
    fn render_file(&self, names: &[String], _run: TextRun<'_>) -> Option<RenderedImage> {
        let files = self.files.as_ref()?;
        if let Some(path) = names.iter().find_map(|name| files.resolve_path(name)) {
            log::debug!("found {} but file rendering is disabled", path.display());
        }
        None
    }
}

impl<B> core::fmt::Debug for PreviewService<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PreviewService")
            .field("registry", &self.registry)
            .field("files", &self.files.as_ref().map(FontFileIndex::len))
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_clamped_then_scaled() {
        let options = PreviewOptions::default();
        assert_eq!(options.effective_size(24), 26);
        assert_eq!(options.effective_size(0), 9);
        assert_eq!(options.effective_size(1000), 176);
        let loose = PreviewOptions {
            max_size: 400,
            ..PreviewOptions::default()
        };
        assert_eq!(loose.effective_size(400), 220);
    }

    #[test]
    fn widths_are_limited() {
        let options = PreviewOptions::default();
        assert_eq!(options.effective_width(None), None);
        assert_eq!(options.effective_width(Some(0)), None);
        assert_eq!(options.effective_width(Some(320)), Some(320));
        assert_eq!(options.effective_width(Some(u32::MAX)), Some(4096));
        let zero = PreviewOptions {
            max_width: 0,
            ..PreviewOptions::default()
        };
        assert_eq!(zero.effective_width(Some(50)), Some(1));
    }

    #[test]
    fn requests_fill_in_defaults() {
        let request: PreviewRequest =
            serde_json::from_str(r#"{"name":"Gulim","aliases":["굴림"]}"#).unwrap();
        assert_eq!(request.text, "Sample");
        assert_eq!(request.size, 24);
        assert_eq!(request.aliases, ["굴림"]);
        assert_eq!(request.query(), FaceQuery::display("Gulim"));
        assert_eq!(request.request_id, None);

        let request: PreviewRequest =
            serde_json::from_str(r#"{"name":"Gulim","request_id":"row-7"}"#).unwrap();
        assert_eq!(request.request_id.as_deref(), Some("row-7"));
    }
}
