// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Font face resolution with substitution-verified rendering.
//!
//! Platform font matchers never say no. Ask for a face that is not installed,
//! or installed under a localized name, and they quietly hand back another
//! one. This crate keeps an index of every installed face under every name it
//! goes by, resolves user supplied names to the face to request, and checks
//! the face the platform actually activated before trusting a render.
//!
//! The pieces, from the bottom up:
//!
//! - [`normalize`] and [`name_table`] turn names and raw `name` tables into
//!   comparable keys.
//! - [`family_match`] and [`style`] hold the heuristics for loosely matching
//!   family names and reading weight and slant out of names.
//! - [`resolve`] picks the face name for a request.
//! - [`registry`] indexes installed faces and rebuilds in the background.
//! - [`render`] runs the create, verify, measure, draw and encode pipeline.
//! - [`locate`] and `raster` draw from font files when the platform refuses.
//! - [`service`] ties everything together for a front end.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod family_match;
pub mod locate;
pub mod name_table;
pub mod normalize;
#[cfg(feature = "raster")]
pub mod raster;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod service;
pub mod style;

mod error;

pub use backend::{FaceSource, NullBackend, SelectedFace, SystemBackend, TextBackend};
pub use error::{Error, ErrorKind};
pub use registry::{Registry, RegistryOptions, SharedRegistry};
pub use render::{RenderOutcome, RenderedImage};
pub use resolve::{resolve, FaceQuery, ResolvedRequest};
pub use service::{Preview, PreviewOptions, PreviewOrigin, PreviewRequest, PreviewService};
pub use style::{FaceStyle, Weight};

#[cfg(all(feature = "system", target_os = "windows"))]
pub use backend::GdiBackend;
