// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate contains the integration test suite for `facematch`.
//!
//! - Tests run against `util::FakePlatform`, a scripted stand-in for the
//!   native font subsystem. It can be told to substitute faces, fail any
//!   native call and serve synthetic `name` tables, and it counts the fonts
//!   that are currently selected so leaks show up as test failures.
//! - Font files used by the locator and the file rasterizer are built in
//!   memory by `util::tables`. There are no binary assets.
//! - Put new tests into the module for their topic and start test names with
//!   the topic, e.g. `render_substitution_releases_font`.

#![allow(missing_docs, reason = "we don't need docs for testing")]
#![allow(clippy::cast_possible_truncation, reason = "not critical for testing")]

mod util;
