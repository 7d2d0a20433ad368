// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterization straight from a font file.
//!
//! This path is only taken once native rendering has been rejected. It does
//! no shaping: every character maps to its nominal glyph and lines are
//! broken between characters.

use std::path::Path;

use read_fonts::{FontRef as TableFont, TableProvider};
use swash::scale::image::{Content, Image};
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Vector};
use swash::{FontRef, GlyphId};

use crate::render::mask::encode_png;
use crate::render::RenderedImage;
use crate::Error;

/// Sources tried for each glyph, in order.
const SOURCES: &[Source] = &[
    Source::ColorOutline(0),
    Source::ColorBitmap(StrikeWith::BestFit),
    Source::Outline,
];

/// Largest canvas the rasterizer will allocate, in pixels.
const MAX_CANVAS_PIXELS: u64 = 1 << 26;

/// Renders text with glyph outlines from font files.
///
/// Keeps a scaling context around so glyph caches are reused between calls.
pub struct FileRasterizer {
    context: ScaleContext,
}

impl FileRasterizer {
    /// Creates a rasterizer.
    pub fn new() -> Self {
        Self {
            context: ScaleContext::new(),
        }
    }

    /// Reads the font at `path` and renders `text` with its first face.
    pub fn render(
        &mut self,
        path: &Path,
        text: &str,
        size: u32,
        width: Option<u32>,
    ) -> Result<RenderedImage, Error> {
        let data = std::fs::read(path).map_err(|err| Error::font_file(path, &err.to_string()))?;
        self.render_data(path, &data, text, size, width)
    }

    /// Renders `text` with the first face of already loaded font data.
    ///
    /// `path` is used for error messages and as the reported face name.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Glyph origins are floored pixel positions well inside i32."
    )]
    pub fn render_data(
        &mut self,
        path: &Path,
        data: &[u8],
        text: &str,
        size: u32,
        width: Option<u32>,
    ) -> Result<RenderedImage, Error> {
        let font = FontRef::from_index(data, 0)
            .ok_or_else(|| Error::font_file(path, "not a supported font"))?;
        check_metrics(path, data)?;
        let size = size.max(1) as f32;
        let layout = Layout::new(&font, size, text, width.unwrap_or(0));
        let mut canvas = Canvas::new(path, layout.width, layout.height)?;
        let mut scaler = self.context.builder(font).size(size).hint(true).build();
        let mut render = Render::new(SOURCES);
        render.format(Format::Alpha);
        for (row, line) in layout.lines.iter().enumerate() {
            let baseline = layout.ascent + row as f32 * layout.line_height as f32;
            let mut x = 0.0_f32;
            for glyph in &line.glyphs {
                render.offset(Vector::new(x.fract(), baseline.fract()));
                if let Some(image) = render.render(&mut scaler, glyph.id) {
                    canvas.blit(&image, x.floor() as i32, baseline.floor() as i32);
                }
                x += glyph.advance;
            }
        }
        let png = encode_png(canvas.width, canvas.height, &canvas.pixels)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(RenderedImage {
            png,
            width: canvas.width,
            height: canvas.height,
            actual_face: name,
        })
    }
}

/// Rejects faces whose horizontal metrics cannot be read.
///
/// Glyph advances need `head`, `maxp`, `hhea` and at least one long metric
/// in `hmtx`.
fn check_metrics(path: &Path, data: &[u8]) -> Result<(), Error> {
    let font =
        TableFont::from_index(data, 0).map_err(|err| Error::font_file(path, &err.to_string()))?;
    let usable = font.head().is_ok_and(|head| head.units_per_em() != 0)
        && font.maxp().is_ok()
        && font.hhea().is_ok_and(|hhea| hhea.number_of_h_metrics() != 0)
        && font.hmtx().is_ok();
    if usable {
        Ok(())
    } else {
        Err(Error::font_file(path, "no horizontal metrics"))
    }
}

impl Default for FileRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FileRasterizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileRasterizer").finish_non_exhaustive()
    }
}

#[derive(Copy, Clone, Debug)]
struct PlacedGlyph {
    id: GlyphId,
    advance: f32,
}

#[derive(Default, Debug)]
struct Line {
    glyphs: Vec<PlacedGlyph>,
    advance: f32,
}

#[derive(Debug)]
struct Layout {
    lines: Vec<Line>,
    ascent: f32,
    line_height: u32,
    width: u32,
    height: u32,
}

impl Layout {
    /// Breaks `text` greedily between characters so no line is wider than
    /// `max_width`, unless a single character is already wider.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Pixel sizes are small, positive and rounded up before the cast."
    )]
    fn new(font: &FontRef<'_>, size: f32, text: &str, max_width: u32) -> Self {
        let charmap = font.charmap();
        let glyph_metrics = font.glyph_metrics(&[]).scale(size);
        let metrics = font.metrics(&[]).scale(size);
        let limit = max_width as f32;

        let text = if text.is_empty() { " " } else { text };
        let mut lines = vec![Line::default()];
        for ch in text.chars() {
            if ch == '\r' {
                continue;
            }
            if ch == '\n' {
                lines.push(Line::default());
                continue;
            }
            let id = charmap.map(ch);
            let advance = glyph_metrics.advance_width(id);
            let overflows = lines.last().is_some_and(|line| {
                max_width > 0 && !line.glyphs.is_empty() && line.advance + advance > limit
            });
            if overflows {
                lines.push(Line::default());
            }
            if let Some(line) = lines.last_mut() {
                line.glyphs.push(PlacedGlyph { id, advance });
                line.advance += advance;
            }
        }

        let measured = lines.iter().map(|line| line.advance).fold(0.0_f32, f32::max);
        let width = if max_width > 0 {
            (measured.ceil() as u32).max(max_width)
        } else {
            (measured.ceil() as u32).max(1)
        };
        let extent = metrics.ascent + metrics.descent;
        let extent = if extent > 0.0 { extent } else { size };
        // 1.3 times the extent, exact for whole pixel sizes.
        let line_height = ((extent * 13.0 / 10.0).ceil() as u32).max(1);
        let padding = line_height.div_ceil(10).max(2);
        let height = line_height * lines.len() as u32 + padding;
        let ascent = if metrics.ascent > 0.0 {
            metrics.ascent
        } else {
            size
        };
        Self {
            lines,
            ascent,
            line_height,
            width,
            height,
        }
    }
}

/// White RGBA canvas written with straight alpha.
struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(path: &Path, width: u32, height: u32) -> Result<Self, Error> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_CANVAS_PIXELS {
            let detail = format!("{width}x{height} canvas is too large");
            return Err(Error::font_file(path, &detail));
        }
        let len = usize::try_from(pixels)
            .ok()
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| Error::font_file(path, "canvas size overflows"))?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|err| Error::font_file(path, &err.to_string()))?;
        buffer.resize(len, 0);
        Ok(Self {
            width,
            height,
            pixels: buffer,
        })
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Glyph images are far smaller than i32::MAX pixels."
    )]
    fn blit(&mut self, image: &Image, x: i32, baseline: i32) {
        let left = x + image.placement.left;
        let top = baseline - image.placement.top;
        let width = image.placement.width as usize;
        let height = image.placement.height as usize;
        let stride = match image.content {
            Content::Mask => 1,
            Content::Color => 4,
            Content::SubpixelMask => return,
        };
        for row in 0..height {
            for col in 0..width {
                let Some(index) = self.index(left + col as i32, top + row as i32) else {
                    continue;
                };
                let at = (row * width + col) * stride;
                let Some(source) = image.data.get(at..at + stride) else {
                    continue;
                };
                let pixel = &mut self.pixels[index..index + 4];
                match image.content {
                    Content::Color if source[3] > pixel[3] => pixel.copy_from_slice(source),
                    Content::Mask if source[0] > pixel[3] => {
                        pixel.copy_from_slice(&[255, 255, 255, source[0]]);
                    }
                    _ => {}
                }
            }
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_table::test_util::{
        build_name_table, metric_tables, utf16_be, wrap_sfnt, Record,
    };
    use crate::ErrorKind;

    fn name_table() -> ([u8; 4], Vec<u8>) {
        let name = utf16_be("Empty Face");
        let records = [Record {
            platform_id: 3,
            language_id: 0x0409,
            name_id: 1,
            bytes: &name,
        }];
        (*b"name", build_name_table(&records))
    }

    /// A face with metrics but no outlines.
    fn outline_free_font() -> Vec<u8> {
        let mut tables = metric_tables();
        tables.push(name_table());
        wrap_sfnt(&tables)
    }

    fn name_only_font() -> Vec<u8> {
        wrap_sfnt(&[name_table()])
    }

    fn decode(png: &[u8]) -> (u32, u32, Vec<u8>) {
        let decoder = png::Decoder::new(png);
        let mut reader = decoder.read_info().unwrap();
        let mut pixels = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut pixels).unwrap();
        pixels.truncate(info.buffer_size());
        (info.width, info.height, pixels)
    }

    #[test]
    fn face_without_outlines_draws_nothing() {
        let data = outline_free_font();
        let mut rasterizer = FileRasterizer::new();
        let path = Path::new("fonts/EmptyFace.ttf");
        let image = rasterizer.render_data(path, &data, "", 20, None).unwrap();
        // One space of 10 pixels. The extent of 20 gives 26 per line plus 3
        // of padding.
        assert_eq!((image.width, image.height), (10, 29));
        assert_eq!(image.actual_face, "EmptyFace");
        let (width, height, pixels) = decode(&image.png);
        assert_eq!((width, height), (10, 29));
        assert!(pixels.iter().all(|&byte| byte == 0), "nothing was drawn");
    }

    #[test]
    fn face_without_metrics_is_rejected() {
        let mut rasterizer = FileRasterizer::new();
        let path = Path::new("NameOnly.ttf");
        let err = rasterizer
            .render_data(path, &name_only_font(), "A", 20, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FontFile);
        assert!(err.detail().contains("no horizontal metrics"), "{err}");

        // Each metrics table is required on its own.
        for missing in [*b"head", *b"hhea", *b"hmtx", *b"maxp"] {
            let mut tables = metric_tables();
            tables.retain(|(tag, _)| *tag != missing);
            tables.push(name_table());
            let err = rasterizer
                .render_data(path, &wrap_sfnt(&tables), "A", 20, None)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FontFile, "without {missing:?}");
        }
    }

    #[test]
    fn oversized_canvas_is_an_error() {
        let path = Path::new("Huge.ttf");
        let err = Canvas::new(path, u32::MAX, u32::MAX).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FontFile);
        assert!(Canvas::new(path, (1 << 13) + 1, 1 << 13).is_err());
        assert!(Canvas::new(path, 64, 64).is_ok());

        // A very wide request is refused instead of allocated.
        let mut rasterizer = FileRasterizer::new();
        let err = rasterizer
            .render_data(path, &outline_free_font(), "x", 2000, Some(u32::MAX))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FontFile);
    }

    #[test]
    fn width_and_newlines_shape_the_canvas() {
        let data = outline_free_font();
        let mut rasterizer = FileRasterizer::new();
        let path = Path::new("EmptyFace.otf");
        let image = rasterizer
            .render_data(path, &data, "one\ntwo\r\nthree", 10, Some(120))
            .unwrap();
        assert_eq!(image.width, 120);
        assert_eq!(image.height, 13 * 3 + 2);
    }

    #[test]
    fn unreadable_files_are_font_file_errors() {
        let mut rasterizer = FileRasterizer::new();
        let err = rasterizer
            .render_data(Path::new("x.ttf"), b"garbage!", "A", 12, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FontFile);
        let missing = Path::new("/definitely/not/here.ttf");
        let err = rasterizer.render(missing, "A", 12, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FontFile);
    }
}
