// Copyright 2024 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GDI backend.
//!
//! GDI is used rather than DirectWrite because it is the subsystem that sees
//! faces registered privately with `AddFontResourceEx` and because
//! `GetTextFaceW` reports the face it actually selected.

#![allow(unsafe_code, reason = "GDI is only reachable through FFI")]

use core::ffi::c_void;
use std::collections::BTreeSet;

use windows::Win32::{
    Foundation::{COLORREF, HANDLE, HWND, LPARAM, RECT},
    Graphics::Gdi::{
        CreateCompatibleDC, CreateDIBSection, CreateFontIndirectW, DeleteDC, DeleteObject,
        DrawTextW, EnumFontFamiliesExW, GetDC, GetFontData, GetTextFaceW, ReleaseDC, SelectObject,
        SetBkMode, SetTextColor, ANTIALIASED_QUALITY, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
        DEFAULT_CHARSET, DEFAULT_QUALITY, DIB_RGB_COLORS, DRAW_TEXT_FORMAT, DT_CALCRECT,
        DT_NOPREFIX, DT_SINGLELINE, DT_WORDBREAK, FONT_QUALITY, HBITMAP, HDC, HFONT, HGDIOBJ,
        LOGFONTW, TEXTMETRICW, TRANSPARENT,
    },
};

use super::{Bitmap, Extent, FaceSource, FontDescriptor, SelectedFace, TextBackend, Wrap};
use crate::{
    name_table::MAX_NAME_TABLE_SIZE, normalize::VERTICAL_MARKER, style::FaceStyle, Error,
};

/// `name` as the little-endian table tag `GetFontData` expects.
const NAME_TABLE_TAG: u32 = u32::from_le_bytes(*b"name");

const GDI_ERROR: u32 = u32::MAX;

/// Em height of the font used to read a face's tables.
const SCRATCH_HEIGHT: u32 = 16;

/// Capacity of a `LOGFONTW` face name, including the terminator.
const FACE_NAME_CAPACITY: usize = 32;

const WHITE: COLORREF = COLORREF(0x00FF_FFFF);

/// Faces and text drawing through GDI.
#[derive(Copy, Clone, Default, Debug)]
pub struct GdiBackend;

impl FaceSource for GdiBackend {
    fn enumerate_faces(&self) -> Result<Vec<String>, Error> {
        let screen = ScreenDc::acquire().ok_or_else(|| Error::enumeration("GetDC returned null"))?;
        let logfont = LOGFONTW {
            lfCharSet: DEFAULT_CHARSET,
            ..Default::default()
        };
        let mut names = BTreeSet::<String>::new();
        // SAFETY: `names` outlives the call and `collect_face` is the only
        // reader of the pointer passed through `LPARAM`.
        unsafe {
            EnumFontFamiliesExW(
                screen.0,
                &logfont,
                Some(collect_face),
                LPARAM(core::ptr::from_mut(&mut names) as isize),
                0,
            );
        }
        Ok(names
            .into_iter()
            .filter(|name| !name.starts_with(VERTICAL_MARKER))
            .collect())
    }

    fn name_table(&self, face: &str) -> Option<Vec<u8>> {
        let descriptor = FontDescriptor::new(face, SCRATCH_HEIGHT, FaceStyle::default());
        let font = GdiFont::create(&descriptor, DEFAULT_QUALITY)?;
        let screen = ScreenDc::acquire()?;
        let _selected = Selected::new(screen.0, font.as_object());
        // SAFETY: a null buffer with zero length only queries the size.
        let size = unsafe { GetFontData(screen.0, NAME_TABLE_TAG, 0, None, 0) };
        if size == GDI_ERROR || size == 0 || size as usize > MAX_NAME_TABLE_SIZE {
            log::debug!("GetFontData returned {size:#x} for '{face}'");
            return None;
        }
        let mut buffer = vec![0_u8; size as usize];
        // SAFETY: `buffer` holds exactly `size` writable bytes.
        let read = unsafe {
            GetFontData(
                screen.0,
                NAME_TABLE_TAG,
                0,
                Some(buffer.as_mut_ptr().cast::<c_void>()),
                size,
            )
        };
        (read != GDI_ERROR).then_some(buffer)
    }
}

impl TextBackend for GdiBackend {
    fn create_font(
        &self,
        descriptor: &FontDescriptor,
    ) -> Result<Box<dyn SelectedFace + '_>, Error> {
        let dc = MemoryDc::create().ok_or_else(|| Error::font_creation(descriptor.face_name()))?;
        let font = GdiFont::create(descriptor, ANTIALIASED_QUALITY)
            .ok_or_else(|| Error::font_creation(descriptor.face_name()))?;
        let selected = Selected::new(dc.0, font.as_object());
        Ok(Box::new(GdiFace {
            selected,
            font,
            dc,
        }))
    }
}

/// A font selected into its own memory device context.
///
/// Fields drop in order: the previous font is restored, then the font and
/// finally the context are deleted.
struct GdiFace {
    selected: Selected,
    #[allow(dead_code, reason = "kept alive while selected")]
    font: GdiFont,
    dc: MemoryDc,
}

impl SelectedFace for GdiFace {
    fn actual_face(&self) -> Result<String, Error> {
        let mut buffer = [0_u16; FACE_NAME_CAPACITY];
        // SAFETY: the context is valid for the lifetime of `self`.
        let len = unsafe { GetTextFaceW(self.dc.0, Some(&mut buffer)) };
        if len <= 0 {
            return Err(Error::draw("GetTextFaceW failed"));
        }
        Ok(face_name_from_units(&buffer))
    }

    fn measure(&mut self, text: &str, wrap: Wrap) -> Result<Extent, Error> {
        let mut units: Vec<u16> = text.encode_utf16().collect();
        let mut rect = RECT {
            right: match wrap {
                Wrap::Width(width) => i32::try_from(width).unwrap_or(i32::MAX),
                Wrap::SingleLine => 0,
            },
            ..Default::default()
        };
        // SAFETY: `units` and `rect` are valid for the duration of the call.
        let height = unsafe {
            DrawTextW(
                self.dc.0,
                &mut units,
                &mut rect,
                DT_CALCRECT | DT_NOPREFIX | line_format(wrap),
            )
        };
        if height == 0 {
            return Err(Error::draw("DrawTextW could not measure text"));
        }
        Ok(Extent {
            width: span(rect.left, rect.right),
            height: span(rect.top, rect.bottom),
        })
    }

    fn draw(&mut self, text: &str, extent: Extent, wrap: Wrap) -> Result<Bitmap, Error> {
        let (Ok(width), Ok(height)) = (i32::try_from(extent.width), i32::try_from(extent.height))
        else {
            return Err(Error::draw("bitmap too large"));
        };
        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height selects a top-down bitmap.
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut bits: *mut c_void = core::ptr::null_mut();
        // SAFETY: `info` describes a 32 bpp DIB and `bits` receives its memory.
        let bitmap = unsafe {
            CreateDIBSection(self.dc.0, &info, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
        }
        .map_err(|err| Error::draw(format!("CreateDIBSection failed: {err}")))?;
        let bitmap = GdiBitmap(bitmap);
        if bits.is_null() {
            return Err(Error::draw("CreateDIBSection returned no pixels"));
        }
        let _selected = Selected::new(self.dc.0, HGDIOBJ(bitmap.0 .0));
        let len = extent.width as usize * extent.height as usize * 4;
        let mut units: Vec<u16> = text.encode_utf16().collect();
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        };
        // SAFETY: the DIB section owns `len` bytes at `bits` until `bitmap`
        // is dropped, which happens after the copy below.
        let drawn = unsafe {
            core::ptr::write_bytes(bits.cast::<u8>(), 0, len);
            SetBkMode(self.dc.0, TRANSPARENT);
            SetTextColor(self.dc.0, WHITE);
            DrawTextW(self.dc.0, &mut units, &mut rect, DT_NOPREFIX | line_format(wrap))
        };
        if drawn == 0 {
            return Err(Error::draw("DrawTextW failed"));
        }
        // SAFETY: see above.
        let pixels = unsafe { core::slice::from_raw_parts(bits.cast::<u8>(), len) }.to_vec();
        Ok(Bitmap {
            width: extent.width,
            height: extent.height,
            pixels,
        })
    }
}

impl Drop for GdiFace {
    fn drop(&mut self) {
        // Restore the stock font before the field destructors run.
        self.selected.restore();
    }
}

fn line_format(wrap: Wrap) -> DRAW_TEXT_FORMAT {
    match wrap {
        Wrap::Width(_) => DT_WORDBREAK,
        Wrap::SingleLine => DT_SINGLELINE,
    }
}

fn span(start: i32, end: i32) -> u32 {
    u32::try_from(end.saturating_sub(start)).unwrap_or(0)
}

fn face_name_from_units(units: &[u16]) -> String {
    let len = units.iter().position(|&unit| unit == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..len])
}

unsafe extern "system" fn collect_face(
    logfont: *const LOGFONTW,
    _metrics: *const TEXTMETRICW,
    _font_type: u32,
    names: LPARAM,
) -> i32 {
    // SAFETY: GDI passes a valid LOGFONTW and `names` is the set handed to
    // `EnumFontFamiliesExW` in `enumerate_faces`.
    let (logfont, names) = unsafe { (&*logfont, &mut *(names.0 as *mut BTreeSet<String>)) };
    let name = face_name_from_units(&logfont.lfFaceName);
    if !name.is_empty() {
        names.insert(name);
    }
    1
}

struct GdiFont(HFONT);

impl GdiFont {
    fn create(descriptor: &FontDescriptor, quality: FONT_QUALITY) -> Option<Self> {
        let mut logfont = LOGFONTW {
            lfHeight: -i32::try_from(descriptor.height).unwrap_or(i32::MAX),
            lfWeight: i32::from(descriptor.style.weight.value()),
            lfItalic: u8::from(descriptor.style.italic),
            lfCharSet: DEFAULT_CHARSET,
            lfQuality: quality,
            ..Default::default()
        };
        for (slot, unit) in logfont
            .lfFaceName
            .iter_mut()
            .zip(descriptor.face_name().encode_utf16())
        {
            *slot = unit;
        }
        // SAFETY: `logfont` is fully initialized and its face name is
        // terminated since descriptors hold at most 31 units.
        let font = unsafe { CreateFontIndirectW(&logfont) };
        (!font.is_invalid()).then_some(Self(font))
    }

    fn as_object(&self) -> HGDIOBJ {
        HGDIOBJ(self.0 .0)
    }
}

impl Drop for GdiFont {
    fn drop(&mut self) {
        // SAFETY: the font is owned and no longer selected into a context.
        unsafe {
            let _ = DeleteObject(self.0);
        }
    }
}

struct GdiBitmap(HBITMAP);

impl Drop for GdiBitmap {
    fn drop(&mut self) {
        // SAFETY: the bitmap is owned and no longer selected into a context.
        unsafe {
            let _ = DeleteObject(self.0);
        }
    }
}

struct MemoryDc(HDC);

impl MemoryDc {
    fn create() -> Option<Self> {
        // SAFETY: a null reference context creates one compatible with the screen.
        let dc = unsafe { CreateCompatibleDC(HDC::default()) };
        (!dc.is_invalid()).then_some(Self(dc))
    }
}

impl Drop for MemoryDc {
    fn drop(&mut self) {
        // SAFETY: the context is owned and every object selected into it has
        // been restored.
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct ScreenDc(HDC);

impl ScreenDc {
    fn acquire() -> Option<Self> {
        // SAFETY: retrieving the screen context has no preconditions.
        let dc = unsafe { GetDC(HWND::default()) };
        (!dc.is_invalid()).then_some(Self(dc))
    }
}

impl Drop for ScreenDc {
    fn drop(&mut self) {
        // SAFETY: the context came from `GetDC` with the same window.
        unsafe {
            ReleaseDC(HWND::default(), self.0);
        }
    }
}

/// Selects an object into a context and puts the previous one back on drop.
struct Selected {
    dc: HDC,
    previous: Option<HGDIOBJ>,
}

impl Selected {
    fn new(dc: HDC, object: HGDIOBJ) -> Self {
        // SAFETY: both handles are valid for the guard's lifetime.
        let previous = unsafe { SelectObject(dc, object) };
        Self {
            dc,
            previous: (!previous.is_invalid()).then_some(previous),
        }
    }

    fn restore(&mut self) {
        if let Some(previous) = self.previous.take() {
            // SAFETY: `previous` was selected into `dc` before this guard.
            unsafe {
                SelectObject(self.dc, previous);
            }
        }
    }
}

impl Drop for Selected {
    fn drop(&mut self) {
        self.restore();
    }
}
