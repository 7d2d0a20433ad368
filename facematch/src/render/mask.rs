// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coverage conversion and PNG output.

use crate::Error;

/// Turns white-on-black BGRA text into white RGBA with straight alpha.
///
/// GDI cannot draw onto a transparent background, so the text is drawn in
/// white onto black and the brightest channel of each pixel is reused as its
/// coverage. Pure black pixels become fully transparent.
pub fn coverage_to_rgba(bgra: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(bgra.len());
    for pixel in bgra.chunks_exact(4) {
        let coverage = pixel[0].max(pixel[1]).max(pixel[2]);
        if coverage == 0 {
            rgba.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            rgba.extend_from_slice(&[255, 255, 255, coverage]);
        }
    }
    rgba
}

/// Encodes 8 bit RGBA pixels as a PNG image.
pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(|err| Error::encode(&err))?;
    writer
        .write_image_data(rgba)
        .map_err(|err| Error::encode(&err))?;
    writer.finish().map_err(|err| Error::encode(&err))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luminance_becomes_alpha() {
        let bgra = [
            0, 0, 0, 0, // background
            255, 255, 255, 0, // full coverage
            10, 80, 40, 0, // cleartype fringe
            0, 0, 0, 255, // black with stray alpha
        ];
        assert_eq!(
            coverage_to_rgba(&bgra),
            [
                0, 0, 0, 0, //
                255, 255, 255, 255, //
                255, 255, 255, 80, //
                0, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn png_has_signature_and_size() {
        let rgba = coverage_to_rgba(&[255; 4 * 6]);
        let png = encode_png(3, 2, &rgba).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoder = png::Decoder::new(png.as_slice());
        let reader = decoder.read_info().unwrap();
        assert_eq!((reader.info().width, reader.info().height), (3, 2));
    }

    #[test]
    fn png_rejects_short_buffers() {
        let err = encode_png(4, 4, &[0; 8]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Encode);
    }
}
