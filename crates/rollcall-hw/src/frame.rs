//! Frame type and pixel conversions: YUYV unpacking, luma extraction,
//! JPEG and PNG encoding.

use std::path::Path;

/// A captured RGB camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    /// Extract the luma (lightness) plane using the BT.601 weights.
    ///
    /// Returns width * height bytes, one per pixel.
    pub fn luma(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .map(|px| {
                let r = px[0] as u32;
                let g = px[1] as u32;
                let b = px[2] as u32;
                ((77 * r + 150 * g + 29 * b) >> 8) as u8
            })
            .collect()
    }

    /// Encode the frame as JPEG for the live preview stream.
    pub fn to_jpeg(&self) -> Result<Vec<u8>, FrameError> {
        let mut buf = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 80);
        encoder.encode(
            &self.data,
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
        )?;
        Ok(buf)
    }

    /// Write the frame to disk as PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), FrameError> {
        image::save_buffer(
            path,
            &self.data,
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
        )?;
        Ok(())
    }
}

/// Convert packed YUYV (4:2:2) to packed RGB24.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]. Both pixels share
/// the chroma pair. Uses the BT.601 integer conversion.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for quad in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (quad[0], quad[1], quad[2], quad[3]);
        push_rgb(&mut rgb, y0, u, v);
        push_rgb(&mut rgb, y1, u, v);
    }
    Ok(rgb)
}

fn push_rgb(out: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    out.push(r.clamp(0, 255) as u8);
    out.push(g.clamp(0, 255) as u8);
    out.push(b.clamp(0, 255) as u8);
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("encode failed: {0}")]
    Encode(#[from] image::ImageError),
}
