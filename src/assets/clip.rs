use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, RgbaImage};

use crate::config::BackgroundMode;
use crate::error::{PetError, Result};

/// Frames with a zero delay play at this rate instead (seconds).
const FALLBACK_DELAY: f64 = 0.1;

/// One decoded animation frame, premultiplied RGBA8.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
    /// Display time in seconds.
    pub delay: f64,
}

impl Frame {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>, delay: f64) -> Self {
        debug_assert_eq!(rgba.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            rgba: rgba.into(),
            delay: if delay > 0.0 { delay } else { FALLBACK_DELAY },
        }
    }

    /// Alpha at pixel (x, y), 0 outside the frame.
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return 0;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4 + 3) as usize;
        self.rgba[idx]
    }
}

/// A looping animation clip.
#[derive(Debug, Clone)]
pub struct Clip {
    pub frames: Vec<Frame>,
    total: f64,
}

impl Clip {
    /// Build a clip. Returns `None` for an empty frame list.
    pub fn new(frames: Vec<Frame>) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        let total = frames.iter().map(|f| f.delay).sum();
        Some(Self { frames, total })
    }

    /// Size of the first frame; GIF frames share the logical screen size.
    pub fn size(&self) -> (u32, u32) {
        let f = &self.frames[0];
        (f.width, f.height)
    }

    pub fn total_duration(&self) -> f64 {
        self.total
    }

    /// Index of the frame showing `elapsed` seconds into the loop.
    pub fn frame_index_at(&self, elapsed: f64) -> usize {
        if self.frames.len() == 1 || self.total <= 0.0 {
            return 0;
        }
        let mut t = elapsed.max(0.0) % self.total;
        for (i, frame) in self.frames.iter().enumerate() {
            if t < frame.delay {
                return i;
            }
            t -= frame.delay;
        }
        self.frames.len() - 1
    }

    pub fn frame_at(&self, elapsed: f64) -> &Frame {
        &self.frames[self.frame_index_at(elapsed)]
    }
}

/// Decode a GIF (all frames) or PNG (single frame) into a clip.
pub fn decode_clip(path: &Path, bytes: &[u8], bg_mode: BackgroundMode) -> Result<Clip> {
    let decode_err = |source| PetError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let format = image::guess_format(bytes)
        .map_err(|_| PetError::UnsupportedFormat(path.to_path_buf()))?;

    let frames = match format {
        ImageFormat::Gif => {
            let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(decode_err)?;
            let mut frames = Vec::new();
            for frame in decoder.into_frames() {
                let frame = frame.map_err(decode_err)?;
                let (numer, denom) = frame.delay().numer_denom_ms();
                let delay = if denom == 0 {
                    0.0
                } else {
                    numer as f64 / denom as f64 / 1000.0
                };
                frames.push(prepare(frame.into_buffer(), delay, bg_mode));
            }
            frames
        }
        ImageFormat::Png => {
            let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
                .map_err(decode_err)?
                .to_rgba8();
            vec![prepare(img, 0.0, bg_mode)]
        }
        _ => return Err(PetError::UnsupportedFormat(path.to_path_buf())),
    };

    Clip::new(frames).ok_or_else(|| PetError::EmptyClip(path.to_path_buf()))
}

/// Apply the background key and premultiply alpha for the compositor.
fn prepare(img: RgbaImage, delay: f64, bg_mode: BackgroundMode) -> Frame {
    let (width, height) = img.dimensions();
    let mut rgba = img.into_raw();
    for px in rgba.chunks_exact_mut(4) {
        if bg_mode == BackgroundMode::Chroma && px[0] == 255 && px[1] == 255 && px[2] == 255 {
            px.copy_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        let a = px[3] as u16;
        if a < 255 {
            px[0] = ((px[0] as u16 * a) / 255) as u8;
            px[1] = ((px[1] as u16 * a) / 255) as u8;
            px[2] = ((px[2] as u16 * a) / 255) as u8;
        }
    }
    Frame::from_rgba(width, height, rgba, delay)
}

#[cfg(test)]
pub(crate) fn solid_clip(width: u32, height: u32, delays: &[f64]) -> Clip {
    let frames = delays
        .iter()
        .map(|&d| Frame::from_rgba(width, height, vec![255; (width * height * 4) as usize], d))
        .collect();
    Clip::new(frames).expect("non-empty clip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    fn encode_png(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(pixels, width, height, ExtendedColorType::Rgba8)
            .expect("encode png");
        out
    }

    #[test]
    fn frame_lookup_loops_over_delays() {
        let clip = solid_clip(2, 2, &[0.1, 0.2, 0.1]);
        assert!((clip.total_duration() - 0.4).abs() < 1e-9);
        assert_eq!(clip.frame_index_at(0.05), 0);
        assert_eq!(clip.frame_index_at(0.15), 1);
        assert_eq!(clip.frame_index_at(0.35), 2);
        assert_eq!(clip.frame_index_at(0.45), 0);
    }

    #[test]
    fn zero_delay_frames_still_advance() {
        let clip = solid_clip(1, 1, &[0.0, 0.0]);
        assert_eq!(clip.frame_index_at(0.0), 0);
        assert_eq!(clip.frame_index_at(FALLBACK_DELAY + 0.01), 1);
    }

    #[test]
    fn chroma_keys_out_white_and_premultiplies() {
        // white, half-transparent red, opaque blue
        let pixels = [
            255, 255, 255, 255, //
            200, 0, 0, 128, //
            0, 0, 255, 255,
        ];
        let png = encode_png(3, 1, &pixels);
        let clip = decode_clip(Path::new("t.png"), &png, BackgroundMode::Chroma).unwrap();
        let frame = &clip.frames[0];
        assert_eq!(frame.alpha_at(0, 0), 0);
        assert_eq!(&frame.rgba[4..8], &[100, 0, 0, 128]);
        assert_eq!(frame.alpha_at(2, 0), 255);
        assert_eq!(frame.alpha_at(3, 0), 0);
    }

    #[test]
    fn alpha_mode_keeps_white() {
        let png = encode_png(1, 1, &[255, 255, 255, 255]);
        let clip = decode_clip(Path::new("t.png"), &png, BackgroundMode::Alpha).unwrap();
        assert_eq!(clip.frames[0].alpha_at(0, 0), 255);
    }

    #[test]
    fn rejects_unknown_bytes() {
        let err = decode_clip(Path::new("x.gif"), b"not an image", BackgroundMode::Chroma);
        assert!(matches!(err, Err(PetError::UnsupportedFormat(_))));
    }
}
