//! Raster compositor — draws captions and pasted images onto an in-memory
//! bitmap and encodes the result as PNG bytes.
//!
//! Two modes:
//! - **strip**: source images blitted left-to-right on a canvas sized to
//!   their summed width and max height, with dynamically fitted, wrapped,
//!   outlined captions across the full width;
//! - **overlay**: one primary image with secondary thumbnails stacked down
//!   its right side and fixed-size upper-cased captions at fixed vertical
//!   fractions.
//!
//! Everything here is CPU-bound and synchronous; callers run it under
//! `tokio::task::spawn_blocking`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontRef, GlyphId, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::warn;

use crate::error::EngineError;
use crate::meme::assets::is_supported_raster;
use crate::tokenize::strip_emoji;

/// Bundled typeface — covers Latin, Cyrillic, and common punctuation.
const FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans-Bold.ttf");

/// Captions may occupy this fraction of the canvas width (strip mode).
const MAX_TEXT_WIDTH_FRAC: f32 = 0.85;
/// Base caption scale is canvas width divided by this (strip mode).
const BASE_SCALE_DIVISOR: f32 = 10.0;
const MAX_SCALE: f32 = 72.0;
const MIN_SCALE: f32 = 16.0;
const SCALE_STEP: f32 = 2.0;
/// Vertical margin between captions and the canvas edge (strip mode).
const CAPTION_MARGIN_FRAC: f32 = 0.02;

/// Overlay mode geometry.
const THUMB_WIDTH_FRAC: f32 = 0.30;
const THUMB_X_FRAC: f32 = 0.65;
const THUMB_TOP_FRAC: f32 = 0.05;
const THUMB_SPACING_PX: i64 = 12;
const OVERLAY_CAPTION_TOP_FRAC: f32 = 0.12;
const OVERLAY_CAPTION_BOTTOM_FRAC: f32 = 0.08;
const OVERLAY_SCALE_FRAC: f32 = 0.08;

const FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const STROKE: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Parse the bundled typeface. Fails only if the embedded bytes are not a
/// valid font, so callers do this once at construction time.
pub fn load_font() -> Result<FontRef<'static>, EngineError> {
    FontRef::try_from_slice(FONT_BYTES)
        .map_err(|e| EngineError::Font(format!("bundled typeface failed to parse: {e}")))
}

/// Side-by-side composite: images blitted left-to-right, captions fitted
/// and wrapped across the whole canvas.
pub fn compose_strip(
    paths: &[PathBuf],
    top: &str,
    bottom: &str,
    font: &FontRef<'static>,
) -> Result<Vec<u8>, EngineError> {
    let images = decode_all(paths);
    if images.is_empty() {
        return Err(EngineError::NoAssets);
    }

    let canvas_w: u32 = images.iter().map(|i| i.width()).sum();
    let canvas_h: u32 = images.iter().map(|i| i.height()).max().unwrap_or(0);
    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, STROKE);

    let mut x: i64 = 0;
    for img in &images {
        imageops::overlay(&mut canvas, img, x, 0);
        x += i64::from(img.width());
    }

    let max_text_w = canvas_w as f32 * MAX_TEXT_WIDTH_FRAC;
    let margin = (canvas_h as f32 * CAPTION_MARGIN_FRAC).max(8.0);

    let top = strip_emoji(top);
    if !top.is_empty() {
        let scale = fit_scale(font, &top, base_scale(canvas_w), max_text_w);
        let lines = wrap_lines(font, scale, &top, max_text_w);
        draw_caption_block(&mut canvas, font, scale, &lines, margin);
    }

    let bottom = strip_emoji(bottom);
    if !bottom.is_empty() {
        let scale = fit_scale(font, &bottom, base_scale(canvas_w), max_text_w);
        let lines = wrap_lines(font, scale, &bottom, max_text_w);
        let block_h = lines.len() as f32 * line_height(font, scale);
        let y = (canvas_h as f32 - margin - block_h).max(0.0);
        draw_caption_block(&mut canvas, font, scale, &lines, y);
    }

    encode_png(canvas)
}

/// Overlay composite: primary image as the canvas, secondary thumbnails
/// stacked down the right side, fixed-size upper-cased captions.
pub fn compose_overlay(
    primary: &Path,
    thumbs: &[PathBuf],
    top: &str,
    bottom: &str,
    font: &FontRef<'static>,
) -> Result<Vec<u8>, EngineError> {
    let mut canvas = match decode_one(primary) {
        Some(img) => img,
        None => return Err(EngineError::NoAssets),
    };
    let (w, h) = (canvas.width(), canvas.height());

    let thumb_w = ((w as f32 * THUMB_WIDTH_FRAC) as u32).max(1);
    let thumb_x = (w as f32 * THUMB_X_FRAC) as i64;
    let mut thumb_y = (h as f32 * THUMB_TOP_FRAC) as i64;

    for img in decode_all(thumbs) {
        let scaled_h = ((u64::from(img.height()) * u64::from(thumb_w)
            / u64::from(img.width().max(1))) as u32)
            .max(1);
        let thumb = imageops::resize(&img, thumb_w, scaled_h, FilterType::Lanczos3);
        imageops::overlay(&mut canvas, &thumb, thumb_x, thumb_y);
        thumb_y += i64::from(scaled_h) + THUMB_SPACING_PX;
    }

    let scale = PxScale::from((h as f32 * OVERLAY_SCALE_FRAC).max(MIN_SCALE));

    let top = strip_emoji(top).to_uppercase();
    if !top.is_empty() {
        let y = h as f32 * OVERLAY_CAPTION_TOP_FRAC;
        draw_outlined_line(&mut canvas, font, scale, &top, y);
    }

    let bottom = strip_emoji(bottom).to_uppercase();
    if !bottom.is_empty() {
        let y = h as f32 * (1.0 - OVERLAY_CAPTION_BOTTOM_FRAC) - line_height(font, scale);
        draw_outlined_line(&mut canvas, font, scale, &bottom, y.max(0.0));
    }

    encode_png(canvas)
}

// ── decode / encode ───────────────────────────────────────────────────────────

/// Decode every usable image among `paths`. Unsupported extensions and
/// decode failures are logged and skipped; the caller decides whether an
/// empty result is fatal.
fn decode_all(paths: &[PathBuf]) -> Vec<RgbaImage> {
    paths.iter().filter_map(|p| decode_one(p)).collect()
}

fn decode_one(path: &Path) -> Option<RgbaImage> {
    if !is_supported_raster(path) {
        warn!(path = %path.display(), "skipping asset with unsupported extension");
        return None;
    }
    match image::open(path) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            warn!(path = %path.display(), err = %e, "skipping undecodable asset");
            None
        }
    }
}

fn encode_png(canvas: RgbaImage) -> Result<Vec<u8>, EngineError> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| EngineError::ImageEncode(e.to_string()))?;
    Ok(buf.into_inner())
}

// ── text measurement and fitting ──────────────────────────────────────────────

fn base_scale(canvas_w: u32) -> f32 {
    (canvas_w as f32 / BASE_SCALE_DIVISOR).min(MAX_SCALE)
}

/// Advance width of `text` at `scale`, kerning included.
fn measure_width(font: &FontRef<'_>, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

fn line_height(font: &FontRef<'_>, scale: PxScale) -> f32 {
    let scaled = font.as_scaled(scale);
    scaled.height() + scaled.line_gap()
}

/// Start at `base` and shrink in fixed decrements until `text` fits in
/// `max_w` or the floor is reached. Never fails: overly long text comes back
/// at the floor scale and relies on wrapping.
fn fit_scale(font: &FontRef<'_>, text: &str, base: f32, max_w: f32) -> PxScale {
    let mut size = base.max(MIN_SCALE);
    while size > MIN_SCALE && measure_width(font, PxScale::from(size), text) > max_w {
        size -= SCALE_STEP;
    }
    PxScale::from(size.max(MIN_SCALE))
}

/// Greedy word wrap: keep words on a line while `line + " " + word` still
/// measures under `max_w`. A single word wider than `max_w` gets its own
/// line rather than being broken.
fn wrap_lines(font: &FontRef<'_>, scale: PxScale, text: &str, max_w: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line = word.to_string();
            continue;
        }
        let candidate = format!("{line} {word}");
        if measure_width(font, scale, &candidate) <= max_w {
            line = candidate;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

// ── drawing ───────────────────────────────────────────────────────────────────

/// Draw wrapped caption lines starting at vertical offset `y`, each line
/// horizontally centered.
fn draw_caption_block(
    canvas: &mut RgbaImage,
    font: &FontRef<'static>,
    scale: PxScale,
    lines: &[String],
    y: f32,
) {
    let mut y = y;
    for line in lines {
        draw_outlined_line(canvas, font, scale, line, y);
        y += line_height(font, scale);
    }
}

/// Stroke-then-fill a single centered line so it stays legible over any
/// background.
fn draw_outlined_line(
    canvas: &mut RgbaImage,
    font: &FontRef<'static>,
    scale: PxScale,
    text: &str,
    y: f32,
) {
    let width = measure_width(font, scale, text);
    let x = ((canvas.width() as f32 - width) / 2.0).max(0.0) as i32;
    let y = y as i32;
    let o = ((scale.y / 24.0) as i32).max(1);

    for (dx, dy) in [
        (-o, -o), (0, -o), (o, -o),
        (-o, 0),           (o, 0),
        (-o, o),  (0, o),  (o, o),
    ] {
        draw_text_mut(canvas, STROKE, x + dx, y + dy, scale, font, text);
    }
    draw_text_mut(canvas, FILL, x, y, scale, font, text);
}
