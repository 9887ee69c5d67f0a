//! Integration tests for the raster compositor.

use std::fs;
use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

use parrot_core::error::EngineError;
use parrot_core::meme::compositor::{compose_overlay, compose_strip, load_font};

fn write_png(dir: &TempDir, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.path().join(name);
    let img = RgbaImage::from_pixel(w, h, Rgba([200, 60, 60, 255]));
    img.save(&path).expect("save fixture image");
    path
}

fn decode(png: &[u8]) -> RgbaImage {
    image::load_from_memory(png).expect("output must be a valid image").to_rgba8()
}

#[test]
fn strip_canvas_is_summed_width_and_max_height() {
    let dir = TempDir::new().unwrap();
    let a = write_png(&dir, "a.png", 40, 30);
    let b = write_png(&dir, "b.png", 60, 30);
    let font = load_font().unwrap();

    let png = compose_strip(&[a, b], "верхняя подпись", "нижняя", &font).unwrap();
    let out = decode(&png);
    assert_eq!((out.width(), out.height()), (100, 30));
}

#[test]
fn strip_height_is_max_of_inputs() {
    let dir = TempDir::new().unwrap();
    let a = write_png(&dir, "a.png", 50, 20);
    let b = write_png(&dir, "b.png", 50, 90);
    let font = load_font().unwrap();

    let png = compose_strip(&[a, b], "", "", &font).unwrap();
    let out = decode(&png);
    assert_eq!((out.width(), out.height()), (100, 90));
}

#[test]
fn oversized_caption_never_fails() {
    let dir = TempDir::new().unwrap();
    let a = write_png(&dir, "a.png", 120, 90);
    let font = load_font().unwrap();

    let caption = "очень длинная подпись которая никак не помещается ".repeat(20);
    let png = compose_strip(&[a], &caption, &caption, &font).unwrap();
    assert!(!png.is_empty());
}

#[test]
fn emoji_only_caption_is_effectively_empty() {
    let dir = TempDir::new().unwrap();
    let a = write_png(&dir, "a.png", 64, 64);
    let font = load_font().unwrap();

    let png = compose_strip(&[a], "😂😂😂", "<a:Party:1>", &font).unwrap();
    let out = decode(&png);
    assert_eq!((out.width(), out.height()), (64, 64));
}

#[test]
fn undecodable_asset_is_skipped() {
    let dir = TempDir::new().unwrap();
    let good = write_png(&dir, "good.png", 48, 48);
    let bad = dir.path().join("bad.png");
    fs::write(&bad, b"definitely not a png").unwrap();
    let font = load_font().unwrap();

    let png = compose_strip(&[bad, good], "", "", &font).unwrap();
    let out = decode(&png);
    // Skipped asset contributes nothing to the canvas size.
    assert_eq!((out.width(), out.height()), (48, 48));
}

#[test]
fn unsupported_extension_is_skipped() {
    let dir = TempDir::new().unwrap();
    let good = write_png(&dir, "good.png", 32, 32);
    let gif = dir.path().join("anim.gif");
    fs::write(&gif, b"GIF89a").unwrap();
    let font = load_font().unwrap();

    let png = compose_strip(&[gif, good], "", "", &font).unwrap();
    assert_eq!(decode(&png).width(), 32);
}

#[test]
fn all_assets_failing_is_fatal() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.png");
    fs::write(&bad, b"garbage").unwrap();
    let font = load_font().unwrap();

    let err = compose_strip(&[bad], "текст", "", &font).unwrap_err();
    assert!(matches!(err, EngineError::NoAssets));
}

#[test]
fn empty_input_is_fatal() {
    let font = load_font().unwrap();
    let err = compose_strip(&[], "текст", "", &font).unwrap_err();
    assert!(matches!(err, EngineError::NoAssets));
}

#[test]
fn overlay_canvas_matches_primary() {
    let dir = TempDir::new().unwrap();
    let primary = write_png(&dir, "primary.png", 200, 160);
    let t1 = write_png(&dir, "t1.png", 80, 40);
    let t2 = write_png(&dir, "t2.png", 30, 90);
    let font = load_font().unwrap();

    let png = compose_overlay(&primary, &[t1, t2], "верх", "низ", &font).unwrap();
    let out = decode(&png);
    assert_eq!((out.width(), out.height()), (200, 160));
}

#[test]
fn overlay_without_thumbs_still_renders() {
    let dir = TempDir::new().unwrap();
    let primary = write_png(&dir, "primary.png", 100, 100);
    let font = load_font().unwrap();

    let png = compose_overlay(&primary, &[], "подпись", "", &font).unwrap();
    assert_eq!(decode(&png).width(), 100);
}

#[test]
fn overlay_with_bad_primary_is_fatal() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.png");
    fs::write(&bad, b"nope").unwrap();
    let t = write_png(&dir, "t.png", 10, 10);
    let font = load_font().unwrap();

    let err = compose_overlay(&bad, &[t], "", "", &font).unwrap_err();
    assert!(matches!(err, EngineError::NoAssets));
}
