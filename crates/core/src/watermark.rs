//! Watermark overlay rendering.
//!
//! When an event has no custom watermark image, photos are stamped with a
//! tiled diagonal text pattern generated from the event's watermark text.
//! Glyphs come from an embedded 5x7 pixel font (digits, ASCII uppercase,
//! space, hyphen, dot) so the repo needs no binary font asset; lowercase
//! input is uppercased, anything else renders as a blank advance.
//!
//! Everything here operates on plain pixel buffers. Storage and caching of
//! rendered overlays belong to the pipeline crate.

use image::{GrayImage, RgbImage, RgbaImage};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Glyph cell size of the embedded font.
pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;

/// Blank columns between glyphs, before scaling.
pub const GLYPH_SPACING: u32 = 1;

/// Rotation of the tiled text, in degrees. Negative slants bottom-left to
/// top-right, the usual proof-watermark orientation.
pub const TILE_ANGLE_DEGREES: f32 = -30.0;

/// Gaps between stamps in the tiled pattern, in output pixels.
pub const TILE_GAP_X: u32 = 120;
pub const TILE_GAP_Y: u32 = 90;

/// Default overlay opacity used by the watermark stage.
pub const DEFAULT_OPACITY: f32 = 0.35;

// ---------------------------------------------------------------------------
// Glyphs
// ---------------------------------------------------------------------------

/// Rows top to bottom, low 5 bits per row, bit 4 is the leftmost column.
fn glyph_rows(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        ' ' => [0, 0, 0, 0, 0, 0, 0],
        '-' => [0, 0, 0, 0b01110, 0, 0, 0],
        '.' => [0, 0, 0, 0, 0, 0b00110, 0b00110],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        _ => return None,
    };
    Some(rows)
}

// ---------------------------------------------------------------------------
// Text mask rendering
// ---------------------------------------------------------------------------

/// Integer scale factor for watermark text on an output of width `width`.
pub fn text_scale_for(width: u32) -> u32 {
    (width / 320).clamp(2, 8)
}

/// Render `text` (uppercased) into a grayscale ink mask, 255 where ink is.
///
/// Characters outside the font advance without ink. Returns a 1x1 empty
/// mask for empty input so callers never deal with zero-sized buffers.
pub fn render_text_mask(text: &str, scale: u32) -> GrayImage {
    let scale = scale.max(1);
    let chars: Vec<char> = text.chars().flat_map(|c| c.to_uppercase()).collect();
    if chars.is_empty() {
        return GrayImage::new(1, 1);
    }

    let advance = (GLYPH_WIDTH + GLYPH_SPACING) * scale;
    let width = advance * chars.len() as u32 - GLYPH_SPACING * scale;
    let height = GLYPH_HEIGHT * scale;
    let mut mask = GrayImage::new(width, height);

    for (i, c) in chars.iter().enumerate() {
        let Some(rows) = glyph_rows(*c) else { continue };
        let origin_x = advance * i as u32;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = origin_x + col * scale + dx;
                        let y = row as u32 * scale + dy;
                        mask.put_pixel(x, y, image::Luma([255]));
                    }
                }
            }
        }
    }

    mask
}

/// Rotate an ink mask by `degrees` around its centre, expanding the canvas
/// to fit. Nearest-neighbour sampling; out-of-bounds samples are blank.
fn rotate_mask(mask: &GrayImage, degrees: f32) -> GrayImage {
    let rad = degrees.to_radians();
    let (sin, cos) = (rad.sin(), rad.cos());
    let (w, h) = (mask.width() as f32, mask.height() as f32);

    let out_w = (w * cos.abs() + h * sin.abs()).ceil() as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil() as u32;
    let mut out = GrayImage::new(out_w.max(1), out_h.max(1));

    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ocx, ocy) = (out.width() as f32 / 2.0, out.height() as f32 / 2.0);

    for y in 0..out.height() {
        for x in 0..out.width() {
            // Inverse transform: where in the source does this pixel land?
            let dx = x as f32 + 0.5 - ocx;
            let dy = y as f32 + 0.5 - ocy;
            let sx = dx * cos + dy * sin + cx;
            let sy = -dx * sin + dy * cos + cy;
            if sx >= 0.0 && sy >= 0.0 && sx < w && sy < h {
                let v = mask.get_pixel(sx as u32, sy as u32).0[0];
                if v > 0 {
                    out.put_pixel(x, y, image::Luma([v]));
                }
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Tiled overlay
// ---------------------------------------------------------------------------

/// Render the full tiled diagonal overlay for an output of `width` x
/// `height`. Stamps are staggered half a step on odd rows so the pattern
/// has no straight-through gaps.
pub fn render_tiled_overlay(width: u32, height: u32, text: &str) -> GrayImage {
    let mut canvas = GrayImage::new(width.max(1), height.max(1));
    if text.trim().is_empty() {
        return canvas;
    }

    let stamp = rotate_mask(
        &render_text_mask(text.trim(), text_scale_for(width)),
        TILE_ANGLE_DEGREES,
    );
    let step_x = (stamp.width() + TILE_GAP_X) as i64;
    let step_y = (stamp.height() + TILE_GAP_Y) as i64;

    let mut row = 0i64;
    let mut y = -(stamp.height() as i64);
    while y < height as i64 {
        let stagger = if row % 2 == 0 { 0 } else { -step_x / 2 };
        let mut x = -(stamp.width() as i64) + stagger;
        while x < width as i64 {
            blit_max(&mut canvas, &stamp, x, y);
            x += step_x;
        }
        y += step_y;
        row += 1;
    }

    canvas
}

/// Blit `stamp` onto `canvas` at (x, y), keeping the brighter pixel.
/// Clips at the canvas edges.
fn blit_max(canvas: &mut GrayImage, stamp: &GrayImage, x: i64, y: i64) {
    for sy in 0..stamp.height() as i64 {
        let cy = y + sy;
        if cy < 0 || cy >= canvas.height() as i64 {
            continue;
        }
        for sx in 0..stamp.width() as i64 {
            let cx = x + sx;
            if cx < 0 || cx >= canvas.width() as i64 {
                continue;
            }
            let v = stamp.get_pixel(sx as u32, sy as u32).0[0];
            if v > canvas.get_pixel(cx as u32, cy as u32).0[0] {
                canvas.put_pixel(cx as u32, cy as u32, image::Luma([v]));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Compositing
// ---------------------------------------------------------------------------

/// Blend a white-ink overlay mask onto an RGB frame at `opacity`.
///
/// The overlay must have the same dimensions as the base; any excess on
/// either side is ignored.
pub fn composite_text_overlay(base: &mut RgbImage, overlay: &GrayImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    let w = base.width().min(overlay.width());
    let h = base.height().min(overlay.height());
    for y in 0..h {
        for x in 0..w {
            let ink = overlay.get_pixel(x, y).0[0];
            if ink == 0 {
                continue;
            }
            let a = (ink as f32 / 255.0) * opacity;
            let px = base.get_pixel_mut(x, y);
            for ch in 0..3 {
                let blended = px.0[ch] as f32 * (1.0 - a) + 255.0 * a;
                px.0[ch] = blended.clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Scale an RGBA image's alpha channel by `opacity`, for compositing
/// operator-supplied watermark images at reduced strength.
pub fn fade_alpha(img: &mut RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    for px in img.pixels_mut() {
        px.0[3] = (px.0[3] as f32 * opacity) as u8;
    }
}
