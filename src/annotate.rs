//! CPU drawing helpers for annotated frames.
//!
//! Boxes and captions are rasterised straight into the RGB buffer with a small
//! built-in 5x7 bitmap font, so no font files have to ship with the binary.

use image::{Rgb, RgbImage};

use crate::detect::Detection;

pub const FPS_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Top-left corner of the fps readout. With `FPS_SCALE` the glyph baseline lands at y = 30.
pub const FPS_ORIGIN: (i32, i32) = (10, 16);
pub const FPS_SCALE: i32 = 2;

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;
const BOX_THICKNESS: i32 = 2;
const CAPTION_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([255, 56, 56]),
    Rgb([255, 157, 151]),
    Rgb([255, 112, 31]),
    Rgb([255, 178, 29]),
    Rgb([207, 210, 49]),
    Rgb([72, 249, 10]),
    Rgb([26, 147, 52]),
    Rgb([0, 212, 187]),
];

pub fn class_color(class_id: usize) -> Rgb<u8> {
    PALETTE[class_id % PALETTE.len()]
}

/// Draw a detection box with its `"<label> <pct>%"` caption above it.
pub fn draw_detection(image: &mut RgbImage, detection: &Detection) {
    let color = class_color(detection.class_id);
    let left = detection.x.round() as i32;
    let top = detection.y.round() as i32;
    let right = (detection.x + detection.w).round() as i32;
    let bottom = (detection.y + detection.h).round() as i32;

    for inset in 0..BOX_THICKNESS {
        draw_rectangle(
            image,
            left + inset,
            top + inset,
            right - inset,
            bottom - inset,
            color,
        );
    }

    let caption = format!(
        "{} {:.0}%",
        detection.label,
        detection.confidence * 100.0
    );
    let caption_y = (top - GLYPH_HEIGHT - 4).max(0);
    fill_rect(
        image,
        left,
        caption_y,
        left + text_width(&caption, 1) + 2,
        caption_y + GLYPH_HEIGHT + 2,
        CAPTION_BACKGROUND,
    );
    draw_text(image, left + 1, caption_y + 1, &caption, 1, color);
}

/// Pixel width of `text` rendered at `scale`.
pub fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE * scale
}

pub fn draw_rectangle(
    image: &mut RgbImage,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: Rgb<u8>,
) {
    if image.width() == 0 || image.height() == 0 || right < left || bottom < top {
        return;
    }
    let width = image.width() as i32;
    let height = image.height() as i32;
    let left = left.clamp(0, width - 1);
    let right = right.clamp(0, width - 1);
    let top = top.clamp(0, height - 1);
    let bottom = bottom.clamp(0, height - 1);

    for x in left..=right {
        image.put_pixel(x as u32, top as u32, color);
        image.put_pixel(x as u32, bottom as u32, color);
    }
    for y in top..=bottom {
        image.put_pixel(left as u32, y as u32, color);
        image.put_pixel(right as u32, y as u32, color);
    }
}

pub fn fill_rect(
    image: &mut RgbImage,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: Rgb<u8>,
) {
    if image.width() == 0 || image.height() == 0 || right < left || bottom < top {
        return;
    }
    let width = image.width() as i32;
    let height = image.height() as i32;
    let left = left.clamp(0, width - 1);
    let right = right.clamp(0, width - 1);
    let top = top.clamp(0, height - 1);
    let bottom = bottom.clamp(0, height - 1);

    for y in top..=bottom {
        for x in left..=right {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Render `text` with its top-left corner at (`x`, `y`). Pixels outside the image are clipped.
pub fn draw_text(image: &mut RgbImage, x: i32, y: i32, text: &str, scale: i32, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let scale = scale.max(1);
    let mut pen_x = x;

    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        let rows = glyph_bits(ch);
        for (row, pattern) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = pen_x + col * scale + dx;
                        let py = y + row as i32 * scale + dy;
                        if px >= 0 && px < width && py >= 0 && py < height {
                            image.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
        pen_x += GLYPH_ADVANCE * scale;
    }
}

fn glyph_bits(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
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
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        '.' => [0, 0, 0, 0, 0, 0b00110, 0b00110],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '%' => [0b10001, 0b10010, 0b00100, 0b01000, 0b10010, 0b10001, 0],
        ' ' => [0; 7],
        _ => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0, 0b00100],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_pixels(image: &RgbImage, color: Rgb<u8>) -> usize {
        image.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn text_is_clipped_at_image_edges() {
        let mut image = RgbImage::new(8, 8);
        draw_text(&mut image, -3, -3, "FPS: 99.9", 2, FPS_COLOR);
        assert!(lit_pixels(&image, FPS_COLOR) > 0);
    }

    #[test]
    fn space_draws_nothing() {
        let mut image = RgbImage::new(16, 16);
        draw_text(&mut image, 0, 0, "   ", 1, FPS_COLOR);
        assert_eq!(lit_pixels(&image, FPS_COLOR), 0);
    }

    #[test]
    fn rectangle_outline_leaves_interior_untouched() {
        let mut image = RgbImage::new(20, 20);
        let color = Rgb([255, 0, 0]);
        draw_rectangle(&mut image, 2, 2, 12, 12, color);
        assert_eq!(*image.get_pixel(2, 7), color);
        assert_eq!(*image.get_pixel(12, 12), color);
        assert_eq!(*image.get_pixel(7, 7), Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_rectangles_are_ignored() {
        let mut image = RgbImage::new(10, 10);
        draw_rectangle(&mut image, 8, 8, 2, 2, FPS_COLOR);
        fill_rect(&mut image, 5, 5, 1, 1, FPS_COLOR);
        assert_eq!(lit_pixels(&image, FPS_COLOR), 0);

        let mut empty = RgbImage::new(0, 0);
        draw_rectangle(&mut empty, 0, 0, 4, 4, FPS_COLOR);
    }

    #[test]
    fn detection_caption_uses_class_color() {
        let mut image = RgbImage::new(120, 80);
        let detection = Detection {
            x: 20.0,
            y: 30.0,
            w: 40.0,
            h: 30.0,
            confidence: 0.87,
            class_id: 2,
            label: "car".to_string(),
        };
        draw_detection(&mut image, &detection);
        assert_eq!(*image.get_pixel(20, 45), class_color(2));
        assert!(lit_pixels(&image, class_color(2)) > 100);
    }
}
