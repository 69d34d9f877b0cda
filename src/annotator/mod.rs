//! Detection overlay drawing
//!
//! ## Responsibilities
//!
//! - Convert center+size detection geometry to corner rectangles
//! - Draw a hollow box and a `"{label} {confidence:.2}"` caption per
//!   detection: green for "healthy", red for everything else
//! - Write the annotated copy to the results directory, leaving the
//!   captured frame untouched

mod font;

use crate::capture::CapturedFrame;
use crate::classifier::Detection;
use crate::error::Result;
use chrono::{DateTime, Local};
use image::{DynamicImage, Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BOX_THICKNESS: u32 = 2;
const LABEL_SCALE: u32 = 2;
/// Caption baseline offset above the box, matching the source overlay
const LABEL_OFFSET: i64 = 10;

/// Draw all detections onto a copy of the frame and write the result as
/// `inference_{timestamp}.jpg` under `results_dir`. The input frame is not
/// mutated.
pub fn annotate(
    frame: &CapturedFrame,
    detections: &[Detection],
    results_dir: &Path,
) -> Result<PathBuf> {
    let mut img = frame.pixels.clone();

    for det in detections {
        draw_detection(&mut img, det);
    }

    fs::create_dir_all(results_dir)?;
    let path = results_dir.join(result_filename(Local::now()));
    DynamicImage::ImageRgba8(img).to_rgb8().save(&path)?;

    tracing::info!(
        path = %path.display(),
        detections = detections.len(),
        "Inference result saved"
    );

    Ok(path)
}

/// Filename for an annotated result, local-time derived
fn result_filename(now: DateTime<Local>) -> String {
    format!("inference_{}.jpg", now.format("%Y%m%d_%H%M%S"))
}

pub(crate) fn draw_detection(img: &mut RgbaImage, det: &Detection) {
    let (x1, y1, x2, y2) = corner_rect(det);
    let color = box_color(&det.class_label);

    draw_rect(img, x1, y1, x2, y2, color, BOX_THICKNESS);

    let caption = format!("{} {:.2}", det.class_label, det.confidence);
    let text_height = (font::GLYPH_HEIGHT * LABEL_SCALE) as i64;
    draw_label(img, &caption, x1, y1 - LABEL_OFFSET - text_height, color);
}

/// Center+size to corner coordinates with integer pixel truncation
pub(crate) fn corner_rect(det: &Detection) -> (i64, i64, i64, i64) {
    let x1 = (det.center_x - det.width / 2.0) as i64;
    let y1 = (det.center_y - det.height / 2.0) as i64;
    let x2 = (det.center_x + det.width / 2.0) as i64;
    let y2 = (det.center_y + det.height / 2.0) as i64;
    (x1, y1, x2, y2)
}

pub(crate) fn box_color(label: &str) -> Rgba<u8> {
    if label.eq_ignore_ascii_case("healthy") {
        GREEN
    } else {
        RED
    }
}

/// Hollow rectangle with the given border thickness. Out-of-frame
/// coordinates are clamped; degenerate boxes draw nothing.
fn draw_rect(img: &mut RgbaImage, x1: i64, y1: i64, x2: i64, y2: i64, color: Rgba<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || x2 < 0 || y2 < 0 || x1 >= w as i64 || y1 >= h as i64 {
        return;
    }

    let clamp = |v: i64, max: u32| -> u32 { v.clamp(0, max as i64 - 1) as u32 };
    let x0 = clamp(x1, w);
    let y0 = clamp(y1, h);
    let x1 = clamp(x2, w);
    let y1 = clamp(y2, h);

    for t in 0..thickness {
        let xx0 = x0 + t;
        let yy0 = y0 + t;
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

/// Render caption text with the built-in 5x7 font. Pixels falling outside
/// the frame are skipped.
fn draw_label(img: &mut RgbaImage, text: &str, x: i64, y: i64, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    let advance = ((font::GLYPH_WIDTH + 1) * LABEL_SCALE) as i64;

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = font::glyph(c) else {
            continue;
        };
        let origin_x = x + i as i64 * advance;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..font::GLYPH_WIDTH {
                if bits & (1 << (font::GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..LABEL_SCALE {
                    for dx in 0..LABEL_SCALE {
                        let px = origin_x + (col * LABEL_SCALE + dx) as i64;
                        let py = y + (row as u32 * LABEL_SCALE + dy) as i64;
                        if px >= 0 && py >= 0 && (px as u32) < w && (py as u32) < h {
                            img.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str, cx: f32, cy: f32, w: f32, h: f32) -> Detection {
        Detection {
            class_label: label.to_string(),
            confidence: 0.95,
            center_x: cx,
            center_y: cy,
            width: w,
            height: h,
        }
    }

    #[test]
    fn center_to_corner_truncates() {
        let det = detection("healthy", 100.0, 100.0, 40.0, 40.0);
        assert_eq!(corner_rect(&det), (80, 80, 120, 120));

        // Odd width: int(100 - 20.5) = 79, int(100 + 20.5) = 120.
        let det = detection("healthy", 100.0, 100.0, 41.0, 41.0);
        assert_eq!(corner_rect(&det), (79, 79, 120, 120));
    }

    #[test]
    fn corner_round_trip_holds_for_even_sizes() {
        for (cx, cy, w, h) in [(100.0, 100.0, 40.0, 40.0), (64.0, 32.0, 10.0, 6.0)] {
            let det = detection("x", cx, cy, w, h);
            let (x1, _, x2, _) = corner_rect(&det);
            assert_eq!(x1, (cx - w / 2.0) as i64);
            assert_eq!(x2, (cx + w / 2.0) as i64);
        }
    }

    #[test]
    fn healthy_is_green_others_red() {
        assert_eq!(box_color("healthy"), GREEN);
        assert_eq!(box_color("HeAlThY"), GREEN);
        assert_eq!(box_color("blight"), RED);
        assert_eq!(box_color(""), RED);
    }

    #[test]
    fn draws_box_border_pixels() {
        let mut img = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255]));
        draw_detection(&mut img, &detection("healthy", 100.0, 100.0, 40.0, 40.0));

        // Corner rect is (80, 80, 120, 120); border should be green.
        assert_eq!(*img.get_pixel(80, 80), GREEN);
        assert_eq!(*img.get_pixel(120, 120), GREEN);
        assert_eq!(*img.get_pixel(100, 80), GREEN);
        // Interior stays untouched.
        assert_eq!(*img.get_pixel(100, 100), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn out_of_frame_geometry_does_not_panic() {
        let mut img = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255]));
        draw_detection(&mut img, &detection("blight", 1000.0, 1000.0, 50.0, 50.0));
        draw_detection(&mut img, &detection("blight", -100.0, -100.0, 50.0, 50.0));
        draw_detection(&mut img, &detection("blight", 16.0, 16.0, 0.0, 0.0));
    }

    #[test]
    fn result_filename_shape() {
        use chrono::TimeZone;
        let now = Local.with_ymd_and_hms(2026, 1, 14, 18, 37, 34).unwrap();
        assert_eq!(result_filename(now), "inference_20260114_183734.jpg");
    }

    #[test]
    fn annotate_does_not_mutate_the_frame() {
        let frame = CapturedFrame {
            path: PathBuf::from("in.jpg"),
            pixels: RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 255])),
            jpeg: Vec::new(),
        };
        let dir = std::env::temp_dir().join(format!("plantwatch-annotate-{}", std::process::id()));

        let out = annotate(&frame, &[detection("healthy", 32.0, 32.0, 20.0, 20.0)], &dir).unwrap();
        assert!(out.exists());
        assert_ne!(out, frame.path);
        assert_eq!(*frame.pixels.get_pixel(32, 22), Rgba([10, 20, 30, 255]));

        std::fs::remove_dir_all(&dir).ok();
    }
}
