//! Detection visualisation: class-coloured boxes over the detector image.

use contracts::{DetectionBox, Shape};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Box colour per class id (RGB); unknown classes are white
const CLASS_COLORS: [[u8; 3]; 10] = [
    [128, 128, 128], // BG
    [0, 255, 0],     // PERSON
    [0, 165, 255],   // PET_CAT
    [255, 0, 255],   // PET_DOG
    [255, 255, 0],   // SOFA
    [0, 255, 255],   // TABLE
    [255, 0, 128],   // BED
    [255, 0, 0],     // EXCREMENT
    [0, 128, 255],   // WIRE
    [255, 128, 0],   // KEY
];

const BOX_THICKNESS: i32 = 2;

pub fn class_color(class_id: i32) -> Rgb<u8> {
    usize::try_from(class_id)
        .ok()
        .and_then(|id| CLASS_COLORS.get(id))
        .map_or(Rgb([255, 255, 255]), |c| Rgb(*c))
}

/// `"PERSON 0.90"`
pub fn box_label(b: &DetectionBox) -> String {
    format!("{} {:.2}", b.class_name(), b.score)
}

/// RGB canvas from a gray or BGR image; `None` for other layouts
pub fn canvas(data: &[u8], shape: Shape) -> Option<RgbImage> {
    let (w, h) = (shape.width, shape.height);
    if data.len() < shape.len() || w == 0 || h == 0 {
        return None;
    }
    match shape.channels {
        1 => Some(RgbImage::from_fn(w, h, |x, y| {
            let g = data[(y * w + x) as usize];
            Rgb([g, g, g])
        })),
        3 => Some(RgbImage::from_fn(w, h, |x, y| {
            let i = (y * w + x) as usize * 3;
            Rgb([data[i + 2], data[i + 1], data[i]])
        })),
        _ => None,
    }
}

/// Draw every box, clipped to the canvas
pub fn draw_boxes(canvas: &mut RgbImage, boxes: &[DetectionBox]) {
    for b in boxes {
        let color = class_color(b.class_id);
        for inset in 0..BOX_THICKNESS {
            let (w, h) = (b.width - 2 * inset, b.height - 2 * inset);
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(b.x + inset, b.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}
