#![allow(dead_code)]

use calib_accuracy::core::{homography_from_4pt, RgbImage};
use calib_accuracy::PhysicalSpec;
use nalgebra::Point2;

pub const SIZE: usize = 200;
pub const RED: [u8; 3] = [255, 0, 0];
pub const BLUE: [u8; 3] = [0, 0, 100];

pub struct Scene {
    pub image: RgbImage,
    /// Corner marker centers (TL, TR, BR, BL).
    pub corners: [Point2<f32>; 4],
    pub physical: PhysicalSpec,
}

pub fn physical() -> PhysicalSpec {
    PhysicalSpec::new(172.2, 114.8, 14.65).expect("valid physical spec")
}

fn fill_square(img: &mut RgbImage, cx: i64, cy: i64, half: i64, rgb: [u8; 3]) {
    for y in cy - half..=cy + half {
        for x in cx - half..=cx + half {
            if x >= 0 && y >= 0 && (x as usize) < img.width && (y as usize) < img.height {
                img.put_pixel(x as usize, y as usize, rgb);
            }
        }
    }
}

fn fill_disc(img: &mut RgbImage, c: Point2<f64>, r: f64, rgb: [u8; 3]) {
    let (x0, x1) = ((c.x - r).floor() as i64, (c.x + r).ceil() as i64);
    let (y0, y1) = ((c.y - r).floor() as i64, (c.y + r).ceil() as i64);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x as f64 - c.x, y as f64 - c.y);
            if dx * dx + dy * dy <= r * r
                && x >= 0
                && y >= 0
                && (x as usize) < img.width
                && (y as usize) < img.height
            {
                img.put_pixel(x as usize, y as usize, rgb);
            }
        }
    }
}

/// A `SIZE x SIZE` black image with red corner squares centered on `quad`
/// and an `11 x 7` blue dot lattice placed so that, after rectifying `quad`
/// onto the image rectangle, the dots sit exactly on the physical lattice.
pub fn synthetic_scene(quad: [(i64, i64); 4]) -> Scene {
    let physical = physical();
    let mut image = RgbImage::filled(SIZE, SIZE, [0, 0, 0]);

    for &(x, y) in &quad {
        fill_square(&mut image, x, y, 5, RED);
    }

    let last = (SIZE - 1) as f64;
    let rect = [
        Point2::new(0.0, 0.0),
        Point2::new(last, 0.0),
        Point2::new(last, last),
        Point2::new(0.0, last),
    ];
    let quad_f = quad.map(|(x, y)| Point2::new(x as f64, y as f64));
    let h_src_from_rect = homography_from_4pt(&rect, &quad_f).expect("valid quad");

    // rectified px per physical unit, matching the scorer's width-based ratio
    let sx = SIZE as f64 / physical.width;
    let sy = SIZE as f64 / physical.height;
    let mid = last / 2.0;
    for i in -5..=5 {
        for j in -3..=3 {
            let rx = mid + i as f64 * physical.spacing * sx;
            let ry = mid + j as f64 * physical.spacing * sy;
            let src = h_src_from_rect.apply(Point2::new(rx, ry));
            fill_disc(&mut image, src, 3.5, BLUE);
        }
    }

    Scene {
        image,
        corners: quad_f.map(|p| p.cast::<f32>()),
        physical,
    }
}

/// Axis-aligned target, corner markers 10 px in from the image border.
pub fn square_scene() -> Scene {
    synthetic_scene([(10, 10), (190, 10), (190, 190), (10, 190)])
}

/// Mildly perspective-distorted target.
pub fn tilted_scene() -> Scene {
    synthetic_scene([(16, 12), (186, 8), (192, 190), (8, 184)])
}

pub fn to_png_buffer(img: &RgbImage) -> image::RgbImage {
    image::RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .expect("buffer size matches")
}
