//! Image filters used by the edge map pipeline.
//!
//! All filters work on 8 bit images and reproduce the usual fixed-point conventions so that the
//! results are bit-stable between runs.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::{GrayImage, Luma, RgbImage};
use util::maths::{gaussian_kernel, reflect_101, replicate};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fixed point shift for the luminance coefficients.
const LUMA_SHIFT: u32 = 14;

/// Luminance coefficients (0.299, 0.587, 0.114) scaled by `1 << LUMA_SHIFT`.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;

/// Canny map values.
const MAP_NONE: u8 = 0;
const MAP_WEAK: u8 = 1;
const MAP_EDGE: u8 = 2;

/// Value written for edge pixels.
pub const EDGE_VALUE: u8 = 255;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert an RGB image to single channel luminance.
pub fn grayscale(image: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());

    for (o, p) in out.pixels_mut().zip(image.pixels()) {
        let [r, g, b] = p.0;
        let y = (r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B
            + (1 << (LUMA_SHIFT - 1)))
            >> LUMA_SHIFT;
        *o = Luma([y as u8]);
    }

    out
}

/// Blur with a square Gaussian kernel of the given (odd) size, with the sigma derived from the
/// kernel size.
///
/// The kernel is applied separably, edges are handled by reflecting about the edge pixel.
pub fn gaussian_blur(image: &GrayImage, ksize: usize) -> GrayImage {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let kernel: Vec<f64> = gaussian_kernel(ksize, 0.0);
    let half = (ksize / 2) as isize;
    let src = image.as_raw();

    // Horizontal pass, kept in floating point
    let mut tmp = vec![0f64; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            tmp[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(i, k)| k * row[reflect_101(x as isize + i as isize - half, w)] as f64)
                .sum();
        }
    }

    // Vertical pass
    let mut out = GrayImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let v: f64 = kernel
                .iter()
                .enumerate()
                .map(|(i, k)| k * tmp[reflect_101(y as isize + i as isize - half, h) * w + x])
                .sum();
            out.put_pixel(x as u32, y as u32, Luma([round_u8(v)]));
        }
    }

    out
}

/// Canny edge detector.
///
/// Gradients are 3x3 Sobel derivatives with replicated edges, the magnitude is the L1 norm
/// `|dx| + |dy|`. Non-maximum suppression is done along one of four directions, then weak edges
/// (`> low`) are kept only if 8-connected to a strong edge (`> high`). Edge pixels are set to
/// `EDGE_VALUE`, all others to 0.
pub fn canny(image: &GrayImage, low: i32, high: i32) -> GrayImage {
    let (low, high) = if low > high { (high, low) } else { (low, high) };
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut out = GrayImage::new(w as u32, h as u32);

    if w == 0 || h == 0 {
        return out;
    }

    let (dx, dy) = sobel(image);
    let mag: Vec<i32> = dx.iter().zip(dy.iter()).map(|(x, y)| x.abs() + y.abs()).collect();

    // Magnitude with zero outside the image
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    // tan(22.5 deg) in Q15
    const TG22: i64 = 13573;
    const SHIFT: u32 = 15;

    let mut map = vec![MAP_NONE; w * h];
    let mut stack: Vec<usize> = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = mag[i];
            if m <= low {
                continue;
            }

            let (xi, yi) = (x as isize, y as isize);
            let xs = dx[i].abs() as i64;
            let ys = (dy[i].abs() as i64) << SHIFT;
            let tg22x = xs * TG22;

            let is_max = if ys < tg22x {
                // Horizontal gradient
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else {
                let tg67x = tg22x + (xs << (SHIFT + 1));
                if ys > tg67x {
                    // Vertical gradient
                    m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
                } else {
                    // Diagonal, direction given by the gradient signs
                    let s: isize = if (dx[i] ^ dy[i]) < 0 { -1 } else { 1 };
                    m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
                }
            };

            if !is_max {
                continue;
            }

            if m > high {
                map[i] = MAP_EDGE;
                stack.push(i);
            } else {
                map[i] = MAP_WEAK;
            }
        }
    }

    // Hysteresis, grow strong edges into connected weak ones
    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as isize, (i / w) as isize);
        for ny in (y - 1)..=(y + 1) {
            for nx in (x - 1)..=(x + 1) {
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if map[n] == MAP_WEAK {
                    map[n] = MAP_EDGE;
                    stack.push(n);
                }
            }
        }
    }

    for (o, m) in out.pixels_mut().zip(map.iter()) {
        if *m == MAP_EDGE {
            *o = Luma([EDGE_VALUE]);
        }
    }

    out
}

/// Round a filtered value back into the 8 bit range.
pub(crate) fn round_u8(v: f64) -> u8 {
    v.round().max(0.0).min(255.0) as u8
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// 3x3 Sobel x and y derivatives with replicated borders.
fn sobel(image: &GrayImage) -> (Vec<i32>, Vec<i32>) {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let src = image.as_raw();
    let px = |x: isize, y: isize| -> i32 { src[replicate(y, h) * w + replicate(x, w)] as i32 };

    let mut dx = vec![0i32; w * h];
    let mut dy = vec![0i32; w * h];

    for y in 0..h as isize {
        for x in 0..w as isize {
            let i = y as usize * w + x as usize;

            dx[i] = (px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x - 1, y) + px(x - 1, y + 1));

            dy[i] = (px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x, y - 1) + px(x + 1, y - 1));
        }
    }

    (dx, dy)
}
