//! Bird's-eye (top-down) perspective warp.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::cam::FrameSize;
use image::{GrayImage, Luma};
use nalgebra::{DMatrix, DVector, Matrix3, Point2};

use super::{filters::round_u8, BirdviewParams, EdgeMapError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Source coordinates are quantised to 1/INTER_TAB_SIZE of a pixel before sampling.
const INTER_TAB_SIZE: f64 = 32.0;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The four point correspondence for the birdview warp of an image of the given size.
///
/// The source points are the bottom corners and the points on the left and right edges at one
/// `horizon_divisor`th of the height. At the bottom they map inwards by `bottom_inset_px`, at the
/// top they map outwards past the canvas edges by `top_overshoot_px`.
pub fn control_points(
    input: FrameSize,
    params: &BirdviewParams,
) -> ([Point2<f64>; 4], [Point2<f64>; 4]) {
    let (w, h) = (input.width as f64, input.height as f64);
    let horizon = (input.height / params.horizon_divisor.max(1)) as f64;

    let (ow, oh) = (params.output_size.width as f64, params.output_size.height as f64);
    let inset = params.bottom_inset_px;
    let over = params.top_overshoot_px;

    let src = [
        Point2::new(0.0, h),
        Point2::new(w, h),
        Point2::new(0.0, horizon),
        Point2::new(w, horizon),
    ];
    let dst = [
        Point2::new(inset, oh),
        Point2::new(ow - inset, oh),
        Point2::new(-over, 0.0),
        Point2::new(ow + over, 0.0),
    ];

    (src, dst)
}

/// Compute the perspective transform mapping the 4 source points onto the 4 destination points.
///
/// The bottom right element of the returned matrix is fixed at 1.
pub fn perspective_transform(
    src: &[Point2<f64>; 4],
    dst: &[Point2<f64>; 4],
) -> Result<Matrix3<f64>, EdgeMapError> {
    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DVector::<f64>::zeros(8);

    for i in 0..4 {
        let (x, y) = (src[i].x, src[i].y);
        let (u, v) = (dst[i].x, dst[i].y);

        a[(i, 0)] = x;
        a[(i, 1)] = y;
        a[(i, 2)] = 1.0;
        a[(i, 6)] = -x * u;
        a[(i, 7)] = -y * u;
        b[i] = u;

        a[(i + 4, 3)] = x;
        a[(i + 4, 4)] = y;
        a[(i + 4, 5)] = 1.0;
        a[(i + 4, 6)] = -x * v;
        a[(i + 4, 7)] = -y * v;
        b[i + 4] = v;
    }

    let m = a.lu().solve(&b).ok_or(EdgeMapError::DegenerateWarp)?;

    Ok(Matrix3::new(
        m[0], m[1], m[2],
        m[3], m[4], m[5],
        m[6], m[7], 1.0,
    ))
}

/// Warp the image with the given forward (source to destination) transform onto a canvas of
/// `output_size`.
///
/// Each output pixel is sampled from the source with bilinear interpolation, anything outside the
/// source reads as 0.
pub fn warp_perspective(
    image: &GrayImage,
    transform: &Matrix3<f64>,
    output_size: FrameSize,
) -> Result<GrayImage, EdgeMapError> {
    let inv = transform.try_inverse().ok_or(EdgeMapError::DegenerateWarp)?;
    let (sw, sh) = (image.width() as i64, image.height() as i64);
    let src = image.as_raw();

    let sample = |x: i64, y: i64| -> f64 {
        if x < 0 || y < 0 || x >= sw || y >= sh {
            0.0
        } else {
            src[(y * sw + x) as usize] as f64
        }
    };

    let mut out = GrayImage::new(output_size.width, output_size.height);

    for v in 0..output_size.height {
        for u in 0..output_size.width {
            let (uf, vf) = (u as f64, v as f64);
            let w = inv[(2, 0)] * uf + inv[(2, 1)] * vf + inv[(2, 2)];
            if w == 0.0 {
                continue;
            }

            // Quantised source position
            let qx = ((inv[(0, 0)] * uf + inv[(0, 1)] * vf + inv[(0, 2)]) / w * INTER_TAB_SIZE)
                .round();
            let qy = ((inv[(1, 0)] * uf + inv[(1, 1)] * vf + inv[(1, 2)]) / w * INTER_TAB_SIZE)
                .round();
            if !qx.is_finite() || !qy.is_finite() {
                continue;
            }

            let x0 = (qx / INTER_TAB_SIZE).floor();
            let y0 = (qy / INTER_TAB_SIZE).floor();
            let fx = qx / INTER_TAB_SIZE - x0;
            let fy = qy / INTER_TAB_SIZE - y0;

            // Far outside the source there's nothing to sample
            if x0 < -1.0 || y0 < -1.0 || x0 >= sw as f64 || y0 >= sh as f64 {
                continue;
            }
            let (x0, y0) = (x0 as i64, y0 as i64);

            let value = (1.0 - fy) * ((1.0 - fx) * sample(x0, y0) + fx * sample(x0 + 1, y0))
                + fy * ((1.0 - fx) * sample(x0, y0 + 1) + fx * sample(x0 + 1, y0 + 1));

            out.put_pixel(u, v, Luma([round_u8(value)]));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    /// Project a point through the transform.
    fn project(transform: &Matrix3<f64>, point: Point2<f64>) -> Point2<f64> {
        let x = transform[(0, 0)] * point.x + transform[(0, 1)] * point.y + transform[(0, 2)];
        let y = transform[(1, 0)] * point.x + transform[(1, 1)] * point.y + transform[(1, 2)];
        let w = transform[(2, 0)] * point.x + transform[(2, 1)] * point.y + transform[(2, 2)];

        Point2::new(x / w, y / w)
    }

    fn default_transform() -> Matrix3<f64> {
        let (src, dst) = control_points(FrameSize::default(), &BirdviewParams::default());
        perspective_transform(&src, &dst).unwrap()
    }

    #[test]
    fn test_control_point_mapping() {
        let (src, dst) = control_points(FrameSize::default(), &BirdviewParams::default());
        assert_eq!(src[2], Point2::new(0.0, 53.0));
        assert_eq!(dst[1], Point2::new(230.0, 160.0));
        assert_eq!(dst[3], Point2::new(330.0, 0.0));

        let m = default_transform();
        for (s, d) in src.iter().zip(dst.iter()) {
            let p = project(&m, *s);
            assert!((p - d).norm() < 1e-6, "{} -> {} expected {}", s, p, d);
        }
    }

    #[test]
    fn test_degenerate() {
        let p = Point2::new(1.0, 1.0);
        assert!(matches!(
            perspective_transform(&[p; 4], &[p; 4]),
            Err(EdgeMapError::DegenerateWarp)
        ));
    }

    #[test]
    fn test_warp_vertical_line() {
        // A vertical line at the image centre stays on the centre column since the warp is
        // symmetric about it
        let image = GrayImage::from_fn(320, 160, |x, _| {
            if x == 159 || x == 160 { Luma([255]) } else { Luma([0]) }
        });

        let warped = warp_perspective(&image, &default_transform(), FrameSize::default()).unwrap();
        assert_eq!(warped.dimensions(), (320, 160));

        let row = 112;
        let lit: Vec<u32> = (0..320).filter(|&x| warped.get_pixel(x, row).0[0] > 0).collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|&x| x >= 158 && x <= 161), "{:?}", lit);

        // The bottom corners lie outside the source footprint
        assert_eq!(warped.get_pixel(0, 159).0[0], 0);
    }
}
