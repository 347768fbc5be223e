use opencv::{
    core::{Mat, Point, Scalar, Vec3f, Vector},
    imgproc::{circle, cvt_color_def, hough_circles, COLOR_GRAY2BGR, HOUGH_GRADIENT, LINE_AA},
};

/// A detected cap candidate: integer center and radius in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Circle {
    pub x: i32,
    pub y: i32,
    pub r: i32,
}

/// Parameters for the Hough circle search. The radius band and the center
/// separation scale with the expected blob diameter, which keeps detections
/// at scales far from the cap size from flooding the result with noise.
#[derive(Debug, Clone)]
pub struct CircleConfig {
    /// Inverse accumulator resolution passed to the Hough transform.
    pub dp: f64,
    /// Lower bound of the radius band, as a fraction of the expected diameter.
    pub min_radius_factor: f64,
    /// Upper bound of the radius band, as a fraction of the expected diameter.
    pub max_radius_factor: f64,
    /// Minimum distance between accepted centers, as a fraction of the expected diameter.
    pub min_dist_factor: f64,
    /// Upper Canny threshold used by the gradient method.
    pub edge_threshold: f64,
    /// Accumulator votes required to accept a circle.
    pub vote_threshold: f64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            dp: 1.0,
            min_radius_factor: 0.4,
            max_radius_factor: 0.6,
            min_dist_factor: 0.8,
            edge_threshold: 100.0,
            vote_threshold: 30.0,
        }
    }
}

/// Find circular regions of roughly the expected size in a grayscale image.
///
/// Returns a BGR copy with the accepted circles drawn for inspection, plus the
/// circle list. Zero detections yield an empty list, not an error.
pub fn detect_circles(
    img: &Mat,
    expected_size: f64,
    config: &CircleConfig,
) -> anyhow::Result<(Mat, Vec<Circle>)> {
    let min_dist = (expected_size * config.min_dist_factor).max(1.0);
    let min_radius = (expected_size * config.min_radius_factor).floor() as i32;
    let max_radius = (expected_size * config.max_radius_factor).ceil() as i32;

    let mut raw: Vector<Vec3f> = Vector::new();
    hough_circles(
        img,
        &mut raw,
        HOUGH_GRADIENT,
        config.dp,
        min_dist,
        config.edge_threshold,
        config.vote_threshold,
        min_radius,
        max_radius,
    )?;

    let circles: Vec<Circle> = raw
        .iter()
        .map(|c| Circle {
            x: c[0].round() as i32,
            y: c[1].round() as i32,
            r: c[2].round() as i32,
        })
        .collect();
    log::debug!(
        "hough found {} circles for expected size {expected_size:.1}",
        circles.len()
    );

    let mut debug_img = Mat::default();
    cvt_color_def(img, &mut debug_img, COLOR_GRAY2BGR)?;
    for c in &circles {
        circle(
            &mut debug_img,
            Point::new(c.x, c.y),
            c.r,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            2,
            LINE_AA,
            0,
        )?;
    }

    Ok((debug_img, circles))
}
