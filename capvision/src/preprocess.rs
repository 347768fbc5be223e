use anyhow::bail;
use opencv::{
    core::{bitwise_and, Point, Scalar, Size, CV_8UC1, CV_8UC3},
    imgproc::{circle, cvt_color_def, resize, COLOR_BGR2GRAY, FILLED, INTER_AREA, LINE_8},
    prelude::*,
};

pub fn to_grayscale(img: &Mat) -> anyhow::Result<Mat> {
    let mut img_gray = Mat::default();
    match img.typ() {
        CV_8UC1 => {
            img_gray = img.clone();
        }
        CV_8UC3 => {
            cvt_color_def(img, &mut img_gray, COLOR_BGR2GRAY)?;
        }
        _ => {
            bail!("image of unknown color type");
        }
    }

    Ok(img_gray)
}

/// Downscale until the pixel area is at or below `max_area`. Large photos make
/// feature extraction disproportionately slow; the detection results only need
/// enough resolution to separate caps from each other.
pub fn shrink_to_area(img: &Mat, max_area: i64, factor: f64) -> anyhow::Result<Mat> {
    if factor <= 0.0 || factor >= 1.0 {
        bail!("shrink factor must be between 0 and 1, got {factor}");
    }

    let mut out = img.clone();
    while (out.rows() as i64) * (out.cols() as i64) > max_area {
        let mut smaller = Mat::default();
        resize(&out, &mut smaller, Size::new(0, 0), factor, factor, INTER_AREA)?;
        if smaller.rows() >= out.rows() && smaller.cols() >= out.cols() {
            break;
        }
        out = smaller;
    }

    Ok(out)
}

/// Black out everything outside the centered inscribed circle. Reference cap
/// shots are square-ish photos of a round cap; the corners are background.
pub fn apply_circular_mask(img: &Mat) -> anyhow::Result<Mat> {
    let (height, width) = (img.rows(), img.cols());
    let center = Point::new(width / 2, height / 2);
    let radius = width.min(height) / 2;

    let mut mask = Mat::zeros(height, width, CV_8UC1)?.to_mat()?;
    circle(&mut mask, center, radius, Scalar::all(255.0), FILLED, LINE_8, 0)?;

    let mut masked = Mat::default();
    bitwise_and(img, img, &mut masked, &mask)?;

    Ok(masked)
}
