use nalgebra::DMatrix;
use opencv::{
    core::{no_array, KeyPoint, Vector},
    features2d::SIFT,
    prelude::*,
};

use crate::utils::descriptor_mat_to_dmatrix;

/// Compute SIFT keypoints and descriptors for an image region.
///
/// The detector is constructed per call, so the operation is reentrant and
/// carries no state between regions. A region with no detectable structure
/// yields an empty keypoint list and a 0x0 descriptor matrix.
pub fn extract(img: &Mat) -> anyhow::Result<(Vec<KeyPoint>, DMatrix<f32>)> {
    let mut sift = SIFT::create_def()?;

    let mut keypoints: Vector<KeyPoint> = Vector::new();
    let mut descriptors = Mat::default();
    sift.detect_and_compute(img, &no_array(), &mut keypoints, &mut descriptors, false)?;

    let descriptors = descriptor_mat_to_dmatrix(&descriptors)?;
    log::debug!("extracted {} keypoints", keypoints.len());

    Ok((keypoints.to_vec(), descriptors))
}
