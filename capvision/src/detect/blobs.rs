use opencv::{
    core::{no_array, KeyPoint, Vector},
    features2d::{SimpleBlobDetector, SimpleBlobDetector_Params},
    prelude::*,
};

/// Parameters for the blob pass that sizes the caps in a photo.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Smallest accepted blob area (px^2).
    pub min_area: f32,
    /// Largest accepted blob area (px^2).
    pub max_area: f32,
    /// Reject blobs less circular than this (0..1).
    pub min_circularity: f32,
    /// Intensity of the blobs to look for; caps image darker than a typical background.
    pub blob_color: u8,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            min_area: 100.0,
            max_area: 100_000.0,
            min_circularity: 0.5,
            blob_color: 0,
        }
    }
}

/// Detect blob-like regions in a grayscale image and average their diameters.
///
/// An average of 0.0 means no blobs were found. That is a normal outcome (a
/// photo with no caps in it), and callers use it to skip circle detection.
pub fn estimate_average_blob_size(
    img: &Mat,
    config: &BlobConfig,
) -> anyhow::Result<(Vec<KeyPoint>, f64)> {
    let mut params = SimpleBlobDetector_Params::default()?;
    params.filter_by_color = true;
    params.blob_color = config.blob_color;
    params.filter_by_area = true;
    params.min_area = config.min_area;
    params.max_area = config.max_area;
    params.filter_by_circularity = true;
    params.min_circularity = config.min_circularity;

    let mut detector = SimpleBlobDetector::create(params)?;
    let mut blobs: Vector<KeyPoint> = Vector::new();
    detector.detect(img, &mut blobs, &no_array())?;

    if blobs.is_empty() {
        return Ok((Vec::new(), 0.0));
    }

    let average = blobs.iter().map(|b| b.size() as f64).sum::<f64>() / blobs.len() as f64;
    log::debug!("found {} blobs, average size {average:.1}", blobs.len());

    Ok((blobs.to_vec(), average))
}
