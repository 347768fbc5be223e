use anyhow::bail;
use nalgebra::DMatrix;
use opencv::{
    core::{CV_32FC1, CV_8UC1},
    prelude::*,
};

/// Copy a descriptor Mat into a row-per-keypoint `DMatrix<f32>`. Integer
/// descriptors (e.g. from a binary extractor) are coerced to f32 instead of
/// being rejected, so sets from different extractors stay comparable.
pub fn descriptor_mat_to_dmatrix(mat: &Mat) -> anyhow::Result<DMatrix<f32>> {
    if mat.empty() {
        return Ok(DMatrix::zeros(0, 0));
    }

    let rows = mat.rows() as usize;
    let cols = mat.cols() as usize;
    let mut res = DMatrix::zeros(rows, cols);

    match mat.typ() {
        CV_32FC1 => {
            for r in 0..rows {
                for c in 0..cols {
                    res[(r, c)] = *mat.at_2d::<f32>(r as i32, c as i32)?;
                }
            }
        }
        CV_8UC1 => {
            for r in 0..rows {
                for c in 0..cols {
                    res[(r, c)] = *mat.at_2d::<u8>(r as i32, c as i32)? as f32;
                }
            }
        }
        typ => {
            bail!("descriptor matrix of unsupported element type {typ}");
        }
    }

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::Scalar;

    #[test]
    fn float_descriptors_copy_through() {
        let mat =
            Mat::new_rows_cols_with_default(2, 3, CV_32FC1, Scalar::all(1.5)).unwrap();
        let dm = descriptor_mat_to_dmatrix(&mat).unwrap();
        assert_eq!((dm.nrows(), dm.ncols()), (2, 3));
        assert!(dm.iter().all(|v| *v == 1.5));
    }

    #[test]
    fn integer_descriptors_are_coerced_to_f32() {
        let mat = Mat::new_rows_cols_with_default(2, 4, CV_8UC1, Scalar::all(7.0)).unwrap();
        let dm = descriptor_mat_to_dmatrix(&mat).unwrap();
        assert_eq!((dm.nrows(), dm.ncols()), (2, 4));
        assert!(dm.iter().all(|v| *v == 7.0));
    }

    #[test]
    fn empty_descriptor_mat_becomes_an_empty_matrix() {
        let mat = Mat::default();
        let dm = descriptor_mat_to_dmatrix(&mat).unwrap();
        assert_eq!((dm.nrows(), dm.ncols()), (0, 0));
    }
}
