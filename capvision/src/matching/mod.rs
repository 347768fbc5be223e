pub mod score;

use anyhow::bail;
use nalgebra::DMatrix;
use rayon::prelude::*;

/// One accepted correspondence between a reference descriptor row and a query
/// descriptor row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorMatch {
    pub reference_idx: usize,
    pub query_idx: usize,
    pub distance: f32,
}

/// Brute-force nearest-neighbor matching under L1 distance with cross-check:
/// a pair is kept only when each row is the other's nearest neighbor, which
/// removes many-to-one ambiguous matches. Results are sorted ascending by
/// distance and truncated to `max_matches`.
///
/// Nearest-neighbor ties resolve to the lowest row index, so the result does
/// not depend on how the row scan is scheduled.
pub fn match_descriptors(
    reference: &DMatrix<f32>,
    query: &DMatrix<f32>,
    max_matches: usize,
) -> anyhow::Result<Vec<DescriptorMatch>> {
    if reference.nrows() == 0 || query.nrows() == 0 {
        return Ok(Vec::new());
    }
    if reference.ncols() != query.ncols() {
        bail!(
            "descriptor length mismatch: reference {} vs query {}",
            reference.ncols(),
            query.ncols()
        );
    }

    let reference_nearest: Vec<(usize, f32)> = (0..reference.nrows())
        .into_par_iter()
        .map(|i| nearest_row(reference, i, query))
        .collect();
    let query_nearest: Vec<usize> = (0..query.nrows())
        .into_par_iter()
        .map(|j| nearest_row(query, j, reference).0)
        .collect();

    let mut matches: Vec<DescriptorMatch> = reference_nearest
        .into_iter()
        .enumerate()
        .filter(|&(i, (j, _))| query_nearest[j] == i)
        .map(|(i, (j, distance))| DescriptorMatch {
            reference_idx: i,
            query_idx: j,
            distance,
        })
        .collect();

    matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    matches.truncate(max_matches);

    Ok(matches)
}

fn nearest_row(from: &DMatrix<f32>, row: usize, to: &DMatrix<f32>) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for candidate in 0..to.nrows() {
        let dist = l1_distance(from, row, to, candidate);
        if dist < best.1 {
            best = (candidate, dist);
        }
    }

    best
}

fn l1_distance(a: &DMatrix<f32>, row_a: usize, b: &DMatrix<f32>, row_b: usize) -> f32 {
    let mut sum = 0.0;
    for c in 0..a.ncols() {
        sum += (a[(row_a, c)] - b[(row_b, c)]).abs();
    }

    sum
}
