use std::path::PathBuf;

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::detect::regions::Rectangle;
use crate::matching::match_descriptors;
use crate::refdb::ReferenceDb;

/// The best reference for one candidate descriptor set, before the region it
/// came from is attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestMatch {
    pub identity: Option<String>,
    pub source: Option<PathBuf>,
    pub success: f64,
    pub match_count: usize,
    pub reference_descriptors: usize,
}

/// The final per-region result handed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct CapMatch {
    pub identity: Option<String>,
    pub source: Option<PathBuf>,
    pub success: f64,
    pub match_count: usize,
    pub candidate_descriptors: usize,
    pub reference_descriptors: usize,
    pub region: Rectangle,
}

/// Weighted match-density score for one candidate/reference comparison.
///
/// The reference-side density carries 3x the weight of the candidate-side
/// density: a small reference set that is almost entirely matched is a
/// stronger identity signal than a noisy candidate partially matched. Either
/// count being zero scores 0.0 rather than dividing by zero.
pub fn success_score(match_count: usize, candidate_len: usize, reference_len: usize) -> f64 {
    if candidate_len == 0 || reference_len == 0 {
        return 0.0;
    }

    0.25 * match_count as f64 / candidate_len as f64
        + 0.75 * match_count as f64 / reference_len as f64
}

/// Score the candidate against every reference record and keep the best.
///
/// Records are compared in database order and equal scores keep the earlier
/// record (stable, insertion-order tie-break). An empty database or an empty
/// candidate descriptor set yields the default null result with success 0.0.
pub fn best_match(
    db: &ReferenceDb,
    candidate: &DMatrix<f32>,
    max_matches: usize,
) -> anyhow::Result<BestMatch> {
    let candidate_len = candidate.nrows();

    let descriptor_sets: Vec<&DMatrix<f32>> =
        db.records().iter().map(|r| &r.descriptors).collect();
    let comparisons = descriptor_sets
        .par_iter()
        .map(|descriptors| -> anyhow::Result<(usize, f64)> {
            let matches = match_descriptors(descriptors, candidate, max_matches)?;
            let score = success_score(matches.len(), candidate_len, descriptors.nrows());
            Ok((matches.len(), score))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut best = BestMatch::default();
    for (record, (match_count, score)) in db.records().iter().zip(comparisons) {
        if score > best.success {
            best = BestMatch {
                identity: Some(record.identity.clone()),
                source: Some(record.source.clone()),
                success: score,
                match_count,
                reference_descriptors: record.descriptors.nrows(),
            };
        }
    }

    Ok(best)
}

/// Partition results into confident and uncertain by strict comparison with
/// the threshold; a score exactly at the threshold counts as uncertain.
pub fn classify(results: Vec<CapMatch>, threshold: f64) -> (Vec<CapMatch>, Vec<CapMatch>) {
    results.into_iter().partition(|m| m.success > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refdb::ReferenceRecord;

    fn record(identity: &str, descriptors: DMatrix<f32>) -> ReferenceRecord {
        ReferenceRecord {
            identity: identity.to_string(),
            source: PathBuf::from(format!("{identity}.json")),
            keypoints: Vec::new(),
            descriptors,
        }
    }

    fn column(values: impl IntoIterator<Item = f32>) -> DMatrix<f32> {
        let values: Vec<f32> = values.into_iter().collect();
        DMatrix::from_fn(values.len(), 1, |r, _| values[r])
    }

    #[test]
    fn score_is_the_weighted_density_sum() {
        assert!((success_score(30, 40, 100) - 0.4125).abs() < 1e-12);
        assert!((success_score(18, 40, 20) - 0.7875).abs() < 1e-12);
    }

    #[test]
    fn zero_counts_score_zero_instead_of_dividing() {
        assert_eq!(success_score(0, 0, 100), 0.0);
        assert_eq!(success_score(0, 40, 0), 0.0);
        assert_eq!(success_score(0, 40, 100), 0.0);
    }

    #[test]
    fn score_grows_with_match_count() {
        for m in 0..50 {
            assert!(success_score(m, 50, 100) < success_score(m + 1, 50, 100));
        }
    }

    #[test]
    fn empty_database_yields_the_null_result() {
        let db = ReferenceDb::from_records(Vec::new());
        let candidate = column((0..10).map(|i| i as f32));

        let best = best_match(&db, &candidate, 100).unwrap();
        assert_eq!(best.identity, None);
        assert_eq!(best.success, 0.0);
        assert_eq!(best.match_count, 0);
    }

    #[test]
    fn empty_candidate_never_beats_the_null_result() {
        let db = ReferenceDb::from_records(vec![record(
            "alpha",
            column((0..10).map(|i| i as f32)),
        )]);
        let candidate = DMatrix::<f32>::zeros(0, 0);

        let best = best_match(&db, &candidate, 100).unwrap();
        assert_eq!(best.identity, None);
        assert_eq!(best.success, 0.0);
    }

    #[test]
    fn reference_density_outweighs_raw_match_count() {
        // 40 candidate descriptors. "bulk" shares 30 of its 100 rows with the
        // candidate, "dense" shares 18 of its 20. The dense reference scores
        // 0.7875 against bulk's 0.4125 and must win despite fewer matches.
        let candidate = column((0..40).map(|i| (i * 100) as f32));
        let bulk = column((0..100).map(|j| {
            if j < 30 {
                (j * 100) as f32
            } else {
                1_000_000.0 + (j * 100) as f32
            }
        }));
        let dense = column((0..20).map(|j| {
            if j < 18 {
                (j * 100) as f32
            } else {
                1_000_000.0 + (j * 100) as f32
            }
        }));
        let db = ReferenceDb::from_records(vec![record("bulk", bulk), record("dense", dense)]);

        let best = best_match(&db, &candidate, 100).unwrap();
        assert_eq!(best.identity.as_deref(), Some("dense"));
        assert_eq!(best.match_count, 18);
        assert_eq!(best.reference_descriptors, 20);
        assert!((best.success - 0.7875).abs() < 1e-12);
    }

    #[test]
    fn equal_scores_keep_the_first_record_in_database_order() {
        let descriptors = column((0..10).map(|i| (i * 10) as f32));
        let db = ReferenceDb::from_records(vec![
            record("first", descriptors.clone()),
            record("second", descriptors.clone()),
        ]);

        let best = best_match(&db, &descriptors, 100).unwrap();
        assert_eq!(best.identity.as_deref(), Some("first"));
    }

    #[test]
    fn best_match_is_idempotent() {
        let candidate = column((0..25).map(|i| (i * 3) as f32));
        let db = ReferenceDb::from_records(vec![
            record("alpha", column((0..30).map(|i| (i * 3) as f32))),
            record("beta", column((0..15).map(|i| (i * 7) as f32))),
        ]);

        let first = best_match(&db, &candidate, 100).unwrap();
        let second = best_match(&db, &candidate, 100).unwrap();
        assert_eq!(first, second);
    }

    fn cap_match(success: f64) -> CapMatch {
        CapMatch {
            identity: Some("cap".to_string()),
            source: None,
            success,
            match_count: 0,
            candidate_descriptors: 0,
            reference_descriptors: 0,
            region: Rectangle { x: 0, y: 0, width: 10, height: 10 },
        }
    }

    #[test]
    fn classification_boundary_is_exclusive() {
        let results = vec![cap_match(0.9), cap_match(0.5), cap_match(0.49), cap_match(0.1)];
        let (confident, uncertain) = classify(results, 0.5);

        let confident_scores: Vec<f64> = confident.iter().map(|m| m.success).collect();
        assert_eq!(confident_scores, vec![0.9]);
        assert_eq!(uncertain.len(), 3);
    }
}
