use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use itertools::Itertools;
use nalgebra::DMatrix;
use opencv::{core::KeyPoint, prelude::*};
use serde::{Deserialize, Serialize};

/// On-disk shape of one reference record: the stored image name, the SIFT
/// keypoints as 7-tuples and the descriptor rows. The format is shared with
/// the pre-existing cap database, so the field names are fixed.
#[derive(Debug, Serialize, Deserialize)]
struct RawRecord {
    name: String,
    kps: Vec<(f32, f32, f32, f32, f32, i32, i32)>,
    dcps: Vec<Vec<f32>>,
}

/// One known cap design: identity plus its precomputed feature set.
/// Immutable after load.
#[derive(Debug, Clone)]
pub struct ReferenceRecord {
    pub identity: String,
    pub source: PathBuf,
    pub keypoints: Vec<KeyPoint>,
    pub descriptors: DMatrix<f32>,
}

/// A read-only snapshot of every reference record in a database directory.
///
/// The snapshot is loaded explicitly by the caller and replaced only through
/// [`ReferenceDb::reload`]; nothing is cached behind the caller's back.
/// Records are kept in file-name order so that the scan order of
/// [`crate::best_match`] is reproducible.
#[derive(Debug, Clone)]
pub struct ReferenceDb {
    records: Vec<ReferenceRecord>,
}

impl ReferenceDb {
    /// Load every `*.json` record under `dir`. A record that fails to parse
    /// fails the whole load; a silently skipped record would break the "best
    /// match across all references" guarantee.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("reading reference database directory {}", dir.display()))?;
        let paths: Vec<PathBuf> = entries
            .map(|entry| Ok(entry?.path()))
            .collect::<std::io::Result<Vec<_>>>()?;

        let records = paths
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .sorted()
            .map(|p| load_record(&p))
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!("loaded {} reference records from {}", records.len(), dir.display());

        Ok(Self { records })
    }

    /// Build a database from records already in memory.
    pub fn from_records(records: Vec<ReferenceRecord>) -> Self {
        Self { records }
    }

    /// Replace the snapshot with a fresh read of `dir`.
    pub fn reload(&mut self, dir: &Path) -> anyhow::Result<()> {
        self.records = Self::load(dir)?.records;
        Ok(())
    }

    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read a single persisted record.
pub fn load_record(path: &Path) -> anyhow::Result<ReferenceRecord> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading reference record {}", path.display()))?;
    let raw: RawRecord = serde_json::from_str(&data)
        .with_context(|| format!("parsing reference record {}", path.display()))?;

    let keypoints = raw
        .kps
        .iter()
        .map(|&(x, y, size, angle, response, octave, class_id)| {
            KeyPoint::new_coords(x, y, size, angle, response, octave, class_id)
        })
        .collect::<opencv::Result<Vec<_>>>()?;
    let descriptors = descriptor_matrix(&raw.dcps)
        .with_context(|| format!("reference record {}", path.display()))?;

    Ok(ReferenceRecord {
        identity: identity_from_name(&raw.name),
        source: path.to_path_buf(),
        keypoints,
        descriptors,
    })
}

/// Write a record in the same shape [`load_record`] reads.
pub fn save_record(
    path: &Path,
    name: &str,
    keypoints: &[KeyPoint],
    descriptors: &DMatrix<f32>,
) -> anyhow::Result<()> {
    let kps = keypoints
        .iter()
        .map(|kp| {
            (
                kp.pt().x,
                kp.pt().y,
                kp.size(),
                kp.angle(),
                kp.response(),
                kp.octave(),
                kp.class_id(),
            )
        })
        .collect();
    let dcps = (0..descriptors.nrows())
        .map(|r| descriptors.row(r).iter().copied().collect())
        .collect();

    let raw = RawRecord { name: name.to_string(), kps, dcps };
    let data = serde_json::to_string(&raw)?;
    fs::write(path, data).with_context(|| format!("writing reference record {}", path.display()))
}

fn descriptor_matrix(rows: &[Vec<f32>]) -> anyhow::Result<DMatrix<f32>> {
    let ncols = rows.first().map_or(0, |row| row.len());
    if rows.iter().any(|row| row.len() != ncols) {
        bail!("descriptor rows differ in length");
    }

    Ok(DMatrix::from_fn(rows.len(), ncols, |r, c| rows[r][c]))
}

/// The identity is the stored name with its trailing extension token removed:
/// the second-to-last dot-delimited segment, or the whole name when there is
/// no extension.
fn identity_from_name(name: &str) -> String {
    name.rsplit('.').nth(1).unwrap_or(name).to_string()
}
