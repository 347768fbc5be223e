use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use capvision::{apply_circular_mask, features, save_record, to_grayscale};
use opencv::{
    imgcodecs::{self, IMREAD_COLOR},
    prelude::*,
};

/// Build reference records from a directory of cap photos: mask out the
/// background around each cap, extract features and persist one JSON record
/// per image into the database directory.
pub fn enroll_directory(caps_dir: &Path, refdb_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(refdb_dir)
        .with_context(|| format!("creating reference database directory {}", refdb_dir.display()))?;

    let mut paths: Vec<PathBuf> = fs::read_dir(caps_dir)
        .with_context(|| format!("reading caps directory {}", caps_dir.display()))?
        .map(|entry| Ok(entry?.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    let mut enrolled = 0;
    for path in paths.iter().filter(|p| p.is_file()) {
        let img = imgcodecs::imread(
            path.to_str()
                .with_context(|| format!("path {} is not valid unicode", path.display()))?,
            IMREAD_COLOR,
        )?;
        if img.empty() {
            log::warn!("skipping unreadable image {}", path.display());
            continue;
        }

        let masked = apply_circular_mask(&img)?;
        let gray = to_grayscale(&masked)?;
        let (keypoints, descriptors) = features::extract(&gray)?;
        if descriptors.nrows() == 0 {
            log::warn!("no features found in {}, skipping", path.display());
            continue;
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("file name of {} is not valid unicode", path.display()))?;
        save_record(&refdb_dir.join(format!("{name}.json")), name, &keypoints, &descriptors)?;
        log::info!("enrolled {name} ({} keypoints)", keypoints.len());
        enrolled += 1;
    }

    log::info!("enrolled {enrolled} caps into {}", refdb_dir.display());
    Ok(())
}
